use assert_cmd::Command;
use httpmock::prelude::*;

#[tokio::test]
async fn doctor_command_checks_health() {
    let server = MockServer::start_async().await;

    let _health = server
        .mock_async(|when, then| {
            when.method(GET).path("/healthz");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"status":"ok"}"#);
        })
        .await;

    let _status = server
        .mock_async(|when, then| {
            when.method(GET).path("/status");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{
                    "uptime_s": 3600,
                    "gpu": "nvidia",
                    "ticks_total": 720,
                    "sample_failures": 2,
                    "flushes_total": 12,
                    "flush_failures": 0,
                    "shape_mismatches": 0,
                    "windows_stored": 12
                }"#,
                );
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args(["--url", &server.base_url(), "doctor"])
        .assert()
        .success()
        .stdout(predicates::str::contains("VMWatch Doctor"))
        .stdout(predicates::str::contains("720 ticks"));
}

#[tokio::test]
async fn doctor_command_handles_unreachable_server() {
    // Doctor still exits zero but reports the failed check.
    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args(["--url", "http://127.0.0.1:59999", "doctor"])
        .assert()
        .success()
        .stdout(predicates::str::contains("FAIL"));
}

#[tokio::test]
async fn doctor_warns_when_flushes_fail() {
    let server = MockServer::start_async().await;

    let _health = server
        .mock_async(|when, then| {
            when.method(GET).path("/healthz");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"status":"ok"}"#);
        })
        .await;

    let _status = server
        .mock_async(|when, then| {
            when.method(GET).path("/status");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{
                    "uptime_s": 60,
                    "gpu": "none",
                    "ticks_total": 12,
                    "sample_failures": 0,
                    "flushes_total": 0,
                    "flush_failures": 3,
                    "shape_mismatches": 0,
                    "windows_stored": 0
                }"#,
                );
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args(["--url", &server.base_url(), "doctor"])
        .assert()
        .success()
        .stdout(predicates::str::contains("3 failed flushes"));
}

#[tokio::test]
async fn status_command_prints_counters() {
    let server = MockServer::start_async().await;

    let _status = server
        .mock_async(|when, then| {
            when.method(GET).path("/status");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{
                    "uptime_s": 42,
                    "gpu": "amd",
                    "ticks_total": 9,
                    "sample_failures": 1,
                    "flushes_total": 2,
                    "flush_failures": 0,
                    "shape_mismatches": 0,
                    "windows_stored": 2
                }"#,
                );
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args(["--url", &server.base_url(), "status"])
        .assert()
        .success()
        .stdout(predicates::str::contains("42s"))
        .stdout(predicates::str::contains("amd"));
}
