use assert_cmd::Command;
use httpmock::prelude::*;

#[tokio::test]
async fn usage_command_renders_windows() {
    let server = MockServer::start_async().await;

    let _usage = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/usage")
                .query_param("start", "2025-06-01")
                .query_param("end", "2025-06-02");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{
                    "status": "success",
                    "count": 1,
                    "data": [{
                        "id": 1,
                        "window_start": 1748772000,
                        "flushed_at": 1748775600,
                        "cpu_percent": [90.0, 45.0],
                        "mem_used_mb": 2048,
                        "mem_total_mb": 16384,
                        "disk_used_mb": 100000,
                        "disk_total_mb": 500000,
                        "gpu": {"proc_percent": 77.5, "mem_used_mb": 4096, "mem_total_mb": 8192}
                    }]
                }"#,
                );
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args([
            "--url",
            &server.base_url(),
            "--no-color",
            "usage",
            "--start",
            "2025-06-01",
            "--end",
            "2025-06-02",
        ])
        .assert()
        .success()
        .stdout(predicates::str::contains("1 peak window(s)"))
        .stdout(predicates::str::contains("67.5% (90.0, 45.0)"))
        .stdout(predicates::str::contains("mem:  2048/16384 MB"))
        .stdout(predicates::str::contains("gpu:  77.5%, 4096/8192 MB"));
}

#[tokio::test]
async fn usage_command_reports_api_errors() {
    let server = MockServer::start_async().await;

    let _usage = server
        .mock_async(|when, then| {
            when.method(GET).path("/usage");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error": "invalid date format, use ISO format (YYYY-MM-DD)"}"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args([
            "--url",
            &server.base_url(),
            "usage",
            "--start",
            "junk",
            "--end",
            "2025-06-02",
        ])
        .assert()
        .success()
        .stderr(predicates::str::contains("invalid date format"));
}

#[tokio::test]
async fn purge_command_reports_deleted_count() {
    let server = MockServer::start_async().await;

    let _purge = server
        .mock_async(|when, then| {
            when.method(POST).path("/purge").query_param("days", "30");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"status": "success", "deleted_count": 7}"#);
        })
        .await;

    Command::new(assert_cmd::cargo::cargo_bin!("vmwatch-cli"))
        .args(["--url", &server.base_url(), "purge", "--days", "30"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Deleted 7 window(s)"));
}
