use anyhow::{Context, bail};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Daemon configuration, loaded from a TOML file at startup. A config
/// that fails [`Config::validate`] aborts startup; nothing here is
/// re-read or re-checked at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sampler: SamplerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds between individual samples.
    pub sample_period_secs: u64,
    /// Seconds between peak-window flushes.
    pub report_period_secs: u64,
    /// Upper bound on one external GPU query.
    pub gpu_query_timeout_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_period_secs: 5,
            report_period_secs: 3600,
            gpu_query_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite database file.
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address for the HTTP query API.
    pub listen: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config file {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sampler.sample_period_secs == 0 {
            bail!("sampler.sample_period_secs must be > 0");
        }
        if self.sampler.report_period_secs < self.sampler.sample_period_secs {
            bail!(
                "sampler.report_period_secs ({}) must be >= sample_period_secs ({})",
                self.sampler.report_period_secs,
                self.sampler.sample_period_secs
            );
        }
        if self.sampler.gpu_query_timeout_ms == 0 {
            bail!("sampler.gpu_query_timeout_ms must be > 0");
        }
        if self.storage.db_path.trim().is_empty() {
            bail!("storage.db_path must not be empty");
        }
        self.api
            .listen
            .parse::<SocketAddr>()
            .with_context(|| format!("api.listen is not a valid socket address: {}", self.api.listen))?;
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_secs(self.sampler.sample_period_secs)
    }

    pub fn report_period(&self) -> Duration {
        Duration::from_secs(self.sampler.report_period_secs)
    }

    pub fn gpu_query_timeout(&self) -> Duration {
        Duration::from_millis(self.sampler.gpu_query_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Config {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse("[storage]\ndb_path = \"/var/lib/vmwatch/usage.db\"\n");
        config.validate().unwrap();

        assert_eq!(config.sampler.sample_period_secs, 5);
        assert_eq!(config.sampler.report_period_secs, 3600);
        assert_eq!(config.api.listen, "127.0.0.1:8000");
    }

    #[test]
    fn rejects_zero_sample_period() {
        let config = parse(
            "[sampler]\nsample_period_secs = 0\n[storage]\ndb_path = \"usage.db\"\n",
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sample_period_secs"));
    }

    #[test]
    fn rejects_report_period_shorter_than_sample_period() {
        let config = parse(
            "[sampler]\nsample_period_secs = 10\nreport_period_secs = 5\n[storage]\ndb_path = \"usage.db\"\n",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_db_path() {
        let config = parse("[storage]\ndb_path = \"  \"\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let config = parse(
            "[storage]\ndb_path = \"usage.db\"\n[api]\nlisten = \"not-an-addr\"\n",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_storage_section_fails_to_parse() {
        let result = toml::from_str::<Config>("[sampler]\nsample_period_secs = 5\n");
        assert!(result.is_err());
    }
}
