pub mod collectors;
pub mod config;
pub mod metrics;
pub mod peak;
pub mod sampler;
pub mod server;
pub mod sink;
pub mod store;
pub mod types;

pub use config::{ApiConfig, Config, SamplerConfig, StorageConfig};
pub use metrics::Metrics;
