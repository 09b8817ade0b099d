use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared per-process state. Holds no per-request data: every negotiation
/// starts from scratch.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Connection pool for the agent service and the record store
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.upstream_timeout))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}
