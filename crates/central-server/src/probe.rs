//! HTTP health checks against a node's `/api/health`.

use async_trait::async_trait;
use registry_core::{HealthCheck, PeerAddress, ProbeError};
use std::time::Duration;

/// Path of the health endpoint every camera node serves.
pub const HEALTH_PATH: &str = "/api/health";

/// `HealthCheck` over reqwest with a per-request timeout.
#[derive(Clone)]
pub struct HttpHealthCheck {
    client: reqwest::Client,
}

impl HttpHealthCheck {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, address: &PeerAddress) -> Result<(), ProbeError> {
        let url = format!("{}{}", address.base_url(), HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Unhealthy(status.as_u16()))
        }
    }
}
