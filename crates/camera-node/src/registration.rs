//! Registration client: keeps this node announced to the central server.
//!
//! State machine:
//! - `Announcing` -> success -> `Waiting(heartbeat_interval)` -> `Announcing`
//! - `Announcing` -> failure -> `Backoff(delay)` -> `Announcing`
//!
//! The loop never terminates and runs as its own task, so an unreachable server
//! never blocks the node's API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use registry_core::{Announcement, RegisterAck};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backoff::{BackoffConfig, RetryState};
use crate::node::NodeState;

/// Path of the registration endpoint on the central server.
pub const REGISTER_PATH: &str = "/api/register";

#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("Request to central server failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Registration rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Central server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Invalid acknowledgment: {0}")]
    InvalidAck(String),
}

impl AnnounceError {
    /// Whether waiting could plausibly fix this failure.
    ///
    /// A 4xx means the server refused the payload itself; resending the same
    /// payload will not help until the node's state changes.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AnnounceError::Rejected { .. })
    }
}

/// Sends one registration to the central server.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, announcement: &Announcement) -> Result<RegisterAck, AnnounceError>;
}

/// `Announcer` over reqwest.
#[derive(Clone)]
pub struct HttpAnnouncer {
    client: reqwest::Client,
    url: String,
}

impl HttpAnnouncer {
    pub fn new(server_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", server_url.trim_end_matches('/'), REGISTER_PATH),
        })
    }
}

#[async_trait]
impl Announcer for HttpAnnouncer {
    async fn announce(&self, announcement: &Announcement) -> Result<RegisterAck, AnnounceError> {
        let response = self.client.post(&self.url).json(announcement).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() {
                AnnounceError::Rejected {
                    status: status.as_u16(),
                    body,
                }
            } else {
                AnnounceError::ServerError {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        response
            .json::<RegisterAck>()
            .await
            .map_err(|e| AnnounceError::InvalidAck(e.to_string()))
    }
}

/// Timing of the registration loop.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Wait after a successful registration (default: 30s)
    pub heartbeat_interval: Duration,
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Where the client is in its announce cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Sending a registration
    Announcing,
    /// Registered; next heartbeat after this delay
    Waiting(Duration),
    /// Last attempt failed; retry after this delay
    Backoff(Duration),
}

/// Periodically announces the node to the central server.
pub struct RegistrationClient<A> {
    announcer: A,
    node: Arc<NodeState>,
    config: ClientConfig,
    retry: RetryState,
    phase: ClientPhase,
    registered: bool,
}

impl<A: Announcer> RegistrationClient<A> {
    pub fn new(announcer: A, node: Arc<NodeState>, config: ClientConfig) -> Self {
        let retry = RetryState::new(&config.backoff);
        Self {
            announcer,
            node,
            config,
            retry,
            phase: ClientPhase::Announcing,
            registered: false,
        }
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.retry.attempts
    }

    /// Announce once and return how long to wait before the next attempt.
    pub async fn attempt(&mut self) -> Duration {
        self.phase = ClientPhase::Announcing;
        let announcement = self.node.announcement();

        match self.announcer.announce(&announcement).await {
            Ok(ack) => {
                if Some(ack.id.as_str()) != announcement.node_id() {
                    warn!(
                        "Central server acknowledged id {} but we announced {}",
                        ack.id,
                        self.node.id()
                    );
                }
                if !self.registered || self.retry.attempts > 0 {
                    info!(
                        "Registered with central server as {} after {} failed attempt(s)",
                        ack.id, self.retry.attempts
                    );
                } else {
                    debug!("Heartbeat acknowledged ({})", ack.status);
                }
                self.registered = true;
                self.retry.reset(&self.config.backoff);
                self.phase = ClientPhase::Waiting(self.config.heartbeat_interval);
                self.config.heartbeat_interval
            }
            Err(e) => {
                let delay = self.retry.record_failure(&self.config.backoff);
                if e.is_retryable() {
                    warn!("Registration failed: {}", e);
                } else {
                    error!("Registration payload rejected, retrying anyway: {}", e);
                }
                info!(
                    "Retrying registration in {:?} (attempt {})",
                    delay, self.retry.attempts
                );
                self.phase = ClientPhase::Backoff(delay);
                delay
            }
        }
    }

    /// Announce forever. Never returns.
    pub async fn run(mut self) {
        info!("Registration client started for node {}", self.node.id());
        loop {
            let delay = self.attempt().await;
            tokio::time::sleep(delay).await;
        }
    }
}
