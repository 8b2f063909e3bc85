//! API session establishment

use crate::config::PreparedConfig;
use crate::error::{BuildError, Result};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use futures_util::StreamExt;
use reefbuild_client::{ClientOptions, FleetClient};
use std::sync::Arc;

/// Object kinds the advisory subscription asks for.
const SUBSCRIPTION_KINDS: [&str; 4] = [
    "application",
    "application_state",
    "application_resource",
    "application_task",
];

/// Connects to the fleet API and verifies identity.
pub struct ConnectStep {
    config: Arc<PreparedConfig>,
}

impl ConnectStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for ConnectStep {
    fn name(&self) -> &'static str {
        "connect"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let config = &self.config.config;
        tracing::info!(endpoint = %config.endpoint, "Connecting to fleet API");

        let client = Arc::new(FleetClient::new(
            &config.endpoint,
            &config.username,
            &config.password,
            ClientOptions {
                insecure_skip_verify: config.insecure_skip_tls_verify,
                ..ClientOptions::default()
            },
        )?);

        let probe_timeout = self.config.tuning.connect_probe_timeout;
        let user = tokio::time::timeout(probe_timeout, client.get_current_user())
            .await
            .map_err(|_| BuildError::Timeout {
                what: "API connection",
                after: probe_timeout,
            })??;
        tracing::info!(user = %user.name, "Connected to fleet API");

        // Advisory change stream; drained in the background and never
        // load-bearing, the polling loops stay authoritative.
        match client.subscribe(&SUBSCRIPTION_KINDS).await {
            Ok(stream) => {
                tokio::spawn(async move {
                    futures_util::pin_mut!(stream);
                    while let Some(event) = stream.next().await {
                        tracing::trace!(kind = %event.kind, "change notification");
                    }
                });
            }
            Err(err) => {
                tracing::debug!(error = %err, "change subscription unavailable, polling only");
            }
        }

        state.client = Some(client);
        Ok(())
    }
}
