//! SSH endpoint resolution

use crate::config::PreparedConfig;
use crate::error::{BuildError, Result};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

/// Polls for SSH access credentials becoming available and publishes the
/// resolved host/port. Credentials themselves are left for the remote-shell
/// connector to fetch, they rotate per connection.
pub struct SetupSshStep {
    config: Arc<PreparedConfig>,
}

impl SetupSshStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for SetupSshStep {
    fn name(&self) -> &'static str {
        "setup-ssh"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let client = state.client()?;
        let resource_uid = state
            .resource
            .as_ref()
            .ok_or(BuildError::StateMissing("application resource"))?
            .uid
            .clone();

        tracing::info!("Setting up SSH connectivity");

        let budget = self.config.connection_timeout;
        let max_retries = self.config.connection_retries;
        let deadline = Instant::now() + budget;
        let mut ticker = tokio::time::interval(self.config.tuning.access_interval);
        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(BuildError::Timeout { what: "SSH access availability", after: budget });
                }
                _ = ticker.tick() => {
                    attempts += 1;
                    if attempts > max_retries {
                        return Err(BuildError::RetriesExceeded {
                            what: "SSH access availability",
                            attempts: max_retries,
                        });
                    }

                    tracing::info!(attempt = attempts, max = max_retries, "Checking SSH access availability");

                    // Only "not published yet" keeps the loop going; a real
                    // API failure aborts immediately.
                    let Some(access) = client.get_resource_access(&resource_uid).await? else {
                        tracing::info!("SSH access not available yet, retrying");
                        continue;
                    };

                    let (host, port) = match parse_address(&access.address) {
                        Some(parsed) => parsed,
                        None => {
                            let ssh = &self.config.config.ssh;
                            tracing::warn!(
                                address = %access.address,
                                fallback_host = %ssh.host,
                                fallback_port = ssh.port,
                                "Unable to parse SSH address, falling back to configured defaults"
                            );
                            (ssh.host.clone(), ssh.port)
                        }
                    };

                    tracing::info!(host = %host, port, "SSH endpoint resolved");
                    state.generated.ssh_host = Some(host);
                    state.generated.ssh_port = Some(port);
                    return Ok(());
                }
            }
        }
    }
}

/// Parse `host:port`; anything but exactly two colon-separated fields with a
/// numeric port is unparsable.
fn parse_address(addr: &str) -> Option<(String, u16)> {
    let mut parts = addr.split(':');
    let host = parts.next()?;
    let port = parts.next()?;
    if parts.next().is_some() || host.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok()?;
    Some((host.to_string(), port))
}
