//! Best-effort resource teardown
//!
//! Registered first in the sequence so its cleanup action runs last, after
//! every other started step has cleaned up. All failures in here are logged
//! and swallowed: cleanup never raises a second error over a build that has
//! already succeeded or failed.

use crate::config::PreparedConfig;
use crate::error::Result;
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use reefbuild_client::ApplicationStatus;
use std::sync::Arc;
use tokio::time::Instant;

pub struct CleanupStep {
    config: Arc<PreparedConfig>,
}

impl CleanupStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for CleanupStep {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    async fn run(&self, _state: &mut BuildState) -> Result<()> {
        Ok(())
    }

    async fn cleanup(&self, state: &mut BuildState) {
        let Some(client) = state.client.clone() else {
            tracing::info!("No API client in state, nothing to clean up");
            return;
        };
        let Some(application) = state.application.clone() else {
            tracing::info!("No application in state, nothing to clean up");
            return;
        };

        tracing::info!(application = %application.uid, "Cleaning up fleet resources");
        if let Err(err) = client.deallocate_application(&application.uid).await {
            tracing::error!(error = %err, "Failed to deallocate application");
            return;
        }
        tracing::info!(application = %application.uid, "Deallocate request sent");

        tokio::time::sleep(self.config.tuning.cleanup_grace).await;

        tracing::info!("Waiting for deallocation to complete");
        let deadline = Instant::now() + self.config.tuning.cleanup_timeout;
        let mut ticker = tokio::time::interval(self.config.tuning.cleanup_interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!("Deallocation timeout reached, continuing");
                    return;
                }
                _ = ticker.tick() => {
                    let app_state = match client.get_application_state(&application.uid).await {
                        Ok(s) => s,
                        Err(err) => {
                            tracing::warn!(error = %err, "Could not check application state");
                            return;
                        }
                    };

                    tracing::info!(status = %app_state.status, "Application status");
                    match app_state.status {
                        ApplicationStatus::Deallocated | ApplicationStatus::Recalled => {
                            tracing::info!("Application successfully deallocated");
                            return;
                        }
                        ApplicationStatus::Error => {
                            tracing::warn!(
                                description = %app_state.description,
                                "Application in error state during deallocation"
                            );
                            return;
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
