//! Allocation readiness polling

use crate::config::PreparedConfig;
use crate::error::{BuildError, Result};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use reefbuild_client::ApplicationStatus;
use std::sync::Arc;
use tokio::time::Instant;

/// Polls the application status until the service allocates a resource, a
/// terminal failure status appears, or the allocation budget runs out.
pub struct WaitForAllocationStep {
    config: Arc<PreparedConfig>,
}

impl WaitForAllocationStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for WaitForAllocationStep {
    fn name(&self) -> &'static str {
        "wait-for-allocation"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let client = state.client()?;
        let app_uid = state
            .application
            .as_ref()
            .ok_or(BuildError::StateMissing("application"))?
            .uid
            .clone();

        tracing::info!("Waiting for application to be allocated");

        let budget = self.config.allocation_timeout;
        let deadline = Instant::now() + budget;
        let mut ticker = tokio::time::interval(self.config.tuning.allocation_interval);
        let mut last_status: Option<ApplicationStatus> = None;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(BuildError::Timeout { what: "allocation", after: budget });
                }
                _ = ticker.tick() => {
                    let app_state = client.get_application_state(&app_uid).await?;

                    if last_status.as_ref() != Some(&app_state.status) {
                        tracing::info!(
                            status = %app_state.status,
                            description = %app_state.description,
                            "Application status changed"
                        );
                        last_status = Some(app_state.status.clone());
                    }

                    match &app_state.status {
                        ApplicationStatus::Allocated => {
                            // The resource record can lag behind the status
                            // flip; absence here means poll again.
                            match client.get_application_resource(&app_uid).await? {
                                None => {
                                    tracing::info!("Resource record not ready yet, continuing to wait");
                                }
                                Some(resource) => {
                                    tracing::info!(
                                        resource = %resource.uid,
                                        ip = %resource.ip_addr,
                                        "Application resource ready"
                                    );
                                    state.generated.resource_uid = Some(resource.uid.clone());
                                    state.resource = Some(resource);
                                    return Ok(());
                                }
                            }
                        }

                        ApplicationStatus::Error
                        | ApplicationStatus::Deallocate
                        | ApplicationStatus::Deallocated
                        | ApplicationStatus::Recalled => {
                            return Err(BuildError::AllocationFailed {
                                status: app_state.status.clone(),
                                description: app_state.description.clone(),
                            });
                        }

                        ApplicationStatus::New | ApplicationStatus::Elected => {}

                        ApplicationStatus::Unknown(other) => {
                            // Forward-compatibility: an unrecognized status
                            // never aborts the run by itself.
                            tracing::warn!(status = %other, "Unknown application status, continuing to wait");
                        }
                    }
                }
            }
        }
    }
}
