//! Image capture task

use crate::config::PreparedConfig;
use crate::error::{BuildError, Result};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use reefbuild_client::{MetaValue, NewApplicationTask};
use std::sync::Arc;
use tokio::time::Instant;

/// Creates a capture task scheduled for deallocation time and polls it until
/// the service reports a result.
pub struct CreateImageStep {
    config: Arc<PreparedConfig>,
}

impl CreateImageStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for CreateImageStep {
    fn name(&self) -> &'static str {
        "create-image"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let client = state.client()?;
        let app_uid = state
            .application
            .as_ref()
            .ok_or(BuildError::StateMissing("application"))?
            .uid
            .clone();

        tracing::info!("Creating image capture task");
        let task = client
            .create_application_task(
                &app_uid,
                &NewApplicationTask {
                    application_uid: app_uid.clone(),
                    task: "TaskImage".to_string(),
                    when: "DEALLOCATE".to_string(),
                    options: Default::default(),
                },
            )
            .await?;
        tracing::info!(task = %task.uid, "Image task created, waiting for completion");

        let budget = self.config.tuning.image_timeout;
        let deadline = Instant::now() + budget;
        let mut ticker = tokio::time::interval(self.config.tuning.image_interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(BuildError::Timeout { what: "image capture", after: budget });
                }
                _ = ticker.tick() => {
                    let current = client.get_application_task(&task.uid).await?;
                    if current.result.is_empty() {
                        tracing::info!("Image capture still in progress");
                        continue;
                    }

                    // Strict on explicit failure, lenient otherwise: any
                    // non-empty result without a recognized failure marker
                    // counts as success.
                    match current.result.get("status").and_then(MetaValue::as_str) {
                        Some("success") | Some("completed") => {
                            tracing::info!("Image created successfully");
                        }
                        Some("failed") | Some("error") => {
                            let detail = serde_json::to_string(&current.result)
                                .unwrap_or_else(|_| "<unprintable result>".to_string());
                            return Err(BuildError::ImageTaskFailed(detail));
                        }
                        Some(other) => {
                            tracing::warn!(
                                status = %other,
                                "Image task reported unrecognized status, treating non-empty result as success"
                            );
                        }
                        None => {
                            tracing::warn!(
                                "Image task result has no status field, treating non-empty result as success"
                            );
                        }
                    }

                    if let Some(image) = current.result.get("image") {
                        tracing::info!(image = ?image, "Image information");
                    }
                    if let Some(path) = current.result.get("image_path").and_then(MetaValue::as_str) {
                        tracing::info!(path = %path, "Image path");
                    }
                    return Ok(());
                }
            }
        }
    }
}
