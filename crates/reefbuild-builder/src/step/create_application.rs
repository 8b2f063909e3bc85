//! Application (allocation) creation

use crate::config::PreparedConfig;
use crate::error::{BuildError, Result};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use reefbuild_client::NewApplication;
use std::sync::Arc;

/// Submits an allocation request for the selected label, tagged with the
/// build tool, builder name and an RFC3339 build timestamp.
pub struct CreateApplicationStep {
    config: Arc<PreparedConfig>,
}

impl CreateApplicationStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for CreateApplicationStep {
    fn name(&self) -> &'static str {
        "create-application"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let client = state.client()?;
        let label = state
            .label
            .as_ref()
            .ok_or(BuildError::StateMissing("selected label"))?;

        tracing::info!("Creating application");

        let mut metadata = self.config.config.metadata.clone();
        metadata.insert("REEFBUILD_BUILD".to_string(), "true".into());
        metadata.insert("REEFBUILD_BUILDER".to_string(), "reefbuild".into());
        metadata.insert(
            "REEFBUILD_BUILD_TIME".to_string(),
            chrono::Utc::now().to_rfc3339().into(),
        );

        let application = client
            .create_application(&NewApplication {
                label_uid: label.uid.clone(),
                metadata,
            })
            .await?;

        tracing::info!(application = %application.uid, "Application created");
        state.generated.application_uid = Some(application.uid.clone());
        state.application = Some(application);
        Ok(())
    }
}
