//! Label (resource template) resolution

use crate::config::PreparedConfig;
use crate::error::{BuildError, ConfigError, Result};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use reefbuild_client::Label;
use std::sync::Arc;

/// Resolves the configured label name (and optional version) to a concrete
/// label definition.
pub struct FindLabelStep {
    config: Arc<PreparedConfig>,
}

impl FindLabelStep {
    pub fn new(config: Arc<PreparedConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for FindLabelStep {
    fn name(&self) -> &'static str {
        "find-label"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let client = state.client()?;
        let config = &self.config.config;

        tracing::info!(label = %config.label_name, "Looking for label");
        let version_filter = match config.label_version.as_deref() {
            Some(v) => {
                tracing::info!(version = v, "Searching for specific version");
                v
            }
            None => {
                tracing::info!("No version specified, using the latest");
                "last"
            }
        };

        let labels = client
            .get_labels(&config.label_name, Some(version_filter))
            .await?;
        if labels.is_empty() {
            return Err(BuildError::LabelNotFound(config.label_name.clone()));
        }

        let selected = match config.label_version.as_deref() {
            None => pick_latest(labels),
            Some(raw) => {
                let requested: i64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidVersion(raw.to_string()))?;
                labels
                    .into_iter()
                    .find(|label| label.version == requested)
                    .ok_or_else(|| BuildError::LabelVersionNotFound {
                        name: config.label_name.clone(),
                        version: requested,
                    })?
            }
        };

        tracing::info!(
            label = %selected.name,
            version = selected.version,
            uid = %selected.uid,
            definitions = selected.definitions.len(),
            "Found label"
        );

        if selected.definitions.is_empty() {
            return Err(BuildError::LabelHasNoDefinitions(selected.name));
        }

        state.label = Some(selected);
        Ok(())
    }
}

/// Highest version wins; on duplicates the first one seen at that version.
fn pick_latest(mut labels: Vec<Label>) -> Label {
    let mut best = 0;
    for (i, label) in labels.iter().enumerate().skip(1) {
        if label.version > labels[best].version {
            best = i;
        }
    }
    labels.swap_remove(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(uid: &str, version: i64) -> Label {
        Label {
            uid: uid.to_string(),
            created_at: None,
            name: "builder".to_string(),
            version,
            definitions: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn latest_version_wins() {
        let picked = pick_latest(vec![label("a", 1), label("b", 3), label("c", 2)]);
        assert_eq!(picked.version, 3);
        assert_eq!(picked.uid, "b");
    }

    #[test]
    fn duplicate_max_keeps_first_seen() {
        let picked = pick_latest(vec![label("a", 3), label("b", 3), label("c", 1)]);
        assert_eq!(picked.uid, "a");
    }
}
