//! Build result exposed to downstream collaborators

use std::collections::BTreeMap;

/// Identifier reported with every artifact this builder produces.
pub const BUILDER_ID: &str = "reefbuild.builder";

/// The workflow's externally visible result: the generated variable map
/// (ApplicationUID, ResourceUID, SSHHost, SSHPort) for post-processing.
#[derive(Debug, Clone)]
pub struct Artifact {
    state_data: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(state_data: BTreeMap<String, String>) -> Self {
        Self { state_data }
    }

    pub fn builder_id(&self) -> &'static str {
        BUILDER_ID
    }

    /// Stable identifier of the build result: the application uid.
    pub fn id(&self) -> &str {
        self.get("ApplicationUID").unwrap_or_default()
    }

    /// All generated variables.
    pub fn state_data(&self) -> &BTreeMap<String, String> {
        &self.state_data
    }

    /// A single generated variable by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.state_data.get(key).map(String::as_str)
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.get("ApplicationUID"), self.get("ResourceUID")) {
            (Some(app), Some(res)) => write!(f, "application {app} (resource {res})"),
            _ => write!(f, "fleet build artifact"),
        }
    }
}
