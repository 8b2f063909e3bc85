//! Cross-step build state
//!
//! Typed slots instead of a string-keyed bag: each step reads what earlier
//! steps stored and writes what later steps need. Only the step currently
//! executing ever touches it.

use crate::error::BuildError;
use reefbuild_client::{Application, ApplicationResource, FleetClient, Label};
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory state threading data between sequential steps.
#[derive(Default)]
pub struct BuildState {
    /// API session, stored by the connect step.
    pub client: Option<Arc<FleetClient>>,

    /// Selected label, stored by the find-label step.
    pub label: Option<Label>,

    /// Created application, stored by the create-application step.
    pub application: Option<Application>,

    /// Allocated resource, stored by the wait-for-allocation step.
    pub resource: Option<ApplicationResource>,

    /// Variables published for downstream collaborators.
    pub generated: GeneratedData,

    /// First fatal error recorded by the runner; cleanup never overwrites it.
    pub error: Option<BuildError>,
}

impl BuildState {
    pub fn new() -> Self {
        Self::default()
    }

    /// API client, or a state error if the connect step has not run.
    pub fn client(&self) -> Result<Arc<FleetClient>, BuildError> {
        self.client
            .clone()
            .ok_or(BuildError::StateMissing("api client"))
    }
}

/// Generated output variables, populated incrementally as the run advances.
#[derive(Debug, Clone, Default)]
pub struct GeneratedData {
    pub application_uid: Option<String>,
    pub resource_uid: Option<String>,
    pub ssh_host: Option<String>,
    pub ssh_port: Option<u16>,
}

impl GeneratedData {
    /// The string map handed to the artifact; absent slots are omitted.
    pub fn into_map(self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(uid) = self.application_uid {
            map.insert("ApplicationUID".to_string(), uid);
        }
        if let Some(uid) = self.resource_uid {
            map.insert("ResourceUID".to_string(), uid);
        }
        if let Some(host) = self.ssh_host {
            map.insert("SSHHost".to_string(), host);
        }
        if let Some(port) = self.ssh_port {
            map.insert("SSHPort".to_string(), port.to_string());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_map_contains_only_populated_slots() {
        let data = GeneratedData {
            application_uid: Some("app-1".to_string()),
            ssh_port: Some(2222),
            ..Default::default()
        };
        let map = data.into_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["ApplicationUID"], "app-1");
        assert_eq!(map["SSHPort"], "2222");
    }

    #[test]
    fn missing_client_is_a_state_error() {
        let state = BuildState::new();
        assert!(matches!(
            state.client().unwrap_err(),
            BuildError::StateMissing("api client")
        ));
    }
}
