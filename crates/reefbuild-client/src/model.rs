//! Wire types for the fleet service's JSON API
//!
//! Field renames follow the service's casing exactly (`UID`, `label_UID`,
//! ...). Timestamps are optional because the service omits them on create
//! responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata map used for application metadata and task results.
pub type MetaMap = BTreeMap<String, MetaValue>;

/// A JSON-shaped metadata value.
///
/// The service accepts and returns free-form JSON in metadata and task
/// result maps; this union keeps those maps typed without reaching for
/// `serde_json::Value` everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<MetaValue>),
    Map(MetaMap),
}

impl MetaValue {
    /// String payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::String(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::String(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Number(v.into())
    }
}

/// A named, versioned blueprint for an allocatable resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    pub name: String,

    /// Monotonic per name; the newest definition set wins by default.
    pub version: i64,

    #[serde(default)]
    pub definitions: Vec<LabelDefinition>,

    #[serde(default)]
    pub metadata: MetaMap,
}

/// One alternative way to provision a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDefinition {
    pub driver: String,

    pub resources: Resources,

    #[serde(default)]
    pub options: MetaMap,

    #[serde(default)]
    pub authentication: Option<Authentication>,
}

/// Resource requirements of a label definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub slots: i64,
    #[serde(default)]
    pub cpu: i64,
    #[serde(default)]
    pub ram: i64,
    #[serde(default)]
    pub disks: BTreeMap<String, ResourcesDisk>,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub node_filter: Vec<String>,
    #[serde(default)]
    pub multitenancy: bool,
    #[serde(default)]
    pub cpu_overbook: bool,
    #[serde(default)]
    pub ram_overbook: bool,
    #[serde(default)]
    pub lifetime: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesDisk {
    #[serde(rename = "type", default)]
    pub disk_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub reuse: bool,
    #[serde(default)]
    pub clone: String,
}

/// Static credentials attached to a label definition or resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub port: u16,
}

/// Request body for application creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplication {
    #[serde(rename = "label_UID")]
    pub label_uid: String,

    pub metadata: MetaMap,
}

/// An allocation request/record derived from a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub owner_name: String,

    #[serde(rename = "label_UID")]
    pub label_uid: String,

    #[serde(default)]
    pub metadata: MetaMap,
}

/// Lifecycle stage of an application, as reported by the service.
///
/// Unrecognized wire values decode as `Unknown` so a newer service never
/// breaks the client (the workflow logs them and keeps waiting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    New,
    Elected,
    Allocated,
    Error,
    Deallocate,
    Deallocated,
    Recalled,
    Unknown(String),
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NEW" => ApplicationStatus::New,
            "ELECTED" => ApplicationStatus::Elected,
            "ALLOCATED" => ApplicationStatus::Allocated,
            "ERROR" => ApplicationStatus::Error,
            "DEALLOCATE" => ApplicationStatus::Deallocate,
            "DEALLOCATED" => ApplicationStatus::Deallocated,
            "RECALLED" => ApplicationStatus::Recalled,
            _ => ApplicationStatus::Unknown(s),
        }
    }
}

impl From<ApplicationStatus> for String {
    fn from(s: ApplicationStatus) -> Self {
        s.to_string()
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplicationStatus::New => "NEW",
            ApplicationStatus::Elected => "ELECTED",
            ApplicationStatus::Allocated => "ALLOCATED",
            ApplicationStatus::Error => "ERROR",
            ApplicationStatus::Deallocate => "DEALLOCATE",
            ApplicationStatus::Deallocated => "DEALLOCATED",
            ApplicationStatus::Recalled => "RECALLED",
            ApplicationStatus::Unknown(s) => s,
        };
        f.write_str(s)
    }
}

/// Current state record of an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationState {
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "application_UID")]
    pub application_uid: String,

    pub status: ApplicationStatus,

    #[serde(default)]
    pub description: String,
}

/// The concrete instance backing an ALLOCATED application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResource {
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(rename = "application_UID")]
    pub application_uid: String,

    #[serde(rename = "node_UID", default)]
    pub node_uid: String,

    #[serde(rename = "label_UID", default)]
    pub label_uid: String,

    #[serde(default)]
    pub definition_index: i64,

    #[serde(default)]
    pub identifier: String,

    #[serde(default)]
    pub ip_addr: String,

    #[serde(default)]
    pub hw_addr: String,

    #[serde(default)]
    pub metadata: MetaMap,

    #[serde(default)]
    pub authentication: Option<Authentication>,

    /// When the service will forcibly reclaim the resource.
    #[serde(default)]
    pub timeout: Option<DateTime<Utc>>,
}

/// Ephemeral connection credentials for a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAccess {
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "application_resource_UID")]
    pub application_resource_uid: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub key: String,
}

/// Request body for task creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplicationTask {
    #[serde(rename = "application_UID")]
    pub application_uid: String,

    pub task: String,

    /// Lifecycle trigger, e.g. "DEALLOCATE" to run at teardown time.
    pub when: String,

    pub options: MetaMap,
}

/// An asynchronous task attached to an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationTask {
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(rename = "application_UID")]
    pub application_uid: String,

    pub task: String,

    #[serde(default)]
    pub when: String,

    #[serde(default)]
    pub options: MetaMap,

    /// Empty until the task has run.
    #[serde(default)]
    pub result: MetaMap,
}

/// Identity probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub name: String,
}

/// One message from the change-subscription stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_decodes_known_and_unknown_values() {
        assert_eq!(
            ApplicationStatus::from("ALLOCATED".to_string()),
            ApplicationStatus::Allocated
        );
        assert_eq!(
            ApplicationStatus::from("SOMETHING_NEW".to_string()),
            ApplicationStatus::Unknown("SOMETHING_NEW".to_string())
        );
        assert_eq!(ApplicationStatus::Recalled.to_string(), "RECALLED");
    }

    #[test]
    fn meta_value_round_trips_nested_maps() {
        let json = r#"{"status":"success","image":{"path":"/srv/img.qcow2","size":42},"warm":true}"#;
        let map: MetaMap = serde_json::from_str(json).unwrap();
        assert_eq!(map["status"].as_str(), Some("success"));
        assert_eq!(map["warm"], MetaValue::Bool(true));
        match &map["image"] {
            MetaValue::Map(inner) => assert_eq!(inner["path"].as_str(), Some("/srv/img.qcow2")),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn application_state_uses_service_casing() {
        let json = r#"{"UID":"s1","application_UID":"a1","status":"NEW","description":"queued"}"#;
        let state: ApplicationState = serde_json::from_str(json).unwrap();
        assert_eq!(state.application_uid, "a1");
        assert_eq!(state.status, ApplicationStatus::New);
    }
}
