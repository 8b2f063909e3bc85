//! Fleet-management API client for reefbuild
//!
//! This crate is a thin typed facade over the fleet service's HTTP API:
//! label (template) queries, application lifecycle, resource and access
//! lookups, capture tasks and the optional change-subscription stream.
//! One async method per remote capability; all of them inject the
//! configured basic-auth pair and run under the client's request timeout.
//!
//! Absence is meaningful for two lookups only: an application's resource
//! and a resource's access credentials return `Ok(None)` on HTTP 404,
//! because "not created yet" is an expected stage of the allocation
//! lifecycle, not a failure.

pub mod client;
pub mod error;
pub mod model;

// Re-exports
pub use client::{ClientOptions, FleetClient};
pub use error::{ClientError, Result};
pub use model::{
    Application, ApplicationResource, ApplicationState, ApplicationStatus, ApplicationTask,
    Authentication, Label, LabelDefinition, MetaMap, MetaValue, NewApplication, NewApplicationTask,
    ResourceAccess, Resources, ResourcesDisk, ServerEvent, UserInfo,
};
