//! reefbuild — fleet-backed image build workflow
//!
//! This crate drives the allocation/build/teardown workflow against a
//! fleet-management service: resolve a label (resource template), create an
//! application (allocation) for it, wait for the service to allocate a
//! concrete resource, publish its SSH endpoint, hand the target to external
//! remote-shell/provisioning hooks, ask the service to capture an image at
//! deallocation time, and release the allocation no matter how the run ends.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   Builder                      │
//! │  config → prepared config → step sequence      │
//! └───────────────────┬───────────────────────────┘
//!                     │ run_steps (strict order,
//!                     │  reverse cleanup on exit)
//! ┌───────────────────▼───────────────────────────┐
//! │ Cleanup* → Connect → FindLabel → CreateApp →   │
//! │ WaitForAllocation → SetupSsh → ConnectShell →  │
//! │ Provision → CreateImage                        │
//! │ (*registered first so its cleanup runs last)   │
//! └───────────────────┬───────────────────────────┘
//!                     │
//! ┌───────────────────▼───────────────────────────┐
//! │        reefbuild-client (FleetClient)          │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The first step that fails halts forward progress; the runner then invokes
//! the cleanup of every step that started, in reverse order, so a created
//! application is always deallocated exactly once.

pub mod artifact;
pub mod builder;
pub mod config;
pub mod error;
pub mod hook;
pub mod state;
pub mod step;

// Re-exports
pub use artifact::{Artifact, BUILDER_ID};
pub use builder::Builder;
pub use config::{Config, GENERATED_VARS, PollTuning, PreparedConfig, SshConfig};
pub use error::{BuildError, ConfigError, Result};
pub use hook::{
    AccessFetcher, Hooks, NoopProvisioner, NoopShell, ProvisionHook, RemoteShell, SshEndpoint,
};
pub use state::{BuildState, GeneratedData};
