//! Workflow driver
//!
//! Owns the validated configuration, assembles the step sequence in its
//! fixed order and converts the final state into an error or an artifact.

use crate::artifact::Artifact;
use crate::config::{Config, GENERATED_VARS, PreparedConfig};
use crate::error::Result;
use crate::hook::Hooks;
use crate::state::BuildState;
use crate::step::{
    CleanupStep, ConnectShellStep, ConnectStep, CreateApplicationStep, CreateImageStep,
    FindLabelStep, ProvisionStep, SetupSshStep, Step, WaitForAllocationStep, run_steps,
};
use std::future::Future;
use std::sync::Arc;

#[derive(Debug)]
pub struct Builder {
    prepared: PreparedConfig,
}

impl Builder {
    /// Validate the configuration; fails before any network call.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            prepared: config.prepare()?,
        })
    }

    /// Variable names this builder publishes, advertised to the host before
    /// the run so provisioners can reference them.
    pub fn generated_vars() -> &'static [&'static str] {
        &GENERATED_VARS
    }

    /// Polling knobs, exposed so tests can shrink the tick intervals.
    pub fn tuning_mut(&mut self) -> &mut crate::config::PollTuning {
        &mut self.prepared.tuning
    }

    /// Run the full workflow: allocate, build, capture, release.
    ///
    /// Cleanup runs for every started step even when a step fails; a created
    /// application is deallocated exactly once either way. Returns the first
    /// recorded error, or the artifact carrying the generated variables.
    pub async fn run(&self, hooks: Hooks) -> Result<Artifact> {
        self.run_with_cancel(hooks, std::future::pending()).await
    }

    /// Like [`Builder::run`], but stops forward progress once `cancel`
    /// resolves (host shutdown, an overall build deadline). The in-flight
    /// step fails as a timeout and the cleanup phase still executes, so a
    /// created application is deallocated exactly once regardless of how
    /// the run ends.
    pub async fn run_with_cancel(
        &self,
        hooks: Hooks,
        cancel: impl Future<Output = ()> + Send,
    ) -> Result<Artifact> {
        let config = Arc::new(self.prepared.clone());

        // Cleanup is registered first so its cleanup hook runs last.
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(CleanupStep::new(Arc::clone(&config))),
            Box::new(ConnectStep::new(Arc::clone(&config))),
            Box::new(FindLabelStep::new(Arc::clone(&config))),
            Box::new(CreateApplicationStep::new(Arc::clone(&config))),
            Box::new(WaitForAllocationStep::new(Arc::clone(&config))),
            Box::new(SetupSshStep::new(Arc::clone(&config))),
            Box::new(ConnectShellStep::new(Arc::clone(&hooks.shell))),
            Box::new(ProvisionStep::new(Arc::clone(&hooks.provisioner))),
            Box::new(CreateImageStep::new(Arc::clone(&config))),
        ];

        let mut state = BuildState::new();
        run_steps(&steps, &mut state, cancel).await;

        if let Some(err) = state.error.take() {
            tracing::error!(error = %err, "Build failed");
            return Err(err);
        }

        Ok(Artifact::new(state.generated.into_map()))
    }
}
