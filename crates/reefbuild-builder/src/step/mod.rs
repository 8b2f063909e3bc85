//! Step sequence and runner
//!
//! Each step exposes an execute/cleanup pair. The runner executes steps
//! strictly in order, halts forward progress on the first error, and then
//! unconditionally runs the cleanup of every step that started, in reverse
//! order. Cleanup never raises; whatever it hits is logged so it can never
//! shadow the primary error.

use crate::error::{BuildError, Result};
use crate::state::BuildState;
use async_trait::async_trait;
use std::future::Future;
use tokio::time::Instant;

mod cleanup;
mod connect;
mod create_application;
mod create_image;
mod find_label;
mod provision;
mod setup_ssh;
mod wait_allocation;

pub use cleanup::CleanupStep;
pub use connect::ConnectStep;
pub use create_application::CreateApplicationStep;
pub use create_image::CreateImageStep;
pub use find_label::FindLabelStep;
pub use provision::{ConnectShellStep, ProvisionStep};
pub use setup_ssh::SetupSshStep;
pub use wait_allocation::WaitForAllocationStep;

/// One stage of the build workflow.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    /// Forward action. An `Err` halts the sequence.
    async fn run(&self, state: &mut BuildState) -> Result<()>;

    /// Teardown action, invoked in reverse order for every started step.
    async fn cleanup(&self, _state: &mut BuildState) {}
}

/// Run `steps` in order against `state`.
///
/// The first error is stored in `state.error` and stops forward progress;
/// afterwards the cleanup of every started step (the failed one included)
/// runs in reverse order. When `cancel` resolves, the in-flight step fails
/// as a timeout and the cleanup phase still runs — cancellation must never
/// skip teardown.
pub async fn run_steps(
    steps: &[Box<dyn Step>],
    state: &mut BuildState,
    cancel: impl Future<Output = ()> + Send,
) {
    let started_at = Instant::now();
    tokio::pin!(cancel);
    let mut started = 0;
    for step in steps {
        started += 1;
        tracing::debug!(step = step.name(), "executing step");
        let result = tokio::select! {
            _ = &mut cancel => {
                tracing::warn!(step = step.name(), "build cancelled");
                Err(BuildError::Timeout {
                    what: "build",
                    after: started_at.elapsed(),
                })
            }
            result = step.run(state) => result,
        };
        if let Err(err) = result {
            tracing::error!(step = step.name(), error = %err, "step failed, halting");
            state.error = Some(err);
            break;
        }
    }

    for step in steps[..started].iter().rev() {
        tracing::debug!(step = step.name(), "running step cleanup");
        step.cleanup(state).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Scripted {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Step for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _state: &mut BuildState) -> Result<()> {
            self.log.lock().unwrap().push(format!("run:{}", self.name));
            if self.fail {
                Err(BuildError::Timeout {
                    what: "scripted",
                    after: Duration::ZERO,
                })
            } else {
                Ok(())
            }
        }

        async fn cleanup(&self, _state: &mut BuildState) {
            self.log.lock().unwrap().push(format!("cleanup:{}", self.name));
        }
    }

    fn scripted(
        log: &Arc<Mutex<Vec<String>>>,
        name: &'static str,
        fail: bool,
    ) -> Box<dyn Step> {
        Box::new(Scripted {
            name,
            fail,
            log: Arc::clone(log),
        })
    }

    #[tokio::test]
    async fn cleanup_runs_in_reverse_for_started_steps_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            scripted(&log, "a", false),
            scripted(&log, "b", true),
            scripted(&log, "c", false),
        ];
        let mut state = BuildState::new();

        run_steps(&steps, &mut state, std::future::pending()).await;

        assert!(state.error.is_some());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["run:a", "run:b", "cleanup:b", "cleanup:a"]
        );
    }

    #[tokio::test]
    async fn full_sequence_cleans_up_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![scripted(&log, "a", false), scripted(&log, "b", false)];
        let mut state = BuildState::new();

        run_steps(&steps, &mut state, std::future::pending()).await;

        assert!(state.error.is_none());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["run:a", "run:b", "cleanup:b", "cleanup:a"]
        );
    }

    struct Stalled {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Step for Stalled {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn run(&self, _state: &mut BuildState) -> Result<()> {
            self.log.lock().unwrap().push("run:stalled".to_string());
            std::future::pending().await
        }

        async fn cleanup(&self, _state: &mut BuildState) {
            self.log.lock().unwrap().push("cleanup:stalled".to_string());
        }
    }

    #[tokio::test]
    async fn cancellation_fails_the_inflight_step_but_still_cleans_up() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            scripted(&log, "a", false),
            Box::new(Stalled {
                log: Arc::clone(&log),
            }) as Box<dyn Step>,
            scripted(&log, "never", false),
        ];
        let mut state = BuildState::new();

        run_steps(&steps, &mut state, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        })
        .await;

        assert!(matches!(
            state.error,
            Some(BuildError::Timeout { what: "build", .. })
        ));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["run:a", "run:stalled", "cleanup:stalled", "cleanup:a"]
        );
    }
}
