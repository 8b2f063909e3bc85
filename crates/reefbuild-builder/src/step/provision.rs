//! External collaborator steps: remote-shell connect and provisioning hook

use crate::error::{BuildError, Result};
use crate::hook::{AccessFetcher, ProvisionHook, RemoteShell, SshEndpoint};
use crate::state::BuildState;
use crate::step::Step;
use async_trait::async_trait;
use std::sync::Arc;

fn endpoint_and_access(state: &BuildState) -> Result<(SshEndpoint, AccessFetcher)> {
    let client = state.client()?;
    let resource = state
        .resource
        .as_ref()
        .ok_or(BuildError::StateMissing("application resource"))?;
    let host = state
        .generated
        .ssh_host
        .clone()
        .ok_or(BuildError::StateMissing("ssh host"))?;
    let port = state
        .generated
        .ssh_port
        .ok_or(BuildError::StateMissing("ssh port"))?;

    Ok((
        SshEndpoint { host, port },
        AccessFetcher::new(client, resource.uid.clone()),
    ))
}

/// Hands the resolved endpoint to the external remote-shell connector.
pub struct ConnectShellStep {
    shell: Arc<dyn RemoteShell>,
}

impl ConnectShellStep {
    pub fn new(shell: Arc<dyn RemoteShell>) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl Step for ConnectShellStep {
    fn name(&self) -> &'static str {
        "connect-shell"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let (endpoint, access) = endpoint_and_access(state)?;
        tracing::info!(%endpoint, "Connecting remote shell");
        self.shell
            .connect(&endpoint, &access)
            .await
            .map_err(BuildError::Hook)
    }
}

/// Delegates to the external provisioning hook.
pub struct ProvisionStep {
    provisioner: Arc<dyn ProvisionHook>,
}

impl ProvisionStep {
    pub fn new(provisioner: Arc<dyn ProvisionHook>) -> Self {
        Self { provisioner }
    }
}

#[async_trait]
impl Step for ProvisionStep {
    fn name(&self) -> &'static str {
        "provision"
    }

    async fn run(&self, state: &mut BuildState) -> Result<()> {
        let (endpoint, access) = endpoint_and_access(state)?;
        tracing::info!(%endpoint, "Running provisioning hook");
        self.provisioner
            .provision(&endpoint, &access)
            .await
            .map_err(BuildError::Hook)
    }
}
