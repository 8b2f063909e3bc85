//! External collaborator boundary
//!
//! The remote-shell transport and the provisioning hook are host concerns;
//! the workflow only defines the seam. Both receive the resolved SSH
//! endpoint plus an [`AccessFetcher`] so they can pull fresh credentials for
//! every connection — the service rotates them, so nothing is cached here.

use async_trait::async_trait;
use reefbuild_client::{FleetClient, ResourceAccess};
use std::sync::Arc;

/// Resolved remote-shell endpoint for a build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for SshEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Fetches current connection credentials for one resource.
#[derive(Clone)]
pub struct AccessFetcher {
    client: Arc<FleetClient>,
    resource_uid: String,
}

impl AccessFetcher {
    pub fn new(client: Arc<FleetClient>, resource_uid: impl Into<String>) -> Self {
        Self {
            client,
            resource_uid: resource_uid.into(),
        }
    }

    /// Current credentials; `None` while the service has none published.
    pub async fn fetch(&self) -> reefbuild_client::Result<Option<ResourceAccess>> {
        self.client.get_resource_access(&self.resource_uid).await
    }
}

/// Remote-shell connector: establishes the secondary channel to the target.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn connect(&self, endpoint: &SshEndpoint, access: &AccessFetcher) -> anyhow::Result<()>;
}

/// Provisioning hook: runs the host's provisioning commands on the target.
#[async_trait]
pub trait ProvisionHook: Send + Sync {
    async fn provision(&self, endpoint: &SshEndpoint, access: &AccessFetcher)
    -> anyhow::Result<()>;
}

/// Connector that does nothing; used when the host brings its own transport.
pub struct NoopShell;

#[async_trait]
impl RemoteShell for NoopShell {
    async fn connect(&self, endpoint: &SshEndpoint, _access: &AccessFetcher) -> anyhow::Result<()> {
        tracing::debug!(%endpoint, "no-op shell connector, skipping connect");
        Ok(())
    }
}

/// Hook that provisions nothing.
pub struct NoopProvisioner;

#[async_trait]
impl ProvisionHook for NoopProvisioner {
    async fn provision(
        &self,
        endpoint: &SshEndpoint,
        _access: &AccessFetcher,
    ) -> anyhow::Result<()> {
        tracing::debug!(%endpoint, "no-op provisioner, nothing to run");
        Ok(())
    }
}

/// The pair of external collaborators a run delegates to.
#[derive(Clone)]
pub struct Hooks {
    pub shell: Arc<dyn RemoteShell>,
    pub provisioner: Arc<dyn ProvisionHook>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            shell: Arc::new(NoopShell),
            provisioner: Arc::new(NoopProvisioner),
        }
    }
}
