//! HTTP client for the fleet-management service
//!
//! Thin typed facade: one method per remote capability, basic auth injected
//! into every request, per-request timeout configured on the underlying
//! reqwest client. Non-2xx responses surface as [`ClientError::Api`] with
//! the status and body preserved; malformed bodies surface as
//! [`ClientError::Decode`].

use crate::error::{ClientError, Result};
use crate::model::{
    Application, ApplicationResource, ApplicationState, ApplicationTask, Label, NewApplication,
    NewApplicationTask, ResourceAccess, ServerEvent, UserInfo,
};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Transport options for [`FleetClient::new`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Deadline applied to every individual request.
    pub request_timeout: Duration,

    /// Skip TLS certificate verification (self-signed test deployments).
    pub insecure_skip_verify: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            insecure_skip_verify: false,
        }
    }
}

/// Typed client for the fleet service API.
pub struct FleetClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for FleetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl FleetClient {
    /// Build a client against `base_url`, normalizing a trailing slash.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ClientError::InvalidBaseUrl(format!(
                "{base_url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.insecure_skip_verify)
            .build()?;

        let base_url = parsed.as_str().trim_end_matches('/').to_string();
        tracing::debug!(endpoint = %base_url, "fleet client initialized");

        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    /// The normalized endpoint this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Identity probe; doubles as the connectivity check.
    pub async fn get_current_user(&self) -> Result<UserInfo> {
        let resp = self.get("/api/v1/user/me").send().await?;
        decode(resp).await
    }

    /// List labels filtered by name and optionally a version selector
    /// (an exact integer or "last" for the newest set).
    pub async fn get_labels(&self, name: &str, version: Option<&str>) -> Result<Vec<Label>> {
        let mut req = self.get("/api/v1/label/").query(&[("name", name)]);
        if let Some(version) = version {
            req = req.query(&[("version", version)]);
        }
        decode(req.send().await?).await
    }

    /// Submit an application (allocation request) for a label.
    pub async fn create_application(&self, app: &NewApplication) -> Result<Application> {
        let resp = self.post("/api/v1/application/").json(app).send().await?;
        decode(resp).await
    }

    /// Current lifecycle state of an application.
    pub async fn get_application_state(&self, app_uid: &str) -> Result<ApplicationState> {
        let resp = self
            .get(&format!("/api/v1/application/{app_uid}/state"))
            .send()
            .await?;
        decode(resp).await
    }

    /// The concrete resource backing an application.
    ///
    /// `Ok(None)` while the resource does not exist yet; this is expected
    /// right after the application reaches ALLOCATED.
    pub async fn get_application_resource(
        &self,
        app_uid: &str,
    ) -> Result<Option<ApplicationResource>> {
        let resp = self
            .get(&format!("/api/v1/application/{app_uid}/resource"))
            .send()
            .await?;
        decode_opt(resp).await
    }

    /// Connection credentials for a resource, requested as multi-use so the
    /// remote-shell connector can reconnect with the same grant.
    ///
    /// `Ok(None)` while access has not been published yet.
    pub async fn get_resource_access(&self, resource_uid: &str) -> Result<Option<ResourceAccess>> {
        let resp = self
            .get(&format!("/api/v1/applicationresource/{resource_uid}/access"))
            .query(&[("one_time", "false")])
            .send()
            .await?;
        decode_opt(resp).await
    }

    /// Ask the service to tear down an application's resource.
    pub async fn deallocate_application(&self, app_uid: &str) -> Result<()> {
        let resp = self
            .get(&format!("/api/v1/application/{app_uid}/deallocate"))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Attach an asynchronous task to an application.
    pub async fn create_application_task(
        &self,
        app_uid: &str,
        task: &NewApplicationTask,
    ) -> Result<ApplicationTask> {
        let resp = self
            .post(&format!("/api/v1/application/{app_uid}/task/"))
            .json(task)
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch a task by uid; `result` stays empty until the task has run.
    pub async fn get_application_task(&self, task_uid: &str) -> Result<ApplicationTask> {
        let resp = self.get(&format!("/api/v1/task/{task_uid}")).send().await?;
        decode(resp).await
    }

    /// Open the advisory change-subscription stream.
    ///
    /// The stream yields newline-delimited JSON events for the requested
    /// object kinds and ends silently on any transport or decode problem.
    /// Nothing in the build workflow depends on it; the polling loops are
    /// authoritative.
    pub async fn subscribe(
        &self,
        kinds: &[&str],
    ) -> Result<impl Stream<Item = ServerEvent> + Send + 'static> {
        let query: Vec<(&str, &str)> = kinds.iter().map(|k| ("type", *k)).collect();
        let resp = self.get("/api/v1/subscribe").query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes_stream();
        Ok(futures_util::stream::unfold(
            (bytes, Vec::new()),
            |(mut bytes, mut buf)| async move {
                loop {
                    if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        match serde_json::from_slice::<ServerEvent>(&line) {
                            Ok(event) => return Some((event, (bytes, buf))),
                            Err(_) => continue,
                        }
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                        _ => return None,
                    }
                }
            },
        ))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{path}", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{path}", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Like [`decode`], but an HTTP 404 means "does not exist yet".
async fn decode_opt<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Option<T>> {
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    decode(resp).await.map(Some)
}
