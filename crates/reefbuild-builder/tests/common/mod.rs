use reefbuild_builder::{Builder, Config, SshConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Replays a fixed list of responses in order, repeating the last one.
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty());
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.responses[i.min(self.responses.len() - 1)].clone()
    }
}

pub fn label_json(uid: &str, name: &str, version: i64) -> serde_json::Value {
    serde_json::json!({
        "UID": uid,
        "name": name,
        "version": version,
        "definitions": [
            {"driver": "vmx", "resources": {"cpu": 4, "ram": 8}}
        ]
    })
}

pub fn state_json(app_uid: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "UID": format!("state-{status}"),
        "application_UID": app_uid,
        "status": status,
        "description": format!("application is {status}")
    })
}

pub fn task_json(task_uid: &str, app_uid: &str, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "UID": task_uid,
        "application_UID": app_uid,
        "task": "TaskImage",
        "when": "DEALLOCATE",
        "result": result
    })
}

#[allow(dead_code)]
pub async fn mount_user(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/user/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "ci-bot"})),
        )
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_state_sequence(server: &MockServer, app_uid: &str, statuses: &[&str]) {
    let responses = statuses
        .iter()
        .map(|s| ResponseTemplate::new(200).set_body_json(state_json(app_uid, s)))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/application/{app_uid}/state")))
        .respond_with(SequenceResponder::new(responses))
        .mount(server)
        .await;
}

pub fn test_config(server: &MockServer) -> Config {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Config {
        endpoint: server.uri(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        label_name: "macos-builder".to_string(),
        connection_timeout: Some("5s".to_string()),
        allocation_timeout: Some("5s".to_string()),
        metadata: [("team".to_string(), "ci".into())].into_iter().collect(),
        ssh: SshConfig {
            transport: "ssh".to_string(),
            host: "198.51.100.7".to_string(),
            port: 2222,
        },
        ..Default::default()
    }
}

/// Builder with millisecond polling so tests finish quickly.
#[allow(dead_code)]
pub fn fast_builder(config: Config) -> Builder {
    let mut builder = Builder::new(config).unwrap();
    shrink(builder.tuning_mut());
    builder
}

pub fn shrink(tuning: &mut reefbuild_builder::PollTuning) {
    use std::time::Duration;
    tuning.allocation_interval = Duration::from_millis(20);
    tuning.access_interval = Duration::from_millis(20);
    tuning.image_interval = Duration::from_millis(20);
    tuning.image_timeout = Duration::from_secs(5);
    tuning.cleanup_grace = Duration::from_millis(10);
    tuning.cleanup_interval = Duration::from_millis(20);
    tuning.cleanup_timeout = Duration::from_millis(500);
}
