//! Builder configuration
//!
//! All fields deserialize with defaults so that missing values surface as
//! [`ConfigError`]s from [`Config::prepare`], before any network call, rather
//! than as deserialization failures in the host's config layer.

use crate::error::ConfigError;
use reefbuild_client::model::MetaMap;
use serde::Deserialize;
use std::time::Duration;

/// Variable names published for downstream collaborators (provisioning
/// hooks, post-processing). Advertised by the builder before the run starts.
pub const GENERATED_VARS: [&str; 4] = ["ApplicationUID", "ResourceUID", "SSHHost", "SSHPort"];

const DEFAULT_CONNECTION_TIMEOUT: &str = "30m";
const DEFAULT_CONNECTION_RETRIES: u32 = 60;
const DEFAULT_ALLOCATION_TIMEOUT: &str = "10m";

/// Raw builder configuration, as supplied by the host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    // Fleet API connection settings
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    // Label selection
    #[serde(default)]
    pub label_name: String,
    #[serde(default)]
    pub label_version: Option<String>,

    // Timeout and retry settings (Go-style duration strings)
    #[serde(default)]
    pub connection_timeout: Option<String>,
    #[serde(default)]
    pub connection_retries: Option<u32>,
    #[serde(default)]
    pub allocation_timeout: Option<String>,

    /// Additional metadata passed through to the application.
    #[serde(default)]
    pub metadata: MetaMap,

    /// Remote-shell settings, used as the fallback endpoint when the
    /// service returns an unparsable address.
    #[serde(default)]
    pub ssh: SshConfig,
}

/// Remote-shell settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    /// Transport type; only "ssh" is meaningful to the default connector.
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Fallback host when the service-provided address is unparsable.
    #[serde(default)]
    pub host: String,

    /// Fallback port.
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

fn default_transport() -> String {
    "ssh".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            host: String::new(),
            port: default_ssh_port(),
        }
    }
}

impl Config {
    /// Validate required fields, apply defaults and parse duration strings.
    pub fn prepare(self) -> Result<PreparedConfig, ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingField("endpoint"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingField("password"));
        }
        if self.label_name.is_empty() {
            return Err(ConfigError::MissingField("label_name"));
        }

        let connection_timeout = parse_duration_field(
            "connection_timeout",
            self.connection_timeout.as_deref(),
            DEFAULT_CONNECTION_TIMEOUT,
        )?;
        let allocation_timeout = parse_duration_field(
            "allocation_timeout",
            self.allocation_timeout.as_deref(),
            DEFAULT_ALLOCATION_TIMEOUT,
        )?;
        let connection_retries = match self.connection_retries {
            Some(n) if n > 0 => n,
            _ => DEFAULT_CONNECTION_RETRIES,
        };

        Ok(PreparedConfig {
            config: self,
            connection_timeout,
            connection_retries,
            allocation_timeout,
            tuning: PollTuning::default(),
        })
    }
}

/// Validated configuration with parsed budgets, ready to drive a run.
#[derive(Debug, Clone)]
pub struct PreparedConfig {
    pub config: Config,
    pub connection_timeout: Duration,
    pub connection_retries: u32,
    pub allocation_timeout: Duration,
    pub tuning: PollTuning,
}

/// Tick intervals and fixed budgets for the polling loops.
///
/// Production values match the observed service cadence; tests shrink them.
#[derive(Debug, Clone)]
pub struct PollTuning {
    /// Deadline for the initial identity probe.
    pub connect_probe_timeout: Duration,
    /// Status poll tick while waiting for allocation.
    pub allocation_interval: Duration,
    /// Access poll tick while waiting for SSH credentials.
    pub access_interval: Duration,
    /// Task poll tick while waiting for image capture.
    pub image_interval: Duration,
    /// Overall image capture budget.
    pub image_timeout: Duration,
    /// Pause between the deallocate request and the first status check.
    pub cleanup_grace: Duration,
    /// Status poll tick during cleanup.
    pub cleanup_interval: Duration,
    /// Overall best-effort cleanup budget.
    pub cleanup_timeout: Duration,
}

impl Default for PollTuning {
    fn default() -> Self {
        Self {
            connect_probe_timeout: Duration::from_secs(30),
            allocation_interval: Duration::from_secs(5),
            access_interval: Duration::from_secs(10),
            image_interval: Duration::from_secs(15),
            image_timeout: Duration::from_secs(30 * 60),
            cleanup_grace: Duration::from_secs(5),
            cleanup_interval: Duration::from_secs(10),
            cleanup_timeout: Duration::from_secs(2 * 60),
        }
    }
}

fn parse_duration_field(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<Duration, ConfigError> {
    let raw = match value {
        Some(v) if !v.is_empty() => v,
        _ => default,
    };
    parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: raw.to_string(),
    })
}

/// Parse a Go-style duration string: one or more `<number><unit>` segments
/// with units `ms`, `s`, `m`, `h` (e.g. "30m", "90s", "1h30m", "1.5h").
pub fn parse_duration(input: &str) -> Option<Duration> {
    let bytes = input.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut total = Duration::ZERO;
    let mut i = 0;
    while i < bytes.len() {
        let num_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            i += 1;
        }
        let value: f64 = input[num_start..i].parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let unit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let secs = match &input[unit_start..i] {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return None,
        };
        // An absurd-but-parseable value must stay a parse failure, never a
        // panic in the duration arithmetic.
        let segment = Duration::try_from_secs_f64(secs).ok()?;
        total = total.checked_add(segment)?;
    }
    Some(total)
}
