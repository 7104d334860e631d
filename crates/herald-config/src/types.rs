//! Configuration types for Herald.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker discovery.
    pub directory: DirectorySection,
    /// Broker handle resolution policy.
    pub connection: ConnectionSection,
    /// Subscription registration retry and QoS.
    pub registration: RegistrationSection,
    /// Delivery queue and dispatcher task.
    pub dispatch: DispatchSection,
    /// Topic catalog: topic name → interface type id of its publisher.
    pub topics: BTreeMap<String, String>,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// DirectorySection
// ---------------------------------------------------------------------------

/// How the broker manager is located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySection {
    /// Type id the broker manager advertises in the directory.
    pub broker_type_id: String,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            broker_type_id: "::IceStorm::TopicManager".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionSection
// ---------------------------------------------------------------------------

/// Whether broker handles are kept between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPolicy {
    /// Query the directory on every operation.
    #[default]
    Fresh,
    /// Keep the last broker handle until it fails or is invalidated.
    Sticky,
}

/// Broker connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    /// Resolution policy.
    pub policy: ConnectionPolicy,
}

// ---------------------------------------------------------------------------
// RegistrationSection
// ---------------------------------------------------------------------------

/// Subscription registration behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationSection {
    /// Whether re-registering an already subscribed endpoint is an error
    /// when the caller does not say otherwise.
    pub strict_default: bool,
    /// Retries after the first subscribe attempt on transient broker faults.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on a single retry delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Exponential growth factor between retries.
    pub backoff_base: f64,
    /// Jitter factor in `[0.0, 1.0]`.
    pub jitter: f64,
    /// Overall deadline for one registration, in milliseconds.
    pub timeout_ms: u64,
    /// Quality-of-service properties passed to the broker verbatim.
    pub qos: BTreeMap<String, String>,
}

impl Default for RegistrationSection {
    fn default() -> Self {
        Self {
            strict_default: false,
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            backoff_base: 2.0,
            jitter: 0.1,
            timeout_ms: 30_000,
            qos: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchSection
// ---------------------------------------------------------------------------

/// Dispatcher task settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Bounded queue capacity between producers and the dispatcher.
    pub queue_capacity: usize,
    /// Deliveries in flight at once. 1 keeps each producer's order.
    pub concurrency: usize,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            concurrency: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["herald_broker=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
