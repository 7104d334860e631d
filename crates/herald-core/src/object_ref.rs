//! Opaque remote references and topic names.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// How calls through a reference are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// Request/response: the caller waits for a reply.
    #[default]
    Twoway,
    /// Fire-and-forget: no reply, no acknowledgement.
    Oneway,
}

/// Opaque handle to a remote object.
///
/// Carries the object's identity, the interface type id it advertises,
/// an optional stringified endpoint and the invocation mode. Nothing in
/// Herald interprets the endpoint; it only travels to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    identity: String,
    type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(default)]
    mode: InvocationMode,
}

impl ObjectRef {
    /// Create a two-way reference with no endpoint.
    #[must_use]
    pub fn new(identity: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            type_id: type_id.into(),
            endpoint: None,
            mode: InvocationMode::Twoway,
        }
    }

    /// Attach an endpoint string.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Same reference, switched to one-way invocation.
    #[must_use]
    pub fn oneway(mut self) -> Self {
        self.mode = InvocationMode::Oneway;
        self
    }

    /// Object identity.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Interface type id as advertised by the remote side.
    #[must_use]
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Interface type id in dotted form, see [`normalize_type_id`].
    #[must_use]
    pub fn normalized_type_id(&self) -> String {
        normalize_type_id(&self.type_id)
    }

    /// Endpoint string, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Invocation mode.
    #[must_use]
    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    /// Returns true if calls through this reference are fire-and-forget.
    #[must_use]
    pub fn is_oneway(&self) -> bool {
        self.mode == InvocationMode::Oneway
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)?;
        if self.is_oneway() {
            write!(f, " -o")?;
        }
        if let Some(endpoint) = &self.endpoint {
            write!(f, ":{endpoint}")?;
        }
        Ok(())
    }
}

/// Convert a scoped interface type id to dotted form.
///
/// `"::demo::ProgressListener"` and `"demo.ProgressListener"` both become
/// `"demo.ProgressListener"`, so registries can be keyed on either spelling.
#[must_use]
pub fn normalize_type_id(type_id: &str) -> String {
    let trimmed = type_id.trim();
    let trimmed = trimmed.strip_prefix("::").unwrap_or(trimmed);
    trimmed.replace("::", ".")
}

/// Name of a broker topic.
///
/// Cheap to clone; delivery requests carry one across task boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicName(Arc<str>);

impl TopicName {
    /// Create a topic name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TopicName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}
