//! Delivery requests and their outcomes.

use herald_core::{ObjectRef, TopicName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DropReason;

/// Local stand-in for the remote object a request is aimed at.
///
/// Producers only know the interface type. The dispatcher binds the stub to
/// the topic's live publisher just before invoking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStub {
    type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<ObjectRef>,
}

impl TargetStub {
    /// Unbound stub for interface `type_id`.
    #[must_use]
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            reference: None,
        }
    }

    /// Interface type id.
    #[must_use]
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Bound remote reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&ObjectRef> {
        self.reference.as_ref()
    }

    /// Re-point the stub at `reference`, keeping its interface type.
    #[must_use]
    pub fn bind(mut self, reference: ObjectRef) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// A call to forward to a topic's publisher.
///
/// Consumed exactly once by the dispatcher, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    /// Component that produced the request.
    pub source: String,
    /// Topic whose publisher receives the call.
    pub topic: TopicName,
    /// Interface the call is aimed at.
    pub target: TargetStub,
    /// Method name.
    pub method: String,
    /// Call arguments.
    pub args: Vec<Value>,
}

impl DeliveryRequest {
    /// Create a request.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        topic: impl Into<TopicName>,
        target: TargetStub,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            source: source.into(),
            topic: topic.into(),
            target,
            method: method.into(),
            args,
        }
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// What happened to a delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The one-way call was handed to the transport.
    Delivered,
    /// The request was dropped.
    Dropped(DropReason),
}

impl DeliveryOutcome {
    /// Returns true if the call went out.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}
