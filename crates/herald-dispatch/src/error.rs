//! Why a delivery was dropped.

use herald_core::{RemoteFault, Unavailable};
use thiserror::Error;

/// Reason a delivery request was dropped.
///
/// Never returned to a producer; carried in
/// [`DeliveryOutcome`](crate::DeliveryOutcome) for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    /// The broker manager could not be resolved.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(Unavailable),

    /// The topic or its publisher could not be obtained.
    #[error("topic {topic} unavailable: {reason}")]
    TopicUnavailable {
        /// Topic name.
        topic: String,
        /// Underlying reason.
        reason: Unavailable,
    },

    /// The broker contradicted itself while provisioning the topic.
    #[error("topic {topic} exists on create but is missing on retrieve")]
    RaceViolation {
        /// Topic name.
        topic: String,
    },

    /// The target's interface is not in the interface registry.
    #[error("unknown interface {type_id}")]
    UnknownInterface {
        /// Target type id.
        type_id: String,
    },

    /// No operation matches the method name and argument count.
    #[error("no operation {method}/{arity} on {type_id}")]
    NotFound {
        /// Target type id.
        type_id: String,
        /// Requested method.
        method: String,
        /// Argument count.
        arity: usize,
    },

    /// More than one operation matches; Herald never picks one.
    #[error("{candidates} operations match {method}/{arity} on {type_id}")]
    Ambiguous {
        /// Target type id.
        type_id: String,
        /// Requested method.
        method: String,
        /// Argument count.
        arity: usize,
        /// Number of matching operations.
        candidates: usize,
    },

    /// The arguments do not fit the matched operation's signature.
    #[error("invalid arguments for {method}: {reason}")]
    InvalidArguments {
        /// Matched method.
        method: String,
        /// Decoder message.
        reason: String,
    },

    /// The one-way call failed to go out.
    #[error("invocation failed: {0}")]
    InvocationFailed(RemoteFault),
}
