//! Error types for broker operations.

use std::time::Duration;

use herald_core::{RemoteFault, Unavailable};
use thiserror::Error;

/// Fault reported by the broker manager or a topic handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicFault {
    /// `create` found a topic with this name.
    #[error("topic {0} already exists")]
    AlreadyExists(String),

    /// `retrieve` or `unsubscribe` found nothing under this name.
    #[error("topic {0} not found")]
    NotFound(String),

    /// Transport-level failure.
    #[error(transparent)]
    Remote(#[from] RemoteFault),
}

/// Fault reported by `subscribe_and_get_publisher`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeFault {
    /// The endpoint is already subscribed to the topic.
    #[error("endpoint already subscribed")]
    AlreadySubscribed,

    /// The broker rejected the quality-of-service settings.
    #[error("bad quality of service: {0}")]
    BadQos(String),

    /// The broker is failing over.
    #[error("broker temporarily unavailable")]
    TransientUnavailable,

    /// Older brokers report failover as an invalid subscriber.
    #[error("invalid subscriber (legacy failover signal)")]
    LegacyInvalidSubscriber,

    /// Transport-level failure.
    #[error(transparent)]
    Remote(#[from] RemoteFault),
}

impl SubscribeFault {
    /// Returns true if the subscribe call should be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientUnavailable | Self::LegacyInvalidSubscriber)
    }
}

/// Failure to obtain a topic handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    /// The broker could not be reached, or a broker call failed.
    #[error("broker unavailable: {0}")]
    Unavailable(#[from] Unavailable),

    /// The broker said the topic exists, then said it does not.
    ///
    /// The broker's own consistency is broken. Never retried.
    #[error("topic {topic} exists on create but is missing on retrieve")]
    RaceViolation {
        /// Topic being provisioned.
        topic: String,
    },
}

impl TopicError {
    /// Returns true if this is normal without a deployed broker.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Unavailable(reason) => reason.is_expected(),
            Self::RaceViolation { .. } => false,
        }
    }
}

/// Result type for topic operations.
pub type TopicResult<T> = Result<T, TopicError>;

/// Failure to register a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Strict registration found the endpoint already subscribed.
    #[error("{endpoint} is already subscribed to {topic}")]
    DuplicateSubscription {
        /// Topic name.
        topic: String,
        /// Subscriber reference.
        endpoint: String,
    },

    /// The endpoint's interface type is not in the interface registry.
    #[error("unknown subscriber type {type_id}")]
    UnknownSubscriberType {
        /// Declared type id of the endpoint.
        type_id: String,
    },

    /// The broker rejected the configured quality of service.
    #[error("configuration rejected for {topic}: {reason}")]
    ConfigurationFault {
        /// Topic name.
        topic: String,
        /// Broker's reason.
        reason: String,
    },

    /// The broker could not be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(#[from] Unavailable),

    /// Topic provisioning hit a broker consistency violation.
    #[error("topic {topic} exists on create but is missing on retrieve")]
    RaceViolation {
        /// Topic name.
        topic: String,
    },

    /// Every permitted attempt hit a transient fault.
    #[error("gave up subscribing to {topic} after {attempts} attempts")]
    RetriesExhausted {
        /// Topic name.
        topic: String,
        /// Attempts made.
        attempts: u32,
    },

    /// The registration deadline passed.
    #[error("subscribing to {topic} timed out after {after:?}")]
    Timeout {
        /// Topic name.
        topic: String,
        /// Configured deadline.
        after: Duration,
    },

    /// The caller cancelled the registration.
    #[error("subscribing to {topic} was cancelled after {attempts} attempts")]
    Cancelled {
        /// Topic name.
        topic: String,
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl From<TopicError> for RegisterError {
    fn from(err: TopicError) -> Self {
        match err {
            TopicError::Unavailable(reason) => Self::Unavailable(reason),
            TopicError::RaceViolation { topic } => Self::RaceViolation { topic },
        }
    }
}

/// Result type for registration.
pub type RegisterResult<T> = Result<T, RegisterError>;
