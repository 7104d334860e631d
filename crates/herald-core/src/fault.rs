//! Transport-level faults and broker unavailability.

use thiserror::Error;

/// Fault raised by a remote call before any application-level reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFault {
    /// The reference has no endpoint that can be reached.
    ///
    /// Expected in disconnected and test environments.
    #[error("no reachable endpoint")]
    NoEndpoint,

    /// The local communicator has been shut down.
    #[error("communicator destroyed")]
    Destroyed,

    /// The call did not complete in time.
    #[error("remote call timed out")]
    Timeout,

    /// Any other fault reported by the remote side or the transport.
    #[error("remote fault: {0}")]
    Unknown(String),
}

impl RemoteFault {
    /// Returns true for faults that are normal when no broker is deployed.
    ///
    /// These are logged at debug rather than warn.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoEndpoint | Self::Destroyed)
    }
}

/// Why the broker manager could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    /// The directory knows no instance of the broker type.
    #[error("no broker advertising {type_id}")]
    NoCandidates {
        /// Type id that was queried.
        type_id: String,
    },

    /// More than one instance answered; Herald never picks one.
    #[error("{count} brokers advertising {type_id}, refusing to choose")]
    Ambiguous {
        /// Type id that was queried.
        type_id: String,
        /// Number of candidates returned.
        count: usize,
    },

    /// The single candidate is not a broker manager.
    #[error("candidate {identity} is not a broker manager")]
    NarrowFailed {
        /// Identity of the rejected candidate.
        identity: String,
    },

    /// The directory or broker call failed.
    #[error(transparent)]
    Fault(#[from] RemoteFault),
}

impl Unavailable {
    /// Returns true if this condition is normal without a deployed broker.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Fault(fault) => fault.is_expected(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_faults() {
        assert!(RemoteFault::NoEndpoint.is_expected());
        assert!(RemoteFault::Destroyed.is_expected());
        assert!(!RemoteFault::Timeout.is_expected());
        assert!(!RemoteFault::Unknown("boom".into()).is_expected());
    }

    #[test]
    fn test_unavailable_display() {
        let err = Unavailable::Ambiguous {
            type_id: "::IceStorm::TopicManager".into(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "2 brokers advertising ::IceStorm::TopicManager, refusing to choose"
        );

        let err = Unavailable::from(RemoteFault::NoEndpoint);
        assert_eq!(err.to_string(), "no reachable endpoint");
        assert!(err.is_expected());
    }
}
