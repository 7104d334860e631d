//! Race-safe topic provisioning.
//!
//! The broker is the only authority on which topics exist, and it offers
//! no transaction spanning `create` and `retrieve`. [`TopicRegistry`]
//! therefore tries `create` first and falls back to `retrieve` when the
//! name is taken. Any number of callers racing on one name end up with the
//! same logical topic. The one outcome that cannot be repaired is a topic
//! that `create` says exists and `retrieve` says does not; that is reported
//! as [`TopicError::RaceViolation`] and never retried.

use std::sync::Arc;

use herald_core::{ObjectRef, RemoteFault, TopicName, Unavailable};
use tracing::{debug, error, warn};

use crate::capability::{BrokerManager, Topic};
use crate::connection::BrokerConnection;
use crate::error::{TopicError, TopicFault, TopicResult};

/// Create-or-get access to broker topics.
#[derive(Clone)]
pub struct TopicRegistry {
    connection: Arc<BrokerConnection>,
}

impl TopicRegistry {
    /// Create a registry over a broker connection.
    #[must_use]
    pub fn new(connection: Arc<BrokerConnection>) -> Self {
        Self { connection }
    }

    /// The broker connection this registry resolves through.
    #[must_use]
    pub fn connection(&self) -> &Arc<BrokerConnection> {
        &self.connection
    }

    /// Get the topic called `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Unavailable`] if the broker cannot be reached
    /// and [`TopicError::RaceViolation`] if the broker contradicts itself.
    pub async fn get_or_create(&self, name: &TopicName) -> TopicResult<Arc<dyn Topic>> {
        let broker = self.connection.broker().await?;
        self.get_or_create_on(broker.as_ref(), name).await
    }

    /// Like [`get_or_create`](Self::get_or_create) against an already
    /// resolved broker.
    ///
    /// # Errors
    ///
    /// See [`get_or_create`](Self::get_or_create).
    pub async fn get_or_create_on(
        &self,
        broker: &dyn BrokerManager,
        name: &TopicName,
    ) -> TopicResult<Arc<dyn Topic>> {
        match broker.create(name.as_str()).await {
            Ok(topic) => {
                debug!(topic = %name, "created topic");
                return Ok(topic);
            },
            Err(TopicFault::AlreadyExists(_)) => {},
            Err(fault) => return Err(self.broker_fault(broker, name, fault)),
        }

        match broker.retrieve(name.as_str()).await {
            Ok(topic) => Ok(topic),
            Err(TopicFault::NotFound(_)) => {
                error!(
                    topic = %name,
                    "broker reported topic as existing on create but missing on retrieve"
                );
                Err(TopicError::RaceViolation {
                    topic: name.to_string(),
                })
            },
            Err(fault) => Err(self.broker_fault(broker, name, fault)),
        }
    }

    /// Get the topic called `name` without creating it.
    ///
    /// Returns `Ok(None)` if the broker has no such topic.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Unavailable`] if the broker cannot be reached.
    pub async fn lookup(&self, name: &TopicName) -> TopicResult<Option<Arc<dyn Topic>>> {
        let broker = self.connection.broker().await?;

        match broker.retrieve(name.as_str()).await {
            Ok(topic) => Ok(Some(topic)),
            Err(TopicFault::NotFound(_)) => Ok(None),
            Err(fault) => Err(self.broker_fault(broker.as_ref(), name, fault)),
        }
    }

    /// One-way publisher reference for the topic called `name`.
    ///
    /// # Errors
    ///
    /// See [`get_or_create`](Self::get_or_create).
    pub async fn publisher(&self, name: &TopicName) -> TopicResult<ObjectRef> {
        let broker = self.connection.broker().await?;
        self.publisher_on(broker.as_ref(), name).await
    }

    /// Like [`publisher`](Self::publisher) against an already resolved
    /// broker.
    ///
    /// # Errors
    ///
    /// See [`get_or_create`](Self::get_or_create).
    pub async fn publisher_on(
        &self,
        broker: &dyn BrokerManager,
        name: &TopicName,
    ) -> TopicResult<ObjectRef> {
        let topic = self.get_or_create_on(broker, name).await?;

        match topic.publisher().await {
            Ok(publisher) => Ok(publisher.oneway()),
            Err(fault) => Err(self.broker_fault(broker, name, TopicFault::Remote(fault))),
        }
    }

    fn broker_fault(
        &self,
        broker: &dyn BrokerManager,
        name: &TopicName,
        fault: TopicFault,
    ) -> TopicError {
        let fault = match fault {
            TopicFault::Remote(fault) => fault,
            other => RemoteFault::Unknown(other.to_string()),
        };

        if fault.is_expected() {
            debug!(topic = %name, error = %fault, "broker call failed");
        } else {
            warn!(topic = %name, error = %fault, "broker call failed");
        }

        self.connection.report_failure(broker, &fault);
        TopicError::Unavailable(Unavailable::Fault(fault))
    }
}
