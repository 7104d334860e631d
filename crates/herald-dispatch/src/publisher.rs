//! Producer-side handle.

use std::sync::Arc;

use herald_core::TopicName;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

use crate::catalog::TopicCatalog;
use crate::request::{DeliveryRequest, TargetStub};

/// Hands delivery requests to the dispatcher task.
///
/// Cheap to clone. Never blocks and never reports failure: a full queue or
/// a stopped dispatcher drops the request with a warning.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<DeliveryRequest>,
    catalog: Arc<TopicCatalog>,
}

impl EventPublisher {
    pub(crate) fn new(tx: mpsc::Sender<DeliveryRequest>, catalog: Arc<TopicCatalog>) -> Self {
        Self { tx, catalog }
    }

    /// Forward `method(args)` to the publisher of `topic`, aimed at `target`.
    pub fn publish(
        &self,
        source: impl Into<String>,
        topic: impl Into<TopicName>,
        target: TargetStub,
        method: impl Into<String>,
        args: Vec<Value>,
    ) {
        self.publish_request(DeliveryRequest::new(source, topic, target, method, args));
    }

    /// Like [`publish`](Self::publish), taking the target interface from the
    /// topic catalog.
    pub fn publish_event(
        &self,
        source: impl Into<String>,
        topic: impl Into<TopicName>,
        method: impl Into<String>,
        args: Vec<Value>,
    ) {
        let topic = topic.into();
        let Some(type_id) = self.catalog.interface_for(&topic) else {
            warn!(topic = %topic, "no interface configured for topic, dropping event");
            return;
        };
        let target = TargetStub::new(type_id);
        self.publish(source, topic, target, method, args);
    }

    /// Queue a prepared request.
    pub fn publish_request(&self, request: DeliveryRequest) {
        match self.tx.try_send(request) {
            Ok(()) => trace!("delivery request queued"),
            Err(TrySendError::Full(request)) => {
                warn!(
                    topic = %request.topic,
                    method = %request.method,
                    source = %request.source,
                    "delivery queue full, dropping request"
                );
            },
            Err(TrySendError::Closed(request)) => {
                warn!(
                    topic = %request.topic,
                    method = %request.method,
                    source = %request.source,
                    "dispatcher stopped, dropping request"
                );
            },
        }
    }

    /// Returns true once the dispatcher has stopped accepting requests.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
