//! Capabilities Herald consumes from the directory and the broker.
//!
//! These traits are the only contact surface with the outside world.
//! Production code plugs in a real middleware binding; tests plug in
//! in-memory fakes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{ObjectRef, RemoteFault};

use crate::error::{SubscribeFault, TopicFault};

/// Quality-of-service properties passed to the broker on subscribe.
///
/// An empty map selects the broker's defaults.
pub type Qos = BTreeMap<String, String>;

/// Discovery service used to locate the broker manager.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every reachable object advertising `type_id`.
    async fn find_all_by_type(&self, type_id: &str) -> Result<Vec<ObjectRef>, RemoteFault>;

    /// Capability-checked narrowing of a candidate to a broker manager.
    ///
    /// Returns `Ok(None)` if the candidate does not implement the broker
    /// manager interface.
    async fn narrow_broker(
        &self,
        candidate: &ObjectRef,
    ) -> Result<Option<Arc<dyn BrokerManager>>, RemoteFault>;
}

/// The broker's topic manager.
#[async_trait]
pub trait BrokerManager: Send + Sync {
    /// Create a topic. Fails with [`TopicFault::AlreadyExists`] if the
    /// name is taken.
    async fn create(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault>;

    /// Retrieve a topic. Fails with [`TopicFault::NotFound`] if absent.
    async fn retrieve(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault>;
}

/// A topic hosted by the broker.
#[async_trait]
pub trait Topic: Send + Sync {
    /// Topic name.
    fn name(&self) -> &str;

    /// Subscribe `subscriber` and return the topic's publisher reference.
    async fn subscribe_and_get_publisher(
        &self,
        qos: &Qos,
        subscriber: &ObjectRef,
    ) -> Result<ObjectRef, SubscribeFault>;

    /// Remove `subscriber`. Fails with [`TopicFault::NotFound`] if it was
    /// not subscribed.
    async fn unsubscribe(&self, subscriber: &ObjectRef) -> Result<(), TopicFault>;

    /// Live publisher reference for pushing messages into the topic.
    async fn publisher(&self) -> Result<ObjectRef, RemoteFault>;
}
