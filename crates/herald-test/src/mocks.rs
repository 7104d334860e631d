//! Mock implementations of the directory, broker and transport.
//!
//! All mocks use interior mutability so a test can script and inspect them
//! through the same `Arc` it hands to Herald.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use herald_broker::{BrokerManager, Directory, Qos, SubscribeFault, Topic, TopicFault};
use herald_core::{ObjectRef, RemoteFault, normalize_type_id};
use herald_dispatch::Transport;
use serde_json::Value;

use crate::fixtures::BROKER_TYPE_ID;

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// In-memory discovery service.
#[derive(Default)]
pub struct MockDirectory {
    candidates: Mutex<Vec<ObjectRef>>,
    brokers: DashMap<String, Arc<MockBroker>>,
    fault: Mutex<Option<RemoteFault>>,
    hanging: AtomicBool,
    queries: AtomicUsize,
}

impl MockDirectory {
    /// Create a directory with no candidates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory advertising a single broker.
    #[must_use]
    pub fn with_broker(broker: Arc<MockBroker>) -> Self {
        let directory = Self::new();
        directory.add_broker(broker);
        directory
    }

    /// Advertise another broker manager.
    pub fn add_broker(&self, broker: Arc<MockBroker>) {
        let identity = format!("broker-{}", self.brokers.len());
        self.brokers.insert(identity.clone(), broker);
        if let Ok(mut candidates) = self.candidates.lock() {
            candidates.push(ObjectRef::new(identity, BROKER_TYPE_ID));
        }
    }

    /// Advertise a candidate that fails narrowing.
    pub fn add_impostor(&self, identity: impl Into<String>) {
        if let Ok(mut candidates) = self.candidates.lock() {
            candidates.push(ObjectRef::new(identity, BROKER_TYPE_ID));
        }
    }

    /// Remove every candidate.
    pub fn clear(&self) {
        self.brokers.clear();
        if let Ok(mut candidates) = self.candidates.lock() {
            candidates.clear();
        }
    }

    /// Make every query fail with `fault`, or stop failing with `None`.
    pub fn set_fault(&self, fault: Option<RemoteFault>) {
        if let Ok(mut guard) = self.fault.lock() {
            *guard = fault;
        }
    }

    /// Make every query wait forever, or answer again with `false`.
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    /// Number of `find_all_by_type` calls so far.
    #[must_use]
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn find_all_by_type(&self, type_id: &str) -> Result<Vec<ObjectRef>, RemoteFault> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if let Some(fault) = self.fault.lock().ok().and_then(|guard| guard.clone()) {
            return Err(fault);
        }

        let wanted = normalize_type_id(type_id);
        Ok(self
            .candidates
            .lock()
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|c| c.normalized_type_id() == wanted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn narrow_broker(
        &self,
        candidate: &ObjectRef,
    ) -> Result<Option<Arc<dyn BrokerManager>>, RemoteFault> {
        Ok(self
            .brokers
            .get(candidate.identity())
            .map(|broker| Arc::clone(broker.value()) as Arc<dyn BrokerManager>))
    }
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

/// In-memory broker manager.
///
/// Topic creation is atomic per name, so concurrent creators race the way
/// they would against a real broker.
#[derive(Default)]
pub struct MockBroker {
    topics: DashMap<String, Arc<MockTopic>>,
    vanishing: DashSet<String>,
    fault: Mutex<Option<RemoteFault>>,
    creates: AtomicUsize,
}

impl MockBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a topic directly, bypassing Herald.
    pub fn ensure_topic(&self, name: &str) -> Arc<MockTopic> {
        Arc::clone(
            self.topics
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(MockTopic::new(name)))
                .value(),
        )
    }

    /// Look at a topic without creating it.
    #[must_use]
    pub fn topic(&self, name: &str) -> Option<Arc<MockTopic>> {
        self.topics.get(name).map(|t| Arc::clone(t.value()))
    }

    /// Number of topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of successful `create` calls.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Simulate a topic deleted between `create` and `retrieve`: create
    /// reports it as existing, retrieve reports it as missing.
    pub fn simulate_vanishing_topic(&self, name: &str) {
        self.vanishing.insert(name.to_owned());
    }

    /// Make every call fail with `fault`, or stop failing with `None`.
    pub fn set_fault(&self, fault: Option<RemoteFault>) {
        if let Ok(mut guard) = self.fault.lock() {
            *guard = fault;
        }
    }

    fn current_fault(&self) -> Option<RemoteFault> {
        self.fault.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl BrokerManager for MockBroker {
    async fn create(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault> {
        // Let concurrent creators interleave.
        tokio::task::yield_now().await;

        if let Some(fault) = self.current_fault() {
            return Err(fault.into());
        }
        if self.vanishing.contains(name) {
            return Err(TopicFault::AlreadyExists(name.to_owned()));
        }

        match self.topics.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(TopicFault::AlreadyExists(name.to_owned())),
            Entry::Vacant(slot) => {
                self.creates.fetch_add(1, Ordering::SeqCst);
                let topic = Arc::new(MockTopic::new(name));
                slot.insert(Arc::clone(&topic));
                Ok(topic)
            },
        }
    }

    async fn retrieve(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault> {
        if let Some(fault) = self.current_fault() {
            return Err(fault.into());
        }
        if self.vanishing.contains(name) {
            return Err(TopicFault::NotFound(name.to_owned()));
        }

        self.topic(name)
            .map(|topic| topic as Arc<dyn Topic>)
            .ok_or_else(|| TopicFault::NotFound(name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// In-memory topic with scripted subscribe responses.
pub struct MockTopic {
    name: String,
    script: Mutex<VecDeque<SubscribeFault>>,
    subscribers: DashMap<String, ObjectRef>,
    last_qos: Mutex<Option<Qos>>,
    attempts: AtomicU32,
}

impl MockTopic {
    /// Create a topic.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            script: Mutex::new(VecDeque::new()),
            subscribers: DashMap::new(),
            last_qos: Mutex::new(None),
            attempts: AtomicU32::new(0),
        }
    }

    /// Queue faults for the next subscribe calls, in order.
    pub fn script(&self, faults: impl IntoIterator<Item = SubscribeFault>) {
        if let Ok(mut script) = self.script.lock() {
            script.extend(faults);
        }
    }

    /// Subscribe calls received so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns true if an endpoint with this identity is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, identity: &str) -> bool {
        self.subscribers.contains_key(identity)
    }

    /// Number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// QoS passed with the last subscribe call.
    #[must_use]
    pub fn last_qos(&self) -> Option<Qos> {
        self.last_qos.lock().ok().and_then(|guard| guard.clone())
    }

    /// The publisher reference this topic hands out.
    #[must_use]
    pub fn publisher_ref(&self) -> ObjectRef {
        ObjectRef::new(format!("{}.publisher", self.name), "::IceStorm::Topic")
            .with_endpoint("tcp -h 127.0.0.1 -p 10000")
    }
}

#[async_trait]
impl Topic for MockTopic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe_and_get_publisher(
        &self,
        qos: &Qos,
        subscriber: &ObjectRef,
    ) -> Result<ObjectRef, SubscribeFault> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_qos.lock() {
            *last = Some(qos.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        if let Some(fault) = scripted {
            return Err(fault);
        }

        match self.subscribers.entry(subscriber.identity().to_owned()) {
            Entry::Occupied(_) => Err(SubscribeFault::AlreadySubscribed),
            Entry::Vacant(slot) => {
                slot.insert(subscriber.clone());
                Ok(self.publisher_ref())
            },
        }
    }

    async fn unsubscribe(&self, subscriber: &ObjectRef) -> Result<(), TopicFault> {
        self.subscribers
            .remove(subscriber.identity())
            .map(|_| ())
            .ok_or_else(|| TopicFault::NotFound(subscriber.identity().to_owned()))
    }

    async fn publisher(&self) -> Result<ObjectRef, RemoteFault> {
        Ok(self.publisher_ref())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A one-way call recorded by [`SpyTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Reference the call was sent to.
    pub target: ObjectRef,
    /// Operation name.
    pub operation: String,
    /// Encoded arguments.
    pub args: Vec<Value>,
}

/// Transport that records calls instead of sending them.
#[derive(Debug, Default)]
pub struct SpyTransport {
    calls: Mutex<Vec<RecordedCall>>,
    fault: Mutex<Option<RemoteFault>>,
}

impl SpyTransport {
    /// Create a spy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `fault`, or stop failing with `None`.
    pub fn set_fault(&self, fault: Option<RemoteFault>) {
        if let Ok(mut guard) = self.fault.lock() {
            *guard = fault;
        }
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls recorded so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for SpyTransport {
    async fn invoke_oneway(
        &self,
        target: &ObjectRef,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<(), RemoteFault> {
        if let Some(fault) = self.fault.lock().ok().and_then(|guard| guard.clone()) {
            return Err(fault);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                target: target.clone(),
                operation: operation.to_owned(),
                args,
            });
        }
        Ok(())
    }
}
