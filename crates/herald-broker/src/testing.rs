//! In-memory fakes for this crate's unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald_core::{ObjectRef, RemoteFault};

use crate::capability::{BrokerManager, Directory, Qos, Topic};
use crate::error::{SubscribeFault, TopicFault};

pub(crate) const BROKER_TYPE: &str = "::IceStorm::TopicManager";

pub(crate) struct FakeDirectory {
    candidates: Vec<ObjectRef>,
    broker: Option<Arc<FakeBroker>>,
    fault: Option<RemoteFault>,
    pub(crate) queries: AtomicUsize,
}

impl FakeDirectory {
    pub(crate) fn with_broker(broker: Arc<FakeBroker>) -> Self {
        Self::with_candidates(1, Some(broker))
    }

    pub(crate) fn with_candidates(count: usize, broker: Option<Arc<FakeBroker>>) -> Self {
        Self {
            candidates: (0..count)
                .map(|i| ObjectRef::new(format!("broker-{i}"), BROKER_TYPE))
                .collect(),
            broker,
            fault: None,
            queries: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(fault: RemoteFault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::with_candidates(0, None)
        }
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn find_all_by_type(&self, type_id: &str) -> Result<Vec<ObjectRef>, RemoteFault> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        Ok(self
            .candidates
            .iter()
            .filter(|c| c.type_id() == type_id)
            .cloned()
            .collect())
    }

    async fn narrow_broker(
        &self,
        _candidate: &ObjectRef,
    ) -> Result<Option<Arc<dyn BrokerManager>>, RemoteFault> {
        Ok(self
            .broker
            .clone()
            .map(|broker| broker as Arc<dyn BrokerManager>))
    }
}

/// Directory that never answers.
pub(crate) struct HangingDirectory;

#[async_trait]
impl Directory for HangingDirectory {
    async fn find_all_by_type(&self, _type_id: &str) -> Result<Vec<ObjectRef>, RemoteFault> {
        std::future::pending().await
    }

    async fn narrow_broker(
        &self,
        _candidate: &ObjectRef,
    ) -> Result<Option<Arc<dyn BrokerManager>>, RemoteFault> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub(crate) struct FakeBroker {
    pub(crate) topics: Mutex<HashMap<String, Arc<FakeTopic>>>,
    /// Report every existing topic as missing on retrieve.
    pub(crate) vanish_on_retrieve: bool,
    pub(crate) fault: Option<RemoteFault>,
    pub(crate) creates: AtomicUsize,
}

impl FakeBroker {
    pub(crate) fn insert(&self, name: &str) -> Arc<FakeTopic> {
        let topic = Arc::new(FakeTopic::new(name));
        self.topics
            .lock()
            .unwrap()
            .insert(name.to_owned(), Arc::clone(&topic));
        topic
    }

    pub(crate) fn topic(&self, name: &str) -> Option<Arc<FakeTopic>> {
        self.topics.lock().unwrap().get(name).cloned()
    }

    pub(crate) fn topic_count(&self) -> usize {
        self.topics.lock().unwrap().len()
    }
}

#[async_trait]
impl BrokerManager for FakeBroker {
    async fn create(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone().into());
        }
        let mut topics = self.topics.lock().unwrap();
        if topics.contains_key(name) {
            return Err(TopicFault::AlreadyExists(name.to_owned()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let topic = Arc::new(FakeTopic::new(name));
        topics.insert(name.to_owned(), Arc::clone(&topic));
        Ok(topic)
    }

    async fn retrieve(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone().into());
        }
        if self.vanish_on_retrieve {
            return Err(TopicFault::NotFound(name.to_owned()));
        }
        self.topic(name)
            .map(|topic| topic as Arc<dyn Topic>)
            .ok_or_else(|| TopicFault::NotFound(name.to_owned()))
    }
}

pub(crate) struct FakeTopic {
    name: String,
    script: Mutex<VecDeque<SubscribeFault>>,
    subscribers: Mutex<HashSet<String>>,
    pub(crate) attempts: AtomicU32,
}

impl FakeTopic {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            script: Mutex::new(VecDeque::new()),
            subscribers: Mutex::new(HashSet::new()),
            attempts: AtomicU32::new(0),
        }
    }

    /// Faults returned by the next subscribe calls, in order.
    pub(crate) fn script(&self, faults: impl IntoIterator<Item = SubscribeFault>) {
        self.script.lock().unwrap().extend(faults);
    }

    pub(crate) fn is_subscribed(&self, identity: &str) -> bool {
        self.subscribers.lock().unwrap().contains(identity)
    }
}

#[async_trait]
impl Topic for FakeTopic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe_and_get_publisher(
        &self,
        _qos: &Qos,
        subscriber: &ObjectRef,
    ) -> Result<ObjectRef, SubscribeFault> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        if let Some(fault) = scripted {
            return Err(fault);
        }
        let inserted = self
            .subscribers
            .lock()
            .unwrap()
            .insert(subscriber.identity().to_owned());
        if !inserted {
            return Err(SubscribeFault::AlreadySubscribed);
        }
        self.publisher().await.map_err(SubscribeFault::from)
    }

    async fn unsubscribe(&self, subscriber: &ObjectRef) -> Result<(), TopicFault> {
        if self.subscribers.lock().unwrap().remove(subscriber.identity()) {
            Ok(())
        } else {
            Err(TopicFault::NotFound(subscriber.identity().to_owned()))
        }
    }

    async fn publisher(&self) -> Result<ObjectRef, RemoteFault> {
        Ok(ObjectRef::new(format!("{}.publisher", self.name), "::IceStorm::Topic"))
    }
}
