//! Minimal fakes for this crate's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald_broker::{
    BrokerConnection, BrokerManager, ConnectionPolicy, Directory, DirectoryClient, Qos,
    SubscribeFault, Topic, TopicFault, TopicRegistry,
};
use herald_core::{ObjectRef, RemoteFault};
use serde_json::Value;

use crate::transport::Transport;

const BROKER_TYPE: &str = "::IceStorm::TopicManager";

/// Directory with `count` identical broker candidates.
pub(crate) struct StaticDirectory {
    count: usize,
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn find_all_by_type(&self, type_id: &str) -> Result<Vec<ObjectRef>, RemoteFault> {
        Ok((0..self.count)
            .map(|i| ObjectRef::new(format!("broker-{i}"), type_id))
            .collect())
    }

    async fn narrow_broker(
        &self,
        _candidate: &ObjectRef,
    ) -> Result<Option<Arc<dyn BrokerManager>>, RemoteFault> {
        Ok(Some(Arc::new(OpenBroker)))
    }
}

/// Broker on which every topic exists.
struct OpenBroker;

#[async_trait]
impl BrokerManager for OpenBroker {
    async fn create(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault> {
        Ok(Arc::new(OpenTopic(name.to_owned())))
    }

    async fn retrieve(&self, name: &str) -> Result<Arc<dyn Topic>, TopicFault> {
        Ok(Arc::new(OpenTopic(name.to_owned())))
    }
}

struct OpenTopic(String);

#[async_trait]
impl Topic for OpenTopic {
    fn name(&self) -> &str {
        &self.0
    }

    async fn subscribe_and_get_publisher(
        &self,
        _qos: &Qos,
        _subscriber: &ObjectRef,
    ) -> Result<ObjectRef, SubscribeFault> {
        self.publisher().await.map_err(SubscribeFault::from)
    }

    async fn unsubscribe(&self, _subscriber: &ObjectRef) -> Result<(), TopicFault> {
        Ok(())
    }

    async fn publisher(&self) -> Result<ObjectRef, RemoteFault> {
        Ok(ObjectRef::new(format!("{}.publisher", self.0), "::IceStorm::Topic"))
    }
}

pub(crate) fn topics(brokers: usize) -> TopicRegistry {
    let directory: Arc<dyn Directory> = Arc::new(StaticDirectory { count: brokers });
    TopicRegistry::new(Arc::new(BrokerConnection::new(
        DirectoryClient::new(directory, BROKER_TYPE),
        ConnectionPolicy::Fresh,
    )))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub(crate) target: ObjectRef,
    pub(crate) operation: String,
    pub(crate) args: Vec<Value>,
}

#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub(crate) calls: Mutex<Vec<Call>>,
    pub(crate) fault: Option<RemoteFault>,
}

impl RecordingTransport {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn invoke_oneway(
        &self,
        target: &ObjectRef,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<(), RemoteFault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        self.calls.lock().unwrap().push(Call {
            target: target.clone(),
            operation: operation.to_owned(),
            args,
        });
        Ok(())
    }
}
