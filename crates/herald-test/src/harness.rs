//! A fully wired Herald stack over the mocks.

use std::sync::Arc;
use std::time::Duration;

use herald_broker::{
    BrokerConnection, ConnectionPolicy, Directory, DirectoryClient, RegistrationPolicy,
    SubscriberTypes, SubscriptionManager, TopicRegistry,
};
use herald_config::DispatchSection;
use herald_core::RetryPolicy;
use herald_dispatch::{
    DispatcherHandle, EventDispatcher, InterfaceRegistry, TopicCatalog, Transport,
};

use crate::fixtures::{BROKER_TYPE_ID, LISTENER_TYPE_ID, TEST_TOPIC, test_interfaces};
use crate::mocks::{MockBroker, MockDirectory, SpyTransport};

/// Registration policy with millisecond backoff, for tests.
#[must_use]
pub fn fast_registration_policy(max_retries: u32) -> RegistrationPolicy {
    RegistrationPolicy {
        retry: RetryPolicy::new(
            max_retries,
            Duration::from_millis(1),
            Duration::from_millis(4),
            2.0,
        ),
        timeout: Duration::from_secs(5),
        ..RegistrationPolicy::default()
    }
}

/// Mocks plus the Herald components built on them.
pub struct TestHerald {
    /// Directory the connection queries.
    pub directory: Arc<MockDirectory>,
    /// Broker advertised by the directory.
    pub broker: Arc<MockBroker>,
    /// Spy receiving dispatched calls.
    pub transport: Arc<SpyTransport>,
    /// Interface registry shared by subscriptions and dispatch.
    pub interfaces: Arc<InterfaceRegistry>,
    /// Topic registry over the broker connection.
    pub topics: TopicRegistry,
    /// Subscription manager.
    pub subscriptions: SubscriptionManager,
}

impl TestHerald {
    /// One broker, fresh resolution, fast retries.
    #[must_use]
    pub fn new() -> Self {
        Self::build(ConnectionPolicy::Fresh, fast_registration_policy(10))
    }

    /// Like [`new`](Self::new) with a custom registration policy.
    #[must_use]
    pub fn with_policy(policy: RegistrationPolicy) -> Self {
        Self::build(ConnectionPolicy::Fresh, policy)
    }

    /// Like [`new`](Self::new) with a custom connection policy.
    #[must_use]
    pub fn with_connection_policy(connection: ConnectionPolicy) -> Self {
        Self::build(connection, fast_registration_policy(10))
    }

    fn build(connection: ConnectionPolicy, policy: RegistrationPolicy) -> Self {
        let broker = Arc::new(MockBroker::new());
        let directory = Arc::new(MockDirectory::with_broker(Arc::clone(&broker)));
        let transport = Arc::new(SpyTransport::new());
        let interfaces = Arc::new(test_interfaces());

        let client = DirectoryClient::new(
            Arc::clone(&directory) as Arc<dyn Directory>,
            BROKER_TYPE_ID,
        );
        let topics = TopicRegistry::new(Arc::new(BrokerConnection::new(client, connection)));
        let subscriptions = SubscriptionManager::new(
            topics.clone(),
            Arc::clone(&interfaces) as Arc<dyn SubscriberTypes>,
            policy,
        );

        Self {
            directory,
            broker,
            transport,
            interfaces,
            topics,
            subscriptions,
        }
    }

    /// A dispatcher over this stack.
    #[must_use]
    pub fn dispatcher(&self) -> EventDispatcher {
        EventDispatcher::new(
            self.topics.clone(),
            Arc::clone(&self.interfaces),
            Arc::clone(&self.transport) as Arc<dyn Transport>,
        )
    }

    /// Start a dispatcher task with `queue_capacity` and `concurrency`,
    /// cataloguing [`TEST_TOPIC`] as the sample listener.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn_dispatcher(&self, queue_capacity: usize, concurrency: usize) -> DispatcherHandle {
        let config = DispatchSection {
            queue_capacity,
            concurrency,
        };
        let catalog = TopicCatalog::new().with(TEST_TOPIC, LISTENER_TYPE_ID);
        self.dispatcher().spawn(&config, catalog)
    }
}

impl Default for TestHerald {
    fn default() -> Self {
        Self::new()
    }
}
