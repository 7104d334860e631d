//! Shared helpers for integration tests.

use std::sync::Arc;

use herald_test::{MockBroker, MockTopic, TEST_TOPIC, TestHerald};

/// A stack whose test topic already exists with `faults` scripted for the
/// next subscribe calls.
#[allow(dead_code)]
pub fn herald_with_script(
    herald: TestHerald,
    faults: impl IntoIterator<Item = herald_broker::SubscribeFault>,
) -> (TestHerald, Arc<MockTopic>) {
    let topic = herald.broker.ensure_topic(TEST_TOPIC);
    topic.script(faults);
    (herald, topic)
}

/// Advertise a second broker so discovery becomes ambiguous.
#[allow(dead_code)]
pub fn make_ambiguous(herald: &TestHerald) {
    herald.directory.add_broker(Arc::new(MockBroker::new()));
}

/// Remove every broker from the directory.
#[allow(dead_code)]
pub fn remove_brokers(herald: &TestHerald) {
    herald.directory.clear();
}
