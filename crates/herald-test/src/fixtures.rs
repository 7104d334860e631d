//! Test fixtures for common types.

use herald_core::{ObjectRef, TopicName};
use herald_dispatch::{DeliveryRequest, InterfaceDef, InterfaceRegistry, Operation, TargetStub};
use serde_json::Value;

/// Type id the mock directory advertises brokers under.
pub const BROKER_TYPE_ID: &str = "::IceStorm::TopicManager";

/// Type id of the sample listener interface.
pub const LISTENER_TYPE_ID: &str = "::demo::ProgressListener";

/// Topic used throughout the tests.
pub const TEST_TOPIC: &str = "job.progress";

/// Sample listener interface.
///
/// - `progress(job, percent)` and `progress(job)` share a name but differ
///   in arity.
/// - `finished(job)` is typed: its argument must be a string.
/// - `reset()` is declared twice, so any call to it is ambiguous.
#[must_use]
pub fn test_listener_interface() -> InterfaceDef {
    InterfaceDef::new(LISTENER_TYPE_ID)
        .operation(Operation::new("progress", 2))
        .operation(Operation::new("progress", 1))
        .operation(Operation::typed::<(String,)>("finished"))
        .operation(Operation::new("reset", 0))
        .operation(Operation::new("reset", 0))
}

/// Registry holding [`test_listener_interface`].
#[must_use]
pub fn test_interfaces() -> InterfaceRegistry {
    InterfaceRegistry::new().with(test_listener_interface())
}

/// Create a test topic name.
#[must_use]
pub fn test_topic() -> TopicName {
    TopicName::new(TEST_TOPIC)
}

/// Create a listener endpoint with the given identity.
#[must_use]
pub fn test_endpoint(identity: &str) -> ObjectRef {
    ObjectRef::new(identity, LISTENER_TYPE_ID).with_endpoint("tcp -h 127.0.0.1 -p 4061")
}

/// Create a delivery request for the sample listener on [`TEST_TOPIC`].
#[must_use]
pub fn test_request(method: &str, args: Vec<Value>) -> DeliveryRequest {
    DeliveryRequest::new(
        "test",
        TEST_TOPIC,
        TargetStub::new(LISTENER_TYPE_ID),
        method,
        args,
    )
}
