//! Prelude module - commonly used test utilities.
//!
//! Use `use herald_test::prelude::*;` to import all essential types.

// Mocks
pub use crate::{MockBroker, MockDirectory, MockTopic, RecordedCall, SpyTransport};

// Harness
pub use crate::{TestHerald, fast_registration_policy};

// Logs
pub use crate::{LogCapture, capture_logs};

// Fixtures
pub use crate::{
    BROKER_TYPE_ID, LISTENER_TYPE_ID, TEST_TOPIC, test_endpoint, test_interfaces,
    test_listener_interface, test_request, test_topic,
};
