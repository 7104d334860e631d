//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_broker::prelude::*;` to import all essential types.

// Capabilities
pub use crate::{BrokerManager, Directory, Qos, Topic};

// Connection
pub use crate::{BrokerConnection, ConnectionPolicy, DirectoryClient};

// Topics and subscriptions
pub use crate::{
    Registration, RegistrationPolicy, SubscriberTypes, SubscriptionManager, TopicRegistry,
};

// Errors
pub use crate::{RegisterError, SubscribeFault, TopicError, TopicFault};
