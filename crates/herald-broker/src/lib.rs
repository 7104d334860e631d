//! Herald Broker - Broker discovery, topics and subscriptions.
//!
//! This crate provides:
//! - The capability traits Herald consumes ([`Directory`], [`BrokerManager`],
//!   [`Topic`])
//! - Broker discovery and its resolution policy ([`DirectoryClient`],
//!   [`BrokerConnection`])
//! - Race-safe create-or-get of topics ([`TopicRegistry`])
//! - Failover-aware subscriber registration ([`SubscriptionManager`])
//!
//! # Architecture
//!
//! Every operation flows `SubscriptionManager → TopicRegistry →
//! BrokerConnection → DirectoryClient`. Nothing below the connection keeps
//! state between calls, and the connection only keeps a broker handle under
//! the sticky policy.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod capability;
mod connection;
mod error;
mod subscription;
mod topic;

#[cfg(test)]
mod testing;

pub use capability::{BrokerManager, Directory, Qos, Topic};
pub use connection::{BrokerConnection, DirectoryClient};
pub use error::{
    RegisterError, RegisterResult, SubscribeFault, TopicError, TopicFault, TopicResult,
};
pub use herald_config::ConnectionPolicy;
pub use subscription::{Registration, RegistrationPolicy, SubscriberTypes, SubscriptionManager};
pub use topic::TopicRegistry;
