//! Herald Dispatch - Event correlation and one-way delivery.
//!
//! This crate provides:
//! - Dispatch tables for remote interfaces ([`InterfaceRegistry`])
//! - Delivery requests and outcomes ([`DeliveryRequest`], [`DeliveryOutcome`])
//! - The dispatcher task and its producer handle ([`EventDispatcher`],
//!   [`EventPublisher`])
//!
//! # Example
//!
//! ```rust
//! use herald_dispatch::{Correlation, InterfaceDef, InterfaceRegistry, Operation};
//!
//! let registry = InterfaceRegistry::new().with(
//!     InterfaceDef::new("::demo::ProgressListener")
//!         .operation(Operation::new("progress", 2))
//!         .operation(Operation::typed::<(String,)>("finished")),
//! );
//!
//! let listener = registry.get("demo.ProgressListener").unwrap();
//! assert!(matches!(listener.correlate("progress", 2), Correlation::Found(_)));
//! assert!(matches!(listener.correlate("progress", 3), Correlation::NotFound));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod catalog;
mod dispatcher;
mod error;
mod interface;
mod publisher;
mod request;
mod transport;

#[cfg(test)]
mod testing;

pub use catalog::TopicCatalog;
pub use dispatcher::{DispatcherHandle, EventDispatcher};
pub use error::DropReason;
pub use interface::{Arguments, Correlation, InterfaceDef, InterfaceRegistry, Operation};
pub use publisher::EventPublisher;
pub use request::{DeliveryOutcome, DeliveryRequest, TargetStub};
pub use transport::Transport;
