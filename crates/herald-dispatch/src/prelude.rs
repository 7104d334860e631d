//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_dispatch::prelude::*;` to import all essential types.

// Interfaces
pub use crate::{Arguments, Correlation, InterfaceDef, InterfaceRegistry, Operation};

// Requests
pub use crate::{DeliveryOutcome, DeliveryRequest, DropReason, TargetStub, TopicCatalog};

// Dispatcher
pub use crate::{DispatcherHandle, EventDispatcher, EventPublisher, Transport};
