//! Prelude module - commonly used types for convenient import.
//!
//! Use `use herald_core::prelude::*;` to import all essential types.

// Remote references
pub use crate::{InvocationMode, ObjectRef, TopicName, normalize_type_id};

// Faults
pub use crate::{RemoteFault, Unavailable};

// Retry
pub use crate::{RetryOutcome, RetryPolicy};
