//! Herald Core - Shared types for the Herald topic dispatch layer.
//!
//! This crate provides:
//! - Opaque remote references ([`ObjectRef`]) and topic names
//! - The transport-level fault taxonomy ([`RemoteFault`], [`Unavailable`])
//! - Retry policy with bounded exponential backoff and cancellation
//!
//! # Example
//!
//! ```rust
//! use herald_core::{InvocationMode, ObjectRef};
//!
//! let listener = ObjectRef::new("progress-1", "::demo::ProgressListener")
//!     .with_endpoint("tcp -h 10.0.0.4 -p 4061");
//!
//! assert_eq!(listener.normalized_type_id(), "demo.ProgressListener");
//! assert_eq!(listener.oneway().mode(), InvocationMode::Oneway);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod retry;

mod fault;
mod object_ref;

pub use fault::{RemoteFault, Unavailable};
pub use object_ref::{InvocationMode, ObjectRef, TopicName, normalize_type_id};
pub use retry::{RetryOutcome, RetryPolicy, retry};
