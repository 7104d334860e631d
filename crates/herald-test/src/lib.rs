//! Herald Test - Shared test utilities for Herald.
//!
//! This crate provides in-memory implementations of the directory, broker
//! and transport capabilities, fixtures for a sample listener interface, a
//! pre-wired [`TestHerald`] stack and log capture for asserting on what was
//! logged.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! herald-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use herald_test::{TestHerald, test_endpoint, test_topic};
//!
//! #[tokio::test]
//! async fn test_register() {
//!     let herald = TestHerald::new();
//!     let registration = herald
//!         .subscriptions
//!         .register(&test_topic(), &test_endpoint("progress-1"), true)
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(registration.attempts, 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod logs;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use logs::*;
pub use mocks::*;
