//! # CartSync Testkit
//!
//! Test utilities for CartSync.
//!
//! This crate provides:
//! - Item fixtures at fixed timestamps
//! - Property-based test generators using proptest
//! - A loopback harness wiring the engine to the reference server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cartsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn syncs_against_reference_server() {
//!     let harness = LoopbackHarness::new();
//!     harness.engine.sync_now().await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
