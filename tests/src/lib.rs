//! # Service Manager Test Suite
//!
//! Cross-crate tests of the storage core.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Recording interceptors, journaling repository
//! │
//! └── integration/      # Flows across interceptors, decorators, notifications
//!     ├── chains.rs
//!     ├── decorators.rs
//!     └── notifications.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sm-tests
//!
//! # By category
//! cargo test -p sm-tests integration::chains::
//! cargo test -p sm-tests integration::decorators::
//!
//! # Benchmarks
//! cargo bench -p sm-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
