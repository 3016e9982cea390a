//! Crate-level tests that need a database or the full router.
//!
//! - **fixtures**: seed helpers and in-memory app setup shared by the unit tests too
//! - **api_tests**: CRUD and distribution endpoints through the router
//! - **db_tests**: schema bootstrap, constraints and cascades
//! - **config_tests**: defaults and validation
//! - **error_tests**: error envelope and conversions
//! - **health_api_tests**: liveness, readiness, metrics and version

pub mod fixtures;

pub mod error_tests;
