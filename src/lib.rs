//! # Schoolhouse
//!
//! Backend for a school's administration office: academic years grouped by
//! level, their classes and students, the books each year uses, and the
//! per-student record of which books were handed out.
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, files, environment)
//! - [`db`]: pool setup and schema bootstrap
//! - [`schema`]: validation of untyped JSON payloads into typed inputs
//! - [`store`]: typed SQLite access per table, including nested reads
//! - [`loaders`]: read helpers that turn failures into empty results
//! - [`distribution`]: status cycle, effective status and the batch upsert
//! - [`workflow`]: the stepwise distribution form and its controller
//! - [`routes`], [`middleware`], [`state`], [`metrics`], [`error`]: the HTTP surface
//! - [`types`]: entities, includes and validated inputs

pub mod config;
pub mod db;
pub mod distribution;
pub mod error;
pub mod loaders;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod tests;
