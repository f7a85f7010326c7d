//! Conveyor Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the Conveyor project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Conveyor
//! workspace members:
//!
//! - **Logging**: Centralized tracing initialization
//! - **Types**: Opaque identifier newtypes shared across the pipeline
//!
//! # Example
//!
//! ```no_run
//! use conveyor_common::types::{ResourceId, VersionId};
//!
//! fn describe(resource: ResourceId, version: VersionId) -> String {
//!     format!("resource {} at version {}", resource, version)
//! }
//! ```

pub mod logging;
pub mod types;
