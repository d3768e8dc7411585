//! # rk-core
//!
//! Core types, traits, and utilities for repokit.
//!
//! This crate provides the foundational building blocks used by the query and
//! database crates:
//! - Entity identifiers and entity traits
//! - Validation error collection
//! - Configuration loading
//! - Tracing bootstrap

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;

pub use error::*;
pub use traits::*;
