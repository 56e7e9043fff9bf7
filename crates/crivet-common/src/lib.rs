//! # crivet-common
//!
//! Shared types, error definitions, configuration and the JSON-line log
//! record codec used across the crivet workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives the runtime abstraction and
//! the e2e harness build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod jsonlog;
pub mod types;
