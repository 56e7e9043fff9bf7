//! Container runtime service abstraction for the crivet harness.
//!
//! [`service::RuntimeService`] is the capability under test. The
//! [`memory::InMemoryRuntime`] reference implementation backs the harness's
//! own tests and the CLI's self-check mode.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod logs;
pub mod memory;
pub mod service;
