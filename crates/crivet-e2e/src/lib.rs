//! # crivet-e2e
//!
//! End-to-end verification of a container runtime service.
//!
//! Provides the pieces a scenario is assembled from:
//! - [`LifecycleDriver`](driver::LifecycleDriver): issues lifecycle calls and
//!   checks the state each one lands in.
//! - [`wait_for_state`](poller::wait_for_state): bounded status polling.
//! - [`LogVerifier`](verifier::LogVerifier): decodes a container's captured
//!   JSON log and compares it with the expected output.
//! - [`OrFail`](expect::OrFail) and [`suite`]: turn verification errors into
//!   test-case failures.
//!
//! # Example
//!
//! ```rust,no_run
//! use crivet_common::config::HarnessConfig;
//! use crivet_e2e::driver::LifecycleDriver;
//! use crivet_e2e::expect::OrFail;
//! use crivet_e2e::names::UuidNames;
//! use crivet_runtime::memory::InMemoryRuntime;
//!
//! let runtime = InMemoryRuntime::new();
//! let config = HarnessConfig::default();
//! let driver = LifecycleDriver::new(&runtime, &config, &UuidNames);
//!
//! let sandbox = driver
//!     .run_sandbox(driver.requests().sandbox("PodSandbox-for-create-container-"))
//!     .or_fail();
//! let mut container = driver.create_and_verify(&sandbox).or_fail();
//! driver.start_and_verify(&mut container).or_fail();
//! driver.stop_and_verify(&mut container, None).or_fail();
//! driver.remove_and_verify(&container).or_fail();
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod builder;
pub mod driver;
pub mod error;
pub mod expect;
pub mod names;
pub mod poller;
pub mod suite;
pub mod transition;
pub mod verifier;
