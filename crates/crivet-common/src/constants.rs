//! Harness-wide default values.
//!
//! These seed [`HarnessConfig::default`](crate::config::HarnessConfig); code
//! that drives a runtime reads the configuration, not these constants.

/// Owner UID written into every sandbox metadata.
pub const DEFAULT_UID: &str = "e2e-cri-uid";

/// Namespace written into every sandbox metadata.
pub const DEFAULT_NAMESPACE: &str = "e2e-cri-namespace";

/// Attempt count written into sandbox and container metadata.
pub const DEFAULT_ATTEMPT: u32 = 2;

/// Image used for every test container.
pub const DEFAULT_CONTAINER_IMAGE: &str = "busybox:latest";

/// Grace period in seconds passed to stop requests.
pub const DEFAULT_STOP_CONTAINER_TIMEOUT: i64 = 60;

/// Text echoed by log containers.
pub const DEFAULT_LOG: &str = "hello world";

/// Parent directory of per-sandbox log directories.
pub const DEFAULT_LOG_ROOT: &str = "/var/log/pods";

/// Interval between status queries while waiting for a state.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Upper bound on a single wait for a container state.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 30_000;

/// Annotation asking the runtime to host the sandbox in an OS container
/// instead of a hypervisor.
pub const OS_CONTAINER_ANNOTATION: &str = "runtime.frakti.alpha.kubernetes.io/OSContainer";

/// Application name used in CLI output.
pub const APP_NAME: &str = "crivet";
