//! Bounded waiting for a container state.
//!
//! Used where a scenario cannot observe the transition directly, e.g. a
//! container whose command exits by itself. A failing status call ends the
//! wait immediately; only the state check is repeated.

use std::time::{Duration, Instant};

use crivet_common::types::{ContainerId, ContainerState};
use crivet_runtime::service::{ContainerStatus, RuntimeService};

use crate::error::{Result, VerifyError};

/// Returns whether `to` can still be reached from `from` by forward moves.
fn reachable(from: ContainerState, to: ContainerState) -> bool {
    from == to
        || from
            .valid_transitions()
            .iter()
            .any(|&next| next != from && reachable(next, to))
}

/// Polls the status of `id` every `interval` until it reports `expected`.
///
/// # Errors
///
/// - [`VerifyError::Service`] if a status query fails.
/// - [`VerifyError::StateMismatch`] once the container is in a state from
///   which `expected` is no longer reachable.
/// - [`VerifyError::Timeout`] if `timeout` elapses first.
pub fn wait_for_state<S>(
    service: &S,
    id: &ContainerId,
    expected: ContainerState,
    interval: Duration,
    timeout: Duration,
) -> Result<ContainerStatus>
where
    S: RuntimeService + ?Sized,
{
    let started = Instant::now();
    loop {
        let status = service
            .container_status(id)
            .map_err(VerifyError::service("ContainerStatus", id))?;
        if status.state == expected {
            tracing::debug!(
                id = %id,
                state = %expected,
                waited = ?started.elapsed(),
                "state reached"
            );
            return Ok(status);
        }
        if !reachable(status.state, expected) {
            return Err(VerifyError::StateMismatch {
                id: id.clone(),
                expected,
                actual: status.state,
            });
        }

        let waited = started.elapsed();
        if waited >= timeout {
            return Err(VerifyError::Timeout {
                id: id.clone(),
                expected,
                last: status.state,
                waited,
            });
        }
        tracing::trace!(id = %id, state = %status.state, "waiting for {expected}");
        std::thread::sleep(interval.min(timeout.saturating_sub(waited)));
    }
}

#[cfg(test)]
mod tests {
    use crivet_runtime::memory::InMemoryRuntime;
    use crivet_runtime::service::{ContainerConfig, PodSandboxConfig, PodSandboxMetadata};

    use super::*;

    fn runtime_with(command: &[&str]) -> (InMemoryRuntime, ContainerId) {
        let rt = InMemoryRuntime::new();
        let pod_cfg = PodSandboxConfig {
            metadata: PodSandboxMetadata {
                name: "pod".into(),
                ..PodSandboxMetadata::default()
            },
            ..PodSandboxConfig::default()
        };
        let pod = rt.run_pod_sandbox(&pod_cfg).unwrap();
        let cfg = ContainerConfig {
            command: command.iter().map(ToString::to_string).collect(),
            ..ContainerConfig::default()
        };
        let id = rt.create_container(&pod, &cfg, &pod_cfg).unwrap();
        (rt, id)
    }

    #[test]
    fn forward_reachability() {
        assert!(reachable(ContainerState::Created, ContainerState::Exited));
        assert!(reachable(ContainerState::Running, ContainerState::Exited));
        assert!(!reachable(ContainerState::Exited, ContainerState::Running));
        assert!(!reachable(ContainerState::Running, ContainerState::Created));
    }

    #[test]
    fn returns_once_state_is_reached() {
        let (rt, id) = runtime_with(&["echo", "hi"]);
        rt.start_container(&id).unwrap();
        let status = wait_for_state(
            &rt,
            &id,
            ContainerState::Exited,
            Duration::from_millis(1),
            Duration::from_secs(1),
        )
        .expect("exited");
        assert_eq!(status.exit_code, Some(0));
    }

    #[test]
    fn times_out_with_last_state() {
        let (rt, id) = runtime_with(&["top"]);
        rt.start_container(&id).unwrap();
        let err = wait_for_state(
            &rt,
            &id,
            ContainerState::Exited,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Timeout {
                last: ContainerState::Running,
                ..
            }
        ));
    }

    #[test]
    fn unreachable_state_fails_without_waiting() {
        let (rt, id) = runtime_with(&["echo"]);
        rt.start_container(&id).unwrap();
        let err = wait_for_state(
            &rt,
            &id,
            ContainerState::Running,
            Duration::from_secs(10),
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::StateMismatch { .. }));
    }

    #[test]
    fn status_error_is_reported_as_service_error() {
        let rt = InMemoryRuntime::new();
        let err = wait_for_state(
            &rt,
            &ContainerId::new("ghost"),
            ContainerState::Exited,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::Service { .. }));
        let message = err.to_string();
        assert!(message.starts_with("ContainerStatus failed for ghost"));
    }
}
