//! Runtime service abstraction consumed by the e2e harness.
//!
//! The request and response shapes follow the kubelet container runtime
//! interface: a pod sandbox groups containers that share namespaces, and
//! every container is created against exactly one sandbox.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crivet_common::error::Result;
use crivet_common::types::{ContainerId, ContainerState, PodSandboxState, SandboxId};
use serde::{Deserialize, Serialize};

/// Identity of a pod sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSandboxMetadata {
    /// Sandbox name.
    pub name: String,
    /// Owner UID.
    pub uid: String,
    /// Namespace the sandbox belongs to.
    pub namespace: String,
    /// Number of times a sandbox with this name has been created.
    pub attempt: u32,
}

/// Configuration for creating a pod sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSandboxConfig {
    /// Sandbox identity.
    pub metadata: PodSandboxMetadata,
    /// Directory receiving the logs of the sandbox's containers.
    ///
    /// A relative container log path is joined onto this directory as a
    /// path component. An absolute container log path replaces it.
    pub log_directory: Option<PathBuf>,
    /// Free-form runtime hints.
    pub annotations: BTreeMap<String, String>,
}

/// Identity of a container inside its sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Container name.
    pub name: String,
    /// Number of times a container with this name has been created.
    pub attempt: u32,
}

/// Image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Image name, e.g. `busybox:latest`.
    pub image: String,
}

/// Host path bind-mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Path on the host.
    pub host_path: PathBuf,
    /// Path inside the container.
    pub container_path: PathBuf,
}

/// Configuration for creating a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container identity.
    pub metadata: ContainerMetadata,
    /// Image to run.
    pub image: ImageSpec,
    /// Argument vector of the container process.
    pub command: Vec<String>,
    /// Bind mounts.
    pub mounts: Vec<Mount>,
    /// Log file path relative to the sandbox log directory.
    pub log_path: Option<PathBuf>,
}

/// Filter for [`RuntimeService::list_containers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerFilter {
    /// Only match the container with this ID.
    pub id: Option<ContainerId>,
    /// Only match containers in this sandbox.
    pub pod_sandbox_id: Option<SandboxId>,
    /// Only match containers in this state.
    pub state: Option<ContainerState>,
}

impl ContainerFilter {
    /// Filter matching a single container ID.
    #[must_use]
    pub fn by_id(id: &ContainerId) -> Self {
        Self {
            id: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Returns whether `container` passes every set criterion.
    #[must_use]
    pub fn matches(&self, container: &Container) -> bool {
        self.id.as_ref().is_none_or(|id| *id == container.id)
            && self
                .pod_sandbox_id
                .as_ref()
                .is_none_or(|sid| *sid == container.pod_sandbox_id)
            && self.state.is_none_or(|s| s == container.state)
    }
}

/// Filter for [`RuntimeService::list_pod_sandbox`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSandboxFilter {
    /// Only match the sandbox with this ID.
    pub id: Option<SandboxId>,
}

impl PodSandboxFilter {
    /// Filter matching a single sandbox ID.
    #[must_use]
    pub fn by_id(id: &SandboxId) -> Self {
        Self {
            id: Some(id.clone()),
        }
    }
}

/// Summary of a container as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container ID.
    pub id: ContainerId,
    /// Sandbox the container belongs to.
    pub pod_sandbox_id: SandboxId,
    /// Container identity.
    pub metadata: ContainerMetadata,
    /// Image the container runs.
    pub image: ImageSpec,
    /// Current lifecycle state.
    pub state: ContainerState,
}

/// Summary of a pod sandbox as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSandbox {
    /// Sandbox ID.
    pub id: SandboxId,
    /// Sandbox identity.
    pub metadata: PodSandboxMetadata,
    /// Current readiness.
    pub state: PodSandboxState,
}

/// Detailed status of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// Container ID.
    pub id: ContainerId,
    /// Container identity.
    pub metadata: ContainerMetadata,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start time, once started.
    pub started_at: Option<DateTime<Utc>>,
    /// Exit time, once exited.
    pub finished_at: Option<DateTime<Utc>>,
    /// Exit code, once exited.
    pub exit_code: Option<i32>,
    /// Image the container runs.
    pub image: ImageSpec,
    /// Log file path relative to the sandbox log directory.
    pub log_path: Option<PathBuf>,
}

/// Sandbox and container lifecycle operations of a container runtime.
///
/// Implementations may be shared between concurrently running scenarios and
/// must serialize their own mutations.
pub trait RuntimeService: Send + Sync {
    /// Creates and starts a pod sandbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox cannot be created.
    fn run_pod_sandbox(&self, config: &PodSandboxConfig) -> Result<SandboxId>;

    /// Stops a pod sandbox and every container in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox does not exist or cannot be stopped.
    fn stop_pod_sandbox(&self, id: &SandboxId) -> Result<()>;

    /// Removes a pod sandbox and every container in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox cannot be removed.
    fn remove_pod_sandbox(&self, id: &SandboxId) -> Result<()>;

    /// Lists pod sandboxes matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn list_pod_sandbox(&self, filter: &PodSandboxFilter) -> Result<Vec<PodSandbox>>;

    /// Creates a container inside a sandbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox does not exist or the container cannot
    /// be created.
    fn create_container(
        &self,
        sandbox_id: &SandboxId,
        config: &ContainerConfig,
        sandbox_config: &PodSandboxConfig,
    ) -> Result<ContainerId>;

    /// Starts a created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container does not exist or is not created.
    fn start_container(&self, id: &ContainerId) -> Result<()>;

    /// Stops a running container, killing it after `timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container does not exist or cannot be stopped.
    fn stop_container(&self, id: &ContainerId, timeout_secs: i64) -> Result<()>;

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove_container(&self, id: &ContainerId) -> Result<()>;

    /// Returns the status of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container does not exist.
    fn container_status(&self, id: &ContainerId) -> Result<ContainerStatus>;

    /// Lists containers matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn list_containers(&self, filter: &ContainerFilter) -> Result<Vec<Container>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ContainerState::{Created, Exited, Running};

    fn container(id: &str, sandbox: &str, state: ContainerState) -> Container {
        Container {
            id: ContainerId::new(id),
            pod_sandbox_id: SandboxId::new(sandbox),
            metadata: ContainerMetadata::default(),
            image: ImageSpec::default(),
            state,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ContainerFilter::default();
        assert!(filter.matches(&container("a", "s", Created)));
    }

    #[test]
    fn id_filter_matches_only_that_container() {
        let filter = ContainerFilter::by_id(&ContainerId::new("a"));
        assert!(filter.matches(&container("a", "s", Running)));
        assert!(!filter.matches(&container("b", "s", Running)));
    }

    #[test]
    fn criteria_are_combined() {
        let filter = ContainerFilter {
            pod_sandbox_id: Some(SandboxId::new("s")),
            state: Some(ContainerState::Exited),
            ..ContainerFilter::default()
        };
        assert!(filter.matches(&container("a", "s", Exited)));
        assert!(!filter.matches(&container("a", "s", Running)));
        assert!(!filter.matches(&container("a", "t", Exited)));
    }
}
