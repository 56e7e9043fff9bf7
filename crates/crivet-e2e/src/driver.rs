//! Lifecycle driver.
//!
//! Issues sandbox and container lifecycle calls against a
//! [`RuntimeService`] and checks the state each call leaves the container
//! in. Each step returns a [`Result`]; nothing here panics or retries, so
//! the driver can be used outside a test harness too. See
//! [`crate::expect`] for the test-failing wrappers.

use std::path::Path;

use crivet_common::config::HarnessConfig;
use crivet_common::types::{ContainerId, ContainerState, SandboxId};
use crivet_runtime::service::{
    Container, ContainerConfig, ContainerFilter, ContainerStatus, PodSandbox, PodSandboxConfig,
    PodSandboxFilter, RuntimeService,
};

use crate::builder::RequestBuilder;
use crate::error::{Result, VerifyError};
use crate::names::NameGenerator;
use crate::transition::Transition;

/// Name prefix of containers created by [`LifecycleDriver::create_and_verify`].
pub const CREATE_TEST_PREFIX: &str = "container-for-create-test-";

/// A sandbox created by the driver, together with the configuration it was
/// created from.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    id: SandboxId,
    config: PodSandboxConfig,
}

impl SandboxHandle {
    /// Sandbox ID assigned by the runtime.
    #[must_use]
    pub const fn id(&self) -> &SandboxId {
        &self.id
    }

    /// Configuration the sandbox was created with.
    #[must_use]
    pub const fn config(&self) -> &PodSandboxConfig {
        &self.config
    }

    /// Sandbox name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.metadata.name
    }

    /// Directory receiving the logs of the sandbox's containers.
    #[must_use]
    pub fn log_directory(&self) -> Option<&Path> {
        self.config.log_directory.as_deref()
    }
}

/// A container created by the driver and the last state observed for it.
///
/// The tracked state gates lifecycle calls: the driver refuses to send a
/// call the current state does not allow.
#[derive(Debug, Clone)]
pub struct TrackedContainer {
    id: ContainerId,
    sandbox_id: SandboxId,
    config: ContainerConfig,
    state: ContainerState,
}

impl TrackedContainer {
    /// Container ID assigned by the runtime.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Sandbox the container belongs to.
    #[must_use]
    pub const fn sandbox_id(&self) -> &SandboxId {
        &self.sandbox_id
    }

    /// Last observed or implied lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContainerState {
        self.state
    }

    /// Log path relative to the sandbox log directory.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.config.log_path.as_deref()
    }

    /// Configuration the container was created with.
    #[must_use]
    pub const fn config(&self) -> &ContainerConfig {
        &self.config
    }
}

/// Returns whether `containers` is exactly the single container `id`.
#[must_use]
pub fn container_found(containers: &[Container], id: &ContainerId) -> bool {
    matches!(containers, [only] if only.id == *id)
}

/// Drives sandboxes and containers through their lifecycle.
pub struct LifecycleDriver<'a, S: RuntimeService + ?Sized> {
    service: &'a S,
    requests: RequestBuilder<'a>,
}

impl<'a, S: RuntimeService + ?Sized> LifecycleDriver<'a, S> {
    /// Creates a driver for `service` using `config` defaults and `names`
    /// for unique sandbox and container names.
    #[must_use]
    pub fn new(service: &'a S, config: &'a HarnessConfig, names: &'a dyn NameGenerator) -> Self {
        Self {
            service,
            requests: RequestBuilder::new(config, names),
        }
    }

    /// Request builder sharing the driver's configuration.
    #[must_use]
    pub const fn requests(&self) -> &RequestBuilder<'a> {
        &self.requests
    }

    /// Harness configuration.
    #[must_use]
    pub const fn config(&self) -> &'a HarnessConfig {
        self.requests.config()
    }

    /// Runtime service under test.
    #[must_use]
    pub const fn service(&self) -> &'a S {
        self.service
    }

    // ── Sandboxes ───────────────────────────────────────────────────

    /// Creates a sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if `RunPodSandbox` fails.
    pub fn run_sandbox(&self, config: PodSandboxConfig) -> Result<SandboxHandle> {
        let id = self
            .service
            .run_pod_sandbox(&config)
            .map_err(VerifyError::service("RunPodSandbox", &config.metadata.name))?;
        tracing::info!(id = %id, name = %config.metadata.name, "created sandbox");
        Ok(SandboxHandle { id, config })
    }

    /// Lists the sandboxes with ID `id`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if `ListPodSandbox` fails.
    pub fn list_sandbox_for_id(&self, id: &SandboxId) -> Result<Vec<PodSandbox>> {
        tracing::info!(id = %id, "list sandbox for id");
        self.service
            .list_pod_sandbox(&PodSandboxFilter::by_id(id))
            .map_err(VerifyError::service("ListPodSandbox", id))
    }

    /// Stops and removes a sandbox with all of its containers.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if either call fails.
    pub fn remove_sandbox(&self, sandbox: &SandboxHandle) -> Result<()> {
        self.service
            .stop_pod_sandbox(&sandbox.id)
            .map_err(VerifyError::service("StopPodSandbox", &sandbox.id))?;
        self.service
            .remove_pod_sandbox(&sandbox.id)
            .map_err(VerifyError::service("RemovePodSandbox", &sandbox.id))?;
        tracing::info!(id = %sandbox.id, "removed sandbox");
        Ok(())
    }

    // ── Containers ──────────────────────────────────────────────────

    /// Creates a container in `sandbox`. The returned handle assumes the
    /// `created` state without querying it.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if `CreateContainer` fails.
    pub fn create(
        &self,
        sandbox: &SandboxHandle,
        config: ContainerConfig,
    ) -> Result<TrackedContainer> {
        let id = self
            .service
            .create_container(&sandbox.id, &config, &sandbox.config)
            .map_err(VerifyError::service("CreateContainer", &config.metadata.name))?;
        tracing::info!(id = %id, sandbox = %sandbox.id, "created container");
        Ok(TrackedContainer {
            id,
            sandbox_id: sandbox.id.clone(),
            config,
            state: ContainerState::Created,
        })
    }

    /// Starts a container.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::IllegalTransition`] without contacting the
    /// runtime unless the container is `created`, or
    /// [`VerifyError::Service`] if `StartContainer` fails.
    pub fn start(&self, container: &mut TrackedContainer) -> Result<()> {
        self.transition(container, Transition::Start, |svc, id| {
            svc.start_container(id)
        })
    }

    /// Stops a container, giving it `timeout_secs` before it is killed.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::IllegalTransition`] without contacting the
    /// runtime if the container was never started, or
    /// [`VerifyError::Service`] if `StopContainer` fails.
    pub fn stop(&self, container: &mut TrackedContainer, timeout_secs: i64) -> Result<()> {
        self.transition(container, Transition::Stop, |svc, id| {
            svc.stop_container(id, timeout_secs)
        })
    }

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if `RemoveContainer` fails.
    pub fn remove(&self, container: &TrackedContainer) -> Result<()> {
        Transition::Remove.check(&container.id, container.state)?;
        self.service
            .remove_container(&container.id)
            .map_err(VerifyError::service("RemoveContainer", &container.id))?;
        tracing::info!(id = %container.id, "removed container");
        Ok(())
    }

    fn transition<F>(
        &self,
        container: &mut TrackedContainer,
        transition: Transition,
        call: F,
    ) -> Result<()>
    where
        F: FnOnce(&S, &ContainerId) -> crivet_common::error::Result<()>,
    {
        transition.check(&container.id, container.state)?;
        let op = match transition {
            Transition::Start => "StartContainer",
            Transition::Stop => "StopContainer",
            Transition::Remove => "RemoveContainer",
        };
        call(self.service, &container.id)
            .map_err(VerifyError::service(op, &container.id))?;
        if let Some(target) = transition.target() {
            container.state = target;
        }
        tracing::info!(id = %container.id, "{transition} container");
        Ok(())
    }

    /// Queries the status of a container and records the observed state.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if `ContainerStatus` fails.
    pub fn status(&self, container: &mut TrackedContainer) -> Result<ContainerStatus> {
        let status = self
            .service
            .container_status(&container.id)
            .map_err(VerifyError::service("ContainerStatus", &container.id))?;
        container.state = status.state;
        Ok(status)
    }

    /// Lists the containers with ID `id`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Service`] if `ListContainers` fails.
    pub fn query_by_id(&self, id: &ContainerId) -> Result<Vec<Container>> {
        tracing::info!(id = %id, "list containers for id");
        self.service
            .list_containers(&ContainerFilter::by_id(id))
            .map_err(VerifyError::service("ListContainers", id))
    }

    /// Checks that the runtime reports `expected` for the container.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::StateMismatch`] if the reported state differs.
    pub fn verify_state(
        &self,
        container: &mut TrackedContainer,
        expected: ContainerState,
    ) -> Result<ContainerStatus> {
        let status = self.status(container)?;
        if status.state != expected {
            return Err(VerifyError::StateMismatch {
                id: container.id.clone(),
                expected,
                actual: status.state,
            });
        }
        Ok(status)
    }

    /// Waits until the runtime reports `expected` for the container, bounded
    /// by the configured poll timeout.
    ///
    /// # Errors
    ///
    /// See [`crate::poller::wait_for_state`].
    pub fn wait_for_state(
        &self,
        container: &mut TrackedContainer,
        expected: ContainerState,
    ) -> Result<ContainerStatus> {
        let config = self.config();
        let result = crate::poller::wait_for_state(
            self.service,
            &container.id,
            expected,
            config.poll_interval(),
            config.poll_timeout(),
        );
        match &result {
            Ok(status) => container.state = status.state,
            Err(VerifyError::StateMismatch { actual, .. }) => container.state = *actual,
            Err(VerifyError::Timeout { last, .. }) => container.state = *last,
            Err(_) => {}
        }
        result
    }

    // ── Verified steps ──────────────────────────────────────────────

    /// Creates a long-running test container in `sandbox` and checks that it
    /// is `created`.
    ///
    /// # Errors
    ///
    /// Fails if the create call fails or the container is in another state.
    pub fn create_and_verify(&self, sandbox: &SandboxHandle) -> Result<TrackedContainer> {
        let config = self.requests.default_container(CREATE_TEST_PREFIX);
        self.create_with_and_verify(sandbox, config)
    }

    /// Creates a container from `config` and checks that it is `created`.
    ///
    /// # Errors
    ///
    /// Fails if the create call fails or the container is in another state.
    pub fn create_with_and_verify(
        &self,
        sandbox: &SandboxHandle,
        config: ContainerConfig,
    ) -> Result<TrackedContainer> {
        let mut container = self.create(sandbox, config)?;
        let _ = self.verify_state(&mut container, ContainerState::Created)?;
        Ok(container)
    }

    /// Starts a container and checks that it is `running`.
    ///
    /// # Errors
    ///
    /// Fails if the start call fails or the container is in another state.
    pub fn start_and_verify(&self, container: &mut TrackedContainer) -> Result<()> {
        self.start(container)?;
        let _ = self.verify_state(container, ContainerState::Running)?;
        Ok(())
    }

    /// Stops a container and checks that it is `exited`.
    ///
    /// `timeout_secs` defaults to the configured stop timeout.
    ///
    /// # Errors
    ///
    /// Fails if the stop call fails or the container is in another state.
    pub fn stop_and_verify(
        &self,
        container: &mut TrackedContainer,
        timeout_secs: Option<i64>,
    ) -> Result<()> {
        let timeout = timeout_secs.unwrap_or(self.config().stop_timeout_secs);
        self.stop(container, timeout)?;
        let _ = self.verify_state(container, ContainerState::Exited)?;
        Ok(())
    }

    /// Removes a container. The runtime guarantees it no longer exists once
    /// the call succeeds, so no status is queried.
    ///
    /// # Errors
    ///
    /// Fails if the remove call fails.
    pub fn remove_and_verify(&self, container: &TrackedContainer) -> Result<()> {
        self.remove(container)
    }
}
