//! In-process reference runtime.
//!
//! Keeps sandbox and container state in memory and models container
//! processes just far enough to exercise the harness: `echo` prints its
//! arguments to stdout and exits at once, every other command keeps running
//! until it is stopped. Captured stdout is written as JSON log lines when the
//! sandbox has a log directory and the container has a log path.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use crivet_common::error::{CrivetError, Result};
use crivet_common::jsonlog::{LogRecord, StreamTag};
use crivet_common::types::{ContainerId, ContainerState, PodSandboxState, SandboxId};

use crate::service::{
    Container, ContainerConfig, ContainerFilter, ContainerStatus, PodSandbox, PodSandboxConfig,
    PodSandboxFilter, RuntimeService,
};

/// Exit code recorded for a container killed by a stop request.
const KILLED_EXIT_CODE: i32 = 137;

#[derive(Debug)]
struct SandboxEntry {
    config: PodSandboxConfig,
    state: PodSandboxState,
}

#[derive(Debug)]
struct ContainerEntry {
    sandbox_id: SandboxId,
    config: ContainerConfig,
    log_file: Option<PathBuf>,
    state: ContainerState,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    exit_code: Option<i32>,
}

impl ContainerEntry {
    fn summary(&self, id: &ContainerId) -> Container {
        Container {
            id: id.clone(),
            pod_sandbox_id: self.sandbox_id.clone(),
            metadata: self.config.metadata.clone(),
            image: self.config.image.clone(),
            state: self.state,
        }
    }

    fn exit(&mut self, code: i32) {
        self.state = ContainerState::Exited;
        self.finished_at = Some(Utc::now());
        self.exit_code = Some(code);
    }
}

#[derive(Debug, Default)]
struct Inner {
    sandboxes: BTreeMap<SandboxId, SandboxEntry>,
    containers: BTreeMap<ContainerId, ContainerEntry>,
}

impl Inner {
    fn container_mut(&mut self, id: &ContainerId) -> Result<&mut ContainerEntry> {
        self.containers
            .get_mut(id)
            .ok_or_else(|| CrivetError::NotFound {
                kind: "container",
                id: id.to_string(),
            })
    }
}

/// Runtime service that keeps all state in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    inner: Mutex<Inner>,
}

impl InMemoryRuntime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| CrivetError::Config {
            message: "runtime state lock poisoned".into(),
        })
    }
}

/// Output an `echo` process would print, or `None` for long-running commands.
fn echo_output(command: &[String]) -> Option<String> {
    match command.split_first() {
        Some((program, args)) if program == "echo" || program.ends_with("/echo") => {
            Some(args.join(" "))
        }
        _ => None,
    }
}


impl RuntimeService for InMemoryRuntime {
    fn run_pod_sandbox(&self, config: &PodSandboxConfig) -> Result<SandboxId> {
        if config.metadata.name.is_empty() {
            return Err(CrivetError::Config {
                message: "sandbox metadata name is required".into(),
            });
        }
        let id = SandboxId::generate();
        let entry = SandboxEntry {
            config: config.clone(),
            state: PodSandboxState::Ready,
        };
        let _ = self.lock()?.sandboxes.insert(id.clone(), entry);
        tracing::info!(id = %id, name = %config.metadata.name, "sandbox created");
        Ok(id)
    }

    fn stop_pod_sandbox(&self, id: &SandboxId) -> Result<()> {
        let mut inner = self.lock()?;
        let sandbox = inner
            .sandboxes
            .get_mut(id)
            .ok_or_else(|| CrivetError::NotFound {
                kind: "sandbox",
                id: id.to_string(),
            })?;
        sandbox.state = PodSandboxState::NotReady;
        for entry in inner.containers.values_mut() {
            if entry.sandbox_id == *id && entry.state == ContainerState::Running {
                entry.exit(KILLED_EXIT_CODE);
            }
        }
        drop(inner);
        tracing::info!(id = %id, "sandbox stopped");
        Ok(())
    }

    fn remove_pod_sandbox(&self, id: &SandboxId) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.sandboxes.remove(id).is_none() {
            drop(inner);
            tracing::debug!(id = %id, "sandbox already removed");
            return Ok(());
        }
        inner.containers.retain(|_, entry| entry.sandbox_id != *id);
        drop(inner);
        tracing::info!(id = %id, "sandbox removed");
        Ok(())
    }

    fn list_pod_sandbox(&self, filter: &PodSandboxFilter) -> Result<Vec<PodSandbox>> {
        Ok(self
            .lock()?
            .sandboxes
            .iter()
            .filter(|(id, _)| filter.id.as_ref().is_none_or(|want| want == *id))
            .map(|(id, entry)| PodSandbox {
                id: id.clone(),
                metadata: entry.config.metadata.clone(),
                state: entry.state,
            })
            .collect())
    }

    fn create_container(
        &self,
        sandbox_id: &SandboxId,
        config: &ContainerConfig,
        sandbox_config: &PodSandboxConfig,
    ) -> Result<ContainerId> {
        if config.command.is_empty() {
            return Err(CrivetError::Config {
                message: "container command is required".into(),
            });
        }
        let id = ContainerId::generate();
        let entry = ContainerEntry {
            sandbox_id: sandbox_id.clone(),
            config: config.clone(),
            log_file: crate::logs::container_log_file(sandbox_config, config),
            state: ContainerState::Created,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            exit_code: None,
        };

        let mut inner = self.lock()?;
        let sandbox = inner
            .sandboxes
            .get(sandbox_id)
            .ok_or_else(|| CrivetError::NotFound {
                kind: "sandbox",
                id: sandbox_id.to_string(),
            })?;
        if sandbox.state != PodSandboxState::Ready {
            return Err(CrivetError::InvalidState {
                id: sandbox_id.to_string(),
                message: format!("sandbox is {}", sandbox.state),
            });
        }
        let _ = inner.containers.insert(id.clone(), entry);
        drop(inner);
        tracing::info!(
            id = %id,
            sandbox = %sandbox_id,
            name = %config.metadata.name,
            "container created"
        );
        Ok(id)
    }

    fn start_container(&self, id: &ContainerId) -> Result<()> {
        let mut inner = self.lock()?;
        let entry = inner.container_mut(id)?;
        if entry.state != ContainerState::Created {
            return Err(CrivetError::InvalidState {
                id: id.to_string(),
                message: format!("cannot start a container that is {}", entry.state),
            });
        }

        // A failed log write must leave the container in Created.
        let output = echo_output(&entry.config.command);
        if let (Some(output), Some(path)) = (&output, &entry.log_file) {
            let record = LogRecord::new(StreamTag::Stdout, output.as_str());
            crate::logs::append_record(path, &record)?;
        }

        entry.state = ContainerState::Running;
        entry.started_at = Some(Utc::now());
        let exited = output.is_some();
        if exited {
            entry.exit(0);
        }
        drop(inner);

        tracing::info!(id = %id, "container started");
        if exited {
            tracing::info!(id = %id, "container exited");
        }
        Ok(())
    }

    fn stop_container(&self, id: &ContainerId, timeout_secs: i64) -> Result<()> {
        let mut inner = self.lock()?;
        let entry = inner.container_mut(id)?;
        let previous = entry.state;
        match previous {
            ContainerState::Exited => {}
            ContainerState::Running => entry.exit(KILLED_EXIT_CODE),
            ContainerState::Created => {
                entry.state = ContainerState::Exited;
                entry.finished_at = Some(Utc::now());
            }
        }
        drop(inner);

        match previous {
            ContainerState::Exited => {
                tracing::debug!(id = %id, "container already exited");
            }
            ContainerState::Running => {
                tracing::info!(id = %id, timeout_secs, "container stopped");
            }
            ContainerState::Created => {
                tracing::info!(id = %id, "created container stopped before start");
            }
        }
        Ok(())
    }

    fn remove_container(&self, id: &ContainerId) -> Result<()> {
        let removed = self.lock()?.containers.remove(id).is_some();
        if removed {
            tracing::info!(id = %id, "container removed");
        } else {
            tracing::debug!(id = %id, "container already removed");
        }
        Ok(())
    }

    fn container_status(&self, id: &ContainerId) -> Result<ContainerStatus> {
        let mut inner = self.lock()?;
        let entry = inner.container_mut(id)?;
        Ok(ContainerStatus {
            id: id.clone(),
            metadata: entry.config.metadata.clone(),
            state: entry.state,
            created_at: entry.created_at,
            started_at: entry.started_at,
            finished_at: entry.finished_at,
            exit_code: entry.exit_code,
            image: entry.config.image.clone(),
            log_path: entry.config.log_path.clone(),
        })
    }

    fn list_containers(&self, filter: &ContainerFilter) -> Result<Vec<Container>> {
        Ok(self
            .lock()?
            .containers
            .iter()
            .map(|(id, entry)| entry.summary(id))
            .filter(|c| filter.matches(c))
            .collect())
    }
}
