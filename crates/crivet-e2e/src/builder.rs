//! Request payloads used by the scenarios.
//!
//! Every identity field, image, timeout and log message comes from the
//! [`HarnessConfig`]; names are prefixes completed by a [`NameGenerator`].

use std::collections::BTreeMap;
use std::path::Path;

use crivet_common::config::HarnessConfig;
use crivet_common::constants::OS_CONTAINER_ANNOTATION;
use crivet_runtime::service::{
    ContainerConfig, ContainerMetadata, ImageSpec, Mount, PodSandboxConfig, PodSandboxMetadata,
};

use crate::names::NameGenerator;

/// Builds sandbox and container configurations from harness defaults.
#[derive(Clone, Copy)]
pub struct RequestBuilder<'a> {
    config: &'a HarnessConfig,
    names: &'a dyn NameGenerator,
}

impl std::fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder over `config` drawing names from `names`.
    #[must_use]
    pub fn new(config: &'a HarnessConfig, names: &'a dyn NameGenerator) -> Self {
        Self { config, names }
    }

    /// Harness configuration the builder reads from.
    #[must_use]
    pub const fn config(&self) -> &'a HarnessConfig {
        self.config
    }

    /// Sandbox metadata with the default owner, namespace and attempt.
    #[must_use]
    pub fn sandbox_metadata(&self, name: impl Into<String>) -> PodSandboxMetadata {
        PodSandboxMetadata {
            name: name.into(),
            uid: self.config.uid.clone(),
            namespace: self.config.namespace.clone(),
            attempt: self.config.attempt,
        }
    }

    /// Container metadata with the default attempt.
    #[must_use]
    pub fn container_metadata(&self, name: impl Into<String>) -> ContainerMetadata {
        ContainerMetadata {
            name: name.into(),
            attempt: self.config.attempt,
        }
    }

    /// Plain sandbox named `prefix` plus a unique suffix.
    #[must_use]
    pub fn sandbox(&self, prefix: &str) -> PodSandboxConfig {
        PodSandboxConfig {
            metadata: self.sandbox_metadata(self.names.name(prefix)),
            ..PodSandboxConfig::default()
        }
    }

    /// Sandbox the runtime should host in an OS container rather than a VM.
    #[must_use]
    pub fn os_container_sandbox(&self, prefix: &str) -> PodSandboxConfig {
        let annotation = (OS_CONTAINER_ANNOTATION.to_string(), "true".to_string());
        PodSandboxConfig {
            annotations: BTreeMap::from([annotation]),
            ..self.sandbox(prefix)
        }
    }

    /// Sandbox whose containers log under `{log_root}/{sandbox name}`.
    #[must_use]
    pub fn sandbox_with_log_directory(&self, prefix: &str) -> PodSandboxConfig {
        let name = self.names.name(prefix);
        PodSandboxConfig {
            log_directory: Some(self.config.log_root.join(&name)),
            metadata: self.sandbox_metadata(name),
            ..PodSandboxConfig::default()
        }
    }

    fn container(&self, name: String, command: Vec<String>) -> ContainerConfig {
        ContainerConfig {
            metadata: self.container_metadata(name),
            image: ImageSpec {
                image: self.config.image.clone(),
            },
            command,
            ..ContainerConfig::default()
        }
    }

    /// Long-running container (`sh -c top`).
    #[must_use]
    pub fn default_container(&self, prefix: &str) -> ContainerConfig {
        self.container(
            self.names.name(prefix),
            vec!["sh".into(), "-c".into(), "top".into()],
        )
    }

    /// Container that bind-mounts `vol_path` at the same path and runs while
    /// `{vol_path}/{flag_file}` exists.
    #[must_use]
    pub fn volume_container(
        &self,
        prefix: &str,
        vol_path: &Path,
        flag_file: &str,
    ) -> ContainerConfig {
        let flag = vol_path.join(flag_file);
        let script = format!("while [ -f {} ]; do sleep 1; done;", flag.display());
        let command = vec!["sh".into(), "-c".into(), script];
        ContainerConfig {
            mounts: vec![Mount {
                host_path: vol_path.to_path_buf(),
                container_path: vol_path.to_path_buf(),
            }],
            ..self.container(self.names.name(prefix), command)
        }
    }

    /// Container that echoes the configured log message to stdout and logs
    /// to `{name}.log` inside the sandbox log directory.
    #[must_use]
    pub fn log_container(&self, prefix: &str) -> ContainerConfig {
        let name = self.names.name(prefix);
        ContainerConfig {
            log_path: Some(format!("{name}.log").into()),
            ..self.container(name, vec!["echo".into(), self.config.log_message.clone()])
        }
    }
}
