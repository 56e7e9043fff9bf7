//! End-to-end tests of the in-memory runtime.
//!
//! These tests verify the runtime from the outside, through the service
//! trait only:
//! 1. Sandbox and container bookkeeping
//! 2. Container state changes and exit codes
//! 3. Log capture into JSON log files
//! 4. Filtering and cascading removal

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use crivet_common::error::CrivetError;
use crivet_common::jsonlog::{LogRecord, StreamTag};
use crivet_common::types::{ContainerState, PodSandboxState};
use crivet_runtime::memory::InMemoryRuntime;
use crivet_runtime::service::{
    ContainerConfig, ContainerFilter, ContainerMetadata, PodSandboxConfig, PodSandboxFilter,
    PodSandboxMetadata, RuntimeService,
};

fn sandbox(name: &str, log_directory: Option<&Path>) -> PodSandboxConfig {
    PodSandboxConfig {
        metadata: PodSandboxMetadata {
            name: name.into(),
            uid: "e2e-cri-uid".into(),
            namespace: "e2e-cri-namespace".into(),
            attempt: 2,
        },
        log_directory: log_directory.map(Path::to_path_buf),
        ..PodSandboxConfig::default()
    }
}

fn container(name: &str, command: &[&str], log_path: Option<&str>) -> ContainerConfig {
    ContainerConfig {
        metadata: ContainerMetadata {
            name: name.into(),
            attempt: 2,
        },
        command: command.iter().map(ToString::to_string).collect(),
        log_path: log_path.map(PathBuf::from),
        ..ContainerConfig::default()
    }
}

fn read_records(path: &Path) -> Vec<LogRecord> {
    std::fs::read_to_string(path)
        .expect("read log")
        .lines()
        .map(|line| LogRecord::decode(line.as_bytes()).expect("decode"))
        .collect()
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn pipeline_long_running_container() {
    let rt = InMemoryRuntime::new();
    let pod_cfg = sandbox("pod", None);
    let pod = rt.run_pod_sandbox(&pod_cfg).unwrap();

    let cfg = container("top", &["sh", "-c", "top"], None);
    let id = rt.create_container(&pod, &cfg, &pod_cfg).unwrap();
    let status = rt.container_status(&id).unwrap();
    assert_eq!(status.state, ContainerState::Created);
    assert!(status.started_at.is_none());

    rt.start_container(&id).unwrap();
    let status = rt.container_status(&id).unwrap();
    assert_eq!(status.state, ContainerState::Running);
    assert!(status.started_at.is_some());
    assert!(status.exit_code.is_none());

    rt.stop_container(&id, 60).unwrap();
    let status = rt.container_status(&id).unwrap();
    assert_eq!(status.state, ContainerState::Exited);
    assert_eq!(status.exit_code, Some(137));

    rt.remove_container(&id).unwrap();
    assert!(rt.container_status(&id).is_err());
    rt.remove_container(&id).unwrap();
}

#[test]
fn pipeline_stop_sandbox_then_create_is_rejected() {
    let rt = InMemoryRuntime::new();
    let pod_cfg = sandbox("pod", None);
    let pod = rt.run_pod_sandbox(&pod_cfg).unwrap();
    let id = rt
        .create_container(&pod, &container("top", &["top"], None), &pod_cfg)
        .unwrap();
    rt.start_container(&id).unwrap();

    rt.stop_pod_sandbox(&pod).unwrap();
    let by_pod = PodSandboxFilter::by_id(&pod);
    let pods = rt.list_pod_sandbox(&by_pod).unwrap();
    assert_eq!(pods[0].state, PodSandboxState::NotReady);
    assert_eq!(
        rt.container_status(&id).unwrap().state,
        ContainerState::Exited
    );

    let err = rt
        .create_container(&pod, &container("late", &["top"], None), &pod_cfg)
        .unwrap_err();
    assert!(matches!(err, CrivetError::InvalidState { .. }));
}

// ── Logs ─────────────────────────────────────────────────────────────

#[test]
fn pipeline_echo_output_lands_in_log_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_dir = dir.path().join("pod-with-logs");
    let rt = InMemoryRuntime::new();
    let pod_cfg = sandbox("pod-with-logs", Some(&log_dir));
    let pod = rt.run_pod_sandbox(&pod_cfg).unwrap();

    let cfg = container("echo", &["echo", "hello", "world"], Some("echo.log"));
    let id = rt.create_container(&pod, &cfg, &pod_cfg).unwrap();
    rt.start_container(&id).unwrap();

    let status = rt.container_status(&id).unwrap();
    assert_eq!(status.state, ContainerState::Exited);
    assert_eq!(status.exit_code, Some(0));
    assert_eq!(status.log_path.as_deref(), Some(Path::new("echo.log")));

    let records = read_records(&log_dir.join("echo.log"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stream, StreamTag::Stdout);
    assert_eq!(records[0].payload, b"hello world");
}

#[test]
fn pipeline_containers_share_log_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rt = InMemoryRuntime::new();
    let pod_cfg = sandbox("pod", Some(dir.path()));
    let pod = rt.run_pod_sandbox(&pod_cfg).unwrap();

    for (name, word) in [("a", "first"), ("b", "second")] {
        let cfg = container(name, &["/bin/echo", word], Some(&format!("{name}.log")));
        let id = rt.create_container(&pod, &cfg, &pod_cfg).unwrap();
        rt.start_container(&id).unwrap();
    }

    let a = read_records(&dir.path().join("a.log"));
    let b = read_records(&dir.path().join("b.log"));
    assert_eq!(a[0].payload, b"first");
    assert_eq!(b[0].payload, b"second");
}

#[test]
fn pipeline_no_log_file_without_log_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rt = InMemoryRuntime::new();
    let pod_cfg = sandbox("pod", None);
    let pod = rt.run_pod_sandbox(&pod_cfg).unwrap();

    let cfg = container("echo", &["echo", "hi"], Some("echo.log"));
    let id = rt.create_container(&pod, &cfg, &pod_cfg).unwrap();
    rt.start_container(&id).unwrap();

    assert_eq!(
        rt.container_status(&id).unwrap().state,
        ContainerState::Exited
    );
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

// ── Listing ──────────────────────────────────────────────────────────

#[test]
fn pipeline_filters_and_cascading_removal() {
    let rt = InMemoryRuntime::new();
    let first_cfg = sandbox("first", None);
    let second_cfg = sandbox("second", None);
    let first = rt.run_pod_sandbox(&first_cfg).unwrap();
    let second = rt.run_pod_sandbox(&second_cfg).unwrap();

    let running = rt
        .create_container(&first, &container("run", &["top"], None), &first_cfg)
        .unwrap();
    rt.start_container(&running).unwrap();
    let _created = rt
        .create_container(&first, &container("idle", &["top"], None), &first_cfg)
        .unwrap();
    let other = rt
        .create_container(&second, &container("other", &["top"], None), &second_cfg)
        .unwrap();

    let in_first = rt
        .list_containers(&ContainerFilter {
            pod_sandbox_id: Some(first.clone()),
            ..ContainerFilter::default()
        })
        .unwrap();
    assert_eq!(in_first.len(), 2);

    let only_running = rt
        .list_containers(&ContainerFilter {
            state: Some(ContainerState::Running),
            ..ContainerFilter::default()
        })
        .unwrap();
    assert_eq!(only_running.len(), 1);
    assert_eq!(only_running[0].id, running);

    rt.remove_pod_sandbox(&first).unwrap();
    let left = rt.list_containers(&ContainerFilter::default()).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, other);
    let by_first = PodSandboxFilter::by_id(&first);
    assert!(rt.list_pod_sandbox(&by_first).unwrap().is_empty());
    let pods = rt.list_pod_sandbox(&PodSandboxFilter::default()).unwrap();
    assert_eq!(pods.len(), 1);
}
