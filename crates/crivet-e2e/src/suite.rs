//! Standard scenario suite and its runner.
//!
//! Each case creates its own sandbox, runs its lifecycle steps in order and
//! removes the sandbox again. A failing step ends its case only; the runner
//! records the failure and moves on to the next case. A panic inside a case
//! or inside the runtime under test is recorded the same way.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crivet_common::types::{ContainerId, ContainerState};
use crivet_runtime::service::{PodSandboxConfig, RuntimeService};

use crate::driver::{LifecycleDriver, SandboxHandle, container_found};
use crate::error::{Result, VerifyError};
use crate::verifier::{ExpectedLog, LogVerifier};

/// A named test case.
pub struct Case<S: RuntimeService + ?Sized> {
    /// Case name, used for filtering and reporting.
    pub name: &'static str,
    /// Case body.
    pub run: fn(&LifecycleDriver<'_, S>) -> Result<()>,
}

/// Result of one case.
#[derive(Debug)]
pub enum CaseOutcome {
    /// Every step succeeded.
    Passed,
    /// The first failing step.
    Failed(VerifyError),
    /// The case or the runtime panicked, with the panic message.
    Panicked(String),
}

/// Outcome and duration of one case.
#[derive(Debug)]
pub struct CaseReport {
    /// Case name.
    pub name: &'static str,
    /// Outcome.
    pub outcome: CaseOutcome,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl CaseReport {
    /// Returns whether the case passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed)
    }
}

/// Outcomes of a suite run, in execution order.
#[derive(Debug, Default)]
pub struct SuiteReport {
    /// Per-case reports.
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// Number of passed cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    /// Number of failed cases.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    /// Returns whether every case that ran passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Runs every case whose name contains `filter`, or all cases.
pub fn run<S: RuntimeService + ?Sized>(
    driver: &LifecycleDriver<'_, S>,
    cases: &[Case<S>],
    filter: Option<&str>,
) -> SuiteReport {
    let mut report = SuiteReport::default();
    for case in cases {
        if filter.is_some_and(|f| !case.name.contains(f)) {
            continue;
        }
        tracing::info!(case = case.name, "running case");
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| (case.run)(driver)));
        let outcome = match result {
            Ok(Ok(())) => CaseOutcome::Passed,
            Ok(Err(err)) => {
                tracing::error!(case = case.name, error = %err, "case failed");
                CaseOutcome::Failed(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(case = case.name, panic = %message, "case panicked");
                CaseOutcome::Panicked(message)
            }
        };
        report.cases.push(CaseReport {
            name: case.name,
            outcome,
            elapsed: started.elapsed(),
        });
    }
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// The standard container lifecycle and log cases.
#[must_use]
pub fn standard_cases<S: RuntimeService + ?Sized>() -> Vec<Case<S>> {
    vec![
        Case {
            name: "create container",
            run: create_container::<S>,
        },
        Case {
            name: "create container in os-container sandbox",
            run: create_container_in_os_sandbox::<S>,
        },
        Case {
            name: "start container",
            run: start_container::<S>,
        },
        Case {
            name: "stop container",
            run: stop_container::<S>,
        },
        Case {
            name: "remove container",
            run: remove_container::<S>,
        },
        Case {
            name: "start container with volume",
            run: start_volume_container::<S>,
        },
        Case {
            name: "container log",
            run: container_log::<S>,
        },
    ]
}

/// Runs `body` in a fresh sandbox and removes the sandbox afterwards,
/// whatever the outcome.
fn in_sandbox<S, F>(
    driver: &LifecycleDriver<'_, S>,
    config: PodSandboxConfig,
    body: F,
) -> Result<()>
where
    S: RuntimeService + ?Sized,
    F: FnOnce(&SandboxHandle) -> Result<()>,
{
    let sandbox = driver.run_sandbox(config)?;
    let outcome = body(&sandbox);
    let cleanup = driver.remove_sandbox(&sandbox);
    if let (Err(_), Err(err)) = (&outcome, &cleanup) {
        tracing::warn!(error = %err, "sandbox cleanup failed");
    }
    outcome.and(cleanup)
}

fn expect_listed<S: RuntimeService + ?Sized>(
    driver: &LifecycleDriver<'_, S>,
    id: &ContainerId,
    expected: usize,
) -> Result<()> {
    let found = driver.query_by_id(id)?;
    let ok = match expected {
        0 => found.is_empty(),
        _ => container_found(&found, id),
    };
    if ok {
        Ok(())
    } else {
        Err(VerifyError::ListingMismatch {
            id: id.clone(),
            expected,
            found: found.len(),
        })
    }
}

const CREATE_SANDBOX_PREFIX: &str = "PodSandbox-for-create-container-";

fn create_container<S: RuntimeService + ?Sized>(driver: &LifecycleDriver<'_, S>) -> Result<()> {
    let config = driver.requests().sandbox(CREATE_SANDBOX_PREFIX);
    in_sandbox(driver, config, |sandbox| {
        let container = driver.create_and_verify(sandbox)?;
        expect_listed(driver, container.id(), 1)
    })
}

fn create_container_in_os_sandbox<S: RuntimeService + ?Sized>(
    driver: &LifecycleDriver<'_, S>,
) -> Result<()> {
    let config = driver
        .requests()
        .os_container_sandbox(CREATE_SANDBOX_PREFIX);
    in_sandbox(driver, config, |sandbox| {
        let container = driver.create_and_verify(sandbox)?;
        expect_listed(driver, container.id(), 1)
    })
}

fn start_container<S: RuntimeService + ?Sized>(driver: &LifecycleDriver<'_, S>) -> Result<()> {
    let config = driver.requests().sandbox(CREATE_SANDBOX_PREFIX);
    in_sandbox(driver, config, |sandbox| {
        let mut container = driver.create_and_verify(sandbox)?;
        driver.start_and_verify(&mut container)
    })
}

fn stop_container<S: RuntimeService + ?Sized>(driver: &LifecycleDriver<'_, S>) -> Result<()> {
    let config = driver.requests().sandbox(CREATE_SANDBOX_PREFIX);
    in_sandbox(driver, config, |sandbox| {
        let mut container = driver.create_and_verify(sandbox)?;
        driver.start_and_verify(&mut container)?;
        driver.stop_and_verify(&mut container, None)
    })
}

fn remove_container<S: RuntimeService + ?Sized>(driver: &LifecycleDriver<'_, S>) -> Result<()> {
    let config = driver.requests().sandbox(CREATE_SANDBOX_PREFIX);
    in_sandbox(driver, config, |sandbox| {
        let container = driver.create_and_verify(sandbox)?;
        let id = container.id().clone();
        driver.remove_and_verify(&container)?;
        expect_listed(driver, &id, 0)
    })
}

fn start_volume_container<S: RuntimeService + ?Sized>(
    driver: &LifecycleDriver<'_, S>,
) -> Result<()> {
    let config = driver.requests().sandbox(CREATE_SANDBOX_PREFIX);
    in_sandbox(driver, config, |sandbox| {
        let vol_path = std::env::temp_dir();
        let config = driver
            .requests()
            .volume_container("container-with-volume-test-", &vol_path, "flag");
        let mut container = driver.create_with_and_verify(sandbox, config)?;
        driver.start_and_verify(&mut container)?;
        driver.stop_and_verify(&mut container, None)
    })
}

fn container_log<S: RuntimeService + ?Sized>(driver: &LifecycleDriver<'_, S>) -> Result<()> {
    let config = driver
        .requests()
        .sandbox_with_log_directory("PodSandbox-with-log-directory-");
    in_sandbox(driver, config, |sandbox| {
        if let Some(dir) = sandbox.log_directory() {
            std::fs::create_dir_all(dir).map_err(|source| VerifyError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let config = driver.requests().log_container("container-for-log-test-");
        let mut container = driver.create_with_and_verify(sandbox, config)?;
        driver.start(&mut container)?;
        let _ = driver.wait_for_state(&mut container, ContainerState::Exited)?;
        driver.stop_and_verify(&mut container, None)?;

        let expected = ExpectedLog::stdout(driver.config().log_message.clone());
        let verifier = LogVerifier::for_container(sandbox, &container)?;
        let _ = verifier.verify(&expected)?;

        let id = container.id().clone();
        driver.remove_and_verify(&container)?;
        expect_listed(driver, &id, 0)
    })
}
