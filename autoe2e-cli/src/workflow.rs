//! Run-lifecycle state machine
//!
//! ```text
//! Init -> EnvStarting -> EnvFailed ------------------------------+
//!                     \-> EnvReady -> Testing -> TestFailed ------+
//!                                            \-> TestPassed -----+
//!                                                                v
//!                            [Collecting] -> summary -> [Teardown] -> Done
//! ```
//!
//! Phases run strictly in sequence; every external call is awaited before
//! the state advances. Failures after the environment has been requested
//! never abort the run: collection and teardown problems are logged and
//! the summary is still written.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use autoe2e_core::artifacts::ArtifactLayout;
use autoe2e_core::config::{ALL_SUITES, ArtifactPolicy, ServiceSelection};
use autoe2e_core::types::{RunContext, RunExitCode};
use autoe2e_environment::{CollectionReport, EnvironmentBackend, EnvironmentSpec};
use autoe2e_readiness::{Clock, HealthProbe, ReadinessPoller, TokioClock};
use autoe2e_report::{RunSummary, TestResultSummary, build_summary, parse_results, write_summary};

use crate::error::CliError;
use crate::executor::TestRunner;

/// Default pause between readiness rounds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Workflow phase, recorded in order as the run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    EnvStarting,
    EnvFailed,
    EnvReady,
    Testing,
    TestFailed,
    TestPassed,
    Collecting,
    Teardown,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::EnvStarting => "env_starting",
            Self::EnvFailed => "env_failed",
            Self::EnvReady => "env_ready",
            Self::Testing => "testing",
            Self::TestFailed => "test_failed",
            Self::TestPassed => "test_passed",
            Self::Collecting => "collecting",
            Self::Teardown => "teardown",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub exit_code: RunExitCode,
    pub summary: RunSummary,
    /// `None` when the summary could not be written.
    pub summary_path: Option<PathBuf>,
    pub phases: Vec<RunPhase>,
    /// `None` when collection was not due.
    pub collection: Option<CollectionReport>,
    /// `None` when teardown was skipped or could not be invoked.
    pub teardown_exit: Option<i32>,
    /// Whether the environment was intentionally left running.
    pub retained: bool,
}

/// One end-to-end run over an environment backend.
pub struct Workflow<B, T, P, C = TokioClock> {
    backend: B,
    tests: T,
    poller: ReadinessPoller<P, C>,
    env: EnvironmentSpec,
    layout: ArtifactLayout,
    policy: ArtifactPolicy,
    selection: ServiceSelection,
    suite: String,
    parallel: Option<u32>,
    interval: Duration,
    keep_on_fail: bool,
    remove_volumes: bool,
}

impl<B, T, P, C> Workflow<B, T, P, C>
where
    B: EnvironmentBackend,
    T: TestRunner,
    P: HealthProbe,
    C: Clock,
{
    pub fn env(&self) -> &EnvironmentSpec {
        &self.env
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Drives the run to completion and returns its outcome.
    pub async fn run(&self) -> RunOutcome {
        let mut ctx = RunContext::new(self.env.run_id.clone());
        let mut phases = vec![RunPhase::Init];
        info!(
            run_id = %ctx.run_id(),
            backend = self.backend.name(),
            artifacts = %self.layout.root().display(),
            "e2e run starting"
        );

        if let Err(e) = self.layout.ensure().await {
            warn!(run_id = %ctx.run_id(), error = %e, "failed to create artifacts layout");
        }

        self.enter(&mut phases, RunPhase::EnvStarting);
        let (exit_code, tests_ran) = if self.start_environment().await {
            ctx.mark_env_ready();
            self.enter(&mut phases, RunPhase::EnvReady);

            self.enter(&mut phases, RunPhase::Testing);
            let passed = self.run_tests().await;
            ctx.mark_test_end();
            if passed {
                self.enter(&mut phases, RunPhase::TestPassed);
                (RunExitCode::Success, true)
            } else {
                self.enter(&mut phases, RunPhase::TestFailed);
                (RunExitCode::TestFailure, true)
            }
        } else {
            self.enter(&mut phases, RunPhase::EnvFailed);
            (RunExitCode::EnvironmentFailure, false)
        };

        let collection = if self.policy.should_collect(!exit_code.is_success()) {
            self.enter(&mut phases, RunPhase::Collecting);
            let report = self
                .backend
                .collect_artifacts(&self.env, &self.layout, &self.selection)
                .await;
            if !report.is_complete() {
                warn!(
                    run_id = %ctx.run_id(),
                    failed_steps = report.failures.len(),
                    "artifact collection incomplete"
                );
            }
            Some(report)
        } else {
            None
        };

        let results = if tests_ran {
            self.read_results().await
        } else {
            TestResultSummary::default()
        };
        let summary = build_summary(&ctx, exit_code, results);
        let summary_path = match write_summary(&self.layout, &summary).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(run_id = %ctx.run_id(), error = %e, "failed to write run summary");
                None
            }
        };

        // environment failures are torn down regardless of keep_on_fail
        let retained = exit_code == RunExitCode::TestFailure && self.keep_on_fail;
        let teardown_exit = if retained {
            info!(
                run_id = %ctx.run_id(),
                project = %self.env.project_name(),
                "keeping environment for debugging"
            );
            None
        } else {
            self.enter(&mut phases, RunPhase::Teardown);
            self.teardown().await
        };

        self.enter(&mut phases, RunPhase::Done);
        info!(run_id = %ctx.run_id(), exit_code = %exit_code, "e2e run finished");

        RunOutcome {
            exit_code,
            summary,
            summary_path,
            phases,
            collection,
            teardown_exit,
            retained,
        }
    }

    fn enter(&self, phases: &mut Vec<RunPhase>, phase: RunPhase) {
        info!(run_id = %self.env.run_id, phase = %phase, "workflow phase");
        phases.push(phase);
    }

    /// `up`, then readiness polling. `false` means the environment failed.
    async fn start_environment(&self) -> bool {
        match self.backend.up(&self.env).await {
            Ok(0) => {}
            Ok(code) => {
                error!(run_id = %self.env.run_id, exit_code = code, "environment start failed");
                return false;
            }
            Err(e) => {
                error!(run_id = %self.env.run_id, error = %e, "environment start failed");
                return false;
            }
        }

        let ready = self
            .poller
            .wait_ready(&self.env.health_checks, self.env.timeout, self.interval)
            .await;
        if !ready {
            error!(
                run_id = %self.env.run_id,
                timeout_secs = self.env.timeout.as_secs(),
                "environment not ready before timeout"
            );
        }
        ready
    }

    async fn run_tests(&self) -> bool {
        match self
            .tests
            .run(&self.suite, self.parallel, &self.layout.junit_xml())
            .await
        {
            Ok(0) => true,
            Ok(code) => {
                warn!(run_id = %self.env.run_id, exit_code = code, "tests failed");
                false
            }
            Err(e) => {
                error!(run_id = %self.env.run_id, error = %e, "test engine could not run");
                false
            }
        }
    }

    async fn read_results(&self) -> TestResultSummary {
        match parse_results(self.layout.junit_xml()).await {
            Ok(results) => results,
            Err(e) => {
                warn!(run_id = %self.env.run_id, error = %e, "could not read test results");
                TestResultSummary::default()
            }
        }
    }

    async fn teardown(&self) -> Option<i32> {
        match self.backend.down(&self.env, self.remove_volumes).await {
            Ok(code) => {
                if code != 0 {
                    warn!(run_id = %self.env.run_id, exit_code = code, "teardown reported failure");
                }
                Some(code)
            }
            Err(e) => {
                warn!(run_id = %self.env.run_id, error = %e, "teardown failed");
                None
            }
        }
    }
}

/// Builder for [`Workflow`].
pub struct WorkflowBuilder<B, T, P, C = TokioClock> {
    env: EnvironmentSpec,
    layout: ArtifactLayout,
    backend: Option<B>,
    tests: Option<T>,
    poller: Option<ReadinessPoller<P, C>>,
    policy: ArtifactPolicy,
    selection: ServiceSelection,
    suite: String,
    parallel: Option<u32>,
    interval: Duration,
    keep_on_fail: bool,
    remove_volumes: bool,
}

impl<B, T, P, C> WorkflowBuilder<B, T, P, C>
where
    B: EnvironmentBackend,
    T: TestRunner,
    P: HealthProbe,
    C: Clock,
{
    pub fn new(env: EnvironmentSpec, layout: ArtifactLayout) -> Self {
        Self {
            env,
            layout,
            backend: None,
            tests: None,
            poller: None,
            policy: ArtifactPolicy::default(),
            selection: ServiceSelection::default(),
            suite: ALL_SUITES.to_owned(),
            parallel: None,
            interval: DEFAULT_POLL_INTERVAL,
            keep_on_fail: false,
            remove_volumes: true,
        }
    }

    pub fn backend(mut self, backend: B) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn test_runner(mut self, tests: T) -> Self {
        self.tests = Some(tests);
        self
    }

    pub fn poller(mut self, poller: ReadinessPoller<P, C>) -> Self {
        self.poller = Some(poller);
        self
    }

    /// When to collect artifacts.
    pub fn policy(mut self, policy: ArtifactPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Which services get per-service log files.
    pub fn selection(mut self, selection: ServiceSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = suite.into();
        self
    }

    pub fn parallel(mut self, parallel: Option<u32>) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Leave the environment running when tests fail.
    pub fn keep_on_fail(mut self, keep: bool) -> Self {
        self.keep_on_fail = keep;
        self
    }

    pub fn remove_volumes(mut self, remove: bool) -> Self {
        self.remove_volumes = remove;
        self
    }

    pub fn build(self) -> Result<Workflow<B, T, P, C>, CliError> {
        let backend = self
            .backend
            .ok_or_else(|| CliError::Command("workflow backend must be provided".to_owned()))?;
        let tests = self
            .tests
            .ok_or_else(|| CliError::Command("workflow test runner must be provided".to_owned()))?;
        let poller = self
            .poller
            .ok_or_else(|| CliError::Command("workflow poller must be provided".to_owned()))?;
        if self.interval.is_zero() {
            return Err(CliError::Config("poll interval must be positive".to_owned()));
        }

        Ok(Workflow {
            backend,
            tests,
            poller,
            env: self.env,
            layout: self.layout,
            policy: self.policy,
            selection: self.selection,
            suite: self.suite,
            parallel: self.parallel,
            interval: self.interval,
            keep_on_fail: self.keep_on_fail,
            remove_volumes: self.remove_volumes,
        })
    }
}
