//! `ansible-playbook` 기반 백엔드
//!
//! 각 capability는 `<playbooks>/<name>.yml` 플레이북 하나에 대응하며,
//! 인자는 JSON extra vars로 전달됩니다.
//!
//! ```text
//! ansible-playbook <dir>/up.yml -i localhost, -c local -e '{"compose_file": ..., "run_id": ...}'
//! ```
//!
//! 로그 조회는 읽기 전용이므로 `docker compose logs`에 직접 위임합니다.
//! `down.yml`이 실패하면 `docker compose ps -a -q`로 남은 컨테이너를 확인하여,
//! 프로젝트가 이미 비어 있으면 성공으로 처리합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use autoe2e_core::artifacts::ArtifactLayout;
use autoe2e_core::config::ServiceSelection;
use autoe2e_core::process::{CommandRunner, CommandSpec};
use autoe2e_core::types::HealthCheckSpec;

use crate::backend::{EnvironmentBackend, EnvironmentSpec, PathResolver};
use crate::collect::CollectionReport;
use crate::compose::{ComposeCommand, read_logs, select_services};
use crate::error::EnvironmentError;

/// ansible-playbook 실행 파일
pub const ANSIBLE_BIN: &str = "ansible-playbook";

/// 플레이북 이름
pub const UP_PLAYBOOK: &str = "up.yml";
pub const DOWN_PLAYBOOK: &str = "down.yml";
pub const STATUS_PLAYBOOK: &str = "status.yml";
pub const COLLECT_PLAYBOOK: &str = "collect_artifacts.yml";

#[derive(Serialize)]
struct UpVars<'a> {
    compose_file: String,
    run_id: &'a str,
    health_checks: &'a [HealthCheckSpec],
    timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    env_file: Option<String>,
}

#[derive(Serialize)]
struct DownVars<'a> {
    compose_file: String,
    run_id: &'a str,
    remove_volumes: bool,
}

#[derive(Serialize)]
struct StatusVars<'a> {
    compose_file: String,
    run_id: &'a str,
}

#[derive(Serialize)]
struct CollectVars<'a> {
    compose_file: String,
    run_id: &'a str,
    artifacts_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<String>>,
}

/// ansible 플레이북 백엔드
pub struct AnsibleBackend<R: CommandRunner> {
    runner: Arc<R>,
    playbooks_dir: PathBuf,
    paths: PathResolver,
}

impl<R: CommandRunner> AnsibleBackend<R> {
    /// 플레이북 디렉토리와 기준 디렉토리로 백엔드를 생성합니다.
    ///
    /// 상대 경로인 플레이북 디렉토리는 기준 디렉토리로 해석됩니다.
    pub fn new(
        runner: Arc<R>,
        playbooks_dir: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<Self, EnvironmentError> {
        let paths = PathResolver::new(base_dir)?;
        let playbooks_dir = paths.resolve(playbooks_dir.as_ref());
        Ok(Self {
            runner,
            playbooks_dir,
            paths,
        })
    }

    pub fn playbooks_dir(&self) -> &Path {
        &self.playbooks_dir
    }

    fn absolute(&self, path: &Path) -> String {
        self.paths.resolve(path).display().to_string()
    }

    /// 플레이북 실행 명령을 만듭니다.
    pub fn playbook_command<T: Serialize>(
        &self,
        playbook: &str,
        extra_vars: &T,
    ) -> Result<CommandSpec, EnvironmentError> {
        let vars = serde_json::to_string(extra_vars)
            .map_err(|e| EnvironmentError::Serialize(e.to_string()))?;
        Ok(CommandSpec::new(ANSIBLE_BIN)
            .arg(self.playbooks_dir.join(playbook).display().to_string())
            .args(["-i", "localhost,", "-c", "local", "-e"])
            .arg(vars)
            .env("ANSIBLE_LOCALHOST_WARNING", "False")
            .env("ANSIBLE_INVENTORY_UNPARSED_WARNING", "False")
            .current_dir(self.paths.base_dir()))
    }
}

impl<R: CommandRunner> EnvironmentBackend for AnsibleBackend<R> {
    fn name(&self) -> &'static str {
        "ansible"
    }

    async fn up(&self, env: &EnvironmentSpec) -> Result<i32, EnvironmentError> {
        let vars = UpVars {
            compose_file: self.absolute(&env.compose_file),
            run_id: env.run_id.as_str(),
            health_checks: &env.health_checks,
            timeout_secs: env.timeout.as_secs(),
            env_file: env.env_file.as_deref().map(|p| self.absolute(p)),
        };
        info!(run_id = %env.run_id, playbook = UP_PLAYBOOK, "starting environment");
        let spec = self.playbook_command(UP_PLAYBOOK, &vars)?;
        Ok(self.runner.run(&spec).await?.exit_code)
    }

    async fn down(&self, env: &EnvironmentSpec, remove_volumes: bool) -> Result<i32, EnvironmentError> {
        let vars = DownVars {
            compose_file: self.absolute(&env.compose_file),
            run_id: env.run_id.as_str(),
            remove_volumes,
        };
        info!(run_id = %env.run_id, playbook = DOWN_PLAYBOOK, remove_volumes, "tearing down environment");
        let spec = self.playbook_command(DOWN_PLAYBOOK, &vars)?;
        let exit_code = self.runner.run(&spec).await?.exit_code;
        if exit_code == 0 {
            return Ok(0);
        }

        let compose = ComposeCommand::for_env(env, &self.paths);
        match self.runner.run(&compose.ps_ids()).await {
            Ok(output) if output.success() && output.stdout.trim().is_empty() => {
                info!(
                    project = compose.project(),
                    exit_code,
                    "down playbook failed but no containers remain, treating as removed"
                );
                Ok(0)
            }
            Ok(output) => {
                warn!(
                    project = compose.project(),
                    exit_code,
                    ps_exit_code = output.exit_code,
                    "down playbook failed"
                );
                Ok(exit_code)
            }
            Err(e) => {
                warn!(project = compose.project(), error = %e, "down playbook failed and containers could not be listed");
                Ok(exit_code)
            }
        }
    }

    async fn status(&self, env: &EnvironmentSpec) -> Result<String, EnvironmentError> {
        let vars = StatusVars {
            compose_file: self.absolute(&env.compose_file),
            run_id: env.run_id.as_str(),
        };
        let spec = self.playbook_command(STATUS_PLAYBOOK, &vars)?.captured();
        Ok(self.runner.run(&spec).await?.combined())
    }

    async fn logs(
        &self,
        env: &EnvironmentSpec,
        service: Option<&str>,
    ) -> Result<String, EnvironmentError> {
        let compose = ComposeCommand::for_env(env, &self.paths);
        read_logs(self.runner.as_ref(), &compose, service).await
    }

    async fn collect_artifacts(
        &self,
        env: &EnvironmentSpec,
        layout: &ArtifactLayout,
        selection: &ServiceSelection,
    ) -> CollectionReport {
        let mut report = CollectionReport::default();
        if let Err(e) = layout.ensure().await {
            report.record_failure("layout", format!("{}: {e}", layout.root().display()));
            return report;
        }

        let compose = ComposeCommand::for_env(env, &self.paths);
        let services = select_services(self.runner.as_ref(), &compose, selection, &mut report).await;
        let vars = CollectVars {
            compose_file: self.absolute(&env.compose_file),
            run_id: env.run_id.as_str(),
            artifacts_dir: self.absolute(layout.root()),
            services: (!services.is_empty()).then_some(services),
        };

        info!(run_id = %env.run_id, dir = %layout.root().display(), playbook = COLLECT_PLAYBOOK, "collecting artifacts");
        let result = match self.playbook_command(COLLECT_PLAYBOOK, &vars) {
            Ok(spec) => self.runner.run(&spec).await.map_err(EnvironmentError::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(output) if output.success() => report.record_written(layout.root()),
            Ok(output) => report.record_failure(
                "playbook",
                format!("{COLLECT_PLAYBOOK} exited with {}", output.exit_code),
            ),
            Err(e) => report.record_failure("playbook", e.to_string()),
        }
        report
    }
}
