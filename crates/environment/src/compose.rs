//! `docker compose` 직접 호출 백엔드
//!
//! 모든 명령은 `docker compose -f <절대 경로> -p autoe2e-<run_id> [--env-file <절대 경로>]`
//! 접두사를 공유하므로, 동시에 실행되는 run은 프로젝트 이름으로 격리됩니다.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use autoe2e_core::artifacts::ArtifactLayout;
use autoe2e_core::config::ServiceSelection;
use autoe2e_core::process::{CommandRunner, CommandSpec};

use crate::backend::{EnvironmentBackend, EnvironmentSpec, PathResolver};
use crate::collect::{CollectionReport, EnvironmentMetadata};
use crate::docker::{DockerClient, render_container_table};
use crate::error::EnvironmentError;

/// docker CLI 실행 파일
pub const DOCKER_BIN: &str = "docker";

/// 한 compose 프로젝트에 대한 명령 빌더
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommand {
    compose_file: PathBuf,
    project: String,
    env_file: Option<PathBuf>,
    work_dir: PathBuf,
}

impl ComposeCommand {
    /// 환경 기술의 경로를 기준 디렉토리로 절대 경로화하여 빌더를 만듭니다.
    pub fn for_env(env: &EnvironmentSpec, paths: &PathResolver) -> Self {
        Self {
            compose_file: paths.resolve(&env.compose_file),
            project: env.project_name(),
            env_file: env.env_file.as_deref().map(|p| paths.resolve(p)),
            work_dir: paths.base_dir().to_path_buf(),
        }
    }

    pub fn compose_file(&self) -> &std::path::Path {
        &self.compose_file
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// 공통 접두사 뒤에 인자를 붙인 명령
    pub fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = CommandSpec::new(DOCKER_BIN)
            .args(["compose", "-f"])
            .arg(self.compose_file.display().to_string())
            .args(["-p", self.project.as_str()]);
        if let Some(env_file) = &self.env_file {
            spec = spec
                .arg("--env-file")
                .arg(env_file.display().to_string());
        }
        spec.args(args).current_dir(&self.work_dir)
    }

    pub fn up(&self) -> CommandSpec {
        self.command(["up", "-d", "--build"])
    }

    pub fn down(&self, remove_volumes: bool) -> CommandSpec {
        let spec = self.command(["down", "--remove-orphans"]);
        if remove_volumes {
            spec.arg("--volumes")
        } else {
            spec
        }
    }

    pub fn ps(&self) -> CommandSpec {
        self.command(["ps", "-a"]).captured()
    }

    /// 프로젝트에 남은 컨테이너 ID 목록 (중지된 것 포함)
    pub fn ps_ids(&self) -> CommandSpec {
        self.command(["ps", "-a", "-q"]).captured()
    }

    pub fn logs(&self, service: Option<&str>) -> CommandSpec {
        let spec = self.command(["logs", "--no-color"]).captured();
        match service {
            Some(svc) => spec.arg(svc),
            None => spec,
        }
    }

    pub fn config_services(&self) -> CommandSpec {
        self.command(["config", "--services"]).captured()
    }
}

/// compose 로그를 읽습니다 (stdout + stderr).
pub(crate) async fn read_logs<R: CommandRunner>(
    runner: &R,
    compose: &ComposeCommand,
    service: Option<&str>,
) -> Result<String, EnvironmentError> {
    let output = runner.run(&compose.logs(service)).await?;
    if !output.success() {
        warn!(
            project = compose.project(),
            service = service.unwrap_or("*"),
            exit_code = output.exit_code,
            "docker compose logs exited with non-zero status"
        );
    }
    Ok(output.combined())
}

/// 로그를 수집할 서비스 목록을 결정합니다.
///
/// 목록이 주어지면 제외 규칙만 적용하고, 제외 규칙만 있으면
/// `docker compose config --services`로 전체 목록을 조회합니다.
pub(crate) async fn select_services<R: CommandRunner>(
    runner: &R,
    compose: &ComposeCommand,
    selection: &ServiceSelection,
    report: &mut CollectionReport,
) -> Vec<String> {
    if let Some(services) = &selection.services {
        return selection.resolve(services);
    }
    if !selection.needs_discovery() {
        return Vec::new();
    }

    match runner.run(&compose.config_services()).await {
        Ok(output) if output.success() => {
            let known: Vec<String> = output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect();
            debug!(services = ?known, "discovered compose services");
            selection.resolve(&known)
        }
        Ok(output) => {
            report.record_failure(
                "services",
                format!(
                    "docker compose config --services exited with {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            );
            Vec::new()
        }
        Err(e) => {
            report.record_failure("services", e.to_string());
            Vec::new()
        }
    }
}

/// `docker compose` 직접 호출 백엔드
pub struct ComposeBackend<R: CommandRunner, D: DockerClient> {
    runner: Arc<R>,
    docker: Arc<D>,
    paths: PathResolver,
}

impl<R: CommandRunner, D: DockerClient> ComposeBackend<R, D> {
    /// 명령 실행기, Docker 클라이언트, 기준 디렉토리로 백엔드를 생성합니다.
    pub fn new(
        runner: Arc<R>,
        docker: Arc<D>,
        base_dir: impl AsRef<std::path::Path>,
    ) -> Result<Self, EnvironmentError> {
        Ok(Self {
            runner,
            docker,
            paths: PathResolver::new(base_dir)?,
        })
    }

    fn compose(&self, env: &EnvironmentSpec) -> ComposeCommand {
        ComposeCommand::for_env(env, &self.paths)
    }

    async fn compose_version(&self) -> Option<String> {
        let spec = CommandSpec::new(DOCKER_BIN)
            .args(["compose", "version", "--short"])
            .captured();
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => Some(output.stdout.trim().to_owned()),
            Ok(output) => {
                debug!(exit_code = output.exit_code, "compose version query failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "compose version query failed");
                None
            }
        }
    }

    /// 엔진 API로 버전을 조회하고, 실패하면 `docker version --format json`으로 대체합니다.
    async fn docker_version(&self) -> serde_json::Value {
        match self.docker.engine_version().await {
            Ok(version) => return version,
            Err(e) => debug!(error = %e, "engine version query failed, falling back to cli"),
        }

        let spec = CommandSpec::new(DOCKER_BIN)
            .args(["version", "--format", "json"])
            .captured();
        match self.runner.run(&spec).await {
            Ok(output) => serde_json::from_str(&output.stdout).unwrap_or_else(|_| {
                let text = output.stdout.trim();
                if text.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(text.to_owned())
                }
            }),
            Err(_) => serde_json::Value::Null,
        }
    }
}

impl<R: CommandRunner, D: DockerClient> EnvironmentBackend for ComposeBackend<R, D> {
    fn name(&self) -> &'static str {
        "compose"
    }

    async fn up(&self, env: &EnvironmentSpec) -> Result<i32, EnvironmentError> {
        let compose = self.compose(env);
        info!(project = compose.project(), compose_file = %compose.compose_file().display(), "starting environment");
        let output = self.runner.run(&compose.up()).await?;
        Ok(output.exit_code)
    }

    async fn down(&self, env: &EnvironmentSpec, remove_volumes: bool) -> Result<i32, EnvironmentError> {
        let compose = self.compose(env);
        info!(project = compose.project(), remove_volumes, "tearing down environment");
        let output = self.runner.run(&compose.down(remove_volumes)).await?;
        if output.success() {
            return Ok(0);
        }

        // compose가 실패를 보고해도 프로젝트 컨테이너가 없으면 이미 제거된 상태
        match self.docker.list_project_containers(compose.project()).await {
            Ok(remaining) if remaining.is_empty() => {
                info!(
                    project = compose.project(),
                    exit_code = output.exit_code,
                    "compose down failed but no containers remain, treating as removed"
                );
                Ok(0)
            }
            Ok(remaining) => {
                warn!(
                    project = compose.project(),
                    remaining = remaining.len(),
                    exit_code = output.exit_code,
                    "compose down failed"
                );
                Ok(output.exit_code)
            }
            Err(e) => {
                warn!(project = compose.project(), error = %e, "compose down failed and containers could not be listed");
                Ok(output.exit_code)
            }
        }
    }

    async fn status(&self, env: &EnvironmentSpec) -> Result<String, EnvironmentError> {
        let compose = self.compose(env);
        match self.docker.list_project_containers(compose.project()).await {
            Ok(containers) => Ok(render_container_table(&containers)),
            Err(e) => {
                warn!(error = %e, "docker api unavailable, falling back to compose ps");
                let output = self.runner.run(&compose.ps()).await?;
                Ok(output.stdout)
            }
        }
    }

    async fn logs(
        &self,
        env: &EnvironmentSpec,
        service: Option<&str>,
    ) -> Result<String, EnvironmentError> {
        read_logs(self.runner.as_ref(), &self.compose(env), service).await
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

        let compose = self.compose(env);
        info!(project = compose.project(), dir = %layout.root().display(), "collecting artifacts");

        match read_logs(self.runner.as_ref(), &compose, None).await {
            Ok(text) => report.write_text("logs", &layout.combined_log(), &text).await,
            Err(e) => report.record_failure("logs", e.to_string()),
        }

        for service in select_services(self.runner.as_ref(), &compose, selection, &mut report).await {
            let step = format!("logs:{service}");
            match read_logs(self.runner.as_ref(), &compose, Some(&service)).await {
                Ok(text) => {
                    report
                        .write_text(&step, &layout.service_log(&service), &text)
                        .await
                }
                Err(e) => report.record_failure(step, e.to_string()),
            }
        }

        report
            .copy_file("compose", compose.compose_file(), &layout.compose_copy())
            .await;

        match self.status(env).await {
            Ok(text) => {
                report
                    .write_text("container_states", &layout.container_states(), &text)
                    .await
            }
            Err(e) => report.record_failure("container_states", e.to_string()),
        }

        let metadata = EnvironmentMetadata {
            run_id: env.run_id.clone(),
            collected_at: Utc::now(),
            compose_version: self.compose_version().await,
            docker_version: self.docker_version().await,
        };
        report
            .write_json("metadata", &layout.metadata_json(), &metadata)
            .await;

        report
    }
}
