//! 환경 제어 계약과 런타임 백엔드 선택
//!
//! # 아키텍처
//!
//! ```text
//!            ┌──────────────────────┐
//!            │  EnvironmentBackend  │ (trait)
//!            └──────────┬───────────┘
//!          ┌────────────┼─────────────┐
//!          ▼            ▼             ▼
//!   ComposeBackend  AnsibleBackend  Backend (enum, 둘 중 하나에 위임)
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use autoe2e_core::artifacts::ArtifactLayout;
use autoe2e_core::config::{ServiceSelection, SpecConfig};
use autoe2e_core::process::CommandRunner;
use autoe2e_core::types::{HealthCheckSpec, RunId};

use crate::ansible::AnsibleBackend;
use crate::collect::CollectionReport;
use crate::compose::ComposeBackend;
use crate::docker::DockerClient;
use crate::error::EnvironmentError;

/// 한 run의 환경 기술
///
/// 경로는 설정 파일에 적힌 그대로 보관하며, 백엔드가 호출 직전에
/// 자신의 기준 디렉토리로 절대 경로화합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSpec {
    pub run_id: RunId,
    pub compose_file: PathBuf,
    pub env_file: Option<PathBuf>,
    pub health_checks: Vec<HealthCheckSpec>,
    /// 준비 상태 대기 시간 (ansible `up.yml`에 전달)
    pub timeout: Duration,
}

impl EnvironmentSpec {
    pub fn new(run_id: RunId, compose_file: impl Into<PathBuf>) -> Self {
        Self {
            run_id,
            compose_file: compose_file.into(),
            env_file: None,
            health_checks: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &SpecConfig, run_id: RunId) -> Self {
        Self {
            run_id,
            compose_file: PathBuf::from(&config.compose_file),
            env_file: config.env_file.as_ref().map(PathBuf::from),
            health_checks: config.health_checks.clone(),
            timeout: config.timeout_duration(),
        }
    }

    /// compose 프로젝트 이름 (`autoe2e-<run_id>`)
    pub fn project_name(&self) -> String {
        self.run_id.project_name()
    }
}

/// 상대 경로를 고정된 기준 디렉토리로 해석합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    /// 기준 디렉토리를 절대 경로로 고정합니다.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let base_dir = base_dir.as_ref();
        let absolute = std::path::absolute(base_dir).map_err(|e| EnvironmentError::Path {
            path: base_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { base_dir: absolute })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// 환경 제어 capability 집합
///
/// 외부 명령의 0이 아닌 종료 코드는 `Ok(code)`로 반환합니다.
/// 명령을 실행할 수 없는 경우에만 `Err`를 반환합니다.
pub trait EnvironmentBackend: Send + Sync + 'static {
    /// 로그/출력용 백엔드 이름
    fn name(&self) -> &'static str;

    /// 환경을 기동합니다. 준비 상태를 기다리지 않습니다.
    fn up(&self, env: &EnvironmentSpec)
    -> impl Future<Output = Result<i32, EnvironmentError>> + Send;

    /// 환경을 제거합니다. 이미 없는 환경에 대해서도 성공을 반환합니다.
    fn down(
        &self,
        env: &EnvironmentSpec,
        remove_volumes: bool,
    ) -> impl Future<Output = Result<i32, EnvironmentError>> + Send;

    /// 사람이 읽을 수 있는 컨테이너 상태 목록
    fn status(
        &self,
        env: &EnvironmentSpec,
    ) -> impl Future<Output = Result<String, EnvironmentError>> + Send;

    /// 컨테이너 로그 (stdout + stderr). `service`가 없으면 전체 로그.
    fn logs(
        &self,
        env: &EnvironmentSpec,
        service: Option<&str>,
    ) -> impl Future<Output = Result<String, EnvironmentError>> + Send;

    /// 진단 아티팩트를 수집합니다. 실패는 보고서에 기록되며 전파되지 않습니다.
    fn collect_artifacts(
        &self,
        env: &EnvironmentSpec,
        layout: &ArtifactLayout,
        selection: &ServiceSelection,
    ) -> impl Future<Output = CollectionReport> + Send;
}

/// 백엔드 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Compose,
    Ansible,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compose => f.write_str("compose"),
            Self::Ansible => f.write_str("ansible"),
        }
    }
}

/// 런타임에 선택되는 백엔드
pub enum Backend<R: CommandRunner, D: DockerClient> {
    Compose(ComposeBackend<R, D>),
    Ansible(AnsibleBackend<R>),
}

impl<R: CommandRunner, D: DockerClient> Backend<R, D> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Compose(_) => BackendKind::Compose,
            Self::Ansible(_) => BackendKind::Ansible,
        }
    }
}

impl<R: CommandRunner, D: DockerClient> EnvironmentBackend for Backend<R, D> {
    fn name(&self) -> &'static str {
        match self {
            Self::Compose(b) => b.name(),
            Self::Ansible(b) => b.name(),
        }
    }

    async fn up(&self, env: &EnvironmentSpec) -> Result<i32, EnvironmentError> {
        match self {
            Self::Compose(b) => b.up(env).await,
            Self::Ansible(b) => b.up(env).await,
        }
    }

    async fn down(&self, env: &EnvironmentSpec, remove_volumes: bool) -> Result<i32, EnvironmentError> {
        match self {
            Self::Compose(b) => b.down(env, remove_volumes).await,
            Self::Ansible(b) => b.down(env, remove_volumes).await,
        }
    }

    async fn status(&self, env: &EnvironmentSpec) -> Result<String, EnvironmentError> {
        match self {
            Self::Compose(b) => b.status(env).await,
            Self::Ansible(b) => b.status(env).await,
        }
    }

    async fn logs(
        &self,
        env: &EnvironmentSpec,
        service: Option<&str>,
    ) -> Result<String, EnvironmentError> {
        match self {
            Self::Compose(b) => b.logs(env, service).await,
            Self::Ansible(b) => b.logs(env, service).await,
        }
    }

    async fn collect_artifacts(
        &self,
        env: &EnvironmentSpec,
        layout: &ArtifactLayout,
        selection: &ServiceSelection,
    ) -> CollectionReport {
        match self {
            Self::Compose(b) => b.collect_artifacts(env, layout, selection).await,
            Self::Ansible(b) => b.collect_artifacts(env, layout, selection).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::docker::MockDockerClient;
    use crate::testing::RecordingRunner;

    fn run_id() -> RunId {
        RunId::parse("abc123def456").unwrap()
    }

    #[test]
    fn spec_from_config_keeps_raw_paths() {
        let config = SpecConfig::parse_yaml(
            "compose_file: stack/compose.yml\nbase_url: http://localhost\nenv_file: .env\ntimeout: 30\n",
        )
        .unwrap();
        let env = EnvironmentSpec::from_config(&config, run_id());
        assert_eq!(env.compose_file, Path::new("stack/compose.yml"));
        assert_eq!(env.env_file.as_deref(), Some(Path::new(".env")));
        assert_eq!(env.timeout, Duration::from_secs(30));
        assert_eq!(env.project_name(), "autoe2e-abc123def456");
    }

    #[test]
    fn resolver_joins_relative_and_keeps_absolute() {
        let resolver = PathResolver::new("/work/project").unwrap();
        assert_eq!(
            resolver.resolve(Path::new("docker-compose.yml")),
            Path::new("/work/project/docker-compose.yml")
        );
        assert_eq!(
            resolver.resolve(Path::new("/etc/compose.yml")),
            Path::new("/etc/compose.yml")
        );
    }

    #[test]
    fn resolver_makes_relative_base_absolute() {
        let resolver = PathResolver::new("relative/dir").unwrap();
        assert!(resolver.base_dir().is_absolute());
    }

    #[tokio::test]
    async fn enum_delegates_to_active_backend() {
        let runner = Arc::new(RecordingRunner::new());
        let compose = ComposeBackend::new(
            Arc::clone(&runner),
            Arc::new(MockDockerClient::new()),
            "/work",
        )
        .unwrap();
        let backend: Backend<RecordingRunner, MockDockerClient> = Backend::Compose(compose);

        assert_eq!(backend.kind(), BackendKind::Compose);
        assert_eq!(backend.name(), "compose");
        let code = backend
            .up(&EnvironmentSpec::new(run_id(), "docker-compose.yml"))
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn enum_delegates_to_ansible() {
        let runner = Arc::new(RecordingRunner::new());
        let ansible = AnsibleBackend::new(Arc::clone(&runner), "/work/playbooks", "/work").unwrap();
        let backend: Backend<RecordingRunner, MockDockerClient> = Backend::Ansible(ansible);

        assert_eq!(backend.kind(), BackendKind::Ansible);
        backend
            .down(&EnvironmentSpec::new(run_id(), "docker-compose.yml"), true)
            .await
            .unwrap();
        assert!(runner.command_lines()[0].starts_with("ansible-playbook /work/playbooks/down.yml"));
    }
}
