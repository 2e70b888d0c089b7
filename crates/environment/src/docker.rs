//! Docker Engine API abstraction.
//!
//! The [`DockerClient`] trait covers the read-only queries the compose
//! backend needs: containers belonging to a compose project and the engine
//! version. Production code uses [`BollardDockerClient`]; tests use
//! `MockDockerClient`.
//!
//! Compose labels every container it creates with
//! `com.docker.compose.project=<project>` and
//! `com.docker.compose.service=<service>`, so project scoping is a label filter.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::error::EnvironmentError;

/// Compose project label key
pub const PROJECT_LABEL: &str = "com.docker.compose.project";
/// Compose service label key
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Snapshot of one container's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerState {
    pub id: String,
    pub name: String,
    /// Compose service name, when the container carries the service label.
    pub service: Option<String>,
    pub image: String,
    /// Machine state (`running`, `exited`, ...).
    pub state: String,
    /// Human status (`Up 2 minutes`, `Exited (1) 5 seconds ago`, ...).
    pub status: String,
}

/// Renders containers as a fixed-width table.
pub fn render_container_table(containers: &[ContainerState]) -> String {
    if containers.is_empty() {
        return "no containers\n".to_owned();
    }

    let name_w = containers
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let service_w = containers
        .iter()
        .map(|c| c.service.as_deref().map_or(1, str::len))
        .max()
        .unwrap_or(0)
        .max("SERVICE".len());
    let state_w = containers
        .iter()
        .map(|c| c.state.len())
        .max()
        .unwrap_or(0)
        .max("STATE".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_w$}  {:<service_w$}  {:<state_w$}  STATUS",
        "NAME", "SERVICE", "STATE"
    );
    for c in containers {
        let _ = writeln!(
            out,
            "{:<name_w$}  {:<service_w$}  {:<state_w$}  {}",
            c.name,
            c.service.as_deref().unwrap_or("-"),
            c.state,
            c.status
        );
    }
    out
}

/// Trait abstracting Docker Engine API queries.
///
/// The trait is `Send + Sync + 'static`, allowing safe sharing across async contexts.
pub trait DockerClient: Send + Sync + 'static {
    /// Lists all containers (running or not) of a compose project.
    ///
    /// # Errors
    ///
    /// Returns `EnvironmentError::DockerApi` if the Docker API call fails.
    fn list_project_containers(
        &self,
        project: &str,
    ) -> impl Future<Output = Result<Vec<ContainerState>, EnvironmentError>> + Send;

    /// Returns the engine version document as JSON.
    fn engine_version(
        &self,
    ) -> impl Future<Output = Result<serde_json::Value, EnvironmentError>> + Send;
}

/// Production Docker client implementation using `bollard`.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the platform's default local socket.
    ///
    /// # Errors
    ///
    /// Returns `EnvironmentError::DockerConnection` if the client cannot be configured.
    pub fn connect_local() -> Result<Self, EnvironmentError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            EnvironmentError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_project_containers(
        &self,
        project: &str,
    ) -> Result<Vec<ContainerState>, EnvironmentError> {
        use bollard::container::ListContainersOptions;

        let mut filters = HashMap::new();
        filters.insert(
            "label".to_owned(),
            vec![format!("{PROJECT_LABEL}={project}")],
        );
        let options = ListContainersOptions::<String> {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| EnvironmentError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let service = container
                .labels
                .as_ref()
                .and_then(|labels| labels.get(SERVICE_LABEL))
                .cloned();

            result.push(ContainerState {
                id: container.id.unwrap_or_default(),
                name,
                service,
                image: container.image.unwrap_or_default(),
                state: container.state.unwrap_or_default(),
                status: container.status.unwrap_or_default(),
            });
        }
        result.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(result)
    }

    async fn engine_version(&self) -> Result<serde_json::Value, EnvironmentError> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| EnvironmentError::DockerApi(format!("version query failed: {e}")))?;
        serde_json::to_value(version).map_err(|e| EnvironmentError::Serialize(e.to_string()))
    }
}

/// 테스트용 Mock Docker 클라이언트
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// 프로젝트 이름 -> 컨테이너 목록
    pub projects: HashMap<String, Vec<ContainerState>>,
    /// API 호출 실패를 시뮬레이션할지 여부
    pub fail: bool,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, project: &str, container: ContainerState) -> Self {
        self.projects
            .entry(project.to_owned())
            .or_default()
            .push(container);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_project_containers(
        &self,
        project: &str,
    ) -> Result<Vec<ContainerState>, EnvironmentError> {
        if self.fail {
            return Err(EnvironmentError::DockerApi("mock failure".to_owned()));
        }
        Ok(self.projects.get(project).cloned().unwrap_or_default())
    }

    async fn engine_version(&self) -> Result<serde_json::Value, EnvironmentError> {
        if self.fail {
            return Err(EnvironmentError::DockerApi("mock failure".to_owned()));
        }
        Ok(serde_json::json!({"Version": "27.0.0", "ApiVersion": "1.46"}))
    }
}

#[cfg(test)]
pub fn sample_container(name: &str, service: &str, state: &str) -> ContainerState {
    ContainerState {
        id: format!("{name}-id"),
        name: name.to_owned(),
        service: Some(service.to_owned()),
        image: format!("{service}:latest"),
        state: state.to_owned(),
        status: if state == "running" {
            "Up 2 minutes".to_owned()
        } else {
            "Exited (0) 1 minute ago".to_owned()
        },
    }
}
