//! 아티팩트 디렉토리 레이아웃
//!
//! ```text
//! <root>/
//!   logs/all.log
//!   logs/services/<service>.log
//!   reports/junit.xml
//!   reports/summary.json
//!   env/container_states.txt
//!   env/metadata.json
//!   compose/docker-compose.yml
//! ```

use std::path::{Path, PathBuf};

use crate::types::RunId;

/// 기본 아티팩트 상위 디렉토리
pub const DEFAULT_ARTIFACTS_ROOT: &str = "artifacts";

/// 한 run의 아티팩트 경로 모음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 기본 위치 `<base>/artifacts/<run_id>`
    pub fn for_run(base_dir: &Path, run_id: &RunId) -> Self {
        Self::new(base_dir.join(DEFAULT_ARTIFACTS_ROOT).join(run_id.as_str()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn env_dir(&self) -> PathBuf {
        self.root.join("env")
    }

    pub fn compose_dir(&self) -> PathBuf {
        self.root.join("compose")
    }

    pub fn combined_log(&self) -> PathBuf {
        self.logs_dir().join("all.log")
    }

    /// 서비스별 로그 디렉토리. `all.log`와 이름이 겹치지 않도록 분리합니다.
    pub fn service_logs_dir(&self) -> PathBuf {
        self.logs_dir().join("services")
    }

    /// 서비스별 로그 경로. 경로 구분자 등은 `_`로 치환합니다.
    pub fn service_log(&self, service: &str) -> PathBuf {
        let safe: String = service
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let safe = if safe.is_empty() || safe.chars().all(|c| c == '.') {
            "_".to_owned()
        } else {
            safe
        };
        self.service_logs_dir().join(format!("{safe}.log"))
    }

    pub fn junit_xml(&self) -> PathBuf {
        self.reports_dir().join("junit.xml")
    }

    pub fn summary_json(&self) -> PathBuf {
        self.reports_dir().join("summary.json")
    }

    pub fn container_states(&self) -> PathBuf {
        self.env_dir().join("container_states.txt")
    }

    pub fn metadata_json(&self) -> PathBuf {
        self.env_dir().join("metadata.json")
    }

    pub fn compose_copy(&self) -> PathBuf {
        self.compose_dir().join("docker-compose.yml")
    }

    /// 모든 하위 디렉토리를 생성합니다. 여러 번 호출해도 안전합니다.
    pub async fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            self.logs_dir(),
            self.service_logs_dir(),
            self.reports_dir(),
            self.env_dir(),
            self.compose_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}
