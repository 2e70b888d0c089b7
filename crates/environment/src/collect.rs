//! 아티팩트 수집 보고서와 단계별 쓰기 헬퍼
//!
//! 수집은 run 결과를 바꾸지 않습니다. 각 단계는 독립적으로 시도되고,
//! 실패는 warn 로그와 함께 [`CollectionReport`]에 기록됩니다.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use autoe2e_core::types::RunId;

/// 실패한 수집 단계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionFailure {
    pub step: String,
    pub reason: String,
}

/// 아티팩트 수집 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    /// 작성된 파일
    pub written: Vec<PathBuf>,
    /// 실패한 단계
    pub failures: Vec<CollectionFailure>,
}

impl CollectionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_written(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "artifact written");
        self.written.push(path);
    }

    pub fn record_failure(&mut self, step: impl Into<String>, reason: impl Into<String>) {
        let failure = CollectionFailure {
            step: step.into(),
            reason: reason.into(),
        };
        warn!(step = %failure.step, reason = %failure.reason, "artifact collection step failed");
        self.failures.push(failure);
    }

    /// 텍스트 파일을 쓰고 결과를 기록합니다.
    pub async fn write_text(&mut self, step: &str, path: &Path, contents: &str) {
        match tokio::fs::write(path, contents).await {
            Ok(()) => self.record_written(path),
            Err(e) => self.record_failure(step, format!("{}: {e}", path.display())),
        }
    }

    /// 파일을 복사하고 결과를 기록합니다.
    pub async fn copy_file(&mut self, step: &str, from: &Path, to: &Path) {
        match tokio::fs::copy(from, to).await {
            Ok(_) => self.record_written(to),
            Err(e) => self.record_failure(step, format!("{}: {e}", from.display())),
        }
    }

    /// 값을 pretty JSON으로 쓰고 결과를 기록합니다.
    pub async fn write_json<T: Serialize>(&mut self, step: &str, path: &Path, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => self.write_text(step, path, &json).await,
            Err(e) => self.record_failure(step, e.to_string()),
        }
    }
}

/// `env/metadata.json` 내용
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentMetadata {
    pub run_id: RunId,
    pub collected_at: DateTime<Utc>,
    /// `docker compose version --short` 출력
    pub compose_version: Option<String>,
    /// Docker Engine 버전 문서 (조회 실패 시 null)
    pub docker_version: serde_json::Value,
}
