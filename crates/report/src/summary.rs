//! run summary 생성 및 기록

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use autoe2e_core::artifacts::ArtifactLayout;
use autoe2e_core::types::{RunContext, RunExitCode, RunId};

use crate::error::ReportError;
use crate::junit::{FailureDetail, TestResultSummary};

/// `reports/summary.json` 내용
///
/// 단계가 완료되지 않은 시간 항목은 `null`로 기록됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub timestamp: Option<DateTime<Utc>>,
    pub exit_code: RunExitCode,
    pub environment_bring_up_time_seconds: Option<f64>,
    pub test_runtime_seconds: Option<f64>,
    pub total_tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub failures: Vec<FailureDetail>,
}

impl RunSummary {
    /// 테스트 결과 부분만 다시 묶어 반환합니다.
    pub fn results(&self) -> TestResultSummary {
        TestResultSummary {
            total: self.total_tests,
            passed: self.passed,
            failed: self.failed,
            failures: self.failures.clone(),
        }
    }
}

/// 실행 컨텍스트, 종료 코드, 테스트 결과로 summary를 만듭니다.
pub fn build_summary(
    ctx: &RunContext,
    exit_code: RunExitCode,
    results: TestResultSummary,
) -> RunSummary {
    let bring_up = ctx
        .env_ready_time()
        .map(|ready| seconds_between(ctx.start_time(), ready));
    let test_runtime = match (ctx.env_ready_time(), ctx.test_end_time()) {
        (Some(ready), Some(ended)) => Some(seconds_between(ready, ended)),
        _ => None,
    };

    RunSummary {
        run_id: ctx.run_id().clone(),
        timestamp: Some(ctx.start_time()),
        exit_code,
        environment_bring_up_time_seconds: bring_up,
        test_runtime_seconds: test_runtime,
        total_tests: results.total,
        passed: results.passed,
        failed: results.failed,
        failures: results.failures,
    }
}

/// summary를 `reports/summary.json`에 pretty JSON으로 기록합니다.
///
/// `reports/` 디렉토리가 없으면 생성합니다.
pub async fn write_summary(
    layout: &ArtifactLayout,
    summary: &RunSummary,
) -> Result<PathBuf, ReportError> {
    let reports_dir = layout.reports_dir();
    tokio::fs::create_dir_all(&reports_dir)
        .await
        .map_err(|e| ReportError::Io {
            path: reports_dir.display().to_string(),
            source: e,
        })?;

    let json =
        serde_json::to_string_pretty(summary).map_err(|e| ReportError::Serialize(e.to_string()))?;
    let path = layout.summary_json();
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

    info!(
        run_id = %summary.run_id,
        exit_code = %summary.exit_code,
        path = %path.display(),
        "run summary written"
    );
    Ok(path)
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
