//! 리포트 에러 타입

use autoe2e_core::error::AutoE2eError;

/// 리포트 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 파일 읽기/쓰기 실패
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 결과 파일 파싱 실패
    #[error("malformed junit xml in {path}: {reason}")]
    Parse { path: String, reason: String },

    /// summary 직렬화 실패
    #[error("failed to serialize summary: {0}")]
    Serialize(String),
}

impl From<ReportError> for AutoE2eError {
    fn from(err: ReportError) -> Self {
        AutoE2eError::Report(err.to_string())
    }
}
