//! 환경 제어 에러 타입
//!
//! [`EnvironmentError`]는 백엔드 호출 중 발생하는 에러를 표현합니다.
//! 외부 명령의 0이 아닌 종료 코드는 에러가 아니라 반환값으로 전달됩니다.

use autoe2e_core::error::{AutoE2eError, ProcessError};

/// 환경 제어 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// 외부 명령 실행 실패 (spawn/wait)
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Docker 데몬 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 경로 처리 실패
    #[error("path error: {path}: {reason}")]
    Path {
        /// 대상 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// extra vars 직렬화 실패
    #[error("serialization error: {0}")]
    Serialize(String),
}

impl From<EnvironmentError> for AutoE2eError {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::Process(e) => AutoE2eError::Process(e),
            other => AutoE2eError::Environment(other.to_string()),
        }
    }
}
