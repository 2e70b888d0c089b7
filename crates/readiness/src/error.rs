//! 준비 상태 확인 에러 타입

use autoe2e_core::error::AutoE2eError;

/// 준비 상태 확인 도메인 에러
///
/// 개별 헬스체크 실패는 에러가 아니라 `false`로 표현됩니다.
/// 이 타입은 프로브 자체를 구성할 수 없는 경우만 다룹니다.
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    /// HTTP 클라이언트 생성 실패
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl From<ReadinessError> for AutoE2eError {
    fn from(err: ReadinessError) -> Self {
        AutoE2eError::Readiness(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_top_level_error() {
        let err: AutoE2eError = ReadinessError::Client("tls backend missing".to_owned()).into();
        assert!(matches!(err, AutoE2eError::Readiness(_)));
        assert!(err.to_string().contains("tls backend missing"));
    }
}
