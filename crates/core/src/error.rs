//! 에러 타입: 도메인별 에러 정의

/// autoe2e 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum AutoE2eError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 외부 프로세스 실행 에러
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    /// 환경 제어(백엔드) 에러
    #[error("environment error: {0}")]
    Environment(String),

    /// 준비 상태 확인 에러
    #[error("readiness error: {0}")]
    Readiness(String),

    /// 리포트 처리 에러
    #[error("report error: {0}")]
    Report(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("spec file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse spec file: {reason}")]
    ParseFailed { reason: String },

    /// 지원하지 않는 설정 파일 형식
    #[error("unsupported spec file format: {path} (expected .yml, .yaml or .toml)")]
    UnsupportedFormat { path: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 외부 프로세스 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// 프로세스 생성 실패 (실행 파일 없음, 권한 부족 등)
    #[error("failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// 프로세스 대기 중 실패
    #[error("failed to wait for '{program}': {reason}")]
    Wait { program: String, reason: String },
}
