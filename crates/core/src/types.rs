//! 도메인 타입: 실행(run) 식별자, 타이밍, 헬스체크, 종료 코드
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 자동 생성되는 run ID 길이 (hex 문자 수)
const RUN_ID_LEN: usize = 12;
/// 외부에서 전달되는 run ID 최대 길이
const MAX_RUN_ID_LEN: usize = 48;
/// compose 프로젝트 이름 접두사
const PROJECT_PREFIX: &str = "autoe2e";

/// 실행 식별자
///
/// 한 번의 오케스트레이션 호출을 식별하는 불투명 토큰입니다.
/// 환경 네임스페이스(compose 프로젝트명)와 아티팩트 경로를 분리하는 데 사용되며,
/// 생성 후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// 새 run ID를 생성합니다 (v4 UUID의 앞 12자리 hex).
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(hex[..RUN_ID_LEN].to_owned())
    }

    /// 외부에서 전달된 run ID를 검증하여 생성합니다.
    ///
    /// compose 프로젝트 이름 규칙을 따릅니다:
    /// 소문자 영숫자로 시작하고, 소문자 영숫자/`-`/`_`만 포함합니다.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() || raw.len() > MAX_RUN_ID_LEN {
            return Err(ConfigError::InvalidValue {
                field: "run_id".to_owned(),
                reason: format!("length {} (must be 1-{MAX_RUN_ID_LEN})", raw.len()),
            });
        }
        let mut chars = raw.chars();
        let starts_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !starts_ok || !rest_ok {
            return Err(ConfigError::InvalidValue {
                field: "run_id".to_owned(),
                reason: "must contain only lowercase letters, digits, '-' or '_'".to_owned(),
            });
        }
        Ok(Self(raw.to_owned()))
    }

    /// run ID 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 이 run 전용 compose 프로젝트 이름을 반환합니다.
    pub fn project_name(&self) -> String {
        format!("{PROJECT_PREFIX}-{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 실행 컨텍스트 -- run ID와 단계별 타임스탬프
///
/// 불변식:
/// - `env_ready_at >= started_at`
/// - `test_ended_at >= env_ready_at` (둘 다 존재할 때)
///
/// `mark_*` 메서드는 이전 타임스탬프보다 이른 시각이 들어오면 이전 값으로 보정합니다.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: RunId,
    started_at: DateTime<Utc>,
    env_ready_at: Option<DateTime<Utc>>,
    test_ended_at: Option<DateTime<Utc>>,
}

impl RunContext {
    /// 현재 시각을 시작 시각으로 하는 컨텍스트를 생성합니다.
    pub fn new(run_id: RunId) -> Self {
        Self::started_at(run_id, Utc::now())
    }

    /// 지정된 시작 시각으로 컨텍스트를 생성합니다.
    pub fn started_at(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            env_ready_at: None,
            test_ended_at: None,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn env_ready_time(&self) -> Option<DateTime<Utc>> {
        self.env_ready_at
    }

    pub fn test_end_time(&self) -> Option<DateTime<Utc>> {
        self.test_ended_at
    }

    /// 환경 준비 완료 시각을 현재 시각으로 기록합니다.
    pub fn mark_env_ready(&mut self) {
        self.mark_env_ready_at(Utc::now());
    }

    /// 환경 준비 완료 시각을 기록합니다.
    pub fn mark_env_ready_at(&mut self, at: DateTime<Utc>) {
        self.env_ready_at = Some(at.max(self.started_at));
    }

    /// 테스트 종료 시각을 현재 시각으로 기록합니다.
    pub fn mark_test_end(&mut self) {
        self.mark_test_end_at(Utc::now());
    }

    /// 테스트 종료 시각을 기록합니다.
    pub fn mark_test_end_at(&mut self, at: DateTime<Utc>) {
        let floor = self.env_ready_at.unwrap_or(self.started_at);
        self.test_ended_at = Some(at.max(floor));
    }
}

/// 헬스체크 명세
///
/// 설정 로드 시점에 한 번 해석되어 이후에는 variant로만 다룹니다.
/// `type` 필드가 없는 레코드는 HTTP 체크로 해석합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", try_from = "RawHealthCheck")]
pub enum HealthCheckSpec {
    /// HTTP 상태 코드 체크
    Http {
        /// 요청 URL
        url: String,
        /// 기대 상태 코드
        expected_status: u16,
    },
    /// TCP 연결 체크
    Tcp {
        /// 대상 호스트
        host: String,
        /// 대상 포트
        port: u16,
    },
}

/// 기본 HTTP 기대 상태 코드
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

impl HealthCheckSpec {
    /// HTTP 체크를 생성합니다 (기대 상태 200).
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            expected_status: DEFAULT_EXPECTED_STATUS,
        }
    }

    /// TCP 체크를 생성합니다.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// 로그/메트릭용 고정 종류명
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Tcp { .. } => "tcp",
        }
    }
}

impl fmt::Display for HealthCheckSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http {
                url,
                expected_status,
            } => write!(f, "http {url} (expect {expected_status})"),
            Self::Tcp { host, port } => write!(f, "tcp {host}:{port}"),
        }
    }
}

/// 설정 파일의 헬스체크 원본 레코드
#[derive(Deserialize)]
struct RawHealthCheck {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
    expected_status: Option<u16>,
    host: Option<String>,
    port: Option<u16>,
}

impl TryFrom<RawHealthCheck> for HealthCheckSpec {
    type Error = String;

    fn try_from(raw: RawHealthCheck) -> Result<Self, Self::Error> {
        match raw.kind.as_deref().unwrap_or("http") {
            "http" => {
                let url = raw.url.ok_or("http health check requires 'url'")?;
                Ok(Self::Http {
                    url,
                    expected_status: raw.expected_status.unwrap_or(DEFAULT_EXPECTED_STATUS),
                })
            }
            "tcp" => {
                let host = raw.host.ok_or("tcp health check requires 'host'")?;
                let port = raw.port.ok_or("tcp health check requires 'port'")?;
                Ok(Self::Tcp { host, port })
            }
            other => Err(format!(
                "unknown health check type '{other}' (expected 'http' or 'tcp')"
            )),
        }
    }
}

/// run 종료 코드
///
/// | Code | Meaning                        |
/// |------|--------------------------------|
/// | 0    | 성공                           |
/// | 1    | 테스트 실패                    |
/// | 2    | 환경 기동/준비 상태 확인 실패  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RunExitCode {
    Success,
    TestFailure,
    EnvironmentFailure,
}

impl RunExitCode {
    /// 프로세스 종료 코드를 반환합니다.
    pub fn code(self) -> i32 {
        i32::from(u8::from(self))
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<RunExitCode> for u8 {
    fn from(code: RunExitCode) -> Self {
        match code {
            RunExitCode::Success => 0,
            RunExitCode::TestFailure => 1,
            RunExitCode::EnvironmentFailure => 2,
        }
    }
}

impl TryFrom<u8> for RunExitCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::TestFailure),
            2 => Ok(Self::EnvironmentFailure),
            other => Err(format!("invalid run exit code {other} (must be 0, 1 or 2)")),
        }
    }
}

impl fmt::Display for RunExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_run_id_is_12_hex_chars() {
        let id = RunId::generate();
        assert_eq!(id.as_str().len(), 12);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_run_ids_differ() {
        assert_ne!(RunId::generate(), RunId::generate());
    }

    #[test]
    fn run_id_parse_accepts_generated_format() {
        let id = RunId::parse("a1b2c3d4e5f6").unwrap();
        assert_eq!(id.project_name(), "autoe2e-a1b2c3d4e5f6");
    }

    #[test]
    fn run_id_parse_rejects_bad_input() {
        assert!(RunId::parse("").is_err());
        assert!(RunId::parse("Upper").is_err());
        assert!(RunId::parse("-leading").is_err());
        assert!(RunId::parse("has space").is_err());
        assert!(RunId::parse("semi;colon").is_err());
        assert!(RunId::parse(&"a".repeat(49)).is_err());
    }

    #[test]
    fn run_context_clamps_env_ready_before_start() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let mut ctx = RunContext::started_at(RunId::generate(), start);
        ctx.mark_env_ready_at(start - chrono::Duration::seconds(5));
        assert_eq!(ctx.env_ready_time(), Some(start));
    }

    #[test]
    fn run_context_clamps_test_end_before_env_ready() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let ready = start + chrono::Duration::seconds(30);
        let mut ctx = RunContext::started_at(RunId::generate(), start);
        ctx.mark_env_ready_at(ready);
        ctx.mark_test_end_at(start + chrono::Duration::seconds(10));
        assert_eq!(ctx.test_end_time(), Some(ready));
    }

    #[test]
    fn health_check_without_type_is_http() {
        let check: HealthCheckSpec =
            serde_json::from_str(r#"{"url": "http://localhost:8080/health"}"#).unwrap();
        assert_eq!(check, HealthCheckSpec::http("http://localhost:8080/health"));
    }

    #[test]
    fn health_check_tcp_record() {
        let check: HealthCheckSpec =
            serde_json::from_str(r#"{"type": "tcp", "host": "db", "port": 5432}"#).unwrap();
        assert_eq!(check, HealthCheckSpec::tcp("db", 5432));
        assert_eq!(check.kind(), "tcp");
    }

    #[test]
    fn health_check_custom_expected_status() {
        let check: HealthCheckSpec = serde_json::from_str(
            r#"{"type": "http", "url": "http://api/ready", "expected_status": 204}"#,
        )
        .unwrap();
        assert!(matches!(
            check,
            HealthCheckSpec::Http {
                expected_status: 204,
                ..
            }
        ));
    }

    #[test]
    fn health_check_rejects_unknown_type_and_missing_fields() {
        assert!(serde_json::from_str::<HealthCheckSpec>(r#"{"type": "grpc"}"#).is_err());
        assert!(serde_json::from_str::<HealthCheckSpec>(r#"{"type": "tcp", "host": "db"}"#).is_err());
        assert!(serde_json::from_str::<HealthCheckSpec>(r#"{"type": "http"}"#).is_err());
    }

    #[test]
    fn health_check_serializes_as_tagged_record() {
        let json = serde_json::to_value(HealthCheckSpec::tcp("cache", 6379)).unwrap();
        assert_eq!(json["type"], "tcp");
        assert_eq!(json["host"], "cache");
        assert_eq!(json["port"], 6379);
    }

    #[test]
    fn exit_code_serializes_as_integer() {
        assert_eq!(
            serde_json::to_string(&RunExitCode::EnvironmentFailure).unwrap(),
            "2"
        );
        let parsed: RunExitCode = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, RunExitCode::TestFailure);
        assert!(serde_json::from_str::<RunExitCode>("3").is_err());
    }

    #[test]
    fn exit_code_values() {
        assert_eq!(RunExitCode::Success.code(), 0);
        assert_eq!(RunExitCode::TestFailure.code(), 1);
        assert_eq!(RunExitCode::EnvironmentFailure.code(), 2);
        assert!(RunExitCode::Success.is_success());
    }
}
