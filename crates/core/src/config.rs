//! 설정 관리: spec 파일 파싱, 환경변수 오버라이드, 검증
//!
//! [`SpecConfig`]는 한 번의 e2e 실행을 기술하는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 호출 측에서 적용)
//! 2. 환경변수 (`AUTOE2E_TIMEOUT=300` 형식)
//! 3. spec 파일 (`spec.yml` / `spec.toml`)
//! 4. 기본값
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), autoe2e_core::error::AutoE2eError> {
//! use autoe2e_core::config::SpecConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = SpecConfig::load("spec.yml").await?;
//!
//! // YAML 문자열에서 직접 파싱
//! let config = SpecConfig::parse_yaml("compose_file: docker-compose.yml\nbase_url: http://localhost:8000")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AutoE2eError, ConfigError};
use crate::types::HealthCheckSpec;

/// 준비 상태 대기 최대 시간 (초)
const MAX_TIMEOUT_SECS: u64 = 3600;
/// 폴링 간격 최대값 (초)
const MAX_POLL_INTERVAL_SECS: u64 = 300;

/// 모든 테스트를 실행하는 suite 이름 (마커 필터 없음)
pub const ALL_SUITES: &str = "all";

/// spec 파일 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Toml,
}

impl SpecFormat {
    /// 파일 확장자로 형식을 판별합니다.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// e2e 실행 spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecConfig {
    /// 환경 정의 파일 (docker-compose.yml)
    pub compose_file: String,
    /// 테스트 대상 API 기본 URL (`API_BASE_URL`로 전달)
    pub base_url: String,
    /// 준비 상태 체크 목록 (목록 순서대로 평가)
    #[serde(default)]
    pub health_checks: Vec<HealthCheckSpec>,
    /// suite 이름 -> 마커 표현식
    #[serde(default = "default_suites")]
    pub suites: BTreeMap<String, String>,
    /// 서비스 이름 목록 (서비스별 로그 수집에 사용)
    #[serde(default)]
    pub services: Option<Vec<String>>,
    /// 준비 상태 대기 시간 (초)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// compose env 파일
    #[serde(default)]
    pub env_file: Option<String>,
    /// 아티팩트 수집 정책
    #[serde(default)]
    pub artifacts: ArtifactPolicy,
    /// 준비 상태 폴링 간격 (초)
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// 테스트 엔진 실행 명령
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,
    /// 테스트 경로 (엔진에 전달)
    #[serde(default = "default_test_path")]
    pub test_path: String,
}

impl SpecConfig {
    /// spec 파일을 로드하고 환경변수 오버라이드와 검증을 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AutoE2eError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// spec 파일을 파싱만 합니다 (오버라이드/검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AutoE2eError> {
        let path = path.as_ref();
        let format = SpecFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AutoE2eError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AutoE2eError::Io(e)
            }
        })?;
        Self::parse(&content, format)
    }

    /// 지정된 형식으로 문자열을 파싱합니다.
    pub fn parse(content: &str, format: SpecFormat) -> Result<Self, AutoE2eError> {
        match format {
            SpecFormat::Yaml => Self::parse_yaml(content),
            SpecFormat::Toml => Self::parse_toml(content),
        }
    }

    /// YAML 문자열에서 spec을 파싱합니다.
    pub fn parse_yaml(content: &str) -> Result<Self, AutoE2eError> {
        serde_yaml::from_str(content).map_err(|e| {
            AutoE2eError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// TOML 문자열에서 spec을 파싱합니다.
    pub fn parse_toml(content: &str) -> Result<Self, AutoE2eError> {
        toml::from_str(content).map_err(|e| {
            AutoE2eError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 네이밍 규칙: `AUTOE2E_{FIELD}`. 파싱할 수 없는 값은 경고 후 무시합니다.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.compose_file, "AUTOE2E_COMPOSE_FILE");
        override_string(&mut self.base_url, "AUTOE2E_BASE_URL");
        override_parsed(&mut self.timeout, "AUTOE2E_TIMEOUT");
        override_parsed(&mut self.poll_interval, "AUTOE2E_POLL_INTERVAL");
        override_optional_string(&mut self.env_file, "AUTOE2E_ENV_FILE");
        override_optional_csv(&mut self.services, "AUTOE2E_SERVICES");
        override_parsed(&mut self.artifacts.collect, "AUTOE2E_ARTIFACTS_COLLECT");
        override_string(&mut self.test_path, "AUTOE2E_TEST_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compose_file.trim().is_empty() {
            return Err(invalid("compose_file", "must not be empty"));
        }

        if !is_http_url(&self.base_url) {
            return Err(invalid(
                "base_url",
                format!("'{}' must start with http:// or https://", self.base_url),
            ));
        }

        if self.timeout == 0 || self.timeout > MAX_TIMEOUT_SECS {
            return Err(invalid(
                "timeout",
                format!("{} (must be 1-{MAX_TIMEOUT_SECS})", self.timeout),
            ));
        }

        if self.poll_interval == 0 || self.poll_interval > MAX_POLL_INTERVAL_SECS {
            return Err(invalid(
                "poll_interval",
                format!("{} (must be 1-{MAX_POLL_INTERVAL_SECS})", self.poll_interval),
            ));
        }

        for (idx, check) in self.health_checks.iter().enumerate() {
            validate_health_check(idx, check)?;
        }

        if self
            .test_command
            .first()
            .is_none_or(|program| program.trim().is_empty())
        {
            return Err(invalid("test_command", "must name an executable"));
        }

        if self.test_path.trim().is_empty() {
            return Err(invalid("test_path", "must not be empty"));
        }

        Ok(())
    }

    /// 준비 상태 대기 시간
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// 폴링 간격
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// suite 이름을 마커 표현식으로 변환합니다.
    ///
    /// `all`이면 `None`(필터 없음), 등록된 이름이면 매핑된 표현식,
    /// 그 외에는 이름 그대로 사용합니다.
    pub fn suite_marker(&self, suite: &str) -> Option<String> {
        if suite == ALL_SUITES {
            return None;
        }
        Some(
            self.suites
                .get(suite)
                .cloned()
                .unwrap_or_else(|| suite.to_owned()),
        )
    }

    /// 이 spec의 서비스 선택 결과
    pub fn service_selection(&self) -> ServiceSelection {
        self.artifacts.selection(self.services.as_deref())
    }
}

/// 아티팩트 수집 시점
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    /// 실패한 run에서만 수집
    #[default]
    OnFail,
    /// 항상 수집
    Always,
}

impl FromStr for CollectMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_fail" => Ok(Self::OnFail),
            "always" => Ok(Self::Always),
            other => Err(invalid(
                "artifacts.collect",
                format!("'{other}' (must be on_fail or always)"),
            )),
        }
    }
}

/// 아티팩트 수집 정책
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPolicy {
    #[serde(default)]
    pub collect: CollectMode,
    /// 로그를 수집할 서비스 (지정 시 `services`보다 우선)
    #[serde(default)]
    pub include_services: Option<Vec<String>>,
    /// 로그 수집에서 제외할 서비스
    #[serde(default)]
    pub exclude_services: Option<Vec<String>>,
}

impl ArtifactPolicy {
    /// run 종료 코드에 따라 수집 여부를 결정합니다.
    pub fn should_collect(&self, failed: bool) -> bool {
        failed || self.collect == CollectMode::Always
    }

    /// 서비스별 로그 수집 대상을 계산합니다.
    pub fn selection(&self, services: Option<&[String]>) -> ServiceSelection {
        let services = self
            .include_services
            .as_deref()
            .or(services)
            .map(<[String]>::to_vec);
        ServiceSelection {
            services,
            exclude: self.exclude_services.clone().unwrap_or_default(),
        }
    }
}

/// 서비스별 로그 수집 대상
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceSelection {
    /// 알려진 서비스 목록 (`None`이면 환경에서 조회해야 함)
    pub services: Option<Vec<String>>,
    /// 제외할 서비스
    pub exclude: Vec<String>,
}

impl ServiceSelection {
    /// 서비스 목록을 환경에서 조회해야 하는지 여부
    ///
    /// 목록이 없고 제외 규칙만 있을 때만 조회가 필요합니다.
    pub fn needs_discovery(&self) -> bool {
        self.services.is_none() && !self.exclude.is_empty()
    }

    /// 주어진 서비스 목록에 제외 규칙을 적용합니다.
    pub fn resolve(&self, known: &[String]) -> Vec<String> {
        known
            .iter()
            .filter(|svc| !self.exclude.contains(svc))
            .cloned()
            .collect()
    }
}

fn default_suites() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("smoke".to_owned(), "smoke".to_owned()),
        ("regression".to_owned(), "regression".to_owned()),
    ])
}

fn default_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    5
}

fn default_test_command() -> Vec<String> {
    vec!["python3".to_owned(), "-m".to_owned(), "pytest".to_owned()]
}

fn default_test_path() -> String {
    "tests".to_owned()
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    rest.is_some_and(|host| !host.is_empty())
}

fn validate_health_check(idx: usize, check: &HealthCheckSpec) -> Result<(), ConfigError> {
    let field = format!("health_checks[{idx}]");
    match check {
        HealthCheckSpec::Http {
            url,
            expected_status,
        } => {
            if !is_http_url(url) {
                return Err(invalid(
                    &field,
                    format!("url '{url}' must start with http:// or https://"),
                ));
            }
            if !(100..=599).contains(expected_status) {
                return Err(invalid(
                    &field,
                    format!("expected_status {expected_status} (must be 100-599)"),
                ));
            }
        }
        HealthCheckSpec::Tcp { host, port } => {
            if host.trim().is_empty() {
                return Err(invalid(&field, "host must not be empty"));
            }
            if *port == 0 {
                return Err(invalid(&field, "port must not be 0"));
            }
        }
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_optional_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = (!val.is_empty()).then_some(val);
    }
}

fn override_optional_csv(target: &mut Option<Vec<String>>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let items: Vec<String> = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        *target = (!items.is_empty()).then_some(items);
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse env var override, ignoring"
            ),
        }
    }
}
