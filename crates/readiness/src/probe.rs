//! 헬스체크 평가
//!
//! [`HealthProbe`]는 단일 [`HealthCheckSpec`]을 한 번 평가합니다.
//! 전송 계층 에러(타임아웃, 연결 거부, DNS 실패, TLS 실패)는 모두
//! `false`로 흡수되고 debug 레벨로만 기록됩니다.

use std::future::Future;
use std::time::Duration;

use autoe2e_core::types::HealthCheckSpec;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ReadinessError;

/// 시도당 고정 타임아웃
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 헬스체크 평가 trait
pub trait HealthProbe: Send + Sync + 'static {
    /// 체크를 한 번 평가합니다. 통과하면 `true`.
    fn probe(&self, check: &HealthCheckSpec) -> impl Future<Output = bool> + Send;
}

/// 실제 네트워크로 체크를 수행하는 프로브
#[derive(Debug, Clone)]
pub struct NetworkProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl NetworkProbe {
    /// 기본 타임아웃(5초)으로 프로브를 생성합니다.
    pub fn new() -> Result<Self, ReadinessError> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    /// 시도당 타임아웃을 지정하여 프로브를 생성합니다.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ReadinessError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ReadinessError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn probe_http(&self, url: &str, expected_status: u16) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status != expected_status {
                    debug!(url, status, expected_status, "http check status mismatch");
                }
                status == expected_status
            }
            Err(e) => {
                debug!(url, error = %e, "http check failed");
                false
            }
        }
    }

    async fn probe_tcp(&self, host: &str, port: u16) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(host, port, error = %e, "tcp check failed");
                false
            }
            Err(_) => {
                debug!(host, port, timeout_ms = self.timeout.as_millis() as u64, "tcp check timed out");
                false
            }
        }
    }
}

impl HealthProbe for NetworkProbe {
    async fn probe(&self, check: &HealthCheckSpec) -> bool {
        match check {
            HealthCheckSpec::Http {
                url,
                expected_status,
            } => self.probe_http(url, *expected_status).await,
            HealthCheckSpec::Tcp { host, port } => self.probe_tcp(host, *port).await,
        }
    }
}
