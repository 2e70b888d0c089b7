//! 준비 상태 폴링 루프
//!
//! # 동작
//! - 경과 시간이 `timeout` 미만인 동안 라운드를 반복합니다.
//! - 한 라운드는 체크를 목록 순서대로 평가하며, 첫 실패에서 중단됩니다.
//! - 모든 체크가 통과한 라운드가 나오면 sleep 없이 즉시 `true`를 반환합니다.
//! - 실패한 라운드 뒤에는 `interval`만큼 대기하되, 마감 시각을 넘기지 않도록 잘라냅니다.
//! - 마감 시각에 도달하면 `false`를 반환합니다. 마감은 라운드 도중에도
//!   적용되어, 느린 체크가 남아 있어도 `start + timeout`에 중단됩니다.
//!
//! 라운드 비용은 체크별 지연의 합입니다. 체크는 동시에 평가하지 않으며
//! 라운드 간 결과를 캐시하지 않습니다.

use std::time::Duration;

use autoe2e_core::types::HealthCheckSpec;
use tracing::{debug, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::probe::HealthProbe;

/// 준비 상태 폴러
pub struct ReadinessPoller<P, C = TokioClock> {
    probe: P,
    clock: C,
}

impl<P: HealthProbe> ReadinessPoller<P, TokioClock> {
    /// tokio 시계를 사용하는 폴러를 생성합니다.
    pub fn new(probe: P) -> Self {
        Self::with_clock(probe, TokioClock::new())
    }
}

impl<P: HealthProbe, C: Clock> ReadinessPoller<P, C> {
    pub fn with_clock(probe: P, clock: C) -> Self {
        Self { probe, clock }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// 모든 체크가 한 라운드 안에 통과할 때까지 기다립니다.
    ///
    /// 마감 전에 통과하면 `true`, 시간이 다 되면 `false`를 반환합니다.
    pub async fn wait_ready(
        &self,
        checks: &[HealthCheckSpec],
        timeout: Duration,
        interval: Duration,
    ) -> bool {
        let start = self.clock.now();
        let mut round: u32 = 0;

        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= timeout {
                warn!(
                    rounds = round,
                    timeout_secs = timeout.as_secs_f64(),
                    "environment did not become ready before deadline"
                );
                return false;
            }

            round += 1;
            let remaining = timeout.saturating_sub(elapsed);
            match self.clock.timeout(remaining, self.run_round(checks)).await {
                None => {
                    warn!(
                        rounds = round,
                        timeout_secs = timeout.as_secs_f64(),
                        "deadline reached while health checks were running"
                    );
                    return false;
                }
                Some(None) => {
                    let elapsed = self.clock.now().saturating_sub(start);
                    info!(
                        rounds = round,
                        checks = checks.len(),
                        elapsed_secs = elapsed.as_secs_f64(),
                        "all health checks passed"
                    );
                    return true;
                }
                Some(Some(failed)) => {
                    debug!(round, check = %failed, "health check not passing yet");
                }
            }

            let elapsed = self.clock.now().saturating_sub(start);
            let remaining = timeout.saturating_sub(elapsed);
            if !remaining.is_zero() {
                self.clock.sleep(interval.min(remaining)).await;
            }
        }
    }

    /// 한 라운드를 실행합니다. 첫 번째 실패한 체크를 반환합니다.
    async fn run_round<'a>(&self, checks: &'a [HealthCheckSpec]) -> Option<&'a HealthCheckSpec> {
        for check in checks {
            if !self.probe.probe(check).await {
                return Some(check);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clock::ManualClock;

    /// 체크 종류별 통과 시점을 시계로 판단하는 프로브
    struct ScriptedProbe {
        clock: ManualClock,
        /// 이 시각 이후로 통과 (`None`이면 영원히 실패)
        pass_from: Option<Duration>,
        /// 프로브 한 번에 소요되는 시간
        latency: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProbe {
        fn new(clock: ManualClock) -> Self {
            Self {
                clock,
                pass_from: Some(Duration::ZERO),
                latency: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn never_passing(mut self) -> Self {
            self.pass_from = None;
            self
        }

        fn passing_from(mut self, at: Duration) -> Self {
            self.pass_from = Some(at);
            self
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }
    }

    impl HealthProbe for ScriptedProbe {
        async fn probe(&self, _check: &HealthCheckSpec) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.clock.advance(self.latency);
            self.pass_from.is_some_and(|at| self.clock.now() >= at)
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[tokio::test]
    async fn never_passing_returns_false_within_deadline_window() {
        // Given: 항상 실패하는 체크
        let clock = ManualClock::new();
        let probe = ScriptedProbe::new(clock.clone())
            .never_passing()
            .with_latency(Duration::from_millis(300));
        let poller = ReadinessPoller::with_clock(probe, clock.clone());

        // When
        let ready = poller
            .wait_ready(&[HealthCheckSpec::tcp("db", 5432)], secs(10), secs(3))
            .await;

        // Then: elapsed ∈ [T, T+I)
        assert!(!ready);
        let elapsed = clock.now();
        assert!(elapsed >= secs(10), "elapsed {elapsed:?} < timeout");
        assert!(elapsed < secs(13), "elapsed {elapsed:?} >= timeout + interval");
    }

    #[tokio::test]
    async fn slow_checks_are_cut_off_at_deadline() {
        // Given: 체크 한 번에 5초, timeout=10, interval=1
        let clock = ManualClock::new();
        let probe = ScriptedProbe::new(clock.clone())
            .never_passing()
            .with_latency(secs(5));
        let poller = ReadinessPoller::with_clock(probe, clock.clone());

        // When: t=0 라운드 실패, t=6에 시작한 라운드는 t=10에 중단
        let ready = poller
            .wait_ready(&[HealthCheckSpec::http("http://api/health")], secs(10), secs(1))
            .await;

        // Then
        assert!(!ready);
        assert_eq!(clock.now(), secs(10));
        assert_eq!(clock.sleeps(), vec![secs(1)]);
    }

    /// tokio 타이머로 실제 대기하는 느린 프로브
    struct SleepingProbe;

    impl HealthProbe for SleepingProbe {
        async fn probe(&self, _check: &HealthCheckSpec) -> bool {
            tokio::time::sleep(Duration::from_secs(5)).await;
            false
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_checks_respect_deadline_on_tokio_clock() {
        let poller = ReadinessPoller::new(SleepingProbe);
        let started = tokio::time::Instant::now();

        let ready = poller
            .wait_ready(&[HealthCheckSpec::tcp("db", 5432)], secs(10), secs(1))
            .await;

        let elapsed = started.elapsed();
        assert!(!ready);
        assert!(elapsed >= secs(10), "elapsed {elapsed:?} < timeout");
        assert!(elapsed < secs(11), "elapsed {elapsed:?} >= timeout + interval");
    }

    #[tokio::test]
    async fn first_round_pass_returns_true_without_sleeping() {
        let clock = ManualClock::new();
        let probe = ScriptedProbe::new(clock.clone());
        let poller = ReadinessPoller::with_clock(probe, clock.clone());

        let checks = vec![
            HealthCheckSpec::http("http://api/health"),
            HealthCheckSpec::tcp("db", 5432),
        ];
        assert!(poller.wait_ready(&checks, secs(30), secs(5)).await);
        assert!(clock.sleeps().is_empty());
        assert_eq!(poller.probe().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_check_list_passes_immediately() {
        let clock = ManualClock::new();
        let poller = ReadinessPoller::with_clock(ScriptedProbe::new(clock.clone()), clock.clone());

        assert!(poller.wait_ready(&[], secs(30), secs(5)).await);
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn tcp_passing_after_deadline_is_not_ready() {
        // Given: timeout=10, interval=5, TCP 체크는 t=12부터 통과
        let clock = ManualClock::new();
        let probe = ScriptedProbe::new(clock.clone()).passing_from(secs(12));
        let poller = ReadinessPoller::with_clock(probe, clock.clone());

        // When: 라운드는 t=0, 5에서만 실행되고 t=10에서 마감
        let ready = poller
            .wait_ready(&[HealthCheckSpec::tcp("localhost", 5432)], secs(10), secs(5))
            .await;

        // Then
        assert!(!ready);
        assert_eq!(clock.sleeps(), vec![secs(5), secs(5)]);
        assert_eq!(poller.probe().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn becomes_ready_on_later_round() {
        let clock = ManualClock::new();
        let probe = ScriptedProbe::new(clock.clone()).passing_from(secs(7));
        let poller = ReadinessPoller::with_clock(probe, clock.clone());

        let ready = poller
            .wait_ready(&[HealthCheckSpec::http("http://api/health")], secs(30), secs(5))
            .await;

        assert!(ready);
        // t=0 실패, t=5 실패, t=10 통과
        assert_eq!(clock.sleeps(), vec![secs(5), secs(5)]);
        assert_eq!(clock.now(), secs(10));
    }

    #[tokio::test]
    async fn final_sleep_is_clamped_to_deadline() {
        let clock = ManualClock::new();
        let probe = ScriptedProbe::new(clock.clone()).never_passing();
        let poller = ReadinessPoller::with_clock(probe, clock.clone());

        assert!(
            !poller
                .wait_ready(&[HealthCheckSpec::tcp("db", 1)], secs(7), secs(5))
                .await
        );
        assert_eq!(clock.sleeps(), vec![secs(5), secs(2)]);
        assert_eq!(clock.now(), secs(7));
    }

    /// 첫 번째 체크만 실패하는 프로브
    struct FirstFails {
        calls: Arc<AtomicUsize>,
    }

    impl HealthProbe for FirstFails {
        async fn probe(&self, check: &HealthCheckSpec) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            check.kind() != "http"
        }
    }

    #[tokio::test]
    async fn failing_check_short_circuits_round() {
        let clock = ManualClock::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = ReadinessPoller::with_clock(
            FirstFails {
                calls: Arc::clone(&calls),
            },
            clock.clone(),
        );

        let checks = vec![
            HealthCheckSpec::http("http://api/health"),
            HealthCheckSpec::tcp("db", 5432),
            HealthCheckSpec::tcp("cache", 6379),
        ];
        assert!(!poller.wait_ready(&checks, secs(10), secs(5)).await);
        // 라운드 2회 (t=0, t=5), 각 라운드는 첫 체크에서 중단
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
