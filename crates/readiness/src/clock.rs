//! 폴러가 사용하는 시간 추상화

use std::future::Future;
use std::time::Duration;

/// 단조 시계와 sleep
pub trait Clock: Send + Sync + 'static {
    /// 시계 생성 이후 경과 시간
    fn now(&self) -> Duration;

    /// 지정된 시간 동안 대기합니다.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// `fut`을 `limit` 안에서만 실행합니다. 시간이 다 되면 `None`.
    fn timeout<F>(&self, limit: Duration, fut: F) -> impl Future<Output = Option<F::Output>> + Send
    where
        F: Future + Send,
        F::Output: Send;
}

/// tokio 타이머 기반 시계
///
/// `tokio::time::pause()` 상태에서는 가상 시간으로 동작합니다.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn timeout<F>(&self, limit: Duration, fut: F) -> impl Future<Output = Option<F::Output>> + Send
    where
        F: Future + Send,
        F::Output: Send,
    {
        async move { tokio::time::timeout(limit, fut).await.ok() }
    }
}

/// 테스트용 수동 시계
///
/// `sleep`은 즉시 반환하며 시계를 그만큼 앞으로 이동시킵니다.
/// `timeout`은 future를 끝까지 실행한 뒤, 소요 시간이 `limit`을 넘었으면
/// 시계를 `limit` 지점으로 되돌리고 `None`을 반환합니다.
/// 복제본은 같은 시간을 공유합니다.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: std::sync::Arc<std::sync::Mutex<ManualState>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// sleep 없이 시계를 앞으로 이동시킵니다 (프로브 지연 시뮬레이션).
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now += by;
    }

    /// 지금까지 요청된 sleep 목록
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.lock().unwrap().now
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        let mut state = self.state.lock().unwrap();
        state.now += duration;
        state.sleeps.push(duration);
        std::future::ready(())
    }

    fn timeout<F>(&self, limit: Duration, fut: F) -> impl Future<Output = Option<F::Output>> + Send
    where
        F: Future + Send,
        F::Output: Send,
    {
        let clock = self.clone();
        async move {
            let started = clock.now();
            let output = fut.await;
            let mut state = clock.state.lock().unwrap();
            if state.now.saturating_sub(started) > limit {
                state.now = started + limit;
                None
            } else {
                Some(output)
            }
        }
    }
}
