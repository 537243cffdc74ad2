//! 有限重试策略
//!
//! 页面加载用：最多重试 `max_retries` 次，每次重试前按 `backoff` 表等待，
//! 表用完后沿用最后一项。

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub backoff: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, backoff: Vec<Duration>) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_millis(max_retries: usize, backoff_ms: &[u64]) -> Self {
        Self::new(
            max_retries,
            backoff_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        )
    }

    /// 不重试
    pub fn none() -> Self {
        Self::new(0, Vec::new())
    }

    /// 总尝试次数（首次 + 重试）
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// 第 `retry` 次重试（从 1 开始）前的等待时间
    pub fn delay_before_retry(&self, retry: usize) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        self.backoff
            .get(retry - 1)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// 按策略执行 `op`
    ///
    /// `retryable` 判断错误是否值得重试；不可重试的错误立即返回。
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && retryable(&e) => {
                    attempt += 1;
                    let delay = self.delay_before_retry(attempt);
                    warn!(
                        "{} 失败: {}，{}ms 后第 {}/{} 次重试",
                        label,
                        e,
                        delay.as_millis(),
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_schedule_reuses_last_entry() {
        let policy = RetryPolicy::from_millis(3, &[1000, 2000]);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_before_retry(0), Duration::ZERO);
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::none().delay_before_retry(1), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_until_success() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::from_millis(2, &[10, 20]);
        let result: Result<&str, String> = policy
            .run(
                "加载",
                |_| true,
                |_| {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(format!("timeout {}", n))
                        } else {
                            Ok("ok")
                        }
                    }
                },
            )
            .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_budget() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::from_millis(2, &[10]);
        let result: Result<(), String> = policy
            .run(
                "加载",
                |_| true,
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("timeout".to_string()) }
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::from_millis(5, &[10]);
        let result: Result<(), String> = policy
            .run(
                "加载",
                |e: &String| e.contains("timeout"),
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("refused".to_string()) }
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
