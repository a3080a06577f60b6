//! リトライポリシー
//!
//! 呼び出し側で試行回数と待機間隔を明示する値オブジェクト。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::ScraperError;

/// 待機間隔の伸ばし方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 毎回同じ間隔
    Fixed,
    /// `delay * 2^attempt`
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, initial: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: initial,
            backoff: Backoff::Exponential,
        }
    }

    /// `attempt` 回目（0始まり）の失敗後に待つ時間
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => self.delay.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }

    /// 操作を最大 `max_attempts` 回実行する
    ///
    /// 失敗の種類は問わず再試行する。全試行が失敗すると最後のエラー内容を
    /// `RetriesExhausted` に包んで返す。途中の失敗はログに出さない
    /// （結果の報告は呼び出し側が1回だけ行う）。
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ScraperError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match op(attempt + 1).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error = Some(e);
                    if attempt + 1 < self.max_attempts {
                        sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(ScraperError::RetriesExhausted {
            attempts: self.max_attempts,
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_for() {
        let fixed = RetryPolicy::fixed(3, Duration::from_secs(2));
        assert_eq!(fixed.delay_for(0), Duration::from_secs(2));
        assert_eq!(fixed.delay_for(2), Duration::from_secs(2));

        let exp = RetryPolicy::exponential(3, Duration::from_millis(1000));
        assert_eq!(exp.delay_for(0), Duration::from_millis(1000));
        assert_eq!(exp.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_run_stops_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let result: Result<(), _> = policy
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ScraperError::Http("boom".into()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ScraperError::RetriesExhausted { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_succeeds_on_second_attempt() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let result = policy
            .run(|attempt| async move {
                if attempt < 2 {
                    Err(ScraperError::Timeout("slow".into()))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
    }
}
