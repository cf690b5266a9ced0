use std::time::Duration;
use crate::core::error::DownloadError;

/// 分块重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 总尝试次数（包含第一次）
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64, // 添加抖动因子避免重试风暴
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// 只尝试一次，不重试
    pub fn single_attempt() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// `attempt` 为已经完成的尝试次数
    pub fn should_retry(&self, error: &DownloadError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// 第 `attempt` 次失败之后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        let jitter = delay_secs * self.jitter_factor * (rand::random::<f64>() - 0.5);
        let delay = Duration::from_secs_f64((delay_secs + jitter).max(0.0));
        delay.min(self.max_delay)
    }
}
