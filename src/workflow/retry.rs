//! 验证重试策略
//!
//! 有界重试：每次尝试都有独立的超时窗口，失败后先分类再决定是否重试，
//! 退避时间为 `base_delay × 2^attempt`。

use std::fmt::Display;
use std::time::Duration;

/// 单个候选商品验证失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 单次尝试超时
    Timeout { after: Duration },
    /// 没有销量预测数据，无法评级
    NoSalesData,
    /// 数据源或任务本身出错
    Source(String),
}

impl FailureReason {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureReason::Timeout { .. })
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout { after } => write!(f, "验证超时 ({}s)", after.as_secs_f64()),
            FailureReason::NoSalesData => write!(f, "没有销量预测数据"),
            FailureReason::Source(msg) => write!(f, "数据源错误: {}", msg),
        }
    }
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 首次尝试之后的额外重试次数
    pub max_retries: u32,
    pub base_delay: Duration,
    /// 单次尝试的超时时间
    pub attempt_timeout: Duration,
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(30),
            retry_on_timeout: false,
        }
    }
}

impl RetryPolicy {
    /// 最多尝试次数（含首次）
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 第 `attempt` 次失败后（从 0 开始）的等待时间
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// 第 `attempt` 次尝试（从 0 开始）失败后是否继续重试
    pub fn should_retry(&self, reason: &FailureReason, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        !reason.is_timeout() || self.retry_on_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        // 不会溢出
        assert!(policy.backoff(64) >= policy.backoff(10));
    }

    #[test]
    fn test_retry_bound() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.should_retry(&FailureReason::NoSalesData, 0));
        assert!(policy.should_retry(&FailureReason::NoSalesData, 1));
        assert!(!policy.should_retry(&FailureReason::NoSalesData, 2));
    }

    #[test]
    fn test_timeout_not_retried_by_default() {
        let timeout = FailureReason::Timeout {
            after: Duration::from_secs(30),
        };
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(&timeout, 0));

        let lenient = RetryPolicy {
            retry_on_timeout: true,
            ..policy
        };
        assert!(lenient.should_retry(&timeout, 0));
        assert!(!lenient.should_retry(&timeout, 2));
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(&FailureReason::Source("boom".into()), 0));
    }
}
