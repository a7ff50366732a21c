//! 流水线观察者
//!
//! 编排层只在固定的检查点通知观察者（阶段切换、批次开始/结束），
//! 业务代码里不直接发送进度事件，没有观察者时流水线照常运行。

use crate::models::MarketReport;
use crate::progress::UserFacingError;

/// 批次进度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// 批次编号（从1开始）
    pub batch: usize,
    pub total_batches: usize,
    /// 已经结束验证的候选数量（成功 + 失败）
    pub settled: usize,
    /// 进入验证的候选总数
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
}

/// 流水线观察者
///
/// 所有方法都有空的默认实现，只需覆盖关心的检查点。
pub trait PipelineObserver: Send + Sync {
    /// 开始发现候选商品
    fn on_discovering(&self, _query: &str) {}

    /// 发现完成，初筛后进入验证阶段
    fn on_discovered(&self, _found: usize, _kept: usize) {}

    fn on_batch_start(&self, _progress: &BatchProgress) {}

    fn on_batch_complete(&self, _progress: &BatchProgress) {}

    /// 所有批次结束，开始市场聚合
    fn on_grading(&self, _verified: usize) {}

    fn on_complete(&self, _report: &MarketReport) {}

    /// 没有发现任何候选商品
    fn on_no_results(&self, _query: &str) {}

    fn on_error(&self, _error: &UserFacingError) {}
}

/// 什么都不做的观察者
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}
