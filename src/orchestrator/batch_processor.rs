//! 批量验证处理器 - 编排层
//!
//! ## 职责
//!
//! 把初筛后的候选商品分成固定大小的批次，批内并发验证，批间串行。
//!
//! ## 核心功能
//!
//! 1. **分批处理**：第 N+1 批只会在第 N 批全部结束后开始
//! 2. **并发验证**：批内每个候选一个 `tokio::spawn` 任务
//! 3. **错误隔离**：单个候选的失败（包括任务 panic）只计数，不影响其他候选
//! 4. **批间暂停**：两批之间暂停一小段时间，照顾外部 API 的频率限制
//! 5. **取消**：每批开始前检查取消信号，已派发的任务允许跑完
//!
//! ## 设计特点
//!
//! - **向下委托**：单个候选的验证、超时和重试由 `VerificationFlow` 负责
//! - **无共享可变状态**：每个任务只写自己的结果

use crate::models::{Candidate, VerifiedProduct};
use crate::progress::{BatchProgress, PipelineObserver};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{FailureReason, VerificationCtx, VerificationFailure, VerificationFlow};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 分批参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub batch_size: usize,
    /// 两批之间的暂停
    pub batch_pause: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_pause: Duration::from_millis(500),
        }
    }
}

/// 全部批次的处理结果
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// 验证成功的商品（无特定顺序）
    pub verified: Vec<VerifiedProduct>,
    pub failures: Vec<VerificationFailure>,
    /// 实际派发的候选数量
    pub attempted: usize,
    /// 是否因取消而提前结束
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// 批量验证编排器
pub struct BatchOrchestrator {
    flow: Arc<VerificationFlow>,
    settings: BatchSettings,
}

impl BatchOrchestrator {
    pub fn new(flow: Arc<VerificationFlow>, settings: BatchSettings) -> Self {
        Self { flow, settings }
    }

    /// 分批验证所有候选商品
    pub async fn run(
        &self,
        keyword: &str,
        candidates: &[Candidate],
        observer: &dyn PipelineObserver,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let total = candidates.len();
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = total.div_ceil(batch_size);
        let mut outcome = BatchOutcome::default();

        for batch_start in (0..total).step_by(batch_size) {
            let batch_num = batch_start / batch_size + 1;

            // 批间暂停，暂停期间也响应取消
            if batch_num > 1 && !self.settings.batch_pause.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.batch_pause) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            if cancel.is_cancelled() {
                info!(
                    "⏹️ 收到取消信号，停止派发剩余 {} 个候选",
                    total - batch_start
                );
                outcome.cancelled = true;
                break;
            }

            let batch_end = (batch_start + batch_size).min(total);
            let batch = &candidates[batch_start..batch_end];

            log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);
            observer.on_batch_start(&BatchProgress {
                batch: batch_num,
                total_batches,
                settled: outcome.attempted,
                total,
                verified: outcome.verified.len(),
                failed: outcome.failed(),
            });

            let (success, failed) = self
                .process_batch(keyword, batch, batch_num, batch_start, &mut outcome)
                .await;

            log_batch_complete(batch_num, success, success + failed);
            observer.on_batch_complete(&BatchProgress {
                batch: batch_num,
                total_batches,
                settled: outcome.attempted,
                total,
                verified: outcome.verified.len(),
                failed: outcome.failed(),
            });
        }

        outcome
    }

    /// 处理单个批次，返回本批的 (成功数, 失败数)
    async fn process_batch(
        &self,
        keyword: &str,
        batch: &[Candidate],
        batch_num: usize,
        batch_start: usize,
        outcome: &mut BatchOutcome,
    ) -> (usize, usize) {
        let mut labels = Vec::with_capacity(batch.len());
        let mut handles = Vec::with_capacity(batch.len());

        // 为本批创建并发任务
        for (idx, candidate) in batch.iter().enumerate() {
            let candidate_index = batch_start + idx + 1;
            let ctx = VerificationCtx::new(keyword, batch_num, candidate_index, &candidate.asin);
            let flow = self.flow.clone();
            let owned = candidate.clone();

            handles.push(tokio::spawn(async move { flow.verify(&owned, &ctx).await }));
            labels.push((candidate_index, candidate.asin.clone()));
        }

        // 等待本批所有任务结束
        let results = join_all(handles).await;
        let (mut success, mut failed) = (0, 0);
        for ((candidate_index, asin), result) in labels.into_iter().zip(results) {
            outcome.attempted += 1;
            match result {
                Ok(Ok(product)) => {
                    success += 1;
                    outcome.verified.push(product);
                }
                Ok(Err(failure)) => {
                    failed += 1;
                    outcome.failures.push(failure);
                }
                Err(e) => {
                    error!("[候选 {} {}] 任务执行失败: {}", candidate_index, asin, e);
                    failed += 1;
                    outcome.failures.push(VerificationFailure {
                        candidate_id: asin,
                        reason: FailureReason::Source(format!("任务执行失败: {}", e)),
                        attempts: 0,
                    });
                }
            }
        }

        (success, failed)
    }
}
