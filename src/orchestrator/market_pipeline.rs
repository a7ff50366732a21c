//! 市场分析流水线 - 编排层
//!
//! 一次完整的分析：发现 → 初筛 → 分批验证 → 市场聚合 → 报告落盘。
//! 单个候选的失败在 `BatchOrchestrator` 里被吸收，
//! 只有"没有任何已验证商品"会作为错误返回给调用方。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, ConfigError, PipelineError};
use crate::models::{sort_by_grade, Candidate, MarketReport, VerifiedProduct};
use crate::orchestrator::batch_processor::BatchOrchestrator;
use crate::progress::{PipelineObserver, UserFacingError};
use crate::services::market_aggregator::{aggregate, CandidateCounts};
use crate::services::preliminary_scorer::rank_and_truncate;
use crate::sources::{DiscoverySource, ReportSink};

/// 流水线输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineInput {
    /// 按搜索词发现，最多 `limit` 个候选
    Keyword { term: String, limit: usize },
    /// 直接给出商品标识列表
    Asins(Vec<String>),
}

impl PipelineInput {
    /// 报告和日志里使用的名称
    pub fn label(&self) -> String {
        match self {
            PipelineInput::Keyword { term, .. } => term.trim().to_string(),
            PipelineInput::Asins(asins) => {
                let asins: Vec<&str> = asins
                    .iter()
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .collect();
                format!("ASIN: {}", asins.join(", "))
            }
        }
    }

    fn validate(&self) -> AppResult<()> {
        let empty = match self {
            PipelineInput::Keyword { term, .. } => term.trim().is_empty(),
            PipelineInput::Asins(asins) => asins.iter().all(|a| a.trim().is_empty()),
        };
        if empty {
            return Err(AppError::Config(ConfigError::InvalidValue {
                name: "query".to_string(),
                reason: "搜索词或商品标识不能为空".to_string(),
            }));
        }
        Ok(())
    }
}

/// 流水线统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub discovered: usize,
    pub analyzed: usize,
    pub verified: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// 流水线结果
#[derive(Debug)]
pub enum PipelineOutcome {
    /// 生成了市场报告，商品按等级从好到差排序
    Completed {
        report: MarketReport,
        products: Vec<VerifiedProduct>,
        stats: PipelineStats,
    },
    /// 发现阶段没有任何候选
    NoResults { query: String },
    /// 被调用方取消
    Cancelled { stats: PipelineStats },
}

/// 市场分析流水线
pub struct MarketPipeline {
    discovery: Arc<dyn DiscoverySource>,
    orchestrator: BatchOrchestrator,
    triage_limit: usize,
    sink: Option<Arc<dyn ReportSink>>,
}

impl MarketPipeline {
    pub fn new(
        discovery: Arc<dyn DiscoverySource>,
        orchestrator: BatchOrchestrator,
        triage_limit: usize,
    ) -> Self {
        Self {
            discovery,
            orchestrator,
            triage_limit: triage_limit.max(1),
            sink: None,
        }
    }

    /// 设置报告落盘
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 运行一次完整的分析
    pub async fn run(
        &self,
        input: PipelineInput,
        observer: &dyn PipelineObserver,
        cancel: &CancellationToken,
    ) -> AppResult<PipelineOutcome> {
        let started = Instant::now();
        if let Err(e) = input.validate() {
            observer.on_error(&UserFacingError::from(&e));
            return Err(e);
        }

        let query = input.label();
        let mut stats = PipelineStats::default();

        // ========== 1. 发现 ==========
        observer.on_discovering(&query);
        let discovered = self.discover(&input).await;
        stats.discovered = discovered.len();

        if discovered.is_empty() {
            info!("🔍 \"{}\" 没有发现任何候选商品", query);
            observer.on_no_results(&query);
            return Ok(PipelineOutcome::NoResults { query });
        }
        if cancel.is_cancelled() {
            stats.elapsed = started.elapsed();
            return Ok(PipelineOutcome::Cancelled { stats });
        }

        // ========== 2. 初筛 ==========
        let candidates = rank_and_truncate(discovered, self.triage_limit);
        stats.analyzed = candidates.len();
        info!(
            "✓ 发现 {} 个候选，初筛保留 {} 个",
            stats.discovered, stats.analyzed
        );
        observer.on_discovered(stats.discovered, stats.analyzed);

        // ========== 3. 分批验证 ==========
        let outcome = self
            .orchestrator
            .run(&query, &candidates, observer, cancel)
            .await;
        stats.verified = outcome.verified.len();
        stats.failed = outcome.failed();

        if outcome.cancelled {
            stats.elapsed = started.elapsed();
            info!("⏹️ 分析已取消: 已验证 {} 个", stats.verified);
            return Ok(PipelineOutcome::Cancelled { stats });
        }

        // ========== 4. 市场聚合 ==========
        observer.on_grading(stats.verified);
        let counts = CandidateCounts {
            total: stats.discovered,
            analyzed: stats.analyzed,
            failed: stats.failed,
        };
        let report = match aggregate(&query, &outcome.verified, counts) {
            Ok(report) => report,
            Err(e) => {
                let err = AppError::Pipeline(PipelineError::from(e));
                warn!("❌ {}", err);
                observer.on_error(&UserFacingError::from(&err));
                return Err(err);
            }
        };

        let mut products = outcome.verified;
        sort_by_grade(&mut products);

        // ========== 5. 落盘（失败不影响结果） ==========
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.store(&report, &products).await {
                warn!("⚠️ 报告保存失败: {:#}", e);
            }
        }

        observer.on_complete(&report);
        stats.elapsed = started.elapsed();

        Ok(PipelineOutcome::Completed {
            report,
            products,
            stats,
        })
    }

    /// 发现候选商品，失败时视为没有结果
    async fn discover(&self, input: &PipelineInput) -> Vec<Candidate> {
        let result = match input {
            PipelineInput::Keyword { term, limit } => {
                self.discovery.search(term.trim(), (*limit).max(1)).await
            }
            PipelineInput::Asins(asins) => {
                let asins: Vec<String> = asins
                    .iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                self.discovery.lookup(&asins).await
            }
        };

        match result {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("⚠️ 商品发现失败，按无结果处理: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_label() {
        let keyword = PipelineInput::Keyword {
            term: "  bamboo board ".into(),
            limit: 20,
        };
        assert_eq!(keyword.label(), "bamboo board");

        let asins = PipelineInput::Asins(vec!["B01".into(), " B02 ".into(), "".into()]);
        assert_eq!(asins.label(), "ASIN: B01, B02");
    }

    #[test]
    fn test_blank_input_rejected() {
        let blank = PipelineInput::Keyword {
            term: "   ".into(),
            limit: 20,
        };
        assert!(matches!(blank.validate(), Err(AppError::Config(_))));
        assert!(PipelineInput::Asins(vec![" ".into()]).validate().is_err());
    }
}
