//! 候选商品验证流程 - 流程层
//!
//! 核心职责：定义"一个候选商品"的完整验证流程
//!
//! 流程顺序：
//! 1. 销量预测 + 关键词反查（并发，各自失败视为无数据）
//! 2. 没有销量数据 → 快速失败（唯一的硬依赖）
//! 3. 定性评估（串行，失败时使用默认值）
//! 4. 计算派生指标 → 评级 → 生成 VerifiedProduct
//!
//! 每次尝试都包在独立的超时里，失败后按 `RetryPolicy` 决定是否重试。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{Candidate, EnrichmentBundle, VerifiedProduct};
use crate::services::grading::{self, GradingSignals, DEFAULT_CPC};
use crate::services::metrics::calculate_metrics;
use crate::sources::{AssessmentSource, KeywordSource, SalesSource};
use crate::workflow::retry::{FailureReason, RetryPolicy};
use crate::workflow::verification_ctx::VerificationCtx;

/// 验证失败（重试耗尽后）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationFailure {
    pub candidate_id: String,
    pub reason: FailureReason,
    /// 实际尝试次数
    pub attempts: u32,
}

/// 候选商品验证流程
///
/// - 只依赖数据源 trait，不持有 HTTP 客户端细节
/// - 并发安全：不含可变共享状态，可放进 `Arc` 在多个任务间共享
pub struct VerificationFlow {
    sales: Arc<dyn SalesSource>,
    keywords: Arc<dyn KeywordSource>,
    assessment: Arc<dyn AssessmentSource>,
    policy: RetryPolicy,
    keyword_page: u32,
    keyword_page_size: u32,
}

impl VerificationFlow {
    pub fn new(
        sales: Arc<dyn SalesSource>,
        keywords: Arc<dyn KeywordSource>,
        assessment: Arc<dyn AssessmentSource>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            sales,
            keywords,
            assessment,
            policy,
            keyword_page: 1,
            keyword_page_size: 20,
        }
    }

    /// 设置关键词反查的分页参数
    pub fn with_keyword_paging(mut self, page: u32, size: u32) -> Self {
        self.keyword_page = page.max(1);
        self.keyword_page_size = size.max(1);
        self
    }

    /// 验证一个候选商品（含超时和重试）
    pub async fn verify(
        &self,
        candidate: &Candidate,
        ctx: &VerificationCtx,
    ) -> Result<VerifiedProduct, VerificationFailure> {
        let mut attempt = 0;
        loop {
            let reason = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.attempt(candidate, ctx),
            )
            .await
            {
                Ok(Ok(product)) => {
                    info!(
                        "{} ✓ 验证完成: 等级 {} (分数 {})",
                        ctx, product.grade, product.grade_score
                    );
                    return Ok(product);
                }
                Ok(Err(reason)) => reason,
                Err(_) => FailureReason::Timeout {
                    after: self.policy.attempt_timeout,
                },
            };

            if !self.policy.should_retry(&reason, attempt) {
                warn!("{} ❌ 验证失败 (共尝试 {} 次): {}", ctx, attempt + 1, reason);
                return Err(VerificationFailure {
                    candidate_id: candidate.asin.clone(),
                    reason,
                    attempts: attempt + 1,
                });
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                "{} ⚠️ 第 {} 次尝试失败: {}，{}ms 后重试",
                ctx,
                attempt + 1,
                reason,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// 单次验证尝试
    async fn attempt(
        &self,
        candidate: &Candidate,
        ctx: &VerificationCtx,
    ) -> Result<VerifiedProduct, FailureReason> {
        let asin = candidate.asin.as_str();

        // ========== 1. 销量预测 + 关键词反查（并发） ==========
        let (sales_result, keyword_result) = tokio::join!(
            self.sales.predict_sales(asin),
            self.keywords
                .related_keywords(asin, self.keyword_page, self.keyword_page_size),
        );

        let keywords = match keyword_result {
            Ok(records) => {
                debug!("{} 关键词反查: {} 条", ctx, records.len());
                Some(records)
            }
            Err(e) => {
                warn!("{} 关键词反查失败，按无数据处理: {:#}", ctx, e);
                None
            }
        };

        // ========== 2. 销量数据是硬依赖 ==========
        let sales = match sales_result {
            Ok(Some(sales)) => sales,
            Ok(None) => return Err(FailureReason::NoSalesData),
            Err(e) => {
                warn!("{} 销量预测失败: {:#}", ctx, e);
                return Err(FailureReason::Source(e.to_string()));
            }
        };

        // ========== 3. 定性评估（失败时使用默认值） ==========
        let review_text = candidate.review_text();
        let assessment = match self
            .assessment
            .assess(
                candidate,
                &sales,
                keywords.as_deref().unwrap_or_default(),
                review_text.as_deref(),
            )
            .await
        {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                warn!("{} 定性评估失败，使用默认风险/一致性: {:#}", ctx, e);
                None
            }
        };

        // ========== 4. 指标 + 评级 ==========
        let mut enrichment = EnrichmentBundle {
            sales: None,
            keywords,
            assessment,
        };
        let avg_cpc = enrichment.average_cpc().unwrap_or(DEFAULT_CPC);
        let metrics =
            calculate_metrics(candidate, &sales, avg_cpc, enrichment.assessment.as_ref());

        let signals = GradingSignals {
            monthly_profit: metrics.monthly_profit,
            price: candidate.price,
            margin: sales.margin,
            // 缺失按最差处理
            review_count: candidate.review_count.map(f64::from).unwrap_or(f64::NAN),
            avg_cpc,
            risk: enrichment.effective_risk(),
            consistency: enrichment.effective_consistency(),
            profit_per_unit: metrics.profit_per_unit,
            sales_rank: candidate.sales_rank.map(f64::from),
            rating: candidate.rating,
            opportunity_score: enrichment
                .assessment
                .as_ref()
                .and_then(|a| a.opportunity_score)
                .map(f64::from),
        };
        let result = grading::grade(&signals);
        enrichment.sales = Some(sales);

        Ok(VerifiedProduct::new(
            candidate.clone(),
            enrichment,
            metrics,
            result.grade,
            result.score,
        ))
    }
}
