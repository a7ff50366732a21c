//! 外部数据源接口
//!
//! 流水线只通过这些 trait 接触外部世界：商品发现、销量预测、
//! 关键词反查、定性评估，以及报告落盘。HTTP/LLM 实现在
//! `clients/` 和 `services/` 中，测试里用内存实现替换。

use crate::models::{
    Candidate, KeywordRecord, MarketReport, QualitativeAssessment, SalesPrediction,
    VerifiedProduct,
};
use anyhow::Result;
use async_trait::async_trait;

/// 商品发现数据源
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// 按搜索词发现商品，最多返回 `limit` 个
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Candidate>>;

    /// 按商品标识列表直接查询
    async fn lookup(&self, asins: &[String]) -> Result<Vec<Candidate>>;
}

/// 销量/利润预测数据源
///
/// `Ok(None)` 表示该商品没有预测数据。
#[async_trait]
pub trait SalesSource: Send + Sync {
    async fn predict_sales(&self, asin: &str) -> Result<Option<SalesPrediction>>;
}

/// 关键词反查数据源
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn related_keywords(
        &self,
        asin: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<KeywordRecord>>;
}

/// 定性评估数据源
#[async_trait]
pub trait AssessmentSource: Send + Sync {
    async fn assess(
        &self,
        candidate: &Candidate,
        sales: &SalesPrediction,
        keywords: &[KeywordRecord],
        review_text: Option<&str>,
    ) -> Result<QualitativeAssessment>;
}

/// 报告落盘
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn store(&self, report: &MarketReport, products: &[VerifiedProduct]) -> Result<()>;
}
