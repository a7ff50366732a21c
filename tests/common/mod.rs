//! 集成测试用的内存数据源
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use market_scout::models::{
    Candidate, ConsistencyRating, KeywordRecord, MarketReport, QualitativeAssessment,
    RiskClassification, SalesPrediction, VerifiedProduct,
};
use market_scout::progress::{BatchProgress, PipelineObserver, UserFacingError};
use market_scout::sources::{
    AssessmentSource, DiscoverySource, KeywordSource, ReportSink, SalesSource,
};
use market_scout::workflow::{RetryPolicy, VerificationFlow};
use tokio_util::sync::CancellationToken;

/// 构造候选商品
pub fn candidate(
    asin: &str,
    price: f64,
    reviews: u32,
    rating: f64,
    rank: u32,
) -> Candidate {
    Candidate {
        price,
        review_count: Some(reviews),
        rating: Some(rating),
        sales_rank: Some(rank),
        category_path: "Home & Kitchen > Kitchen Utensils".to_string(),
        ..Candidate::new(asin, format!("Test product {}", asin))
    }
}

/// 初筛分数最高的候选
pub fn strong_candidate(asin: &str) -> Candidate {
    candidate(asin, 24.99, 30, 4.6, 800)
}

/// 初筛分数很低的候选
pub fn weak_candidate(asin: &str) -> Candidate {
    candidate(asin, 4.99, 8_000, 3.0, 400_000)
}

pub fn sales_prediction() -> SalesPrediction {
    SalesPrediction {
        monthly_units: 900.0,
        monthly_revenue: 22_500.0,
        margin: 36.0,
        referral_fee: Some(3.75),
        fba_fee: Some(4.80),
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(5),
        attempt_timeout: Duration::from_millis(150),
        retry_on_timeout: false,
    }
}

// ========== 商品发现 ==========

pub struct MockDiscovery {
    pub candidates: Vec<Candidate>,
    pub fail: bool,
}

impl MockDiscovery {
    pub fn returning(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            candidates: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl DiscoverySource for MockDiscovery {
    async fn search(&self, _keyword: &str, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        if self.fail {
            anyhow::bail!("crawler quota exceeded");
        }
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }

    async fn lookup(&self, asins: &[String]) -> anyhow::Result<Vec<Candidate>> {
        if self.fail {
            anyhow::bail!("crawler quota exceeded");
        }
        Ok(self
            .candidates
            .iter()
            .filter(|c| asins.contains(&c.asin))
            .cloned()
            .collect())
    }
}

// ========== 销量预测 ==========

/// 单个商品的销量数据源行为
#[derive(Debug, Clone, Copy)]
pub enum SalesBehavior {
    /// 延迟后返回数据
    Ok(Duration),
    /// 没有数据
    Missing,
    /// 一直报错
    Fail,
    /// 长时间不返回
    Hang,
    /// 任务 panic
    Panic,
}

/// 按 ASIN 脚本化的销量数据源，同时记录调用顺序
#[derive(Default)]
pub struct ScriptedSales {
    behaviors: HashMap<String, SalesBehavior>,
    /// "start:ASIN" / "end:ASIN"
    pub timeline: Mutex<Vec<String>>,
    pub calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedSales {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, asin: &str, behavior: SalesBehavior) -> Self {
        self.behaviors.insert(asin.to_string(), behavior);
        self
    }

    pub fn calls_for(&self, asin: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(asin)
            .copied()
            .unwrap_or(0)
    }

    pub fn timeline(&self) -> Vec<String> {
        self.timeline.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.timeline.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl SalesSource for ScriptedSales {
    async fn predict_sales(&self, asin: &str) -> anyhow::Result<Option<SalesPrediction>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(asin.to_string())
            .or_insert(0) += 1;
        self.record(format!("start:{}", asin));

        let behavior = self
            .behaviors
            .get(asin)
            .copied()
            .unwrap_or(SalesBehavior::Ok(Duration::ZERO));

        let result = match behavior {
            SalesBehavior::Ok(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Some(sales_prediction()))
            }
            SalesBehavior::Missing => Ok(None),
            SalesBehavior::Fail => Err(anyhow::anyhow!("sales api returned 500")),
            SalesBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Some(sales_prediction()))
            }
            SalesBehavior::Panic => panic!("sales source crashed for {}", asin),
        };

        self.record(format!("end:{}", asin));
        result
    }
}

// ========== 关键词 / 定性评估 ==========

pub struct FixedKeywords;

#[async_trait]
impl KeywordSource for FixedKeywords {
    async fn related_keywords(
        &self,
        asin: &str,
        _page: u32,
        _size: u32,
    ) -> anyhow::Result<Vec<KeywordRecord>> {
        Ok(vec![KeywordRecord {
            keyword: format!("{} keyword", asin.to_lowercase()),
            search_volume: 15_000,
            rank_position: Some(6),
            traffic_share: 0.12,
            cpc: Some(0.85),
        }])
    }
}

pub struct FixedAssessment;

#[async_trait]
impl AssessmentSource for FixedAssessment {
    async fn assess(
        &self,
        _candidate: &Candidate,
        _sales: &SalesPrediction,
        _keywords: &[KeywordRecord],
        _review_text: Option<&str>,
    ) -> anyhow::Result<QualitativeAssessment> {
        Ok(QualitativeAssessment {
            risk: RiskClassification::Safe,
            consistency: ConsistencyRating::High,
            opportunity_score: Some(72),
            ..QualitativeAssessment::default()
        })
    }
}

pub fn flow(sales: Arc<ScriptedSales>) -> VerificationFlow {
    VerificationFlow::new(
        sales,
        Arc::new(FixedKeywords),
        Arc::new(FixedAssessment),
        fast_policy(),
    )
}

// ========== 观察者 / 落盘 ==========

/// 记录所有检查点的观察者
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
    pub batches: Mutex<Vec<BatchProgress>>,
    pub errors: Mutex<Vec<UserFacingError>>,
    /// 第一批结束后触发取消
    pub cancel_after_first_batch: Option<CancellationToken>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_discovering(&self, _query: &str) {
        self.push("discovering");
    }

    fn on_discovered(&self, found: usize, kept: usize) {
        self.push(format!("discovered:{}/{}", kept, found));
    }

    fn on_batch_start(&self, progress: &BatchProgress) {
        self.push(format!("batch_start:{}", progress.batch));
    }

    fn on_batch_complete(&self, progress: &BatchProgress) {
        self.push(format!("batch_complete:{}", progress.batch));
        self.batches.lock().unwrap().push(*progress);
        if let Some(token) = &self.cancel_after_first_batch {
            token.cancel();
        }
    }

    fn on_grading(&self, verified: usize) {
        self.push(format!("grading:{}", verified));
    }

    fn on_complete(&self, _report: &MarketReport) {
        self.push("complete");
    }

    fn on_no_results(&self, _query: &str) {
        self.push("no_results");
    }

    fn on_error(&self, error: &UserFacingError) {
        self.push("error");
        self.errors.lock().unwrap().push(error.clone());
    }
}

/// 内存报告落盘
#[derive(Default)]
pub struct MemorySink {
    pub stored: Mutex<Vec<(MarketReport, Vec<VerifiedProduct>)>>,
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn store(&self, report: &MarketReport, products: &[VerifiedProduct]) -> anyhow::Result<()> {
        self.stored
            .lock()
            .unwrap()
            .push((report.clone(), products.to_vec()));
        Ok(())
    }
}
