//! 市场聚合 - 业务能力层
//!
//! 把一个搜索词下的全部已验证商品汇总成市场报告：
//! 平均指标、一致性、主流风险、机会分和市场等级。
//!
//! 只有 `verified = true` 且售价大于 0 的商品参与统计，
//! 参与者为空时返回 `AggregationError::NoParticipants`。

use crate::models::{
    grade_rank, ConsistencyRating, Grade, MarketAverages, MarketReport, RiskClassification,
    VerifiedProduct,
};
use crate::services::grading::{self, GradingSignals, DEFAULT_CPC};
use chrono::Utc;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// 毛利率参考值（百分比），达到即拿满 40 分
const REFERENCE_MARGIN: f64 = 40.0;
/// 月销售额参考值（美元），达到即拿满 30 分
const REFERENCE_REVENUE: f64 = 50_000.0;
/// 平均评论数达到此值时竞争扣分封顶 20 分
const REFERENCE_REVIEWS: f64 = 2_000.0;

/// 聚合错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// 没有可参与统计的已验证商品
    #[error("搜索词 \"{keyword}\" 没有可用于统计的已验证商品")]
    NoParticipants { keyword: String },
}

/// 候选数量统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateCounts {
    /// 发现阶段返回的数量（初筛前）
    pub total: usize,
    /// 初筛后进入验证的数量
    pub analyzed: usize,
    pub failed: usize,
}

/// 生成市场报告
pub fn aggregate(
    keyword: &str,
    products: &[VerifiedProduct],
    counts: CandidateCounts,
) -> Result<MarketReport, AggregationError> {
    let participants: Vec<&VerifiedProduct> = products
        .iter()
        .filter(|p| p.verified && p.candidate.price.is_finite() && p.candidate.price > 0.0)
        .collect();

    if participants.is_empty() {
        return Err(AggregationError::NoParticipants {
            keyword: keyword.to_string(),
        });
    }

    debug!(
        "市场聚合: {} 个商品参与统计 (共 {} 个)",
        participants.len(),
        products.len()
    );

    let averages = compute_averages(&participants);
    let consistency = classify_consistency(participants.iter().map(|p| p.grade));
    let risk = dominant_risk(participants.iter().map(|p| p.enrichment.effective_risk()));
    let opportunity = opportunity_score(
        averages.margin,
        averages.monthly_revenue,
        averages.reviews,
        consistency,
    );

    let signals = GradingSignals {
        monthly_profit: averages.monthly_profit,
        price: averages.price,
        margin: averages.margin,
        review_count: averages.reviews.unwrap_or(f64::NAN),
        avg_cpc: averages.cpc.unwrap_or(DEFAULT_CPC),
        risk,
        consistency,
        profit_per_unit: averages.profit_per_unit,
        sales_rank: averages.sales_rank,
        rating: averages.rating,
        opportunity_score: Some(f64::from(opportunity)),
    };
    let market_grade = grading::grade(&signals).grade;

    let average_product_grade = average_grade(participants.iter().map(|p| p.grade));

    info!(
        "📈 市场等级 {} | 一致性 {} | 风险 {} | 机会分 {}",
        market_grade, consistency, risk, opportunity
    );

    Ok(MarketReport {
        keyword: keyword.to_string(),
        averages,
        market_grade,
        average_product_grade,
        consistency_rating: consistency,
        risk_classification: risk,
        opportunity_score: opportunity,
        total_candidates: counts.total.max(products.len()),
        analyzed_count: counts.analyzed,
        verified_count: participants.len(),
        failed_count: counts.failed,
        generated_at: Utc::now(),
    })
}

/// 计算各项平均值，每一项单独排除无效值
fn compute_averages(products: &[&VerifiedProduct]) -> MarketAverages {
    let sales = |p: &&VerifiedProduct| p.enrichment.sales.clone();

    MarketAverages {
        price: mean(products.iter().map(|p| p.candidate.price)).unwrap_or(0.0),
        monthly_sales: mean(products.iter().filter_map(sales).map(|s| s.monthly_units))
            .unwrap_or(0.0),
        monthly_revenue: mean(products.iter().filter_map(sales).map(|s| s.monthly_revenue))
            .unwrap_or(0.0),
        monthly_profit: mean(products.iter().map(|p| p.metrics.monthly_profit)).unwrap_or(0.0),
        reviews: mean(
            products
                .iter()
                .filter_map(|p| p.candidate.review_count)
                .map(f64::from),
        ),
        rating: mean(
            products
                .iter()
                .filter_map(|p| p.candidate.rating)
                .filter(|r| *r > 0.0),
        ),
        sales_rank: mean(
            products
                .iter()
                .filter_map(|p| p.candidate.sales_rank)
                .filter(|r| *r > 0)
                .map(f64::from),
        ),
        margin: mean(products.iter().filter_map(sales).map(|s| s.margin)).unwrap_or(0.0),
        cpc: mean(products.iter().filter_map(|p| p.enrichment.average_cpc())),
        daily_revenue: mean(products.iter().map(|p| p.metrics.daily_revenue)).unwrap_or(0.0),
        launch_budget: mean(products.iter().map(|p| p.metrics.launch_budget)).unwrap_or(0.0),
        profit_per_unit: mean(products.iter().map(|p| p.metrics.profit_per_unit)).unwrap_or(0.0),
    }
}

/// 算术平均，跳过非有限值；没有有效值时为 None
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// 按不同等级标签的数量划分一致性
pub fn classify_consistency(grades: impl Iterator<Item = Grade>) -> ConsistencyRating {
    let distinct: HashSet<Grade> = grades.collect();
    match distinct.len() {
        0 | 1 => ConsistencyRating::High,
        2 => ConsistencyRating::Medium,
        3 => ConsistencyRating::Low,
        _ => ConsistencyRating::Variable,
    }
}

/// 出现次数最多的风险分类，平局时取最先出现的
pub fn dominant_risk(risks: impl Iterator<Item = RiskClassification>) -> RiskClassification {
    let mut counts: Vec<(RiskClassification, usize)> = Vec::new();
    for risk in risks {
        match counts.iter_mut().find(|(r, _)| *r == risk) {
            Some((_, n)) => *n += 1,
            None => counts.push((risk, 1)),
        }
    }

    let mut best: Option<(RiskClassification, usize)> = None;
    for (risk, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((risk, n));
        }
    }
    best.map(|(r, _)| r).unwrap_or_default()
}

/// 机会分（1-100）
///
/// 毛利率最多 40 分，月销售额最多 30 分，竞争（平均评论数）最多扣 20 分，
/// 一致性按档位加 2-10 分。评论数未知时按满额扣分。
pub fn opportunity_score(
    avg_margin: f64,
    avg_revenue: f64,
    avg_reviews: Option<f64>,
    consistency: ConsistencyRating,
) -> u8 {
    let ratio = |value: f64, reference: f64| {
        if value.is_finite() {
            (value / reference).clamp(0.0, 1.0)
        } else if value > 0.0 {
            1.0
        } else {
            0.0
        }
    };

    let margin_points = 40.0 * ratio(avg_margin, REFERENCE_MARGIN);
    let revenue_points = 30.0 * ratio(avg_revenue, REFERENCE_REVENUE);
    let competition_penalty = match avg_reviews.filter(|r| !r.is_nan()) {
        Some(reviews) => 20.0 * ratio(reviews, REFERENCE_REVIEWS),
        None => 20.0,
    };
    let consistency_bonus = match consistency {
        ConsistencyRating::High => 10.0,
        ConsistencyRating::Medium => 6.0,
        ConsistencyRating::Low => 4.0,
        ConsistencyRating::Variable => 2.0,
    };

    (margin_points + revenue_points - competition_penalty + consistency_bonus)
        .round()
        .clamp(1.0, 100.0) as u8
}

/// 各等级名次的平均值（四舍五入）对应的等级
fn average_grade(grades: impl Iterator<Item = Grade>) -> Grade {
    let ranks: Vec<f64> = grades.map(|g| f64::from(grade_rank(g.label()))).collect();
    mean(ranks.into_iter())
        .map(|r| Grade::from_rank(r.round() as u8))
        .unwrap_or(Grade::WORST)
}
