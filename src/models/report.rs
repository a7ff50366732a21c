use crate::models::enrichment::{ConsistencyRating, RiskClassification};
use crate::models::grade::Grade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 市场平均指标
///
/// 只统计 `verified = true` 且售价大于 0 的商品；
/// 每一项均值单独排除缺失/无效值。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketAverages {
    pub price: f64,
    pub monthly_sales: f64,
    pub monthly_revenue: f64,
    pub monthly_profit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_rank: Option<f64>,
    pub margin: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpc: Option<f64>,
    pub daily_revenue: f64,
    pub launch_budget: f64,
    pub profit_per_unit: f64,
}

/// 市场报告
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub keyword: String,
    pub averages: MarketAverages,
    pub market_grade: Grade,
    /// 各商品等级名次的平均值对应的等级
    pub average_product_grade: Grade,
    pub consistency_rating: ConsistencyRating,
    pub risk_classification: RiskClassification,
    /// 机会分（1-100）
    pub opportunity_score: u8,
    /// 发现阶段返回的候选数量（初筛前）
    pub total_candidates: usize,
    /// 初筛后进入验证的数量
    pub analyzed_count: usize,
    pub verified_count: usize,
    pub failed_count: usize,
    pub generated_at: DateTime<Utc>,
}
