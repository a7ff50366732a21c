//! 派生指标计算 - 业务能力层
//!
//! 根据售价、尺寸/重量和关键词 CPC 计算日销售额、配送费、
//! 推广预算和推广期后的单件利润。

use crate::models::{
    Candidate, CalculatedMetrics, Dimensions, QualitativeAssessment, ReviewBucket,
    SalesPrediction,
};

/// 平台佣金比例（供应商未给出佣金时使用）
const REFERRAL_RATE: f64 = 0.15;
/// 采购成本占售价比例
const COGS_RATIO: f64 = 0.25;
/// 广告转化率
const AD_CONVERSION_RATE: f64 = 0.10;
/// 推广期后来自广告的销量占比
const AD_SALES_SHARE: f64 = 0.30;
/// 新品推广期每日目标点击数
const LAUNCH_DAILY_CLICKS: f64 = 20.0;
const LAUNCH_DAYS: f64 = 30.0;
const MIN_LAUNCH_BUDGET: f64 = 500.0;
/// 无法估算时的配送费
const DEFAULT_FULFILLMENT_COST: f64 = 5.0;
/// 体积重除数（立方英寸/磅）
const DIM_WEIGHT_DIVISOR: f64 = 139.0;

/// 计算派生指标
///
/// `avg_cpc` 为调用方已经确定的 CPC（缺失时用默认值）。
pub fn calculate_metrics(
    candidate: &Candidate,
    sales: &SalesPrediction,
    avg_cpc: f64,
    assessment: Option<&QualitativeAssessment>,
) -> CalculatedMetrics {
    let price = if candidate.price.is_finite() {
        candidate.price.max(0.0)
    } else {
        0.0
    };

    let fulfillment_cost = estimate_fulfillment_cost(
        assessment.and_then(|a| a.dimensions),
        assessment.and_then(|a| a.weight_lb),
        sales.fba_fee,
    );

    let referral_fee = sales
        .referral_fee
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(price * REFERRAL_RATE);

    let ad_cost_per_unit = avg_cpc / AD_CONVERSION_RATE * AD_SALES_SHARE;
    let profit_per_unit =
        round_cents(price - referral_fee - fulfillment_cost - price * COGS_RATIO - ad_cost_per_unit);

    CalculatedMetrics {
        daily_revenue: round_cents(sales.monthly_revenue / 30.0),
        review_bucket: ReviewBucket::from_count(candidate.review_count),
        variation_count: candidate.variations.len().max(1) as u32,
        fulfillment_cost,
        launch_budget: round_cents((avg_cpc * LAUNCH_DAILY_CLICKS * LAUNCH_DAYS).max(MIN_LAUNCH_BUDGET)),
        profit_per_unit,
        monthly_profit: round_cents(profit_per_unit * sales.monthly_units),
    }
}

/// 估算 FBA 配送费
///
/// 优先按尺寸分段计算；没有尺寸时用供应商给出的费用；都没有时用默认值。
pub fn estimate_fulfillment_cost(
    dimensions: Option<Dimensions>,
    weight_lb: Option<f64>,
    vendor_fee: Option<f64>,
) -> f64 {
    let Some(dims) = dimensions.filter(Dimensions::is_valid) else {
        return vendor_fee
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(DEFAULT_FULFILLMENT_COST);
    };

    let [long, median, short] = dims.sorted_sides();
    let dim_weight = long * median * short / DIM_WEIGHT_DIVISOR;
    let actual_weight = weight_lb
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(dim_weight);

    if long <= 15.0 && median <= 12.0 && short <= 0.75 && actual_weight <= 1.0 {
        return 3.22;
    }

    let shipping_weight = actual_weight.max(dim_weight);
    let extra_pounds = (shipping_weight.ceil() - 1.0).max(0.0);

    let cost = if long <= 18.0 && median <= 14.0 && short <= 8.0 && shipping_weight <= 20.0 {
        4.75 + 0.40 * extra_pounds
    } else {
        9.73 + 0.42 * extra_pounds
    };
    round_cents(cost)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
