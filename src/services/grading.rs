//! 评级引擎 - 业务能力层
//!
//! 纯函数：把一组商品信号映射到 41 个有序等级之一。
//! 商品级（每个已验证商品）和市场级（平均信号）各调用一次。
//!
//! ## 规则
//! 1. 数值信号（利润、毛利率、评论数、CPC、单件利润）加权得到 0-100 的分数
//! 2. 分数 < 15 直接为 F1，否则线性映射到 D1..A10
//! 3. 风险分类和一致性评级作为硬上限，`Prohibited` 强制 F1
//!
//! 任何输入（包括 NaN、负数、无穷大）都映射到唯一等级，不会 panic。

use crate::models::enrichment::{ConsistencyRating, RiskClassification};
use crate::models::grade::{Grade, GRADE_COUNT};
use serde::{Deserialize, Serialize};

/// 分数低于此值直接为 F1
const FAILING_SCORE: u32 = 15;

/// 没有关键词 CPC 数据时使用的默认 CPC（美元）
pub const DEFAULT_CPC: f64 = 1.0;

/// 评级信号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSignals {
    pub monthly_profit: f64,
    pub price: f64,
    /// 毛利率（百分比）
    pub margin: f64,
    pub review_count: f64,
    pub avg_cpc: f64,
    pub risk: RiskClassification,
    pub consistency: ConsistencyRating,
    pub profit_per_unit: f64,
    pub sales_rank: Option<f64>,
    pub rating: Option<f64>,
    pub opportunity_score: Option<f64>,
}

/// 评级结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeResult {
    pub grade: Grade,
    /// 0-100，仅用于排序和展示
    pub score: u8,
}

/// 计算等级
pub fn grade(signals: &GradingSignals) -> GradeResult {
    if signals.risk == RiskClassification::Prohibited {
        return GradeResult {
            grade: Grade::WORST,
            score: 0,
        };
    }

    let score = weighted_score(signals);
    let uncapped = grade_for_score(score);
    let cap = risk_cap(signals.risk).min(consistency_cap(signals.consistency));

    GradeResult {
        grade: uncapped.min(cap),
        score,
    }
}

/// 分数 → 等级（不考虑上限）
pub fn grade_for_score(score: u8) -> Grade {
    let score = u32::from(score.min(100));
    if score < FAILING_SCORE {
        return Grade::WORST;
    }
    // 15 → D1 (2)，100 → A10 (41)
    let steps = u32::from(GRADE_COUNT) - 2;
    let rank = 2 + (score - FAILING_SCORE) * steps / (100 - FAILING_SCORE);
    Grade::from_rank(rank as u8)
}

/// 风险分类的等级上限
fn risk_cap(risk: RiskClassification) -> Grade {
    match risk {
        RiskClassification::Safe => Grade::BEST,
        RiskClassification::Electric => label("B10"),
        RiskClassification::Breakable => label("B5"),
        RiskClassification::Medical => label("C10"),
        RiskClassification::Prohibited => Grade::WORST,
    }
}

/// 一致性评级的等级上限
fn consistency_cap(consistency: ConsistencyRating) -> Grade {
    match consistency {
        ConsistencyRating::High => Grade::BEST,
        ConsistencyRating::Medium => label("A5"),
        ConsistencyRating::Low => label("B10"),
        ConsistencyRating::Variable => label("C10"),
    }
}

fn label(l: &str) -> Grade {
    Grade::parse(l).unwrap_or(Grade::WORST)
}

/// 数值信号加权分数（0-100）
fn weighted_score(s: &GradingSignals) -> u8 {
    let mut total = profit_points(s.monthly_profit)
        + margin_points(s.margin)
        + review_points(s.review_count)
        + cpc_points(s.avg_cpc)
        + unit_profit_points(s.profit_per_unit);

    if let Some(rank) = s.sales_rank.filter(|r| r.is_finite() && *r > 0.0) {
        total += if rank <= 5_000.0 {
            4.0
        } else if rank <= 20_000.0 {
            2.0
        } else {
            0.0
        };
    }
    if let Some(rating) = s.rating.filter(|r| r.is_finite()) {
        total += if rating >= 4.3 {
            3.0
        } else if rating < 3.5 {
            -3.0
        } else {
            0.0
        };
    }
    if let Some(opp) = s.opportunity_score.filter(|o| o.is_finite()) {
        total += opp.clamp(0.0, 100.0) / 100.0 * 3.0;
    }
    // 低价商品的 FBA 费用占比过高
    if !(s.price >= 10.0) {
        total -= 5.0;
    }

    total.clamp(0.0, 100.0).round() as u8
}

fn profit_points(monthly_profit: f64) -> f64 {
    if monthly_profit >= 10_000.0 {
        30.0
    } else if monthly_profit >= 5_000.0 {
        25.0
    } else if monthly_profit >= 2_500.0 {
        20.0
    } else if monthly_profit >= 1_000.0 {
        14.0
    } else if monthly_profit >= 500.0 {
        8.0
    } else if monthly_profit > 0.0 {
        3.0
    } else {
        0.0
    }
}

fn margin_points(margin: f64) -> f64 {
    if margin >= 40.0 {
        20.0
    } else if margin >= 30.0 {
        16.0
    } else if margin >= 25.0 {
        12.0
    } else if margin >= 20.0 {
        8.0
    } else if margin >= 10.0 {
        4.0
    } else {
        0.0
    }
}

fn review_points(reviews: f64) -> f64 {
    if !(reviews >= 0.0) {
        0.0
    } else if reviews < 50.0 {
        15.0
    } else if reviews < 200.0 {
        12.0
    } else if reviews < 500.0 {
        9.0
    } else if reviews < 1_000.0 {
        6.0
    } else if reviews < 3_000.0 {
        3.0
    } else {
        0.0
    }
}

fn cpc_points(cpc: f64) -> f64 {
    if !(cpc >= 0.0) {
        0.0
    } else if cpc <= 0.5 {
        10.0
    } else if cpc <= 1.0 {
        8.0
    } else if cpc <= 1.5 {
        6.0
    } else if cpc <= 2.5 {
        3.0
    } else {
        0.0
    }
}

fn unit_profit_points(profit_per_unit: f64) -> f64 {
    if profit_per_unit >= 15.0 {
        15.0
    } else if profit_per_unit >= 10.0 {
        12.0
    } else if profit_per_unit >= 7.0 {
        9.0
    } else if profit_per_unit >= 4.0 {
        6.0
    } else if profit_per_unit > 0.0 {
        3.0
    } else {
        0.0
    }
}
