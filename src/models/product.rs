use crate::models::candidate::Candidate;
use crate::models::enrichment::EnrichmentBundle;
use crate::models::grade::Grade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 评论数区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewBucket {
    #[serde(rename = "0-49")]
    UnderFifty,
    #[serde(rename = "50-199")]
    UnderTwoHundred,
    #[serde(rename = "200-499")]
    UnderFiveHundred,
    #[serde(rename = "500-999")]
    UnderThousand,
    #[serde(rename = "1000+")]
    ThousandPlus,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ReviewBucket {
    pub fn from_count(count: Option<u32>) -> Self {
        match count {
            None => ReviewBucket::Unknown,
            Some(c) if c < 50 => ReviewBucket::UnderFifty,
            Some(c) if c < 200 => ReviewBucket::UnderTwoHundred,
            Some(c) if c < 500 => ReviewBucket::UnderFiveHundred,
            Some(c) if c < 1000 => ReviewBucket::UnderThousand,
            Some(_) => ReviewBucket::ThousandPlus,
        }
    }
}

/// 派生指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedMetrics {
    /// 日销售额
    pub daily_revenue: f64,
    pub review_bucket: ReviewBucket,
    /// 变体数量（至少为 1）
    pub variation_count: u32,
    /// 配送费估算（美元/件）
    pub fulfillment_cost: f64,
    /// 新品推广广告预算（美元）
    pub launch_budget: f64,
    /// 推广期后的单件利润（美元）
    pub profit_per_unit: f64,
    /// 月利润 = 单件利润 × 月销量
    pub monthly_profit: f64,
}

/// 已验证商品
///
/// 每次验证成功产出一个，产出后在流水线内不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedProduct {
    pub candidate: Candidate,
    pub enrichment: EnrichmentBundle,
    pub metrics: CalculatedMetrics,
    pub grade: Grade,
    /// 评级分数，仅用于排序和展示
    pub grade_score: u8,
    /// 销量预测成功时为 true
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
}

impl VerifiedProduct {
    pub fn new(
        candidate: Candidate,
        enrichment: EnrichmentBundle,
        metrics: CalculatedMetrics,
        grade: Grade,
        grade_score: u8,
    ) -> Self {
        let verified = enrichment.sales.is_some();
        Self {
            candidate,
            enrichment,
            metrics,
            grade,
            grade_score,
            verified,
            verified_at: Utc::now(),
        }
    }

    pub fn asin(&self) -> &str {
        &self.candidate.asin
    }
}

/// 按等级从好到差排序（同等级按评级分数）
pub fn sort_by_grade(products: &mut [VerifiedProduct]) {
    products.sort_by(|a, b| {
        b.grade
            .cmp(&a.grade)
            .then_with(|| b.grade_score.cmp(&a.grade_score))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrichment::SalesPrediction;

    fn metrics() -> CalculatedMetrics {
        CalculatedMetrics {
            daily_revenue: 100.0,
            review_bucket: ReviewBucket::UnderFifty,
            variation_count: 1,
            fulfillment_cost: 4.0,
            launch_budget: 600.0,
            profit_per_unit: 8.0,
            monthly_profit: 2400.0,
        }
    }

    fn product(asin: &str, grade: &str, with_sales: bool) -> VerifiedProduct {
        let enrichment = EnrichmentBundle {
            sales: with_sales.then(|| SalesPrediction {
                monthly_units: 300.0,
                monthly_revenue: 9000.0,
                margin: 30.0,
                referral_fee: None,
                fba_fee: None,
            }),
            ..Default::default()
        };
        VerifiedProduct::new(
            Candidate::new(asin, "test"),
            enrichment,
            metrics(),
            Grade::parse(grade).unwrap(),
            50,
        )
    }

    #[test]
    fn test_verified_flag_follows_sales() {
        assert!(product("B01", "A1", true).verified);
        assert!(!product("B02", "A1", false).verified);
    }

    #[test]
    fn test_sort_by_grade() {
        let mut products = vec![
            product("B01", "C3", true),
            product("B02", "A10", true),
            product("B03", "B5", true),
        ];
        sort_by_grade(&mut products);
        let order: Vec<&str> = products.iter().map(|p| p.asin()).collect();
        assert_eq!(order, vec!["B02", "B03", "B01"]);
    }

    #[test]
    fn test_review_bucket() {
        assert_eq!(ReviewBucket::from_count(None), ReviewBucket::Unknown);
        assert_eq!(ReviewBucket::from_count(Some(49)), ReviewBucket::UnderFifty);
        assert_eq!(ReviewBucket::from_count(Some(1000)), ReviewBucket::ThousandPlus);
    }
}
