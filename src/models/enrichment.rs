//! 富化数据模型
//!
//! 每个外部数据源只负责 `EnrichmentBundle` 中的一组字段，
//! 数据源失败时对应字段为 `None`，而不是在数值字段里塞默认值。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 销量/利润预测记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesPrediction {
    /// 月销量
    pub monthly_units: f64,
    /// 月销售额（美元）
    pub monthly_revenue: f64,
    /// 毛利率（百分比，例如 32.5）
    pub margin: f64,
    /// 平台佣金（美元/件）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_fee: Option<f64>,
    /// 供应商给出的 FBA 配送费（美元/件）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fba_fee: Option<f64>,
}

/// 关联搜索词记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRecord {
    pub keyword: String,
    /// 月搜索量
    #[serde(default)]
    pub search_volume: u64,
    /// 商品在该词下的自然排名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_position: Option<u32>,
    /// 流量占比（0-1）
    #[serde(default)]
    pub traffic_share: f64,
    /// 单次点击成本（美元）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpc: Option<f64>,
}

/// 商品风险分类
///
/// `Prohibited` 为一票否决项，评级引擎会直接给出最低等级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RiskClassification {
    #[default]
    Safe,
    Electric,
    Breakable,
    Medical,
    Prohibited,
}

impl RiskClassification {
    /// 宽松解析（LLM 返回的文本大小写、措辞不一）
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v.is_empty() {
            return None;
        }
        if v.contains("prohibit") || v.contains("restrict") || v.contains("hazmat") {
            Some(RiskClassification::Prohibited)
        } else if v.contains("medic") || v.contains("health") {
            Some(RiskClassification::Medical)
        } else if v.contains("break") || v.contains("fragile") || v.contains("glass") {
            Some(RiskClassification::Breakable)
        } else if v.contains("electr") || v.contains("battery") {
            Some(RiskClassification::Electric)
        } else if v.contains("safe") || v.contains("low") {
            Some(RiskClassification::Safe)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskClassification::Safe => "Safe",
            RiskClassification::Electric => "Electric",
            RiskClassification::Breakable => "Breakable",
            RiskClassification::Medical => "Medical",
            RiskClassification::Prohibited => "Prohibited",
        }
    }
}

impl fmt::Display for RiskClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 需求一致性评级
///
/// 商品级由定性评估给出（High/Medium/Low），
/// 市场级由聚合器根据等级分布给出（四档都可能）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConsistencyRating {
    High,
    #[default]
    Medium,
    Low,
    Variable,
}

impl ConsistencyRating {
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with("high") || v.contains("consistent") || v.contains("evergreen") {
            Some(ConsistencyRating::High)
        } else if v.starts_with("med") || v.contains("seasonal") {
            Some(ConsistencyRating::Medium)
        } else if v.starts_with("low") || v.contains("trend") || v.contains("fad") {
            Some(ConsistencyRating::Low)
        } else if v.starts_with("var") {
            Some(ConsistencyRating::Variable)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConsistencyRating::High => "High",
            ConsistencyRating::Medium => "Medium",
            ConsistencyRating::Low => "Low",
            ConsistencyRating::Variable => "Variable",
        }
    }
}

impl fmt::Display for ConsistencyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 包装尺寸（英寸）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    /// 按从大到小排序后的三边
    pub fn sorted_sides(&self) -> [f64; 3] {
        let mut sides = [self.length, self.width, self.height];
        sides.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        sides
    }

    pub fn is_valid(&self) -> bool {
        [self.length, self.width, self.height]
            .iter()
            .all(|s| s.is_finite() && *s > 0.0)
    }
}

/// 定性评估记录
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualitativeAssessment {
    pub risk: RiskClassification,
    pub consistency: ConsistencyRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// 估计重量（磅）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_lb: Option<f64>,
    /// 机会分（1-100）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_score: Option<u8>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

/// 单个候选商品的富化结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentBundle {
    /// 销量/利润预测，失败为 None
    pub sales: Option<SalesPrediction>,
    /// 关联搜索词，数据源失败为 None，没有关联词为空列表
    pub keywords: Option<Vec<KeywordRecord>>,
    /// 定性评估，失败为 None
    pub assessment: Option<QualitativeAssessment>,
}

impl EnrichmentBundle {
    /// 搜索词平均 CPC（只统计有 CPC 的词）
    pub fn average_cpc(&self) -> Option<f64> {
        let cpcs: Vec<f64> = self
            .keywords
            .iter()
            .flatten()
            .filter_map(|k| k.cpc)
            .filter(|c| c.is_finite() && *c >= 0.0)
            .collect();
        if cpcs.is_empty() {
            None
        } else {
            Some(cpcs.iter().sum::<f64>() / cpcs.len() as f64)
        }
    }

    /// 实际用于评级的风险分类（缺失时按 Safe 处理）
    pub fn effective_risk(&self) -> RiskClassification {
        self.assessment
            .as_ref()
            .map(|a| a.risk)
            .unwrap_or_default()
    }

    /// 实际用于评级的一致性（缺失时按 Medium 处理）
    pub fn effective_consistency(&self) -> ConsistencyRating {
        self.assessment
            .as_ref()
            .map(|a| a.consistency)
            .unwrap_or_default()
    }
}
