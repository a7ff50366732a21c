use serde::{Deserialize, Serialize};

/// 候选商品
///
/// 发现阶段产出的原始记录，只在一次流水线运行期间存在，产出后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// 稳定的商品标识（ASIN）
    pub asin: String,
    pub title: String,
    /// 售价，缺失时为 0
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    /// 大类销售排名（BSR），越小越好
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_rank: Option<u32>,
    /// 原始类目路径，例如 "Home & Kitchen > Kitchen Utensils"
    #[serde(default)]
    pub category_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// 变体 ASIN 列表
    #[serde(default)]
    pub variations: Vec<String>,
    /// 评论片段（可能为空）
    #[serde(default)]
    pub review_snippets: Vec<String>,
}

impl Candidate {
    /// 创建只有标识和标题的候选商品
    pub fn new(asin: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            asin: asin.into(),
            title: title.into(),
            price: 0.0,
            rating: None,
            review_count: None,
            sales_rank: None,
            category_path: String::new(),
            thumbnail: None,
            variations: Vec::new(),
            review_snippets: Vec::new(),
        }
    }

    /// 评论文本（供定性评估使用）
    pub fn review_text(&self) -> Option<String> {
        if self.review_snippets.is_empty() {
            None
        } else {
            Some(self.review_snippets.join("\n"))
        }
    }
}
