//! 定性评估服务 - 业务能力层
//!
//! 只负责"LLM 定性评估"能力：风险分类、需求一致性、尺寸/重量估计、
//! 机会分和文字洞察。不关心批次和流程。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（通过 base url 切换）

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, LlmError};
use crate::models::{
    Candidate, ConsistencyRating, Dimensions, KeywordRecord, QualitativeAssessment,
    RiskClassification, SalesPrediction,
};
use crate::sources::AssessmentSource;
use crate::utils::logging::truncate_text;

/// 评论文本最多传给 LLM 的字符数
const MAX_REVIEW_CHARS: usize = 3000;

const SYSTEM_MESSAGE: &str = "你是一名资深的亚马逊 FBA 选品分析师。\
你根据商品属性、销量数据、关键词和评论，判断商品的合规风险、需求稳定性和包装尺寸，\
只输出一个 JSON 对象，不要输出任何其他内容。";

/// 定性评估服务
///
/// 职责：
/// - 调用 LLM 对单个商品做定性评估
/// - 只处理单个商品
/// - 不出现 Vec<Candidate>
/// - 不关心重试和超时（由验证流程负责）
pub struct AssessmentService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl AssessmentService {
    /// 创建新的评估服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .max_tokens(1024u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyContent {
                    model: self.model_name.clone(),
                })
            })?;

        debug!("LLM API 调用成功");
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl AssessmentSource for AssessmentService {
    async fn assess(
        &self,
        candidate: &Candidate,
        sales: &SalesPrediction,
        keywords: &[KeywordRecord],
        review_text: Option<&str>,
    ) -> Result<QualitativeAssessment> {
        let user_message = build_assessment_prompt(candidate, sales, keywords, review_text);
        let response = self.send_to_llm(&user_message, Some(SYSTEM_MESSAGE)).await?;
        Ok(parse_assessment_response(&response)?)
    }
}

/// 构建评估提示词
fn build_assessment_prompt(
    candidate: &Candidate,
    sales: &SalesPrediction,
    keywords: &[KeywordRecord],
    review_text: Option<&str>,
) -> String {
    let top_keywords: Vec<String> = keywords
        .iter()
        .take(10)
        .map(|k| format!("{} (月搜索量 {})", k.keyword, k.search_volume))
        .collect();

    let reviews = review_text
        .map(|t| truncate_text(t, MAX_REVIEW_CHARS))
        .unwrap_or_else(|| "无评论数据".to_string());

    format!(
        r#"请评估下面这个亚马逊商品。

商品信息：
  ASIN：{}
  标题：{}
  类目：{}
  售价：${:.2}
  评分：{}
  评论数：{}

销量预测：
  月销量：{:.0}
  月销售额：${:.0}
  毛利率：{:.1}%

关联关键词：
{}

评论摘录：
{}

请按以下 JSON 格式返回：
{{
  "riskClassification": "Safe | Electric | Breakable | Medical | Prohibited",
  "consistencyRating": "High | Medium | Low",
  "dimensions": {{"length": 英寸, "width": 英寸, "height": 英寸}},
  "weightLb": 磅,
  "opportunityScore": 1-100,
  "insights": ["..."],
  "riskFactors": ["..."]
}}"#,
        candidate.asin,
        candidate.title,
        candidate.category_path,
        candidate.price,
        candidate
            .rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "未知".to_string()),
        candidate
            .review_count
            .map(|r| r.to_string())
            .unwrap_or_else(|| "未知".to_string()),
        sales.monthly_units,
        sales.monthly_revenue,
        sales.margin,
        if top_keywords.is_empty() {
            "  无".to_string()
        } else {
            top_keywords
                .iter()
                .map(|k| format!("  - {}", k))
                .collect::<Vec<_>>()
                .join("\n")
        },
        reviews
    )
}

/// LLM 返回的原始 JSON
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssessment {
    #[serde(default, alias = "risk")]
    risk_classification: String,
    #[serde(default, alias = "consistency")]
    consistency_rating: String,
    #[serde(default)]
    dimensions: Option<Dimensions>,
    #[serde(default, alias = "weight")]
    weight_lb: Option<f64>,
    #[serde(default)]
    opportunity_score: Option<f64>,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    risk_factors: Vec<String>,
}

/// 解析 LLM 返回的评估结果
///
/// LLM 可能在 JSON 前后加说明文字或 markdown 代码块，只取第一个 `{` 到最后一个 `}`。
fn parse_assessment_response(response: &str) -> std::result::Result<QualitativeAssessment, AppError> {
    let parse_failed = || {
        AppError::Llm(LlmError::AssessmentParseFailed {
            response: truncate_text(response, 200),
        })
    };

    let re = Regex::new(r"(?s)\{.*\}").map_err(|_| parse_failed())?;
    let json = re.find(response).ok_or_else(parse_failed)?.as_str();
    let raw: RawAssessment = serde_json::from_str(json).map_err(|_| parse_failed())?;

    let risk = RiskClassification::parse_lenient(&raw.risk_classification).ok_or_else(parse_failed)?;
    let consistency = ConsistencyRating::parse_lenient(&raw.consistency_rating).unwrap_or_else(|| {
        warn!("无法识别一致性评级 '{}'，按 Medium 处理", raw.consistency_rating);
        ConsistencyRating::Medium
    });

    Ok(QualitativeAssessment {
        risk,
        consistency,
        dimensions: raw.dimensions.filter(Dimensions::is_valid),
        weight_lb: raw.weight_lb.filter(|w| w.is_finite() && *w > 0.0),
        opportunity_score: raw
            .opportunity_score
            .filter(|s| s.is_finite())
            .map(|s| s.round().clamp(1.0, 100.0) as u8),
        insights: raw.insights,
        risk_factors: raw.risk_factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let response = r#"{
            "riskClassification": "Safe",
            "consistencyRating": "High",
            "dimensions": {"length": 10.0, "width": 4.0, "height": 2.0},
            "weightLb": 0.8,
            "opportunityScore": 72,
            "insights": ["需求稳定"],
            "riskFactors": []
        }"#;
        let assessment = parse_assessment_response(response).unwrap();
        assert_eq!(assessment.risk, RiskClassification::Safe);
        assert_eq!(assessment.consistency, ConsistencyRating::High);
        assert_eq!(assessment.weight_lb, Some(0.8));
        assert_eq!(assessment.opportunity_score, Some(72));
        assert!(assessment.dimensions.is_some());
    }

    #[test]
    fn test_parse_json_inside_markdown() {
        let response = "好的，评估如下：\n```json\n{\"risk\": \"fragile glass\", \"consistency\": \"seasonal\", \"opportunityScore\": 250}\n```";
        let assessment = parse_assessment_response(response).unwrap();
        assert_eq!(assessment.risk, RiskClassification::Breakable);
        assert_eq!(assessment.consistency, ConsistencyRating::Medium);
        assert_eq!(assessment.opportunity_score, Some(100));
        assert!(assessment.dimensions.is_none());
    }

    #[test]
    fn test_parse_unknown_consistency_defaults_medium() {
        let response = r#"{"riskClassification": "Electric", "consistencyRating": "???"}"#;
        let assessment = parse_assessment_response(response).unwrap();
        assert_eq!(assessment.risk, RiskClassification::Electric);
        assert_eq!(assessment.consistency, ConsistencyRating::Medium);
    }

    #[test]
    fn test_parse_rejects_missing_risk() {
        assert!(parse_assessment_response("我无法评估这个商品").is_err());
        assert!(parse_assessment_response(r#"{"consistencyRating": "High"}"#).is_err());
    }

    #[test]
    fn test_prompt_contains_product_and_keywords() {
        let candidate = Candidate {
            price: 19.99,
            ..Candidate::new("B0PROMPT01", "Silicone Baking Mat")
        };
        let sales = SalesPrediction {
            monthly_units: 500.0,
            monthly_revenue: 9_995.0,
            margin: 33.0,
            referral_fee: None,
            fba_fee: None,
        };
        let keywords = vec![KeywordRecord {
            keyword: "baking mat".to_string(),
            search_volume: 45_000,
            rank_position: Some(3),
            traffic_share: 0.2,
            cpc: Some(0.9),
        }];
        let prompt = build_assessment_prompt(&candidate, &sales, &keywords, None);
        assert!(prompt.contains("B0PROMPT01"));
        assert!(prompt.contains("baking mat"));
        assert!(prompt.contains("无评论数据"));
    }

    /// 测试真实 LLM 评估
    #[tokio::test]
    #[ignore]
    async fn test_assess_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = AssessmentService::new(&Config::from_env());
        let candidate = Candidate {
            price: 24.99,
            category_path: "Home & Kitchen > Kitchen Utensils".to_string(),
            ..Candidate::new("B0LIVE0001", "Silicone Spatula Set, 5 Pieces")
        };
        let sales = SalesPrediction {
            monthly_units: 800.0,
            monthly_revenue: 19_992.0,
            margin: 38.0,
            referral_fee: None,
            fba_fee: None,
        };

        let result = service.assess(&candidate, &sales, &[], None).await;
        match result {
            Ok(assessment) => println!("✅ 评估结果: {:?}", assessment),
            Err(e) => panic!("LLM 评估失败: {}", e),
        }
    }
}
