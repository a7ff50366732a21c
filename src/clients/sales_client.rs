/// 销量/关键词 API 客户端
///
/// 封装所有与选品数据供应商 API 相关的调用逻辑（销量预测、关键词反查）
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{KeywordRecord, SalesPrediction};
use crate::sources::{KeywordSource, SalesSource};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// 销量/关键词客户端
pub struct SalesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    marketplace: String,
}

impl SalesClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: config.sales_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.sales_api_key.clone(),
            marketplace: config.marketplace.clone(),
        })
    }

    /// 调用 GET 接口并返回 `data` 字段
    async fn get_data(&self, endpoint: &str, query: &[(&str, String)]) -> AppResult<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("调用数据 API: {} {:?}", url, query);

        let result: Value = self
            .http
            .get(&url)
            .header("secret-key", &self.api_key)
            .query(&[("marketplace", self.marketplace.as_str())])
            .query(query)
            .send()
            .await?
            .json()
            .await?;

        check_envelope(endpoint, &result)?;

        result
            .get("data")
            .filter(|d| !d.is_null())
            .cloned()
            .ok_or_else(|| {
                AppError::Api(ApiError::EmptyResponse {
                    endpoint: endpoint.to_string(),
                })
            })
    }
}

#[async_trait]
impl SalesSource for SalesClient {
    async fn predict_sales(&self, asin: &str) -> anyhow::Result<Option<SalesPrediction>> {
        let data = match self
            .get_data("v1/product/sales-prediction", &[("asin", asin.to_string())])
            .await
        {
            Ok(data) => data,
            Err(AppError::Api(ApiError::EmptyResponse { .. })) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_sales_prediction(&data))
    }
}

#[async_trait]
impl KeywordSource for SalesClient {
    async fn related_keywords(
        &self,
        asin: &str,
        page: u32,
        size: u32,
    ) -> anyhow::Result<Vec<KeywordRecord>> {
        let data = self
            .get_data(
                "v1/traffic/keyword",
                &[
                    ("asin", asin.to_string()),
                    ("page", page.to_string()),
                    ("size", size.to_string()),
                ],
            )
            .await?;
        Ok(parse_keyword_records(&data))
    }
}

/// 检查响应外层 `{ code, message, data }`
fn check_envelope(endpoint: &str, result: &Value) -> AppResult<()> {
    if is_rate_limited(result) {
        warn!("API 请求频率限制: {}", endpoint);
        return Err(AppError::Api(ApiError::RateLimited {
            endpoint: endpoint.to_string(),
            retry_after: None,
        }));
    }
    if is_success_response(result) {
        return Ok(());
    }
    Err(AppError::Api(ApiError::BadResponse {
        endpoint: endpoint.to_string(),
        code: result.get("code").and_then(|v| v.as_u64()),
        message: result
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }))
}

/// 检查 API 响应是否成功
fn is_success_response(result: &Value) -> bool {
    match result.get("code") {
        Some(Value::Number(n)) => n.as_u64() == Some(200),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("OK"),
        _ => false,
    }
}

/// 检查是否是频率限制错误
fn is_rate_limited(result: &Value) -> bool {
    let code_limited = match result.get("code") {
        Some(Value::Number(n)) => matches!(n.as_u64(), Some(429) | Some(600)),
        Some(Value::String(s)) => s.contains("RATE_LIMIT"),
        _ => false,
    };
    let message_limited = result
        .get("message")
        .and_then(|v| v.as_str())
        .map(|m| m.to_ascii_lowercase().contains("too frequent"))
        .unwrap_or(false);
    code_limited || message_limited
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSales {
    #[serde(default, alias = "units", alias = "monthlySales")]
    monthly_units: Option<f64>,
    #[serde(default, alias = "revenue", alias = "monthlyRevenue")]
    monthly_revenue: Option<f64>,
    #[serde(default, alias = "profitMargin", alias = "margin")]
    gross_margin: Option<f64>,
    #[serde(default)]
    referral_fee: Option<f64>,
    #[serde(default, alias = "fulfillmentFee")]
    fba_fee: Option<f64>,
}

/// 解析销量预测，没有销量和销售额时视为无数据
pub fn parse_sales_prediction(data: &Value) -> Option<SalesPrediction> {
    let raw: RawSales = serde_json::from_value(data.clone()).ok()?;
    let units = raw.monthly_units.filter(|u| u.is_finite() && *u >= 0.0);
    let revenue = raw.monthly_revenue.filter(|r| r.is_finite() && *r >= 0.0);
    if units.is_none() && revenue.is_none() {
        return None;
    }

    // 供应商有时返回 0-1 的比例；恰好为 1 时按 1% 处理
    let margin = raw
        .gross_margin
        .filter(|m| m.is_finite())
        .map(|m| if m.abs() < 1.0 { m * 100.0 } else { m })
        .unwrap_or(0.0);

    Some(SalesPrediction {
        monthly_units: units.unwrap_or(0.0),
        monthly_revenue: revenue.unwrap_or(0.0),
        margin,
        referral_fee: raw.referral_fee,
        fba_fee: raw.fba_fee,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKeyword {
    keyword: String,
    #[serde(default, alias = "searches")]
    search_volume: Option<f64>,
    #[serde(default, alias = "position")]
    rank_position: Option<u32>,
    #[serde(default, alias = "trafficPercentage")]
    traffic_share: Option<f64>,
    #[serde(default, alias = "bid")]
    cpc: Option<f64>,
}

/// 解析关键词反查结果，单条解析失败直接跳过
pub fn parse_keyword_records(data: &Value) -> Vec<KeywordRecord> {
    let items = data
        .as_array()
        .or_else(|| data.get("items").and_then(|v| v.as_array()));

    items
        .into_iter()
        .flatten()
        .filter_map(|item| serde_json::from_value::<RawKeyword>(item.clone()).ok())
        .map(|raw| KeywordRecord {
            keyword: raw.keyword,
            search_volume: raw
                .search_volume
                .filter(|v| v.is_finite() && *v > 0.0)
                .map(|v| v as u64)
                .unwrap_or(0),
            rank_position: raw.rank_position,
            traffic_share: raw
                .traffic_share
                .filter(|t| t.is_finite())
                .map(|t| if t > 1.0 { t / 100.0 } else { t })
                .unwrap_or(0.0),
            cpc: raw.cpc.filter(|c| c.is_finite() && *c >= 0.0),
        })
        .collect()
}
