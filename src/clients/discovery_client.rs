/// 商品发现 API 客户端
///
/// 封装所有与商品搜索爬虫 API 相关的调用逻辑
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::Candidate;
use crate::sources::DiscoverySource;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// 爬虫同步运行可能较慢
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(120);

/// 商品发现客户端
pub struct DiscoveryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DiscoveryClient {
    /// 创建新的发现客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DISCOVERY_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.discovery_api_base_url.trim_end_matches('/').to_string(),
            token: config.discovery_api_token.clone(),
        })
    }

    /// 同步运行爬虫并返回数据集
    async fn run_actor(&self, input: Value) -> AppResult<Value> {
        let endpoint = "run-sync-get-dataset-items";
        let url = format!("{}/{}", self.base_url, endpoint);

        debug!("调用发现 API: {} 参数: {}", url, input);

        let response = self
            .http
            .post(&url)
            .query(&[("token", self.token.as_str())])
            .json(&input)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Api(ApiError::RateLimited {
                endpoint: endpoint.to_string(),
                retry_after: retry_after_secs(response.headers()),
            }));
        }
        if !status.is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint: endpoint.to_string(),
                code: Some(u64::from(status.as_u16())),
                message: response.text().await.ok(),
            }));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DiscoverySource for DiscoveryClient {
    async fn search(&self, keyword: &str, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let input = json!({
            "search": keyword,
            "maxItems": limit,
        });
        let result = self.run_actor(input).await?;
        let mut candidates = parse_discovery_items(&result);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn lookup(&self, asins: &[String]) -> anyhow::Result<Vec<Candidate>> {
        let input = json!({
            "asins": asins,
            "maxItems": asins.len(),
        });
        let result = self.run_actor(input).await?;
        Ok(parse_discovery_items(&result))
    }
}

/// 解析爬虫返回的商品列表
///
/// 返回可能是数组，也可能是 `{ "items": [...] }`；无法识别的条目直接跳过。
pub fn parse_discovery_items(result: &Value) -> Vec<Candidate> {
    let items = result
        .as_array()
        .or_else(|| result.get("items").and_then(|v| v.as_array()));

    let Some(items) = items else {
        warn!("发现 API 返回格式无法识别");
        return Vec::new();
    };

    items.iter().filter_map(parse_item).collect()
}

fn parse_item(item: &Value) -> Option<Candidate> {
    let asin = item.get("asin").and_then(|v| v.as_str())?.trim().to_string();
    if asin.is_empty() {
        return None;
    }

    let title = item
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let category_path = match item.get("breadCrumbs").or_else(|| item.get("categories")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" > "),
        _ => String::new(),
    };

    let variations = item
        .get("variantAsins")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let review_snippets = item
        .get("reviews")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|r| {
                    r.as_str()
                        .map(str::to_string)
                        .or_else(|| r.get("text").and_then(|t| t.as_str()).map(str::to_string))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Candidate {
        asin,
        title,
        price: number(item.get("price")).unwrap_or(0.0),
        rating: number(item.get("stars").or_else(|| item.get("rating"))),
        review_count: number(item.get("reviewsCount").or_else(|| item.get("reviewCount")))
            .map(|n| n.max(0.0) as u32),
        sales_rank: sales_rank(item),
        category_path,
        thumbnail: item
            .get("thumbnailImage")
            .or_else(|| item.get("thumbnail"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        variations,
        review_snippets,
    })
}

/// 价格等数值字段可能是数字、字符串（"$19.99"）或 `{ "value": 19.99 }`
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect::<String>()
            .parse()
            .ok(),
        Value::Object(obj) => number(obj.get("value")),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// 取第一个大类排名
fn sales_rank(item: &Value) -> Option<u32> {
    if let Some(rank) = number(item.get("salesRank")) {
        return Some(rank as u32);
    }
    item.get("bestsellerRanks")
        .and_then(|v| v.as_array())
        .and_then(|ranks| ranks.first())
        .and_then(|r| number(r.get("rank")))
        .map(|r| r as u32)
}

fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
