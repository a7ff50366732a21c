use crate::error::{AppError, AppResult, FileError};
use crate::orchestrator::batch_processor::BatchSettings;
use crate::workflow::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 发现阶段最多返回的候选商品数量
    pub discovery_limit: usize,
    /// 初筛后保留的候选商品数量（K）
    pub max_candidates: usize,
    /// 每批同时验证的商品数量（B）
    pub batch_size: usize,
    /// 批次之间的暂停时间（毫秒）
    pub batch_pause_ms: u64,
    /// 单次验证尝试的超时时间（秒）
    pub worker_timeout_secs: u64,
    /// 验证失败后的额外重试次数
    pub max_retries: u32,
    /// 重试退避的基础延迟（毫秒）
    pub retry_base_delay_ms: u64,
    /// 超时后是否重试
    pub retry_on_timeout: bool,
    /// 关键词反查的页码与每页数量
    pub keyword_page: u32,
    pub keyword_page_size: u32,
    /// 站点
    pub marketplace: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 报告输出目录
    pub report_dir: String,
    // --- 商品发现 API 配置 ---
    pub discovery_api_base_url: String,
    pub discovery_api_token: String,
    // --- 销量/关键词 API 配置 ---
    pub sales_api_base_url: String,
    pub sales_api_key: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_limit: 20,
            max_candidates: 5,
            batch_size: 3,
            batch_pause_ms: 500,
            worker_timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            retry_on_timeout: false,
            keyword_page: 1,
            keyword_page_size: 20,
            marketplace: "US".to_string(),
            verbose_logging: false,
            report_dir: "reports".to_string(),
            discovery_api_base_url: "https://api.apify.com/v2/acts/junglee~amazon-crawler".to_string(),
            discovery_api_token: String::new(),
            sales_api_base_url: "https://api.sellersprite.com".to_string(),
            sales_api_key: String::new(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，环境变量优先级更高
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::File(FileError::ReadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            discovery_limit: env_parse("DISCOVERY_LIMIT").unwrap_or(self.discovery_limit),
            max_candidates: env_parse("MAX_CANDIDATES").unwrap_or(self.max_candidates),
            batch_size: env_parse("BATCH_SIZE").unwrap_or(self.batch_size),
            batch_pause_ms: env_parse("BATCH_PAUSE_MS").unwrap_or(self.batch_pause_ms),
            worker_timeout_secs: env_parse("WORKER_TIMEOUT_SECS").unwrap_or(self.worker_timeout_secs),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(self.max_retries),
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS").unwrap_or(self.retry_base_delay_ms),
            retry_on_timeout: env_parse("RETRY_ON_TIMEOUT").unwrap_or(self.retry_on_timeout),
            keyword_page: env_parse("KEYWORD_PAGE").unwrap_or(self.keyword_page),
            keyword_page_size: env_parse("KEYWORD_PAGE_SIZE").unwrap_or(self.keyword_page_size),
            marketplace: std::env::var("MARKETPLACE").unwrap_or(self.marketplace),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            report_dir: std::env::var("REPORT_DIR").unwrap_or(self.report_dir),
            discovery_api_base_url: std::env::var("DISCOVERY_API_BASE_URL").unwrap_or(self.discovery_api_base_url),
            discovery_api_token: std::env::var("DISCOVERY_API_TOKEN").unwrap_or(self.discovery_api_token),
            sales_api_base_url: std::env::var("SALES_API_BASE_URL").unwrap_or(self.sales_api_base_url),
            sales_api_key: std::env::var("SALES_API_KEY").unwrap_or(self.sales_api_key),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        }
    }

    /// 验证器使用的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            attempt_timeout: Duration::from_secs(self.worker_timeout_secs),
            retry_on_timeout: self.retry_on_timeout,
        }
    }

    /// 批次编排参数
    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            batch_size: self.batch_size.max(1),
            batch_pause: Duration::from_millis(self.batch_pause_ms),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_design() {
        let config = Config::default();
        assert_eq!(config.max_candidates, 5);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_pause_ms, 500);
        assert_eq!(config.worker_timeout_secs, 30);
        assert_eq!(config.max_retries, 2);
        assert!(!config.retry_on_timeout);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("batch_size = 4\nmarketplace = \"DE\"").unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.marketplace, "DE");
        assert_eq!(config.max_candidates, 5);
    }

    #[test]
    fn test_batch_size_never_zero() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert_eq!(config.batch_settings().batch_size, 1);
    }
}
