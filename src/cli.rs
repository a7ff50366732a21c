//! 命令行参数

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::orchestrator::PipelineInput;

#[derive(Parser, Debug)]
#[command(name = "market_scout")]
#[command(about = "搜索词/商品标识 → 富化 → 评级 → 市场报告")]
#[command(version)]
pub struct Cli {
    /// 搜索词
    #[arg(required_unless_present = "asins", conflicts_with = "asins")]
    pub keyword: Option<String>,

    /// 直接分析这些商品标识（逗号分隔）
    #[arg(long, value_delimiter = ',')]
    pub asins: Option<Vec<String>>,

    /// 初筛后保留的候选数量
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// TOML 配置文件
    #[arg(short, long, env = "MARKET_SCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖配置
    pub fn apply(&self, config: &mut Config) {
        if let Some(limit) = self.limit {
            config.max_candidates = limit.max(1);
        }
        if self.verbose {
            config.verbose_logging = true;
        }
    }

    /// 构建流水线输入
    pub fn input(&self, config: &Config) -> PipelineInput {
        match (&self.asins, &self.keyword) {
            (Some(asins), _) => PipelineInput::Asins(asins.clone()),
            (None, Some(keyword)) => PipelineInput::Keyword {
                term: keyword.clone(),
                limit: config.discovery_limit,
            },
            (None, None) => PipelineInput::Keyword {
                term: String::new(),
                limit: config.discovery_limit,
            },
        }
    }
}
