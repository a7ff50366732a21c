//! 应用入口 - 负责组装客户端和服务、运行一次分析、输出统计

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::{DiscoveryClient, SalesClient};
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::models::VerifiedProduct;
use crate::orchestrator::{
    BatchOrchestrator, MarketPipeline, PipelineInput, PipelineOutcome,
};
use crate::progress::{ProgressEmitter, ProgressEvent};
use crate::services::{AssessmentService, ReportWriter};
use crate::utils::logging::{log_startup, print_final_stats, truncate_text, FinalStats};
use crate::workflow::VerificationFlow;

/// 应用主结构
pub struct App {
    pipeline: MarketPipeline,
    report_writer: Arc<ReportWriter>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);
        check_credentials(&config)?;

        let discovery = Arc::new(DiscoveryClient::new(&config)?);
        let sales = Arc::new(SalesClient::new(&config)?);
        let assessment = Arc::new(AssessmentService::new(&config));

        let flow = VerificationFlow::new(
            sales.clone(),
            sales,
            assessment,
            config.retry_policy(),
        )
        .with_keyword_paging(config.keyword_page, config.keyword_page_size);

        let orchestrator = BatchOrchestrator::new(Arc::new(flow), config.batch_settings());
        let report_writer = Arc::new(ReportWriter::with_dir(&config.report_dir));
        let pipeline = MarketPipeline::new(discovery, orchestrator, config.max_candidates)
            .with_sink(report_writer.clone());

        Ok(Self {
            pipeline,
            report_writer,
        })
    }

    /// 运行一次分析
    pub async fn run(&self, input: PipelineInput, cancel: CancellationToken) -> Result<()> {
        let (emitter, rx) = ProgressEmitter::channel(cancel.clone());
        let consumer = tokio::spawn(render_progress(rx));

        let result = self.pipeline.run(input, &emitter, &cancel).await;

        // 关闭发送端，等待进度输出结束
        drop(emitter);
        let _ = consumer.await;

        match result? {
            PipelineOutcome::Completed {
                report,
                products,
                stats,
            } => {
                log_products(&products);
                let report_path = self.report_writer.report_path(&report);
                print_final_stats(
                    &FinalStats {
                        discovered: stats.discovered,
                        analyzed: stats.analyzed,
                        verified: stats.verified,
                        failed: stats.failed,
                        elapsed: stats.elapsed,
                    },
                    Some(&report_path.display().to_string()),
                );
            }
            PipelineOutcome::NoResults { query } => {
                warn!("⚠️ \"{}\" 没有找到候选商品，试试更具体的搜索词", query);
            }
            PipelineOutcome::Cancelled { stats } => {
                print_final_stats(
                    &FinalStats {
                        discovered: stats.discovered,
                        analyzed: stats.analyzed,
                        verified: stats.verified,
                        failed: stats.failed,
                        elapsed: stats.elapsed,
                    },
                    None,
                );
            }
        }

        Ok(())
    }
}

/// 发现和销量数据都是必需的；LLM 缺失时评估使用默认值
fn check_credentials(config: &Config) -> AppResult<()> {
    for (name, value) in [
        ("DISCOVERY_API_TOKEN", &config.discovery_api_token),
        ("SALES_API_KEY", &config.sales_api_key),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Config(ConfigError::Missing {
                name: name.to_string(),
            }));
        }
    }
    if config.llm_api_key.trim().is_empty() {
        warn!("⚠️ 未配置 LLM_API_KEY，定性评估将使用默认风险/一致性");
    }
    Ok(())
}

/// 把进度事件输出为日志
async fn render_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        info!("[{} {:>3}%] {}", event.phase, event.progress, event.message);
    }
}

fn log_products(products: &[VerifiedProduct]) {
    info!("\n{}", "=".repeat(60));
    info!("🏆 商品排名");
    info!("{}", "=".repeat(60));
    for (idx, product) in products.iter().enumerate() {
        info!(
            "{:>2}. [{:>3}] {} ${:.2} | 月利润 ${:.0} | {}",
            idx + 1,
            product.grade,
            product.asin(),
            product.candidate.price,
            product.metrics.monthly_profit,
            truncate_text(&product.candidate.title, 40)
        );
    }
}
