/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::config::Config;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`。
/// 重复调用时静默忽略（测试里可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 选品分析模式 (站点 {})", config.marketplace);
    info!(
        "📊 初筛保留: {} | 每批: {} | 超时: {}s | 重试: {}",
        config.max_candidates, config.batch_size, config.worker_timeout_secs, config.max_retries
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始候选编号
/// - `end`: 结束候选编号
/// - `total`: 候选总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始验证第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批候选: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 最终统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalStats {
    /// 发现阶段返回的候选数量
    pub discovered: usize,
    /// 进入验证的候选数量
    pub analyzed: usize,
    pub verified: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &FinalStats, report_path: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🔍 发现: {} | 验证: {}", stats.discovered, stats.analyzed);
    info!("✅ 成功: {}/{}", stats.verified, stats.analyzed);
    info!("❌ 失败: {}", stats.failed);
    info!("⏱️ 耗时: {:.1}s", stats.elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    if let Some(path) = report_path {
        info!("\n报告已保存至: {}", path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
