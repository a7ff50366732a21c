use anyhow::{Context, Result};
use clap::Parser;
use market_scout::utils::logging;
use market_scout::{App, Cli, Config};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("无法加载配置文件 {}", path.display()))?,
        None => Config::from_env(),
    };
    cli.apply(&mut config);

    // 初始化日志
    logging::init(config.verbose_logging);

    let input = cli.input(&config);

    // Ctrl-C：不再派发新的批次
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到 Ctrl-C，等待当前批次结束...");
            ctrl_c.cancel();
        }
    });

    // 初始化并运行应用
    let app = App::initialize(config).context("初始化失败")?;
    app.run(input, cancel).await
}
