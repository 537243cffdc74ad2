use anyhow::Result;
use clap::Parser;
use workday_apply::cli::Args;
use workday_apply::{logger, App};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbose = args.verbose;

    // 加载配置
    let config = args.into_config()?;

    // 初始化日志
    logger::init(verbose || config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    let result = app.run().await;
    app.shutdown().await;
    result?;

    Ok(())
}
