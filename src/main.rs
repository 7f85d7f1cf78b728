use anyhow::{Context, Result};
use item_forge::utils::logging;
use item_forge::{App, Config};
use std::path::PathBuf;

/// 用法: item_forge [requests.toml] [config.toml]
#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let requests_path = PathBuf::from(args.next().unwrap_or_else(|| "requests.toml".to_string()));
    let config_path = args.next().map(PathBuf::from);

    // 加载配置
    let config = Config::load(config_path.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let _stats = App::initialize(config).await?.run(&requests_path).await?;

    Ok(())
}
