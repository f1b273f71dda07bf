use anyhow::Result;
use donation_analyzer::utils::logging;
use donation_analyzer::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let mut config = Config::from_env()?;

    // 第一个参数可以覆盖评论文件
    if let Some(path) = std::env::args().nth(1) {
        config.comments_file = path;
    }

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
