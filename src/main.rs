use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use doc_quiz::utils::logging;
use doc_quiz::{App, Command, Config};

/// PDF 摘要与测验生成
#[derive(Debug, Parser)]
#[command(name = "doc-quiz", version, about = "Summarize PDF documents and generate quizzes")]
struct Cli {
    /// TOML 配置文件（环境变量优先）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path).await?.with_env_overrides(),
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config)?.run(cli.command).await
}
