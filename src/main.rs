use anyhow::Result;
use clap::Parser;
use env_data_downloader::config::Settings;
use env_data_downloader::orchestrator::{load_and_preview, App};
use env_data_downloader::utils::logging;
use std::path::PathBuf;

/// 从设备监测门户批量导出设备数据
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 只读取并预览任务表格，不启动浏览器
    #[arg(long)]
    preview: bool,

    /// 任务表格路径（默认取环境变量 JOB_SHEET，否则 job.toml）
    job_sheet: Option<PathBuf>,
}

impl Cli {
    /// 命令行参数覆盖环境变量
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.job_sheet {
            settings.job_sheet = path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut settings = Settings::from_env();
    cli.apply(&mut settings);

    // 初始化日志
    logging::init(settings.verbose_logging);

    if cli.preview {
        let job = load_and_preview(&settings).await?;
        job.validate()?;
        return Ok(());
    }

    // 初始化并运行应用
    let _summary = App::initialize(settings).await?.run().await?;

    Ok(())
}
