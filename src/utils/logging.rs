//! 日志工具模块
//!
//! 提供日志初始化、日志文件以及运行横幅的输出函数

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::RunSummary;

/// 初始化 tracing
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件（写入带时间戳的表头）
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n设备数据下载日志 - {}\n{}\n\n",
        "=".repeat(50),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(50)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(job_sheet: &Path, download_folder: &Path) {
    info!("{}", "=".repeat(50));
    info!("🚀 开始下载流程");
    info!("📄 任务表格: {}", job_sheet.display());
    info!("📁 下载目录: {}", download_folder.display());
    info!("{}", "=".repeat(50));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(50));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(50));
    info!("✅ 成功: {}/{}", summary.succeeded, summary.total);
    info!("❌ 失败: {}", summary.failed());
    info!("💾 已保存文件: {}", summary.saved_downloads());
    info!("{}", "=".repeat(50));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 对密码做掩码显示
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "None".to_string()
    } else {
        "*".repeat(secret.chars().count())
    }
}
