//! 浏览器的启动 / 连接，以及下载目录设置

pub mod connection;
pub mod headless;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParamsBuilder,
};
use chromiumoxide::Browser;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Settings;
use crate::infrastructure::ChromeSession;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;

/// 按配置打开浏览会话
///
/// 设置了调试端口时连接已有浏览器（结束时只关闭页面），否则启动新浏览器。
pub async fn open_session(settings: &Settings) -> Result<ChromeSession> {
    let staging = settings.staging_folder();
    tokio::fs::create_dir_all(&staging)
        .await
        .with_context(|| format!("无法创建下载暂存目录: {}", staging.display()))?;

    let (browser, page, owns_browser) = match settings.browser_debug_port {
        Some(port) => {
            let (browser, page) = connect_to_browser_and_page(port).await?;
            (browser, page, false)
        }
        None => {
            let (browser, page) = launch_browser(settings).await?;
            (browser, page, true)
        }
    };

    enable_downloads(&browser, &staging).await?;
    Ok(ChromeSession::new(browser, page, staging, owns_browser))
}

/// 允许下载，按传输 ID 命名写入暂存目录，并开启下载事件
pub async fn enable_downloads(browser: &Browser, staging: &Path) -> Result<()> {
    let params = SetDownloadBehaviorParamsBuilder::default()
        .behavior(SetDownloadBehaviorBehavior::AllowAndName)
        .download_path(staging.to_string_lossy().to_string())
        .events_enabled(true)
        .build()
        .map_err(|e| anyhow::anyhow!("构造下载设置失败: {}", e))?;

    browser
        .execute(params)
        .await
        .context("设置浏览器下载行为失败")?;

    debug!("下载暂存目录: {}", staging.display());
    info!("✓ 已开启下载捕获");
    Ok(())
}
