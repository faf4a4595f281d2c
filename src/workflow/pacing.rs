//! 等待与取消
//!
//! 门户没有可靠的"渲染完成"信号，流程里的每个等待都走这里，
//! 以便在任意宽限期内响应取消。

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::infrastructure::BrowsingSession;

/// 运行已被取消
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// 可取消的等待；开始前已取消时立即返回
pub async fn pause(cancel: &CancellationToken, duration: Duration) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}

/// 等待 `document.readyState == "complete"`（有上限，超时不算错误）
pub async fn settle<S: BrowsingSession>(
    session: &S,
    cancel: &CancellationToken,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), Cancelled> {
    let deadline = Instant::now() + timeout;
    loop {
        match session.is_ready().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => debug!("读取页面状态失败: {}", e),
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("页面在 {:?} 内未就绪，继续", timeout);
            return Ok(());
        }
        pause(cancel, poll_interval.min(deadline - now)).await?;
    }
}
