//! 登录 - 流程层
//!
//! 打开门户 → 等待渲染 → 用户名 + Tab → 密码 + Enter → 等待跳转。
//! 任意一步失败都会中止整次运行。

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Timings;
use crate::error::{RunError, RunResult};
use crate::infrastructure::{BrowsingSession, Key};
use crate::models::JobConfig;
use crate::services::{FieldFiller, FillOutcome, ProgressSink};
use crate::workflow::pacing::{pause, settle};
use crate::workflow::selectors;

/// 登录结果（失败走 `Err(RunError::LoginFailed)`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// 登录途中运行被取消
    Cancelled,
}

pub struct LoginStep {
    filler: FieldFiller,
    poll_interval: Duration,
    settle_timeout: Duration,
    portal_grace: Duration,
    login_grace: Duration,
}

impl LoginStep {
    pub fn new(timings: &Timings) -> Self {
        Self {
            filler: FieldFiller::new(timings),
            poll_interval: Timings::ms(timings.poll_interval_ms),
            settle_timeout: Timings::ms(timings.settle_timeout_ms),
            portal_grace: Timings::ms(timings.portal_grace_ms),
            login_grace: Timings::ms(timings.login_grace_ms),
        }
    }

    pub async fn login<S: BrowsingSession>(
        &self,
        session: &S,
        config: &JobConfig,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RunResult<LoginOutcome> {
        sink.log_message(&format!("🌐 正在打开门户: {}", config.portal_url));
        if let Err(e) = session.navigate(&config.portal_url).await {
            error!("打开门户失败: {:#}", e);
            return Err(RunError::login_failed(format!("无法打开门户: {}", e)));
        }

        if settle(session, cancel, self.settle_timeout, self.poll_interval)
            .await
            .is_err()
            || pause(cancel, self.portal_grace).await.is_err()
        {
            return Ok(LoginOutcome::Cancelled);
        }

        sink.log_message("🔐 正在登录...");

        let username = self
            .filler
            .fill_unverified(session, &selectors::username_field(), &config.username, Key::Tab)
            .await;
        if let FillOutcome::NotFilled = username {
            sink.log_message("❌ 找不到用户名输入框");
            return Err(RunError::login_failed("无法填写用户名"));
        }
        sink.log_message(&format!("✓ 已填写用户名: {}", config.username));

        if cancel.is_cancelled() {
            return Ok(LoginOutcome::Cancelled);
        }

        let password = self
            .filler
            .fill_unverified(session, &selectors::password_field(), &config.password, Key::Enter)
            .await;
        if let FillOutcome::NotFilled = password {
            sink.log_message("❌ 找不到密码输入框");
            return Err(RunError::login_failed("无法填写密码"));
        }
        sink.log_message("✓ 已填写密码");

        if pause(cancel, self.login_grace).await.is_err() {
            return Ok(LoginOutcome::Cancelled);
        }

        info!("✅ 登录完成");
        sink.log_message("✅ 登录成功");
        Ok(LoginOutcome::LoggedIn)
    }
}
