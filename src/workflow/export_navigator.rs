//! 导出页导航 - 流程层

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::Timings;
use crate::error::{RunError, RunResult};
use crate::infrastructure::BrowsingSession;
use crate::services::ProgressSink;
use crate::workflow::pacing::{pause, Cancelled};

/// 导出页相对门户根地址的路径
pub const EXPORT_PATH: &str = "/syntheticSystem/dataAnalysis/export";

/// 已知的生产门户（主机:端口 → 导出页）
static KNOWN_EXPORT_PAGES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "env.nem.com.hk:10027" => "https://env.nem.com.hk:10027/syntheticSystem/dataAnalysis/export",
};

/// 由登录地址推出导出页地址
///
/// 已知主机直接映射（忽略路径和查询串），其他主机保留协议、主机、端口，
/// 换成固定的导出路径。
pub fn export_url(portal_url: &str) -> RunResult<String> {
    let trimmed = portal_url.trim();

    let parsed = Url::parse(trimmed).ok().and_then(|url| {
        let host = url.host_str()?.to_string();
        Some((url, host))
    });

    let Some((url, host)) = parsed else {
        // 解析失败时仍按子串识别已知主机
        return KNOWN_EXPORT_PAGES
            .entries()
            .find(|(authority, _)| trimmed.contains(*authority))
            .map(|(_, export)| export.to_string())
            .ok_or_else(|| RunError::config_invalid(format!("无法解析门户地址: {}", portal_url)));
    };

    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    };

    if let Some(export) = KNOWN_EXPORT_PAGES.get(authority.as_str()) {
        return Ok(export.to_string());
    }

    Ok(format!("{}://{}{}", url.scheme(), authority, EXPORT_PATH))
}

pub struct ExportNavigator {
    grace: Duration,
}

impl ExportNavigator {
    pub fn new(timings: &Timings) -> Self {
        Self {
            grace: Timings::ms(timings.export_page_grace_ms),
        }
    }

    /// 打开导出页
    ///
    /// 导航失败只记录日志：后续每个设备会在各自的步骤里失败。
    pub async fn navigate<S: BrowsingSession>(
        &self,
        session: &S,
        export_url: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        sink.log_message(&format!("📊 正在打开导出页: {}", export_url));
        match session.navigate(export_url).await {
            Ok(()) => debug!("已打开导出页"),
            Err(e) => {
                warn!("打开导出页失败: {:#}", e);
                sink.log_message(&format!("⚠️ 打开导出页失败: {}", e));
            }
        }
        pause(cancel, self.grace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_session::FakeSession;
    use crate::services::progress_sink::RecordingSink;
    use tokio_test::assert_ok;

    #[test]
    fn test_known_host_ignores_path_and_query() {
        assert_eq!(
            export_url("https://env.nem.com.hk:10027/login?redirect=/home").unwrap(),
            "https://env.nem.com.hk:10027/syntheticSystem/dataAnalysis/export"
        );
        assert_eq!(
            export_url("http://env.nem.com.hk:10027/").unwrap(),
            "https://env.nem.com.hk:10027/syntheticSystem/dataAnalysis/export"
        );
    }

    #[test]
    fn test_other_host_keeps_scheme_and_port() {
        assert_eq!(
            export_url("http://10.0.0.5:8080/#/login").unwrap(),
            "http://10.0.0.5:8080/syntheticSystem/dataAnalysis/export"
        );
        assert_eq!(
            export_url("https://portal.example.org/login").unwrap(),
            "https://portal.example.org/syntheticSystem/dataAnalysis/export"
        );
    }

    #[test]
    fn test_known_host_without_scheme() {
        assert_eq!(
            export_url("env.nem.com.hk:10027/login").unwrap(),
            "https://env.nem.com.hk:10027/syntheticSystem/dataAnalysis/export"
        );
    }

    #[test]
    fn test_unparseable_url_is_config_error() {
        let err = export_url("not a url").unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_is_not_fatal() {
        let session = FakeSession::new().failing_navigation();
        let sink = RecordingSink::default();

        assert_ok!(
            ExportNavigator::new(&Timings::default())
                .navigate(&session, "https://portal.test/export", &sink, &CancellationToken::new())
                .await
        );
        assert!(sink.logged("打开导出页失败"));
    }
}
