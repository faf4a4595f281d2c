use thiserror::Error;

/// 运行级错误
///
/// 只有这些错误会中止整次运行；单个设备的失败记录在
/// [`ItemOutcome`](crate::models::ItemOutcome) 里，不会冒泡到这里。
#[derive(Debug, Error)]
pub enum RunError {
    /// 任务配置缺少必填项，运行不会开始
    #[error("配置无效: {0}")]
    ConfigInvalid(String),

    /// 登录失败，后续步骤全部无法进行
    #[error("登录失败: {0}")]
    LoginFailed(String),

    /// 浏览器会话不可用（无法订阅下载事件等）
    #[error("浏览器会话错误: {0}")]
    Session(String),
}

impl RunError {
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        RunError::ConfigInvalid(reason.into())
    }

    pub fn login_failed(reason: impl Into<String>) -> Self {
        RunError::LoginFailed(reason.into())
    }

    /// 是否是配置问题（运行尚未开始）
    pub fn is_config(&self) -> bool {
        matches!(self, RunError::ConfigInvalid(_))
    }
}

/// 单个下载的保存错误，只记录，不中止收尾
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// 浏览器取消了传输
    #[error("下载被取消: {filename}")]
    Cancelled { filename: String },

    /// 写入目标目录失败
    #[error("保存 {filename} 失败: {reason}")]
    Failed { filename: String, reason: String },
}

/// 应用程序结果类型
pub type RunResult<T> = Result<T, RunError>;
