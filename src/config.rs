use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Settings {
    /// 已有浏览器的调试端口；设置后直接连接，不再启动新浏览器
    pub browser_debug_port: Option<u16>,
    /// 是否以无头模式启动浏览器
    pub headless: bool,
    /// 浏览器可执行文件路径（为空时自动探测）
    pub chrome_executable: Option<PathBuf>,
    /// 下载文件保存目录
    pub download_folder: PathBuf,
    /// 任务表格（TOML 单元格导出）路径
    pub job_sheet: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行日志文件
    pub output_log_file: String,
    /// 各步骤的等待预算
    pub timings: Timings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser_debug_port: None,
            headless: false,
            chrome_executable: None,
            download_folder: default_download_folder(),
            job_sheet: PathBuf::from("job.toml"),
            verbose_logging: false,
            output_log_file: "download_log.txt".to_string(),
            timings: Timings::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from),
            download_folder: std::env::var("DOWNLOAD_FOLDER").map(PathBuf::from).unwrap_or(default.download_folder),
            job_sheet: std::env::var("JOB_SHEET").map(PathBuf::from).unwrap_or(default.job_sheet),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            timings: Timings::from_env(),
        }
    }

    /// 浏览器先把下载写入这里，收尾时再按建议文件名移到下载目录
    pub fn staging_folder(&self) -> PathBuf {
        self.download_folder.join(".env-data-staging")
    }
}

/// 系统默认下载目录
pub fn default_download_folder() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

/// 等待预算（毫秒）
///
/// 门户是客户端渲染的单页应用，没有可靠的"就绪"信号，
/// 这里的宽限时间决定了每一步最坏情况下的等待时长。
#[derive(Clone, Debug)]
pub struct Timings {
    /// 每个候选选择器的轮询上限（普通按钮）
    pub candidate_timeout_ms: u64,
    /// 每个候选选择器的轮询上限（输入框）
    pub field_candidate_timeout_ms: u64,
    /// 每个候选选择器的轮询上限（导出按钮）
    pub export_candidate_timeout_ms: u64,
    /// 选择器轮询间隔
    pub poll_interval_ms: u64,
    /// 等待 document.readyState 的上限
    pub settle_timeout_ms: u64,
    /// 打开门户后的宽限
    pub portal_grace_ms: u64,
    /// 提交登录后的宽限
    pub login_grace_ms: u64,
    /// 打开导出页后的宽限
    pub export_page_grace_ms: u64,
    /// 每个设备开始前的宽限
    pub item_settle_grace_ms: u64,
    /// 选择模式、填写日期后的宽限
    pub after_field_ms: u64,
    /// 填写设备号后的宽限
    pub after_serial_ms: u64,
    /// 点击查询后等待结果渲染
    pub results_grace_ms: u64,
    /// 点击导出后等待下载开始
    pub download_start_grace_ms: u64,
    /// 两个设备之间的间隔
    pub inter_item_ms: u64,
    /// 收尾时等待进行中的下载
    pub download_drain_ms: u64,
    /// 关闭会话前的宽限
    pub final_grace_ms: u64,
    /// 点击聚焦后的停顿
    pub focus_ms: u64,
    /// 清空输入框后的停顿
    pub clear_ms: u64,
    /// 逐字输入的字符间隔
    pub keystroke_ms: u64,
    /// 输入完成到按确认键之间的停顿
    pub before_confirm_ms: u64,
    /// 按确认键后到回读之间的停顿
    pub after_confirm_ms: u64,
    /// 直接注入值后的停顿
    pub inject_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            candidate_timeout_ms: 3000,
            field_candidate_timeout_ms: 2000,
            export_candidate_timeout_ms: 5000,
            poll_interval_ms: 250,
            settle_timeout_ms: 10_000,
            portal_grace_ms: 3000,
            login_grace_ms: 5000,
            export_page_grace_ms: 3000,
            item_settle_grace_ms: 2000,
            after_field_ms: 500,
            after_serial_ms: 1000,
            results_grace_ms: 5000,
            download_start_grace_ms: 3000,
            inter_item_ms: 2000,
            download_drain_ms: 5000,
            final_grace_ms: 2000,
            focus_ms: 300,
            clear_ms: 200,
            keystroke_ms: 50,
            before_confirm_ms: 300,
            after_confirm_ms: 500,
            inject_settle_ms: 300,
        }
    }
}

impl Timings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            candidate_timeout_ms: env_ms("CANDIDATE_TIMEOUT_MS", d.candidate_timeout_ms),
            field_candidate_timeout_ms: env_ms("FIELD_CANDIDATE_TIMEOUT_MS", d.field_candidate_timeout_ms),
            export_candidate_timeout_ms: env_ms("EXPORT_CANDIDATE_TIMEOUT_MS", d.export_candidate_timeout_ms),
            poll_interval_ms: env_ms("POLL_INTERVAL_MS", d.poll_interval_ms),
            settle_timeout_ms: env_ms("SETTLE_TIMEOUT_MS", d.settle_timeout_ms),
            portal_grace_ms: env_ms("PORTAL_GRACE_MS", d.portal_grace_ms),
            login_grace_ms: env_ms("LOGIN_GRACE_MS", d.login_grace_ms),
            export_page_grace_ms: env_ms("EXPORT_PAGE_GRACE_MS", d.export_page_grace_ms),
            item_settle_grace_ms: env_ms("ITEM_SETTLE_GRACE_MS", d.item_settle_grace_ms),
            after_field_ms: env_ms("AFTER_FIELD_MS", d.after_field_ms),
            after_serial_ms: env_ms("AFTER_SERIAL_MS", d.after_serial_ms),
            results_grace_ms: env_ms("RESULTS_GRACE_MS", d.results_grace_ms),
            download_start_grace_ms: env_ms("DOWNLOAD_START_GRACE_MS", d.download_start_grace_ms),
            inter_item_ms: env_ms("INTER_ITEM_MS", d.inter_item_ms),
            download_drain_ms: env_ms("DOWNLOAD_DRAIN_MS", d.download_drain_ms),
            final_grace_ms: env_ms("FINAL_GRACE_MS", d.final_grace_ms),
            focus_ms: env_ms("FOCUS_MS", d.focus_ms),
            clear_ms: env_ms("CLEAR_MS", d.clear_ms),
            keystroke_ms: env_ms("KEYSTROKE_MS", d.keystroke_ms),
            before_confirm_ms: env_ms("BEFORE_CONFIRM_MS", d.before_confirm_ms),
            after_confirm_ms: env_ms("AFTER_CONFIRM_MS", d.after_confirm_ms),
            inject_settle_ms: env_ms("INJECT_SETTLE_MS", d.inject_settle_ms),
        }
    }

    pub fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

fn env_ms(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
