//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 读取任务表格并预览
//! - 打开浏览器会话（启动或连接）
//! - 监听 Ctrl-C 并转换为取消信号
//! - 输出全局统计信息
//!
//! ### `workflow_orchestrator` - 单次运行
//! - 登录 → 导出页 → 逐个设备号 → 保存下载
//! - 单个设备失败互不影响
//! - 报告进度与汇总
//!
//! ## 层次关系
//!
//! ```text
//! app (持有 ChromeSession)
//!     ↓
//! workflow_orchestrator (处理 Vec<设备号>)
//!     ↓
//! workflow (LoginStep / ExportNavigator / ItemQueryStep)
//!     ↓
//! services (能力层：选择器解析 / 输入框填写 / 下载收集)
//!     ↓
//! infrastructure (基础设施：BrowsingSession)
//! ```

pub mod app;
pub mod workflow_orchestrator;

pub use app::{load_and_preview, App};
pub use workflow_orchestrator::WorkflowOrchestrator;
