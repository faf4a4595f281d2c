//! # Env Data Downloader
//!
//! 从设备监测门户批量导出设备数据的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `BrowsingSession` - 导航、查找、点击、输入、下载事件
//! - `ChromeSession` - 基于 DevTools 协议的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不认识门户流程
//! - `SelectorResolver` - 按优先级尝试候选定位器
//! - `FieldFiller` - 逐字输入 + 回读校验 + 注入兜底
//! - `DownloadCollector` - 登记并保存下载
//! - `ProgressSink` - 日志 / 进度 / 状态输出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义门户上的每一步
//! - `LoginStep` - 登录
//! - `ExportNavigator` - 导出页地址推导与导航
//! - `ItemQueryStep` - 单个设备号的查询 / 导出状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/workflow_orchestrator` - 整次运行，失败隔离与取消
//! - `orchestrator/app` - 应用生命周期，持有浏览器会话
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::open_session;
pub use config::{Settings, Timings};
pub use error::{PersistError, RunError, RunResult};
pub use infrastructure::{BrowsingSession, ChromeSession};
pub use models::{ItemOutcome, ItemResult, JobConfig, RunSummary};
pub use orchestrator::{App, WorkflowOrchestrator};
pub use services::{ChannelSink, ProgressEvent, ProgressSink};
pub use workflow::export_url;
