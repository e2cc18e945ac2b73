//! Upwatch - HTTP端点可用性监控核心
//!
//! 这是一个用Rust编写的端点可用性监控核心，覆盖：
//! - 按套餐节奏的检测调度
//! - 有界等待的HTTP可达性探测
//! - 只追加的检测结果存储
//! - 当前状态与窗口内可用率推导

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod probe;
pub mod schedule;
pub mod status;
pub mod store;

// 重新导出主要类型
pub use config::{Config, ConfigLoader, TomlConfigLoader};
pub use error::{Result, UpwatchError};
pub use model::{CheckOutcome, CheckResult, Endpoint, HttpMethod, Plan};
pub use probe::{CheckExecutor, HttpCheckExecutor};
pub use schedule::{TickScheduler, TickSummary};
pub use status::{EndpointStatus, StatusEngine, UptimeReport, UptimeState};
pub use store::{EndpointDirectory, MemoryStore, ResultStore};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
