//! 日志系统模块
//!
//! 提供结构化日志配置和初始化功能

use crate::error::Result;
use anyhow::anyhow;
use log::LevelFilter;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// 全局日志初始化标记，重复初始化直接成功返回
static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            console: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 由配置文件中的级别字符串构造
    ///
    /// # 参数
    /// * `level` - 级别字符串（trace/debug/info/warn/error）
    /// * `json_format` - 是否使用JSON格式
    pub fn from_section(level: &str, json_format: bool) -> Self {
        let level = match level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        };
        Self {
            level,
            console: true,
            json_format,
        }
    }
}

/// 日志系统
pub struct LoggingSystem;

impl LoggingSystem {
    /// 初始化全局日志订阅器
    ///
    /// `RUST_LOG`环境变量优先于配置中的级别；重复调用是安全的。
    /// log门面到tracing的桥接由`try_init`一并安装，这里不能再
    /// 单独调用`LogTracer::init`，否则全局logger会被设置两次。
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<()>` - 初始化结果
    pub fn setup_logging(config: LogConfig) -> Result<()> {
        if LOGGING_INITIALIZED.get().is_some() {
            return Ok(());
        }

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_directive(config.level)));

        let registry = registry().with(env_filter);
        if config.json_format {
            registry
                .with(fmt::layer().json().with_target(true))
                .try_init()
                .map_err(|e| anyhow!("初始化日志订阅器失败: {e}"))?;
        } else {
            registry
                .with(fmt::layer().with_target(true))
                .try_init()
                .map_err(|e| anyhow!("初始化日志订阅器失败: {e}"))?;
        }

        let _ = LOGGING_INITIALIZED.set(());
        Ok(())
    }
}

/// 级别到EnvFilter指令的转换
fn level_directive(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
