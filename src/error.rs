//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;
use uuid::Uuid;

/// Upwatch 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum UpwatchError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 结果存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 状态查询相关错误
    #[error("状态查询错误: {0}")]
    Status(#[from] StatusError),

    /// HTTP客户端构建错误
    #[error("HTTP客户端构建失败: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },
}

/// 结果存储错误类型
///
/// 追加失败是调度器唯一需要关心的运维显著错误，
/// 意味着该端点当前周期的监控数据丢失
#[derive(Error, Debug)]
pub enum StoreError {
    /// 端点不存在
    #[error("端点不存在: {endpoint_id}")]
    EndpointNotFound { endpoint_id: Uuid },

    /// 端点配额已满
    #[error("租户 {tenant_id} 已达到套餐端点配额上限 {quota}")]
    QuotaExceeded { tenant_id: Uuid, quota: usize },

    /// 租户没有有效套餐，无法注册端点
    #[error("租户 {tenant_id} 没有有效套餐")]
    MissingPlan { tenant_id: Uuid },

    /// 写入失败
    #[error("检测记录写入失败: {0}")]
    WriteFailed(String),
}

/// 状态查询错误类型
#[derive(Error, Debug)]
pub enum StatusError {
    /// 端点不存在
    #[error("端点不存在: {endpoint_id}")]
    EndpointNotFound { endpoint_id: Uuid },

    /// 租户无可解析的套餐
    #[error("端点 {endpoint_id} 的租户没有有效套餐")]
    MissingPlan { endpoint_id: Uuid },

    /// 底层存储读取失败
    #[error("存储读取失败: {0}")]
    Store(#[from] StoreError),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, UpwatchError>;
