//! 监控领域数据结构
//!
//! 定义端点、套餐、检测结果等核心类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// HTTP请求方法枚举
///
/// 在配置解析阶段完成方法校验，探测阶段不会再出现非法方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET请求（默认）
    #[default]
    Get,
    /// POST请求
    Post,
    /// PUT请求
    Put,
    /// DELETE请求
    Delete,
    /// HEAD请求
    Head,
}

impl HttpMethod {
    /// 转换为reqwest的方法类型
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        };
        write!(f, "{s}")
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(format!("不支持的HTTP方法: {other}")),
        }
    }
}

/// 被监控的端点
///
/// 由租户侧CRUD维护，`last_checked_at`仅由调度器在每次检测后推进，
/// 且保证单调不回退
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// 端点ID
    pub id: Uuid,
    /// 所属租户ID
    pub tenant_id: Uuid,
    /// 端点名称
    pub name: String,
    /// 目标URL
    pub url: String,
    /// HTTP方法
    #[serde(default)]
    pub method: HttpMethod,
    /// 是否参与调度
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// 最后一次检测的开始时间
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Endpoint {
    /// 创建新端点
    ///
    /// # 参数
    /// * `tenant_id` - 所属租户ID
    /// * `name` - 端点名称
    /// * `url` - 目标URL
    /// * `method` - HTTP方法
    ///
    /// # 返回
    /// * `Self` - 端点实例，初始为激活状态且从未检测
    pub fn new(tenant_id: Uuid, name: String, url: String, method: HttpMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name,
            url,
            method,
            is_active: true,
            last_checked_at: None,
        }
    }
}

/// 租户套餐，作为只读参考数据
///
/// 套餐变更在下一个调度周期生效，不追溯已存储的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// 套餐ID
    pub id: Uuid,
    /// 套餐名称
    pub name: String,
    /// 检测间隔（分钟）
    pub check_interval_min: i64,
    /// 可用性统计的回看窗口（小时，0表示不限）
    pub retention_hrs: i64,
    /// 端点配额
    pub max_endpoints: usize,
}

impl Plan {
    /// 判断回看窗口是否不限
    pub fn is_unbounded_retention(&self) -> bool {
        self.retention_hrs == 0
    }
}

/// 单次探测的归一化结果
///
/// 探测器的输出，不包含任何存储信息；`status_code`为0表示
/// 未收到响应（超时、连接失败、DNS失败等传输层错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// HTTP状态码，0表示无响应
    pub status_code: u16,
    /// 响应耗时（毫秒），失败时为失败前已消耗的时间
    pub response_ms: u64,
    /// 是否可用
    pub is_up: bool,
}

impl CheckOutcome {
    /// 由收到的状态码构造结果
    ///
    /// 2xx和3xx视为可用，其余状态码视为不可用
    pub fn from_response(status_code: u16, response_ms: u64) -> Self {
        Self {
            status_code,
            response_ms,
            is_up: (200..400).contains(&status_code),
        }
    }

    /// 构造传输层失败结果
    pub fn transport_failure(response_ms: u64) -> Self {
        Self {
            status_code: 0,
            response_ms,
            is_up: false,
        }
    }
}

/// 一条不可变的检测记录
///
/// 仅追加，核心不做更新和删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// 记录ID
    pub id: Uuid,
    /// 端点ID
    pub endpoint_id: Uuid,
    /// 检测开始时间
    pub checked_at: DateTime<Utc>,
    /// HTTP状态码，0表示无响应
    pub status_code: u16,
    /// 响应耗时（毫秒）
    pub response_ms: u64,
    /// 是否可用
    pub is_up: bool,
}

impl CheckResult {
    /// 由探测结果构造检测记录
    ///
    /// # 参数
    /// * `endpoint_id` - 端点ID
    /// * `outcome` - 探测结果
    /// * `checked_at` - 检测开始时间
    ///
    /// # 返回
    /// * `Self` - 检测记录实例
    pub fn from_outcome(endpoint_id: Uuid, outcome: CheckOutcome, checked_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint_id,
            checked_at,
            status_code: outcome.status_code,
            response_ms: outcome.response_ms,
            is_up: outcome.is_up,
        }
    }
}
