//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::error::{ConfigError, Result};
use crate::model::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 主配置结构，包含监控参数、日志参数和种子数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 监控参数
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 日志参数
    #[serde(default)]
    pub log: LogSection,
    /// 种子套餐列表
    #[serde(default)]
    pub plans: Vec<PlanSeed>,
    /// 种子端点列表
    #[serde(default)]
    pub endpoints: Vec<EndpointSeed>,
}

/// 监控参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// 调度周期（秒）
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// 探测等待上限（毫秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// 单周期最大并发探测数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_checks: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            probe_timeout_ms: default_probe_timeout(),
            max_concurrent_checks: default_max_concurrent(),
        }
    }
}

/// 日志参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSection {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否使用JSON格式输出
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// 种子套餐，按租户标签关联
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSeed {
    /// 租户标签
    pub tenant: String,
    /// 套餐名称
    pub name: String,
    /// 检测间隔（分钟）
    pub check_interval_min: i64,
    /// 回看窗口（小时，0表示不限）
    #[serde(default)]
    pub retention_hrs: i64,
    /// 端点配额
    #[serde(default = "default_max_endpoints")]
    pub max_endpoints: usize,
}

/// 种子端点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointSeed {
    /// 所属租户标签
    pub tenant: String,
    /// 端点名称
    pub name: String,
    /// 目标URL
    pub url: String,
    /// HTTP方法
    #[serde(default)]
    pub method: HttpMethod,
    /// 是否参与调度
    #[serde(default = "default_active")]
    pub active: bool,
}

// 默认值函数
fn default_tick_interval() -> u64 {
    60
}
fn default_probe_timeout() -> u64 {
    5000
}
fn default_max_concurrent() -> usize {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_endpoints() -> usize {
    10
}
fn default_active() -> bool {
    true
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<()>` - 验证结果
pub fn validate_config(config: &Config) -> Result<()> {
    if config.monitor.tick_interval_seconds == 0 {
        return Err(
            ConfigError::ValidationError("tick_interval_seconds 必须大于0".to_string()).into(),
        );
    }
    if config.monitor.probe_timeout_ms == 0 {
        return Err(ConfigError::ValidationError("probe_timeout_ms 必须大于0".to_string()).into());
    }
    if config.monitor.max_concurrent_checks == 0 {
        return Err(
            ConfigError::ValidationError("max_concurrent_checks 必须大于0".to_string()).into(),
        );
    }

    let mut tenants = HashSet::new();
    for plan in &config.plans {
        if !tenants.insert(plan.tenant.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "租户 {} 配置了多个套餐",
                plan.tenant
            ))
            .into());
        }
        if plan.check_interval_min < 1 {
            return Err(ConfigError::ValidationError(format!(
                "套餐 {} 的检测间隔必须不小于1分钟",
                plan.name
            ))
            .into());
        }
        if plan.retention_hrs < 0 {
            return Err(ConfigError::ValidationError(format!(
                "套餐 {} 的回看窗口不能为负",
                plan.name
            ))
            .into());
        }
        if plan.max_endpoints == 0 {
            return Err(ConfigError::ValidationError(format!(
                "套餐 {} 的端点配额必须大于0",
                plan.name
            ))
            .into());
        }
    }

    for endpoint in &config.endpoints {
        if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "端点 {} 的URL必须以http://或https://开头",
                endpoint.name
            ))
            .into());
        }
        if !tenants.contains(endpoint.tenant.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "端点 {} 引用了未配置套餐的租户 {}",
                endpoint.name, endpoint.tenant
            ))
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            monitor: MonitorConfig::default(),
            log: LogSection::default(),
            plans: vec![PlanSeed {
                tenant: "team-a".to_string(),
                name: "pro".to_string(),
                check_interval_min: 5,
                retention_hrs: 24,
                max_endpoints: 10,
            }],
            endpoints: vec![EndpointSeed {
                tenant: "team-a".to_string(),
                name: "home".to_string(),
                url: "https://example.com/".to_string(),
                method: HttpMethod::Get,
                active: true,
            }],
        }
    }

    #[test]
    fn test_defaults() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.tick_interval_seconds, 60);
        assert_eq!(monitor.probe_timeout_ms, 5000);
        assert_eq!(monitor.max_concurrent_checks, 50);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_rejects_zero_tick_interval() {
        let mut config = base_config();
        config.monitor.tick_interval_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_url_scheme() {
        let mut config = base_config();
        config.endpoints[0].url = "ftp://example.com/".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_tenant() {
        let mut config = base_config();
        config.endpoints[0].tenant = "nobody".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_duplicate_tenant_plan() {
        let mut config = base_config();
        let duplicate = config.plans[0].clone();
        config.plans.push(duplicate);
        assert!(validate_config(&config).is_err());
    }
}
