//! 状态引擎模块
//!
//! 基于结果存储的两类只读推导：当前状态（最新一条记录）和
//! 窗口内可用率（留存窗口上的聚合）。两者都是输入确定的纯
//! 推导，不持有隐藏状态。

use crate::error::StatusError;
use crate::model::CheckResult;
use crate::store::{EndpointDirectory, ResultStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// 端点的点时状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UptimeState {
    /// 最近一次检测可用
    Up,
    /// 最近一次检测不可用
    Down,
    /// 尚无任何检测历史
    Unknown,
}

/// 当前状态查询结果
///
/// 无历史时状态为Unknown，其余字段全部为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStatus {
    /// 当前状态
    pub status: UptimeState,
    /// 最后检测时间
    pub last_checked_at: Option<DateTime<Utc>>,
    /// 响应耗时（毫秒）
    pub response_ms: Option<u64>,
    /// HTTP状态码
    pub status_code: Option<u16>,
}

/// 窗口内可用率统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeReport {
    /// 可用率百分比，窗口内无记录时为None
    pub uptime_percent: Option<f64>,
    /// 窗口内总检测次数
    pub total_checks: usize,
    /// 窗口内可用次数
    pub up_checks: usize,
    /// 实际采用的回看窗口（小时，0表示不限）
    pub window_hrs: i64,
}

/// 对一组检测记录计算可用率
///
/// 纯函数：同样的输入必然得到同样的输出。聚合与记录顺序无关。
///
/// # 参数
/// * `results` - 窗口内的检测记录
/// * `window_hrs` - 采用的回看窗口（小时）
///
/// # 返回
/// * `UptimeReport` - 统计结果，百分比保留两位小数
pub fn aggregate_uptime(results: &[CheckResult], window_hrs: i64) -> UptimeReport {
    if results.is_empty() {
        return UptimeReport {
            uptime_percent: None,
            total_checks: 0,
            up_checks: 0,
            window_hrs,
        };
    }

    let total_checks = results.len();
    let up_checks = results.iter().filter(|r| r.is_up).count();
    let percent = 100.0 * up_checks as f64 / total_checks as f64;

    UptimeReport {
        uptime_percent: Some((percent * 100.0).round() / 100.0),
        total_checks,
        up_checks,
        window_hrs,
    }
}

/// 状态引擎
pub struct StatusEngine {
    /// 结果存储
    store: Arc<dyn ResultStore>,
    /// 端点目录
    directory: Arc<dyn EndpointDirectory>,
}

impl StatusEngine {
    /// 创建状态引擎
    pub fn new(store: Arc<dyn ResultStore>, directory: Arc<dyn EndpointDirectory>) -> Self {
        Self { store, directory }
    }

    /// 查询端点当前状态
    ///
    /// # 参数
    /// * `endpoint_id` - 端点ID
    ///
    /// # 返回
    /// * `Result<EndpointStatus, StatusError>` - 无历史不是错误，
    ///   表示为Unknown状态
    pub async fn current_status(&self, endpoint_id: Uuid) -> Result<EndpointStatus, StatusError> {
        self.require_endpoint(endpoint_id).await?;

        let latest = self.store.latest_result(endpoint_id).await?;
        Ok(match latest {
            None => EndpointStatus {
                status: UptimeState::Unknown,
                last_checked_at: None,
                response_ms: None,
                status_code: None,
            },
            Some(record) => EndpointStatus {
                status: if record.is_up {
                    UptimeState::Up
                } else {
                    UptimeState::Down
                },
                last_checked_at: Some(record.checked_at),
                response_ms: Some(record.response_ms),
                status_code: Some(record.status_code),
            },
        })
    }

    /// 查询端点在套餐留存窗口内的可用率
    ///
    /// 窗口由租户当前套餐决定；留存为0表示不限，统计全部历史。
    /// 与调度侧不同，这里租户无套餐是一个显式错误而不是跳过。
    ///
    /// # 参数
    /// * `endpoint_id` - 端点ID
    ///
    /// # 返回
    /// * `Result<UptimeReport, StatusError>` - 统计结果
    pub async fn uptime(&self, endpoint_id: Uuid) -> Result<UptimeReport, StatusError> {
        self.require_endpoint(endpoint_id).await?;

        let plan = self
            .directory
            .plan_for_endpoint(endpoint_id)
            .await?
            .ok_or(StatusError::MissingPlan { endpoint_id })?;

        let cutoff = if plan.is_unbounded_retention() {
            DateTime::<Utc>::UNIX_EPOCH
        } else {
            Utc::now() - Duration::hours(plan.retention_hrs)
        };

        let results = self.store.results_since(endpoint_id, cutoff).await?;
        Ok(aggregate_uptime(&results, plan.retention_hrs))
    }

    /// 查询端点最近的检测历史，按时间倒序
    ///
    /// # 参数
    /// * `endpoint_id` - 端点ID
    /// * `limit` - 返回条数上限
    pub async fn recent_history(
        &self,
        endpoint_id: Uuid,
        limit: usize,
    ) -> Result<Vec<CheckResult>, StatusError> {
        self.require_endpoint(endpoint_id).await?;
        Ok(self.store.recent_results(endpoint_id, limit).await?)
    }

    /// 确认端点存在
    async fn require_endpoint(&self, endpoint_id: Uuid) -> Result<(), StatusError> {
        self.directory
            .get_endpoint(endpoint_id)
            .await?
            .ok_or(StatusError::EndpointNotFound { endpoint_id })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CheckOutcome, Endpoint, HttpMethod, Plan};
    use crate::store::MemoryStore;

    fn test_plan(retention_hrs: i64) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "basic".to_string(),
            check_interval_min: 5,
            retention_hrs,
            max_endpoints: 10,
        }
    }

    async fn seeded(retention_hrs: i64) -> (Arc<MemoryStore>, StatusEngine, Endpoint) {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = Uuid::new_v4();
        store.register_plan(tenant_id, test_plan(retention_hrs)).await;
        let endpoint = Endpoint::new(
            tenant_id,
            "svc".to_string(),
            "http://example.com/".to_string(),
            HttpMethod::Get,
        );
        store.register_endpoint(endpoint.clone()).await.unwrap();
        let engine = StatusEngine::new(store.clone(), store.clone());
        (store, engine, endpoint)
    }

    #[tokio::test]
    async fn test_status_unknown_without_history() {
        let (_store, engine, endpoint) = seeded(24).await;

        let status = engine.current_status(endpoint.id).await.unwrap();
        assert_eq!(status.status, UptimeState::Unknown);
        assert!(status.last_checked_at.is_none());
        assert!(status.response_ms.is_none());
        assert!(status.status_code.is_none());
    }

    #[tokio::test]
    async fn test_status_reflects_latest_result() {
        let (store, engine, endpoint) = seeded(24).await;
        let base = Utc::now();

        store
            .append(endpoint.id, CheckOutcome::from_response(200, 80), base)
            .await
            .unwrap();
        store
            .append(
                endpoint.id,
                CheckOutcome::transport_failure(5000),
                base + Duration::minutes(5),
            )
            .await
            .unwrap();

        let status = engine.current_status(endpoint.id).await.unwrap();
        assert_eq!(status.status, UptimeState::Down);
        assert_eq!(status.status_code, Some(0));
        assert_eq!(status.response_ms, Some(5000));
        assert_eq!(status.last_checked_at, Some(base + Duration::minutes(5)));
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let (store, engine, endpoint) = seeded(24).await;
        store
            .append(endpoint.id, CheckOutcome::from_response(204, 33), Utc::now())
            .await
            .unwrap();

        // 无新检测介入时，重复查询结果完全一致
        let first = engine.current_status(endpoint.id).await.unwrap();
        let second = engine.current_status(endpoint.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_status_unknown_endpoint_is_error() {
        let (_store, engine, _endpoint) = seeded(24).await;
        let err = engine.current_status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StatusError::EndpointNotFound { .. }));
    }

    #[tokio::test]
    async fn test_uptime_two_up_one_down() {
        let (store, engine, endpoint) = seeded(24).await;
        let base = Utc::now() - Duration::hours(1);

        for (outcome, offset) in [
            (CheckOutcome::from_response(200, 50), 0),
            (CheckOutcome::from_response(200, 60), 5),
            (CheckOutcome::transport_failure(5000), 10),
        ] {
            store
                .append(endpoint.id, outcome, base + Duration::minutes(offset))
                .await
                .unwrap();
        }

        let report = engine.uptime(endpoint.id).await.unwrap();
        assert_eq!(report.uptime_percent, Some(66.67));
        assert_eq!(report.total_checks, 3);
        assert_eq!(report.up_checks, 2);
        assert_eq!(report.window_hrs, 24);
    }

    #[tokio::test]
    async fn test_uptime_excludes_results_outside_window() {
        let (store, engine, endpoint) = seeded(24).await;
        let now = Utc::now();

        // 窗口外的失败记录不参与统计
        store
            .append(
                endpoint.id,
                CheckOutcome::transport_failure(5000),
                now - Duration::hours(48),
            )
            .await
            .unwrap();
        store
            .append(endpoint.id, CheckOutcome::from_response(200, 40), now)
            .await
            .unwrap();

        let report = engine.uptime(endpoint.id).await.unwrap();
        assert_eq!(report.total_checks, 1);
        assert_eq!(report.uptime_percent, Some(100.0));
    }

    #[tokio::test]
    async fn test_uptime_unbounded_retention_includes_all() {
        let (store, engine, endpoint) = seeded(0).await;
        let now = Utc::now();

        store
            .append(
                endpoint.id,
                CheckOutcome::from_response(200, 40),
                now - Duration::days(365),
            )
            .await
            .unwrap();
        store
            .append(
                endpoint.id,
                CheckOutcome::transport_failure(5000),
                now,
            )
            .await
            .unwrap();

        let report = engine.uptime(endpoint.id).await.unwrap();
        assert_eq!(report.total_checks, 2);
        assert_eq!(report.uptime_percent, Some(50.0));
        assert_eq!(report.window_hrs, 0);
    }

    #[tokio::test]
    async fn test_uptime_empty_window_is_null_not_error() {
        let (_store, engine, endpoint) = seeded(24).await;

        let report = engine.uptime(endpoint.id).await.unwrap();
        assert_eq!(report.uptime_percent, None);
        assert_eq!(report.total_checks, 0);
        assert_eq!(report.up_checks, 0);
    }

    #[tokio::test]
    async fn test_uptime_missing_plan_is_error() {
        let (store, engine, endpoint) = seeded(24).await;
        store.remove_plan(endpoint.tenant_id).await;

        let err = engine.uptime(endpoint.id).await.unwrap_err();
        assert!(matches!(err, StatusError::MissingPlan { .. }));
    }

    #[test]
    fn test_aggregate_uptime_bounds() {
        let endpoint_id = Uuid::new_v4();
        let now = Utc::now();

        // 各种构成下百分比都落在[0,100]且up<=total
        for up_count in 0..=7usize {
            let results: Vec<CheckResult> = (0..7)
                .map(|i| {
                    let outcome = if i < up_count {
                        CheckOutcome::from_response(200, 10)
                    } else {
                        CheckOutcome::transport_failure(100)
                    };
                    CheckResult::from_outcome(endpoint_id, outcome, now)
                })
                .collect();

            let report = aggregate_uptime(&results, 24);
            assert!(report.up_checks <= report.total_checks);
            let percent = report.uptime_percent.unwrap();
            assert!((0.0..=100.0).contains(&percent));
        }
    }

    #[test]
    fn test_aggregate_uptime_rounding() {
        let endpoint_id = Uuid::new_v4();
        let now = Utc::now();
        let results: Vec<CheckResult> = [true, false, false]
            .iter()
            .map(|&up| {
                let outcome = if up {
                    CheckOutcome::from_response(200, 10)
                } else {
                    CheckOutcome::transport_failure(100)
                };
                CheckResult::from_outcome(endpoint_id, outcome, now)
            })
            .collect();

        // 1/3 -> 33.33
        let report = aggregate_uptime(&results, 12);
        assert_eq!(report.uptime_percent, Some(33.33));
    }
}
