//! 内存版存储实现
//!
//! 同时实现结果存储和端点目录，用于独立运行和测试。
//! 生产部署可以用数据库后端替换，trait契约不变。

use crate::error::StoreError;
use crate::model::{CheckOutcome, CheckResult, Endpoint, Plan};
use crate::store::{EndpointDirectory, ResultStore, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 内存存储
///
/// 所有映射都在`Arc<RwLock<..>>`之后，追加和字段更新在各自的
/// 写锁内完成，满足无全局锁的一致性要求
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// 端点映射
    endpoints: Arc<RwLock<HashMap<Uuid, Endpoint>>>,
    /// 租户到套餐的映射
    plans: Arc<RwLock<HashMap<Uuid, Plan>>>,
    /// 按端点划分的检测记录日志
    results: Arc<RwLock<HashMap<Uuid, Vec<CheckResult>>>>,
}

impl MemoryStore {
    /// 创建空的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 为租户登记套餐
    ///
    /// 同一租户重复登记时覆盖旧套餐，变更在下一个调度周期生效
    pub async fn register_plan(&self, tenant_id: Uuid, plan: Plan) {
        let mut plans = self.plans.write().await;
        plans.insert(tenant_id, plan);
    }

    /// 移除租户的套餐，模拟订阅到期
    ///
    /// 该租户的端点会在后续调度周期中被跳过
    pub async fn remove_plan(&self, tenant_id: Uuid) {
        let mut plans = self.plans.write().await;
        plans.remove(&tenant_id);
    }

    /// 注册端点，执行套餐配额检查
    ///
    /// # 参数
    /// * `endpoint` - 待注册的端点
    ///
    /// # 返回
    /// * `StoreResult<()>` - 租户无套餐或超出配额时拒绝
    pub async fn register_endpoint(&self, endpoint: Endpoint) -> StoreResult<()> {
        let plans = self.plans.read().await;
        let plan = plans
            .get(&endpoint.tenant_id)
            .ok_or(StoreError::MissingPlan {
                tenant_id: endpoint.tenant_id,
            })?;

        let mut endpoints = self.endpoints.write().await;
        let tenant_count = endpoints
            .values()
            .filter(|e| e.tenant_id == endpoint.tenant_id)
            .count();

        if tenant_count >= plan.max_endpoints {
            return Err(StoreError::QuotaExceeded {
                tenant_id: endpoint.tenant_id,
                quota: plan.max_endpoints,
            });
        }

        endpoints.insert(endpoint.id, endpoint);
        Ok(())
    }

    /// 注销端点并清除其历史记录
    pub async fn remove_endpoint(&self, endpoint_id: Uuid) -> StoreResult<()> {
        let mut endpoints = self.endpoints.write().await;
        endpoints
            .remove(&endpoint_id)
            .ok_or(StoreError::EndpointNotFound { endpoint_id })?;

        let mut results = self.results.write().await;
        results.remove(&endpoint_id);
        Ok(())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn append(
        &self,
        endpoint_id: Uuid,
        outcome: CheckOutcome,
        checked_at: DateTime<Utc>,
    ) -> StoreResult<CheckResult> {
        // 关系不变量：记录必须指向写入时存在的端点
        {
            let endpoints = self.endpoints.read().await;
            if !endpoints.contains_key(&endpoint_id) {
                return Err(StoreError::EndpointNotFound { endpoint_id });
            }
        }

        let record = CheckResult::from_outcome(endpoint_id, outcome, checked_at);
        let mut results = self.results.write().await;
        results
            .entry(endpoint_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn recent_results(
        &self,
        endpoint_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<CheckResult>> {
        let results = self.results.read().await;
        let mut records: Vec<CheckResult> = results
            .get(&endpoint_id)
            .map(|v| v.to_vec())
            .unwrap_or_default();
        records.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn results_since(
        &self,
        endpoint_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<CheckResult>> {
        let results = self.results.read().await;
        Ok(results
            .get(&endpoint_id)
            .map(|v| {
                v.iter()
                    .filter(|r| r.checked_at >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_result(&self, endpoint_id: Uuid) -> StoreResult<Option<CheckResult>> {
        let results = self.results.read().await;
        Ok(results
            .get(&endpoint_id)
            .and_then(|v| v.iter().max_by_key(|r| r.checked_at))
            .cloned())
    }
}

#[async_trait]
impl EndpointDirectory for MemoryStore {
    async fn list_active_with_plan(&self) -> StoreResult<Vec<(Endpoint, Option<Plan>)>> {
        let endpoints = self.endpoints.read().await;
        let plans = self.plans.read().await;

        Ok(endpoints
            .values()
            .filter(|e| e.is_active)
            .map(|e| (e.clone(), plans.get(&e.tenant_id).cloned()))
            .collect())
    }

    async fn get_endpoint(&self, endpoint_id: Uuid) -> StoreResult<Option<Endpoint>> {
        let endpoints = self.endpoints.read().await;
        Ok(endpoints.get(&endpoint_id).cloned())
    }

    async fn plan_for_endpoint(&self, endpoint_id: Uuid) -> StoreResult<Option<Plan>> {
        let endpoints = self.endpoints.read().await;
        let endpoint = endpoints
            .get(&endpoint_id)
            .ok_or(StoreError::EndpointNotFound { endpoint_id })?;

        let plans = self.plans.read().await;
        Ok(plans.get(&endpoint.tenant_id).cloned())
    }

    async fn update_last_checked(
        &self,
        endpoint_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .get_mut(&endpoint_id)
            .ok_or(StoreError::EndpointNotFound { endpoint_id })?;

        // 单调不回退：重叠周期到达的旧时间戳直接忽略
        match endpoint.last_checked_at {
            Some(current) if current > timestamp => {}
            _ => endpoint.last_checked_at = Some(timestamp),
        }
        Ok(())
    }
}
