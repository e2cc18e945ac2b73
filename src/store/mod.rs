//! 检测结果存储与端点目录
//!
//! 结果存储是一个按端点划分的只追加日志；端点目录提供调度器
//! 需要的端点/套餐联合视图和`last_checked_at`维护。两者都以
//! trait形式定义，持久化后端（内存、数据库）可替换。

pub mod memory;

use crate::error::StoreError;
use crate::model::{CheckOutcome, CheckResult, Endpoint, Plan};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;

/// 存储操作结果类型别名
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 检测结果存储trait
///
/// 记录只追加，核心从不更新或删除；留存裁剪是外部关注点
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// 追加一条检测记录
    ///
    /// 写入失败必须向调用方显式返回，绝不静默吞掉
    ///
    /// # 参数
    /// * `endpoint_id` - 端点ID
    /// * `outcome` - 探测结果
    /// * `checked_at` - 检测开始时间
    ///
    /// # 返回
    /// * `StoreResult<CheckResult>` - 已写入的记录
    async fn append(
        &self,
        endpoint_id: Uuid,
        outcome: CheckOutcome,
        checked_at: DateTime<Utc>,
    ) -> StoreResult<CheckResult>;

    /// 按时间倒序返回最近的记录，数量有界
    async fn recent_results(&self, endpoint_id: Uuid, limit: usize) -> StoreResult<Vec<CheckResult>>;

    /// 返回时间不早于cutoff的全部记录
    ///
    /// 聚合计算与顺序无关，实现无需保证返回顺序
    async fn results_since(
        &self,
        endpoint_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<CheckResult>>;

    /// 返回最新一条记录，没有历史时为None
    async fn latest_result(&self, endpoint_id: Uuid) -> StoreResult<Option<CheckResult>>;
}

/// 端点目录trait
///
/// 由租户/持久化层提供的输入接口
#[async_trait]
pub trait EndpointDirectory: Send + Sync {
    /// 列出所有激活端点，并联上所属租户的当前套餐
    ///
    /// 套餐无法解析时对应项为None，由调度策略决定如何处理
    async fn list_active_with_plan(&self) -> StoreResult<Vec<(Endpoint, Option<Plan>)>>;

    /// 查询单个端点
    async fn get_endpoint(&self, endpoint_id: Uuid) -> StoreResult<Option<Endpoint>>;

    /// 解析端点所属租户的当前套餐
    async fn plan_for_endpoint(&self, endpoint_id: Uuid) -> StoreResult<Option<Plan>>;

    /// 推进端点的最后检测时间
    ///
    /// 实现必须保证`last_checked_at`单调不回退：重叠周期下
    /// 较旧的时间戳会被忽略而不是覆盖较新的值
    async fn update_last_checked(
        &self,
        endpoint_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()>;
}
