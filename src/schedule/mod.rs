//! 检测调度器模块
//!
//! 每个周期枚举激活端点，按套餐节奏判定是否到期，并发执行
//! 到期端点的探测并落库。调度器自身无状态，`run_tick`由外部
//! 定时器驱动，单次调用自洽完成。

use crate::error::Result;
use crate::model::{CheckResult, Endpoint, Plan};
use crate::probe::CheckExecutor;
use crate::store::{EndpointDirectory, ResultStore};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// 单个调度周期的统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// 扫描到的激活端点数
    pub scanned: usize,
    /// 因租户无套餐被跳过的端点数
    pub skipped_missing_plan: usize,
    /// 到期并执行了探测的端点数
    pub checked: usize,
    /// 落库失败的端点数（该周期监控数据丢失）
    pub store_failures: usize,
}

/// 检测调度器
///
/// 到期判定和探测执行按端点相互独立，单个端点的慢探测不会
/// 阻塞同周期内其他端点；并发量由信号量限制以约束出站连接数
pub struct TickScheduler {
    /// 探测器
    executor: Arc<dyn CheckExecutor>,
    /// 结果存储
    store: Arc<dyn ResultStore>,
    /// 端点目录
    directory: Arc<dyn EndpointDirectory>,
    /// 并发控制信号量
    semaphore: Arc<Semaphore>,
}

impl TickScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `executor` - 探测器
    /// * `store` - 结果存储
    /// * `directory` - 端点目录
    /// * `max_concurrent_checks` - 单周期并发探测上限
    ///
    /// # 返回
    /// * `Self` - 调度器实例
    pub fn new(
        executor: Arc<dyn CheckExecutor>,
        store: Arc<dyn ResultStore>,
        directory: Arc<dyn EndpointDirectory>,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            executor,
            store,
            directory,
            semaphore: Arc::new(Semaphore::new(max_concurrent_checks)),
        }
    }

    /// 执行一个调度周期
    ///
    /// 枚举激活端点，跳过无套餐或未到期的端点，其余端点并发
    /// 探测，全部探测结束后本周期才算完成。没有到期端点时为
    /// 空操作。周期之间允许重叠，重复探测只会多出一条历史记录。
    ///
    /// # 返回
    /// * `Result<TickSummary>` - 本周期的统计信息
    pub async fn run_tick(&self) -> Result<TickSummary> {
        let now = Utc::now();
        let endpoints = self.directory.list_active_with_plan().await?;

        let mut summary = TickSummary {
            scanned: endpoints.len(),
            ..Default::default()
        };

        let mut due: Vec<Endpoint> = Vec::new();
        for (endpoint, plan) in endpoints {
            let Some(plan) = plan else {
                // 策略性跳过：租户没有可解析的套餐
                debug!("跳过无套餐端点: {} ({})", endpoint.name, endpoint.id);
                summary.skipped_missing_plan += 1;
                continue;
            };

            if is_due(&endpoint, &plan, now) {
                due.push(endpoint);
            } else {
                debug!("端点未到期: {} ({})", endpoint.name, endpoint.id);
            }
        }

        if due.is_empty() {
            debug!("本周期没有到期端点");
            return Ok(summary);
        }

        info!("本周期到期端点数: {}/{}", due.len(), summary.scanned);

        let results = join_all(due.into_iter().map(|e| self.run_one_check(e))).await;
        // 被跳过的探测（None）不计入checked
        for stored in results.into_iter().flatten() {
            summary.checked += 1;
            if !stored {
                summary.store_failures += 1;
            }
        }

        info!(
            "调度周期完成: 探测 {} 个端点, 落库失败 {} 个",
            summary.checked, summary.store_failures
        );
        Ok(summary)
    }

    /// 对单个端点执行一次探测并落库
    ///
    /// 先受信号量约束再计时，`last_checked_at`取探测开始时间，
    /// 避免请求耗时在间隔上累积漂移。返回None表示探测被跳过，
    /// Some为记录是否成功落库。
    async fn run_one_check(&self, endpoint: Endpoint) -> Option<bool> {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("获取并发许可失败，跳过本次探测: {}", endpoint.name);
                return None;
            }
        };

        let started_at = Utc::now();
        let outcome = self.executor.probe(&endpoint).await;

        if outcome.is_up {
            debug!("端点可用: {} ({}ms)", endpoint.name, outcome.response_ms);
        } else {
            warn!(
                "端点不可用: {} 状态码 {} ({}ms)",
                endpoint.name, outcome.status_code, outcome.response_ms
            );
        }

        // 落库失败不重试也不中断周期，只记录并继续
        let stored = match self.store.append(endpoint.id, outcome, started_at).await {
            Ok(_) => true,
            Err(e) => {
                error!("检测记录落库失败: {} - {}", endpoint.name, e);
                false
            }
        };

        // 探测确已发生，即便记录丢失也要推进检测时间，
        // 否则存储故障会变相收紧检测节奏
        if let Err(e) = self
            .directory
            .update_last_checked(endpoint.id, started_at)
            .await
        {
            error!("更新最后检测时间失败: {} - {}", endpoint.name, e);
        }

        Some(stored)
    }

    /// 按需执行一次探测
    ///
    /// 供端点创建流程同步调用，立即产生第一条历史记录；
    /// 与周期内探测走同样的落库路径
    ///
    /// # 参数
    /// * `endpoint` - 被探测的端点
    ///
    /// # 返回
    /// * `Result<CheckResult>` - 已落库的检测记录
    pub async fn check_one(&self, endpoint: &Endpoint) -> Result<CheckResult> {
        let started_at = Utc::now();
        let outcome = self.executor.probe(endpoint).await;

        let record = self.store.append(endpoint.id, outcome, started_at).await?;
        self.directory
            .update_last_checked(endpoint.id, started_at)
            .await?;
        Ok(record)
    }
}

/// 到期判定
///
/// 从未检测过的端点立即到期；否则距上次检测的间隔必须不小于
/// 套餐规定的分钟数。保证的是"不早于"，不是精确时刻。
fn is_due(endpoint: &Endpoint, plan: &Plan, now: DateTime<Utc>) -> bool {
    match endpoint.last_checked_at {
        None => true,
        Some(last) => now.signed_duration_since(last) >= Duration::minutes(plan.check_interval_min),
    }
}
