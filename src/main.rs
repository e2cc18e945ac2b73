//! Upwatch 主程序入口
//!
//! 加载配置、灌入种子数据，并以固定周期驱动调度器

use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use upwatch::config::{Config, ConfigLoader, TomlConfigLoader};
use upwatch::logging::{LogConfig, LoggingSystem};
use upwatch::model::{Endpoint, Plan};
use upwatch::probe::HttpCheckExecutor;
use upwatch::schedule::TickScheduler;
use upwatch::status::StatusEngine;
use upwatch::store::MemoryStore;
use uuid::Uuid;

/// Upwatch - HTTP端点可用性监控核心
#[derive(Parser, Debug)]
#[command(
    name = "upwatch",
    version = upwatch::VERSION,
    about = upwatch::APP_DESCRIPTION,
    long_about = None
)]
struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "upwatch.toml",
        env = "UPWATCH_CONFIG"
    )]
    config: PathBuf,

    /// 日志级别，覆盖配置文件中的设置
    #[arg(short, long, value_name = "LEVEL", env = "UPWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// 只执行一个调度周期后退出
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 加载配置
    let loader = TomlConfigLoader::new();
    let config = loader
        .load_from_file(&args.config)
        .await
        .with_context(|| format!("加载配置文件失败: {}", args.config.display()))?;

    // 初始化日志系统
    let level = args.log_level.as_deref().unwrap_or(&config.log.level);
    let log_config = LogConfig::from_section(level, config.log.json_format);
    LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("{} v{} 启动", upwatch::APP_NAME, upwatch::VERSION);

    // 构建存储并灌入种子数据
    let store = Arc::new(MemoryStore::new());
    seed_store(&store, &config).await?;

    // 组装探测器、调度器和状态引擎
    let executor = Arc::new(
        HttpCheckExecutor::new(Duration::from_millis(config.monitor.probe_timeout_ms))
            .context("构建HTTP探测器失败")?,
    );
    let scheduler = TickScheduler::new(
        executor,
        store.clone(),
        store.clone(),
        config.monitor.max_concurrent_checks,
    );
    let engine = StatusEngine::new(store.clone(), store.clone());

    if args.once {
        run_tick_and_report(&scheduler, &engine, &store).await;
        return Ok(());
    }

    info!(
        "调度周期 {} 秒, 探测超时 {} 毫秒, 并发上限 {}",
        config.monitor.tick_interval_seconds,
        config.monitor.probe_timeout_ms,
        config.monitor.max_concurrent_checks
    );

    let mut ticker = interval(Duration::from_secs(config.monitor.tick_interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_tick_and_report(&scheduler, &engine, &store).await;
            }
            _ = signal::ctrl_c() => {
                info!("收到退出信号，停止调度");
                break;
            }
        }
    }

    Ok(())
}

/// 把配置中的种子套餐和端点灌入内存存储
///
/// 租户标签在此处映射为生成的租户ID
async fn seed_store(store: &MemoryStore, config: &Config) -> anyhow::Result<()> {
    let mut tenants: HashMap<String, Uuid> = HashMap::new();

    for seed in &config.plans {
        let tenant_id = *tenants
            .entry(seed.tenant.clone())
            .or_insert_with(Uuid::new_v4);
        let plan = Plan {
            id: Uuid::new_v4(),
            name: seed.name.clone(),
            check_interval_min: seed.check_interval_min,
            retention_hrs: seed.retention_hrs,
            max_endpoints: seed.max_endpoints,
        };
        store.register_plan(tenant_id, plan).await;
    }

    for seed in &config.endpoints {
        let Some(&tenant_id) = tenants.get(&seed.tenant) else {
            // 配置验证已覆盖，防御留给日志
            warn!("端点 {} 的租户 {} 没有套餐，跳过", seed.name, seed.tenant);
            continue;
        };
        let mut endpoint = Endpoint::new(
            tenant_id,
            seed.name.clone(),
            seed.url.clone(),
            seed.method,
        );
        endpoint.is_active = seed.active;
        store
            .register_endpoint(endpoint)
            .await
            .with_context(|| format!("注册端点失败: {}", seed.name))?;
    }

    info!(
        "种子数据灌入完成: {} 个套餐, {} 个端点",
        config.plans.len(),
        config.endpoints.len()
    );
    Ok(())
}

/// 执行一个调度周期并输出各端点的状态摘要
async fn run_tick_and_report(
    scheduler: &TickScheduler,
    engine: &StatusEngine,
    store: &MemoryStore,
) {
    use upwatch::store::EndpointDirectory;

    match scheduler.run_tick().await {
        Ok(summary) => {
            if summary.checked > 0 {
                info!(
                    "周期摘要: 扫描 {}, 探测 {}, 无套餐跳过 {}, 落库失败 {}",
                    summary.scanned,
                    summary.checked,
                    summary.skipped_missing_plan,
                    summary.store_failures
                );
            }
        }
        Err(e) => {
            error!("调度周期执行失败: {e}");
            return;
        }
    }

    let endpoints = match store.list_active_with_plan().await {
        Ok(list) => list,
        Err(e) => {
            error!("读取端点列表失败: {e}");
            return;
        }
    };

    for (endpoint, _) in endpoints {
        match engine.current_status(endpoint.id).await {
            Ok(status) => info!(
                "{}: {:?} 状态码 {:?} 耗时 {:?}ms",
                endpoint.name, status.status, status.status_code, status.response_ms
            ),
            Err(e) => warn!("查询端点状态失败: {} - {e}", endpoint.name),
        }
    }
}
