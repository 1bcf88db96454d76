// ==========================================
// 板件切割生产跟踪系统 - 主入口
// ==========================================
// 职责: 初始化日志/数据库/许可表,装配业务接口
// ==========================================

use std::sync::{Arc, Mutex};

use panel_cutting_mes::api::{OrderApi, PalletApi};
use panel_cutting_mes::config::ConfigManager;
use panel_cutting_mes::db;
use panel_cutting_mes::engine::{
    AutoPlanner, CommitCoordinator, GuardRegistry, OrderLockRegistry, PalletAllocationEngine,
    StageGraphLoader, StageTransitionEngine, TrackingRepositories,
};
use panel_cutting_mes::logging;

/// 默认数据库路径: <系统数据目录>/panel-cutting-mes/mes.db
fn default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let dir = base.join("panel-cutting-mes");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("创建数据目录失败, 回退当前目录: {}", e);
        return "mes.db".to_string();
    }
    dir.join("mes.db").to_string_lossy().to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", panel_cutting_mes::APP_NAME);
    tracing::info!("系统版本: {}", panel_cutting_mes::VERSION);
    tracing::info!("==================================================");

    // 数据库初始化
    let db_path = std::env::args().nth(1).unwrap_or_else(default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;
    match db::read_schema_version(&conn)? {
        Some(v) if v == db::CURRENT_SCHEMA_VERSION => {}
        Some(v) => tracing::warn!(
            "schema_version={} 与代码期望的 {} 不一致, 请检查迁移",
            v,
            db::CURRENT_SCHEMA_VERSION
        ),
        None => tracing::warn!("数据库缺少 schema_version 表"),
    }
    let conn = Arc::new(Mutex::new(conn));

    // 工序许可表: load → freeze → serve
    // 未配置外部策略源时直接使用内置表
    let graph = StageGraphLoader::bundled_only().load().await;

    // 装配仓储与引擎
    let repos = TrackingRepositories::from_connection(conn.clone());
    let config = Arc::new(
        ConfigManager::from_connection(conn)
            .map_err(|e| anyhow::anyhow!("配置管理器初始化失败: {}", e))?,
    );
    let guards = GuardRegistry::with_config(&config)
        .map_err(|e| anyhow::anyhow!("守卫注册表初始化失败: {}", e))?;
    let locks = Arc::new(OrderLockRegistry::new());

    let stage_engine = Arc::new(StageTransitionEngine::new(graph, guards, repos.clone()));
    let allocation = Arc::new(PalletAllocationEngine::new(
        repos.clone(),
        config.clone(),
        locks.clone(),
    ));
    let planner = Arc::new(AutoPlanner::new(repos.clone(), config.clone()));
    let coordinator = Arc::new(CommitCoordinator::new(repos.clone(), locks));

    let order_api = OrderApi::new(repos.clone(), stage_engine, allocation.clone());
    let _pallet_api = PalletApi::new(repos, allocation, planner, coordinator);

    let orders = order_api
        .list_orders()
        .map_err(|e| anyhow::anyhow!("订单列表读取失败: {}", e))?;
    tracing::info!("业务接口装配完成, 当前订单数: {}", orders.len());

    Ok(())
}
