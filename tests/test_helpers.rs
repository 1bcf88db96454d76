// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、引擎装配、测试数据生成
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tempfile::NamedTempFile;

use panel_cutting_mes::api::{
    AddPositionRequest, CreateOrderRequest, NewPieceTypeRequest, OrderApi, PalletApi,
};
use panel_cutting_mes::config::ConfigManager;
use panel_cutting_mes::db;
use panel_cutting_mes::engine::{
    AutoPlanner, CommitCoordinator, GuardRegistry, OrderLockRegistry, PalletAllocationEngine,
    StageGraph, StageTransitionEngine, TrackingRepositories,
};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 完整测试环境
pub struct TestContext {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub repos: TrackingRepositories,
    pub config: Arc<ConfigManager>,
    pub locks: Arc<OrderLockRegistry>,
    pub stage_engine: Arc<StageTransitionEngine>,
    pub allocation: Arc<PalletAllocationEngine>,
    pub planner: Arc<AutoPlanner>,
    pub coordinator: Arc<CommitCoordinator>,
    pub order_api: Arc<OrderApi>,
    pub pallet_api: Arc<PalletApi>,
}

/// 装配完整测试环境（内置许可表 + 默认守卫配置）
pub fn setup_test_env() -> TestContext {
    let (temp_file, db_path) = create_test_db().unwrap();

    let conn = Arc::new(Mutex::new(db::open_sqlite_connection(&db_path).unwrap()));
    let repos = TrackingRepositories::from_connection(conn.clone());
    let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
    let locks = Arc::new(OrderLockRegistry::new());

    let guards = GuardRegistry::with_config(&config).unwrap();
    let stage_engine = Arc::new(StageTransitionEngine::new(
        Arc::new(StageGraph::bundled()),
        guards,
        repos.clone(),
    ));
    let allocation = Arc::new(PalletAllocationEngine::new(
        repos.clone(),
        config.clone(),
        locks.clone(),
    ));
    let planner = Arc::new(AutoPlanner::new(repos.clone(), config.clone()));
    let coordinator = Arc::new(CommitCoordinator::new(repos.clone(), locks.clone()));

    let order_api = Arc::new(OrderApi::new(
        repos.clone(),
        stage_engine.clone(),
        allocation.clone(),
    ));
    let pallet_api = Arc::new(PalletApi::new(
        repos.clone(),
        allocation.clone(),
        planner.clone(),
        coordinator.clone(),
    ));

    TestContext {
        _temp_file: temp_file,
        db_path,
        conn,
        repos,
        config,
        locks,
        stage_engine,
        allocation,
        planner,
        coordinator,
        order_api,
        pallet_api,
    }
}

/// 创建一个带单排料位/单板件规格的测试订单
///
/// # 返回
/// - (order_id, position_id, piece_type_id)
pub fn seed_order_single_piece(
    ctx: &TestContext,
    order_no: &str,
    planned_qty: i64,
) -> (String, String, String) {
    let order = ctx
        .order_api
        .create_order(CreateOrderRequest {
            order_no: order_no.to_string(),
            customer_name: "测试客户".to_string(),
            priority: 5,
            comment: None,
            planned_at: None,
        })
        .unwrap();

    let detail = ctx
        .order_api
        .add_position(
            &order.order_id,
            AddPositionRequest {
                material_name: "18mm颗粒板".to_string(),
                color: "白橡".to_string(),
                plate_count: 4,
                layout_ref: None,
                piece_types: vec![NewPieceTypeRequest {
                    length_mm: 600.0,
                    width_mm: 400.0,
                    thickness_mm: 18.0,
                    planned_qty,
                    color: "白橡".to_string(),
                    edging_required: false,
                }],
            },
        )
        .unwrap();

    (
        order.order_id,
        detail.position.position_id,
        detail.piece_types[0].piece_type_id.clone(),
    )
}

/// 创建一个双色订单（两个排料位,各一个板件规格）
///
/// # 返回
/// - (order_id, 白橡 piece_type_id, 胡桃 piece_type_id)
pub fn seed_order_two_colors(
    ctx: &TestContext,
    order_no: &str,
    qty_white: i64,
    qty_walnut: i64,
) -> (String, String, String) {
    let order = ctx
        .order_api
        .create_order(CreateOrderRequest {
            order_no: order_no.to_string(),
            customer_name: "测试客户".to_string(),
            priority: 5,
            comment: None,
            planned_at: None,
        })
        .unwrap();

    let white = ctx
        .order_api
        .add_position(
            &order.order_id,
            AddPositionRequest {
                material_name: "18mm颗粒板".to_string(),
                color: "白橡".to_string(),
                plate_count: 4,
                layout_ref: None,
                piece_types: vec![NewPieceTypeRequest {
                    length_mm: 600.0,
                    width_mm: 400.0,
                    thickness_mm: 18.0,
                    planned_qty: qty_white,
                    color: "白橡".to_string(),
                    edging_required: true,
                }],
            },
        )
        .unwrap();

    let walnut = ctx
        .order_api
        .add_position(
            &order.order_id,
            AddPositionRequest {
                material_name: "18mm颗粒板".to_string(),
                color: "胡桃".to_string(),
                plate_count: 4,
                layout_ref: None,
                piece_types: vec![NewPieceTypeRequest {
                    length_mm: 800.0,
                    width_mm: 600.0,
                    thickness_mm: 18.0,
                    planned_qty: qty_walnut,
                    color: "胡桃".to_string(),
                    edging_required: false,
                }],
            },
        )
        .unwrap();

    (
        order.order_id,
        white.piece_types[0].piece_type_id.clone(),
        walnut.piece_types[0].piece_type_id.clone(),
    )
}
