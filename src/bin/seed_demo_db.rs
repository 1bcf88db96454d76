// ==========================================
// 板件切割生产跟踪系统 - 演示数据种子程序
// ==========================================
// 用法: seed_demo_db [db_path]
// 职责: 建库并写入一套可演示的订单/排料位/板件规格
// ==========================================

use std::sync::{Arc, Mutex};

use panel_cutting_mes::api::{
    AddPositionRequest, CreateOrderRequest, NewPieceTypeRequest, OrderApi,
};
use panel_cutting_mes::config::ConfigManager;
use panel_cutting_mes::db;
use panel_cutting_mes::engine::{
    GuardRegistry, OrderLockRegistry, PalletAllocationEngine, StageGraph, StageTransitionEngine,
    TrackingRepositories,
};
use panel_cutting_mes::logging;

fn main() -> anyhow::Result<()> {
    logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(|| "mes.db".to_string());
    tracing::info!("种子数据库: {}", db_path);

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let repos = TrackingRepositories::from_connection(conn.clone());
    let config = Arc::new(
        ConfigManager::from_connection(conn)
            .map_err(|e| anyhow::anyhow!("配置管理器初始化失败: {}", e))?,
    );
    let locks = Arc::new(OrderLockRegistry::new());
    let stage_engine = Arc::new(StageTransitionEngine::new(
        Arc::new(StageGraph::bundled()),
        GuardRegistry::with_defaults(),
        repos.clone(),
    ));
    let allocation = Arc::new(PalletAllocationEngine::new(repos.clone(), config, locks));
    let order_api = OrderApi::new(repos, stage_engine, allocation);

    let order = order_api
        .create_order(CreateOrderRequest {
            order_no: "MO-2026-0001".to_string(),
            customer_name: "青云橱柜".to_string(),
            priority: 6,
            comment: Some("演示订单".to_string()),
            planned_at: None,
        })
        .map_err(|e| anyhow::anyhow!("订单创建失败: {}", e))?;

    order_api
        .add_position(
            &order.order_id,
            AddPositionRequest {
                material_name: "18mm颗粒板".to_string(),
                color: "白橡".to_string(),
                plate_count: 6,
                layout_ref: Some("LAYOUT-A1".to_string()),
                piece_types: vec![
                    NewPieceTypeRequest {
                        length_mm: 720.0,
                        width_mm: 560.0,
                        thickness_mm: 18.0,
                        planned_qty: 40,
                        color: "白橡".to_string(),
                        edging_required: true,
                    },
                    NewPieceTypeRequest {
                        length_mm: 560.0,
                        width_mm: 350.0,
                        thickness_mm: 18.0,
                        planned_qty: 80,
                        color: "白橡".to_string(),
                        edging_required: false,
                    },
                ],
            },
        )
        .map_err(|e| anyhow::anyhow!("排料位创建失败: {}", e))?;

    order_api
        .add_position(
            &order.order_id,
            AddPositionRequest {
                material_name: "18mm颗粒板".to_string(),
                color: "胡桃".to_string(),
                plate_count: 4,
                layout_ref: Some("LAYOUT-A2".to_string()),
                piece_types: vec![NewPieceTypeRequest {
                    length_mm: 900.0,
                    width_mm: 600.0,
                    thickness_mm: 18.0,
                    planned_qty: 30,
                    color: "胡桃".to_string(),
                    edging_required: true,
                }],
            },
        )
        .map_err(|e| anyhow::anyhow!("排料位创建失败: {}", e))?;

    tracing::info!(order_no = %order.order_no, "演示数据写入完成");
    Ok(())
}
