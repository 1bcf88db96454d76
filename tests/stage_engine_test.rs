// ==========================================
// 工序流转引擎集成测试
// ==========================================
// 职责: 验证许可表、守卫、流转日志与回退行为
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use panel_cutting_mes::api::{AssignRequest, ChangeStatusRequest, CreatePalletRequest};
use panel_cutting_mes::domain::types::StageCode;
use panel_cutting_mes::engine::error::EngineResult;
use panel_cutting_mes::engine::{StageGraph, StageGraphLoader, StagePolicySource};

use crate::test_helpers::{seed_order_single_piece, setup_test_env};

fn change(ctx: &test_helpers::TestContext, order_id: &str, target: &str, force: bool) ->
    panel_cutting_mes::api::StatusChangeResponse
{
    ctx.order_api
        .change_status(
            order_id,
            ChangeStatusRequest {
                target_stage: target.to_string(),
                operator: Some("张工".to_string()),
                location: Some("开料车间".to_string()),
                comment: None,
                force,
            },
        )
        .unwrap()
}

// ==========================================
// 测试1: 零排料位守卫场景
// ==========================================

#[test]
fn test_zero_position_guard_blocks_then_allows() {
    let ctx = setup_test_env();

    let order = ctx
        .order_api
        .create_order(panel_cutting_mes::api::CreateOrderRequest {
            order_no: "MO-G1".to_string(),
            customer_name: "测试客户".to_string(),
            priority: 5,
            comment: None,
            planned_at: None,
        })
        .unwrap();

    // 无排料位 → 硬守卫阻断
    let resp = change(&ctx, &order.order_id, "CUT_START", false);
    assert!(!resp.success);
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].contains("排料位"));
    assert!(resp.warnings.is_empty());

    // 补一个排料位后同样的调用成功
    ctx.order_api
        .add_position(
            &order.order_id,
            panel_cutting_mes::api::AddPositionRequest {
                material_name: "18mm颗粒板".to_string(),
                color: "白橡".to_string(),
                plate_count: 2,
                layout_ref: None,
                piece_types: vec![panel_cutting_mes::api::NewPieceTypeRequest {
                    length_mm: 600.0,
                    width_mm: 400.0,
                    thickness_mm: 18.0,
                    planned_qty: 10,
                    color: "白橡".to_string(),
                    edging_required: false,
                }],
            },
        )
        .unwrap();

    let resp = change(&ctx, &order.order_id, "CUT_START", false);
    assert!(resp.success, "补排料位后应放行: {:?}", resp.errors);

    // 恰好追加一条流转日志
    let history = ctx.order_api.stage_history(&order.order_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_stage, StageCode::New);
    assert_eq!(history[0].to_stage, StageCode::CutStart);
    assert_eq!(history[0].operator.as_deref(), Some("张工"));
    assert_eq!(history[0].location.as_deref(), Some("开料车间"));
}

// ==========================================
// 测试2: 非法流转与自环
// ==========================================

#[test]
fn test_illegal_transition_enumerates_alternatives() {
    let ctx = setup_test_env();
    let (order_id, _, _) = seed_order_single_piece(&ctx, "MO-G2", 10);

    let resp = change(&ctx, &order_id, "SHIP", false);
    assert!(!resp.success);
    // 错误消息列举合法目标
    assert!(resp.errors[0].contains("CUT_START"));
    assert!(resp.errors[0].contains("CANCELLED"));
}

#[test]
fn test_reissue_current_stage_is_illegal() {
    let ctx = setup_test_env();
    let (order_id, _, _) = seed_order_single_piece(&ctx, "MO-G3", 10);

    // 重复下发当前阶段按非法流转处理
    let resp = change(&ctx, &order_id, "NEW", false);
    assert!(!resp.success);
    assert!(resp.errors[0].contains("非法阶段流转"));
}

#[test]
fn test_terminal_order_rejects_further_transitions() {
    let ctx = setup_test_env();
    let (order_id, _, _) = seed_order_single_piece(&ctx, "MO-G4", 10);

    let resp = change(&ctx, &order_id, "CANCELLED", false);
    assert!(resp.success);

    let resp = change(&ctx, &order_id, "CUT_START", false);
    assert!(!resp.success);
    assert!(resp.errors[0].contains("终态"));

    // 终态订单无可流转目标
    let next = ctx.order_api.next_stages(&order_id).unwrap();
    assert!(next.is_empty());
}

// ==========================================
// 测试3: next_stages 可用性试算
// ==========================================

#[test]
fn test_next_stages_reports_guard_availability() {
    let ctx = setup_test_env();

    let order = ctx
        .order_api
        .create_order(panel_cutting_mes::api::CreateOrderRequest {
            order_no: "MO-G5".to_string(),
            customer_name: "测试客户".to_string(),
            priority: 5,
            comment: None,
            planned_at: None,
        })
        .unwrap();

    let next = ctx.order_api.next_stages(&order.order_id).unwrap();
    assert_eq!(next.len(), 2);

    let cut = next
        .iter()
        .find(|n| n.stage_code == StageCode::CutStart)
        .unwrap();
    assert!(!cut.available);
    assert!(cut.reason.as_ref().unwrap().contains("排料位"));

    let cancel = next
        .iter()
        .find(|n| n.stage_code == StageCode::Cancelled)
        .unwrap();
    assert!(cancel.available);
    assert!(cancel.reason.is_none());
}

// ==========================================
// 测试4: 全流程(含分支跳过与软守卫 force 放行)
// ==========================================

#[test]
fn test_full_flow_with_skips_and_soft_guards() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-G6", 24);

    for stage in ["CUT_START", "PALLET_OPEN", "PALLET_PACK"] {
        let resp = change(&ctx, &order_id, stage, false);
        assert!(resp.success, "{} 应放行: {:?}", stage, resp.errors);
    }

    // 封托守卫: 无装载托盘 → 阻断
    let resp = change(&ctx, &order_id, "PALLET_CLOSE", false);
    assert!(!resp.success);
    assert!(resp.errors[0].contains("托盘"));

    // 开托并装满后放行
    let pallet = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: None,
            destination: "WAREHOUSE".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();
    ctx.pallet_api
        .assign(AssignRequest {
            pallet_id: pallet.pallet_id.clone(),
            piece_type_id: piece_id.clone(),
            quantity: 24,
        })
        .unwrap();

    for stage in [
        "PALLET_CLOSE",
        "CUT_STOP",
        "BUFFER_SAW",
        "BUFFER_EDGE",   // 锯后直接进封边缓存(跳过转运)
        "BUFFER_DRILL",  // 跳过封边
        "BUFFER_ASSEMBLY", // 跳过钻孔
        "BUFFER_PACK",   // 跳过组装
        "PACK_START",
        "PACK_STOP",
        "BUFFER_SHIP",
    ] {
        let resp = change(&ctx, &order_id, stage, false);
        assert!(resp.success, "{} 应放行: {:?}", stage, resp.errors);
    }

    // 发运软守卫: 托盘未封闭 → 需确认
    let resp = change(&ctx, &order_id, "SHIP", false);
    assert!(!resp.success);
    assert!(resp.errors.is_empty());
    assert_eq!(resp.warnings.len(), 1);
    assert_eq!(resp.warnings[0].guard, "pallets_closed_before_ship");

    // force=true 放行,警告原样带回
    let resp = change(&ctx, &order_id, "SHIP", true);
    assert!(resp.success);
    assert_eq!(resp.warnings.len(), 1);

    // 全部装托完毕 → 完工守卫满足
    let resp = change(&ctx, &order_id, "COMPLETED", false);
    assert!(resp.success, "完工应放行: {:?}", resp.errors);

    let detail = ctx.order_api.get_order(&order_id).unwrap();
    assert_eq!(detail.order.stage, StageCode::Completed);
    assert!(detail.order.completed_at.is_some());

    // 流转日志逐笔可追溯: 13笔成功流转 + SHIP force + COMPLETED
    assert_eq!(detail.history.len(), 15);
    assert_eq!(
        ctx.repos.history_repo.count_by_order(&order_id).unwrap(),
        15
    );
}

// ==========================================
// 测试5: 守卫级别配置覆写
// ==========================================

#[test]
fn test_guard_severity_config_override() {
    let ctx = setup_test_env();

    // 现场要求: 发运前托盘必须全部封闭(硬阻断)
    ctx.config
        .set_global_config_value("guard_severity/pallets_closed_before_ship", "HARD")
        .unwrap();

    // 用覆写后的配置重建流转引擎
    let guards = panel_cutting_mes::engine::GuardRegistry::with_config(&ctx.config).unwrap();
    let engine = panel_cutting_mes::engine::StageTransitionEngine::new(
        std::sync::Arc::new(StageGraph::bundled()),
        guards,
        ctx.repos.clone(),
    );

    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-G7", 8);
    for stage in ["CUT_START", "PALLET_OPEN", "PALLET_PACK"] {
        change(&ctx, &order_id, stage, false);
    }
    let pallet = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: None,
            destination: "SHIPPING".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();
    ctx.pallet_api
        .assign(AssignRequest {
            pallet_id: pallet.pallet_id.clone(),
            piece_type_id: piece_id,
            quantity: 8,
        })
        .unwrap();
    for stage in [
        "PALLET_CLOSE",
        "CUT_STOP",
        "BUFFER_SAW",
        "BUFFER_EDGE",
        "BUFFER_DRILL",
        "BUFFER_ASSEMBLY",
        "BUFFER_PACK",
        "PACK_START",
        "PACK_STOP",
        "BUFFER_SHIP",
    ] {
        let resp = change(&ctx, &order_id, stage, false);
        assert!(resp.success, "{} 应放行: {:?}", stage, resp.errors);
    }

    // 覆写为 HARD 后, force 也无法放行
    let err = engine
        .change_stage(&order_id, StageCode::Ship, None, None, None, true)
        .unwrap_err();
    assert!(matches!(
        err,
        panel_cutting_mes::engine::EngineError::GuardFailed { .. }
    ));
}

// ==========================================
// 测试6: 外部策略源回退
// ==========================================

struct FailingSource;

#[async_trait]
impl StagePolicySource for FailingSource {
    async fn fetch_transition_table(&self) -> EngineResult<Vec<(String, Vec<String>)>> {
        Err(panel_cutting_mes::engine::EngineError::Connectivity(
            "连接被拒绝".to_string(),
        ))
    }
}

struct SlowSource;

#[async_trait]
impl StagePolicySource for SlowSource {
    async fn fetch_transition_table(&self) -> EngineResult<Vec<(String, Vec<String>)>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

struct CustomSource;

#[async_trait]
impl StagePolicySource for CustomSource {
    async fn fetch_transition_table(&self) -> EngineResult<Vec<(String, Vec<String>)>> {
        // 下发小写代码,装配时按大写归一化
        Ok(vec![
            ("new".to_string(), vec!["cancelled".to_string()]),
            ("cancelled".to_string(), vec![]),
        ])
    }
}

/// 回退表与内置表行为完全一致
fn assert_behaves_like_bundled(graph: &StageGraph) {
    let bundled = StageGraph::bundled();
    for stage in [
        StageCode::New,
        StageCode::PalletClose,
        StageCode::BufferEdge,
        StageCode::Ship,
        StageCode::Completed,
    ] {
        assert_eq!(graph.allowed_next(stage), bundled.allowed_next(stage));
    }
}

#[tokio::test]
async fn test_loader_falls_back_on_connectivity_error() {
    let loader =
        StageGraphLoader::with_source(Arc::new(FailingSource), Duration::from_millis(100));
    let graph = loader.load().await;
    assert_behaves_like_bundled(&graph);
}

#[tokio::test]
async fn test_loader_falls_back_on_timeout() {
    let loader = StageGraphLoader::with_source(Arc::new(SlowSource), Duration::from_millis(50));
    let graph = loader.load().await;
    assert_behaves_like_bundled(&graph);
}

#[tokio::test]
async fn test_loader_uses_external_table_when_reachable() {
    let loader =
        StageGraphLoader::with_source(Arc::new(CustomSource), Duration::from_millis(500));
    let graph = loader.load().await;

    assert!(graph.is_allowed(StageCode::New, StageCode::Cancelled));
    assert!(!graph.is_allowed(StageCode::New, StageCode::CutStart));
}
