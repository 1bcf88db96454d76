// ==========================================
// 订单业务接口集成测试
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use panel_cutting_mes::api::{
    AddPositionRequest, ApiError, ChangeStatusRequest, CreateOrderRequest, NewPieceTypeRequest,
    UpdateOrderRequest,
};
use panel_cutting_mes::domain::types::StageCode;

use crate::test_helpers::{seed_order_single_piece, setup_test_env};

fn position_req() -> AddPositionRequest {
    AddPositionRequest {
        material_name: "18mm颗粒板".to_string(),
        color: "白橡".to_string(),
        plate_count: 2,
        layout_ref: None,
        piece_types: vec![NewPieceTypeRequest {
            length_mm: 600.0,
            width_mm: 400.0,
            thickness_mm: 18.0,
            planned_qty: 10,
            color: "白橡".to_string(),
            edging_required: false,
        }],
    }
}

#[test]
fn test_create_order_validation() {
    let ctx = setup_test_env();

    // 工单号为空
    let err = ctx
        .order_api
        .create_order(CreateOrderRequest {
            order_no: "  ".to_string(),
            customer_name: "客户".to_string(),
            priority: 5,
            comment: None,
            planned_at: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 优先级越界
    let err = ctx
        .order_api
        .create_order(CreateOrderRequest {
            order_no: "MO-O1".to_string(),
            customer_name: "客户".to_string(),
            priority: 11,
            comment: None,
            planned_at: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 正常创建
    let order = ctx
        .order_api
        .create_order(CreateOrderRequest {
            order_no: "MO-O1".to_string(),
            customer_name: "客户".to_string(),
            priority: 7,
            comment: Some("加急".to_string()),
            planned_at: None,
        })
        .unwrap();
    assert_eq!(order.stage, StageCode::New);
    assert_eq!(order.priority, 7);

    // 工单号重复
    let err = ctx
        .order_api
        .create_order(CreateOrderRequest {
            order_no: "MO-O1".to_string(),
            customer_name: "另一客户".to_string(),
            priority: 5,
            comment: None,
            planned_at: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_update_order_fields_not_stage() {
    let ctx = setup_test_env();
    let (order_id, _, _) = seed_order_single_piece(&ctx, "MO-O2", 10);

    let updated = ctx
        .order_api
        .update_order(
            &order_id,
            UpdateOrderRequest {
                priority: Some(9),
                customer_name: Some("新客户".to_string()),
                comment: Some("改单".to_string()),
                planned_at: None,
            },
        )
        .unwrap();
    assert_eq!(updated.priority, 9);
    assert_eq!(updated.customer_name, "新客户");
    // 阶段不经此路径变化
    assert_eq!(updated.stage, StageCode::New);
}

#[test]
fn test_positions_frozen_after_leaving_new() {
    let ctx = setup_test_env();
    let (order_id, position_id, _) = seed_order_single_piece(&ctx, "MO-O3", 10);

    let resp = ctx
        .order_api
        .change_status(
            &order_id,
            ChangeStatusRequest {
                target_stage: "CUT_START".to_string(),
                operator: None,
                location: None,
                comment: None,
                force: false,
            },
        )
        .unwrap();
    assert!(resp.success);

    // 离开 NEW 后排料位冻结
    let err = ctx
        .order_api
        .add_position(&order_id, position_req())
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let err = ctx.order_api.delete_position(&position_id).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_delete_position_blocked_by_assignments() {
    let ctx = setup_test_env();
    let (order_id, position_id, piece_id) = seed_order_single_piece(&ctx, "MO-O4", 10);

    let pallet = ctx
        .pallet_api
        .create_pallet(panel_cutting_mes::api::CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: None,
            destination: "WAREHOUSE".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();
    ctx.pallet_api
        .assign(panel_cutting_mes::api::AssignRequest {
            pallet_id: pallet.pallet_id.clone(),
            piece_type_id: piece_id.clone(),
            quantity: 3,
        })
        .unwrap();

    // 板件仍在托盘上 → 拒绝删除
    let err = ctx.order_api.delete_position(&position_id).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    // 卸托后允许删除
    ctx.pallet_api.unassign(&pallet.pallet_id, &piece_id).unwrap();
    ctx.order_api.delete_position(&position_id).unwrap();
}

#[test]
fn test_delete_order_cascades() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-O5", 10);

    let pallet = ctx
        .pallet_api
        .create_pallet(panel_cutting_mes::api::CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: None,
            destination: "WAREHOUSE".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();
    ctx.pallet_api
        .assign(panel_cutting_mes::api::AssignRequest {
            pallet_id: pallet.pallet_id.clone(),
            piece_type_id: piece_id,
            quantity: 5,
        })
        .unwrap();

    ctx.order_api.delete_order(&order_id).unwrap();

    // 级联后一干二净
    assert!(ctx.repos.order_repo.find_by_id(&order_id).unwrap().is_none());
    assert!(ctx.repos.pallet_repo.find_by_order(&order_id).unwrap().is_empty());
    assert!(ctx
        .repos
        .position_repo
        .find_by_order(&order_id)
        .unwrap()
        .is_empty());
    assert!(ctx
        .repos
        .history_repo
        .find_by_order(&order_id)
        .unwrap()
        .is_empty());
}

#[test]
fn test_get_order_detail_shape() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-O6", 16);

    let pallet = ctx
        .pallet_api
        .create_pallet(panel_cutting_mes::api::CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: None,
            destination: "EDGER".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();
    ctx.pallet_api
        .assign(panel_cutting_mes::api::AssignRequest {
            pallet_id: pallet.pallet_id.clone(),
            piece_type_id: piece_id,
            quantity: 16,
        })
        .unwrap();

    let detail = ctx.order_api.get_order(&order_id).unwrap();
    assert_eq!(detail.order.order_no, "MO-O6");
    assert_eq!(detail.positions.len(), 1);
    assert_eq!(detail.positions[0].piece_types.len(), 1);
    assert_eq!(detail.pallets.len(), 1);
    assert_eq!(detail.pallets[0].assignments.len(), 1);
    assert_eq!(detail.pallets[0].stats.piece_count, 16);
    assert!(detail.history.is_empty());
}

#[test]
fn test_unknown_stage_code_is_invalid_input() {
    let ctx = setup_test_env();
    let (order_id, _, _) = seed_order_single_piece(&ctx, "MO-O7", 10);

    let err = ctx
        .order_api
        .change_status(
            &order_id,
            ChangeStatusRequest {
                target_stage: "WARP_DRIVE".to_string(),
                operator: None,
                location: None,
                comment: None,
                force: false,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}
