// ==========================================
// 托盘业务接口集成测试
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use panel_cutting_mes::api::{
    ApiError, AssignRequest, CommitBatchRequest, CreatePalletRequest, DraftAssignmentRequest,
    DraftPalletRequest, PlanRequest,
};
use panel_cutting_mes::domain::types::{PalletDestination, PalletStatus};

use crate::test_helpers::{seed_order_single_piece, seed_order_two_colors, setup_test_env};

#[test]
fn test_create_pallet_validation() {
    let ctx = setup_test_env();
    let (order_id, position_id, _) = seed_order_single_piece(&ctx, "MO-T1", 10);

    // 未知目的地
    let err = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: None,
            destination: "MOON".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 限定排料位的托盘
    let pallet = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id: order_id.clone(),
            position_id: Some(position_id.clone()),
            destination: "DRILLER".to_string(),
            max_weight_kg: Some(500.0),
            max_height_mm: Some(1200.0),
        })
        .unwrap();
    assert_eq!(pallet.destination, PalletDestination::Driller);
    assert_eq!(pallet.status, PalletStatus::Draft);
    assert_eq!(pallet.pallet_no, 1);
    assert_eq!(pallet.position_id.as_deref(), Some(position_id.as_str()));

    // 订单内显示编号递增
    let second = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id,
            position_id: None,
            destination: "WAREHOUSE".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();
    assert_eq!(second.pallet_no, 2);
}

#[test]
fn test_position_scoped_pallet_rejects_foreign_pieces() {
    let ctx = setup_test_env();
    let (order_id, white_id, walnut_id) = seed_order_two_colors(&ctx, "MO-T2", 10, 10);

    // 白橡排料位
    let detail = ctx.order_api.get_order(&order_id).unwrap();
    let white_position = detail
        .positions
        .iter()
        .find(|p| p.piece_types.iter().any(|t| t.piece_type_id == white_id))
        .unwrap()
        .position
        .position_id
        .clone();

    let pallet = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id,
            position_id: Some(white_position),
            destination: "WAREHOUSE".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();

    // 胡桃板件不属于该排料位 → 拒绝
    let err = ctx
        .pallet_api
        .assign(AssignRequest {
            pallet_id: pallet.pallet_id.clone(),
            piece_type_id: walnut_id,
            quantity: 1,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 白橡板件正常
    ctx.pallet_api
        .assign(AssignRequest {
            pallet_id: pallet.pallet_id,
            piece_type_id: white_id,
            quantity: 5,
        })
        .unwrap();
}

#[test]
fn test_commit_batch_via_api() {
    let ctx = setup_test_env();
    let (order_id, white_id, walnut_id) = seed_order_two_colors(&ctx, "MO-T3", 20, 10);

    let resp = ctx
        .pallet_api
        .commit_batch(CommitBatchRequest {
            order_id: order_id.clone(),
            pallets: vec![
                DraftPalletRequest {
                    position_id: None,
                    destination: "WAREHOUSE".to_string(),
                    max_weight_kg: None,
                    max_height_mm: None,
                    assignments: vec![
                        DraftAssignmentRequest {
                            piece_type_id: white_id.clone(),
                            quantity: 20,
                        },
                        DraftAssignmentRequest {
                            piece_type_id: walnut_id.clone(),
                            quantity: 4,
                        },
                    ],
                },
                // 空托盘 → 跳过
                DraftPalletRequest {
                    position_id: None,
                    destination: "WAREHOUSE".to_string(),
                    max_weight_kg: None,
                    max_height_mm: None,
                    assignments: vec![],
                },
            ],
        })
        .unwrap();

    assert!(resp.success);
    assert_eq!(resp.created_pallet_ids.len(), 1);
    assert_eq!(resp.skipped_empty, 1);

    assert_eq!(ctx.allocation.available(&white_id, None).unwrap(), 0);
    assert_eq!(ctx.allocation.available(&walnut_id, None).unwrap(), 6);

    // 超量批次 → 落库冲突
    let err = ctx
        .pallet_api
        .commit_batch(CommitBatchRequest {
            order_id,
            pallets: vec![DraftPalletRequest {
                position_id: None,
                destination: "WAREHOUSE".to_string(),
                max_weight_kg: None,
                max_height_mm: None,
                assignments: vec![DraftAssignmentRequest {
                    piece_type_id: walnut_id,
                    quantity: 7,
                }],
            }],
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::AllocationConflict(_)));
}

#[test]
fn test_plan_then_commit_planned_via_api() {
    let ctx = setup_test_env();
    let (order_id, white_id, walnut_id) = seed_order_two_colors(&ctx, "MO-T4", 15, 9);

    let plan = ctx
        .pallet_api
        .plan(PlanRequest {
            order_id: order_id.clone(),
            strategy: None, // 缺省 intelligent
            destination: None,
            limits: None,
        })
        .unwrap();
    assert_eq!(plan.strategy, "intelligent");
    assert_eq!(plan.total_assigned, 24);

    let resp = ctx
        .pallet_api
        .commit_planned(&order_id, plan.pallets)
        .unwrap();
    assert!(resp.success);
    assert!(!resp.created_pallet_ids.is_empty());

    assert_eq!(ctx.allocation.available(&white_id, None).unwrap(), 0);
    assert_eq!(ctx.allocation.available(&walnut_id, None).unwrap(), 0);
}

#[test]
fn test_assign_rejects_non_positive_quantity() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-T5", 10);
    let pallet = ctx
        .pallet_api
        .create_pallet(CreatePalletRequest {
            order_id,
            position_id: None,
            destination: "WAREHOUSE".to_string(),
            max_weight_kg: None,
            max_height_mm: None,
        })
        .unwrap();

    for qty in [0_i64, -5] {
        let err = ctx
            .pallet_api
            .assign(AssignRequest {
                pallet_id: pallet.pallet_id.clone(),
                piece_type_id: piece_id.clone(),
                quantity: qty,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
