// ==========================================
// 批量落库并发控制测试
// ==========================================
// 职责: 验证同订单落库串行化与落库时的余量复核
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use std::sync::Arc;
use std::thread;

use chrono::Local;
use uuid::Uuid;

use panel_cutting_mes::domain::pallet::{Pallet, PalletPieceAssignment, PalletStats};
use panel_cutting_mes::domain::types::{PalletDestination, PalletStatus};
use panel_cutting_mes::engine::{EngineError, PlannedPallet};

use crate::test_helpers::{seed_order_single_piece, setup_test_env};

/// 构造一个待落库的草稿托盘
fn draft_pallet(order_id: &str, piece_type_id: &str, quantity: i64) -> PlannedPallet {
    let pallet_id = Uuid::new_v4().to_string();
    PlannedPallet {
        pallet: Pallet {
            pallet_id: pallet_id.clone(),
            pallet_no: 0,
            order_id: order_id.to_string(),
            position_id: None,
            destination: PalletDestination::Warehouse,
            status: PalletStatus::Open,
            max_weight_kg: 1000.0,
            max_height_mm: 1800.0,
            closed_weight_kg: None,
            closed_height_mm: None,
            closed_at: None,
            created_at: Local::now().naive_local(),
        },
        assignments: vec![PalletPieceAssignment {
            pallet_id,
            piece_type_id: piece_type_id.to_string(),
            quantity,
        }],
        stats: PalletStats::empty(),
    }
}

/// 空托盘(无装载明细)
fn empty_pallet(order_id: &str) -> PlannedPallet {
    let mut planned = draft_pallet(order_id, "unused", 1);
    planned.assignments.clear();
    planned
}

// ==========================================
// 测试1: 并发落库恰好一方胜出 (规格场景)
// ==========================================

#[test]
fn test_concurrent_commits_exactly_one_wins() {
    let ctx = setup_test_env();
    // 仅剩最后10件
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-C1", 10);

    let coordinator = ctx.coordinator.clone();
    let mut handles = Vec::new();
    for _ in 0..2 {
        let coordinator = Arc::clone(&coordinator);
        let order_id = order_id.clone();
        let piece_id = piece_id.clone();
        handles.push(thread::spawn(move || {
            let batch = vec![draft_pallet(&order_id, &piece_id, 10)];
            coordinator.commit_batch(&order_id, batch)
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    let conflict_count = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::AllocationConflict { .. })))
        .count();

    assert_eq!(ok_count, 1, "恰好一次落库成功");
    assert_eq!(conflict_count, 1, "另一次必须收到落库冲突");

    // 最终占用不超过计划量
    let assigned = ctx.repos.pallet_repo.assigned_total(&piece_id, None).unwrap();
    assert_eq!(assigned, 10);
    assert_eq!(ctx.allocation.available(&piece_id, None).unwrap(), 0);
}

// ==========================================
// 测试2: 空托盘跳过,不落库
// ==========================================

#[test]
fn test_commit_skips_empty_pallets() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-C2", 20);

    let batch = vec![
        empty_pallet(&order_id),
        draft_pallet(&order_id, &piece_id, 8),
        empty_pallet(&order_id),
    ];
    let outcome = ctx.coordinator.commit_batch(&order_id, batch).unwrap();

    assert_eq!(outcome.created_pallet_ids.len(), 1);
    assert_eq!(outcome.skipped_empty, 2);

    let pallets = ctx.repos.pallet_repo.find_by_order(&order_id).unwrap();
    assert_eq!(pallets.len(), 1);
}

// ==========================================
// 测试3: 全有或全无
// ==========================================

#[test]
fn test_commit_is_all_or_nothing() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-C3", 10);

    // 第一托合法,第二托超量 → 整批拒绝
    let batch = vec![
        draft_pallet(&order_id, &piece_id, 6),
        draft_pallet(&order_id, &piece_id, 6),
    ];
    let err = ctx.coordinator.commit_batch(&order_id, batch).unwrap_err();
    assert!(matches!(err, EngineError::AllocationConflict { .. }));

    // 没有任何托盘/装载明细落库
    assert!(ctx
        .repos
        .pallet_repo
        .find_by_order(&order_id)
        .unwrap()
        .is_empty());
    assert_eq!(ctx.allocation.available(&piece_id, None).unwrap(), 10);
}

// ==========================================
// 测试4: 跨订单板件拒绝
// ==========================================

#[test]
fn test_commit_rejects_foreign_pieces() {
    let ctx = setup_test_env();
    let (order_a, _, _) = seed_order_single_piece(&ctx, "MO-C4A", 10);
    let (_order_b, _, piece_b) = seed_order_single_piece(&ctx, "MO-C4B", 10);

    let batch = vec![draft_pallet(&order_a, &piece_b, 5)];
    let err = ctx.coordinator.commit_batch(&order_a, batch).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// ==========================================
// 测试5: 落库与手工装托共用订单锁
// ==========================================

#[test]
fn test_manual_assign_races_with_commit() {
    let ctx = setup_test_env();
    let (order_id, _, piece_id) = seed_order_single_piece(&ctx, "MO-C5", 10);

    let pallet = ctx
        .allocation
        .create_pallet(
            &order_id,
            None,
            PalletDestination::Warehouse,
            panel_cutting_mes::domain::pallet::PalletLimits::default(),
        )
        .unwrap();

    let allocation = ctx.allocation.clone();
    let coordinator = ctx.coordinator.clone();

    let assign_handle = {
        let pallet_id = pallet.pallet_id.clone();
        let piece_id = piece_id.clone();
        thread::spawn(move || allocation.assign(&pallet_id, &piece_id, 10))
    };
    let commit_handle = {
        let order_id = order_id.clone();
        let piece_id = piece_id.clone();
        thread::spawn(move || {
            let batch = vec![draft_pallet(&order_id, &piece_id, 10)];
            coordinator.commit_batch(&order_id, batch)
        })
    };

    let assign_result = assign_handle.join().unwrap();
    let commit_result = commit_handle.join().unwrap();

    // 两条路径同锁串行 → 恰好一方拿到最后10件
    assert!(
        assign_result.is_ok() ^ commit_result.is_ok(),
        "恰好一方成功: assign={:?}, commit={:?}",
        assign_result.is_ok(),
        commit_result.is_ok()
    );

    let assigned = ctx.repos.pallet_repo.assigned_total(&piece_id, None).unwrap();
    assert_eq!(assigned, 10);
}
