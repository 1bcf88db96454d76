// ==========================================
// 板件切割生产跟踪系统 - 批量落库协调器
// ==========================================
// 职责: 按订单串行化批量落库,落库前基于持久化状态复核可装数量
// 红线: 会话期间累计的客户端余量不可信;复核不通过整批拒绝,绝不截断
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::types::PalletStatus;
use crate::engine::availability::AvailabilityCore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::planner::PlannedPallet;
use crate::engine::repositories::TrackingRepositories;

// ==========================================
// OrderLockRegistry - 订单级互斥锁注册表
// ==========================================
// 同一订单的装托变更与批量落库共用一把锁;
// 只读查询(可装数量/托盘列表)不加锁。
#[derive(Default)]
pub struct OrderLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某订单的互斥锁(按需创建)
    ///
    /// 注册表自身被毒化时直接接管内部状态,锁映射仍然可用。
    pub fn lock_for(&self, order_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// 持有订单锁执行闭包
pub(crate) fn with_order_lock<T>(
    registry: &OrderLockRegistry,
    order_id: &str,
    f: impl FnOnce() -> EngineResult<T>,
) -> EngineResult<T> {
    let lock = registry.lock_for(order_id);
    let _guard: MutexGuard<'_, ()> = lock
        .lock()
        .map_err(|e| EngineError::AllocationConflict {
            order_id: order_id.to_string(),
            detail: format!("订单锁获取失败: {}", e),
        })?;
    f()
}

// ==========================================
// CommitOutcome - 落库结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub order_id: String,
    /// 创建的托盘ID(按落库顺序)
    pub created_pallet_ids: Vec<String>,
    /// 因无装载明细被跳过的托盘数
    pub skipped_empty: usize,
}

// ==========================================
// CommitCoordinator - 批量落库协调器
// ==========================================
pub struct CommitCoordinator {
    repos: TrackingRepositories,
    locks: Arc<OrderLockRegistry>,
}

impl CommitCoordinator {
    /// 创建新的落库协调器
    pub fn new(repos: TrackingRepositories, locks: Arc<OrderLockRegistry>) -> Self {
        Self { repos, locks }
    }

    /// 批量落库(全有或全无)
    ///
    /// # 规则
    /// 1. 仅落库带至少一条装载明细的托盘,空托盘计入 skipped_empty
    /// 2. 持有订单锁后,从持久化状态重新推导每个板件规格的可装数量
    /// 3. 任一规格的批内请求量超过复核后的可装数量 → AllocationConflict,整批失败
    /// 4. 写入经由仓储的单事务完成
    pub fn commit_batch(
        &self,
        order_id: &str,
        pallets: Vec<PlannedPallet>,
    ) -> EngineResult<CommitOutcome> {
        // 订单存在性检查
        let order = self
            .repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            })?;

        let total = pallets.len();
        let non_empty: Vec<PlannedPallet> = pallets
            .into_iter()
            .filter(|p| !p.assignments.is_empty())
            .collect();
        let skipped_empty = total - non_empty.len();

        for planned in &non_empty {
            if planned.pallet.order_id != order_id {
                return Err(EngineError::Validation(format!(
                    "托盘{}不属于订单{}",
                    planned.pallet.pallet_id, order_id
                )));
            }
            for a in &planned.assignments {
                if a.quantity <= 0 {
                    return Err(EngineError::Validation(format!(
                        "装载明细数量必须大于0: piece_type={}",
                        a.piece_type_id
                    )));
                }
            }
        }

        with_order_lock(&self.locks, order_id, || {
            // 批内按板件规格汇总请求量
            let mut requested: HashMap<String, i64> = HashMap::new();
            for planned in &non_empty {
                for a in &planned.assignments {
                    *requested.entry(a.piece_type_id.clone()).or_insert(0) += a.quantity;
                }
            }

            // 以持久化状态为准复核可装数量
            for (piece_type_id, total_requested) in &requested {
                let piece = self
                    .repos
                    .piece_type_repo
                    .find_by_id(piece_type_id)?
                    .ok_or_else(|| EngineError::NotFound {
                        entity: "PieceType".to_string(),
                        id: piece_type_id.clone(),
                    })?;

                let position = self
                    .repos
                    .position_repo
                    .find_by_id(&piece.position_id)?
                    .ok_or_else(|| EngineError::NotFound {
                        entity: "Position".to_string(),
                        id: piece.position_id.clone(),
                    })?;
                if position.order_id != order_id {
                    return Err(EngineError::Validation(format!(
                        "板件规格{}不属于订单{}",
                        piece_type_id, order_id
                    )));
                }

                let assigned = self.repos.pallet_repo.assigned_total(piece_type_id, None)?;
                let available = AvailabilityCore::available_quantity(
                    piece.planned_qty,
                    piece.damaged_qty,
                    assigned,
                );

                if *total_requested > available {
                    return Err(EngineError::AllocationConflict {
                        order_id: order_id.to_string(),
                        detail: format!(
                            "板件规格{}批内请求{}件, 复核后仅剩{}件可装",
                            piece_type_id,
                            total_requested,
                            available.max(0)
                        ),
                    });
                }
            }

            // 单事务落库; 草稿托盘落库即转为 OPEN
            let prepared: Vec<_> = non_empty
                .iter()
                .map(|p| {
                    let mut pallet = p.pallet.clone();
                    if pallet.status == PalletStatus::Draft {
                        pallet.status = PalletStatus::Open;
                    }
                    (pallet, p.assignments.clone())
                })
                .collect();
            let created_pallet_ids = self.repos.pallet_repo.apply_batch(order_id, &prepared)?;

            tracing::info!(
                order_no = %order.order_no,
                committed = created_pallet_ids.len(),
                skipped_empty,
                "托盘批次落库完成"
            );

            Ok(CommitOutcome {
                order_id: order_id.to_string(),
                created_pallet_ids,
                skipped_empty,
            })
        })
    }
}
