// ==========================================
// 板件切割生产跟踪系统 - 自动分托引擎
// ==========================================
// 职责: 按策略将订单的全部未装托余量生成草稿托盘(不落库)
// 红线: 草稿结果必须满足可装数量不变量;落库经由批量落库协调器复核
// ==========================================

mod core;

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ConfigManager;
use crate::domain::pallet::{Pallet, PalletLimits, PalletPieceAssignment, PalletStats};
use crate::domain::types::{PalletDestination, PalletStatus};
use crate::engine::availability::AvailabilityCore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::repositories::TrackingRepositories;
use crate::engine::stats::{PalletStatsCalculator, StatsPolicy};
use crate::engine::strategy::PlanningStrategy;

pub use self::core::PackInput;

// ==========================================
// PlannedPallet - 草稿托盘
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPallet {
    pub pallet: Pallet,
    pub assignments: Vec<PalletPieceAssignment>,
    pub stats: PalletStats,
}

// ==========================================
// PlanResult - 分托试算结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    pub order_id: String,
    pub strategy: PlanningStrategy,
    pub pallets: Vec<PlannedPallet>,
    /// 本次方案覆盖的总件数(= 试算前的未装托余量合计)
    pub total_assigned: i64,
}

// ==========================================
// AutoPlanner - 自动分托引擎
// ==========================================
pub struct AutoPlanner {
    repos: TrackingRepositories,
    config: Arc<ConfigManager>,
}

impl AutoPlanner {
    /// 创建新的自动分托引擎
    pub fn new(repos: TrackingRepositories, config: Arc<ConfigManager>) -> Self {
        Self { repos, config }
    }

    /// 自动分托试算
    ///
    /// 为订单当前全部未装托余量生成零或多个草稿托盘。
    /// 结果不落库;确认后经 CommitCoordinator::commit_batch 提交。
    pub fn plan_automatic(
        &self,
        order_id: &str,
        strategy: PlanningStrategy,
        limits: PalletLimits,
        destination: PalletDestination,
    ) -> EngineResult<PlanResult> {
        let order = self
            .repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            })?;
        if order.is_terminal() {
            return Err(EngineError::Validation(format!(
                "终态订单不允许自动分托: {}",
                order.order_no
            )));
        }
        if limits.max_weight_kg <= 0.0 || limits.max_height_mm <= 0.0 {
            return Err(EngineError::Validation(
                "托盘载重与堆高上限必须大于0".to_string(),
            ));
        }

        let policy = StatsPolicy::from_config(&self.config)
            .map_err(|e| EngineError::Config(e.to_string()))?;

        // 采集未装托余量
        let pieces = self.repos.piece_type_repo.find_by_order(order_id)?;
        let mut inputs = Vec::new();
        for piece in pieces {
            let assigned = self
                .repos
                .pallet_repo
                .assigned_total(&piece.piece_type_id, None)?;
            let available = AvailabilityCore::available_quantity(
                piece.planned_qty,
                piece.damaged_qty,
                assigned,
            );
            if available > 0 {
                inputs.push(PackInput {
                    piece,
                    qty: available,
                });
            }
        }

        let total_assigned: i64 = inputs.iter().map(|i| i.qty).sum();
        let packed = core::pack(strategy, &policy, &limits, inputs);

        let now = Local::now().naive_local();
        let pallets = packed
            .into_iter()
            .map(|p| {
                let pallet_id = Uuid::new_v4().to_string();
                let assignments = p
                    .entries
                    .iter()
                    .map(|e| PalletPieceAssignment {
                        pallet_id: pallet_id.clone(),
                        piece_type_id: e.piece_type_id.clone(),
                        quantity: e.quantity,
                    })
                    .collect();
                let stats = PalletStats {
                    weight_kg: p.weight_kg,
                    height_mm: p.height_mm,
                    piece_count: p.entries.iter().map(|e| e.quantity).sum(),
                    utilization_pct: PalletStatsCalculator::utilization_pct(
                        p.weight_kg,
                        p.height_mm,
                        limits.max_weight_kg,
                        limits.max_height_mm,
                    ),
                };
                PlannedPallet {
                    pallet: Pallet {
                        pallet_id,
                        pallet_no: 0, // 落库时按订单内序号分配
                        order_id: order_id.to_string(),
                        position_id: None,
                        destination,
                        status: PalletStatus::Draft,
                        max_weight_kg: limits.max_weight_kg,
                        max_height_mm: limits.max_height_mm,
                        closed_weight_kg: None,
                        closed_height_mm: None,
                        closed_at: None,
                        created_at: now,
                    },
                    assignments,
                    stats,
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            order_no = %order.order_no,
            strategy = strategy.as_str(),
            pallets = pallets.len(),
            total_assigned,
            "自动分托试算完成"
        );

        Ok(PlanResult {
            order_id: order_id.to_string(),
            strategy,
            pallets,
            total_assigned,
        })
    }
}
