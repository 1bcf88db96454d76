// ==========================================
// 板件切割生产跟踪系统 - 托盘业务接口
// ==========================================
// 职责: 托盘生命周期、装托操作、自动分托与批量落库的门面
// ==========================================

use chrono::Local;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::api::{
    AssignRequest, CommitBatchRequest, CommitBatchResponse, CreatePalletRequest,
    DeletePalletsResponse, PalletOpResponse, PlanRequest, PlanResponse, SetQuantityRequest,
    TransferRequest,
};
use crate::domain::pallet::{Pallet, PalletLimits, PalletPieceAssignment};
use crate::domain::types::{PalletDestination, PalletStatus};
use crate::engine::allocation::{PalletAllocationEngine, PieceAvailability};
use crate::engine::commit::CommitCoordinator;
use crate::engine::planner::{AutoPlanner, PlannedPallet};
use crate::engine::repositories::TrackingRepositories;
use crate::engine::stats::PalletStatsCalculator;
use crate::i18n::{t, t_with_args};

// ==========================================
// PalletApi - 托盘业务接口
// ==========================================
pub struct PalletApi {
    repos: TrackingRepositories,
    allocation: Arc<PalletAllocationEngine>,
    planner: Arc<AutoPlanner>,
    coordinator: Arc<CommitCoordinator>,
}

impl PalletApi {
    /// 创建新的 PalletApi 实例
    pub fn new(
        repos: TrackingRepositories,
        allocation: Arc<PalletAllocationEngine>,
        planner: Arc<AutoPlanner>,
        coordinator: Arc<CommitCoordinator>,
    ) -> Self {
        Self {
            repos,
            allocation,
            planner,
            coordinator,
        }
    }

    // ==========================================
    // 托盘生命周期
    // ==========================================

    /// 手工开托
    pub fn create_pallet(&self, req: CreatePalletRequest) -> ApiResult<Pallet> {
        validator::require_non_empty("订单ID", &req.order_id)?;
        let destination = validator::parse_destination(&req.destination)?;
        let limits = Self::limits_from(req.max_weight_kg, req.max_height_mm)?;

        let pallet = self.allocation.create_pallet(
            &req.order_id,
            req.position_id.as_deref(),
            destination,
            limits,
        )?;
        Ok(pallet)
    }

    /// 封托: 冻结统计快照
    pub fn close(&self, pallet_id: &str) -> ApiResult<PalletOpResponse> {
        validator::require_non_empty("托盘ID", pallet_id)?;
        let stats = self.allocation.close(pallet_id)?;
        Ok(PalletOpResponse {
            success: true,
            message: t("pallet.closed"),
            stats,
            warnings: Vec::new(),
        })
    }

    /// 删除托盘
    pub fn delete(&self, pallet_id: &str) -> ApiResult<DeletePalletsResponse> {
        validator::require_non_empty("托盘ID", pallet_id)?;
        self.allocation.delete(pallet_id)?;
        Ok(DeletePalletsResponse {
            success: true,
            message: t("common.deleted"),
            deleted: 1,
        })
    }

    /// 批量删除订单托盘
    pub fn delete_all(&self, order_id: &str, only_empty: bool) -> ApiResult<DeletePalletsResponse> {
        validator::require_non_empty("订单ID", order_id)?;
        let deleted = self.allocation.delete_all(order_id, only_empty)?;
        Ok(DeletePalletsResponse {
            success: true,
            message: t("common.deleted"),
            deleted,
        })
    }

    // ==========================================
    // 装托操作
    // ==========================================

    /// 手工装托
    pub fn assign(&self, req: AssignRequest) -> ApiResult<PalletOpResponse> {
        validator::require_non_empty("托盘ID", &req.pallet_id)?;
        validator::require_non_empty("板件规格ID", &req.piece_type_id)?;
        validator::require_positive_qty("装托数量", req.quantity)?;

        let outcome = self
            .allocation
            .assign(&req.pallet_id, &req.piece_type_id, req.quantity)?;
        Ok(PalletOpResponse {
            success: true,
            message: t("pallet.assigned"),
            stats: outcome.stats,
            warnings: outcome.warnings,
        })
    }

    /// 卸托
    pub fn unassign(&self, pallet_id: &str, piece_type_id: &str) -> ApiResult<PalletOpResponse> {
        validator::require_non_empty("托盘ID", pallet_id)?;
        validator::require_non_empty("板件规格ID", piece_type_id)?;

        let stats = self.allocation.unassign(pallet_id, piece_type_id)?;
        Ok(PalletOpResponse {
            success: true,
            message: t("pallet.unassigned"),
            stats,
            warnings: Vec::new(),
        })
    }

    /// 覆写装托数量
    pub fn set_quantity(&self, req: SetQuantityRequest) -> ApiResult<PalletOpResponse> {
        validator::require_non_empty("托盘ID", &req.pallet_id)?;
        validator::require_non_empty("板件规格ID", &req.piece_type_id)?;

        let outcome =
            self.allocation
                .set_quantity(&req.pallet_id, &req.piece_type_id, req.new_quantity)?;
        Ok(PalletOpResponse {
            success: true,
            message: t("common.success"),
            stats: outcome.stats,
            warnings: outcome.warnings,
        })
    }

    /// 一键装满
    pub fn assign_all_remaining(&self, pallet_id: &str) -> ApiResult<PalletOpResponse> {
        validator::require_non_empty("托盘ID", pallet_id)?;

        let outcome = self.allocation.assign_all_remaining(pallet_id)?;
        Ok(PalletOpResponse {
            success: true,
            message: t("pallet.assigned"),
            stats: outcome.stats,
            warnings: outcome.warnings,
        })
    }

    /// 托盘间转移
    pub fn transfer(&self, req: TransferRequest) -> ApiResult<PalletOpResponse> {
        validator::require_non_empty("源托盘ID", &req.from_pallet_id)?;
        validator::require_non_empty("目标托盘ID", &req.to_pallet_id)?;
        validator::require_non_empty("板件规格ID", &req.piece_type_id)?;
        validator::require_positive_qty("转移数量", req.quantity)?;

        let outcome = self.allocation.transfer(
            &req.from_pallet_id,
            &req.to_pallet_id,
            &req.piece_type_id,
            req.quantity,
        )?;
        Ok(PalletOpResponse {
            success: true,
            message: t("pallet.transferred"),
            stats: outcome.stats,
            warnings: outcome.warnings,
        })
    }

    /// 排料位的板件可装数量视图(实时)
    pub fn available_pieces(&self, position_id: &str) -> ApiResult<Vec<PieceAvailability>> {
        validator::require_non_empty("排料位ID", position_id)?;
        Ok(self.allocation.available_pieces_for_position(position_id)?)
    }

    // ==========================================
    // 自动分托与批量落库
    // ==========================================

    /// 自动分托试算(不落库)
    pub fn plan(&self, req: PlanRequest) -> ApiResult<PlanResponse> {
        validator::require_non_empty("订单ID", &req.order_id)?;
        let strategy = validator::parse_strategy(req.strategy.as_deref())?;
        let destination = match req.destination.as_deref() {
            Some(raw) => validator::parse_destination(raw)?,
            None => PalletDestination::Warehouse,
        };
        let limits = req.limits.unwrap_or_default();

        let result = self
            .planner
            .plan_automatic(&req.order_id, strategy, limits, destination)?;
        Ok(PlanResponse {
            success: true,
            message: t_with_args(
                "pallet.planned",
                &[("count", &result.pallets.len().to_string())],
            ),
            strategy: strategy.as_str().to_string(),
            total_assigned: result.total_assigned,
            pallets: result.pallets,
        })
    }

    /// 批量落库(手工构建的托盘集合)
    pub fn commit_batch(&self, req: CommitBatchRequest) -> ApiResult<CommitBatchResponse> {
        validator::require_non_empty("订单ID", &req.order_id)?;

        let policy = self.allocation.stats_policy()?;
        let now = Local::now().naive_local();

        let mut planned = Vec::with_capacity(req.pallets.len());
        for draft in req.pallets {
            let destination = validator::parse_destination(&draft.destination)?;
            let limits = Self::limits_from(draft.max_weight_kg, draft.max_height_mm)?;
            let pallet_id = Uuid::new_v4().to_string();

            let mut assignments = Vec::with_capacity(draft.assignments.len());
            let mut items = Vec::with_capacity(draft.assignments.len());
            for a in draft.assignments {
                validator::require_positive_qty("装载数量", a.quantity)?;
                let piece = self
                    .repos
                    .piece_type_repo
                    .find_by_id(&a.piece_type_id)?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("板件规格{}不存在", a.piece_type_id))
                    })?;
                items.push((piece, a.quantity));
                assignments.push(PalletPieceAssignment {
                    pallet_id: pallet_id.clone(),
                    piece_type_id: a.piece_type_id,
                    quantity: a.quantity,
                });
            }

            let refs: Vec<_> = items.iter().map(|(p, q)| (p, *q)).collect();
            let stats = PalletStatsCalculator::compute(
                &policy,
                &refs,
                limits.max_weight_kg,
                limits.max_height_mm,
            );

            planned.push(PlannedPallet {
                pallet: Pallet {
                    pallet_id,
                    pallet_no: 0,
                    order_id: req.order_id.clone(),
                    position_id: draft.position_id,
                    destination,
                    status: PalletStatus::Open,
                    max_weight_kg: limits.max_weight_kg,
                    max_height_mm: limits.max_height_mm,
                    closed_weight_kg: None,
                    closed_height_mm: None,
                    closed_at: None,
                    created_at: now,
                },
                assignments,
                stats,
            });
        }

        let outcome = self.coordinator.commit_batch(&req.order_id, planned)?;
        Ok(CommitBatchResponse {
            success: true,
            message: t_with_args(
                "pallet.committed",
                &[("count", &outcome.created_pallet_ids.len().to_string())],
            ),
            created_pallet_ids: outcome.created_pallet_ids,
            skipped_empty: outcome.skipped_empty,
        })
    }

    /// 落库自动分托结果
    ///
    /// 试算结果原样提交;落库前协调器仍会基于持久化状态复核可装数量。
    pub fn commit_planned(
        &self,
        order_id: &str,
        pallets: Vec<PlannedPallet>,
    ) -> ApiResult<CommitBatchResponse> {
        validator::require_non_empty("订单ID", order_id)?;

        let outcome = self.coordinator.commit_batch(order_id, pallets)?;
        Ok(CommitBatchResponse {
            success: true,
            message: t_with_args(
                "pallet.committed",
                &[("count", &outcome.created_pallet_ids.len().to_string())],
            ),
            created_pallet_ids: outcome.created_pallet_ids,
            skipped_empty: outcome.skipped_empty,
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn limits_from(max_weight_kg: Option<f64>, max_height_mm: Option<f64>) -> ApiResult<PalletLimits> {
        let defaults = PalletLimits::default();
        let limits = PalletLimits {
            max_weight_kg: max_weight_kg.unwrap_or(defaults.max_weight_kg),
            max_height_mm: max_height_mm.unwrap_or(defaults.max_height_mm),
        };
        validator::require_positive_dim("托盘载重上限", limits.max_weight_kg)?;
        validator::require_positive_dim("托盘堆高上限", limits.max_height_mm)?;
        Ok(limits)
    }
}
