// ==========================================
// 板件切割生产跟踪系统 - 订单业务接口
// ==========================================
// 职责: 订单/排料位 CRUD 与工序流转门面
// 红线: 排料位仅在订单 NEW 阶段可增删;流转一律经流转引擎
// ==========================================

use chrono::Local;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::api::{
    AddPositionRequest, ChangeStatusRequest, CreateOrderRequest, OrderDetail, PalletDetail,
    PositionDetail, StatusChangeResponse, UpdateOrderRequest,
};
use crate::domain::history::StageHistoryEntry;
use crate::domain::order::{PieceType, Position, ProductionOrder};
use crate::domain::types::StageCode;
use crate::engine::allocation::PalletAllocationEngine;
use crate::engine::error::EngineError;
use crate::engine::repositories::TrackingRepositories;
use crate::engine::stage_engine::{NextStageInfo, StageTransitionEngine};
use crate::i18n::{t, t_with_args};

// ==========================================
// OrderApi - 订单业务接口
// ==========================================
pub struct OrderApi {
    repos: TrackingRepositories,
    stage_engine: Arc<StageTransitionEngine>,
    allocation: Arc<PalletAllocationEngine>,
}

impl OrderApi {
    /// 创建新的 OrderApi 实例
    pub fn new(
        repos: TrackingRepositories,
        stage_engine: Arc<StageTransitionEngine>,
        allocation: Arc<PalletAllocationEngine>,
    ) -> Self {
        Self {
            repos,
            stage_engine,
            allocation,
        }
    }

    // ==========================================
    // 订单 CRUD
    // ==========================================

    /// 创建订单(初始阶段 NEW)
    pub fn create_order(&self, req: CreateOrderRequest) -> ApiResult<ProductionOrder> {
        validator::require_non_empty("工单号", &req.order_no)?;
        validator::require_non_empty("客户名称", &req.customer_name)?;
        validator::require_priority(req.priority)?;

        if self
            .repos
            .order_repo
            .find_by_order_no(req.order_no.trim())?
            .is_some()
        {
            return Err(ApiError::BusinessRuleViolation(format!(
                "工单号已存在: {}",
                req.order_no.trim()
            )));
        }

        let order = ProductionOrder {
            order_id: Uuid::new_v4().to_string(),
            order_no: req.order_no.trim().to_string(),
            stage: StageCode::New,
            priority: req.priority,
            customer_name: req.customer_name.trim().to_string(),
            comment: req.comment,
            created_at: Local::now().naive_local(),
            planned_at: req.planned_at,
            completed_at: None,
        };
        self.repos.order_repo.create(&order)?;

        tracing::info!(order_no = %order.order_no, "订单创建");
        Ok(order)
    }

    /// 查询订单列表
    pub fn list_orders(&self) -> ApiResult<Vec<ProductionOrder>> {
        Ok(self.repos.order_repo.list_all()?)
    }

    /// 查询订单详情(含排料位/板件规格/托盘/流转日志)
    pub fn get_order(&self, order_id: &str) -> ApiResult<OrderDetail> {
        let order = self.require_order(order_id)?;

        let mut positions = Vec::new();
        for position in self.repos.position_repo.find_by_order(order_id)? {
            let piece_types = self
                .repos
                .piece_type_repo
                .find_by_position(&position.position_id)?;
            positions.push(PositionDetail {
                position,
                piece_types,
            });
        }

        let mut pallets = Vec::new();
        for pallet in self.repos.pallet_repo.find_by_order(order_id)? {
            let assignments = self
                .repos
                .pallet_repo
                .assignments_for_pallet(&pallet.pallet_id)?;
            let stats = self.allocation.pallet_stats(&pallet.pallet_id)?;
            pallets.push(PalletDetail {
                pallet,
                assignments,
                stats,
            });
        }

        let history = self.repos.history_repo.find_by_order(order_id)?;

        Ok(OrderDetail {
            order,
            positions,
            pallets,
            history,
        })
    }

    /// 更新订单基础字段(优先级/客户/备注/计划时间)
    pub fn update_order(
        &self,
        order_id: &str,
        req: UpdateOrderRequest,
    ) -> ApiResult<ProductionOrder> {
        let mut order = self.require_order(order_id)?;

        if let Some(priority) = req.priority {
            validator::require_priority(priority)?;
            order.priority = priority;
        }
        if let Some(customer_name) = req.customer_name {
            validator::require_non_empty("客户名称", &customer_name)?;
            order.customer_name = customer_name.trim().to_string();
        }
        if let Some(comment) = req.comment {
            order.comment = Some(comment);
        }
        if let Some(planned_at) = req.planned_at {
            order.planned_at = Some(planned_at);
        }

        self.repos.order_repo.update_fields(&order)?;
        Ok(order)
    }

    /// 删除订单(级联删除排料位/托盘/流转日志)
    pub fn delete_order(&self, order_id: &str) -> ApiResult<()> {
        self.require_order(order_id)?;
        self.repos.order_repo.delete(order_id)?;
        tracing::info!(order_id, "订单删除");
        Ok(())
    }

    // ==========================================
    // 排料位管理
    // ==========================================

    /// 添加排料位及其板件规格
    ///
    /// 订单离开 NEW 阶段后排料位冻结,不再允许增删。
    pub fn add_position(
        &self,
        order_id: &str,
        req: AddPositionRequest,
    ) -> ApiResult<PositionDetail> {
        let order = self.require_order(order_id)?;
        if !order.is_editable() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "订单{}已进入{}阶段, 排料位已冻结",
                order.order_no,
                order.stage.label_cn()
            )));
        }

        validator::require_non_empty("材质名称", &req.material_name)?;
        validator::require_non_empty("颜色", &req.color)?;
        if req.plate_count < 0 {
            return Err(ApiError::InvalidInput(format!(
                "原板张数不能为负: {}",
                req.plate_count
            )));
        }
        for (idx, piece) in req.piece_types.iter().enumerate() {
            validator::require_positive_dim(&format!("板件{}长度", idx + 1), piece.length_mm)?;
            validator::require_positive_dim(&format!("板件{}宽度", idx + 1), piece.width_mm)?;
            validator::require_positive_dim(&format!("板件{}厚度", idx + 1), piece.thickness_mm)?;
            validator::require_positive_qty(&format!("板件{}计划数量", idx + 1), piece.planned_qty)?;
            validator::require_non_empty(&format!("板件{}颜色", idx + 1), &piece.color)?;
        }

        let position = Position {
            position_id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            material_name: req.material_name.trim().to_string(),
            color: req.color.trim().to_string(),
            plate_count: req.plate_count,
            layout_ref: req.layout_ref,
            created_at: Local::now().naive_local(),
        };
        self.repos.position_repo.create(&position)?;

        let mut piece_types = Vec::with_capacity(req.piece_types.len());
        for piece_req in req.piece_types {
            let piece = PieceType {
                piece_type_id: Uuid::new_v4().to_string(),
                position_id: position.position_id.clone(),
                length_mm: piece_req.length_mm,
                width_mm: piece_req.width_mm,
                thickness_mm: piece_req.thickness_mm,
                planned_qty: piece_req.planned_qty,
                produced_ok_qty: 0,
                damaged_qty: 0,
                color: piece_req.color.trim().to_string(),
                edging_required: piece_req.edging_required,
            };
            self.repos.piece_type_repo.create(&piece)?;
            piece_types.push(piece);
        }

        tracing::info!(
            order_no = %order.order_no,
            position_id = %position.position_id,
            piece_types = piece_types.len(),
            "排料位添加"
        );
        Ok(PositionDetail {
            position,
            piece_types,
        })
    }

    /// 删除排料位
    ///
    /// 仅在订单 NEW 阶段且其板件无任何装载明细时允许。
    pub fn delete_position(&self, position_id: &str) -> ApiResult<()> {
        let position = self
            .repos
            .position_repo
            .find_by_id(position_id)?
            .ok_or_else(|| ApiError::NotFound(format!("排料位{}不存在", position_id)))?;
        let order = self.require_order(&position.order_id)?;
        if !order.is_editable() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "订单{}已进入{}阶段, 排料位已冻结",
                order.order_no,
                order.stage.label_cn()
            )));
        }

        for piece in self.repos.piece_type_repo.find_by_position(position_id)? {
            let assigned = self
                .repos
                .pallet_repo
                .assigned_total(&piece.piece_type_id, None)?;
            if assigned > 0 {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "板件规格{}仍有{}件在托盘上, 请先卸托",
                    piece.piece_type_id, assigned
                )));
            }
        }

        self.repos.position_repo.delete(position_id)?;
        Ok(())
    }

    // ==========================================
    // 工序流转
    // ==========================================

    /// 订单阶段流转
    ///
    /// 响应约定:
    /// - success=true: 流转完成(force 放行的软警告附在 warnings)
    /// - success=false + errors: 硬阻断(非法流转/硬守卫/终态)
    /// - success=false + warnings: 软守卫待确认, force=true 重试可放行
    pub fn change_status(
        &self,
        order_id: &str,
        req: ChangeStatusRequest,
    ) -> ApiResult<StatusChangeResponse> {
        let target = validator::parse_stage(&req.target_stage)?;

        match self.stage_engine.change_stage(
            order_id,
            target,
            req.operator.as_deref(),
            req.location.as_deref(),
            req.comment.as_deref(),
            req.force,
        ) {
            Ok(outcome) => Ok(StatusChangeResponse {
                success: true,
                message: t_with_args("order.stage_changed", &[("stage", target.to_db_str())]),
                errors: Vec::new(),
                warnings: outcome.warnings,
            }),
            Err(EngineError::GuardUnconfirmed { warnings }) => Ok(StatusChangeResponse {
                success: false,
                message: t("order.stage_needs_confirm"),
                errors: Vec::new(),
                warnings,
            }),
            Err(
                e @ (EngineError::IllegalTransition { .. }
                | EngineError::GuardFailed { .. }
                | EngineError::InvalidState(_)),
            ) => Ok(StatusChangeResponse {
                success: false,
                message: t("order.stage_blocked"),
                errors: vec![e.to_string()],
                warnings: Vec::new(),
            }),
            Err(other) => Err(other.into()),
        }
    }

    /// 查询当前阶段的可流转目标
    pub fn next_stages(&self, order_id: &str) -> ApiResult<Vec<NextStageInfo>> {
        Ok(self.stage_engine.next_stages(order_id)?)
    }

    /// 查询订单流转日志
    pub fn stage_history(&self, order_id: &str) -> ApiResult<Vec<StageHistoryEntry>> {
        self.require_order(order_id)?;
        Ok(self.repos.history_repo.find_by_order(order_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_order(&self, order_id: &str) -> ApiResult<ProductionOrder> {
        self.repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单{}不存在", order_id)))
    }
}
