// ==========================================
// 板件切割生产跟踪系统 - 托盘分配引擎
// ==========================================
// 职责: 托盘生命周期与板件装托的全部手工操作
// 红线:
// - 每次变更都基于持久化状态重新校验可装数量,不信任会话内累计值
// - 校验统一走 AvailabilityCore::validate_assignment,手工/自动两条路径同口径
// - 封闭托盘的装载明细不可变
// ==========================================

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ConfigManager;
use crate::domain::order::{PieceType, Position};
use crate::domain::pallet::{Pallet, PalletLimits, PalletStats};
use crate::domain::types::{PalletDestination, PalletStatus};
use crate::engine::availability::AvailabilityCore;
use crate::engine::commit::{with_order_lock, OrderLockRegistry};
use crate::engine::error::{CapacityKind, EngineError, EngineResult};
use crate::engine::repositories::TrackingRepositories;
use crate::engine::stats::{PalletStatsCalculator, StatsPolicy};

// ==========================================
// PalletOpOutcome - 装托操作结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletOpOutcome {
    pub stats: PalletStats,
    /// 软性容量警告(超重/超高但未硬阻断)
    pub warnings: Vec<String>,
}

// ==========================================
// PieceAvailability - 板件可装数量视图
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceAvailability {
    pub piece: PieceType,
    pub assigned_quantity: i64,
    pub available_quantity: i64,
}

// ==========================================
// PalletAllocationEngine - 托盘分配引擎
// ==========================================
pub struct PalletAllocationEngine {
    repos: TrackingRepositories,
    config: Arc<ConfigManager>,
    locks: Arc<OrderLockRegistry>,
}

impl PalletAllocationEngine {
    /// 创建新的分配引擎
    pub fn new(
        repos: TrackingRepositories,
        config: Arc<ConfigManager>,
        locks: Arc<OrderLockRegistry>,
    ) -> Self {
        Self {
            repos,
            config,
            locks,
        }
    }

    /// 读取统计口径(堆叠模型/密度/托面尺寸)
    pub fn stats_policy(&self) -> EngineResult<StatsPolicy> {
        StatsPolicy::from_config(&self.config).map_err(|e| EngineError::Config(e.to_string()))
    }

    // ==========================================
    // 可装数量查询(只读,不加锁)
    // ==========================================

    /// 核心原语: 某板件规格的可装数量
    ///
    /// # 公式
    /// - available = planned - damaged - Σ(除 excluding_pallet_id 外所有托盘的已装数量)
    pub fn available(
        &self,
        piece_type_id: &str,
        excluding_pallet_id: Option<&str>,
    ) -> EngineResult<i64> {
        let piece = self.require_piece(piece_type_id)?;
        let assigned = self
            .repos
            .pallet_repo
            .assigned_total(piece_type_id, excluding_pallet_id)?;
        Ok(AvailabilityCore::available_quantity(
            piece.planned_qty,
            piece.damaged_qty,
            assigned,
        ))
    }

    /// 某排料位全部板件规格的可装数量视图
    pub fn available_pieces_for_position(
        &self,
        position_id: &str,
    ) -> EngineResult<Vec<PieceAvailability>> {
        self.repos
            .position_repo
            .find_by_id(position_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Position".to_string(),
                id: position_id.to_string(),
            })?;

        let pieces = self.repos.piece_type_repo.find_by_position(position_id)?;
        self.availability_view(pieces)
    }

    /// 某订单全部板件规格的可装数量视图
    pub fn available_pieces_for_order(
        &self,
        order_id: &str,
    ) -> EngineResult<Vec<PieceAvailability>> {
        let pieces = self.repos.piece_type_repo.find_by_order(order_id)?;
        self.availability_view(pieces)
    }

    fn availability_view(
        &self,
        pieces: Vec<PieceType>,
    ) -> EngineResult<Vec<PieceAvailability>> {
        let mut result = Vec::with_capacity(pieces.len());
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
            result.push(PieceAvailability {
                piece,
                assigned_quantity: assigned,
                available_quantity: available,
            });
        }
        Ok(result)
    }

    // ==========================================
    // 托盘生命周期
    // ==========================================

    /// 开托
    ///
    /// 新托盘以 DRAFT 状态落库,首次装托成功后转为 OPEN。
    pub fn create_pallet(
        &self,
        order_id: &str,
        position_id: Option<&str>,
        destination: PalletDestination,
        limits: PalletLimits,
    ) -> EngineResult<Pallet> {
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
                "终态订单不允许开托: {}",
                order.order_no
            )));
        }

        if let Some(pos_id) = position_id {
            let position = self.require_position(pos_id)?;
            if position.order_id != order_id {
                return Err(EngineError::Validation(format!(
                    "排料位{}不属于订单{}",
                    pos_id, order_id
                )));
            }
        }

        if limits.max_weight_kg <= 0.0 || limits.max_height_mm <= 0.0 {
            return Err(EngineError::Validation(
                "托盘载重与堆高上限必须大于0".to_string(),
            ));
        }

        let mut pallet = Pallet {
            pallet_id: Uuid::new_v4().to_string(),
            pallet_no: 0, // 由仓储在事务内分配
            order_id: order_id.to_string(),
            position_id: position_id.map(str::to_string),
            destination,
            status: PalletStatus::Draft,
            max_weight_kg: limits.max_weight_kg,
            max_height_mm: limits.max_height_mm,
            closed_weight_kg: None,
            closed_height_mm: None,
            closed_at: None,
            created_at: Local::now().naive_local(),
        };
        self.repos.pallet_repo.create_with_next_no(&mut pallet)?;

        tracing::debug!(order_no = %order.order_no, pallet_no = pallet.pallet_no, "开托");
        Ok(pallet)
    }

    /// 封托: 冻结统计快照,此后装载明细不可变
    pub fn close(&self, pallet_id: &str) -> EngineResult<PalletStats> {
        let pallet = self.require_pallet(pallet_id)?;
        match pallet.status {
            PalletStatus::Draft | PalletStatus::Open => {}
            PalletStatus::Closed => return Err(EngineError::PalletClosed(pallet_id.to_string())),
            other => {
                return Err(EngineError::Validation(format!(
                    "托盘状态{}不允许封托",
                    other
                )))
            }
        }

        with_order_lock(&self.locks, &pallet.order_id, || {
            let stats = self.compute_pallet_stats(&pallet)?;
            self.repos.pallet_repo.close(
                pallet_id,
                stats.weight_kg,
                stats.height_mm,
                Local::now().naive_local(),
            )?;
            tracing::info!(pallet_no = pallet.pallet_no, weight = stats.weight_kg, "封托");
            Ok(stats)
        })
    }

    /// 删除托盘,其全部装载明细回归可装池
    pub fn delete(&self, pallet_id: &str) -> EngineResult<()> {
        let pallet = self.require_pallet(pallet_id)?;
        if matches!(
            pallet.status,
            PalletStatus::InTransit | PalletStatus::Delivered
        ) {
            return Err(EngineError::Validation(format!(
                "托盘状态{}不允许删除",
                pallet.status
            )));
        }

        with_order_lock(&self.locks, &pallet.order_id, || {
            self.repos.pallet_repo.delete(pallet_id)?;
            Ok(())
        })
    }

    /// 批量删除订单托盘
    ///
    /// # 参数
    /// - only_empty: true 时仅删除无装载明细的空托盘
    pub fn delete_all(&self, order_id: &str, only_empty: bool) -> EngineResult<usize> {
        self.repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            })?;

        with_order_lock(&self.locks, order_id, || {
            let deleted = self.repos.pallet_repo.delete_by_order(order_id, only_empty)?;
            tracing::info!(order_id, deleted, only_empty, "批量删除托盘");
            Ok(deleted)
        })
    }

    // ==========================================
    // 装托操作
    // ==========================================

    /// 手工装托: 在托盘上新增/累加某板件规格的数量
    pub fn assign(
        &self,
        pallet_id: &str,
        piece_type_id: &str,
        quantity: i64,
    ) -> EngineResult<PalletOpOutcome> {
        let pallet = self.require_mutable_pallet(pallet_id)?;
        let piece = self.require_piece(piece_type_id)?;
        self.require_piece_on_pallet_scope(&pallet, &piece)?;
        let policy = self.stats_policy()?;
        let hard_cap = self.capacity_hard_cap()?;

        with_order_lock(&self.locks, &pallet.order_id, || {
            // 可装数量校验(纯增量,不排除任何托盘)
            let assigned = self.repos.pallet_repo.assigned_total(piece_type_id, None)?;
            AvailabilityCore::validate_assignment(&piece, assigned, quantity)?;

            // 容量校验: 现有装载 + 本次增量
            let mut items = self.load_pallet_items(pallet_id)?;
            merge_item(&mut items, &piece, quantity);
            let stats = compute_stats(&policy, &items, &pallet);
            let warnings = self.check_capacity(&pallet, &stats, hard_cap)?;

            self.repos
                .pallet_repo
                .add_assignment(pallet_id, piece_type_id, quantity)?;
            if pallet.status == PalletStatus::Draft {
                self.repos
                    .pallet_repo
                    .update_status(pallet_id, PalletStatus::Open)?;
            }

            Ok(PalletOpOutcome { stats, warnings })
        })
    }

    /// 卸托: 整行移除,数量回归可装池
    pub fn unassign(&self, pallet_id: &str, piece_type_id: &str) -> EngineResult<PalletStats> {
        let pallet = self.require_mutable_pallet(pallet_id)?;
        let policy = self.stats_policy()?;

        with_order_lock(&self.locks, &pallet.order_id, || {
            self.repos
                .pallet_repo
                .delete_assignment(pallet_id, piece_type_id)?;
            let items = self.load_pallet_items(pallet_id)?;
            Ok(compute_stats(&policy, &items, &pallet))
        })
    }

    /// 覆写装托数量
    ///
    /// 等价于卸托+重新装托,但按单一操作校验:
    /// 可装数量只对照"其他托盘"的已装量。new_quantity=0 时等同卸托。
    pub fn set_quantity(
        &self,
        pallet_id: &str,
        piece_type_id: &str,
        new_quantity: i64,
    ) -> EngineResult<PalletOpOutcome> {
        if new_quantity < 0 {
            return Err(EngineError::Validation(format!(
                "装托数量不能为负: {}",
                new_quantity
            )));
        }
        let pallet = self.require_mutable_pallet(pallet_id)?;
        let piece = self.require_piece(piece_type_id)?;
        self.require_piece_on_pallet_scope(&pallet, &piece)?;
        let policy = self.stats_policy()?;
        let hard_cap = self.capacity_hard_cap()?;

        with_order_lock(&self.locks, &pallet.order_id, || {
            if new_quantity == 0 {
                self.repos
                    .pallet_repo
                    .delete_assignment(pallet_id, piece_type_id)?;
                let items = self.load_pallet_items(pallet_id)?;
                return Ok(PalletOpOutcome {
                    stats: compute_stats(&policy, &items, &pallet),
                    warnings: Vec::new(),
                });
            }

            // 只对照其他托盘的已装量
            let assigned_elsewhere = self
                .repos
                .pallet_repo
                .assigned_total(piece_type_id, Some(pallet_id))?;
            AvailabilityCore::validate_assignment(&piece, assigned_elsewhere, new_quantity)?;

            let mut items = self.load_pallet_items(pallet_id)?;
            set_item(&mut items, &piece, new_quantity);
            let stats = compute_stats(&policy, &items, &pallet);
            let warnings = self.check_capacity(&pallet, &stats, hard_cap)?;

            self.repos
                .pallet_repo
                .set_assignment_quantity(pallet_id, piece_type_id, new_quantity)?;
            if pallet.status == PalletStatus::Draft {
                self.repos
                    .pallet_repo
                    .update_status(pallet_id, PalletStatus::Open)?;
            }

            Ok(PalletOpOutcome { stats, warnings })
        })
    }

    /// 一键装满: 将范围内所有仍有余量的板件规格全部装上本托盘
    ///
    /// 范围: 托盘绑定了排料位时仅该排料位,否则整个订单。
    pub fn assign_all_remaining(&self, pallet_id: &str) -> EngineResult<PalletOpOutcome> {
        let pallet = self.require_mutable_pallet(pallet_id)?;
        let policy = self.stats_policy()?;
        let hard_cap = self.capacity_hard_cap()?;

        let pieces = match &pallet.position_id {
            Some(pos_id) => self.repos.piece_type_repo.find_by_position(pos_id)?,
            None => self.repos.piece_type_repo.find_by_order(&pallet.order_id)?,
        };

        with_order_lock(&self.locks, &pallet.order_id, || {
            // 先算出全部增量与最终统计,硬上限模式下整体通过才写入
            let mut items = self.load_pallet_items(pallet_id)?;
            let mut additions: Vec<(String, i64)> = Vec::new();

            for piece in &pieces {
                let assigned = self
                    .repos
                    .pallet_repo
                    .assigned_total(&piece.piece_type_id, None)?;
                let available = AvailabilityCore::available_quantity(
                    piece.planned_qty,
                    piece.damaged_qty,
                    assigned,
                );
                if available <= 0 {
                    continue;
                }
                merge_item(&mut items, piece, available);
                additions.push((piece.piece_type_id.clone(), available));
            }

            let stats = compute_stats(&policy, &items, &pallet);
            let warnings = self.check_capacity(&pallet, &stats, hard_cap)?;

            for (piece_type_id, qty) in &additions {
                self.repos
                    .pallet_repo
                    .add_assignment(pallet_id, piece_type_id, *qty)?;
            }
            if !additions.is_empty() && pallet.status == PalletStatus::Draft {
                self.repos
                    .pallet_repo
                    .update_status(pallet_id, PalletStatus::Open)?;
            }

            tracing::info!(
                pallet_no = pallet.pallet_no,
                piece_types = additions.len(),
                "一键装满完成"
            );
            Ok(PalletOpOutcome { stats, warnings })
        })
    }

    /// 托盘间转移(双边原子)
    ///
    /// 数量已存在于源托盘,不再校验全局可装数量;
    /// 只校验目标托盘的物理容量余量(超限即阻断)。
    pub fn transfer(
        &self,
        from_pallet_id: &str,
        to_pallet_id: &str,
        piece_type_id: &str,
        quantity: i64,
    ) -> EngineResult<PalletOpOutcome> {
        if from_pallet_id == to_pallet_id {
            return Err(EngineError::Validation(
                "源托盘与目标托盘不能相同".to_string(),
            ));
        }
        if quantity <= 0 {
            return Err(EngineError::Validation(format!(
                "转移数量必须大于0: {}",
                quantity
            )));
        }

        let from = self.require_mutable_pallet(from_pallet_id)?;
        let to = self.require_mutable_pallet(to_pallet_id)?;
        if from.order_id != to.order_id {
            return Err(EngineError::Validation(
                "不允许跨订单转移装载明细".to_string(),
            ));
        }
        let piece = self.require_piece(piece_type_id)?;
        self.require_piece_on_pallet_scope(&to, &piece)?;
        let policy = self.stats_policy()?;

        with_order_lock(&self.locks, &from.order_id, || {
            let source = self
                .repos
                .pallet_repo
                .find_assignment(from_pallet_id, piece_type_id)?
                .ok_or_else(|| EngineError::NotFound {
                    entity: "PalletPieceAssignment".to_string(),
                    id: format!("{}/{}", from_pallet_id, piece_type_id),
                })?;
            if source.quantity < quantity {
                return Err(EngineError::Validation(format!(
                    "源托盘装载量不足: 现有{}件, 请求转移{}件",
                    source.quantity, quantity
                )));
            }

            // 目标托盘物理容量校验(硬阻断)
            let mut items = self.load_pallet_items(to_pallet_id)?;
            merge_item(&mut items, &piece, quantity);
            let stats = compute_stats(&policy, &items, &to);
            if stats.weight_kg > to.max_weight_kg {
                return Err(EngineError::CapacityExceeded {
                    pallet_id: to_pallet_id.to_string(),
                    kind: CapacityKind::Weight,
                    limit: to.max_weight_kg,
                    actual: stats.weight_kg,
                });
            }
            if stats.height_mm > to.max_height_mm {
                return Err(EngineError::CapacityExceeded {
                    pallet_id: to_pallet_id.to_string(),
                    kind: CapacityKind::Height,
                    limit: to.max_height_mm,
                    actual: stats.height_mm,
                });
            }

            self.repos.pallet_repo.transfer_assignment(
                from_pallet_id,
                to_pallet_id,
                piece_type_id,
                quantity,
            )?;
            if to.status == PalletStatus::Draft {
                self.repos
                    .pallet_repo
                    .update_status(to_pallet_id, PalletStatus::Open)?;
            }

            Ok(PalletOpOutcome {
                stats,
                warnings: Vec::new(),
            })
        })
    }

    /// 报损登记: 更新报损数量并返回最新可装数量
    ///
    /// 报损 + 已装 不得超过计划数量,否则拒绝。
    pub fn report_damage(&self, piece_type_id: &str, damaged_qty: i64) -> EngineResult<i64> {
        if damaged_qty < 0 {
            return Err(EngineError::Validation(format!(
                "报损数量不能为负: {}",
                damaged_qty
            )));
        }
        let piece = self.require_piece(piece_type_id)?;
        let position = self.require_position(&piece.position_id)?;

        with_order_lock(&self.locks, &position.order_id, || {
            let assigned = self.repos.pallet_repo.assigned_total(piece_type_id, None)?;
            if damaged_qty + assigned > piece.planned_qty {
                return Err(EngineError::Validation(format!(
                    "报损{}件与已装{}件之和超过计划{}件, 请先卸托",
                    damaged_qty, assigned, piece.planned_qty
                )));
            }
            self.repos
                .piece_type_repo
                .update_damaged_qty(piece_type_id, damaged_qty)?;
            Ok(AvailabilityCore::available_quantity(
                piece.planned_qty,
                damaged_qty,
                assigned,
            ))
        })
    }

    /// 产出登记: 更新合格产出数量
    ///
    /// 合格产出是生产进度口径,不参与可装数量计算;
    /// 上限为计划数量。
    pub fn report_production(
        &self,
        piece_type_id: &str,
        produced_ok_qty: i64,
    ) -> EngineResult<()> {
        if produced_ok_qty < 0 {
            return Err(EngineError::Validation(format!(
                "产出数量不能为负: {}",
                produced_ok_qty
            )));
        }
        let piece = self.require_piece(piece_type_id)?;
        if produced_ok_qty > piece.planned_qty {
            return Err(EngineError::Validation(format!(
                "产出{}件超过计划{}件",
                produced_ok_qty, piece.planned_qty
            )));
        }
        self.repos
            .piece_type_repo
            .update_produced_ok_qty(piece_type_id, produced_ok_qty)?;
        Ok(())
    }

    /// 重算并返回某托盘的实时统计
    pub fn pallet_stats(&self, pallet_id: &str) -> EngineResult<PalletStats> {
        let pallet = self.require_pallet(pallet_id)?;
        self.compute_pallet_stats(&pallet)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn capacity_hard_cap(&self) -> EngineResult<bool> {
        self.config
            .capacity_hard_cap()
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    fn require_pallet(&self, pallet_id: &str) -> EngineResult<Pallet> {
        self.repos
            .pallet_repo
            .find_by_id(pallet_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Pallet".to_string(),
                id: pallet_id.to_string(),
            })
    }

    fn require_mutable_pallet(&self, pallet_id: &str) -> EngineResult<Pallet> {
        let pallet = self.require_pallet(pallet_id)?;
        if !pallet.is_mutable() {
            return Err(EngineError::PalletClosed(pallet_id.to_string()));
        }
        Ok(pallet)
    }

    fn require_piece(&self, piece_type_id: &str) -> EngineResult<PieceType> {
        self.repos
            .piece_type_repo
            .find_by_id(piece_type_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "PieceType".to_string(),
                id: piece_type_id.to_string(),
            })
    }

    fn require_position(&self, position_id: &str) -> EngineResult<Position> {
        self.repos
            .position_repo
            .find_by_id(position_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Position".to_string(),
                id: position_id.to_string(),
            })
    }

    /// 校验板件属于托盘所在订单,且满足托盘的排料位限定
    fn require_piece_on_pallet_scope(
        &self,
        pallet: &Pallet,
        piece: &PieceType,
    ) -> EngineResult<()> {
        let position = self.require_position(&piece.position_id)?;
        if position.order_id != pallet.order_id {
            return Err(EngineError::Validation(format!(
                "板件规格{}不属于托盘所在订单",
                piece.piece_type_id
            )));
        }
        if let Some(scope) = &pallet.position_id {
            if scope != &piece.position_id {
                return Err(EngineError::Validation(format!(
                    "托盘{}限定排料位{}, 不接受其他排料位的板件",
                    pallet.pallet_no, scope
                )));
            }
        }
        Ok(())
    }

    /// 读取托盘当前装载为 (板件规格, 数量) 列表
    fn load_pallet_items(&self, pallet_id: &str) -> EngineResult<Vec<(PieceType, i64)>> {
        let assignments = self.repos.pallet_repo.assignments_for_pallet(pallet_id)?;
        let mut items = Vec::with_capacity(assignments.len());
        for a in assignments {
            let piece = self.require_piece(&a.piece_type_id)?;
            items.push((piece, a.quantity));
        }
        Ok(items)
    }

    fn compute_pallet_stats(&self, pallet: &Pallet) -> EngineResult<PalletStats> {
        let policy = self.stats_policy()?;
        let items = self.load_pallet_items(&pallet.pallet_id)?;
        Ok(compute_stats(&policy, &items, pallet))
    }

    /// 容量检查: 硬上限模式阻断,否则收集为警告
    fn check_capacity(
        &self,
        pallet: &Pallet,
        stats: &PalletStats,
        hard_cap: bool,
    ) -> EngineResult<Vec<String>> {
        let mut warnings = Vec::new();

        if stats.weight_kg > pallet.max_weight_kg {
            if hard_cap {
                return Err(EngineError::CapacityExceeded {
                    pallet_id: pallet.pallet_id.clone(),
                    kind: CapacityKind::Weight,
                    limit: pallet.max_weight_kg,
                    actual: stats.weight_kg,
                });
            }
            let msg = format!(
                "托盘{}超出载重上限: {:.1}kg > {:.1}kg",
                pallet.pallet_no, stats.weight_kg, pallet.max_weight_kg
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
        }

        if stats.height_mm > pallet.max_height_mm {
            if hard_cap {
                return Err(EngineError::CapacityExceeded {
                    pallet_id: pallet.pallet_id.clone(),
                    kind: CapacityKind::Height,
                    limit: pallet.max_height_mm,
                    actual: stats.height_mm,
                });
            }
            let msg = format!(
                "托盘{}超出堆高上限: {:.1}mm > {:.1}mm",
                pallet.pallet_no, stats.height_mm, pallet.max_height_mm
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
        }

        Ok(warnings)
    }
}

/// 装载列表合并增量
fn merge_item(items: &mut Vec<(PieceType, i64)>, piece: &PieceType, delta: i64) {
    if let Some(entry) = items
        .iter_mut()
        .find(|(p, _)| p.piece_type_id == piece.piece_type_id)
    {
        entry.1 += delta;
    } else {
        items.push((piece.clone(), delta));
    }
}

/// 装载列表覆写数量
fn set_item(items: &mut Vec<(PieceType, i64)>, piece: &PieceType, quantity: i64) {
    if let Some(entry) = items
        .iter_mut()
        .find(|(p, _)| p.piece_type_id == piece.piece_type_id)
    {
        entry.1 = quantity;
    } else {
        items.push((piece.clone(), quantity));
    }
}

fn compute_stats(policy: &StatsPolicy, items: &[(PieceType, i64)], pallet: &Pallet) -> PalletStats {
    let refs: Vec<(&PieceType, i64)> = items.iter().map(|(p, q)| (p, *q)).collect();
    PalletStatsCalculator::compute(policy, &refs, pallet.max_weight_kg, pallet.max_height_mm)
}
