// ==========================================
// 板件切割生产跟踪系统 - 工序流转引擎
// ==========================================
// 职责: 按冻结的许可表与守卫集合执行订单阶段流转
// 红线: 流转只改订单阶段并追加一条流转日志,不触碰其他实体
// ==========================================
// 前置条件评估顺序,第一个失败即返回:
// 1. 订单存在且未处于终态
// 2. 目标阶段在许可表的后继集合内(自环视为非法流转)
// 3. 领域守卫(硬失败阻断;软失败需 force=true 放行)
// ==========================================

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::history::StageHistoryEntry;
use crate::domain::types::{PalletStatus, StageCode};
use crate::engine::availability::AvailabilityCore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::guards::{GuardContext, GuardRegistry, GuardWarning};
use crate::engine::repositories::TrackingRepositories;
use crate::engine::stage_graph::StageGraph;

// ==========================================
// StageChangeOutcome - 流转结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageChangeOutcome {
    pub order_id: String,
    pub from_stage: StageCode,
    pub to_stage: StageCode,
    pub history_id: String,
    /// force 放行时被跳过的软守卫警告
    pub warnings: Vec<GuardWarning>,
}

// ==========================================
// NextStageInfo - 可流转阶段信息
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStageInfo {
    pub stage_code: StageCode,
    pub label: String,
    pub available: bool,
    pub reason: Option<String>,
}

// ==========================================
// StageTransitionEngine - 工序流转引擎
// ==========================================
pub struct StageTransitionEngine {
    graph: Arc<StageGraph>,
    guards: GuardRegistry,
    repos: TrackingRepositories,
}

impl StageTransitionEngine {
    /// 创建新的流转引擎
    pub fn new(graph: Arc<StageGraph>, guards: GuardRegistry, repos: TrackingRepositories) -> Self {
        Self {
            graph,
            guards,
            repos,
        }
    }

    /// 执行一次阶段流转
    ///
    /// # 参数
    /// - operator/location/comment: 自由文本,可选,写入流转日志
    /// - force: true 时放行软守卫警告
    ///
    /// # 效果
    /// - 订单 stage 更新为目标阶段
    /// - 追加恰好一条 StageHistoryEntry
    /// - 进入 COMPLETED 时记录 completed_at
    pub fn change_stage(
        &self,
        order_id: &str,
        target_stage: StageCode,
        operator: Option<&str>,
        location: Option<&str>,
        comment: Option<&str>,
        force: bool,
    ) -> EngineResult<StageChangeOutcome> {
        // 前置条件 1: 订单存在且未处于终态
        let order = self
            .repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            })?;

        if order.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "订单{}已处于终态{}",
                order.order_no, order.stage
            )));
        }

        // 前置条件 2: 目标阶段在许可表内
        if !self.graph.is_allowed(order.stage, target_stage) {
            return Err(EngineError::IllegalTransition {
                from: order.stage,
                to: target_stage,
                allowed: self.graph.allowed_next(order.stage).to_vec(),
            });
        }

        // 前置条件 3: 领域守卫
        let ctx = self.build_guard_context(order_id)?;
        let verdict = self.guards.evaluate(order.stage, target_stage, &ctx);

        if let Some((guard, reason)) = verdict.hard_failure {
            return Err(EngineError::GuardFailed { guard, reason });
        }
        if !verdict.warnings.is_empty() && !force {
            return Err(EngineError::GuardUnconfirmed {
                warnings: verdict.warnings,
            });
        }

        // 执行流转
        let now = Local::now().naive_local();
        let completed_at = (target_stage == StageCode::Completed).then_some(now);
        self.repos
            .order_repo
            .update_stage(order_id, target_stage, completed_at)?;

        let entry = StageHistoryEntry {
            history_id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            from_stage: order.stage,
            to_stage: target_stage,
            changed_at: now,
            operator: operator.map(str::to_string),
            location: location.map(str::to_string),
            comment: comment.map(str::to_string),
        };
        let history_id = self.repos.history_repo.append(&entry)?;

        tracing::info!(
            order_no = %order.order_no,
            from = %order.stage,
            to = %target_stage,
            forced_warnings = verdict.warnings.len(),
            "订单阶段流转完成"
        );

        Ok(StageChangeOutcome {
            order_id: order_id.to_string(),
            from_stage: order.stage,
            to_stage: target_stage,
            history_id,
            warnings: verdict.warnings,
        })
    }

    /// 查询当前阶段的可流转目标及其可用性
    ///
    /// 对每个许可后继做守卫试算:
    /// - 硬失败 → available=false, reason 为阻断原因
    /// - 软失败 → available=true, reason 提示需确认
    pub fn next_stages(&self, order_id: &str) -> EngineResult<Vec<NextStageInfo>> {
        let order = self
            .repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            })?;

        if order.is_terminal() {
            return Ok(Vec::new());
        }

        let ctx = self.build_guard_context(order_id)?;
        let mut result = Vec::new();

        for &target in self.graph.allowed_next(order.stage) {
            let verdict = self.guards.evaluate(order.stage, target, &ctx);
            let (available, reason) = match (&verdict.hard_failure, verdict.warnings.is_empty()) {
                (Some((_, reason)), _) => (false, Some(reason.clone())),
                (None, false) => (
                    true,
                    Some(format!(
                        "需确认: {}",
                        verdict
                            .warnings
                            .iter()
                            .map(|w| w.reason.as_str())
                            .collect::<Vec<_>>()
                            .join("; ")
                    )),
                ),
                (None, true) => (true, None),
            };

            result.push(NextStageInfo {
                stage_code: target,
                label: target.label_cn().to_string(),
                available,
                reason,
            });
        }

        Ok(result)
    }

    /// 从持久化状态采集守卫评估上下文
    fn build_guard_context(&self, order_id: &str) -> EngineResult<GuardContext> {
        let position_count = self.repos.position_repo.count_by_order(order_id)?;
        let has_packed_pallet = self.repos.pallet_repo.has_packed_pallet(order_id)?;

        let pallets = self.repos.pallet_repo.find_by_order(order_id)?;
        let unclosed_pallet_count = pallets
            .iter()
            .filter(|p| matches!(p.status, PalletStatus::Draft | PalletStatus::Open))
            .count() as i64;

        let pieces = self.repos.piece_type_repo.find_by_order(order_id)?;
        let assignments = self.repos.pallet_repo.assignments_for_order(order_id)?;
        let unassigned_piece_types = pieces
            .iter()
            .filter(|p| AvailabilityCore::available_for(p, &assignments, None) > 0)
            .count() as i64;

        Ok(GuardContext {
            position_count,
            has_packed_pallet,
            unclosed_pallet_count,
            unassigned_piece_types,
        })
    }
}
