// ==========================================
// 板件切割生产跟踪系统 - 流转守卫
// ==========================================
// 职责: 工序流转前的领域前置条件检查
// 红线: 守卫集合是代码,守卫级别(硬/软)是配置
// ==========================================
// 评估顺序即声明顺序;第一个硬失败立即终止,
// 软失败全部收集为警告,由调用方决定是否 force 放行。
// ==========================================

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::domain::types::{GuardSeverity, StageCode};
use crate::engine::error::{EngineError, EngineResult};

/// 守卫ID: 离开 NEW 需要至少一个排料位
pub const GUARD_POSITION_REQUIRED: &str = "position_required";

/// 守卫ID: 进入 PALLET_CLOSE 需要至少一个带装载明细的托盘
pub const GUARD_PACKED_PALLET_REQUIRED: &str = "packed_pallet_required";

/// 守卫ID: 进入 SHIP 需要全部托盘已封闭
pub const GUARD_PALLETS_CLOSED_BEFORE_SHIP: &str = "pallets_closed_before_ship";

/// 守卫ID: 进入 COMPLETED 需要全部板件装托完毕
pub const GUARD_ALL_PIECES_ASSIGNED: &str = "all_pieces_assigned";

// ==========================================
// GuardWarning - 软守卫警告
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardWarning {
    pub guard: String,  // 守卫ID
    pub reason: String, // 未满足的条件说明
}

// ==========================================
// GuardContext - 守卫评估上下文
// ==========================================
// 由流转引擎从持久化状态采集,守卫本身不做 I/O
#[derive(Debug, Clone, Default)]
pub struct GuardContext {
    pub position_count: i64,          // 订单排料位数量
    pub has_packed_pallet: bool,      // 是否存在带装载明细的托盘
    pub unclosed_pallet_count: i64,   // 未封闭(DRAFT/OPEN)托盘数量
    pub unassigned_piece_types: i64,  // 尚有可装余量的板件规格数量
}

// ==========================================
// GuardRule - 单条守卫
// ==========================================
#[derive(Debug, Clone)]
pub struct GuardRule {
    pub id: &'static str,
    pub severity: GuardSeverity,
}

/// 守卫评估结论
#[derive(Debug, Clone, Default)]
pub struct GuardVerdict {
    /// 第一个硬失败 (guard_id, reason); 存在即阻断
    pub hard_failure: Option<(String, String)>,
    /// 软失败集合; 非空时需 force=true 放行
    pub warnings: Vec<GuardWarning>,
}

// ==========================================
// GuardRegistry - 守卫注册表
// ==========================================
pub struct GuardRegistry {
    rules: Vec<GuardRule>,
}

impl GuardRegistry {
    /// 默认守卫集合与默认级别
    pub fn with_defaults() -> Self {
        Self {
            rules: vec![
                GuardRule {
                    id: GUARD_POSITION_REQUIRED,
                    severity: GuardSeverity::Hard,
                },
                GuardRule {
                    id: GUARD_PACKED_PALLET_REQUIRED,
                    severity: GuardSeverity::Hard,
                },
                GuardRule {
                    id: GUARD_PALLETS_CLOSED_BEFORE_SHIP,
                    severity: GuardSeverity::Soft,
                },
                GuardRule {
                    id: GUARD_ALL_PIECES_ASSIGNED,
                    severity: GuardSeverity::Soft,
                },
            ],
        }
    }

    /// 应用配置覆写后的守卫集合
    ///
    /// 配置键: guard_severity/{guard_id}, 值 HARD/SOFT
    pub fn with_config(config: &ConfigManager) -> EngineResult<Self> {
        let mut registry = Self::with_defaults();
        for rule in &mut registry.rules {
            if let Some(severity) = config
                .guard_severity(rule.id)
                .map_err(|e| EngineError::Config(e.to_string()))?
            {
                rule.severity = severity;
            }
        }
        Ok(registry)
    }

    /// 评估一次流转的全部适用守卫
    pub fn evaluate(&self, from: StageCode, to: StageCode, ctx: &GuardContext) -> GuardVerdict {
        let mut verdict = GuardVerdict::default();

        for rule in &self.rules {
            let reason = match Self::check(rule.id, from, to, ctx) {
                Some(reason) => reason,
                None => continue,
            };

            match rule.severity {
                GuardSeverity::Hard => {
                    // 第一个硬失败即终止
                    verdict.hard_failure = Some((rule.id.to_string(), reason));
                    return verdict;
                }
                GuardSeverity::Soft => verdict.warnings.push(GuardWarning {
                    guard: rule.id.to_string(),
                    reason,
                }),
            }
        }

        verdict
    }

    /// 单条守卫检查
    ///
    /// # 返回
    /// - Some(reason): 守卫适用且未满足
    /// - None: 守卫不适用或已满足
    fn check(id: &str, from: StageCode, to: StageCode, ctx: &GuardContext) -> Option<String> {
        match id {
            GUARD_POSITION_REQUIRED => {
                // 取消不受排料位约束
                if from == StageCode::New
                    && to != StageCode::Cancelled
                    && ctx.position_count == 0
                {
                    return Some("订单至少需要一个排料位才能开始生产".to_string());
                }
                None
            }
            GUARD_PACKED_PALLET_REQUIRED => {
                if to == StageCode::PalletClose && !ctx.has_packed_pallet {
                    return Some("封托前订单至少需要一个带装载明细的托盘".to_string());
                }
                None
            }
            GUARD_PALLETS_CLOSED_BEFORE_SHIP => {
                if to == StageCode::Ship && ctx.unclosed_pallet_count > 0 {
                    return Some(format!(
                        "发运前仍有{}个托盘未封闭",
                        ctx.unclosed_pallet_count
                    ));
                }
                None
            }
            GUARD_ALL_PIECES_ASSIGNED => {
                if to == StageCode::Completed && ctx.unassigned_piece_types > 0 {
                    return Some(format!(
                        "完工前仍有{}个板件规格存在未装托余量",
                        ctx.unassigned_piece_types
                    ));
                }
                None
            }
            _ => None,
        }
    }
}
