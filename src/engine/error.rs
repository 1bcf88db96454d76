// ==========================================
// 板件切割生产跟踪系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 所有失败必须携带显式原因,不允许静默吞错
// ==========================================

use thiserror::Error;

use crate::domain::types::StageCode;
use crate::engine::guards::GuardWarning;
use crate::repository::error::RepositoryError;

/// 容量超限维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityKind {
    Weight, // 载重
    Height, // 堆高
}

impl std::fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityKind::Weight => write!(f, "WEIGHT"),
            CapacityKind::Height => write!(f, "HEIGHT"),
        }
    }
}

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入校验 =====
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("记录未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    // ===== 阶段流转 =====
    #[error("订单处于终态,不允许流转: {0}")]
    InvalidState(String),

    #[error("非法阶段流转: {from} → {to}, 允许的目标: [{}]", format_stage_list(.allowed))]
    IllegalTransition {
        from: StageCode,
        to: StageCode,
        allowed: Vec<StageCode>,
    },

    #[error("流转守卫失败 ({guard}): {reason}")]
    GuardFailed { guard: String, reason: String },

    #[error("存在{}条需要确认的警告,请使用 force=true 重试", .warnings.len())]
    GuardUnconfirmed { warnings: Vec<GuardWarning> },

    // ===== 托盘分配 =====
    #[error("装托数量超出可装上限: piece_type={piece_type_id}, 请求{requested}件, 最多可装{max_amount}件")]
    AllocationExceeded {
        piece_type_id: String,
        requested: i64,
        max_amount: i64,
    },

    #[error("托盘容量超限 ({kind}): pallet={pallet_id}, 上限{limit:.1}, 实际{actual:.1}")]
    CapacityExceeded {
        pallet_id: String,
        kind: CapacityKind,
        limit: f64,
        actual: f64,
    },

    #[error("托盘已封闭,不允许修改装载明细: pallet={0}")]
    PalletClosed(String),

    // ===== 并发提交 =====
    #[error("批量落库冲突: order={order_id}, {detail}")]
    AllocationConflict { order_id: String, detail: String },

    // ===== 外部协作方 =====
    #[error("外部协作方不可达: {0}")]
    Connectivity(String),

    #[error("配置读取失败: {0}")]
    Config(String),

    // ===== 数据访问 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

/// 错误消息中列举合法的流转目标
fn format_stage_list(stages: &[StageCode]) -> String {
    stages
        .iter()
        .map(|s| s.to_db_str())
        .collect::<Vec<_>>()
        .join(", ")
}
