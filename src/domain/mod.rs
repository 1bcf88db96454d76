// ==========================================
// 板件切割生产跟踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod history;
pub mod order;
pub mod pallet;
pub mod types;

// 重导出核心类型
pub use history::StageHistoryEntry;
pub use order::{PieceType, Position, ProductionOrder};
pub use pallet::{Pallet, PalletLimits, PalletPieceAssignment, PalletStats};
pub use types::{GuardSeverity, PalletDestination, PalletStatus, StackingModel, StageCode};
