// ==========================================
// 板件切割生产跟踪系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod history_repo;
pub mod order_repo;
pub mod pallet_repo;
pub mod position_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::StageHistoryRepository;
pub use order_repo::OrderRepository;
pub use pallet_repo::PalletRepository;
pub use position_repo::{PieceTypeRepository, PositionRepository};

use chrono::NaiveDateTime;

use crate::domain::types::{PalletDestination, PalletStatus, StageCode};

/// 数据库时间戳格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 格式化时间戳为数据库文本
pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// 解析数据库文本时间戳
pub(crate) fn parse_datetime(col: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 解析数据库中的阶段代码
pub(crate) fn parse_stage(col: usize, raw: &str) -> rusqlite::Result<StageCode> {
    StageCode::from_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("未知阶段代码: {}", raw).into(),
        )
    })
}

/// 解析数据库中的托盘状态
pub(crate) fn parse_pallet_status(col: usize, raw: &str) -> rusqlite::Result<PalletStatus> {
    PalletStatus::from_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("未知托盘状态: {}", raw).into(),
        )
    })
}

/// 解析数据库中的托盘目的地
pub(crate) fn parse_destination(col: usize, raw: &str) -> rusqlite::Result<PalletDestination> {
    PalletDestination::from_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("未知托盘目的地: {}", raw).into(),
        )
    })
}
