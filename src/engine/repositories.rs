// ==========================================
// 板件切割生产跟踪系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合流转/分配引擎所需的所有 Repository
// 目标: 减少引擎构造函数参数数量,便于测试时整体装配
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::repository::{
    OrderRepository, PalletRepository, PieceTypeRepository, PositionRepository,
    StageHistoryRepository,
};

/// 生产跟踪仓储集合
///
/// 将 5 个 Repository 参数合并为 1 个结构体参数,简化依赖注入。
#[derive(Clone)]
pub struct TrackingRepositories {
    /// 订单仓储
    pub order_repo: Arc<OrderRepository>,
    /// 排料位仓储
    pub position_repo: Arc<PositionRepository>,
    /// 板件规格仓储
    pub piece_type_repo: Arc<PieceTypeRepository>,
    /// 托盘仓储
    pub pallet_repo: Arc<PalletRepository>,
    /// 流转日志仓储
    pub history_repo: Arc<StageHistoryRepository>,
}

impl TrackingRepositories {
    /// 创建新的仓储集合
    pub fn new(
        order_repo: Arc<OrderRepository>,
        position_repo: Arc<PositionRepository>,
        piece_type_repo: Arc<PieceTypeRepository>,
        pallet_repo: Arc<PalletRepository>,
        history_repo: Arc<StageHistoryRepository>,
    ) -> Self {
        Self {
            order_repo,
            position_repo,
            piece_type_repo,
            pallet_repo,
            history_repo,
        }
    }

    /// 从共享连接装配全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            order_repo: Arc::new(OrderRepository::new(conn.clone())),
            position_repo: Arc::new(PositionRepository::new(conn.clone())),
            piece_type_repo: Arc::new(PieceTypeRepository::new(conn.clone())),
            pallet_repo: Arc::new(PalletRepository::new(conn.clone())),
            history_repo: Arc::new(StageHistoryRepository::new(conn)),
        }
    }
}
