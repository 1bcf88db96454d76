// ==========================================
// 板件切割生产跟踪系统 - 可装数量纯函数库
// ==========================================
// 职责: 提供可装数量计算与装托校验的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================
// 核心不变量: 对每个板件规格 p, 任意时刻
//   Σ(p 跨所有托盘的已装数量) ≤ planned(p) - damaged(p)
// 手工装托、自动分托、批量落库复核三条路径共用同一份校验,
// 不允许各自另写一套口径。
// ==========================================

use crate::domain::order::PieceType;
use crate::domain::pallet::PalletPieceAssignment;
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// AvailabilityCore - 纯函数工具类
// ==========================================
pub struct AvailabilityCore;

impl AvailabilityCore {
    /// 可装数量
    ///
    /// # 公式
    /// - available = planned - damaged - assigned_total
    pub fn available_quantity(planned_qty: i64, damaged_qty: i64, assigned_total: i64) -> i64 {
        planned_qty - damaged_qty - assigned_total
    }

    /// 从装载明细列表计算某板件规格的已装合计
    ///
    /// # 参数
    /// - excluding_pallet_id: 排除的托盘（覆写该托盘自身装载量时使用）
    pub fn assigned_total(
        assignments: &[PalletPieceAssignment],
        piece_type_id: &str,
        excluding_pallet_id: Option<&str>,
    ) -> i64 {
        assignments
            .iter()
            .filter(|a| a.piece_type_id == piece_type_id)
            .filter(|a| excluding_pallet_id.map_or(true, |ex| a.pallet_id != ex))
            .map(|a| a.quantity)
            .sum()
    }

    /// 从装载明细列表计算某板件规格的可装数量
    pub fn available_for(
        piece: &PieceType,
        assignments: &[PalletPieceAssignment],
        excluding_pallet_id: Option<&str>,
    ) -> i64 {
        let assigned =
            Self::assigned_total(assignments, &piece.piece_type_id, excluding_pallet_id);
        Self::available_quantity(piece.planned_qty, piece.damaged_qty, assigned)
    }

    /// 统一的装托校验
    ///
    /// # 规则
    /// 1. requested > 0,否则参数校验失败
    /// 2. requested ≤ available,否则拒绝并携带最大可装数量,供调用方截断后重试
    pub fn validate_assignment(
        piece: &PieceType,
        assigned_total: i64,
        requested: i64,
    ) -> EngineResult<()> {
        if requested <= 0 {
            return Err(EngineError::Validation(format!(
                "装托数量必须大于0: piece_type={}, 请求{}",
                piece.piece_type_id, requested
            )));
        }

        let available =
            Self::available_quantity(piece.planned_qty, piece.damaged_qty, assigned_total);
        if requested > available {
            return Err(EngineError::AllocationExceeded {
                piece_type_id: piece.piece_type_id.clone(),
                requested,
                max_amount: available.max(0),
            });
        }

        Ok(())
    }
}
