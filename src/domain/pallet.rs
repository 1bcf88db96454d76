// ==========================================
// 板件切割生产跟踪系统 - 托盘领域模型
// ==========================================
// 职责: 托盘与装载明细实体
// 红线: 托盘与板件规格之间只通过装载明细弱关联,互不拥有
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{PalletDestination, PalletStatus};

// ==========================================
// Pallet - 托盘
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pallet {
    pub pallet_id: String,               // 托盘ID
    pub pallet_no: i32,                  // 托盘显示编号(订单内递增)
    pub order_id: String,                // 所属订单
    pub position_id: Option<String>,     // 可选: 限定到某个排料位
    pub destination: PalletDestination,  // 目的地
    pub status: PalletStatus,            // 生命周期状态
    pub max_weight_kg: f64,              // 最大载重(kg)
    pub max_height_mm: f64,              // 最大堆高(mm)
    pub closed_weight_kg: Option<f64>,   // 封托时冻结的重量快照
    pub closed_height_mm: Option<f64>,   // 封托时冻结的高度快照
    pub closed_at: Option<NaiveDateTime>,// 封托时间
    pub created_at: NaiveDateTime,       // 创建时间
}

impl Pallet {
    /// 判断装载明细是否可修改
    pub fn is_mutable(&self) -> bool {
        self.status.is_mutable()
    }
}

// ==========================================
// PalletPieceAssignment - 托盘装载明细
// ==========================================
// 连接行: (pallet_id, piece_type_id, quantity), quantity > 0
// 同一 piece_type 跨所有托盘的数量之和受可装数量不变量约束
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletPieceAssignment {
    pub pallet_id: String,     // 托盘ID
    pub piece_type_id: String, // 板件规格ID
    pub quantity: i64,         // 装托数量 (>0)
}

// ==========================================
// PalletStats - 托盘统计
// ==========================================
// 每次装载变更后重算并返回,封托时冻结为快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalletStats {
    pub weight_kg: f64,       // 当前重量
    pub height_mm: f64,       // 当前堆高
    pub piece_count: i64,     // 装载件数
    pub utilization_pct: f64, // 利用率(%)
}

impl PalletStats {
    /// 空托盘统计
    pub fn empty() -> Self {
        Self {
            weight_kg: 0.0,
            height_mm: 0.0,
            piece_count: 0,
            utilization_pct: 0.0,
        }
    }
}

// ==========================================
// PalletLimits - 托盘容量限制
// ==========================================
// 手工开托与自动分托共用的限制参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PalletLimits {
    pub max_weight_kg: f64, // 最大载重(kg)
    pub max_height_mm: f64, // 最大堆高(mm)
}

impl Default for PalletLimits {
    fn default() -> Self {
        // 现场常用托盘规格: 载重1000kg, 堆高1800mm
        Self {
            max_weight_kg: 1000.0,
            max_height_mm: 1800.0,
        }
    }
}
