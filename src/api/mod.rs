// ==========================================
// 板件切割生产跟踪系统 - API 层
// ==========================================
// 职责: 面向调用方的业务门面与请求/响应 DTO
// 约束: 参数校验在进入引擎前完成;引擎错误统一映射为 ApiError
// ==========================================

pub mod error;
pub mod order_api;
pub mod pallet_api;
pub mod validator;

pub use error::{ApiError, ApiResult};
pub use order_api::OrderApi;
pub use pallet_api::PalletApi;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::history::StageHistoryEntry;
use crate::domain::order::{PieceType, Position, ProductionOrder};
use crate::domain::pallet::{Pallet, PalletLimits, PalletPieceAssignment, PalletStats};
use crate::engine::guards::GuardWarning;

// ==========================================
// 订单侧 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub order_no: String,
    pub customer_name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub planned_at: Option<NaiveDateTime>,
}

fn default_priority() -> i32 {
    5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub planned_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPieceTypeRequest {
    pub length_mm: f64,
    pub width_mm: f64,
    pub thickness_mm: f64,
    pub planned_qty: i64,
    pub color: String,
    #[serde(default)]
    pub edging_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPositionRequest {
    pub material_name: String,
    pub color: String,
    pub plate_count: i32,
    #[serde(default)]
    pub layout_ref: Option<String>,
    pub piece_types: Vec<NewPieceTypeRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDetail {
    pub position: Position,
    pub piece_types: Vec<PieceType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletDetail {
    pub pallet: Pallet,
    pub assignments: Vec<PalletPieceAssignment>,
    pub stats: PalletStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: ProductionOrder,
    pub positions: Vec<PositionDetail>,
    pub pallets: Vec<PalletDetail>,
    pub history: Vec<StageHistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub target_stage: String,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub message: String,
    /// 阻断性错误(硬守卫/非法流转)
    pub errors: Vec<String>,
    /// 可 force 放行的软守卫警告
    pub warnings: Vec<GuardWarning>,
}

// ==========================================
// 托盘侧 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePalletRequest {
    pub order_id: String,
    #[serde(default)]
    pub position_id: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub max_weight_kg: Option<f64>,
    #[serde(default)]
    pub max_height_mm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub pallet_id: String,
    pub piece_type_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuantityRequest {
    pub pallet_id: String,
    pub piece_type_id: String,
    pub new_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_pallet_id: String,
    pub to_pallet_id: String,
    pub piece_type_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletOpResponse {
    pub success: bool,
    pub message: String,
    pub stats: PalletStats,
    /// 软性容量警告
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePalletsResponse {
    pub success: bool,
    pub message: String,
    pub deleted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub order_id: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub limits: Option<PalletLimits>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub success: bool,
    pub message: String,
    pub strategy: String,
    pub pallets: Vec<crate::engine::planner::PlannedPallet>,
    pub total_assigned: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftAssignmentRequest {
    pub piece_type_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPalletRequest {
    #[serde(default)]
    pub position_id: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub max_weight_kg: Option<f64>,
    #[serde(default)]
    pub max_height_mm: Option<f64>,
    pub assignments: Vec<DraftAssignmentRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitBatchRequest {
    pub order_id: String,
    pub pallets: Vec<DraftPalletRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitBatchResponse {
    pub success: bool,
    pub message: String,
    pub created_pallet_ids: Vec<String>,
    pub skipped_empty: usize,
}
