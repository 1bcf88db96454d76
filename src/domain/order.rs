// ==========================================
// 板件切割生产跟踪系统 - 订单领域模型
// ==========================================
// 职责: 订单/排料位/板件规格三级实体
// 红线: 订单状态只能经由工序流转引擎修改
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::StageCode;

// ==========================================
// ProductionOrder - 生产订单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub order_id: String,                    // 订单ID
    pub order_no: String,                    // 工单号(人工可读,唯一)
    pub stage: StageCode,                    // 当前工序阶段
    pub priority: i32,                       // 优先级 (1-10)
    pub customer_name: String,               // 客户名称
    pub comment: Option<String>,             // 备注
    pub created_at: NaiveDateTime,           // 创建时间
    pub planned_at: Option<NaiveDateTime>,   // 计划时间
    pub completed_at: Option<NaiveDateTime>, // 完成时间
}

impl ProductionOrder {
    /// 判断订单是否处于终态
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// 判断订单是否仍在初始阶段（排料位仅此阶段可增删改）
    pub fn is_editable(&self) -> bool {
        self.stage == StageCode::New
    }
}

// ==========================================
// Position - 排料位
// ==========================================
// 一个订单内的一组同材质/同排料图的板材
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,        // 排料位ID
    pub order_id: String,           // 所属订单
    pub material_name: String,      // 材质名称
    pub color: String,              // 颜色
    pub plate_count: i32,           // 原板张数
    pub layout_ref: Option<String>, // 排料图引用
    pub created_at: NaiveDateTime,  // 创建时间
}

// ==========================================
// PieceType - 板件规格
// ==========================================
// 核心不变量: available = planned - damaged - Σ(已装托数量)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceType {
    pub piece_type_id: String,  // 板件规格ID
    pub position_id: String,    // 所属排料位
    pub length_mm: f64,         // 长度(mm)
    pub width_mm: f64,          // 宽度(mm)
    pub thickness_mm: f64,      // 厚度(mm)
    pub planned_qty: i64,       // 计划数量
    pub produced_ok_qty: i64,   // 合格产出数量
    pub damaged_qty: i64,       // 报损数量
    pub color: String,          // 颜色
    pub edging_required: bool,  // 是否需要封边
}

impl PieceType {
    /// 单件重量(kg)
    ///
    /// # 公式
    /// - unit_weight = 长 × 宽 × 厚 (m³) × 板材密度 (kg/m³)
    pub fn unit_weight_kg(&self, board_density_kg_m3: f64) -> f64 {
        let volume_m3 =
            (self.length_mm / 1000.0) * (self.width_mm / 1000.0) * (self.thickness_mm / 1000.0);
        volume_m3 * board_density_kg_m3
    }

    /// 单件占地面积(mm²)
    pub fn footprint_mm2(&self) -> f64 {
        self.length_mm * self.width_mm
    }

    /// 单层可放件数（分层堆叠口径）
    ///
    /// # 公式
    /// - per_layer = max(1, floor(托面面积 / 板件面积))
    pub fn per_layer_capacity(&self, deck_length_mm: f64, deck_width_mm: f64) -> i64 {
        let deck_area = deck_length_mm * deck_width_mm;
        let piece_area = self.footprint_mm2();
        if piece_area <= 0.0 {
            return 1;
        }
        ((deck_area / piece_area).floor() as i64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(length: f64, width: f64, thickness: f64) -> PieceType {
        PieceType {
            piece_type_id: "PT1".to_string(),
            position_id: "POS1".to_string(),
            length_mm: length,
            width_mm: width,
            thickness_mm: thickness,
            planned_qty: 10,
            produced_ok_qty: 0,
            damaged_qty: 0,
            color: "白橡".to_string(),
            edging_required: false,
        }
    }

    #[test]
    fn test_unit_weight() {
        // 600×400×18mm, 密度680 → 0.6*0.4*0.018*680 = 2.9376 kg
        let p = piece(600.0, 400.0, 18.0);
        let w = p.unit_weight_kg(680.0);
        assert!((w - 2.9376).abs() < 1e-9);
    }

    #[test]
    fn test_per_layer_capacity() {
        // 2400×1200 托面, 600×400 板件 → 每层12件
        let p = piece(600.0, 400.0, 18.0);
        assert_eq!(p.per_layer_capacity(2400.0, 1200.0), 12);

        // 超大板件也至少占一层一件
        let big = piece(3000.0, 2000.0, 18.0);
        assert_eq!(big.per_layer_capacity(2400.0, 1200.0), 1);
    }
}
