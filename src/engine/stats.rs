// ==========================================
// 板件切割生产跟踪系统 - 托盘统计计算
// ==========================================
// 职责: 重量/堆高/利用率的显式可复现公式
// 红线: 堆高口径必须是具名策略 (StackingModel), 不允许隐式假设
// ==========================================
// 公式:
// - weight = Σ(quantity_i × unit_weight_i)
// - height (LAYERED) = Σ(ceil(quantity_i / per_layer_i) × thickness_i)
// - height (FLAT)    = Σ(quantity_i × thickness_i)
// - utilization% = max(weight/max_weight, height/max_height) × 100, 上限100
// ==========================================

use serde::{Deserialize, Serialize};

use crate::config::config_manager::{
    DEFAULT_BOARD_DENSITY_KG_M3, DEFAULT_DECK_LENGTH_MM, DEFAULT_DECK_WIDTH_MM,
};
use crate::domain::order::PieceType;
use crate::domain::pallet::PalletStats;
use crate::domain::types::StackingModel;

// ==========================================
// StatsPolicy - 统计口径
// ==========================================
// 堆叠模型 + 密度 + 托面尺寸,一次装配,全程共用
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsPolicy {
    pub model: StackingModel,      // 堆叠模型
    pub board_density_kg_m3: f64,  // 板材密度
    pub deck_length_mm: f64,       // 托面长度
    pub deck_width_mm: f64,        // 托面宽度
}

impl Default for StatsPolicy {
    fn default() -> Self {
        Self {
            model: StackingModel::Layered,
            board_density_kg_m3: DEFAULT_BOARD_DENSITY_KG_M3,
            deck_length_mm: DEFAULT_DECK_LENGTH_MM,
            deck_width_mm: DEFAULT_DECK_WIDTH_MM,
        }
    }
}

impl StatsPolicy {
    /// 从配置装配统计口径
    pub fn from_config(
        config: &crate::config::ConfigManager,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            model: config.stacking_model()?,
            board_density_kg_m3: config.board_density_kg_m3()?,
            deck_length_mm: config.deck_length_mm()?,
            deck_width_mm: config.deck_width_mm()?,
        })
    }
}

// ==========================================
// PalletStatsCalculator - 纯函数工具类
// ==========================================
pub struct PalletStatsCalculator;

impl PalletStatsCalculator {
    /// 单个板件规格在托盘上占用的堆高(mm)
    pub fn stack_height_mm(policy: &StatsPolicy, piece: &PieceType, quantity: i64) -> f64 {
        if quantity <= 0 {
            return 0.0;
        }
        match policy.model {
            StackingModel::Layered => {
                let per_layer =
                    piece.per_layer_capacity(policy.deck_length_mm, policy.deck_width_mm);
                let layers = (quantity + per_layer - 1) / per_layer; // ceil
                layers as f64 * piece.thickness_mm
            }
            StackingModel::Flat => quantity as f64 * piece.thickness_mm,
        }
    }

    /// 计算托盘统计
    ///
    /// # 参数
    /// - items: (板件规格, 装托数量) 列表
    /// - max_weight_kg / max_height_mm: 该托盘的容量限制
    pub fn compute(
        policy: &StatsPolicy,
        items: &[(&PieceType, i64)],
        max_weight_kg: f64,
        max_height_mm: f64,
    ) -> PalletStats {
        let mut weight_kg = 0.0;
        let mut height_mm = 0.0;
        let mut piece_count = 0;

        for (piece, qty) in items {
            if *qty <= 0 {
                continue;
            }
            weight_kg += *qty as f64 * piece.unit_weight_kg(policy.board_density_kg_m3);
            height_mm += Self::stack_height_mm(policy, piece, *qty);
            piece_count += qty;
        }

        PalletStats {
            weight_kg,
            height_mm,
            piece_count,
            utilization_pct: Self::utilization_pct(
                weight_kg,
                height_mm,
                max_weight_kg,
                max_height_mm,
            ),
        }
    }

    /// 利用率(%): 重量与堆高两个维度取较紧的一侧
    pub fn utilization_pct(
        weight_kg: f64,
        height_mm: f64,
        max_weight_kg: f64,
        max_height_mm: f64,
    ) -> f64 {
        let weight_ratio = if max_weight_kg > 0.0 {
            weight_kg / max_weight_kg
        } else {
            0.0
        };
        let height_ratio = if max_height_mm > 0.0 {
            height_mm / max_height_mm
        } else {
            0.0
        };
        (weight_ratio.max(height_ratio) * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(id: &str, length: f64, width: f64, thickness: f64) -> PieceType {
        PieceType {
            piece_type_id: id.to_string(),
            position_id: "POS1".to_string(),
            length_mm: length,
            width_mm: width,
            thickness_mm: thickness,
            planned_qty: 100,
            produced_ok_qty: 0,
            damaged_qty: 0,
            color: "白橡".to_string(),
            edging_required: false,
        }
    }

    #[test]
    fn test_layered_height() {
        let policy = StatsPolicy::default();
        // 600×400 → 每层12件; 30件 → 3层 × 18mm = 54mm
        let p = piece("PT1", 600.0, 400.0, 18.0);
        let h = PalletStatsCalculator::stack_height_mm(&policy, &p, 30);
        assert!((h - 54.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_height() {
        let policy = StatsPolicy {
            model: StackingModel::Flat,
            ..StatsPolicy::default()
        };
        let p = piece("PT1", 600.0, 400.0, 18.0);
        // 平铺口径: 30件 × 18mm = 540mm
        let h = PalletStatsCalculator::stack_height_mm(&policy, &p, 30);
        assert!((h - 540.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_stats() {
        let policy = StatsPolicy::default();
        let p1 = piece("PT1", 600.0, 400.0, 18.0);
        let p2 = piece("PT2", 1200.0, 600.0, 25.0);

        let stats =
            PalletStatsCalculator::compute(&policy, &[(&p1, 12), (&p2, 4)], 1000.0, 1800.0);

        // p1: 12件正好1层 → 18mm; p2: 2400×1200/(1200×600)=4件/层 → 1层 → 25mm
        assert!((stats.height_mm - 43.0).abs() < 1e-9);
        assert_eq!(stats.piece_count, 16);

        // p1 单重 2.9376, p2 单重 0.6×1.2×0.025×680 = 12.24
        let expected_weight = 12.0 * 2.9376 + 4.0 * 12.24;
        assert!((stats.weight_kg - expected_weight).abs() < 1e-6);
        assert!(stats.utilization_pct > 0.0);
    }

    #[test]
    fn test_utilization_takes_tighter_dimension() {
        // 重量占50%, 高度占90% → 利用率90%
        let pct = PalletStatsCalculator::utilization_pct(500.0, 1620.0, 1000.0, 1800.0);
        assert!((pct - 90.0).abs() < 1e-9);

        // 超限封顶100
        let pct = PalletStatsCalculator::utilization_pct(1500.0, 0.0, 1000.0, 1800.0);
        assert!((pct - 100.0).abs() < 1e-9);
    }
}
