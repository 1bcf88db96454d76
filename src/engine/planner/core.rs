// ==========================================
// 板件切割生产跟踪系统 - 分托装箱纯逻辑
// ==========================================
// 职责: 分组、排序、贪心装箱的纯函数
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================
// 装箱口径:
// - 同一托盘上每个板件规格至多一条明细
// - 超出当前托盘余量即另开新托
// - 单件即超限的超规格件独占一托(允许超限,利用率封顶显示)
// ==========================================

use crate::domain::order::PieceType;
use crate::domain::pallet::PalletLimits;
use crate::domain::types::StackingModel;
use crate::engine::stats::{PalletStatsCalculator, StatsPolicy};
use crate::engine::strategy::PlanningStrategy;

// ==========================================
// PackInput - 待装箱条目
// ==========================================
#[derive(Debug, Clone)]
pub struct PackInput {
    pub piece: PieceType,
    pub qty: i64,
}

/// 装箱结果中的单条明细
#[derive(Debug, Clone)]
pub struct PackedEntry {
    pub piece_type_id: String,
    pub quantity: i64,
}

/// 装箱结果中的单个托盘
#[derive(Debug, Clone)]
pub struct PackedPallet {
    pub entries: Vec<PackedEntry>,
    pub weight_kg: f64,
    pub height_mm: f64,
}

/// 策略化装箱入口
pub fn pack(
    strategy: PlanningStrategy,
    policy: &StatsPolicy,
    limits: &PalletLimits,
    inputs: Vec<PackInput>,
) -> Vec<PackedPallet> {
    let mut result = Vec::new();
    for mut group in group_inputs(strategy, inputs) {
        sort_group(strategy, policy, &mut group);
        result.extend(pack_group(policy, limits, &group));
    }
    result
}

/// 按策略分组
///
/// 同色同托类策略按颜色分组(组间绝不混装),其余策略单组处理。
/// 分组按颜色排序,保证结果可复现。
pub fn group_inputs(strategy: PlanningStrategy, inputs: Vec<PackInput>) -> Vec<Vec<PackInput>> {
    if !strategy.groups_by_color() {
        return if inputs.is_empty() {
            Vec::new()
        } else {
            vec![inputs]
        };
    }

    let mut groups: Vec<(String, Vec<PackInput>)> = Vec::new();
    for input in inputs {
        match groups.iter_mut().find(|(color, _)| *color == input.piece.color) {
            Some((_, group)) => group.push(input),
            None => groups.push((input.piece.color.clone(), vec![input])),
        }
    }
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups.into_iter().map(|(_, g)| g).collect()
}

/// 组内排序
///
/// - by_size: 占地面积递减(首次适应递减)
/// - edge_priority: 封边件优先,同级按面积递减
/// - maximize_utilization: 单件体积(∝重量)递减,优先填满载重
/// - by_color: 按规格ID稳定排序
/// - mixed / intelligent: 封边优先 + 体积递减
pub fn sort_group(strategy: PlanningStrategy, _policy: &StatsPolicy, group: &mut [PackInput]) {
    match strategy {
        PlanningStrategy::ByColor => {
            group.sort_by(|a, b| a.piece.piece_type_id.cmp(&b.piece.piece_type_id));
        }
        PlanningStrategy::BySize => {
            group.sort_by(|a, b| {
                cmp_f64_desc(a.piece.footprint_mm2(), b.piece.footprint_mm2())
                    .then_with(|| a.piece.piece_type_id.cmp(&b.piece.piece_type_id))
            });
        }
        PlanningStrategy::EdgePriority => {
            group.sort_by(|a, b| {
                b.piece
                    .edging_required
                    .cmp(&a.piece.edging_required)
                    .then_with(|| cmp_f64_desc(a.piece.footprint_mm2(), b.piece.footprint_mm2()))
                    .then_with(|| a.piece.piece_type_id.cmp(&b.piece.piece_type_id))
            });
        }
        PlanningStrategy::MaximizeUtilization => {
            group.sort_by(|a, b| {
                cmp_f64_desc(volume_mm3(&a.piece), volume_mm3(&b.piece))
                    .then_with(|| a.piece.piece_type_id.cmp(&b.piece.piece_type_id))
            });
        }
        PlanningStrategy::Mixed | PlanningStrategy::Intelligent => {
            group.sort_by(|a, b| {
                b.piece
                    .edging_required
                    .cmp(&a.piece.edging_required)
                    .then_with(|| cmp_f64_desc(volume_mm3(&a.piece), volume_mm3(&b.piece)))
                    .then_with(|| a.piece.piece_type_id.cmp(&b.piece.piece_type_id))
            });
        }
    }
}

/// 组内贪心装箱: 装到容量上限即另开新托
pub fn pack_group(
    policy: &StatsPolicy,
    limits: &PalletLimits,
    group: &[PackInput],
) -> Vec<PackedPallet> {
    let mut pallets = Vec::new();
    let mut current = PackedPallet {
        entries: Vec::new(),
        weight_kg: 0.0,
        height_mm: 0.0,
    };

    for input in group {
        let piece = &input.piece;
        let unit_weight = piece.unit_weight_kg(policy.board_density_kg_m3);
        let mut remaining = input.qty;

        while remaining > 0 {
            let take = max_units_fitting(policy, limits, &current, piece, unit_weight, remaining);

            let take = if take > 0 {
                take
            } else if current.entries.is_empty() {
                // 超规格件: 空托盘上强制装1件,独占一托
                1
            } else {
                // 当前托盘已满,另开新托
                pallets.push(std::mem::replace(
                    &mut current,
                    PackedPallet {
                        entries: Vec::new(),
                        weight_kg: 0.0,
                        height_mm: 0.0,
                    },
                ));
                continue;
            };

            current.entries.push(PackedEntry {
                piece_type_id: piece.piece_type_id.clone(),
                quantity: take,
            });
            current.weight_kg += take as f64 * unit_weight;
            current.height_mm += PalletStatsCalculator::stack_height_mm(policy, piece, take);
            remaining -= take;

            if remaining > 0 {
                // 本规格未装完说明托盘已到上限,另开新托
                pallets.push(std::mem::replace(
                    &mut current,
                    PackedPallet {
                        entries: Vec::new(),
                        weight_kg: 0.0,
                        height_mm: 0.0,
                    },
                ));
            }
        }
    }

    if !current.entries.is_empty() {
        pallets.push(current);
    }
    pallets
}

/// 当前托盘余量内最多还能装的件数
fn max_units_fitting(
    policy: &StatsPolicy,
    limits: &PalletLimits,
    current: &PackedPallet,
    piece: &PieceType,
    unit_weight: f64,
    remaining: i64,
) -> i64 {
    let rem_weight = (limits.max_weight_kg - current.weight_kg).max(0.0);
    let rem_height = (limits.max_height_mm - current.height_mm).max(0.0);

    let by_weight = if unit_weight > 0.0 {
        (rem_weight / unit_weight).floor() as i64
    } else {
        remaining
    };

    let by_height = if piece.thickness_mm > 0.0 {
        let layers = (rem_height / piece.thickness_mm).floor() as i64;
        match policy.model {
            StackingModel::Layered => {
                layers * piece.per_layer_capacity(policy.deck_length_mm, policy.deck_width_mm)
            }
            StackingModel::Flat => layers,
        }
    } else {
        remaining
    };

    remaining.min(by_weight).min(by_height).max(0)
}

fn volume_mm3(piece: &PieceType) -> f64 {
    piece.length_mm * piece.width_mm * piece.thickness_mm
}

fn cmp_f64_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}
