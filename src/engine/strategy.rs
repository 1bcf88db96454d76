// ==========================================
// 板件切割生产跟踪系统 - 分托策略定义
// ==========================================
// 用途：
// - 自动分托在不落库的前提下,使用不同策略生成草稿托盘;
// - 批量落库时复用相同策略参数,保证结果可复现。

use serde::{Deserialize, Serialize};

/// 自动分托策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningStrategy {
    ByColor,             // 同色同托
    BySize,              // 大件优先(首次适应递减)
    EdgePriority,        // 封边件优先
    MaximizeUtilization, // 装满为止
    Mixed,               // 混合加权
    Intelligent,         // 智能(推荐默认)
}

impl PlanningStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanningStrategy::ByColor => "by_color",
            PlanningStrategy::BySize => "by_size",
            PlanningStrategy::EdgePriority => "edge_priority",
            PlanningStrategy::MaximizeUtilization => "maximize_utilization",
            PlanningStrategy::Mixed => "mixed",
            PlanningStrategy::Intelligent => "intelligent",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            PlanningStrategy::ByColor => "同色同托",
            PlanningStrategy::BySize => "大件优先",
            PlanningStrategy::EdgePriority => "封边优先",
            PlanningStrategy::MaximizeUtilization => "装满优先",
            PlanningStrategy::Mixed => "混合策略",
            PlanningStrategy::Intelligent => "智能分托",
        }
    }

    /// 该策略是否要求同色同托(颜色分组)
    pub fn groups_by_color(&self) -> bool {
        matches!(
            self,
            PlanningStrategy::ByColor | PlanningStrategy::Mixed | PlanningStrategy::Intelligent
        )
    }
}

impl Default for PlanningStrategy {
    fn default() -> Self {
        PlanningStrategy::Intelligent
    }
}

impl std::str::FromStr for PlanningStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "by_color" => Ok(PlanningStrategy::ByColor),
            "by_size" => Ok(PlanningStrategy::BySize),
            "edge_priority" => Ok(PlanningStrategy::EdgePriority),
            "maximize_utilization" => Ok(PlanningStrategy::MaximizeUtilization),
            "mixed" => Ok(PlanningStrategy::Mixed),
            "intelligent" => Ok(PlanningStrategy::Intelligent),
            other => Err(format!("未知分托策略: {}", other)),
        }
    }
}
