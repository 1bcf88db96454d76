// ==========================================
// 板件切割生产跟踪系统 - API层输入校验
// ==========================================
// 职责: 进入存储读写前的参数校验
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::{PalletDestination, StageCode};
use crate::engine::strategy::PlanningStrategy;

/// 校验字符串字段非空
pub fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

/// 校验优先级在 1-10 范围内
pub fn require_priority(priority: i32) -> ApiResult<()> {
    if !(1..=10).contains(&priority) {
        return Err(ApiError::InvalidInput(format!(
            "优先级必须在1-10之间: {}",
            priority
        )));
    }
    Ok(())
}

/// 校验数量为正
pub fn require_positive_qty(field: &str, qty: i64) -> ApiResult<()> {
    if qty <= 0 {
        return Err(ApiError::InvalidInput(format!(
            "{}必须大于0: {}",
            field, qty
        )));
    }
    Ok(())
}

/// 校验尺寸为正
pub fn require_positive_dim(field: &str, value: f64) -> ApiResult<()> {
    if value <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "{}必须大于0: {}",
            field, value
        )));
    }
    Ok(())
}

/// 解析阶段代码
pub fn parse_stage(raw: &str) -> ApiResult<StageCode> {
    StageCode::from_str(raw)
        .ok_or_else(|| ApiError::InvalidInput(format!("未知阶段代码: {}", raw)))
}

/// 解析托盘目的地
pub fn parse_destination(raw: &str) -> ApiResult<PalletDestination> {
    PalletDestination::from_str(raw)
        .ok_or_else(|| ApiError::InvalidInput(format!("未知托盘目的地: {}", raw)))
}

/// 解析分托策略(缺省使用智能策略)
pub fn parse_strategy(raw: Option<&str>) -> ApiResult<PlanningStrategy> {
    match raw {
        None => Ok(PlanningStrategy::default()),
        Some(s) => s
            .parse::<PlanningStrategy>()
            .map_err(ApiError::InvalidInput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_priority_bounds() {
        assert!(require_priority(1).is_ok());
        assert!(require_priority(10).is_ok());
        assert!(require_priority(0).is_err());
        assert!(require_priority(11).is_err());
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!(parse_stage("cut_start").unwrap(), StageCode::CutStart);
        assert!(parse_stage("NOT_A_STAGE").is_err());
    }

    #[test]
    fn test_parse_strategy_default() {
        assert_eq!(parse_strategy(None).unwrap(), PlanningStrategy::Intelligent);
        assert_eq!(
            parse_strategy(Some("by-color")).unwrap(),
            PlanningStrategy::ByColor
        );
        assert!(parse_strategy(Some("magic")).is_err());
    }
}
