// ==========================================
// 板件切割生产跟踪系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换引擎/仓储错误为用户友好的错误消息
// 红线: 所有错误信息必须包含显式原因
// ==========================================

use thiserror::Error;

use crate::engine::error::EngineError;
use crate::engine::guards::GuardWarning;
use crate::repository::error::RepositoryError;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与资源错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 工序流转错误
    // ==========================================
    #[error("非法阶段流转: {0}")]
    IllegalTransition(String),

    #[error("流转守卫失败: {0}")]
    GuardFailed(String),

    #[error("存在{}条需要确认的警告", .warnings.len())]
    GuardNeedsConfirm { warnings: Vec<GuardWarning> },

    // ==========================================
    // 托盘分配错误
    // ==========================================
    #[error("装托数量超出可装上限: piece_type={piece_type_id}, 请求{requested}件, 最多可装{max_amount}件")]
    AllocationExceeded {
        piece_type_id: String,
        requested: i64,
        max_amount: i64,
    },

    #[error("托盘容量超限: {0}")]
    CapacityExceeded(String),

    #[error("托盘已封闭: {0}")]
    PalletClosed(String),

    #[error("批量落库冲突: {0}")]
    AllocationConflict(String),

    // ==========================================
    // 外部协作方与数据访问错误
    // ==========================================
    #[error("外部协作方不可达: {0}")]
    Connectivity(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 EngineError 转换
// 目的: 引擎层技术语义 → 用户可读的业务错误
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::InvalidInput(msg),
            EngineError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            EngineError::InvalidState(msg) => ApiError::BusinessRuleViolation(msg),
            e @ EngineError::IllegalTransition { .. } => {
                ApiError::IllegalTransition(e.to_string())
            }
            e @ EngineError::GuardFailed { .. } => ApiError::GuardFailed(e.to_string()),
            EngineError::GuardUnconfirmed { warnings } => {
                ApiError::GuardNeedsConfirm { warnings }
            }
            EngineError::AllocationExceeded {
                piece_type_id,
                requested,
                max_amount,
            } => ApiError::AllocationExceeded {
                piece_type_id,
                requested,
                max_amount,
            },
            e @ EngineError::CapacityExceeded { .. } => {
                ApiError::CapacityExceeded(e.to_string())
            }
            EngineError::PalletClosed(pallet_id) => ApiError::PalletClosed(pallet_id),
            e @ EngineError::AllocationConflict { .. } => {
                ApiError::AllocationConflict(e.to_string())
            }
            EngineError::Connectivity(msg) => ApiError::Connectivity(msg),
            EngineError::Config(msg) => ApiError::InternalError(format!("配置读取失败: {}", msg)),
            EngineError::Repository(repo_err) => repo_err.into(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::LockError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("检查约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_conversion() {
        let err = EngineError::AllocationExceeded {
            piece_type_id: "PT1".to_string(),
            requested: 50,
            max_amount: 40,
        };
        let api_err: ApiError = err.into();
        match api_err {
            ApiError::AllocationExceeded {
                requested,
                max_amount,
                ..
            } => {
                assert_eq!(requested, 50);
                assert_eq!(max_amount, 40);
            }
            _ => panic!("期望 AllocationExceeded"),
        }
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Pallet".to_string(),
            id: "PAL1".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Pallet"));
                assert!(msg.contains("PAL1"));
            }
            _ => panic!("期望 NotFound"),
        }
    }
}
