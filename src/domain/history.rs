// ==========================================
// 板件切割生产跟踪系统 - 阶段流转日志
// ==========================================
// 红线: 仅追加,不可修改,不可删除
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::StageCode;

// ==========================================
// StageHistoryEntry - 阶段流转日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub history_id: String,          // 日志ID
    pub order_id: String,            // 订单ID
    pub from_stage: StageCode,       // 原阶段
    pub to_stage: StageCode,         // 新阶段
    pub changed_at: NaiveDateTime,   // 流转时间
    pub operator: Option<String>,    // 操作员
    pub location: Option<String>,    // 操作地点
    pub comment: Option<String>,     // 备注
}
