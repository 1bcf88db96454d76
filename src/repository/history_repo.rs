// ==========================================
// 板件切割生产跟踪系统 - 阶段流转日志仓储
// ==========================================
// 职责: stage_history 表数据访问
// 红线: 仅追加,不提供 update/delete
// ==========================================

use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use crate::domain::history::StageHistoryEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime, parse_stage};

// ==========================================
// StageHistoryRepository - 流转日志仓储
// ==========================================
pub struct StageHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StageHistoryRepository {
    /// 创建新的 StageHistoryRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条流转日志
    pub fn append(&self, entry: &StageHistoryEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO stage_history (
                history_id, order_id, from_stage, to_stage,
                changed_at, operator, location, comment
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &entry.history_id,
                &entry.order_id,
                entry.from_stage.to_db_str(),
                entry.to_stage.to_db_str(),
                format_datetime(&entry.changed_at),
                &entry.operator,
                &entry.location,
                &entry.comment,
            ],
        )?;

        Ok(entry.history_id.clone())
    }

    /// 查询订单的流转日志（按时间正序）
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<StageHistoryEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT history_id, order_id, from_stage, to_stage,
                      changed_at, operator, location, comment
               FROM stage_history
               WHERE order_id = ?
               ORDER BY changed_at ASC, history_id ASC"#,
        )?;

        let entries = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<Result<Vec<StageHistoryEntry>, _>>()?;

        Ok(entries)
    }

    /// 统计订单的流转日志条数
    pub fn count_by_order(&self, order_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM stage_history WHERE order_id = ?",
            params![order_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<StageHistoryEntry> {
        let from_raw: String = row.get(2)?;
        let to_raw: String = row.get(3)?;
        let changed_raw: String = row.get(4)?;

        Ok(StageHistoryEntry {
            history_id: row.get(0)?,
            order_id: row.get(1)?,
            from_stage: parse_stage(2, &from_raw)?,
            to_stage: parse_stage(3, &to_raw)?,
            changed_at: parse_datetime(4, &changed_raw)?,
            operator: row.get(5)?,
            location: row.get(6)?,
            comment: row.get(7)?,
        })
    }
}
