// ==========================================
// 板件切割生产跟踪系统 - 订单仓储
// ==========================================
// 职责: production_order 表数据访问
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use crate::domain::order::ProductionOrder;
use crate::domain::types::StageCode;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime, parse_stage};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建订单
    pub fn create(&self, order: &ProductionOrder) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO production_order (
                order_id, order_no, stage, priority, customer_name,
                comment, created_at, planned_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &order.order_id,
                &order.order_no,
                order.stage.to_db_str(),
                &order.priority,
                &order.customer_name,
                &order.comment,
                format_datetime(&order.created_at),
                order.planned_at.as_ref().map(format_datetime),
                order.completed_at.as_ref().map(format_datetime),
            ],
        )?;

        Ok(order.order_id.clone())
    }

    /// 按 order_id 查询订单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT order_id, order_no, stage, priority, customer_name,
                      comment, created_at, planned_at, completed_at
               FROM production_order
               WHERE order_id = ?"#,
            params![order_id],
            Self::map_row,
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按工单号查询订单
    pub fn find_by_order_no(&self, order_no: &str) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT order_id, order_no, stage, priority, customer_name,
                      comment, created_at, planned_at, completed_at
               FROM production_order
               WHERE order_no = ?"#,
            params![order_no],
            Self::map_row,
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有订单（按创建时间倒序）
    pub fn list_all(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT order_id, order_no, stage, priority, customer_name,
                      comment, created_at, planned_at, completed_at
               FROM production_order
               ORDER BY created_at DESC, order_no DESC"#,
        )?;

        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<ProductionOrder>, _>>()?;

        Ok(orders)
    }

    /// 更新订单阶段
    ///
    /// 红线: 本方法只应由工序流转引擎调用
    pub fn update_stage(
        &self,
        order_id: &str,
        stage: StageCode,
        completed_at: Option<NaiveDateTime>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE production_order
               SET stage = ?, completed_at = ?
               WHERE order_id = ?"#,
            params![
                stage.to_db_str(),
                completed_at.as_ref().map(format_datetime),
                order_id
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新订单基础字段（优先级/客户/备注/计划时间）
    ///
    /// 阶段字段不在此更新范围内
    pub fn update_fields(&self, order: &ProductionOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE production_order
               SET priority = ?, customer_name = ?, comment = ?, planned_at = ?
               WHERE order_id = ?"#,
            params![
                &order.priority,
                &order.customer_name,
                &order.comment,
                order.planned_at.as_ref().map(format_datetime),
                &order.order_id,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order.order_id.clone(),
            });
        }
        Ok(())
    }

    /// 删除订单（级联删除排料位/板件规格/托盘/装载明细/流转日志）
    pub fn delete(&self, order_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "DELETE FROM production_order WHERE order_id = ?",
            params![order_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionOrder".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<ProductionOrder> {
        let stage_raw: String = row.get(2)?;
        let created_raw: String = row.get(6)?;
        let planned_raw: Option<String> = row.get(7)?;
        let completed_raw: Option<String> = row.get(8)?;

        Ok(ProductionOrder {
            order_id: row.get(0)?,
            order_no: row.get(1)?,
            stage: parse_stage(2, &stage_raw)?,
            priority: row.get(3)?,
            customer_name: row.get(4)?,
            comment: row.get(5)?,
            created_at: parse_datetime(6, &created_raw)?,
            planned_at: planned_raw.as_deref().map(|s| parse_datetime(7, s)).transpose()?,
            completed_at: completed_raw
                .as_deref()
                .map(|s| parse_datetime(8, s))
                .transpose()?,
        })
    }
}
