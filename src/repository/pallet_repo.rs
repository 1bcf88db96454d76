// ==========================================
// 板件切割生产跟踪系统 - 托盘仓储
// ==========================================
// 职责: pallet / pallet_assignment 表数据访问
// 约束: 批量落库/双边转移必须在单事务内完成,不允许半提交
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use crate::domain::pallet::{Pallet, PalletPieceAssignment};
use crate::domain::types::PalletStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime, parse_destination, parse_pallet_status};

// ==========================================
// PalletRepository - 托盘仓储
// ==========================================
pub struct PalletRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PalletRepository {
    /// 创建新的 PalletRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 托盘 CRUD
    // ==========================================

    /// 创建托盘（自动分配订单内递增的显示编号）
    ///
    /// 说明：
    /// - 在同一事务内查询 MAX(pallet_no) 并写入,保证同一订单的编号分配原子性。
    /// - 该方法会覆盖传入的 `pallet.pallet_no`。
    pub fn create_with_next_no(&self, pallet: &mut Pallet) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let max_no: Option<i32> = tx.query_row(
            "SELECT MAX(pallet_no) FROM pallet WHERE order_id = ?",
            params![&pallet.order_id],
            |row| row.get(0),
        )?;
        pallet.pallet_no = max_no.unwrap_or(0) + 1;

        Self::insert_pallet(&tx, pallet)?;

        tx.commit()?;
        Ok(pallet.pallet_id.clone())
    }

    /// 按 pallet_id 查询托盘
    pub fn find_by_id(&self, pallet_id: &str) -> RepositoryResult<Option<Pallet>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE pallet_id = ?", Self::SELECT_PALLET),
            params![pallet_id],
            Self::map_row,
        ) {
            Ok(pallet) => Ok(Some(pallet)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询订单的所有托盘（按显示编号排序）
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Pallet>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE order_id = ? ORDER BY pallet_no ASC",
            Self::SELECT_PALLET
        ))?;

        let pallets = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<Result<Vec<Pallet>, _>>()?;

        Ok(pallets)
    }

    /// 更新托盘状态
    pub fn update_status(&self, pallet_id: &str, status: PalletStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE pallet SET status = ? WHERE pallet_id = ?",
            params![status.to_db_str(), pallet_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Pallet".to_string(),
                id: pallet_id.to_string(),
            });
        }
        Ok(())
    }

    /// 封托: 状态置为 CLOSED 并冻结统计快照
    pub fn close(
        &self,
        pallet_id: &str,
        weight_kg: f64,
        height_mm: f64,
        closed_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE pallet
               SET status = 'CLOSED', closed_weight_kg = ?, closed_height_mm = ?, closed_at = ?
               WHERE pallet_id = ?"#,
            params![weight_kg, height_mm, format_datetime(&closed_at), pallet_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Pallet".to_string(),
                id: pallet_id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除托盘（级联删除装载明细,即释放占用的可装数量）
    pub fn delete(&self, pallet_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute("DELETE FROM pallet WHERE pallet_id = ?", params![pallet_id])?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Pallet".to_string(),
                id: pallet_id.to_string(),
            });
        }
        Ok(())
    }

    /// 批量删除订单的托盘
    ///
    /// # 参数
    /// - only_empty: true 时仅删除无装载明细的空托盘
    ///
    /// # 返回
    /// - usize: 删除的托盘数
    pub fn delete_by_order(&self, order_id: &str, only_empty: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let rows = if only_empty {
            conn.execute(
                r#"DELETE FROM pallet
                   WHERE order_id = ?
                     AND NOT EXISTS (
                         SELECT 1 FROM pallet_assignment a
                         WHERE a.pallet_id = pallet.pallet_id
                     )"#,
                params![order_id],
            )?
        } else {
            conn.execute("DELETE FROM pallet WHERE order_id = ?", params![order_id])?
        };

        Ok(rows)
    }

    /// 判断订单是否存在至少一个带装载明细的托盘（封托类守卫使用）
    pub fn has_packed_pallet(&self, order_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*)
               FROM pallet p
               JOIN pallet_assignment a ON a.pallet_id = p.pallet_id
               WHERE p.order_id = ?"#,
            params![order_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    // ==========================================
    // 装载明细
    // ==========================================

    /// 查询托盘的装载明细
    pub fn assignments_for_pallet(
        &self,
        pallet_id: &str,
    ) -> RepositoryResult<Vec<PalletPieceAssignment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT pallet_id, piece_type_id, quantity
               FROM pallet_assignment
               WHERE pallet_id = ?
               ORDER BY piece_type_id ASC"#,
        )?;

        let rows = stmt
            .query_map(params![pallet_id], Self::map_assignment)?
            .collect::<Result<Vec<PalletPieceAssignment>, _>>()?;

        Ok(rows)
    }

    /// 查询订单的所有装载明细（跨托盘）
    pub fn assignments_for_order(
        &self,
        order_id: &str,
    ) -> RepositoryResult<Vec<PalletPieceAssignment>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT a.pallet_id, a.piece_type_id, a.quantity
               FROM pallet_assignment a
               JOIN pallet p ON p.pallet_id = a.pallet_id
               WHERE p.order_id = ?
               ORDER BY a.pallet_id ASC, a.piece_type_id ASC"#,
        )?;

        let rows = stmt
            .query_map(params![order_id], Self::map_assignment)?
            .collect::<Result<Vec<PalletPieceAssignment>, _>>()?;

        Ok(rows)
    }

    /// 查询单条装载明细
    pub fn find_assignment(
        &self,
        pallet_id: &str,
        piece_type_id: &str,
    ) -> RepositoryResult<Option<PalletPieceAssignment>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT pallet_id, piece_type_id, quantity
               FROM pallet_assignment
               WHERE pallet_id = ? AND piece_type_id = ?"#,
            params![pallet_id, piece_type_id],
            Self::map_assignment,
        ) {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 某板件规格跨所有托盘的已装数量合计
    ///
    /// # 参数
    /// - excluding_pallet_id: 排除在外的托盘（编辑该托盘自身装载量时使用）
    pub fn assigned_total(
        &self,
        piece_type_id: &str,
        excluding_pallet_id: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let total: Option<i64> = match excluding_pallet_id {
            Some(excluded) => conn.query_row(
                r#"SELECT SUM(quantity) FROM pallet_assignment
                   WHERE piece_type_id = ? AND pallet_id <> ?"#,
                params![piece_type_id, excluded],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT SUM(quantity) FROM pallet_assignment WHERE piece_type_id = ?",
                params![piece_type_id],
                |row| row.get(0),
            )?,
        };

        Ok(total.unwrap_or(0))
    }

    /// 写入装载明细: 已存在则累加数量
    pub fn add_assignment(
        &self,
        pallet_id: &str,
        piece_type_id: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO pallet_assignment (pallet_id, piece_type_id, quantity, updated_at)
               VALUES (?, ?, ?, datetime('now'))
               ON CONFLICT(pallet_id, piece_type_id)
               DO UPDATE SET quantity = quantity + excluded.quantity,
                             updated_at = datetime('now')"#,
            params![pallet_id, piece_type_id, quantity],
        )?;

        Ok(())
    }

    /// 覆写装载明细数量
    pub fn set_assignment_quantity(
        &self,
        pallet_id: &str,
        piece_type_id: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO pallet_assignment (pallet_id, piece_type_id, quantity, updated_at)
               VALUES (?, ?, ?, datetime('now'))
               ON CONFLICT(pallet_id, piece_type_id)
               DO UPDATE SET quantity = excluded.quantity,
                             updated_at = datetime('now')"#,
            params![pallet_id, piece_type_id, quantity],
        )?;

        Ok(())
    }

    /// 删除装载明细（整行移除,数量回归可装池）
    pub fn delete_assignment(&self, pallet_id: &str, piece_type_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "DELETE FROM pallet_assignment WHERE pallet_id = ? AND piece_type_id = ?",
            params![pallet_id, piece_type_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PalletPieceAssignment".to_string(),
                id: format!("{}/{}", pallet_id, piece_type_id),
            });
        }
        Ok(())
    }

    /// 双边转移（单事务）: 源托盘减少/移除,目标托盘增加
    ///
    /// 调用方负责事前校验;本方法只保证两侧变更的原子性。
    pub fn transfer_assignment(
        &self,
        from_pallet_id: &str,
        to_pallet_id: &str,
        piece_type_id: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let current: i64 = tx
            .query_row(
                "SELECT quantity FROM pallet_assignment WHERE pallet_id = ? AND piece_type_id = ?",
                params![from_pallet_id, piece_type_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "PalletPieceAssignment".to_string(),
                    id: format!("{}/{}", from_pallet_id, piece_type_id),
                },
                other => other.into(),
            })?;

        if current < quantity {
            return Err(RepositoryError::ValidationError(format!(
                "源托盘装载量不足: 现有{}件, 请求转移{}件",
                current, quantity
            )));
        }

        if current == quantity {
            tx.execute(
                "DELETE FROM pallet_assignment WHERE pallet_id = ? AND piece_type_id = ?",
                params![from_pallet_id, piece_type_id],
            )?;
        } else {
            tx.execute(
                r#"UPDATE pallet_assignment
                   SET quantity = quantity - ?, updated_at = datetime('now')
                   WHERE pallet_id = ? AND piece_type_id = ?"#,
                params![quantity, from_pallet_id, piece_type_id],
            )?;
        }

        tx.execute(
            r#"INSERT INTO pallet_assignment (pallet_id, piece_type_id, quantity, updated_at)
               VALUES (?, ?, ?, datetime('now'))
               ON CONFLICT(pallet_id, piece_type_id)
               DO UPDATE SET quantity = quantity + excluded.quantity,
                             updated_at = datetime('now')"#,
            params![to_pallet_id, piece_type_id, quantity],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 批量落库
    // ==========================================

    /// 批量落库（全有或全无）
    ///
    /// 在单事务内为每个托盘分配订单内递增编号并写入托盘与装载明细。
    /// 事前的可装数量复核由提交协调器负责;本方法只保证原子性。
    ///
    /// # 返回
    /// - Vec<String>: 创建的托盘ID列表
    pub fn apply_batch(
        &self,
        order_id: &str,
        prepared: &[(Pallet, Vec<PalletPieceAssignment>)],
    ) -> RepositoryResult<Vec<String>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let max_no: Option<i32> = tx.query_row(
            "SELECT MAX(pallet_no) FROM pallet WHERE order_id = ?",
            params![order_id],
            |row| row.get(0),
        )?;
        let mut next_no = max_no.unwrap_or(0) + 1;

        let mut created = Vec::with_capacity(prepared.len());
        for (pallet, assignments) in prepared {
            let mut pallet = pallet.clone();
            pallet.pallet_no = next_no;
            next_no += 1;

            Self::insert_pallet(&tx, &pallet)?;

            for assignment in assignments {
                tx.execute(
                    r#"INSERT INTO pallet_assignment
                           (pallet_id, piece_type_id, quantity, updated_at)
                       VALUES (?, ?, ?, datetime('now'))"#,
                    params![&pallet.pallet_id, &assignment.piece_type_id, assignment.quantity],
                )?;
            }

            created.push(pallet.pallet_id.clone());
        }

        tx.commit()?;
        Ok(created)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    const SELECT_PALLET: &'static str = r#"SELECT pallet_id, pallet_no, order_id, position_id,
                      destination, status, max_weight_kg, max_height_mm,
                      closed_weight_kg, closed_height_mm, closed_at, created_at
               FROM pallet"#;

    fn insert_pallet(conn: &Connection, pallet: &Pallet) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO pallet (
                pallet_id, pallet_no, order_id, position_id, destination, status,
                max_weight_kg, max_height_mm, closed_weight_kg, closed_height_mm,
                closed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &pallet.pallet_id,
                &pallet.pallet_no,
                &pallet.order_id,
                &pallet.position_id,
                pallet.destination.to_db_str(),
                pallet.status.to_db_str(),
                &pallet.max_weight_kg,
                &pallet.max_height_mm,
                &pallet.closed_weight_kg,
                &pallet.closed_height_mm,
                pallet.closed_at.as_ref().map(format_datetime),
                format_datetime(&pallet.created_at),
            ],
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Pallet> {
        let destination_raw: String = row.get(4)?;
        let status_raw: String = row.get(5)?;
        let closed_raw: Option<String> = row.get(10)?;
        let created_raw: String = row.get(11)?;

        Ok(Pallet {
            pallet_id: row.get(0)?,
            pallet_no: row.get(1)?,
            order_id: row.get(2)?,
            position_id: row.get(3)?,
            destination: parse_destination(4, &destination_raw)?,
            status: parse_pallet_status(5, &status_raw)?,
            max_weight_kg: row.get(6)?,
            max_height_mm: row.get(7)?,
            closed_weight_kg: row.get(8)?,
            closed_height_mm: row.get(9)?,
            closed_at: closed_raw.as_deref().map(|s| parse_datetime(10, s)).transpose()?,
            created_at: parse_datetime(11, &created_raw)?,
        })
    }

    fn map_assignment(row: &Row<'_>) -> rusqlite::Result<PalletPieceAssignment> {
        Ok(PalletPieceAssignment {
            pallet_id: row.get(0)?,
            piece_type_id: row.get(1)?,
            quantity: row.get(2)?,
        })
    }
}
