// ==========================================
// 板件切割生产跟踪系统 - 排料位/板件规格仓储
// ==========================================
// 职责: order_position / piece_type 表数据访问
// ==========================================

use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use crate::domain::order::{PieceType, Position};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime};

// ==========================================
// PositionRepository - 排料位仓储
// ==========================================
pub struct PositionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PositionRepository {
    /// 创建新的 PositionRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建排料位
    pub fn create(&self, position: &Position) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO order_position (
                position_id, order_id, material_name, color,
                plate_count, layout_ref, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &position.position_id,
                &position.order_id,
                &position.material_name,
                &position.color,
                &position.plate_count,
                &position.layout_ref,
                format_datetime(&position.created_at),
            ],
        )?;

        Ok(position.position_id.clone())
    }

    /// 按 position_id 查询排料位
    pub fn find_by_id(&self, position_id: &str) -> RepositoryResult<Option<Position>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT position_id, order_id, material_name, color,
                      plate_count, layout_ref, created_at
               FROM order_position
               WHERE position_id = ?"#,
            params![position_id],
            Self::map_row,
        ) {
            Ok(pos) => Ok(Some(pos)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询订单的所有排料位
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Position>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT position_id, order_id, material_name, color,
                      plate_count, layout_ref, created_at
               FROM order_position
               WHERE order_id = ?
               ORDER BY created_at ASC"#,
        )?;

        let positions = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<Result<Vec<Position>, _>>()?;

        Ok(positions)
    }

    /// 统计订单的排料位数量
    pub fn count_by_order(&self, order_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM order_position WHERE order_id = ?",
            params![order_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 删除排料位（级联删除其板件规格）
    pub fn delete(&self, position_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "DELETE FROM order_position WHERE position_id = ?",
            params![position_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Position".to_string(),
                id: position_id.to_string(),
            });
        }
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Position> {
        let created_raw: String = row.get(6)?;
        Ok(Position {
            position_id: row.get(0)?,
            order_id: row.get(1)?,
            material_name: row.get(2)?,
            color: row.get(3)?,
            plate_count: row.get(4)?,
            layout_ref: row.get(5)?,
            created_at: parse_datetime(6, &created_raw)?,
        })
    }
}

// ==========================================
// PieceTypeRepository - 板件规格仓储
// ==========================================
pub struct PieceTypeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PieceTypeRepository {
    /// 创建新的 PieceTypeRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建板件规格
    pub fn create(&self, piece: &PieceType) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO piece_type (
                piece_type_id, position_id, length_mm, width_mm, thickness_mm,
                planned_qty, produced_ok_qty, damaged_qty, color, edging_required
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &piece.piece_type_id,
                &piece.position_id,
                &piece.length_mm,
                &piece.width_mm,
                &piece.thickness_mm,
                &piece.planned_qty,
                &piece.produced_ok_qty,
                &piece.damaged_qty,
                &piece.color,
                piece.edging_required as i32,
            ],
        )?;

        Ok(piece.piece_type_id.clone())
    }

    /// 按 piece_type_id 查询板件规格
    pub fn find_by_id(&self, piece_type_id: &str) -> RepositoryResult<Option<PieceType>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT piece_type_id, position_id, length_mm, width_mm, thickness_mm,
                      planned_qty, produced_ok_qty, damaged_qty, color, edging_required
               FROM piece_type
               WHERE piece_type_id = ?"#,
            params![piece_type_id],
            Self::map_row,
        ) {
            Ok(piece) => Ok(Some(piece)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询排料位的所有板件规格
    pub fn find_by_position(&self, position_id: &str) -> RepositoryResult<Vec<PieceType>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT piece_type_id, position_id, length_mm, width_mm, thickness_mm,
                      planned_qty, produced_ok_qty, damaged_qty, color, edging_required
               FROM piece_type
               WHERE position_id = ?
               ORDER BY piece_type_id ASC"#,
        )?;

        let pieces = stmt
            .query_map(params![position_id], Self::map_row)?
            .collect::<Result<Vec<PieceType>, _>>()?;

        Ok(pieces)
    }

    /// 查询订单的所有板件规格（跨排料位）
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<PieceType>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT p.piece_type_id, p.position_id, p.length_mm, p.width_mm, p.thickness_mm,
                      p.planned_qty, p.produced_ok_qty, p.damaged_qty, p.color, p.edging_required
               FROM piece_type p
               JOIN order_position pos ON pos.position_id = p.position_id
               WHERE pos.order_id = ?
               ORDER BY p.piece_type_id ASC"#,
        )?;

        let pieces = stmt
            .query_map(params![order_id], Self::map_row)?
            .collect::<Result<Vec<PieceType>, _>>()?;

        Ok(pieces)
    }

    /// 更新报损数量
    pub fn update_damaged_qty(&self, piece_type_id: &str, damaged_qty: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE piece_type SET damaged_qty = ? WHERE piece_type_id = ?",
            params![damaged_qty, piece_type_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PieceType".to_string(),
                id: piece_type_id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新合格产出数量
    pub fn update_produced_ok_qty(
        &self,
        piece_type_id: &str,
        produced_ok_qty: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE piece_type SET produced_ok_qty = ? WHERE piece_type_id = ?",
            params![produced_ok_qty, piece_type_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PieceType".to_string(),
                id: piece_type_id.to_string(),
            });
        }
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<PieceType> {
        let edging: i32 = row.get(9)?;
        Ok(PieceType {
            piece_type_id: row.get(0)?,
            position_id: row.get(1)?,
            length_mm: row.get(2)?,
            width_mm: row.get(3)?,
            thickness_mm: row.get(4)?,
            planned_qty: row.get(5)?,
            produced_ok_qty: row.get(6)?,
            damaged_qty: row.get(7)?,
            color: row.get(8)?,
            edging_required: edging != 0,
        })
    }
}
