// ==========================================
// 板件切割生产跟踪系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表语句，库/种子程序/测试共用同一份 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 库/种子程序/集成测试共用，保证三者看到完全一致的表结构。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS production_order (
            order_id TEXT PRIMARY KEY,
            order_no TEXT NOT NULL UNIQUE,
            stage TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 5,
            customer_name TEXT NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL,
            planned_at TEXT,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS order_position (
            position_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
            material_name TEXT NOT NULL,
            color TEXT NOT NULL,
            plate_count INTEGER NOT NULL DEFAULT 0,
            layout_ref TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_order_position_order
            ON order_position(order_id);

        CREATE TABLE IF NOT EXISTS piece_type (
            piece_type_id TEXT PRIMARY KEY,
            position_id TEXT NOT NULL REFERENCES order_position(position_id) ON DELETE CASCADE,
            length_mm REAL NOT NULL,
            width_mm REAL NOT NULL,
            thickness_mm REAL NOT NULL,
            planned_qty INTEGER NOT NULL,
            produced_ok_qty INTEGER NOT NULL DEFAULT 0,
            damaged_qty INTEGER NOT NULL DEFAULT 0,
            color TEXT NOT NULL,
            edging_required INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_piece_type_position
            ON piece_type(position_id);

        CREATE TABLE IF NOT EXISTS pallet (
            pallet_id TEXT PRIMARY KEY,
            pallet_no INTEGER NOT NULL,
            order_id TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
            position_id TEXT REFERENCES order_position(position_id),
            destination TEXT NOT NULL,
            status TEXT NOT NULL,
            max_weight_kg REAL NOT NULL,
            max_height_mm REAL NOT NULL,
            closed_weight_kg REAL,
            closed_height_mm REAL,
            closed_at TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(order_id, pallet_no)
        );
        CREATE INDEX IF NOT EXISTS idx_pallet_order
            ON pallet(order_id);

        CREATE TABLE IF NOT EXISTS pallet_assignment (
            pallet_id TEXT NOT NULL REFERENCES pallet(pallet_id) ON DELETE CASCADE,
            piece_type_id TEXT NOT NULL REFERENCES piece_type(piece_type_id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (pallet_id, piece_type_id)
        );
        CREATE INDEX IF NOT EXISTS idx_pallet_assignment_piece
            ON pallet_assignment(piece_type_id);

        CREATE TABLE IF NOT EXISTS stage_history (
            history_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
            from_stage TEXT NOT NULL,
            to_stage TEXT NOT NULL,
            changed_at TEXT NOT NULL,
            operator TEXT,
            location TEXT,
            comment TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_stage_history_order
            ON stage_history(order_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
