// ==========================================
// 板件切割生产跟踪系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::db::open_sqlite_connection;
use crate::domain::types::{GuardSeverity, StackingModel};

/// 板材密度默认值 (kg/m³, 刨花板口径)
pub const DEFAULT_BOARD_DENSITY_KG_M3: f64 = 680.0;

/// 托面默认长度 (mm)
pub const DEFAULT_DECK_LENGTH_MM: f64 = 2400.0;

/// 托面默认宽度 (mm)
pub const DEFAULT_DECK_WIDTH_MM: f64 = 1200.0;

/// 外部策略源默认超时 (毫秒)
pub const DEFAULT_POLICY_SOURCE_TIMEOUT_MS: u64 = 3_000;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))
               ON CONFLICT(scope_id, key)
               DO UPDATE SET value = excluded.value, updated_at = datetime('now')"#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    // ==========================================
    // 类型化配置读取
    // ==========================================

    /// 托盘堆叠模型（默认 LAYERED）
    pub fn stacking_model(&self) -> Result<StackingModel, Box<dyn Error>> {
        let raw = self.get_config_or_default("stacking_model", "LAYERED")?;
        StackingModel::from_str(&raw)
            .ok_or_else(|| format!("无效的堆叠模型配置: {}", raw).into())
    }

    /// 板材密度 (kg/m³)
    pub fn board_density_kg_m3(&self) -> Result<f64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            "board_density_kg_m3",
            &DEFAULT_BOARD_DENSITY_KG_M3.to_string(),
        )?;
        Ok(raw.parse()?)
    }

    /// 托面长度 (mm)
    pub fn deck_length_mm(&self) -> Result<f64, Box<dyn Error>> {
        let raw =
            self.get_config_or_default("deck_length_mm", &DEFAULT_DECK_LENGTH_MM.to_string())?;
        Ok(raw.parse()?)
    }

    /// 托面宽度 (mm)
    pub fn deck_width_mm(&self) -> Result<f64, Box<dyn Error>> {
        let raw = self.get_config_or_default("deck_width_mm", &DEFAULT_DECK_WIDTH_MM.to_string())?;
        Ok(raw.parse()?)
    }

    /// 守卫级别覆写（key: guard_severity/{guard_id}）
    ///
    /// # 返回
    /// - Some(GuardSeverity): 现场覆写值
    /// - None: 无覆写,使用守卫默认级别
    pub fn guard_severity(&self, guard_id: &str) -> Result<Option<GuardSeverity>, Box<dyn Error>> {
        let key = format!("guard_severity/{}", guard_id);
        let raw = match self.get_config_value(&key)? {
            Some(v) => v,
            None => return Ok(None),
        };

        GuardSeverity::from_str(&raw)
            .map(Some)
            .ok_or_else(|| format!("无效的守卫级别配置 ({}): {}", guard_id, raw).into())
    }

    /// 容量超限是否硬阻断（默认 false: 超重/超高为软警告）
    pub fn capacity_hard_cap(&self) -> Result<bool, Box<dyn Error>> {
        let raw = self.get_config_or_default("capacity_hard_cap", "false")?;
        Ok(raw.trim().eq_ignore_ascii_case("true") || raw.trim() == "1")
    }

    /// 外部策略源超时 (毫秒)
    pub fn policy_source_timeout_ms(&self) -> Result<u64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            "policy_source_timeout_ms",
            &DEFAULT_POLICY_SOURCE_TIMEOUT_MS.to_string(),
        )?;
        Ok(raw.parse()?)
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 排障与审计时记录现场配置
    pub fn config_snapshot_json(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let mut kv = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (k, v) = row?;
            kv.insert(k, v);
        }

        Ok(json!(kv).to_string())
    }
}
