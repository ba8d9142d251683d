// ==========================================
// 服装生产排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::orchestrator::EngineSettings;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 配置键 =====
pub const KEY_HORIZON_DAYS: &str = "schedule/horizon_days";
pub const KEY_AT_RISK_BUFFER_DAYS: &str = "schedule/at_risk_buffer_days";
pub const KEY_COMMIT_RETRIES: &str = "schedule/commit_retries";

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
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
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

    /// 写入配置值（scope_id='global', 幂等覆写）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取排产视野护栏天数
    ///
    /// # 默认值
    /// - 730 (两年)
    pub fn get_horizon_days(&self) -> Result<u32, Box<dyn Error>> {
        match self.get_config_value(KEY_HORIZON_DAYS)? {
            Some(v) => Ok(v.trim().parse::<u32>()?),
            None => Ok(730),
        }
    }

    /// 获取船期风险缓冲天数
    ///
    /// # 默认值
    /// - 3
    pub fn get_at_risk_buffer_days(&self) -> Result<i64, Box<dyn Error>> {
        match self.get_config_value(KEY_AT_RISK_BUFFER_DAYS)? {
            Some(v) => Ok(v.trim().parse::<i64>()?),
            None => Ok(3),
        }
    }

    /// 获取并发提交重试次数
    ///
    /// # 默认值
    /// - 2
    pub fn get_commit_retries(&self) -> Result<u32, Box<dyn Error>> {
        match self.get_config_value(KEY_COMMIT_RETRIES)? {
            Some(v) => Ok(v.trim().parse::<u32>()?),
            None => Ok(2),
        }
    }

    /// 汇总加载引擎参数
    pub fn load_engine_settings(&self) -> Result<EngineSettings, Box<dyn Error>> {
        Ok(EngineSettings {
            horizon_days: self.get_horizon_days()?,
            at_risk_buffer_days: self.get_at_risk_buffer_days()?,
            commit_retries: self.get_commit_retries()?,
        })
    }
}
