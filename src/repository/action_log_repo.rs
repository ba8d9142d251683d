// ==========================================
// 服装生产排产系统 - 排产动作审计仓储
// ==========================================
// 职责: action_log 表的数据访问
// 用途: 排产提交/释放/状态推进的可追溯记录
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::ScheduleActionType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// ActionLogEntry - 审计日志行
// ==========================================
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub log_id: String,
    pub order_id: String,
    pub action_type: String,
    pub detail_json: Option<String>,
    pub created_at: String,
}

/// 审计日志仓储
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的审计仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入审计日志
    pub fn insert(
        &self,
        order_id: &str,
        action_type: ScheduleActionType,
        detail_json: Option<&str>,
    ) -> RepositoryResult<String> {
        let log_id = Uuid::new_v4().to_string();
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO action_log (log_id, order_id, action_type, detail_json)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![log_id, order_id, action_type.to_string(), detail_json],
        )?;
        Ok(log_id)
    }

    /// 按订单列出审计日志 (时间升序)
    pub fn list_for_order(&self, order_id: &str) -> RepositoryResult<Vec<ActionLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT log_id, order_id, action_type, detail_json, created_at
            FROM action_log
            WHERE order_id = ?1
            ORDER BY created_at, log_id
            "#,
        )?;
        let entries = stmt
            .query_map(params![order_id], |row| {
                Ok(ActionLogEntry {
                    log_id: row.get(0)?,
                    order_id: row.get(1)?,
                    action_type: row.get(2)?,
                    detail_json: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
