// ==========================================
// 服装生产排产系统 - 产线与线组数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: production_line.group_id 单列外键, 天然保证一线至多一组
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::line::{Line, LineGroup};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 产线仓储
/// 职责: 管理 production_line / line_group 表的数据访问
pub struct LineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LineRepository {
    /// 创建新的产线仓储实例
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

    /// 写入线组
    pub fn insert_group(&self, group_id: &str, group_name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO line_group (group_id, group_name) VALUES (?1, ?2)",
            params![group_id, group_name],
        )?;
        Ok(())
    }

    /// 写入产线
    pub fn insert_line(&self, line: &Line) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_line (line_id, line_code, line_name, group_id, default_capacity)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                line.line_id,
                line.line_code,
                line.line_name,
                line.group_id,
                line.default_capacity,
            ],
        )?;
        Ok(())
    }

    /// 按产线ID查询
    pub fn find_line(&self, line_id: &str) -> RepositoryResult<Option<Line>> {
        let conn = self.get_conn()?;
        let line = conn
            .query_row(
                r#"
                SELECT line_id, line_code, line_name, group_id, default_capacity
                FROM production_line
                WHERE line_id = ?1
                "#,
                params![line_id],
                row_to_line,
            )
            .optional()?;
        Ok(line)
    }

    /// 列出全部产线 (按产线代码升序, 保证排产确定性)
    pub fn list_lines(&self) -> RepositoryResult<Vec<Line>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT line_id, line_code, line_name, group_id, default_capacity
            FROM production_line
            ORDER BY line_code
            "#,
        )?;
        let lines = stmt
            .query_map([], row_to_line)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// 列出全部线组 (含成员产线)
    pub fn list_groups(&self) -> RepositoryResult<Vec<LineGroup>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare("SELECT group_id, group_name FROM line_group ORDER BY group_id")?;
        let mut groups = stmt
            .query_map([], |row| {
                Ok(LineGroup {
                    group_id: row.get(0)?,
                    group_name: row.get(1)?,
                    line_ids: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut member_stmt = conn.prepare(
            "SELECT line_id FROM production_line WHERE group_id = ?1 ORDER BY line_code",
        )?;
        for group in &mut groups {
            let members = member_stmt
                .query_map(params![group.group_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            group.line_ids = members;
        }

        Ok(groups)
    }
}

fn row_to_line(row: &Row<'_>) -> rusqlite::Result<Line> {
    Ok(Line {
        line_id: row.get(0)?,
        line_code: row.get(1)?,
        line_name: row.get(2)?,
        group_id: row.get(3)?,
        default_capacity: row.get(4)?,
    })
}
