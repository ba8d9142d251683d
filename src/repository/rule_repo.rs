// ==========================================
// 服装生产排产系统 - 产能规则数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑; 规则优先级解析由引擎负责
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::capacity::LineCapacityRule;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 产能规则仓储
/// 职责: 管理 line_capacity_rule 表的数据访问
pub struct CapacityRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CapacityRuleRepository {
    /// 创建新的规则仓储实例
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

    /// 写入规则
    pub fn insert(&self, rule: &LineCapacityRule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO line_capacity_rule (
                rule_id, line_id, order_id, buyer_id, style_id,
                sam_minutes, operators, working_hours, efficiency_pct,
                effective_from, effective_to
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                rule.rule_id,
                rule.line_id,
                rule.order_id,
                rule.buyer_id,
                rule.style_id,
                rule.sam_minutes,
                rule.operators,
                rule.working_hours,
                rule.efficiency_pct,
                rule.effective_from.format("%Y-%m-%d").to_string(),
                rule.effective_to.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(())
    }

    /// 列出全部规则 (引擎构建索引用)
    pub fn list_all(&self) -> RepositoryResult<Vec<LineCapacityRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT rule_id, line_id, order_id, buyer_id, style_id,
                   sam_minutes, operators, working_hours, efficiency_pct,
                   effective_from, effective_to
            FROM line_capacity_rule
            ORDER BY rule_id
            "#,
        )?;
        let rules = stmt
            .query_map([], row_to_rule)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// 按产线列出规则
    pub fn list_for_line(&self, line_id: &str) -> RepositoryResult<Vec<LineCapacityRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT rule_id, line_id, order_id, buyer_id, style_id,
                   sam_minutes, operators, working_hours, efficiency_pct,
                   effective_from, effective_to
            FROM line_capacity_rule
            WHERE line_id = ?1
            ORDER BY effective_from, rule_id
            "#,
        )?;
        let rules = stmt
            .query_map(params![line_id], row_to_rule)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }
}

fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<LineCapacityRule> {
    let effective_from: String = row.get(9)?;
    let effective_to: Option<String> = row.get(10)?;

    Ok(LineCapacityRule {
        rule_id: row.get(0)?,
        line_id: row.get(1)?,
        order_id: row.get(2)?,
        buyer_id: row.get(3)?,
        style_id: row.get(4)?,
        sam_minutes: row.get(5)?,
        operators: row.get(6)?,
        working_hours: row.get(7)?,
        efficiency_pct: row.get(8)?,
        effective_from: NaiveDate::parse_from_str(&effective_from, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        effective_to: effective_to
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}
