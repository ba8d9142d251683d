// ==========================================
// 服装生产排产系统 - 学习曲线数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑; 曲线结构校验由领域构造器负责
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::curve::{CurvePoint, LearningCurve};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 学习曲线仓储
/// 职责: 管理 learning_curve / curve_point 表的数据访问
pub struct LearningCurveRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LearningCurveRepository {
    /// 创建新的曲线仓储实例
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

    /// 写入或覆盖曲线 (主记录与拐点同一事务)
    pub fn upsert(&self, curve: &LearningCurve) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO learning_curve (curve_id, curve_name, smv_minutes, working_minutes_per_day, operators)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(curve_id) DO UPDATE SET
                curve_name = excluded.curve_name,
                smv_minutes = excluded.smv_minutes,
                working_minutes_per_day = excluded.working_minutes_per_day,
                operators = excluded.operators
            "#,
            params![
                curve.curve_id,
                curve.curve_name,
                curve.smv_minutes,
                curve.working_minutes_per_day,
                curve.operators,
            ],
        )?;

        tx.execute(
            "DELETE FROM curve_point WHERE curve_id = ?1",
            params![curve.curve_id],
        )?;
        for point in &curve.points {
            tx.execute(
                "INSERT INTO curve_point (curve_id, day_no, efficiency_pct) VALUES (?1, ?2, ?3)",
                params![curve.curve_id, point.day, point.efficiency_pct],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 按曲线ID查询 (拐点按 day 升序)
    pub fn find_by_id(&self, curve_id: &str) -> RepositoryResult<Option<LearningCurve>> {
        let conn = self.get_conn()?;

        let head = conn
            .query_row(
                r#"
                SELECT curve_id, curve_name, smv_minutes, working_minutes_per_day, operators
                FROM learning_curve
                WHERE curve_id = ?1
                "#,
                params![curve_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, u32>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((curve_id, curve_name, smv_minutes, working_minutes_per_day, operators)) = head
        else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT day_no, efficiency_pct FROM curve_point WHERE curve_id = ?1 ORDER BY day_no",
        )?;
        let points = stmt
            .query_map(params![curve_id], |row| {
                Ok(CurvePoint {
                    day: row.get(0)?,
                    efficiency_pct: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(LearningCurve {
            curve_id,
            curve_name,
            points,
            smv_minutes,
            working_minutes_per_day,
            operators,
        }))
    }

    /// 列出全部曲线ID
    pub fn list_ids(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT curve_id FROM learning_curve ORDER BY curve_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
