// ==========================================
// 服装生产排产系统 - 产能承诺数据仓储
// ==========================================
// 职责: committed_allocation 表的读取与事务化提交
// 红线:
// - 提交为单事务读改写: 事务内逐日重校验产能, 整单生效或整单拒绝
// - 并发提交的败者返回 CommitConflict, 由引擎刷新快照重试
// - 承诺写入与订单状态转换/审计日志同一事务, 不存在部分提交
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::capacity::{CommittedAllocation, CommittedLedger};
use crate::domain::types::{OrderStatus, ScheduleActionType};
use crate::engine::builder::DayPlan;
use crate::engine::error::ScheduleError;
use crate::engine::ledger_store::AllocationStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// 产能承诺仓储
pub struct AllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationRepository {
    /// 创建新的承诺仓储实例
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

    /// 加载产线窗口内的承诺快照
    pub fn load_window(
        &self,
        line_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<CommittedLedger> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT line_id, plan_date, planned_qty
            FROM committed_allocation
            WHERE plan_date >= ?1 AND plan_date <= ?2
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    from.format("%Y-%m-%d").to_string(),
                    to.format("%Y-%m-%d").to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut ledger = CommittedLedger::new();
        for (line_id, plan_date, planned_qty) in rows {
            if !line_ids.is_empty() && !line_ids.iter().any(|id| id == &line_id) {
                continue;
            }
            let date = NaiveDate::parse_from_str(&plan_date, "%Y-%m-%d")
                .map_err(|e| RepositoryError::DatabaseQueryError(e.to_string()))?;
            ledger.add(&line_id, date, planned_qty);
        }
        Ok(ledger)
    }

    /// 按订单列出承诺行 (日期升序)
    pub fn list_for_order(&self, order_id: &str) -> RepositoryResult<Vec<CommittedAllocation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT line_id, plan_date, order_id, planned_qty, capacity_qty, production_day
            FROM committed_allocation
            WHERE order_id = ?1
            ORDER BY plan_date
            "#,
        )?;
        let rows = stmt
            .query_map(params![order_id], row_to_allocation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 事务化提交计划
    ///
    /// 同一 IMMEDIATE 事务内:
    /// 1) 逐日 SELECT SUM 重校验 既有承诺 + 本单 <= 产能上限
    /// 2) 写入全部承诺行
    /// 3) 订单 UNSCHEDULED -> SCHEDULED (条件更新, 防止重复排产)
    /// 4) 写审计日志
    ///
    /// # 返回
    /// - Err(CommitConflict): 并发提交败者, 一行未写
    pub fn commit_plan(
        &self,
        order_id: &str,
        line_id: &str,
        days: &[DayPlan],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 事务内重校验: 快照构建后其他提交可能已落库
        for day in days {
            let plan_date = day.plan_date.format("%Y-%m-%d").to_string();
            let committed_qty: i64 = tx.query_row(
                r#"
                SELECT COALESCE(SUM(planned_qty), 0)
                FROM committed_allocation
                WHERE line_id = ?1 AND plan_date = ?2
                "#,
                params![line_id, plan_date],
                |row| row.get(0),
            )?;
            if committed_qty + day.planned_qty > day.capacity_qty {
                return Err(RepositoryError::CommitConflict {
                    line_id: line_id.to_string(),
                    plan_date,
                    committed_qty,
                    attempted_qty: day.planned_qty,
                    capacity_qty: day.capacity_qty,
                });
            }
        }

        for day in days {
            tx.execute(
                r#"
                INSERT INTO committed_allocation (
                    line_id, plan_date, order_id, planned_qty, capacity_qty, production_day
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    line_id,
                    day.plan_date.format("%Y-%m-%d").to_string(),
                    order_id,
                    day.planned_qty,
                    day.capacity_qty,
                    day.production_day,
                ],
            )?;
        }

        // 条件转换: 订单必须仍处于 UNSCHEDULED
        let changed = tx.execute(
            r#"
            UPDATE orders
            SET status = 'SCHEDULED', assigned_line = ?1, updated_at = ?2
            WHERE order_id = ?3 AND status = 'UNSCHEDULED'
            "#,
            params![line_id, Utc::now().to_rfc3339(), order_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: "NOT_UNSCHEDULED".to_string(),
                to: OrderStatus::Scheduled.to_string(),
            });
        }

        let total_qty: i64 = days.iter().map(|d| d.planned_qty).sum();
        insert_action_log(
            &tx,
            order_id,
            ScheduleActionType::Commit,
            &json!({
                "line_id": line_id,
                "days": days.len(),
                "total_qty": total_qty,
            })
            .to_string(),
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            order_id = %order_id,
            line_id = %line_id,
            days = days.len(),
            total_qty,
            "产能承诺已提交"
        );
        Ok(())
    }

    /// 事务化释放订单的全部承诺
    ///
    /// 同一事务内: 删除承诺行 + 订单回退 UNSCHEDULED + 审计日志。
    pub fn release_plan(&self, order_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let removed = tx.execute(
            "DELETE FROM committed_allocation WHERE order_id = ?1",
            params![order_id],
        )?;

        tx.execute(
            r#"
            UPDATE orders
            SET status = 'UNSCHEDULED', assigned_line = NULL, updated_at = ?1
            WHERE order_id = ?2 AND status = 'SCHEDULED'
            "#,
            params![Utc::now().to_rfc3339(), order_id],
        )?;

        insert_action_log(
            &tx,
            order_id,
            ScheduleActionType::Release,
            &json!({ "removed_days": removed }).to_string(),
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(order_id = %order_id, removed_days = removed, "产能承诺已释放");
        Ok(())
    }
}

/// 审计日志写入 (与业务写同一事务)
fn insert_action_log(
    tx: &rusqlite::Transaction<'_>,
    order_id: &str,
    action_type: ScheduleActionType,
    detail_json: &str,
) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO action_log (log_id, order_id, action_type, detail_json)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            Uuid::new_v4().to_string(),
            order_id,
            action_type.to_string(),
            detail_json,
        ],
    )?;
    Ok(())
}

fn row_to_allocation(row: &Row<'_>) -> rusqlite::Result<CommittedAllocation> {
    let plan_date: String = row.get(1)?;
    Ok(CommittedAllocation {
        line_id: row.get(0)?,
        plan_date: NaiveDate::parse_from_str(&plan_date, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        order_id: row.get(2)?,
        planned_qty: row.get(3)?,
        capacity_qty: row.get(4)?,
        production_day: row.get(5)?,
    })
}

// ==========================================
// 引擎存储接口适配 (依赖倒置: trait 定义在引擎层)
// ==========================================
impl AllocationStore for AllocationRepository {
    fn load_ledger(
        &self,
        line_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CommittedLedger, ScheduleError> {
        self.load_window(line_ids, from, to)
            .map_err(|e| ScheduleError::Storage(e.to_string()))
    }

    fn commit_plan(
        &self,
        order_id: &str,
        line_id: &str,
        days: &[DayPlan],
    ) -> Result<(), ScheduleError> {
        match AllocationRepository::commit_plan(self, order_id, line_id, days) {
            Ok(()) => Ok(()),
            Err(e @ RepositoryError::CommitConflict { .. }) => {
                Err(ScheduleError::AllocationConflict(e.to_string()))
            }
            Err(e) => Err(ScheduleError::Storage(e.to_string())),
        }
    }

    fn release_order(&self, order_id: &str) -> Result<(), ScheduleError> {
        self.release_plan(order_id)
            .map_err(|e| ScheduleError::Storage(e.to_string()))
    }
}
