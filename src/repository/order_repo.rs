// ==========================================
// 服装生产排产系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑; 状态机校验由 API 层负责
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::{Order, SizeQuantity};
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================

/// 订单仓储
/// 职责: 管理 orders / order_size_qty 表的数据访问
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的订单仓储实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入订单 (含尺码明细, 同一事务)
    pub fn insert(&self, order: &Order) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO orders (
                order_id, order_ref, buyer_id, style_id, group_id, curve_id,
                quantity, ship_date, status, assigned_line, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                order.order_id,
                order.order_ref,
                order.buyer_id,
                order.style_id,
                order.group_id,
                order.curve_id,
                order.quantity,
                order.ship_date.format("%Y-%m-%d").to_string(),
                order.status.to_string(),
                order.assigned_line,
                order.created_at.to_rfc3339(),
                order.updated_at.to_rfc3339(),
            ],
        )?;

        for size in &order.size_qtys {
            tx.execute(
                "INSERT INTO order_size_qty (order_id, size_code, qty) VALUES (?1, ?2, ?3)",
                params![order.order_id, size.size_code, size.qty],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 按订单ID查询
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;

        let order = conn
            .query_row(
                r#"
                SELECT order_id, order_ref, buyer_id, style_id, group_id, curve_id,
                       quantity, ship_date, status, assigned_line, created_at, updated_at
                FROM orders
                WHERE order_id = ?1
                "#,
                params![order_id],
                row_to_order,
            )
            .optional()?;

        let Some(mut order) = order else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT size_code, qty FROM order_size_qty WHERE order_id = ?1 ORDER BY size_code",
        )?;
        let sizes = stmt
            .query_map(params![order_id], |row| {
                Ok(SizeQuantity {
                    size_code: row.get(0)?,
                    qty: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        order.size_qtys = sizes;

        Ok(Some(order))
    }

    /// 按状态列出订单
    pub fn list_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, order_ref, buyer_id, style_id, group_id, curve_id,
                   quantity, ship_date, status, assigned_line, created_at, updated_at
            FROM orders
            WHERE status = ?1
            ORDER BY order_id
            "#,
        )?;
        let orders = stmt
            .query_map(params![status.to_string()], row_to_order)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// 列出未排产订单
    pub fn list_unscheduled(&self) -> RepositoryResult<Vec<Order>> {
        self.list_by_status(OrderStatus::Unscheduled)
    }

    /// 更新订单状态与分配产线
    ///
    /// 乐观条件: 只在当前状态等于 expected 时更新, 否则返回 InvalidStateTransition。
    pub fn update_status(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        assigned_line: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"
            UPDATE orders
            SET status = ?1, assigned_line = ?2, updated_at = ?3
            WHERE order_id = ?4 AND status = ?5
            "#,
            params![
                next.to_string(),
                assigned_line,
                Utc::now().to_rfc3339(),
                order_id,
                expected.to_string(),
            ],
        )?;

        if changed == 0 {
            let actual: Option<String> = conn
                .query_row(
                    "SELECT status FROM orders WHERE order_id = ?1",
                    params![order_id],
                    |row| row.get(0),
                )
                .optional()?;
            return match actual {
                Some(actual) => Err(RepositoryError::InvalidStateTransition {
                    from: actual,
                    to: next.to_string(),
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "Order".to_string(),
                    id: order_id.to_string(),
                }),
            };
        }
        Ok(())
    }
}

/// 行映射: orders 表 -> Order (尺码明细由调用方补充)
fn row_to_order(row: &Row<'_>) -> rusqlite::Result<Order> {
    let ship_date: String = row.get(7)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Order {
        order_id: row.get(0)?,
        order_ref: row.get(1)?,
        buyer_id: row.get(2)?,
        style_id: row.get(3)?,
        group_id: row.get(4)?,
        curve_id: row.get(5)?,
        quantity: row.get(6)?,
        ship_date: NaiveDate::parse_from_str(&ship_date, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Unscheduled),
        assigned_line: row.get(9)?,
        size_qtys: Vec::new(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
