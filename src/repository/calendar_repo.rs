// ==========================================
// 服装生产排产系统 - 工作日历数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::calendar::CalendarHoliday;
use crate::domain::types::HolidayType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 工作日历仓储
/// 职责: 管理 calendar_holiday 表的数据访问
pub struct CalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CalendarRepository {
    /// 创建新的日历仓储实例
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

    /// 写入假日
    pub fn insert(&self, holiday: &CalendarHoliday) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO calendar_holiday (holiday_date, holiday_type, holiday_name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(holiday_date) DO UPDATE SET
                holiday_type = excluded.holiday_type,
                holiday_name = excluded.holiday_name
            "#,
            params![
                holiday.holiday_date.format("%Y-%m-%d").to_string(),
                holiday.holiday_type.to_string(),
                holiday.holiday_name,
            ],
        )?;
        Ok(())
    }

    /// 按日期窗口列出假日
    pub fn list_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<CalendarHoliday>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT holiday_date, holiday_type, holiday_name
            FROM calendar_holiday
            WHERE holiday_date >= ?1 AND holiday_date <= ?2
            ORDER BY holiday_date
            "#,
        )?;
        let holidays = stmt
            .query_map(
                params![
                    from.format("%Y-%m-%d").to_string(),
                    to.format("%Y-%m-%d").to_string(),
                ],
                row_to_holiday,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(holidays)
    }
}

fn row_to_holiday(row: &Row<'_>) -> rusqlite::Result<CalendarHoliday> {
    let holiday_date: String = row.get(0)?;
    let holiday_type: String = row.get(1)?;

    Ok(CalendarHoliday {
        holiday_date: NaiveDate::parse_from_str(&holiday_date, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
        holiday_type: HolidayType::parse(&holiday_type).unwrap_or(HolidayType::Full),
        holiday_name: row.get(2)?,
    })
}
