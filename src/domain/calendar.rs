// ==========================================
// 服装生产排产系统 - 工作日历领域模型
// ==========================================
// 用途: 假日解析; 全天假跳过, 半日假产能减半
// ==========================================

use crate::domain::types::{DayKind, HolidayType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// CalendarHoliday - 日历假日
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarHoliday {
    pub holiday_date: NaiveDate,       // 假日日期
    pub holiday_type: HolidayType,     // 假日类型
    pub holiday_name: Option<String>,  // 假日名称
}

// ==========================================
// WorkCalendar - 工作日历
// ==========================================
// 说明: 未登记假日的日期一律视为正常工作日;
//       周休制度由日历数据本身表达 (周日录入为 FULL 假日)。
#[derive(Debug, Clone, Default)]
pub struct WorkCalendar {
    holidays: HashMap<NaiveDate, HolidayType>,
}

impl WorkCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由假日记录构建日历
    pub fn from_holidays(holidays: &[CalendarHoliday]) -> Self {
        let mut map = HashMap::new();
        for h in holidays {
            map.insert(h.holiday_date, h.holiday_type);
        }
        Self { holidays: map }
    }

    /// 解析某日期的日类型
    pub fn day_kind(&self, date: NaiveDate) -> DayKind {
        match self.holidays.get(&date) {
            Some(HolidayType::Full) => DayKind::Off,
            Some(HolidayType::HalfAm) | Some(HolidayType::HalfPm) => DayKind::HalfDay,
            None => DayKind::Workday,
        }
    }

    /// 是否为可生产日 (非全天假)
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.day_kind(date) != DayKind::Off
    }

    /// 登记的假日数量
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}
