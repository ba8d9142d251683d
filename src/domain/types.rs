// ==========================================
// 服装生产排产系统 - 领域类型定义
// ==========================================
// 红线: 状态机显式化, 不允许裸字符串状态
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 状态机: UNSCHEDULED -> SCHEDULED -> IN_PROGRESS -> COMPLETED
//         任意非终态 -> CANCELLED / ON_HOLD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unscheduled, // 未排产
    Scheduled,   // 已排产
    InProgress,  // 生产中
    Completed,   // 已完成
    Cancelled,   // 已取消
    OnHold,      // 暂停
}

impl OrderStatus {
    /// 判断状态转换是否合法
    ///
    /// # 规则
    /// - UNSCHEDULED -> SCHEDULED: 仅由排产引擎提交时触发
    /// - SCHEDULED -> UNSCHEDULED: 仅由显式的重排/释放动作触发
    /// - SCHEDULED -> IN_PROGRESS -> COMPLETED: 生产进度事件推进
    /// - CANCELLED / ON_HOLD: 任意非终态可进入; ON_HOLD 可恢复
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Unscheduled, Scheduled) => true,
            (Scheduled, Unscheduled) => true,
            (Scheduled, InProgress) => true,
            (InProgress, Completed) => true,
            (Unscheduled | Scheduled | InProgress, Cancelled) => true,
            (Unscheduled | Scheduled | InProgress, OnHold) => true,
            (OnHold, Unscheduled | Scheduled | InProgress) => true,
            _ => false,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Unscheduled => write!(f, "UNSCHEDULED"),
            OrderStatus::Scheduled => write!(f, "SCHEDULED"),
            OrderStatus::InProgress => write!(f, "IN_PROGRESS"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::OnHold => write!(f, "ON_HOLD"),
        }
    }
}

impl OrderStatus {
    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "UNSCHEDULED" => Some(OrderStatus::Unscheduled),
            "SCHEDULED" => Some(OrderStatus::Scheduled),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "ON_HOLD" => Some(OrderStatus::OnHold),
            _ => None,
        }
    }
}

// ==========================================
// 假日类型 (Holiday Type)
// ==========================================
// FULL: 整日不生产; HALF_AM / HALF_PM: 半日产能
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HolidayType {
    Full,   // 全天假
    HalfAm, // 上午假
    HalfPm, // 下午假
}

impl fmt::Display for HolidayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolidayType::Full => write!(f, "FULL"),
            HolidayType::HalfAm => write!(f, "HALF_AM"),
            HolidayType::HalfPm => write!(f, "HALF_PM"),
        }
    }
}

impl HolidayType {
    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<HolidayType> {
        match s {
            "FULL" => Some(HolidayType::Full),
            "HALF_AM" => Some(HolidayType::HalfAm),
            "HALF_PM" => Some(HolidayType::HalfPm),
            _ => None,
        }
    }
}

// ==========================================
// 日历日类型 (Day Kind)
// ==========================================
// 由工作日历针对某一日期解析得出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayKind {
    Workday, // 正常工作日
    HalfDay, // 半日 (产能减半)
    Off,     // 不生产 (全天假)
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayKind::Workday => write!(f, "WORKDAY"),
            DayKind::HalfDay => write!(f, "HALF_DAY"),
            DayKind::Off => write!(f, "OFF"),
        }
    }
}

// ==========================================
// 排产动作类型 (Schedule Action Type)
// ==========================================
// 用途: action_log 审计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleActionType {
    Commit,       // 排产提交
    Release,      // 计划释放
    Reschedule,   // 重排
    StatusChange, // 生产状态推进
}

impl fmt::Display for ScheduleActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleActionType::Commit => write!(f, "COMMIT"),
            ScheduleActionType::Release => write!(f, "RELEASE"),
            ScheduleActionType::Reschedule => write!(f, "RESCHEDULE"),
            ScheduleActionType::StatusChange => write!(f, "STATUS_CHANGE"),
        }
    }
}
