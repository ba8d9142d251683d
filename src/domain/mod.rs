// ==========================================
// 服装生产排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod calendar;
pub mod capacity;
pub mod curve;
pub mod line;
pub mod order;
pub mod types;

// 重导出核心类型
pub use calendar::{CalendarHoliday, WorkCalendar};
pub use capacity::{CommittedAllocation, CommittedLedger, LineCapacityRule};
pub use curve::{CurvePoint, LearningCurve};
pub use line::{Line, LineGroup};
pub use order::{Order, SizeQuantity};
pub use types::{DayKind, HolidayType, OrderStatus, ScheduleActionType};
