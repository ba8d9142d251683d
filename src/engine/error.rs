// ==========================================
// 服装生产排产系统 - 引擎层错误类型
// ==========================================
// 职责: 排产失败的类型化表达
// 红线: 所有失败必须是类型化返回值, 不得以 panic 越层;
//       每个失败必须携带显式原因, 供操作员定位
// 工具: thiserror 派生宏
// ==========================================

use chrono::NaiveDate;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum ScheduleError {
    // ===== 校验错误 (计算前拒绝, 无副作用) =====
    #[error("学习曲线非法: curve_id={curve_id}, {reason}")]
    InvalidCurve { curve_id: String, reason: String },

    #[error("SAM 非法: sam_minutes={sam_minutes}, 必须大于 0")]
    InvalidSam { sam_minutes: f64 },

    #[error("输入校验失败: {0}")]
    Validation(String),

    // ===== 解析错误 (订单保持 UNSCHEDULED, 记录阻断原因) =====
    #[error("产能规则未找到: line_id={line_id}, date={date}, 且产线无默认产能")]
    RuleNotFound { line_id: String, date: NaiveDate },

    #[error("学习曲线未找到: curve_id={0}")]
    CurveNotFound(String),

    // ===== 分配冲突 (无可行产线 / 并发提交失败) =====
    #[error("排产冲突: {0}")]
    AllocationConflict(String),

    // ===== 产能窗口耗尽 (显式上报, 不得静默换规则续排) =====
    #[error("规则窗口耗尽: order_id={order_id}, line_id={line_id}, 截止 {boundary_date} 仅完成 {fulfilled_qty}/{required_qty} 件")]
    PartialFulfillment {
        order_id: String,
        line_id: String,
        fulfilled_qty: i64,
        required_qty: i64,
        boundary_date: NaiveDate,
    },

    // ===== 排产视野超限 (数据质量问题, 必须记录并上报) =====
    #[error("排产视野超限: order_id={order_id}, line_id={line_id}, 自 {start_date} 起 {horizon_days} 天内无法完成")]
    HorizonExceeded {
        order_id: String,
        line_id: String,
        start_date: NaiveDate,
        horizon_days: u32,
    },

    // ===== 承诺存储错误 =====
    #[error("产能承诺存储失败: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
