// ==========================================
// 服装生产排产系统 - 日计划构建引擎
// ==========================================
// 职责: 沿工作日历逐日推进, 叠加学习曲线与产能规则, 累计产出直至满足订单件数
// 输入: 订单 + 产线 + 学习曲线 + 解析后的产能规则 + 日历 + 产能承诺快照
// 输出: 按日计划 (日期, 生产日序号, 当日效率, 当日产能, 承诺件数, 累计件数)
// ==========================================
// 红线:
// - 全天假跳过且不推进生产日序号; 半日假产能减半
// - 规则窗口耗尽必须显式上报 PartialFulfillment, 不得静默换规则续排
// - 视野护栏兜底, 防止坏数据导致无界推进
// ==========================================

use crate::domain::calendar::WorkCalendar;
use crate::domain::capacity::CommittedLedger;
use crate::domain::curve::LearningCurve;
use crate::domain::order::Order;
use crate::domain::types::DayKind;
use crate::engine::availability::ResolvedCapacity;
use crate::engine::capacity_calc::CapacityCalculator;
use crate::engine::curve_eval::LearningCurveEvaluator;
use crate::engine::error::ScheduleError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ==========================================
// DayPlan - 单日计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub plan_date: NaiveDate,   // 排产日期
    pub production_day: u32,    // 生产日序号 (学习曲线横轴)
    pub efficiency_pct: f64,    // 当日效率
    pub capacity_qty: i64,      // 当日产能上限 (已含半日折减)
    pub planned_qty: i64,       // 当日承诺件数
    pub cumulative_qty: i64,    // 累计承诺件数
}

// ==========================================
// BuildOutcome - 构建结果
// ==========================================
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// 订单件数全部覆盖
    Fulfilled { days: Vec<DayPlan> },
    /// 规则窗口在满足件数前耗尽 (部分覆盖, 由上层显式上报)
    RuleWindowExhausted {
        days: Vec<DayPlan>,
        fulfilled_qty: i64,
        boundary_date: NaiveDate,
    },
}

// ==========================================
// ScheduleBuilder - 日计划构建引擎
// ==========================================
pub struct ScheduleBuilder {
    evaluator: LearningCurveEvaluator,
    calculator: CapacityCalculator,
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self {
            evaluator: LearningCurveEvaluator::new(),
            calculator: CapacityCalculator::new(),
        }
    }

    /// 构建按日计划
    ///
    /// 逐日推进规则:
    /// 1) 全天假: 跳过, 生产日序号不变
    /// 2) 工作日/半日: 生产日序号 +1, 效率取曲线当日值
    /// 3) 当日产能 = 规则产能(曲线效率) 或 默认产能折算; 半日减半
    /// 4) 当日承诺 = max(0, 当日产能 - 已承诺量), 不为满足件数截尾
    /// 5) 累计 >= 订单件数即完成; 越过规则 effective_to 即窗口耗尽
    ///
    /// # 参数
    /// - `order`: 订单 (件数与标识)
    /// - `line_id`: 目标产线
    /// - `curve`: 学习曲线
    /// - `capacity`: 解析后的产能 (规则或默认)
    /// - `calendar`: 工作日历
    /// - `committed`: 产能承诺快照
    /// - `start_date`: 起排日期
    /// - `horizon_days`: 视野护栏 (天)
    ///
    /// # 返回
    /// - Ok(BuildOutcome): 完整或部分计划
    /// - Err(HorizonExceeded): 视野内无法完成且未触及规则边界
    #[instrument(skip(self, order, curve, capacity, calendar, committed), fields(
        order_id = %order.order_id,
        line_id = %line_id,
        quantity = order.total_quantity(),
        start_date = %start_date,
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        order: &Order,
        line_id: &str,
        curve: &LearningCurve,
        capacity: &ResolvedCapacity,
        calendar: &WorkCalendar,
        committed: &CommittedLedger,
        start_date: NaiveDate,
        horizon_days: u32,
    ) -> Result<BuildOutcome, ScheduleError> {
        let required_qty = order.total_quantity();
        if required_qty <= 0 {
            return Err(ScheduleError::Validation(format!(
                "订单件数必须大于 0: order_id={}, quantity={}",
                order.order_id, required_qty
            )));
        }

        let mut days: Vec<DayPlan> = Vec::new();
        let mut cumulative_qty: i64 = 0;
        let mut production_day: u32 = 0;
        let mut date = start_date;

        loop {
            // 视野护栏: 防止坏数据 (如零产能规则) 导致无界推进
            if (date - start_date) >= Duration::days(horizon_days as i64) {
                return Err(ScheduleError::HorizonExceeded {
                    order_id: order.order_id.clone(),
                    line_id: line_id.to_string(),
                    start_date,
                    horizon_days,
                });
            }

            // 规则窗口边界: 越界即停, 不得换规则续排
            if let Some(boundary) = capacity.effective_to() {
                if date > boundary {
                    return Ok(BuildOutcome::RuleWindowExhausted {
                        days,
                        fulfilled_qty: cumulative_qty,
                        boundary_date: boundary,
                    });
                }
            }

            let day_kind = calendar.day_kind(date);
            if day_kind == DayKind::Off {
                date += Duration::days(1);
                continue;
            }

            // 只有实际生产日推进学习曲线
            production_day += 1;
            let efficiency_pct = self.evaluator.efficiency_on_day(curve, production_day)?;

            let mut capacity_qty = match capacity {
                ResolvedCapacity::Rule(rule) => {
                    self.calculator.daily_capacity_for_rule(rule, efficiency_pct)?
                }
                ResolvedCapacity::LineDefault { pieces_per_day } => self
                    .calculator
                    .daily_capacity_for_default(*pieces_per_day, efficiency_pct)?,
            };
            if day_kind == DayKind::HalfDay {
                capacity_qty /= 2;
            }

            let committed_qty = committed.committed_qty(line_id, date);
            let planned_qty = (capacity_qty - committed_qty).max(0);

            if planned_qty > 0 {
                cumulative_qty += planned_qty;
                days.push(DayPlan {
                    plan_date: date,
                    production_day,
                    efficiency_pct,
                    capacity_qty,
                    planned_qty,
                    cumulative_qty,
                });
            }

            if cumulative_qty >= required_qty {
                return Ok(BuildOutcome::Fulfilled { days });
            }

            date += Duration::days(1);
        }
    }
}
