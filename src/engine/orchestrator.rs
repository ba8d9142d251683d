// ==========================================
// 服装生产排产系统 - 排产编排引擎
// ==========================================
// 用途: 协调 线组分配 -> 规则解析 -> 日计划构建 -> 冲突检测 -> 事务提交
// ==========================================
// 红线:
// - 提交整单生效或整单拒绝, 冲突检测通过前不落任何承诺
// - 世界快照不变则结果逐字节一致 (全部决策确定性, 无随机数)
// - 批量排产逐单容错, 单个失败不中断批次
// ==========================================

use crate::domain::calendar::WorkCalendar;
use crate::domain::curve::LearningCurve;
use crate::domain::line::Line;
use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::engine::allocator::GroupAllocator;
use crate::engine::availability::LineAvailabilityIndex;
use crate::engine::builder::{BuildOutcome, DayPlan, ScheduleBuilder};
use crate::engine::conflict::{Conflict, ConflictDetector};
use crate::engine::error::ScheduleError;
use crate::engine::ledger_store::AllocationStore;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// EngineSettings - 引擎参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub horizon_days: u32,        // 排产视野护栏 (天)
    pub at_risk_buffer_days: i64, // 船期风险缓冲 (天)
    pub commit_retries: u32,      // 并发提交败者的重试次数
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            horizon_days: 730,
            at_risk_buffer_days: 3,
            commit_retries: 2,
        }
    }
}

// ==========================================
// WorldSnapshot - 世界快照
// ==========================================
// 用途: 一次排产调用的全部只读输入 (产能承诺除外, 由存储接口按需加载)
pub struct WorldSnapshot {
    pub lines: Vec<Line>,
    pub curves: HashMap<String, LearningCurve>,
    pub availability: LineAvailabilityIndex,
    pub calendar: WorkCalendar,
}

// ==========================================
// ScheduleResult - 排产结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub order_id: String,
    pub line_id: String,           // 分配产线
    pub days: Vec<DayPlan>,        // 按日计划
    pub total_planned_qty: i64,    // 承诺件数合计 (>= 订单件数)
    pub start_date: NaiveDate,     // 起排日
    pub finish_date: NaiveDate,    // 完工日
    pub status: OrderStatus,       // 提交后状态 (SCHEDULED)
    pub risk_flags: Vec<Conflict>, // 非阻断性风险提示 (如 DELIVERY_AT_RISK)
}

// ==========================================
// OrderScheduleOutcome - 批量排产单项结果
// ==========================================
pub struct OrderScheduleOutcome {
    pub order_id: String,
    pub result: Result<ScheduleResult, ScheduleError>,
}

// ==========================================
// SchedulingEngine - 排产编排引擎
// ==========================================
pub struct SchedulingEngine<S>
where
    S: AllocationStore,
{
    store: Arc<S>,
    allocator: GroupAllocator,
    builder: ScheduleBuilder,
    detector: ConflictDetector,
    settings: EngineSettings,
}

impl<S> SchedulingEngine<S>
where
    S: AllocationStore,
{
    /// 创建新的编排引擎实例
    ///
    /// # 参数
    /// - store: 产能承诺存储 (事务化提交的唯一入口)
    /// - settings: 引擎参数
    pub fn new(store: Arc<S>, settings: EngineSettings) -> Self {
        Self {
            store,
            allocator: GroupAllocator::new(),
            builder: ScheduleBuilder::new(),
            detector: ConflictDetector::new(),
            settings,
        }
    }

    /// 执行单订单排产
    ///
    /// 流程:
    /// 1) 订单/曲线前置校验 (失败无副作用)
    /// 2) 线组分配: 候选产线启发式排序
    /// 3) 逐候选: 解析规则 -> 构建日计划 -> 冲突检测
    /// 4) 事务提交; 并发败者刷新承诺快照后重试
    ///
    /// # 参数
    /// - `snapshot`: 世界快照 (产线/曲线/规则/日历)
    /// - `order`: 待排订单 (必须 UNSCHEDULED)
    /// - `search_from`: 起排搜索日期 (由调用方显式给定, 引擎不取系统时钟)
    ///
    /// # 返回
    /// - Ok(ScheduleResult): 计划已全量提交, 订单应转 SCHEDULED
    /// - Err: 类型化失败原因, 订单保持 UNSCHEDULED
    #[instrument(skip(self, snapshot, order), fields(
        order_id = %order.order_id,
        quantity = order.total_quantity(),
        ship_date = %order.ship_date,
    ))]
    pub fn schedule_order(
        &self,
        snapshot: &WorldSnapshot,
        order: &Order,
        search_from: NaiveDate,
    ) -> Result<ScheduleResult, ScheduleError> {
        // ==========================================
        // 步骤1: 前置校验 (计算前拒绝, 无副作用)
        // ==========================================
        order
            .validate_for_scheduling()
            .map_err(ScheduleError::Validation)?;

        let curve = snapshot
            .curves
            .get(&order.curve_id)
            .ok_or_else(|| ScheduleError::CurveNotFound(order.curve_id.clone()))?;
        curve.validate().map_err(|reason| ScheduleError::InvalidCurve {
            curve_id: curve.curve_id.clone(),
            reason,
        })?;

        let line_ids: Vec<String> = snapshot.lines.iter().map(|l| l.line_id.clone()).collect();
        let window_to = search_from + Duration::days(self.settings.horizon_days as i64);

        let mut last_conflict: Option<ScheduleError> = None;

        // 并发败者重试: 每轮重新加载承诺快照并重新分配
        for attempt in 0..=self.settings.commit_retries {
            let ledger = self.store.load_ledger(&line_ids, search_from, window_to)?;

            // ==========================================
            // 步骤2: 线组分配
            // ==========================================
            debug!(attempt, "执行线组分配");
            let rankings = self.allocator.rank(
                order,
                &snapshot.lines,
                &snapshot.availability,
                &snapshot.calendar,
                &ledger,
                search_from,
            )?;

            // ==========================================
            // 步骤3: 逐候选构建与校验
            // ==========================================
            let mut commit_lost = false;

            for candidate in &rankings {
                let line = &candidate.line;
                let start_date = candidate.earliest_slot;

                let capacity = snapshot.availability.resolve(
                    line,
                    &order.order_id,
                    order.buyer_id.as_deref(),
                    order.style_id.as_deref(),
                    start_date,
                )?;

                let outcome = self.builder.build(
                    order,
                    &line.line_id,
                    curve,
                    &capacity,
                    &snapshot.calendar,
                    &ledger,
                    start_date,
                    self.settings.horizon_days,
                )?;

                let days = match outcome {
                    BuildOutcome::Fulfilled { days } => days,
                    BuildOutcome::RuleWindowExhausted {
                        fulfilled_qty,
                        boundary_date,
                        ..
                    } => {
                        // 规则窗口耗尽是数据质量信号, 显式上报, 不换产线掩盖
                        warn!(
                            line_id = %line.line_id,
                            boundary_date = %boundary_date,
                            fulfilled_qty,
                            "规则窗口在满足件数前耗尽"
                        );
                        return Err(ScheduleError::PartialFulfillment {
                            order_id: order.order_id.clone(),
                            line_id: line.line_id.clone(),
                            fulfilled_qty,
                            required_qty: order.total_quantity(),
                            boundary_date,
                        });
                    }
                };

                // ==========================================
                // 步骤4: 冲突检测
                // ==========================================
                let conflicts = self.detector.check(
                    &days,
                    &line.line_id,
                    &ledger,
                    order.ship_date,
                    self.settings.at_risk_buffer_days,
                );
                let blocking: Vec<&Conflict> =
                    conflicts.iter().filter(|c| c.is_blocking()).collect();
                if !blocking.is_empty() {
                    debug!(
                        line_id = %line.line_id,
                        reason = %blocking[0].detail,
                        "候选产线存在阻断性冲突, 尝试下一候选"
                    );
                    last_conflict = Some(ScheduleError::AllocationConflict(format!(
                        "产线 {} 被拒绝: {}",
                        line.line_code, blocking[0].detail
                    )));
                    continue;
                }

                // ==========================================
                // 步骤5: 事务提交
                // ==========================================
                match self.store.commit_plan(&order.order_id, &line.line_id, &days) {
                    Ok(()) => {
                        let total_planned_qty =
                            days.last().map(|d| d.cumulative_qty).unwrap_or(0);
                        let finish_date =
                            days.last().map(|d| d.plan_date).unwrap_or(start_date);
                        let risk_flags: Vec<Conflict> =
                            conflicts.into_iter().filter(|c| !c.is_blocking()).collect();

                        info!(
                            line_id = %line.line_id,
                            start_date = %start_date,
                            finish_date = %finish_date,
                            total_planned_qty,
                            days = days.len(),
                            "排产提交成功"
                        );
                        return Ok(ScheduleResult {
                            order_id: order.order_id.clone(),
                            line_id: line.line_id.clone(),
                            days,
                            total_planned_qty,
                            start_date,
                            finish_date,
                            status: OrderStatus::Scheduled,
                            risk_flags,
                        });
                    }
                    Err(ScheduleError::AllocationConflict(reason)) => {
                        // 并发败者: 跳出候选循环, 刷新快照后整体重试
                        warn!(attempt, reason = %reason, "并发提交失败, 刷新承诺快照重试");
                        last_conflict = Some(ScheduleError::AllocationConflict(reason));
                        commit_lost = true;
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }

            if !commit_lost {
                // 所有候选均被冲突检测拒绝, 重试无意义
                break;
            }
        }

        Err(last_conflict.unwrap_or_else(|| {
            ScheduleError::AllocationConflict(format!(
                "无候选产线通过冲突检测: order_id={}",
                order.order_id
            ))
        }))
    }

    /// 批量排产 (逐单容错)
    ///
    /// 单个订单失败不会中断批次; 失败原因随结果逐单返回。
    pub fn schedule_batch(
        &self,
        snapshot: &WorldSnapshot,
        orders: &[Order],
        search_from: NaiveDate,
    ) -> Vec<OrderScheduleOutcome> {
        info!(batch_size = orders.len(), "开始批量排产");

        let mut outcomes = Vec::with_capacity(orders.len());
        for order in orders {
            let result = self.schedule_order(snapshot, order, search_from);
            if let Err(e) = &result {
                warn!(order_id = %order.order_id, error = %e, "订单排产失败, 批次继续");
            }
            outcomes.push(OrderScheduleOutcome {
                order_id: order.order_id.clone(),
                result,
            });
        }

        let ok_count = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!(
            batch_size = orders.len(),
            ok_count,
            failed_count = orders.len() - ok_count,
            "批量排产完成"
        );
        outcomes
    }

    /// 引擎参数只读访问
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// 承诺存储只读访问 (API 层复用同一事务语义的释放入口)
    pub fn store(&self) -> &S {
        &self.store
    }
}
