// ==========================================
// 服装生产排产系统 - 排产业务接口
// ==========================================
// 职责: 从仓储装配世界快照, 调用排产引擎, 驱动订单生命周期
// 红线:
// - 快照装配只读; 所有写入经由承诺仓储的事务化提交/释放
// - 批量排产逐单容错; 单个失败不中断批次
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::calendar::WorkCalendar;
use crate::domain::curve::LearningCurve;
use crate::domain::order::Order;
use crate::domain::types::{OrderStatus, ScheduleActionType};
use crate::engine::availability::LineAvailabilityIndex;
use crate::engine::orchestrator::{
    EngineSettings, OrderScheduleOutcome, ScheduleResult, SchedulingEngine, WorldSnapshot,
};
use crate::repository::{
    ActionLogRepository, AllocationRepository, CalendarRepository, CapacityRuleRepository,
    LearningCurveRepository, LineRepository, OrderRepository,
};
use chrono::{Duration, NaiveDate};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// SchedulingApi - 排产业务接口
// ==========================================
pub struct SchedulingApi {
    order_repo: Arc<OrderRepository>,
    curve_repo: Arc<LearningCurveRepository>,
    line_repo: Arc<LineRepository>,
    rule_repo: Arc<CapacityRuleRepository>,
    calendar_repo: Arc<CalendarRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    engine: SchedulingEngine<AllocationRepository>,
    settings: EngineSettings,
}

impl SchedulingApi {
    /// 创建排产业务接口
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_repo: Arc<OrderRepository>,
        curve_repo: Arc<LearningCurveRepository>,
        line_repo: Arc<LineRepository>,
        rule_repo: Arc<CapacityRuleRepository>,
        calendar_repo: Arc<CalendarRepository>,
        allocation_repo: Arc<AllocationRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        settings: EngineSettings,
    ) -> Self {
        let engine = SchedulingEngine::new(allocation_repo, settings.clone());
        Self {
            order_repo,
            curve_repo,
            line_repo,
            rule_repo,
            calendar_repo,
            action_log_repo,
            engine,
            settings,
        }
    }

    /// 单订单排产
    ///
    /// # 参数
    /// - `order_id`: 待排订单 (必须 UNSCHEDULED)
    /// - `search_from`: 起排搜索日期 (调用方显式给定)
    ///
    /// # 返回
    /// - Ok(ScheduleResult): 计划已提交, 订单已转 SCHEDULED
    /// - Err: 类型化失败原因, 订单保持 UNSCHEDULED
    #[instrument(skip(self), fields(order_id = %order_id, search_from = %search_from))]
    pub fn schedule_order(
        &self,
        order_id: &str,
        search_from: NaiveDate,
    ) -> ApiResult<ScheduleResult> {
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Order (id={})", order_id)))?;

        let snapshot = self.build_snapshot(std::slice::from_ref(&order), search_from)?;
        let result = self.engine.schedule_order(&snapshot, &order, search_from)?;
        Ok(result)
    }

    /// 批量排产全部未排订单 (逐单容错)
    #[instrument(skip(self), fields(search_from = %search_from))]
    pub fn schedule_all_unscheduled(
        &self,
        search_from: NaiveDate,
    ) -> ApiResult<Vec<OrderScheduleOutcome>> {
        let orders = self.order_repo.list_unscheduled()?;
        if orders.is_empty() {
            info!("无未排产订单");
            return Ok(Vec::new());
        }

        let snapshot = self.build_snapshot(&orders, search_from)?;
        Ok(self.engine.schedule_batch(&snapshot, &orders, search_from))
    }

    /// 释放已排产订单的计划
    ///
    /// 订单回退 UNSCHEDULED, 承诺行删除, 同一事务。
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub fn release_schedule(&self, order_id: &str) -> ApiResult<()> {
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Order (id={})", order_id)))?;
        if order.status != OrderStatus::Scheduled {
            return Err(ApiError::InvalidStateTransition {
                from: order.status.to_string(),
                to: OrderStatus::Unscheduled.to_string(),
            });
        }

        self.engine_store_release(order_id)?;
        info!(order_id = %order_id, "排产计划已释放");
        Ok(())
    }

    /// 显式重排: 释放既有计划后立即重新排产
    ///
    /// 重排失败时不回滚释放 (订单停留 UNSCHEDULED, 原因随错误返回)。
    #[instrument(skip(self), fields(order_id = %order_id, search_from = %search_from))]
    pub fn reschedule_order(
        &self,
        order_id: &str,
        search_from: NaiveDate,
    ) -> ApiResult<ScheduleResult> {
        self.release_schedule(order_id)?;

        self.action_log_repo.insert(
            order_id,
            ScheduleActionType::Reschedule,
            Some(&json!({ "search_from": search_from.to_string() }).to_string()),
        )?;

        match self.schedule_order(order_id, search_from) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "重排失败, 订单停留 UNSCHEDULED");
                Err(e)
            }
        }
    }

    /// 生产进度事件推进订单状态
    ///
    /// 合法推进: SCHEDULED -> IN_PROGRESS -> COMPLETED, 以及 CANCELLED / ON_HOLD。
    /// UNSCHEDULED -> SCHEDULED 不走本接口 (只能由排产提交触发)。
    #[instrument(skip(self), fields(order_id = %order_id, next = %next))]
    pub fn update_production_status(
        &self,
        order_id: &str,
        next: OrderStatus,
    ) -> ApiResult<()> {
        if next == OrderStatus::Scheduled || next == OrderStatus::Unscheduled {
            return Err(ApiError::InvalidInput(format!(
                "状态 {} 只能由排产提交/释放动作写入",
                next
            )));
        }

        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Order (id={})", order_id)))?;

        if !order.status.can_transition_to(next) {
            return Err(ApiError::InvalidStateTransition {
                from: order.status.to_string(),
                to: next.to_string(),
            });
        }

        self.order_repo
            .update_status(order_id, order.status, next, order.assigned_line.as_deref())?;
        self.action_log_repo.insert(
            order_id,
            ScheduleActionType::StatusChange,
            Some(&json!({ "from": order.status.to_string(), "to": next.to_string() }).to_string()),
        )?;

        info!(order_id = %order_id, from = %order.status, to = %next, "订单状态已推进");
        Ok(())
    }

    /// 查询订单审计日志
    pub fn list_action_log(
        &self,
        order_id: &str,
    ) -> ApiResult<Vec<crate::repository::ActionLogEntry>> {
        Ok(self.action_log_repo.list_for_order(order_id)?)
    }

    // ==========================================
    // 内部: 快照装配
    // ==========================================

    /// 从仓储装配世界快照 (只读)
    fn build_snapshot(
        &self,
        orders: &[Order],
        search_from: NaiveDate,
    ) -> ApiResult<WorldSnapshot> {
        let lines = self.line_repo.list_lines()?;
        if lines.is_empty() {
            return Err(ApiError::InvalidInput("无任何产线主数据".to_string()));
        }

        let rules = self.rule_repo.list_all()?;
        let availability = LineAvailabilityIndex::new(rules)?;

        // 缺失曲线不在此处阻断: 留给引擎对该订单上报 CurveNotFound,
        // 使批量排产保持逐单容错
        let mut curves: HashMap<String, LearningCurve> = HashMap::new();
        for order in orders {
            if curves.contains_key(&order.curve_id) {
                continue;
            }
            match self.curve_repo.find_by_id(&order.curve_id)? {
                Some(curve) => {
                    curves.insert(order.curve_id.clone(), curve);
                }
                None => {
                    warn!(
                        order_id = %order.order_id,
                        curve_id = %order.curve_id,
                        "学习曲线缺失, 该订单将以 CurveNotFound 上报"
                    );
                }
            }
        }

        let window_to = search_from + Duration::days(self.settings.horizon_days as i64);
        let holidays = self.calendar_repo.list_range(search_from, window_to)?;
        let calendar = WorkCalendar::from_holidays(&holidays);

        Ok(WorldSnapshot {
            lines,
            curves,
            availability,
            calendar,
        })
    }

    /// 经由引擎存储接口释放承诺 (与提交同一实现, 保证事务语义一致)
    fn engine_store_release(&self, order_id: &str) -> ApiResult<()> {
        use crate::engine::ledger_store::AllocationStore;
        self.engine_store().release_order(order_id)?;
        Ok(())
    }

    fn engine_store(&self) -> &AllocationRepository {
        self.engine.store()
    }
}
