// ==========================================
// 服装生产排产系统 - 产能承诺存储接口
// ==========================================
// 职责: 定义产能承诺表的读取与事务化提交接口
// 说明: Engine 层定义 trait, Repository 层实现适配器 (依赖倒置)
// 红线: 提交必须整单生效或整单拒绝; 提交前在事务内重校验产能,
//       并发提交的败者以 AllocationConflict 上报
// ==========================================

use crate::domain::capacity::{CommittedAllocation, CommittedLedger};
use crate::engine::builder::DayPlan;
use crate::engine::error::ScheduleError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

// ==========================================
// AllocationStore Trait
// ==========================================
pub trait AllocationStore: Send + Sync {
    /// 加载指定产线在日期窗口内的承诺快照
    fn load_ledger(
        &self,
        line_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CommittedLedger, ScheduleError>;

    /// 事务化提交整个计划
    ///
    /// 在同一事务内:
    /// 1) 逐日重校验 既有承诺 + 本计划承诺 <= 当日产能上限
    /// 2) 校验通过则写入全部承诺行, 否则一行不写
    ///
    /// # 返回
    /// - Err(AllocationConflict): 并发提交败者 (调用方可刷新快照重试)
    fn commit_plan(
        &self,
        order_id: &str,
        line_id: &str,
        days: &[DayPlan],
    ) -> Result<(), ScheduleError>;

    /// 释放某订单的全部承诺 (显式重排/取消时调用)
    fn release_order(&self, order_id: &str) -> Result<(), ScheduleError>;
}

// ==========================================
// InMemoryAllocationStore - 内存实现
// ==========================================
// 用途: 引擎单测与纯内存排产演算; 生产路径使用 SQLite 仓储实现
#[derive(Default)]
pub struct InMemoryAllocationStore {
    rows: Mutex<Vec<CommittedAllocation>>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 导出全部承诺行 (测试断言用)
    pub fn all_rows(&self) -> Vec<CommittedAllocation> {
        self.rows.lock().expect("承诺表锁中毒").clone()
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn load_ledger(
        &self,
        line_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CommittedLedger, ScheduleError> {
        let rows = self.rows.lock().map_err(|e| ScheduleError::Storage(e.to_string()))?;
        let mut ledger = CommittedLedger::new();
        for row in rows.iter() {
            if row.plan_date < from || row.plan_date > to {
                continue;
            }
            if !line_ids.is_empty() && !line_ids.iter().any(|id| id == &row.line_id) {
                continue;
            }
            ledger.add(&row.line_id, row.plan_date, row.planned_qty);
        }
        Ok(ledger)
    }

    fn commit_plan(
        &self,
        order_id: &str,
        line_id: &str,
        days: &[DayPlan],
    ) -> Result<(), ScheduleError> {
        let mut rows = self.rows.lock().map_err(|e| ScheduleError::Storage(e.to_string()))?;

        // 事务内重校验: 以 (line_id, plan_date) 聚合既有承诺
        let mut existing: HashMap<NaiveDate, i64> = HashMap::new();
        for row in rows.iter().filter(|r| r.line_id == line_id) {
            *existing.entry(row.plan_date).or_insert(0) += row.planned_qty;
        }
        for day in days {
            let committed = existing.get(&day.plan_date).copied().unwrap_or(0);
            if committed + day.planned_qty > day.capacity_qty {
                return Err(ScheduleError::AllocationConflict(format!(
                    "并发提交校验失败: line_id={}, date={}, 既有 {} + 本单 {} > 产能 {}",
                    line_id, day.plan_date, committed, day.planned_qty, day.capacity_qty
                )));
            }
        }

        for day in days {
            rows.push(CommittedAllocation {
                line_id: line_id.to_string(),
                plan_date: day.plan_date,
                order_id: order_id.to_string(),
                planned_qty: day.planned_qty,
                capacity_qty: day.capacity_qty,
                production_day: day.production_day,
            });
        }
        Ok(())
    }

    fn release_order(&self, order_id: &str) -> Result<(), ScheduleError> {
        let mut rows = self.rows.lock().map_err(|e| ScheduleError::Storage(e.to_string()))?;
        rows.retain(|r| r.order_id != order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(ymd: (i32, u32, u32), planned_qty: i64, capacity_qty: i64) -> DayPlan {
        DayPlan {
            plan_date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            production_day: 1,
            efficiency_pct: 80.0,
            capacity_qty,
            planned_qty,
            cumulative_qty: planned_qty,
        }
    }

    #[test]
    fn test_commit_and_reload() {
        let store = InMemoryAllocationStore::new();
        store
            .commit_plan("O1", "L1", &[day((2026, 3, 2), 480, 480)])
            .unwrap();

        let ledger = store
            .load_ledger(
                &["L1".to_string()],
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(
            ledger.committed_qty("L1", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
            480
        );
    }

    #[test]
    fn test_overcommit_rejected_atomically() {
        let store = InMemoryAllocationStore::new();
        store
            .commit_plan("O1", "L1", &[day((2026, 3, 2), 300, 480)])
            .unwrap();

        // 第二日合法, 首日超限 -> 整单拒绝, 第二日也不得写入
        let result = store.commit_plan(
            "O2",
            "L1",
            &[day((2026, 3, 2), 200, 480), day((2026, 3, 3), 100, 480)],
        );
        assert!(matches!(result, Err(ScheduleError::AllocationConflict(_))));
        assert_eq!(store.all_rows().len(), 1);
    }

    #[test]
    fn test_release_order() {
        let store = InMemoryAllocationStore::new();
        store
            .commit_plan("O1", "L1", &[day((2026, 3, 2), 300, 480)])
            .unwrap();
        store
            .commit_plan("O2", "L1", &[day((2026, 3, 2), 180, 480)])
            .unwrap();

        store.release_order("O1").unwrap();
        let rows = store.all_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].order_id, "O2");
    }
}
