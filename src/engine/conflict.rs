// ==========================================
// 服装生产排产系统 - 计划冲突检测引擎
// ==========================================
// 职责: 校验已构建计划与既有产能承诺/船期的冲突
// 输出: 冲突清单 (只读检测, 不改状态, 由编排器决定提交或拒绝)
// ==========================================

use crate::domain::capacity::CommittedLedger;
use crate::engine::builder::DayPlan;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// 冲突类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// 当日承诺合计超过产能上限
    CapacityOverrun,
    /// 完工日晚于要求船期
    DeliveryDelayed,
    /// 完工日落在船期风险缓冲区内
    DeliveryAtRisk,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::CapacityOverrun => write!(f, "CAPACITY_OVERRUN"),
            ConflictType::DeliveryDelayed => write!(f, "DELIVERY_DELAYED"),
            ConflictType::DeliveryAtRisk => write!(f, "DELIVERY_AT_RISK"),
        }
    }
}

// ==========================================
// Conflict - 冲突明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub line_id: String,
    pub plan_date: Option<NaiveDate>, // 产能类冲突定位到日; 交期类为 None
    pub detail: String,               // 显式原因 (操作员可读)
}

impl Conflict {
    /// 是否为阻断性冲突 (风险提示不阻断提交)
    pub fn is_blocking(&self) -> bool {
        matches!(
            self.conflict_type,
            ConflictType::CapacityOverrun | ConflictType::DeliveryDelayed
        )
    }
}

// ==========================================
// ConflictDetector - 冲突检测引擎
// ==========================================
pub struct ConflictDetector {
    // 无状态引擎,不需要注入依赖
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self {}
    }

    /// 检测计划冲突
    ///
    /// # 检查项
    /// 1) 逐日: 既有承诺 + 本计划承诺 <= 当日产能上限
    /// 2) 完工日 > 船期: DELIVERY_DELAYED (阻断)
    /// 3) 完工日距船期不足缓冲天数: DELIVERY_AT_RISK (提示)
    ///
    /// # 参数
    /// - `days`: 已构建的按日计划
    /// - `line_id`: 目标产线
    /// - `committed`: 产能承诺快照 (不含本计划)
    /// - `ship_date`: 订单要求船期
    /// - `at_risk_buffer_days`: 风险缓冲天数
    pub fn check(
        &self,
        days: &[DayPlan],
        line_id: &str,
        committed: &CommittedLedger,
        ship_date: NaiveDate,
        at_risk_buffer_days: i64,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for day in days {
            let existing = committed.committed_qty(line_id, day.plan_date);
            let total = existing + day.planned_qty;
            if total > day.capacity_qty {
                conflicts.push(Conflict {
                    conflict_type: ConflictType::CapacityOverrun,
                    line_id: line_id.to_string(),
                    plan_date: Some(day.plan_date),
                    detail: format!(
                        "当日承诺超限: 既有 {} + 本单 {} > 产能 {}",
                        existing, day.planned_qty, day.capacity_qty
                    ),
                });
            }
        }

        if let Some(last) = days.last() {
            let finish = last.plan_date;
            if finish > ship_date {
                conflicts.push(Conflict {
                    conflict_type: ConflictType::DeliveryDelayed,
                    line_id: line_id.to_string(),
                    plan_date: None,
                    detail: format!("完工日 {} 晚于要求船期 {}", finish, ship_date),
                });
            } else if (ship_date - finish).num_days() < at_risk_buffer_days {
                conflicts.push(Conflict {
                    conflict_type: ConflictType::DeliveryAtRisk,
                    line_id: line_id.to_string(),
                    plan_date: None,
                    detail: format!(
                        "完工日 {} 距船期 {} 不足 {} 天缓冲",
                        finish, ship_date, at_risk_buffer_days
                    ),
                });
            }
        }

        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(ymd: (i32, u32, u32), planned_qty: i64, capacity_qty: i64, cumulative_qty: i64) -> DayPlan {
        DayPlan {
            plan_date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            production_day: 1,
            efficiency_pct: 80.0,
            capacity_qty,
            planned_qty,
            cumulative_qty,
        }
    }

    #[test]
    fn test_capacity_overrun_detected() {
        let mut committed = CommittedLedger::new();
        committed.add("L1", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), 400);

        let detector = ConflictDetector::new();
        let conflicts = detector.check(
            &[day((2026, 3, 2), 200, 480, 200)],
            "L1",
            &committed,
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            3,
        );
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::CapacityOverrun);
        assert!(conflicts[0].is_blocking());
    }

    #[test]
    fn test_delayed_finish_detected() {
        let detector = ConflictDetector::new();
        let conflicts = detector.check(
            &[day((2026, 4, 2), 480, 480, 480)],
            "L1",
            &CommittedLedger::new(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            3,
        );
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::DeliveryDelayed);
    }

    #[test]
    fn test_at_risk_finish_flagged_not_blocking() {
        let detector = ConflictDetector::new();
        let conflicts = detector.check(
            &[day((2026, 3, 30), 480, 480, 480)],
            "L1",
            &CommittedLedger::new(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            3,
        );
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::DeliveryAtRisk);
        assert!(!conflicts[0].is_blocking());
    }

    #[test]
    fn test_clean_plan_passes() {
        let detector = ConflictDetector::new();
        let conflicts = detector.check(
            &[day((2026, 3, 2), 480, 480, 480)],
            "L1",
            &CommittedLedger::new(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            3,
        );
        assert!(conflicts.is_empty());
    }
}
