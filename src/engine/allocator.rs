// ==========================================
// 服装生产排产系统 - 线组分配引擎
// ==========================================
// 职责: 在订单要求的线组内选择候选产线
// 启发式: 最早可用档期优先, 其次船期前剩余产能高者, 最后按产线代码升序保证确定性
// 红线: 一单一线; 无法在船期前完成的候选不参与分配
// ==========================================

use crate::domain::calendar::WorkCalendar;
use crate::domain::capacity::CommittedLedger;
use crate::domain::line::Line;
use crate::domain::order::Order;
use crate::domain::types::DayKind;
use crate::engine::availability::{LineAvailabilityIndex, ResolvedCapacity};
use crate::engine::capacity_calc::CapacityCalculator;
use crate::engine::error::ScheduleError;
use chrono::{Duration, NaiveDate};
use tracing::debug;

// ==========================================
// CandidateRanking - 候选产线评估
// ==========================================
#[derive(Debug, Clone)]
pub struct CandidateRanking {
    pub line: Line,
    pub earliest_slot: NaiveDate,     // 最早有空闲产能的工作日
    pub remaining_before_ship: i64,   // 船期前 (含) 剩余可用产能合计
}

// ==========================================
// GroupAllocator - 线组分配引擎
// ==========================================
pub struct GroupAllocator {
    calculator: CapacityCalculator,
}

impl Default for GroupAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupAllocator {
    pub fn new() -> Self {
        Self {
            calculator: CapacityCalculator::new(),
        }
    }

    /// 评估并排序候选产线
    ///
    /// 候选集: 订单指定线组的成员; 未指定线组时为全部产线。
    /// 剩余产能按规则额定效率估算 (爬坡修正由构建引擎负责);
    /// 估算船期前剩余产能不足订单件数的候选被剔除。
    ///
    /// # 返回
    /// - Ok(Vec<CandidateRanking>): 可行候选, 按启发式排序
    /// - Err(AllocationConflict): 无候选能在船期前完成 (附限制产线)
    /// - Err(RuleNotFound): 所有候选产线均无产能规则与默认产能
    pub fn rank(
        &self,
        order: &Order,
        lines: &[Line],
        availability: &LineAvailabilityIndex,
        calendar: &WorkCalendar,
        committed: &CommittedLedger,
        search_from: NaiveDate,
    ) -> Result<Vec<CandidateRanking>, ScheduleError> {
        let required_qty = order.total_quantity();

        let candidates: Vec<&Line> = match &order.group_id {
            Some(group_id) => lines
                .iter()
                .filter(|l| l.group_id.as_deref() == Some(group_id.as_str()))
                .collect(),
            None => lines.iter().collect(),
        };

        if candidates.is_empty() {
            return Err(ScheduleError::AllocationConflict(format!(
                "订单线组无候选产线: order_id={}, group_id={:?}",
                order.order_id, order.group_id
            )));
        }

        let mut rankings: Vec<CandidateRanking> = Vec::new();
        let mut no_rule_count = 0usize;
        // 最接近可行的落选候选, 用于冲突报文定位限制产线
        let mut best_shortfall: Option<(String, i64)> = None;

        for line in candidates.iter() {
            match self.probe_line(order, line, availability, calendar, committed, search_from)? {
                ProbeOutcome::NoRule => {
                    no_rule_count += 1;
                }
                ProbeOutcome::NoSlot => {
                    debug!(line_id = %line.line_id, "候选产线船期前无空闲产能");
                }
                ProbeOutcome::Available {
                    earliest_slot,
                    remaining_before_ship,
                } => {
                    if remaining_before_ship >= required_qty {
                        rankings.push(CandidateRanking {
                            line: (*line).clone(),
                            earliest_slot,
                            remaining_before_ship,
                        });
                    } else {
                        let better = match &best_shortfall {
                            Some((_, best_remaining)) => remaining_before_ship > *best_remaining,
                            None => true,
                        };
                        if better {
                            best_shortfall =
                                Some((line.line_code.clone(), remaining_before_ship));
                        }
                    }
                }
            }
        }

        if rankings.is_empty() {
            if no_rule_count == candidates.len() {
                return Err(ScheduleError::RuleNotFound {
                    line_id: candidates[0].line_id.clone(),
                    date: search_from,
                });
            }
            let detail = match best_shortfall {
                Some((line_code, remaining)) => format!(
                    "无候选产线能在船期 {} 前完成 {} 件: 最接近的产线 {} 仅剩 {} 件产能",
                    order.ship_date, required_qty, line_code, remaining
                ),
                None => format!(
                    "无候选产线在船期 {} 前有空闲产能: order_id={}",
                    order.ship_date, order.order_id
                ),
            };
            return Err(ScheduleError::AllocationConflict(detail));
        }

        rankings.sort_by(|a, b| {
            a.earliest_slot
                .cmp(&b.earliest_slot)
                .then(b.remaining_before_ship.cmp(&a.remaining_before_ship))
                .then(a.line.line_code.cmp(&b.line.line_code))
        });

        Ok(rankings)
    }

    /// 取最优候选产线
    ///
    /// # 返回
    /// - Ok(Line): 启发式排序后的第一名
    /// - Err: 同 rank
    pub fn assign(
        &self,
        order: &Order,
        lines: &[Line],
        availability: &LineAvailabilityIndex,
        calendar: &WorkCalendar,
        committed: &CommittedLedger,
        search_from: NaiveDate,
    ) -> Result<Line, ScheduleError> {
        let rankings = self.rank(order, lines, availability, calendar, committed, search_from)?;
        Ok(rankings[0].line.clone())
    }

    /// 探测单条产线: 最早空闲档期与船期前剩余产能
    fn probe_line(
        &self,
        order: &Order,
        line: &Line,
        availability: &LineAvailabilityIndex,
        calendar: &WorkCalendar,
        committed: &CommittedLedger,
        search_from: NaiveDate,
    ) -> Result<ProbeOutcome, ScheduleError> {
        let mut earliest_slot: Option<NaiveDate> = None;
        let mut remaining_before_ship: i64 = 0;
        let mut resolved_any = false;

        let mut date = search_from;
        while date <= order.ship_date {
            if calendar.day_kind(date) == DayKind::Off {
                date += Duration::days(1);
                continue;
            }

            let capacity = match availability.resolve(
                line,
                &order.order_id,
                order.buyer_id.as_deref(),
                order.style_id.as_deref(),
                date,
            ) {
                Ok(c) => c,
                Err(ScheduleError::RuleNotFound { .. }) => {
                    date += Duration::days(1);
                    continue;
                }
                Err(e) => return Err(e),
            };
            resolved_any = true;

            let mut capacity_qty = match &capacity {
                ResolvedCapacity::Rule(rule) => self
                    .calculator
                    .daily_capacity_for_rule(rule, rule.efficiency_pct)?,
                ResolvedCapacity::LineDefault { pieces_per_day } => *pieces_per_day,
            };
            if calendar.day_kind(date) == DayKind::HalfDay {
                capacity_qty /= 2;
            }

            let free = (capacity_qty - committed.committed_qty(&line.line_id, date)).max(0);
            if free > 0 && earliest_slot.is_none() {
                earliest_slot = Some(date);
            }
            remaining_before_ship += free;

            date += Duration::days(1);
        }

        if !resolved_any {
            return Ok(ProbeOutcome::NoRule);
        }
        match earliest_slot {
            Some(slot) => Ok(ProbeOutcome::Available {
                earliest_slot: slot,
                remaining_before_ship,
            }),
            None => Ok(ProbeOutcome::NoSlot),
        }
    }
}

enum ProbeOutcome {
    /// 产线在整个窗口内无规则也无默认产能
    NoRule,
    /// 有规则但船期前无空闲产能
    NoSlot,
    Available {
        earliest_slot: NaiveDate,
        remaining_before_ship: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::capacity::LineCapacityRule;
    use crate::domain::types::OrderStatus;
    use chrono::Utc;

    fn order(group_id: Option<&str>, quantity: i64, ship: (i32, u32, u32)) -> Order {
        Order {
            order_id: "ORD001".to_string(),
            order_ref: "PO-001".to_string(),
            buyer_id: None,
            style_id: None,
            group_id: group_id.map(str::to_string),
            curve_id: "C1".to_string(),
            quantity,
            size_qtys: vec![],
            ship_date: NaiveDate::from_ymd_opt(ship.0, ship.1, ship.2).unwrap(),
            status: OrderStatus::Unscheduled,
            assigned_line: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(line_id: &str, line_code: &str, group_id: Option<&str>) -> Line {
        Line {
            line_id: line_id.to_string(),
            line_code: line_code.to_string(),
            line_name: format!("产线{}", line_code),
            group_id: group_id.map(str::to_string),
            default_capacity: None,
        }
    }

    fn rule(line_id: &str) -> LineCapacityRule {
        LineCapacityRule {
            rule_id: format!("R-{}", line_id),
            line_id: line_id.to_string(),
            order_id: None,
            buyer_id: None,
            style_id: None,
            sam_minutes: 10.0,
            operators: 20,
            working_hours: 8.0,
            efficiency_pct: 100.0, // 额定 960 件/日
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_to: None,
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_group_restricts_candidates() {
        let lines = vec![
            line("L1", "A1", Some("G1")),
            line("L2", "B1", Some("G2")),
        ];
        let availability =
            LineAvailabilityIndex::new(vec![rule("L1"), rule("L2")]).unwrap();
        let allocator = GroupAllocator::new();

        let picked = allocator
            .assign(
                &order(Some("G2"), 1000, (2026, 3, 31)),
                &lines,
                &availability,
                &WorkCalendar::new(),
                &CommittedLedger::new(),
                start(),
            )
            .unwrap();
        assert_eq!(picked.line_id, "L2");
    }

    #[test]
    fn test_earliest_slot_wins() {
        let lines = vec![
            line("L1", "A1", None),
            line("L2", "B1", None),
        ];
        let availability =
            LineAvailabilityIndex::new(vec![rule("L1"), rule("L2")]).unwrap();

        // L1 前三日被占满, L2 空闲
        let mut committed = CommittedLedger::new();
        for offset in 0..3 {
            committed.add("L1", start() + Duration::days(offset), 960);
        }

        let allocator = GroupAllocator::new();
        let picked = allocator
            .assign(
                &order(None, 1000, (2026, 3, 31)),
                &lines,
                &availability,
                &WorkCalendar::new(),
                &committed,
                start(),
            )
            .unwrap();
        assert_eq!(picked.line_id, "L2");
    }

    #[test]
    fn test_tie_breaks_by_line_code() {
        let lines = vec![
            line("L9", "B1", None),
            line("L3", "A1", None),
        ];
        let availability =
            LineAvailabilityIndex::new(vec![rule("L9"), rule("L3")]).unwrap();
        let allocator = GroupAllocator::new();

        let picked = allocator
            .assign(
                &order(None, 1000, (2026, 3, 31)),
                &lines,
                &availability,
                &WorkCalendar::new(),
                &CommittedLedger::new(),
                start(),
            )
            .unwrap();
        // 档期与剩余产能相同, 按产线代码升序
        assert_eq!(picked.line_id, "L3");
    }

    #[test]
    fn test_infeasible_ship_date_conflicts() {
        let lines = vec![line("L1", "A1", None)];
        let availability = LineAvailabilityIndex::new(vec![rule("L1")]).unwrap();
        let allocator = GroupAllocator::new();

        // 960 件/日 * 3 个工作日 < 100000 件
        let result = allocator.assign(
            &order(None, 100_000, (2026, 3, 4)),
            &lines,
            &availability,
            &WorkCalendar::new(),
            &CommittedLedger::new(),
            start(),
        );
        assert!(matches!(result, Err(ScheduleError::AllocationConflict(_))));
    }

    #[test]
    fn test_all_lines_without_rules() {
        let lines = vec![line("L1", "A1", None)];
        let availability = LineAvailabilityIndex::new(vec![]).unwrap();
        let allocator = GroupAllocator::new();

        let result = allocator.assign(
            &order(None, 100, (2026, 3, 31)),
            &lines,
            &availability,
            &WorkCalendar::new(),
            &CommittedLedger::new(),
            start(),
        );
        assert!(matches!(result, Err(ScheduleError::RuleNotFound { .. })));
    }
}
