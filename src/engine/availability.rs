// ==========================================
// 服装生产排产系统 - 产能规则解析引擎
// ==========================================
// 职责: 为 (产线, 订单, 买家, 款式, 日期) 解析唯一的生效产能规则
// 优先级: 订单级 > 款式级 > 买家级 > 产线通用; 同级取 effective_from 最晚者
// 兜底: 无生效规则时回退产线默认产能; 仍无则 RuleNotFound
// ==========================================

use crate::domain::capacity::LineCapacityRule;
use crate::domain::line::Line;
use crate::engine::error::ScheduleError;
use chrono::NaiveDate;
use std::collections::HashMap;

// ==========================================
// ResolvedCapacity - 解析结果
// ==========================================
#[derive(Debug, Clone)]
pub enum ResolvedCapacity {
    /// 命中时间窗产能规则
    Rule(LineCapacityRule),
    /// 回退到产线默认产能 (件/日)
    LineDefault { pieces_per_day: i64 },
}

impl ResolvedCapacity {
    /// 规则窗口截止日 (默认产能不设截止)
    pub fn effective_to(&self) -> Option<NaiveDate> {
        match self {
            ResolvedCapacity::Rule(rule) => rule.effective_to,
            ResolvedCapacity::LineDefault { .. } => None,
        }
    }

    /// 额定效率 (排产前估算用; 默认产能视为 100%)
    pub fn nominal_efficiency_pct(&self) -> f64 {
        match self {
            ResolvedCapacity::Rule(rule) => rule.efficiency_pct,
            ResolvedCapacity::LineDefault { .. } => 100.0,
        }
    }
}

// ==========================================
// LineAvailabilityIndex - 产能规则索引
// ==========================================
pub struct LineAvailabilityIndex {
    rules_by_line: HashMap<String, Vec<LineCapacityRule>>,
}

impl LineAvailabilityIndex {
    /// 由规则全集构建索引
    ///
    /// 构建时即做字段校验, 非法规则直接拒绝 (计算前拒绝, 无副作用)。
    ///
    /// # 返回
    /// - Ok(LineAvailabilityIndex): 按产线分桶的索引
    /// - Err(Validation): 任一规则字段非法
    pub fn new(rules: Vec<LineCapacityRule>) -> Result<Self, ScheduleError> {
        let mut rules_by_line: HashMap<String, Vec<LineCapacityRule>> = HashMap::new();
        for rule in rules {
            rule.validate().map_err(ScheduleError::Validation)?;
            rules_by_line
                .entry(rule.line_id.clone())
                .or_default()
                .push(rule);
        }
        Ok(Self { rules_by_line })
    }

    /// 解析某日期生效的产能规则
    ///
    /// # 参数
    /// - `line`: 候选产线 (携带默认产能兜底)
    /// - `order_id` / `buyer_id` / `style_id`: 作用域匹配键
    /// - `date`: 目标日期
    ///
    /// # 返回
    /// - Ok(ResolvedCapacity::Rule): 最特异的生效规则
    /// - Ok(ResolvedCapacity::LineDefault): 无规则但产线有默认产能
    /// - Err(RuleNotFound): 两者皆无
    pub fn resolve(
        &self,
        line: &Line,
        order_id: &str,
        buyer_id: Option<&str>,
        style_id: Option<&str>,
        date: NaiveDate,
    ) -> Result<ResolvedCapacity, ScheduleError> {
        let mut best: Option<&LineCapacityRule> = None;

        if let Some(rules) = self.rules_by_line.get(&line.line_id) {
            for rule in rules {
                if !rule.is_active_on(date) {
                    continue;
                }
                if !rule.matches_order(order_id, buyer_id, style_id) {
                    continue;
                }
                best = match best {
                    None => Some(rule),
                    Some(current) => Some(Self::pick_more_specific(current, rule)),
                };
            }
        }

        if let Some(rule) = best {
            return Ok(ResolvedCapacity::Rule(rule.clone()));
        }

        match line.default_capacity {
            Some(pieces) if pieces > 0 => Ok(ResolvedCapacity::LineDefault {
                pieces_per_day: pieces,
            }),
            _ => Err(ScheduleError::RuleNotFound {
                line_id: line.line_id.clone(),
                date,
            }),
        }
    }

    /// 二选一: 特异度高者胜; 同特异度取 effective_from 最晚;
    /// 再相同时按 rule_id 升序保证确定性
    fn pick_more_specific<'a>(
        current: &'a LineCapacityRule,
        challenger: &'a LineCapacityRule,
    ) -> &'a LineCapacityRule {
        let key_current = (
            current.specificity(),
            current.effective_from,
            std::cmp::Reverse(current.rule_id.as_str()),
        );
        let key_challenger = (
            challenger.specificity(),
            challenger.effective_from,
            std::cmp::Reverse(challenger.rule_id.as_str()),
        );
        if key_challenger > key_current {
            challenger
        } else {
            current
        }
    }
}
