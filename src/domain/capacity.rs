// ==========================================
// 服装生产排产系统 - 产能规则与承诺领域模型
// ==========================================
// 红线: 产能承诺以 (line_id, plan_date) 为键, 提交必须事务化
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// LineCapacityRule - 时间窗产能规则
// ==========================================
// 作用域: 订单级 > 款式级 > 买家级 > 产线通用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCapacityRule {
    pub rule_id: String,                 // 规则ID
    pub line_id: String,                 // 产线ID
    pub order_id: Option<String>,        // 作用域: 指定订单
    pub buyer_id: Option<String>,        // 作用域: 指定买家
    pub style_id: Option<String>,        // 作用域: 指定款式
    pub sam_minutes: f64,                // SAM 标准工时 (分钟/件, > 0)
    pub operators: u32,                  // 操作工人数 (>= 1)
    pub working_hours: f64,              // 每日工作小时 (> 0)
    pub efficiency_pct: f64,             // 额定效率百分比 (1-200)
    pub effective_from: NaiveDate,       // 生效起始日
    pub effective_to: Option<NaiveDate>, // 生效截止日 (None = 不限)
}

impl LineCapacityRule {
    /// 校验规则字段
    pub fn validate(&self) -> Result<(), String> {
        if self.sam_minutes <= 0.0 || !self.sam_minutes.is_finite() {
            return Err(format!(
                "SAM 必须大于 0: rule_id={}, sam={}",
                self.rule_id, self.sam_minutes
            ));
        }
        if self.operators < 1 {
            return Err(format!("操作工人数必须 >= 1: rule_id={}", self.rule_id));
        }
        if self.working_hours <= 0.0 || !self.working_hours.is_finite() {
            return Err(format!(
                "每日工作小时必须大于 0: rule_id={}, hours={}",
                self.rule_id, self.working_hours
            ));
        }
        if !(1.0..=200.0).contains(&self.efficiency_pct) {
            return Err(format!(
                "额定效率必须在 1-200 之间: rule_id={}, efficiency={}",
                self.rule_id, self.efficiency_pct
            ));
        }
        if let Some(to) = self.effective_to {
            if to < self.effective_from {
                return Err(format!(
                    "生效窗口非法: rule_id={}, effective_from={} > effective_to={}",
                    self.rule_id, self.effective_from, to
                ));
            }
        }
        Ok(())
    }

    /// 规则在指定日期是否生效
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if date < self.effective_from {
            return false;
        }
        match self.effective_to {
            Some(to) => date <= to,
            None => true,
        }
    }

    /// 作用域特异度 (订单 3 > 款式 2 > 买家 1 > 通用 0)
    pub fn specificity(&self) -> u8 {
        if self.order_id.is_some() {
            3
        } else if self.style_id.is_some() {
            2
        } else if self.buyer_id.is_some() {
            1
        } else {
            0
        }
    }

    /// 作用域是否匹配指定订单
    ///
    /// 已设置的作用域字段必须逐一命中; 未设置的字段不参与匹配。
    pub fn matches_order(
        &self,
        order_id: &str,
        buyer_id: Option<&str>,
        style_id: Option<&str>,
    ) -> bool {
        if let Some(rule_order) = &self.order_id {
            if rule_order != order_id {
                return false;
            }
        }
        if let Some(rule_style) = &self.style_id {
            if style_id != Some(rule_style.as_str()) {
                return false;
            }
        }
        if let Some(rule_buyer) = &self.buyer_id {
            if buyer_id != Some(rule_buyer.as_str()) {
                return false;
            }
        }
        true
    }
}

// ==========================================
// CommittedAllocation - 产能承诺行
// ==========================================
// 红线: 只在事务提交中写入, 引擎侧只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedAllocation {
    pub line_id: String,       // 产线ID
    pub plan_date: NaiveDate,  // 排产日期
    pub order_id: String,      // 订单ID
    pub planned_qty: i64,      // 承诺件数
    pub capacity_qty: i64,     // 当日产能上限 (提交时点计算值)
    pub production_day: u32,   // 该订单的生产日序号
}

// ==========================================
// CommittedLedger - 产能承诺快照
// ==========================================
// 用途: 引擎侧按 (line_id, plan_date) 聚合的只读视图
#[derive(Debug, Clone, Default)]
pub struct CommittedLedger {
    cells: HashMap<(String, NaiveDate), i64>,
}

impl CommittedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由承诺行构建快照
    pub fn from_rows(rows: &[CommittedAllocation]) -> Self {
        let mut ledger = Self::new();
        for row in rows {
            ledger.add(&row.line_id, row.plan_date, row.planned_qty);
        }
        ledger
    }

    /// 累加某 (产线, 日期) 的承诺量
    pub fn add(&mut self, line_id: &str, plan_date: NaiveDate, qty: i64) {
        *self
            .cells
            .entry((line_id.to_string(), plan_date))
            .or_insert(0) += qty;
    }

    /// 查询某 (产线, 日期) 的已承诺量
    pub fn committed_qty(&self, line_id: &str, plan_date: NaiveDate) -> i64 {
        self.cells
            .get(&(line_id.to_string(), plan_date))
            .copied()
            .unwrap_or(0)
    }

    /// 快照中承诺单元格数量
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
