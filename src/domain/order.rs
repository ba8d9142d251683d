// ==========================================
// 服装生产排产系统 - 订单领域模型
// ==========================================
// 红线: 订单总量 = 尺码明细之和; 状态只能沿状态机推进
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// SizeQuantity - 尺码数量明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeQuantity {
    pub size_code: String, // 尺码 (S/M/L/XL...)
    pub qty: i64,          // 件数
}

// ==========================================
// Order - 生产订单
// ==========================================
// 用途: 排产引擎的输入; 引擎只改 status / assigned_line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,            // 订单ID
    pub order_ref: String,           // 订单号 (业务编号)
    pub buyer_id: Option<String>,    // 买家 (规则作用域提示)
    pub style_id: Option<String>,    // 款式 (规则作用域提示)
    pub group_id: Option<String>,    // 要求的线组 (None = 不限)
    pub curve_id: String,            // 学习曲线引用
    pub quantity: i64,               // 总件数 (尺码明细之和)
    pub size_qtys: Vec<SizeQuantity>, // 尺码明细
    pub ship_date: NaiveDate,        // 要求船期
    pub status: OrderStatus,         // 订单状态
    pub assigned_line: Option<String>, // 已分配产线 (排产后填充)
    pub created_at: DateTime<Utc>,   // 创建时间
    pub updated_at: DateTime<Utc>,   // 更新时间
}

impl Order {
    /// 按尺码明细计算总件数
    ///
    /// 明细为空时直接使用 quantity 字段（允许只维护总量的订单）。
    pub fn total_quantity(&self) -> i64 {
        if self.size_qtys.is_empty() {
            self.quantity
        } else {
            self.size_qtys.iter().map(|s| s.qty).sum()
        }
    }

    /// 校验订单是否满足排产前置条件
    ///
    /// # 返回
    /// - Ok(()): 可进入排产
    /// - Err(reason): 不可排产的显式原因
    pub fn validate_for_scheduling(&self) -> Result<(), String> {
        if self.status != OrderStatus::Unscheduled {
            return Err(format!(
                "订单状态不是 UNSCHEDULED: order_id={}, status={}",
                self.order_id, self.status
            ));
        }
        let total = self.total_quantity();
        if total <= 0 {
            return Err(format!(
                "订单总件数必须大于 0: order_id={}, quantity={}",
                self.order_id, total
            ));
        }
        if !self.size_qtys.is_empty() && self.size_qtys.iter().any(|s| s.qty < 0) {
            return Err(format!("尺码明细存在负数件数: order_id={}", self.order_id));
        }
        if !self.size_qtys.is_empty() && total != self.quantity {
            return Err(format!(
                "订单总件数与尺码明细不一致: order_id={}, quantity={}, 明细合计={}",
                self.order_id, self.quantity, total
            ));
        }
        Ok(())
    }

    /// 判断是否已有排产承诺
    pub fn is_scheduled(&self) -> bool {
        self.status == OrderStatus::Scheduled
            || self.status == OrderStatus::InProgress
            || self.status == OrderStatus::Completed
    }
}
