// ==========================================
// 服装生产排产系统 - 产线与线组领域模型
// ==========================================
// 红线: 一条产线至多属于一个线组
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Line - 缝制产线
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub line_id: String,               // 产线ID
    pub line_code: String,             // 产线代码 (排序/展示用)
    pub line_name: String,             // 产线名称
    pub group_id: Option<String>,      // 所属线组 (至多一个)
    pub default_capacity: Option<i64>, // 默认日产能 (件/日, 无规则时兜底)
}

// ==========================================
// LineGroup - 线组
// ==========================================
// 用途: 订单按线组约束候选产线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineGroup {
    pub group_id: String,       // 线组ID
    pub group_name: String,     // 线组名称
    pub line_ids: Vec<String>,  // 成员产线
}

impl LineGroup {
    /// 判断产线是否属于本组
    pub fn contains(&self, line_id: &str) -> bool {
        self.line_ids.iter().any(|id| id == line_id)
    }
}
