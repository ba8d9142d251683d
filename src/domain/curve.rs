// ==========================================
// 服装生产排产系统 - 学习曲线领域模型
// ==========================================
// 红线: 曲线点 day 严格递增且唯一, 效率 0-200
// 用途: 新款式上线后操作工效率爬坡建模
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CurvePoint - 学习曲线拐点
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub day: u32,            // 生产日序号 (>= 1)
    pub efficiency_pct: f64, // 效率百分比 (0-200)
}

// ==========================================
// LearningCurve - 学习曲线
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCurve {
    pub curve_id: String,             // 曲线ID
    pub curve_name: String,           // 曲线名称
    pub points: Vec<CurvePoint>,      // 拐点列表 (day 严格递增)
    pub smv_minutes: f64,             // 标准工时 SMV (分钟/件)
    pub working_minutes_per_day: f64, // 每日工作分钟数
    pub operators: u32,               // 默认操作工人数
}

impl LearningCurve {
    /// 构造并校验学习曲线
    ///
    /// # 校验规则
    /// - 至少一个拐点
    /// - day >= 1, 严格递增且唯一
    /// - 效率在 0-200 之间
    /// - SMV 与每日工作分钟数大于 0
    ///
    /// # 返回
    /// - Ok(LearningCurve): 合法曲线
    /// - Err(reason): 校验失败的显式原因
    pub fn new(
        curve_id: impl Into<String>,
        curve_name: impl Into<String>,
        points: Vec<CurvePoint>,
        smv_minutes: f64,
        working_minutes_per_day: f64,
        operators: u32,
    ) -> Result<Self, String> {
        let curve = Self {
            curve_id: curve_id.into(),
            curve_name: curve_name.into(),
            points,
            smv_minutes,
            working_minutes_per_day,
            operators,
        };
        curve.validate()?;
        Ok(curve)
    }

    /// 校验曲线结构
    pub fn validate(&self) -> Result<(), String> {
        if self.points.is_empty() {
            return Err(format!("学习曲线至少需要一个拐点: curve_id={}", self.curve_id));
        }
        let mut prev_day: Option<u32> = None;
        for p in &self.points {
            if p.day < 1 {
                return Err(format!(
                    "拐点 day 必须 >= 1: curve_id={}, day={}",
                    self.curve_id, p.day
                ));
            }
            if let Some(prev) = prev_day {
                if p.day <= prev {
                    return Err(format!(
                        "拐点 day 必须严格递增且唯一: curve_id={}, day={} 出现在 day={} 之后",
                        self.curve_id, p.day, prev
                    ));
                }
            }
            if !(0.0..=200.0).contains(&p.efficiency_pct) || !p.efficiency_pct.is_finite() {
                return Err(format!(
                    "拐点效率必须在 0-200 之间: curve_id={}, day={}, efficiency={}",
                    self.curve_id, p.day, p.efficiency_pct
                ));
            }
            prev_day = Some(p.day);
        }
        if self.smv_minutes <= 0.0 || !self.smv_minutes.is_finite() {
            return Err(format!(
                "SMV 必须大于 0: curve_id={}, smv={}",
                self.curve_id, self.smv_minutes
            ));
        }
        if self.working_minutes_per_day <= 0.0 || !self.working_minutes_per_day.is_finite() {
            return Err(format!(
                "每日工作分钟数必须大于 0: curve_id={}, minutes={}",
                self.curve_id, self.working_minutes_per_day
            ));
        }
        Ok(())
    }
}
