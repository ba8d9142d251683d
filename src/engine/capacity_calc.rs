// ==========================================
// 服装生产排产系统 - 日产能计算引擎
// ==========================================
// 职责: 人数/工时/效率/SAM -> 整数日产能
// 公式: floor(operators * working_hours * 60 * (efficiency/100) / sam_minutes)
// ==========================================

use crate::domain::capacity::LineCapacityRule;
use crate::engine::error::ScheduleError;

// ==========================================
// CapacityCalculator - 日产能计算引擎
// ==========================================
pub struct CapacityCalculator {
    // 无状态引擎,不需要注入依赖
}

impl Default for CapacityCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl CapacityCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算单日产能 (件)
    ///
    /// # 参数
    /// - `operators`: 操作工人数 (>= 1)
    /// - `working_hours`: 每日工作小时 (> 0)
    /// - `efficiency_pct`: 效率百分比 (0-200)
    /// - `sam_minutes`: SAM 标准工时 (分钟/件, > 0)
    ///
    /// # 返回
    /// - Ok(i64): 向下取整后的日产能
    /// - Err(InvalidSam): sam_minutes <= 0
    /// - Err(Validation): 其余入参越界
    pub fn daily_capacity(
        &self,
        operators: u32,
        working_hours: f64,
        efficiency_pct: f64,
        sam_minutes: f64,
    ) -> Result<i64, ScheduleError> {
        if sam_minutes <= 0.0 || !sam_minutes.is_finite() {
            return Err(ScheduleError::InvalidSam { sam_minutes });
        }
        if operators < 1 {
            return Err(ScheduleError::Validation(format!(
                "操作工人数必须 >= 1: operators={}",
                operators
            )));
        }
        if working_hours <= 0.0 || !working_hours.is_finite() {
            return Err(ScheduleError::Validation(format!(
                "每日工作小时必须大于 0: working_hours={}",
                working_hours
            )));
        }
        if !(0.0..=200.0).contains(&efficiency_pct) || !efficiency_pct.is_finite() {
            return Err(ScheduleError::Validation(format!(
                "效率百分比必须在 0-200 之间: efficiency_pct={}",
                efficiency_pct
            )));
        }

        let pieces =
            (operators as f64) * working_hours * 60.0 * (efficiency_pct / 100.0) / sam_minutes;
        Ok(pieces.floor() as i64)
    }

    /// 按规则与当日效率计算单日产能
    ///
    /// 人数/工时/SAM 取自规则, 效率取自学习曲线当日值。
    pub fn daily_capacity_for_rule(
        &self,
        rule: &LineCapacityRule,
        efficiency_pct: f64,
    ) -> Result<i64, ScheduleError> {
        self.daily_capacity(
            rule.operators,
            rule.working_hours,
            efficiency_pct,
            rule.sam_minutes,
        )
    }

    /// 产线默认产能按效率折算
    ///
    /// 无产能规则时的兜底: floor(default_capacity * efficiency / 100)
    pub fn daily_capacity_for_default(
        &self,
        default_capacity: i64,
        efficiency_pct: f64,
    ) -> Result<i64, ScheduleError> {
        if default_capacity <= 0 {
            return Err(ScheduleError::Validation(format!(
                "产线默认产能必须大于 0: default_capacity={}",
                default_capacity
            )));
        }
        if !(0.0..=200.0).contains(&efficiency_pct) || !efficiency_pct.is_finite() {
            return Err(ScheduleError::Validation(format!(
                "效率百分比必须在 0-200 之间: efficiency_pct={}",
                efficiency_pct
            )));
        }
        Ok(((default_capacity as f64) * efficiency_pct / 100.0).floor() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_capacity_floors() {
        let calc = CapacityCalculator::new();
        // 25 人 * 8 小时 * 60 分 * 85% / 12.5 SAM = 816.0
        assert_eq!(calc.daily_capacity(25, 8.0, 85.0, 12.5).unwrap(), 816);
        // 20 人 * 8 小时 * 60 分 * 50% / 10 SAM = 480.0
        assert_eq!(calc.daily_capacity(20, 8.0, 50.0, 10.0).unwrap(), 480);
        // 非整除场景向下取整
        assert_eq!(calc.daily_capacity(7, 8.0, 73.0, 11.0).unwrap(), 222);
    }

    #[test]
    fn test_invalid_sam_rejected() {
        let calc = CapacityCalculator::new();
        assert!(matches!(
            calc.daily_capacity(25, 8.0, 85.0, 0.0),
            Err(ScheduleError::InvalidSam { .. })
        ));
        assert!(matches!(
            calc.daily_capacity(25, 8.0, 85.0, -1.0),
            Err(ScheduleError::InvalidSam { .. })
        ));
    }

    #[test]
    fn test_input_range_rejected() {
        let calc = CapacityCalculator::new();
        assert!(calc.daily_capacity(0, 8.0, 85.0, 12.5).is_err());
        assert!(calc.daily_capacity(25, 0.0, 85.0, 12.5).is_err());
        assert!(calc.daily_capacity(25, 8.0, 201.0, 12.5).is_err());
        assert!(calc.daily_capacity(25, 8.0, -5.0, 12.5).is_err());
    }
}
