// ==========================================
// 服装生产排产系统 - 学习曲线求值引擎
// ==========================================
// 职责: 阶梯函数式效率查询
// 输入: 学习曲线 + 生产日序号
// 输出: 当日效率百分比
// ==========================================
// 红线: 阶梯 (平台) 策略, 不做线性插值;
//       首点之前取首点效率, 末点之后取末点效率
// ==========================================

use crate::domain::curve::LearningCurve;
use crate::engine::error::ScheduleError;

// ==========================================
// LearningCurveEvaluator - 学习曲线求值引擎
// ==========================================
pub struct LearningCurveEvaluator {
    // 无状态引擎,不需要注入依赖
}

impl Default for LearningCurveEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningCurveEvaluator {
    pub fn new() -> Self {
        Self {}
    }

    /// 查询某生产日的效率百分比
    ///
    /// 取 day <= day_index 的最后一个拐点的效率:
    /// - day_index 先于首点: 取首点效率 (不做负向外推)
    /// - day_index 晚于末点: 维持末点效率 (平台)
    ///
    /// # 参数
    /// - `curve`: 学习曲线
    /// - `day_index`: 生产日序号 (从 1 开始, 只数实际生产日)
    ///
    /// # 返回
    /// - Ok(f64): 效率百分比 (0-200)
    /// - Err(InvalidCurve): 曲线为空或拐点非严格递增
    pub fn efficiency_on_day(
        &self,
        curve: &LearningCurve,
        day_index: u32,
    ) -> Result<f64, ScheduleError> {
        curve.validate().map_err(|reason| ScheduleError::InvalidCurve {
            curve_id: curve.curve_id.clone(),
            reason,
        })?;

        let mut efficiency = curve.points[0].efficiency_pct;
        for point in &curve.points {
            if point.day <= day_index {
                efficiency = point.efficiency_pct;
            } else {
                break;
            }
        }
        Ok(efficiency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::curve::CurvePoint;

    fn curve(pts: &[(u32, f64)]) -> LearningCurve {
        LearningCurve {
            curve_id: "C1".to_string(),
            curve_name: "测试曲线".to_string(),
            points: pts
                .iter()
                .map(|&(day, efficiency_pct)| CurvePoint { day, efficiency_pct })
                .collect(),
            smv_minutes: 10.0,
            working_minutes_per_day: 480.0,
            operators: 20,
        }
    }

    #[test]
    fn test_step_function_lookup() {
        let evaluator = LearningCurveEvaluator::new();
        let c = curve(&[(1, 50.0), (5, 75.0), (10, 100.0)]);

        assert_eq!(evaluator.efficiency_on_day(&c, 1).unwrap(), 50.0);
        assert_eq!(evaluator.efficiency_on_day(&c, 3).unwrap(), 50.0);
        assert_eq!(evaluator.efficiency_on_day(&c, 5).unwrap(), 75.0);
        assert_eq!(evaluator.efficiency_on_day(&c, 7).unwrap(), 75.0);
        assert_eq!(evaluator.efficiency_on_day(&c, 12).unwrap(), 100.0);
    }

    #[test]
    fn test_before_first_point_plateaus() {
        let evaluator = LearningCurveEvaluator::new();
        let c = curve(&[(3, 60.0), (8, 90.0)]);

        // 首点之前不做负向外推
        assert_eq!(evaluator.efficiency_on_day(&c, 1).unwrap(), 60.0);
        assert_eq!(evaluator.efficiency_on_day(&c, 2).unwrap(), 60.0);
    }

    #[test]
    fn test_invalid_curve_rejected() {
        let evaluator = LearningCurveEvaluator::new();

        let empty = curve(&[]);
        assert!(matches!(
            evaluator.efficiency_on_day(&empty, 1),
            Err(ScheduleError::InvalidCurve { .. })
        ));

        let unordered = curve(&[(5, 50.0), (3, 60.0)]);
        assert!(matches!(
            evaluator.efficiency_on_day(&unordered, 1),
            Err(ScheduleError::InvalidCurve { .. })
        ));
    }
}
