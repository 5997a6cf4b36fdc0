//! Data Sanitization
//!
//! Probability validation and numerical drift handling.
//!
//! Functions:
//! - Calibration value validation (open unit interval)
//! - Mastery value validation (closed unit interval)
//! - Drift clamping for computed probabilities

use crate::error::{BktError, BktResult};
use crate::types::EPSILON;

/// 检查数值是否为有限值 (非 NaN / Inf)
pub fn is_finite_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// 校验校准参数必须位于开区间 (0, 1)
pub fn require_open_unit(name: &'static str, value: f64) -> BktResult<f64> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(BktError::InvalidParameter { name, value })
    }
}

/// 校验掌握度必须位于闭区间 [0, 1]
pub fn require_mastery(value: f64) -> BktResult<f64> {
    if is_finite_probability(value) {
        Ok(value)
    } else {
        Err(BktError::InvalidState { value })
    }
}

/// 将计算结果限制在 [0, 1]，吸收浮点漂移
///
/// Only meant for rounding residue; a NaN here is a programming error and
/// collapses to 0.
pub fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// 判断两个概率在数值上是否相等
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_open_unit_accepts_interior() {
        assert_eq!(require_open_unit("learn_rate", 0.3), Ok(0.3));
        assert!(require_open_unit("learn_rate", 1e-9).is_ok());
        assert!(require_open_unit("learn_rate", 1.0 - 1e-9).is_ok());
    }

    #[test]
    fn test_require_open_unit_rejects_bounds() {
        assert_eq!(
            require_open_unit("learn_rate", 0.0),
            Err(BktError::InvalidParameter {
                name: "learn_rate",
                value: 0.0
            })
        );
        assert!(require_open_unit("slip_rate", 1.0).is_err());
        assert!(require_open_unit("slip_rate", -0.2).is_err());
        assert!(require_open_unit("slip_rate", f64::NAN).is_err());
        assert!(require_open_unit("slip_rate", f64::INFINITY).is_err());
    }

    #[test]
    fn test_require_mastery_accepts_closed_bounds() {
        assert_eq!(require_mastery(0.0), Ok(0.0));
        assert_eq!(require_mastery(1.0), Ok(1.0));
    }

    #[test]
    fn test_require_mastery_rejects_outside() {
        assert!(matches!(
            require_mastery(1.0001),
            Err(BktError::InvalidState { .. })
        ));
        assert!(require_mastery(-0.01).is_err());
        assert!(require_mastery(f64::NAN).is_err());
    }

    #[test]
    fn test_clamp_probability_absorbs_drift() {
        assert_eq!(clamp_probability(1.0 + 1e-15), 1.0);
        assert_eq!(clamp_probability(-1e-15), 0.0);
        assert_eq!(clamp_probability(0.42), 0.42);
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(0.1 + 0.2, 0.3));
        assert!(!approx_eq(0.1, 0.2));
    }
}
