use std::fmt;

use serde::Serialize;

use crate::evaluator::RealFunction;
use crate::roots::{find_zeros, ScanSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CriticalKind {
    Maximum,
    Minimum,
    InflectionOrUnknown,
}

impl fmt::Display for CriticalKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CriticalKind::Maximum => write!(f, "local maximum"),
            CriticalKind::Minimum => write!(f, "local minimum"),
            CriticalKind::InflectionOrUnknown => write!(f, "inflection or undetermined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalPoint {
    pub x: f64,
    pub kind: CriticalKind,
    /// `f(x)`, when defined.
    pub value: Option<f64>,
}

/// Zeros of the derivative, found with the same scan as ordinary zeros.
pub fn find_critical_points<D>(df: &D, settings: &ScanSettings) -> Vec<f64>
where
    D: RealFunction + ?Sized,
{
    find_zeros(df, settings)
}

/// Reads the sign of `df` just left and right of `point`.
pub fn classify_point<D>(df: &D, point: f64, probe: f64) -> CriticalKind
where
    D: RealFunction + ?Sized,
{
    match (df.eval(point - probe), df.eval(point + probe)) {
        (Some(left), Some(right)) if left > 0.0 && right < 0.0 => CriticalKind::Maximum,
        (Some(left), Some(right)) if left < 0.0 && right > 0.0 => CriticalKind::Minimum,
        _ => CriticalKind::InflectionOrUnknown,
    }
}

/// Finds and classifies every critical point of `f` in the scan window.
pub fn critical_points<F, D>(f: &F, df: &D, settings: &ScanSettings, probe: f64) -> Vec<CriticalPoint>
where
    F: RealFunction + ?Sized,
    D: RealFunction + ?Sized,
{
    find_critical_points(df, settings)
        .into_iter()
        .map(|x| CriticalPoint {
            x,
            kind: classify_point(df, x, probe),
            value: f.eval(x),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivative::derivative;
    use crate::evaluator::compile;
    use approx::assert_abs_diff_eq;

    fn settings() -> ScanSettings {
        ScanSettings {
            lower: -5.0,
            upper: 5.0,
            step: 0.2,
            merge_distance: 0.1,
            ..ScanSettings::default()
        }
    }

    fn points(expr: &str) -> Vec<CriticalPoint> {
        let f = compile(expr).unwrap();
        let df = derivative(&f, 1e-3, None);
        critical_points(&f, &df, &settings(), 0.1)
    }

    #[test]
    fn test_parabola_minimum() {
        let found = points("x^2 - 4");
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].x, 0.0, epsilon = 1e-3);
        assert_eq!(found[0].kind, CriticalKind::Minimum);
        assert_abs_diff_eq!(found[0].value.unwrap(), -4.0, epsilon = 1e-3);
    }

    #[test]
    fn test_cubic_extrema() {
        // x^3 - 3x: maximum at -1, minimum at 1.
        let found = points("x^3 - 3x");
        assert_eq!(found.len(), 2);
        assert_abs_diff_eq!(found[0].x, -1.0, epsilon = 1e-3);
        assert_eq!(found[0].kind, CriticalKind::Maximum);
        assert_abs_diff_eq!(found[1].x, 1.0, epsilon = 1e-3);
        assert_eq!(found[1].kind, CriticalKind::Minimum);
    }

    #[test]
    fn test_flat_inflection() {
        let found = points("x^3");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, CriticalKind::InflectionOrUnknown);
    }

    #[test]
    fn test_sine_alternates() {
        let found = points("sin(x)");
        let kinds: Vec<CriticalKind> = found.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CriticalKind::Maximum,
                CriticalKind::Minimum,
                CriticalKind::Maximum,
                CriticalKind::Minimum
            ]
        );
        assert_abs_diff_eq!(found[1].x, -std::f64::consts::FRAC_PI_2, epsilon = 1e-3);
    }

    #[test]
    fn test_no_critical_points() {
        assert!(points("2x + 1").is_empty());
        assert!(points("exp(x)").is_empty());
        assert!(points("1/x").is_empty());
    }

    #[test]
    fn test_flat_tails_are_not_critical() {
        // f' is below tolerance on both tails of the bell curve.
        let found = points("exp(-x^2)");
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].x, 0.0, epsilon = 1e-12);
        assert_eq!(found[0].kind, CriticalKind::Maximum);
        assert_abs_diff_eq!(found[0].value.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_classify_point_with_undefined_side() {
        let f = compile("sqrt(x)").unwrap();
        let df = derivative(&f, 1e-3, None);
        assert_eq!(classify_point(&df, 0.0, 0.1), CriticalKind::InflectionOrUnknown);
    }
}
