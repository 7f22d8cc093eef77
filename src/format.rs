use std::f64::consts::PI;

use num_rational::Rational64;
use num_traits::{Signed, ToPrimitive};

const ZERO_THRESHOLD: f64 = 1e-9;
const SYMBOLIC_TOLERANCE: f64 = 1e-9;
const MAX_DENOMINATOR: i64 = 12;

/// Plain decimal: rounded to 4 places, trailing zeros trimmed.
pub fn format_val(val: f64) -> String {
    if val.is_infinite() {
        return if val > 0.0 { "+∞".to_string() } else { "-∞".to_string() };
    }
    if val.is_nan() {
        return "undefined".to_string();
    }
    if val.abs() < ZERO_THRESHOLD {
        return "0".to_string();
    }

    let s = format!("{:.4}", val);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Decimal with a symbolic hint when the value is a small fraction or a
/// rational multiple of π: `0.5`, `1/3 ≈ 0.3333`, `π/2 ≈ 1.5708`.
pub fn format_symbolic(val: f64) -> String {
    if !val.is_finite() || val.abs() < ZERO_THRESHOLD {
        return format_val(val);
    }
    let decimal = format_val(val);

    if let Some(ratio) = small_fraction(val) {
        if ratio.is_integer() {
            return ratio.to_integer().to_string();
        }
        let exact = format!("{}/{}", ratio.numer(), ratio.denom());
        return if decimal.len() <= 4 { decimal } else { format!("{exact} ≈ {decimal}") };
    }

    if let Some(turns) = small_fraction(val / PI) {
        return format!("{} ≈ {decimal}", pi_multiple(&turns));
    }

    decimal
}

fn small_fraction(val: f64) -> Option<Rational64> {
    let ratio = Rational64::approximate_float(val)?;
    if ratio.denom().abs() > MAX_DENOMINATOR || ratio.numer().abs() > 1000 {
        return None;
    }
    let back = ratio.to_f64()?;
    ((back - val).abs() < SYMBOLIC_TOLERANCE).then_some(ratio)
}

fn pi_multiple(turns: &Rational64) -> String {
    let sign = if turns.is_negative() { "-" } else { "" };
    let numer = turns.numer().abs();
    let denom = *turns.denom();
    let head = if numer == 1 { "π".to_string() } else { format!("{numer}π") };
    if denom == 1 { format!("{sign}{head}") } else { format!("{sign}{head}/{denom}") }
}

/// `(x, y)` with three decimals, as the intercept is shown.
pub fn format_point(x: f64, y: f64) -> String {
    format!("({}, {:.3})", format_val(x), y + 0.0)
}

pub fn format_list(values: &[f64]) -> String {
    values.iter().map(|v| format_symbolic(*v)).collect::<Vec<_>>().join(", ")
}
