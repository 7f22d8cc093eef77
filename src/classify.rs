use std::f64::consts::PI;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrigKind {
    Sine,
    Cosine,
    /// tan / cot: period π.
    Tangent,
    /// More than one of sin, cos, sec, csc.
    Mixed,
}

/// Coarse syntactic family of an expression. A guess, never a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FunctionCategory {
    Linear,
    Quadratic,
    Power(u32),
    Trigonometric(TrigKind),
    Exponential,
    Logarithmic,
    Rational,
    Algebraic,
}

impl FunctionCategory {
    /// Fundamental period of the trigonometric families.
    pub fn period(&self) -> Option<f64> {
        match self {
            FunctionCategory::Trigonometric(TrigKind::Tangent) => Some(PI),
            FunctionCategory::Trigonometric(_) => Some(2.0 * PI),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FunctionCategory::Linear => write!(f, "linear"),
            FunctionCategory::Quadratic => write!(f, "quadratic (parabola)"),
            FunctionCategory::Power(3) => write!(f, "cubic"),
            FunctionCategory::Power(n) => write!(f, "power (degree {n})"),
            FunctionCategory::Trigonometric(TrigKind::Sine) => write!(f, "trigonometric (sine)"),
            FunctionCategory::Trigonometric(TrigKind::Cosine) => write!(f, "trigonometric (cosine)"),
            FunctionCategory::Trigonometric(TrigKind::Tangent) => write!(f, "trigonometric (tangent)"),
            FunctionCategory::Trigonometric(TrigKind::Mixed) => write!(f, "trigonometric"),
            FunctionCategory::Exponential => write!(f, "exponential"),
            FunctionCategory::Logarithmic => write!(f, "logarithmic"),
            FunctionCategory::Rational => write!(f, "rational"),
            FunctionCategory::Algebraic => write!(f, "algebraic"),
        }
    }
}

// =============================================================================
// MATCHER TABLE
// =============================================================================
// Rows are tried top to bottom and the first hit wins. Several rows can match
// the same text (`sin(x^2)` is both quadratic and trigonometric), so this
// order is part of the classifier's behavior.
type Resolver = fn(&str) -> FunctionCategory;

struct Matcher {
    pattern: Regex,
    resolve: Resolver,
}

fn matcher(pattern: &str, resolve: Resolver) -> Matcher {
    Matcher {
        pattern: Regex::new(pattern).unwrap(),
        resolve,
    }
}

// Fractional exponents are captured too so that `x^2.5` is not read as `x^2`.
static POWER_EXPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"x\^\(?(\d+(?:\.\d+)?)").unwrap());

static MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        matcher(r"x\^\(?2\)?([^0-9.]|$)", |_| FunctionCategory::Quadratic),
        matcher(r"x\^\(?\d+", power_degree),
        matcher(r"(sin|cos|tan|cot|sec|csc)\(", trig_kind),
        matcher(r"(^|[^0-9.])1/|/x|/\([^()]*x", |_| FunctionCategory::Rational),
        matcher(r"exp\(|(^|[^a-z])e\^|\^\(?-?[0-9.]*\*?x", |_| FunctionCategory::Exponential),
        matcher(r"(log|ln|lg)\(", |_| FunctionCategory::Logarithmic),
        matcher(
            r"^[+-]?(\d+(\.\d+)?\*?)?x(/\d+(\.\d+)?)?([+-]\d+(\.\d+)?)?$|^[+-]?\d+(\.\d+)?[+-](\d+(\.\d+)?\*?)?x$",
            |_| FunctionCategory::Linear,
        ),
    ]
});

fn power_degree(text: &str) -> FunctionCategory {
    POWER_EXPONENT
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .map_or(FunctionCategory::Algebraic, |n| match n {
            1 => FunctionCategory::Linear,
            2 => FunctionCategory::Quadratic,
            n => FunctionCategory::Power(n),
        })
}

fn trig_kind(text: &str) -> FunctionCategory {
    let has = |name: &str| text.contains(&format!("{name}("));
    let kind = if has("tan") || has("cot") {
        TrigKind::Tangent
    } else {
        match (has("sin") || has("csc"), has("cos") || has("sec")) {
            (true, false) if !has("csc") => TrigKind::Sine,
            (false, true) if !has("sec") => TrigKind::Cosine,
            _ => TrigKind::Mixed,
        }
    };
    FunctionCategory::Trigonometric(kind)
}

/// Lower-cases and strips whitespace so patterns see one spelling.
pub fn canonical_text(expr: &str) -> String {
    expr.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|c| if c == '²' { '2' } else { c })
        .collect::<String>()
        .replace("**", "^")
}

/// Assigns the first category of the matcher table whose pattern occurs in
/// `expr`; `Algebraic` when none does.
pub fn classify(expr: &str) -> FunctionCategory {
    let text = canonical_text(expr);
    MATCHERS
        .iter()
        .find(|m| m.pattern.is_match(&text))
        .map_or(FunctionCategory::Algebraic, |m| (m.resolve)(&text))
}
