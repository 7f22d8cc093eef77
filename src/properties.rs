use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::{canonical_text, classify, FunctionCategory};
use crate::config::AnalysisConfig;
use crate::critical::{critical_points, CriticalPoint};
use crate::derivative::{derivative, SymbolicDifferentiator};
use crate::error::Result;
use crate::evaluator::{compile, CompiledFunction, RealFunction};
use crate::format::{format_list, format_point, format_symbolic, format_val};
use crate::roots::find_zeros;

// =============================================================================
// RECORDS
// =============================================================================

/// Which property a record describes. Records are always emitted in the
/// order of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PropertyKind {
    Category,
    Domain,
    Zeros,
    YIntercept,
    Parity,
    Boundedness,
    Monotonicity,
    Convexity,
    Periodicity,
    VerticalAsymptote,
    Derivative,
    Extrema,
    Asymptotics,
}

impl PropertyKind {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyKind::Category => "Function type",
            PropertyKind::Domain => "Domain",
            PropertyKind::Zeros => "Zeros",
            PropertyKind::YIntercept => "Y-intercept",
            PropertyKind::Parity => "Parity",
            PropertyKind::Boundedness => "Boundedness",
            PropertyKind::Monotonicity => "Monotonicity",
            PropertyKind::Convexity => "Convexity",
            PropertyKind::Periodicity => "Period",
            PropertyKind::VerticalAsymptote => "Vertical asymptote",
            PropertyKind::Derivative => "Derivative",
            PropertyKind::Extrema => "Extrema",
            PropertyKind::Asymptotics => "Behavior as x → ±∞",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub kind: PropertyKind,
    pub name: String,
    pub value: String,
    pub description: String,
}

impl PropertyRecord {
    fn new(kind: PropertyKind, value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.label().to_string(),
            value: value.into(),
            description: description.into(),
        }
    }
}

// =============================================================================
// DOMAIN (SYNTACTIC ESTIMATE)
// =============================================================================

/// Domain guessed from the text alone. It is not checked against evaluation,
/// so `1/(x-1)` still reads as `x ≠ 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DomainEstimate {
    AllReals,
    NonZero,
    Positive,
    NonNegative,
    TangentPoles,
}

impl fmt::Display for DomainEstimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DomainEstimate::AllReals => write!(f, "(-∞, +∞)"),
            DomainEstimate::NonZero => write!(f, "x ≠ 0: (-∞, 0) ∪ (0, +∞)"),
            DomainEstimate::Positive => write!(f, "x > 0: (0, +∞)"),
            DomainEstimate::NonNegative => write!(f, "x ≥ 0: [0, +∞)"),
            DomainEstimate::TangentPoles => write!(f, "x ≠ π/2 + kπ"),
        }
    }
}

pub fn detect_domain(expr: &str) -> DomainEstimate {
    let text = canonical_text(expr);
    let divides_by_x = text.contains("/x")
        || text
            .split("/(")
            .skip(1)
            .any(|rest| rest.split(')').next().is_some_and(|inner| inner.contains('x')));

    if divides_by_x {
        DomainEstimate::NonZero
    } else if text.contains("log") || text.contains("ln") || text.contains("lg(") {
        DomainEstimate::Positive
    } else if text.contains("sqrt") {
        DomainEstimate::NonNegative
    } else if text.contains("tan(") {
        DomainEstimate::TangentPoles
    } else {
        DomainEstimate::AllReals
    }
}

// =============================================================================
// SYMMETRY AND SHAPE
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Parity {
    Even,
    Odd,
    Neither,
    Undetermined,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
            Parity::Neither => write!(f, "neither even nor odd"),
            Parity::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Compares `f(1)` with `f(-1)`.
pub fn check_parity<F: RealFunction + ?Sized>(f: &F, tolerance: f64) -> Parity {
    match (f.eval(1.0), f.eval(-1.0)) {
        (Some(right), Some(left)) if (right - left).abs() < tolerance => Parity::Even,
        (Some(right), Some(left)) if (right + left).abs() < tolerance => Parity::Odd,
        (Some(_), Some(_)) => Parity::Neither,
        _ => Parity::Undetermined,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Boundedness {
    Bounded,
    Unbounded,
    Undetermined,
}

impl fmt::Display for Boundedness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Boundedness::Bounded => write!(f, "bounded"),
            Boundedness::Unbounded => write!(f, "unbounded"),
            Boundedness::Undetermined => write!(f, "undetermined"),
        }
    }
}

pub fn check_boundedness<F: RealFunction + ?Sized>(f: &F, points: &[f64], limit: f64) -> Boundedness {
    let largest = points
        .iter()
        .filter_map(|&x| f.eval(x))
        .map(f64::abs)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

    match largest {
        Some(v) if v < limit => Boundedness::Bounded,
        Some(_) => Boundedness::Unbounded,
        None => Boundedness::Undetermined,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Monotonicity {
    Increasing,
    Decreasing,
    Constant,
    NonMonotonic,
    Undetermined,
}

impl fmt::Display for Monotonicity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Monotonicity::Increasing => write!(f, "increasing"),
            Monotonicity::Decreasing => write!(f, "decreasing"),
            Monotonicity::Constant => write!(f, "constant"),
            Monotonicity::NonMonotonic => write!(f, "non-monotonic"),
            Monotonicity::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Counts rising and falling steps between consecutive sample points; one
/// direction wins when it has at least twice as many steps as the other.
pub fn check_monotonicity<F: RealFunction + ?Sized>(f: &F, points: &[f64]) -> Monotonicity {
    let values: Vec<Option<f64>> = points.iter().map(|&x| f.eval(x)).collect();
    let (mut rising, mut falling, mut compared) = (0usize, 0usize, 0usize);

    for w in values.windows(2) {
        if let (Some(a), Some(b)) = (w[0], w[1]) {
            compared += 1;
            if b > a {
                rising += 1;
            } else if b < a {
                falling += 1;
            }
        }
    }

    match (rising, falling) {
        _ if compared == 0 => Monotonicity::Undetermined,
        (0, 0) => Monotonicity::Constant,
        (r, d) if r >= 2 * d => Monotonicity::Increasing,
        (r, d) if d >= 2 * r => Monotonicity::Decreasing,
        _ => Monotonicity::NonMonotonic,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Convexity {
    Convex,
    Concave,
    Linear,
    Changes,
    Undetermined,
}

impl fmt::Display for Convexity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Convexity::Convex => write!(f, "convex (concave up)"),
            Convexity::Concave => write!(f, "concave (concave down)"),
            Convexity::Linear => write!(f, "linear (no curvature)"),
            Convexity::Changes => write!(f, "changes convexity"),
            Convexity::Undetermined => write!(f, "undetermined"),
        }
    }
}

const CURVATURE_EPSILON: f64 = 1e-6;

/// Signs of the second differences `f(a) - 2f(b) + f(c)` over consecutive
/// triples of an evenly spaced grid.
pub fn check_convexity<F: RealFunction + ?Sized>(f: &F, points: &[f64]) -> Convexity {
    let values: Vec<Option<f64>> = points.iter().map(|&x| f.eval(x)).collect();
    let seconds: Vec<f64> = values
        .windows(3)
        .filter_map(|w| Some(w[0]? - 2.0 * w[1]? + w[2]?))
        .collect();

    if seconds.is_empty() {
        Convexity::Undetermined
    } else if seconds.iter().all(|&d| d > CURVATURE_EPSILON) {
        Convexity::Convex
    } else if seconds.iter().all(|&d| d < -CURVATURE_EPSILON) {
        Convexity::Concave
    } else if seconds.iter().all(|&d| d.abs() <= CURVATURE_EPSILON) {
        Convexity::Linear
    } else {
        Convexity::Changes
    }
}

// =============================================================================
// BEHAVIOR AT INFINITY
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Trend {
    PlusInfinity,
    MinusInfinity,
    /// Bounded and settling on this value.
    Limit(f64),
    Bounded,
    Undefined,
}

impl Trend {
    fn grows(&self) -> bool {
        matches!(self, Trend::PlusInfinity | Trend::MinusInfinity)
    }

    fn describe(&self, side: &str) -> String {
        match self {
            Trend::PlusInfinity => format!("f → +∞ as x → {side}"),
            Trend::MinusInfinity => format!("f → -∞ as x → {side}"),
            Trend::Limit(l) => format!("f → {} as x → {side}", format_val(*l)),
            Trend::Bounded => format!("bounded as x → {side}"),
            Trend::Undefined => format!("undefined as x → {side}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AsymptoticBehavior {
    pub positive: Trend,
    pub negative: Trend,
}

impl fmt::Display for AsymptoticBehavior {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sides = format!("{}; {}", self.positive.describe("+∞"), self.negative.describe("-∞"));
        match (self.positive, self.negative) {
            (p, n) if p.grows() || n.grows() => write!(f, "unbounded growth ({sides})"),
            (Trend::Undefined, Trend::Undefined) => write!(f, "undetermined"),
            (Trend::Limit(a), Trend::Limit(b)) if (a - b).abs() < LIMIT_SPREAD => {
                write!(f, "bounded behavior, horizontal asymptote y = {}", format_val((a + b) / 2.0))
            }
            (Trend::Bounded, Trend::Bounded) => write!(f, "bounded behavior"),
            _ => write!(f, "bounded behavior ({sides})"),
        }
    }
}

const LIMIT_SPREAD: f64 = 0.01;

/// Follows `f` along `±10², …, ±10⁶` and returns the value the tail settles
/// on, if it does.
pub fn analyze_limit<F: RealFunction + ?Sized>(f: &F, direction: f64) -> Option<f64> {
    let vals: Vec<f64> = (2..=6)
        .map(|k| direction.signum() * 10f64.powi(k))
        .filter_map(|x| f.eval(x))
        .collect();

    if vals.len() < 3 {
        return None;
    }
    let tail = &vals[vals.len() - 3..];
    let lo = tail.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    ((hi - lo).abs() < LIMIT_SPREAD).then_some((lo + hi) / 2.0)
}

fn trend_at<F: RealFunction + ?Sized>(f: &F, x: f64, threshold: f64) -> Trend {
    match f.eval(x) {
        None => Trend::Undefined,
        Some(v) if v > threshold => Trend::PlusInfinity,
        Some(v) if v < -threshold => Trend::MinusInfinity,
        Some(_) => analyze_limit(f, x).map_or(Trend::Bounded, Trend::Limit),
    }
}

/// `|f(±probe)| > threshold` is read as growth toward that sign.
pub fn asymptotic_behavior<F: RealFunction + ?Sized>(f: &F, probe: f64, threshold: f64) -> AsymptoticBehavior {
    AsymptoticBehavior {
        positive: trend_at(f, probe, threshold),
        negative: trend_at(f, -probe, threshold),
    }
}

// =============================================================================
// AGGREGATOR
// =============================================================================

/// Runs the full property pipeline with a fixed configuration.
#[derive(Default)]
pub struct Analyzer {
    config: AnalysisConfig,
    differentiator: Option<Box<dyn SymbolicDifferentiator>>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            differentiator: None,
        }
    }

    pub fn with_differentiator(mut self, differentiator: impl SymbolicDifferentiator + 'static) -> Self {
        self.differentiator = Some(Box::new(differentiator));
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Compiles `expr` and computes every property. Fails only when the
    /// expression cannot be compiled.
    pub fn analyze(&self, expr: &str) -> Result<Vec<PropertyRecord>> {
        let f = compile(expr)?;
        Ok(self.analyze_compiled(&f))
    }

    pub fn analyze_compiled(&self, f: &CompiledFunction) -> Vec<PropertyRecord> {
        let cfg = &self.config;
        let expr = f.source();
        let mut records = Vec::with_capacity(13);

        let category = classify(expr);
        debug!(expr, %category, "classified");
        records.push(PropertyRecord::new(PropertyKind::Category, category.to_string(), "Classification by form"));

        records.push(PropertyRecord::new(
            PropertyKind::Domain,
            detect_domain(expr).to_string(),
            "Admissible x values (syntactic estimate)",
        ));

        let zeros = find_zeros(f, &cfg.zeros);
        debug!(count = zeros.len(), "zeros");
        records.push(PropertyRecord::new(
            PropertyKind::Zeros,
            if zeros.is_empty() { "no real zeros".to_string() } else { format_list(&zeros) },
            format!(
                "Crossings of the x-axis on [{}, {}]",
                format_val(cfg.zeros.lower),
                format_val(cfg.zeros.upper)
            ),
        ));

        match f.evaluate(0.0) {
            Some(y) => records.push(PropertyRecord::new(
                PropertyKind::YIntercept,
                format_point(0.0, y),
                "Value at x = 0",
            )),
            None => debug!("no y-intercept"),
        }

        let parity = check_parity(f, cfg.parity_tolerance);
        if parity == Parity::Undetermined {
            warn!(expr, "parity undetermined: f(1) or f(-1) undefined");
        }
        records.push(PropertyRecord::new(PropertyKind::Parity, parity.to_string(), "Symmetry of the graph"));

        records.push(PropertyRecord::new(
            PropertyKind::Boundedness,
            check_boundedness(f, &cfg.bound_points, cfg.bound_limit).to_string(),
            format!("|f(x)| < {} at the sample points", format_val(cfg.bound_limit)),
        ));

        records.push(PropertyRecord::new(
            PropertyKind::Monotonicity,
            check_monotonicity(f, &cfg.monotonic_points).to_string(),
            "Direction of change between sample points",
        ));

        records.push(PropertyRecord::new(
            PropertyKind::Convexity,
            check_convexity(f, &cfg.convexity_points).to_string(),
            "Sign of the second differences",
        ));

        self.push_category_extras(f, category, &mut records);

        records.push(PropertyRecord::new(
            PropertyKind::Asymptotics,
            asymptotic_behavior(f, cfg.asymptote_probe, cfg.growth_threshold).to_string(),
            format!("Values at x = ±{}", format_val(cfg.asymptote_probe)),
        ));

        records
    }

    fn push_category_extras(&self, f: &CompiledFunction, category: FunctionCategory, records: &mut Vec<PropertyRecord>) {
        let cfg = &self.config;

        if let Some(period) = category.period() {
            records.push(PropertyRecord::new(
                PropertyKind::Periodicity,
                format_symbolic(period),
                "Smallest period of the trigonometric part",
            ));
        }

        if category == FunctionCategory::Rational {
            records.push(PropertyRecord::new(
                PropertyKind::VerticalAsymptote,
                "x = 0",
                "Suggested by the division in the expression",
            ));
        }

        let df = derivative(f, cfg.derivative_step, self.differentiator.as_deref());
        if let Some(text) = df.expression() {
            records.push(PropertyRecord::new(
                PropertyKind::Derivative,
                format!("f'(x) = {text}"),
                "Symbolic derivative",
            ));
        }

        let points = critical_points(f, &df, &cfg.critical, cfg.classify_probe);
        debug!(count = points.len(), symbolic = df.is_symbolic(), "critical points");
        let value = if points.is_empty() {
            format!(
                "no critical points in [{}, {}]",
                format_val(cfg.critical.lower),
                format_val(cfg.critical.upper)
            )
        } else {
            points.iter().map(describe_critical).collect::<Vec<_>>().join("; ")
        };
        records.push(PropertyRecord::new(
            PropertyKind::Extrema,
            value,
            format!(
                "Zeros of f' on [{}, {}] and the sign of f' around them",
                format_val(cfg.critical.lower),
                format_val(cfg.critical.upper)
            ),
        ));
    }
}

fn describe_critical(point: &CriticalPoint) -> String {
    match point.value {
        Some(y) => format!("{} at {}", point.kind, format_point(point.x, y)),
        None => format!("{} at x = {}", point.kind, format_val(point.x)),
    }
}

/// Analyzes `expr` with the default configuration and no symbolic backend.
pub fn analyze(expr: &str) -> Result<Vec<PropertyRecord>> {
    Analyzer::default().analyze(expr)
}
