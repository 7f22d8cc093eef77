use meval::{Context, Expr};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, Result};

// =============================================================================
// FUNCTION TABLE
// =============================================================================
const VARIABLE: &str = "x";

/// Names with a call syntax. Everything in here is either a meval builtin or
/// registered in `builtin_context`.
const FUNCTIONS: &[&str] = &[
    "asin", "acos", "atan", "sinh", "cosh", "tanh", "sin", "cos", "tan", "cot", "sec", "csc",
    "exp", "log", "lg", "ln", "sqrt", "abs", "floor", "ceil",
];

const CONSTANTS: &[&str] = &["pi", "e"];

thread_local! {
    // meval contexts are not Sync, so every worker thread gets its own table.
    static BUILTINS: Context<'static> = builtin_context();
}

fn builtin_context() -> Context<'static> {
    let mut ctx = Context::new();
    ctx.func("log", f64::log10);
    ctx.func("lg", f64::log10);
    ctx.func("cot", |x: f64| 1.0 / x.tan());
    ctx.func("sec", |x: f64| 1.0 / x.cos());
    ctx.func("csc", |x: f64| 1.0 / x.sin());
    ctx
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Anything that maps a real number to a real number or "undefined".
pub trait RealFunction: Sync {
    fn eval(&self, x: f64) -> Option<f64>;
}

/// A parsed expression in `x`.
///
/// Holds only the token program, so it can be shared across threads and
/// evaluated any number of times.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    source: String,
    normalized: String,
    expr: Expr,
}

impl CompiledFunction {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The text actually handed to the parser, after implicit
    /// multiplication and name splitting.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn evaluate(&self, x: f64) -> Option<f64> {
        let value = BUILTINS
            .with(|ctx| self.expr.eval_with_context(((VARIABLE, x), ctx)))
            .ok()?;
        is_valid(value).then_some(value)
    }
}

impl RealFunction for CompiledFunction {
    fn eval(&self, x: f64) -> Option<f64> {
        self.evaluate(x)
    }
}

pub fn is_valid(val: f64) -> bool {
    val.is_finite()
}

/// Parses `input` into an evaluable function.
///
/// Only blank input or text the parser cannot structure at all is rejected;
/// unknown names and domain problems show up as `None` at evaluation time.
pub fn compile(input: &str) -> Result<CompiledFunction> {
    let source = input.trim();
    if source.is_empty() {
        return Err(AnalysisError::EmptyExpression);
    }

    let normalized = normalize(source);
    if normalized.is_empty() {
        return Err(AnalysisError::EmptyExpression);
    }

    let expr: Expr = normalized.parse().map_err(|e: meval::Error| AnalysisError::Parse {
        expression: source.to_string(),
        message: e.to_string(),
    })?;
    debug!(source, normalized = %normalized, "compiled expression");

    Ok(CompiledFunction {
        source: source.to_string(),
        normalized,
        expr,
    })
}

// =============================================================================
// SAMPLING
// =============================================================================

/// One row of the plot table. `y` is `None` where the graph has a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: Option<f64>,
}

/// Samples `f` at `divisions + 1` evenly spaced points of `[lower, upper]`.
///
/// Values with magnitude at or above `clip` are dropped to `None` so the
/// renderer breaks the line instead of joining across a pole.
pub fn sample<F>(f: &F, lower: f64, upper: f64, divisions: usize, clip: f64) -> Vec<SamplePoint>
where
    F: RealFunction + ?Sized,
{
    if divisions == 0 || !(lower < upper) {
        return Vec::new();
    }
    let step = (upper - lower) / divisions as f64;

    (0..=divisions)
        .into_par_iter()
        .map(|i| {
            let x = lower + i as f64 * step;
            let y = f.eval(x).filter(|y| y.abs() < clip);
            SamplePoint { x, y }
        })
        .collect()
}

// =============================================================================
// NORMALISATION
// =============================================================================
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Name(String),
    Function(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn ends_operand(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Name(_) | Token::RParen)
    }

    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_) | Token::Name(_) | Token::Function(_) | Token::LParen
        )
    }

    fn is_atom(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Name(_))
    }

    fn text(&self) -> String {
        match self {
            Token::Number(s) | Token::Name(s) | Token::Function(s) => s.clone(),
            Token::Op(c) => c.to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

/// Rewrites user notation into plain infix text the parser accepts.
pub fn normalize(input: &str) -> String {
    let tokens = tokenize(input);
    let tokens = apply_bare_functions(tokens);
    let tokens = insert_implicit_multiplication(tokens);
    tokens.iter().map(Token::text).collect()
}

fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            let mut seen_dot = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot)) {
                seen_dot |= chars[i] == '.';
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect::<String>().to_lowercase();
            split_word(&word, &mut tokens);
        } else if c == 'π' {
            tokens.push(Token::Name("pi".to_string()));
            i += 1;
        } else if c == '*' && chars.get(i + 1) == Some(&'*') {
            tokens.push(Token::Op('^'));
            i += 2;
        } else {
            tokens.push(match c {
                '(' | '[' => Token::LParen,
                ')' | ']' => Token::RParen,
                ',' => Token::Comma,
                other => Token::Op(other),
            });
            i += 1;
        }
    }

    tokens
}

/// Splits a run of letters into known names, longest match first.
/// An unrecognised remainder is kept whole and evaluates as undefined.
fn split_word(word: &str, tokens: &mut Vec<Token>) {
    let mut rest = word;
    while !rest.is_empty() {
        let known = FUNCTIONS
            .iter()
            .chain(CONSTANTS)
            .chain(std::iter::once(&VARIABLE))
            .filter(|name| rest.starts_with(**name))
            .max_by_key(|name| name.len());

        match known {
            Some(name) => {
                if FUNCTIONS.contains(name) {
                    tokens.push(Token::Function(name.to_string()));
                } else {
                    tokens.push(Token::Name(name.to_string()));
                }
                rest = &rest[name.len()..];
            }
            None => {
                tokens.push(Token::Name(rest.to_string()));
                return;
            }
        }
    }
}

/// `sinx` → `sin(x)`, `ln2` → `ln(2)`: a function name followed by a single
/// atom takes that atom as its argument. Only one atom is taken, so `sin2x`
/// reads as `sin(2)*x`; write `sin(2x)` for the other meaning.
fn apply_bare_functions(tokens: Vec<Token>) -> Vec<Token> {
    let mut result = Vec::with_capacity(tokens.len() + 4);
    let mut it = tokens.into_iter().peekable();

    while let Some(token) = it.next() {
        let is_function = matches!(token, Token::Function(_));
        result.push(token);
        if is_function && it.peek().is_some_and(Token::is_atom) {
            if let Some(atom) = it.next() {
                result.push(Token::LParen);
                result.push(atom);
                result.push(Token::RParen);
            }
        }
    }

    result
}

fn insert_implicit_multiplication(tokens: Vec<Token>) -> Vec<Token> {
    let mut result: Vec<Token> = Vec::with_capacity(tokens.len() * 3 / 2);
    for token in tokens {
        if let Some(prev) = result.last() {
            if prev.ends_operand() && token.starts_operand() {
                result.push(Token::Op('*'));
            }
        }
        result.push(token);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn eval(expr: &str, x: f64) -> Option<f64> {
        compile(expr).unwrap().evaluate(x)
    }

    #[test]
    fn test_normalize_implicit_multiplication() {
        assert_eq!(normalize("2x"), "2*x");
        assert_eq!(normalize("x2"), "x*2");
        assert_eq!(normalize("2(x+1)"), "2*(x+1)");
        assert_eq!(normalize("(x+1)(x-1)"), "(x+1)*(x-1)");
        assert_eq!(normalize("3sin(x)"), "3*sin(x)");
        assert_eq!(normalize("x sin(x)"), "x*sin(x)");
        assert_eq!(normalize("2 x ^ 2 - 4"), "2*x^2-4");
    }

    #[test]
    fn test_normalize_names() {
        assert_eq!(normalize("xe"), "x*e");
        assert_eq!(normalize("pix"), "pi*x");
        assert_eq!(normalize("exp(x)"), "exp(x)");
        assert_eq!(normalize("sinx"), "sin(x)");
        assert_eq!(normalize("ln2"), "ln(2)");
        assert_eq!(normalize("sin2x"), "sin(2)*x");
        assert_eq!(normalize("SIN(X)"), "sin(x)");
        assert_eq!(normalize("x**3"), "x^3");
        assert_eq!(normalize("2π"), "2*pi");
        assert_eq!(normalize("sec(x)"), "sec(x)");
    }

    #[test]
    fn test_evaluate_basics() {
        assert_abs_diff_eq!(eval("x^2", 3.0).unwrap(), 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eval("2x+1", 2.0).unwrap(), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eval("log(x)", 100.0).unwrap(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("ln(e)", 0.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("sin(pi/2)", 0.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("abs(x)", -4.0).unwrap(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("sqrt(x)", 16.0).unwrap(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("exp(0)", 7.0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_e_inside_function_names_is_not_replaced() {
        // `exp` and `sec` both contain an `e` that must stay part of the name.
        assert_abs_diff_eq!(eval("exp(x)", 1.0).unwrap(), std::f64::consts::E, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("sec(x)", 0.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("e^x", 2.0).unwrap(), std::f64::consts::E.powi(2), epsilon = 1e-9);
    }

    #[test]
    fn test_undefined_instead_of_errors() {
        assert_eq!(eval("1/x", 0.0), None);
        assert_eq!(eval("ln(x)", -1.0), None);
        assert_eq!(eval("ln(x)", 0.0), None);
        assert_eq!(eval("sqrt(x)", -4.0), None);
        assert_eq!(eval("exp(x)", 1000.0), None);
        assert_eq!(eval("y + 1", 1.0), None);
        assert_eq!(eval("foo(x)", 1.0), None);
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(compile("   ").unwrap_err(), AnalysisError::EmptyExpression);
        assert!(matches!(compile("2+"), Err(AnalysisError::Parse { .. })));
        assert!(matches!(compile("(x"), Err(AnalysisError::Parse { .. })));
    }

    #[test]
    fn test_sample_gaps_at_poles() {
        let f = compile("1/x").unwrap();
        let samples = sample(&f, -10.0, 10.0, 100, 1000.0);
        assert_eq!(samples.len(), 101);
        assert_abs_diff_eq!(samples[50].x, 0.0, epsilon = 1e-12);
        assert_eq!(samples[50].y, None);
        assert!(samples[49].y.is_some());
        assert!(samples[51].y.is_some());
        assert!(samples.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_sample_clips_large_values() {
        let f = compile("x^4").unwrap();
        let samples = sample(&f, -10.0, 10.0, 4, 1000.0);
        assert_eq!(samples[0].y, None);
        assert_eq!(samples[2].y, Some(0.0));
    }

    #[test]
    fn test_sample_empty_interval() {
        let f = compile("x").unwrap();
        assert!(sample(&f, 1.0, 1.0, 10, 1000.0).is_empty());
        assert!(sample(&f, -1.0, 1.0, 0, 1000.0).is_empty());
    }
}
