use tracing::debug;

use crate::evaluator::{compile, is_valid, CompiledFunction, RealFunction};

/// A computer-algebra backend able to differentiate expression text.
///
/// Returning `None` (or text that does not compile) makes the caller fall
/// back to the numeric estimate.
pub trait SymbolicDifferentiator: Send + Sync {
    fn differentiate(&self, expression: &str) -> Option<String>;
}

/// `f'` as an evaluable function.
#[derive(Debug, Clone)]
pub enum Derivative<'a> {
    /// Central difference `(f(x+h) - f(x-h)) / 2h`.
    Numeric { function: &'a CompiledFunction, step: f64 },
    Symbolic(CompiledFunction),
}

impl Derivative<'_> {
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Derivative::Symbolic(_))
    }

    /// Text of the symbolic derivative, if one was used.
    pub fn expression(&self) -> Option<&str> {
        match self {
            Derivative::Symbolic(f) => Some(f.source()),
            Derivative::Numeric { .. } => None,
        }
    }
}

impl RealFunction for Derivative<'_> {
    fn eval(&self, x: f64) -> Option<f64> {
        match self {
            Derivative::Numeric { function, step } => central_difference(*function, x, *step),
            Derivative::Symbolic(f) => f.evaluate(x),
        }
    }
}

pub fn central_difference<F>(func: &F, x: f64, h: f64) -> Option<f64>
where
    F: RealFunction + ?Sized,
{
    let f_plus = func.eval(x + h)?;
    let f_minus = func.eval(x - h)?;
    let deriv = (f_plus - f_minus) / (2.0 * h);
    if is_valid(deriv) { Some(deriv) } else { None }
}

/// Builds `f'`, preferring the symbolic backend when one is supplied and
/// its answer parses.
pub fn derivative<'a>(
    function: &'a CompiledFunction,
    step: f64,
    symbolic: Option<&dyn SymbolicDifferentiator>,
) -> Derivative<'a> {
    if let Some(backend) = symbolic {
        match backend.differentiate(function.source()).map(|text| compile(&text)) {
            Some(Ok(compiled)) => {
                debug!(derivative = compiled.source(), "using symbolic derivative");
                return Derivative::Symbolic(compiled);
            }
            Some(Err(err)) => debug!(%err, "symbolic derivative did not compile"),
            None => debug!("no symbolic derivative available"),
        }
    }
    Derivative::Numeric { function, step }
}
