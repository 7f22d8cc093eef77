//! Numeric analysis of single-variable real functions.
//!
//! An expression such as `x^2 - 4` or `3sin(2x)` is compiled once and then
//! examined numerically: zeros by sign-change scanning and bisection,
//! extrema through a central-difference derivative, plus parity,
//! boundedness, monotonicity, convexity and behavior at infinity. A coarse
//! syntactic classifier decides which extra properties apply.
//!
//! ```no_run
//! let records = function_analysis::analyze("x^2 - 4").unwrap();
//! for r in &records {
//!     println!("{}: {}", r.name, r.value);
//! }
//! ```

pub mod classify;
pub mod config;
pub mod critical;
pub mod derivative;
pub mod error;
pub mod evaluator;
pub mod format;
pub mod properties;
pub mod roots;
pub mod session;

#[cfg(test)]
mod proptests;

pub use classify::{classify, FunctionCategory, TrigKind};
pub use config::{AnalysisConfig, PlotConfig};
pub use critical::{classify_point, critical_points, find_critical_points, CriticalKind, CriticalPoint};
pub use derivative::{derivative, Derivative, SymbolicDifferentiator};
pub use error::{AnalysisError, Result};
pub use evaluator::{compile, sample, CompiledFunction, RealFunction, SamplePoint};
pub use properties::{analyze, Analyzer, PropertyKind, PropertyRecord};
pub use roots::{find_zeros, ScanSettings};
pub use session::AnalysisSession;
