use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::evaluator::{compile, sample, CompiledFunction, SamplePoint};
use crate::properties::{Analyzer, PropertyRecord};

/// Everything the rendering side needs for one expression: the property
/// list and the plot table over `[-range, range]`.
///
/// A session is never updated in place. Each user action builds a new one
/// and the caller drops the old, so the last analysis always wins.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSession {
    pub expression: String,
    pub range: u32,
    pub properties: Vec<PropertyRecord>,
    pub samples: Vec<SamplePoint>,
    #[serde(skip)]
    function: CompiledFunction,
}

impl AnalysisSession {
    /// Analyzes `expr` and samples it for plotting. `range` is clamped to the
    /// configured bounds.
    pub fn start(analyzer: &Analyzer, expr: &str, range: u32) -> Result<Self> {
        let function = compile(expr)?;
        let properties = analyzer.analyze_compiled(&function);
        let range = analyzer.config().plot.clamp_range(range);
        let samples = plot_samples(analyzer, &function, range)?;
        info!(expr = function.source(), range, records = properties.len(), "analysis complete");

        Ok(Self {
            expression: function.source().to_string(),
            range,
            properties,
            samples,
            function,
        })
    }

    /// Same expression, new plotting window. Properties do not depend on the
    /// window and are carried over.
    pub fn with_range(&self, analyzer: &Analyzer, range: u32) -> Result<Self> {
        let range = analyzer.config().plot.clamp_range(range);
        let samples = plot_samples(analyzer, &self.function, range)?;
        debug!(expr = %self.expression, range, "resampled");

        Ok(Self {
            range,
            samples,
            ..self.clone()
        })
    }

    pub fn function(&self) -> &CompiledFunction {
        &self.function
    }

    /// Contiguous runs of defined samples; each run is drawn as one line.
    pub fn segments(&self) -> Vec<&[SamplePoint]> {
        self.samples
            .split(|p| p.y.is_none())
            .filter(|run| !run.is_empty())
            .collect()
    }
}

fn plot_samples(analyzer: &Analyzer, function: &CompiledFunction, range: u32) -> Result<Vec<SamplePoint>> {
    let plot = &analyzer.config().plot;
    let half = f64::from(range);
    let samples = sample(function, -half, half, plot.divisions, plot.clip);

    if samples.iter().all(|p| p.y.is_none()) {
        return Err(AnalysisError::NoSamples {
            expression: function.source().to_string(),
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_session_samples_whole_window() {
        let analyzer = Analyzer::default();
        let session = AnalysisSession::start(&analyzer, "x^2", 10).unwrap();
        assert_eq!(session.samples.len(), 101);
        assert_abs_diff_eq!(session.samples[0].x, -10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(session.samples[100].x, 10.0, epsilon = 1e-9);
        assert_eq!(session.segments().len(), 1);
        assert!(!session.properties.is_empty());
    }

    #[test]
    fn test_pole_splits_segments() {
        let session = AnalysisSession::start(&Analyzer::default(), "1/x", 10).unwrap();
        assert_eq!(session.samples[50].y, None);
        assert_eq!(session.segments().len(), 2);
    }

    #[test]
    fn test_with_range_resamples_and_clamps() {
        let analyzer = Analyzer::default();
        let first = AnalysisSession::start(&analyzer, "sin(x)", 10).unwrap();
        let wider = first.with_range(&analyzer, 5000).unwrap();
        assert_eq!(wider.range, 1000);
        assert_eq!(wider.properties, first.properties);
        assert_abs_diff_eq!(wider.samples[0].x, -1000.0, epsilon = 1e-9);

        let narrow = first.with_range(&analyzer, 0).unwrap();
        assert_eq!(narrow.range, 1);
    }

    #[test]
    fn test_no_samples_is_an_error() {
        let analyzer = Analyzer::default();
        assert!(matches!(
            AnalysisSession::start(&analyzer, "sqrt(x - 5000)", 10),
            Err(AnalysisError::NoSamples { .. })
        ));
        assert!(matches!(
            AnalysisSession::start(&analyzer, "y", 10),
            Err(AnalysisError::NoSamples { .. })
        ));
        assert_eq!(
            AnalysisSession::start(&analyzer, "", 10).unwrap_err(),
            AnalysisError::EmptyExpression
        );
    }

    #[test]
    fn test_finer_plot_divisions() {
        let mut config = AnalysisConfig::default();
        config.plot.divisions = 150;
        let analyzer = Analyzer::new(config);
        let session = AnalysisSession::start(&analyzer, "x", 10).unwrap();
        assert_eq!(session.samples.len(), 151);
    }
}
