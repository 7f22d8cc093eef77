use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::evaluator::RealFunction;

/// Grid and refinement parameters for a sign-change scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub lower: f64,
    pub upper: f64,
    pub step: f64,
    /// A point counts as a zero once `|f| < tolerance`.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Candidates closer than this to an earlier one are merged into it.
    pub merge_distance: f64,
    pub max_results: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            lower: -10.0,
            upper: 10.0,
            step: 0.5,
            tolerance: 1e-4,
            max_iterations: 40,
            merge_distance: 0.01,
            max_results: 10,
        }
    }
}

impl ScanSettings {
    fn grid(&self) -> Vec<f64> {
        if !(self.step > 0.0) || !(self.lower < self.upper) {
            return Vec::new();
        }
        let n = ((self.upper - self.lower) / self.step + 1e-9).floor() as usize;
        (0..=n).map(|i| self.lower + i as f64 * self.step).collect()
    }
}

/// Zeros of `f` inside the scan window, ascending.
///
/// Walks the grid pairwise. A grid point with `|f| < tolerance` is taken when
/// its neighbours confirm it is a zero (see `is_grid_zero`). A strict sign
/// change between two defined points is bisected, and the midpoint is kept
/// only if it really is a zero, which discards sign changes across poles.
/// Pairs touching an undefined point are skipped.
///
/// A function that vanishes on a whole stretch, or has more zeros than
/// `max_results`, is under-reported.
pub fn find_zeros<F>(f: &F, settings: &ScanSettings) -> Vec<f64>
where
    F: RealFunction + ?Sized,
{
    let grid = settings.grid();
    let values: Vec<Option<f64>> = grid.par_iter().map(|&x| f.eval(x)).collect();

    let mut roots: Vec<f64> = Vec::new();
    for i in 0..grid.len() {
        if roots.len() >= settings.max_results {
            break;
        }
        let Some(ya) = values[i] else { continue };

        let candidate = if ya.abs() < settings.tolerance {
            is_grid_zero(&values, i, settings.tolerance).then_some(grid[i])
        } else {
            match values.get(i + 1).copied().flatten() {
                Some(yb) if yb.abs() >= settings.tolerance && ya * yb < 0.0 => {
                    bisect(f, grid[i], grid[i + 1], ya, settings)
                }
                _ => None,
            }
        };

        if let Some(root) = candidate {
            push_merged(&mut roots, root, settings.merge_distance);
        }
    }

    roots
}

/// Whether a grid point with `|f| < tolerance` is a zero rather than a value
/// that is merely small, like the tail of `exp(x)`.
///
/// Accepted when the neighbours show a crossing, when `|f|` dips there
/// (every in-grid neighbour is undefined or strictly larger, and one is
/// defined), or at the grid end when `f` is exactly zero next to a clearly
/// non-zero neighbour.
fn is_grid_zero(values: &[Option<f64>], i: usize, tolerance: f64) -> bool {
    let Some(y) = values[i] else { return false };
    // Outer None: outside the grid. Inner None: undefined.
    let left = i.checked_sub(1).map(|j| values[j]);
    let right = values.get(i + 1).copied();

    let defined = [left.flatten(), right.flatten()];
    let crosses = defined.iter().flatten().any(|&n| y * n < 0.0)
        || matches!(defined, [Some(l), Some(r)] if l * r < 0.0);
    if crosses {
        return true;
    }

    match (left, right) {
        (Some(l), Some(r)) => {
            let above = |n: Option<f64>| n.map_or(true, |n| n.abs() > y.abs());
            above(l) && above(r) && (l.is_some() || r.is_some())
        }
        (None, Some(n)) | (Some(n), None) => y == 0.0 && n.is_some_and(|n| n.abs() >= tolerance),
        (None, None) => y == 0.0,
    }
}

fn bisect<F>(f: &F, mut a: f64, mut b: f64, mut fa: f64, settings: &ScanSettings) -> Option<f64>
where
    F: RealFunction + ?Sized,
{
    let mut mid = (a + b) / 2.0;
    let mut fm = f.eval(mid)?;
    for _ in 0..settings.max_iterations {
        if fm.abs() < settings.tolerance {
            break;
        }
        if fa * fm <= 0.0 {
            b = mid;
        } else {
            a = mid;
            fa = fm;
        }
        mid = (a + b) / 2.0;
        fm = f.eval(mid)?;
    }

    trace!(mid, residual = fm, "bisection finished");
    (fm.abs() < settings.tolerance).then_some(mid)
}

fn push_merged(roots: &mut Vec<f64>, candidate: f64, merge_distance: f64) {
    if roots.iter().all(|r| (r - candidate).abs() >= merge_distance) {
        roots.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::compile;
    use approx::assert_abs_diff_eq;

    fn zeros(expr: &str) -> Vec<f64> {
        find_zeros(&compile(expr).unwrap(), &ScanSettings::default())
    }

    #[test]
    fn test_constant_sign_has_no_zeros() {
        assert!(zeros("x^2+1").is_empty());
        assert!(zeros("exp(x)").is_empty());
    }

    #[test]
    fn test_small_tail_is_not_a_zero() {
        // |f| < tolerance on whole stretches of the grid, but never zero.
        assert!(zeros("exp(-x^2)").is_empty());
        assert!(zeros("exp(-x)").is_empty());
        assert!(zeros("1/(1 + x^2)").is_empty());
        assert!(zeros("-exp(x)").is_empty());
    }

    #[test]
    fn test_zero_at_domain_edge() {
        // Left neighbour undefined, right one larger: a dip, so a zero.
        let roots = zeros("sqrt(x)");
        assert_eq!(roots.len(), 1);
        assert_abs_diff_eq!(roots[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_at_grid_end() {
        let roots = zeros("x - 10");
        assert_eq!(roots.len(), 1);
        assert_abs_diff_eq!(roots[0], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_is_grid_zero() {
        let tol = 1e-4;
        // Monotone tail: no.
        assert!(!is_grid_zero(&[Some(5e-5), Some(8e-5), Some(2e-4)], 1, tol));
        assert!(!is_grid_zero(&[Some(5e-5), Some(8e-5)], 0, tol));
        // Dip and crossing: yes.
        assert!(is_grid_zero(&[Some(0.25), Some(0.0), Some(0.25)], 1, tol));
        assert!(is_grid_zero(&[Some(-0.5), Some(1e-5), Some(0.5)], 1, tol));
        assert!(is_grid_zero(&[None, Some(0.0), Some(0.7)], 1, tol));
        // Flat run of exact zeros is not a dip.
        assert!(!is_grid_zero(&[Some(0.0), Some(0.0), Some(0.0)], 1, tol));
        assert!(!is_grid_zero(&[None, Some(0.0), None], 1, tol));
    }

    #[test]
    fn test_touching_root_is_reported_once() {
        let roots = zeros("x^2");
        assert_eq!(roots.len(), 1);
        assert_abs_diff_eq!(roots[0], 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_grid_roots() {
        let roots = zeros("x^2 - 4");
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], -2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(roots[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bisected_roots() {
        let roots = zeros("x^2 - 2");
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], -std::f64::consts::SQRT_2, epsilon = 1e-3);
        assert_abs_diff_eq!(roots[1], std::f64::consts::SQRT_2, epsilon = 1e-3);

        let third = zeros("3x - 1");
        assert_eq!(third.len(), 1);
        assert_abs_diff_eq!(third[0], 1.0 / 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pole_sign_change_is_not_a_root() {
        assert!(zeros("1/(x - 0.3)").is_empty());
        assert!(zeros("1/x").is_empty());

        // Sign changes at π/2 + kπ are poles; only the multiples of π survive.
        let tan_roots = zeros("tan(x)");
        assert_eq!(tan_roots.len(), 7);
        for r in tan_roots {
            let turns = r / std::f64::consts::PI;
            assert!((turns - turns.round()).abs() < 1e-3, "{r} is not a multiple of pi");
        }
    }

    #[test]
    fn test_undefined_half_is_skipped() {
        let roots = zeros("ln(x)");
        assert_eq!(roots.len(), 1);
        assert_abs_diff_eq!(roots[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_result_cap() {
        // sin(5x) has 31 zeros in [-10, 10].
        let roots = zeros("sin(5x)");
        assert_eq!(roots.len(), 10);
        assert!(roots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_grid_includes_upper_bound() {
        let settings = ScanSettings::default();
        let grid = settings.grid();
        assert_eq!(grid.len(), 41);
        assert_abs_diff_eq!(*grid.last().unwrap(), 10.0, epsilon = 1e-12);
    }
}
