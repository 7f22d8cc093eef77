//! Property-based tests for the evaluator and the scans.

use proptest::prelude::*;

use crate::evaluator::{compile, normalize, sample, RealFunction};
use crate::properties::analyze;
use crate::roots::{find_zeros, ScanSettings};

// Quadratics with small integer coefficients and a non-zero leading term.
fn quadratic() -> impl Strategy<Value = (i32, i32, i32)> {
    ((-5i32..=5).prop_filter("leading coefficient must be non-zero", |a| *a != 0), -10i32..=10, -10i32..=10)
}

fn expression_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r"[x0-9+\-*/^() .a-z]{0,24}").unwrap()
}

proptest! {
    #[test]
    fn normalize_and_compile_never_panic(text in expression_text()) {
        let _ = normalize(&text);
        if let Ok(f) = compile(&text) {
            for x in [-3.0, -0.5, 0.0, 0.5, 3.0] {
                if let Some(y) = f.evaluate(x) {
                    prop_assert!(y.is_finite());
                }
            }
        }
    }

    #[test]
    fn analyze_never_panics(text in expression_text()) {
        let _ = analyze(&text);
    }

    #[test]
    fn sample_x_strictly_increasing(lower in -100.0f64..0.0, width in 0.1f64..200.0, divisions in 1usize..300) {
        let f = compile("x^2").unwrap();
        let samples = sample(&f, lower, lower + width, divisions, 1000.0);
        prop_assert_eq!(samples.len(), divisions + 1);
        prop_assert!(samples.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn quadratic_zeros_are_real_zeros((a, b, c) in quadratic()) {
        let f = compile(&format!("{a}*x^2 + ({b})*x + ({c})")).unwrap();
        let settings = ScanSettings::default();
        let roots = find_zeros(&f, &settings);

        prop_assert!(roots.len() <= 2);
        prop_assert!(roots.windows(2).all(|w| w[0] < w[1]));
        for r in &roots {
            let y = f.eval(*r).unwrap();
            prop_assert!(y.abs() < settings.tolerance, "f({}) = {}", r, y);
        }

        // A negative discriminant leaves nothing to find.
        if b * b - 4 * a * c < 0 {
            prop_assert!(roots.is_empty());
        }
    }
}
