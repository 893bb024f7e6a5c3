//! Element-wise closeness with absolute and relative tolerance.
//!
//! `|actual - desired| <= atol + rtol * |desired|` for every element. NaN is
//! never close to anything, including NaN. Infinities are close only to an
//! infinity of the same sign.

use nalgebra::DMatrix;

use crate::domain::Tolerance;

/// Summary of the elements that failed the tolerance check.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub mismatched: usize,
    pub total: usize,
    pub max_abs: f64,
    pub max_rel: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Closeness {
    Close,
    ShapeMismatch {
        actual: (usize, usize),
        desired: (usize, usize),
    },
    NotClose(Mismatch),
}

impl Closeness {
    pub fn is_close(&self) -> bool {
        matches!(self, Closeness::Close)
    }
}

pub fn allclose(actual: &DMatrix<f64>, desired: &DMatrix<f64>, tol: Tolerance) -> Closeness {
    if actual.shape() != desired.shape() {
        return Closeness::ShapeMismatch {
            actual: actual.shape(),
            desired: desired.shape(),
        };
    }

    let mut mismatched = 0;
    let mut max_abs = 0.0_f64;
    let mut max_rel = 0.0_f64;
    for (&a, &d) in actual.iter().zip(desired.iter()) {
        if element_close(a, d, tol) {
            continue;
        }
        mismatched += 1;
        // NaN elements count as mismatches but stay out of the statistics.
        let diff = (a - d).abs();
        if diff.is_nan() {
            continue;
        }
        max_abs = max_abs.max(diff);
        max_rel = max_rel.max(if d != 0.0 { diff / d.abs() } else { f64::INFINITY });
    }

    if mismatched == 0 {
        Closeness::Close
    } else {
        Closeness::NotClose(Mismatch {
            mismatched,
            total: actual.len(),
            max_abs,
            max_rel,
        })
    }
}

fn element_close(a: f64, d: f64, tol: Tolerance) -> bool {
    if a.is_nan() || d.is_nan() {
        return false;
    }
    if a.is_infinite() || d.is_infinite() {
        return a == d;
    }
    (a - d).abs() <= tol.atol + tol.rtol * d.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: usize, cols: usize, v: &[f64]) -> DMatrix<f64> {
        DMatrix::from_row_slice(rows, cols, v)
    }

    #[test]
    fn within_tolerance_is_close() {
        let tol = Tolerance::default();
        let desired = m(1, 3, &[1.0, -2.0, 0.0]);
        // rtol applies to |desired|: 1.0 allows 0.015, 0.0 allows 0.005.
        let actual = m(1, 3, &[1.0149, -2.0249, 0.0049]);
        assert!(allclose(&actual, &desired, tol).is_close());
    }

    #[test]
    fn tolerance_is_measured_against_desired() {
        let tol = Tolerance { atol: 0.0, rtol: 0.5 };
        // |1 - 2| = 1 <= 0.5 * 2, but |2 - 1| = 1 > 0.5 * 1.
        assert!(allclose(&m(1, 1, &[1.0]), &m(1, 1, &[2.0]), tol).is_close());
        assert!(!allclose(&m(1, 1, &[2.0]), &m(1, 1, &[1.0]), tol).is_close());
    }

    #[test]
    fn reports_mismatch_statistics() {
        let tol = Tolerance::default();
        let desired = m(2, 2, &[1.0, 1.0, 1.0, 2.0]);
        let actual = m(2, 2, &[1.0, 1.1, 1.0, 2.5]);
        match allclose(&actual, &desired, tol) {
            Closeness::NotClose(mm) => {
                assert_eq!(mm.mismatched, 2);
                assert_eq!(mm.total, 4);
                assert!((mm.max_abs - 0.5).abs() < 1e-12);
                assert!((mm.max_rel - 0.25).abs() < 1e-12);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn shapes_must_match() {
        let tol = Tolerance::default();
        assert_eq!(
            allclose(&DMatrix::zeros(2, 3), &DMatrix::zeros(3, 2), tol),
            Closeness::ShapeMismatch {
                actual: (2, 3),
                desired: (3, 2)
            }
        );
    }

    #[test]
    fn nan_is_never_close() {
        let tol = Tolerance::default();
        let nan = m(1, 1, &[f64::NAN]);
        assert!(!allclose(&nan, &nan, tol).is_close());
        assert!(!allclose(&nan, &m(1, 1, &[0.0]), tol).is_close());
        assert!(allclose(&m(1, 1, &[f64::INFINITY]), &m(1, 1, &[f64::INFINITY]), tol).is_close());
    }
}
