//! 1D root-finding solvers (translates `ql/math/solvers1d/`).

use ql_core::{
    errors::{Error, Result},
    Real,
};

const MAX_ITERATIONS: u32 = 100;

/// Bisection with a dual stopping rule: converges once either the bracket
/// width or the residual falls under its own tolerance.
///
/// Checks the endpoints for an exact root before checking the sign, and
/// reports a non-bracketing pair via [`Error::BracketSignError`] rather than
/// a generic precondition error.
pub fn bisect_solve<F>(
    f: F,
    x_min: Real,
    x_max: Real,
    x_tol: Real,
    f_tol: Real,
) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    let mut a = x_min;
    let mut b = x_max;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa.abs() < f_tol {
        return Ok(a);
    }
    if fb.abs() < f_tol {
        return Ok(b);
    }
    if fa * fb > 0.0 {
        return Err(Error::BracketSignError { a, b });
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (a + b);
        let fm = f(mid);
        if fm.abs() < f_tol || 0.5 * (b - a) < x_tol {
            return Ok(mid);
        }
        if fm * fa > 0.0 {
            a = mid;
            fa = fm;
        } else {
            b = mid;
            fb = fm;
        }
    }
    let _ = fb;
    Err(Error::Runtime(
        "bisect_solve: maximum iterations reached".into(),
    ))
}
