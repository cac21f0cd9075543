//! Bracket-narrowing maximizers for unimodal curves, the search primitive
//! behind maximum power point calculations: the caller hands a bracket
//! known to contain the maximum and an evaluator for the curve, and the
//! bracket shrinks geometrically until its width drops below the given
//! tolerance. Nothing here detects multimodal input; on such curves the
//! result is a local maximum, whichever one the narrowing lands on.

use num_traits::Float;

#[inline]
fn converged<T: Float>(lo: T, hi: T, tolerance: T) -> bool
{
    (hi - lo).abs() <= tolerance
}

///
/// Five-point narrowing: working points `X0 < X1 < X2 < X3 < X4` span the
/// bracket, with `X0`, `X2`, `X4` evaluated up front. Each iteration
/// evaluates the quarter points `X1` and `X3` and keeps the half of the
/// bracket whose interior point scored highest, two evaluations per
/// iteration. Returns the final center point `X2`.
///
/// The branch order matters on plateaus: `Y1` is tested against both
/// neighbors first, then `Y2` against `Y3`, and ties fall through to the
/// upper half. Downstream results depend on this exact order.
///
pub fn bisect_max<T: Float, F: FnMut(T) -> T>(x0: T, x1: T, tolerance: T, mut eval: F) -> T
{
    let two = T::one() + T::one();
    let mut x = [x0, T::zero(), (x0 + x1) / two, T::zero(), x1];
    let mut y = [eval(x[0]), T::zero(), eval(x[2]), T::zero(), eval(x[4])];

    while !converged(x[0], x[4], tolerance)
    {
        x[1] = (x[0] + x[2]) / two;
        y[1] = eval(x[1]);
        x[3] = (x[2] + x[4]) / two;
        y[3] = eval(x[3]);
        if y[1] > y[2] && y[1] > y[3]
        {
            // maximum bracketed by [X0, X2]
            x[4] = x[2];
            y[4] = y[2];
            x[2] = x[1];
            y[2] = y[1];
        }
        else if y[2] > y[3]
        {
            // maximum bracketed by [X1, X3]
            x[0] = x[1];
            y[0] = y[1];
            x[4] = x[3];
            y[4] = y[3];
        }
        else
        {
            // maximum bracketed by [X2, X4]
            x[0] = x[2];
            y[0] = y[2];
            x[2] = x[3];
            y[2] = y[3];
        }
    }

    x[2]
}

///
/// Two-point variant of the same narrowing primitive: evaluates the curve
/// at one third and two thirds of the bracket and discards the outer third
/// on the losing side, the classic loop for shrinking a voltage bracket
/// toward the higher `V * I(V)` product. Returns the final midpoint.
///
pub fn ternary_max<T: Float, F: FnMut(T) -> T>(x0: T, x1: T, tolerance: T, mut eval: F) -> T
{
    let two = T::one() + T::one();
    let three = two + T::one();
    let mut lo = x0;
    let mut hi = x1;

    while !converged(lo, hi, tolerance)
    {
        let m1 = (two * lo + hi) / three;
        let m2 = (lo + two * hi) / three;
        if eval(m1) > eval(m2)
        {
            hi = m2;
        }
        else
        {
            lo = m1;
        }
    }

    (lo + hi) / two
}

#[test]
fn quadratic_maximum_is_found_within_tolerance()
{
    let found = bisect_max(0.0, 10.0, 1e-6, |x: f64| -(x - 7.0) * (x - 7.0));
    assert!((found - 7.0).abs() <= 1e-6);
}

#[test]
fn evaluation_count_is_logarithmic_in_bracket_over_tolerance()
{
    let mut evaluations = 0;
    let _ = bisect_max(0.0, 10.0, 1e-6, |x: f64| {
        evaluations += 1;
        -(x - 3.0) * (x - 3.0)
    });
    println!("evaluations={evaluations}");
    // three up-front evaluations plus two per halving of the bracket;
    // halving 10.0 below 1e-6 takes 24 iterations
    assert!(evaluations <= 3 + 2 * 24);
}

#[test]
fn power_product_maximum_via_ternary_narrowing()
{
    // P = V * I with a linear current model peaks at half the open-circuit voltage
    let found = ternary_max(0.0, 20.0, 1e-6, |v: f64| v * (1.0 - v / 20.0) * 8.02);
    assert!((found - 10.0).abs() <= 1e-6);
}

#[test]
fn works_in_single_precision()
{
    let found = bisect_max(0.0f32, 10.0, 1e-3, |x| -(x - 7.0) * (x - 7.0));
    assert!((found - 7.0).abs() <= 1e-3);
    let found = ternary_max(0.0f32, 20.0, 1e-3, |v| v * (1.0 - v / 20.0));
    assert!((found - 10.0).abs() <= 1e-3);
}

#[test]
fn plateau_ties_drift_toward_the_upper_bracket()
{
    let found = bisect_max(0.0, 1.0, 1e-3, |_: f64| 1.0);
    assert!(found > 0.9);
    let found = ternary_max(0.0, 1.0, 1e-3, |_: f64| 1.0);
    assert!((0.0..=1.0).contains(&found));
}

#[test]
fn multimodal_curves_yield_some_local_maximum()
{
    let found = bisect_max(0.0, 20.0, 1e-9, f64::sin);
    println!("found={found}");
    assert!(found.sin() > 1.0 - 1e-6);
}

#[test]
fn maximum_at_bracket_edge_converges_to_the_edge()
{
    let found = bisect_max(0.0, 10.0, 1e-6, |x: f64| x);
    assert!((found - 10.0).abs() <= 1e-6);
    let found = bisect_max(0.0, 10.0, 1e-6, |x: f64| -x);
    assert!(found.abs() <= 1e-6);
}
