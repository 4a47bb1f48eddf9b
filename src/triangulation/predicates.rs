//! Tolerance-based geometric predicates
//!
//! All predicates run in `f64` on projected coordinates. Each determinant is
//! compared against `epsilon` times its permanent (the same expression with
//! every product taken in absolute value), so the tolerance scales with the
//! magnitude of the input instead of being an absolute threshold.

use glam::DVec2;

/// Sign of the orientation determinant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    CounterClockwise,
    Clockwise,
    Collinear,
}

/// Twice the signed area of triangle `abc`
#[inline]
pub fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Classify the turn `a -> b -> c`
///
/// Returns `Collinear` when the determinant is within tolerance of zero.
pub fn orientation(a: DVec2, b: DVec2, c: DVec2, epsilon: f64) -> Orientation {
    let ab = b - a;
    let ac = c - a;
    let det = ab.x * ac.y - ab.y * ac.x;
    let permanent = (ab.x * ac.y).abs() + (ab.y * ac.x).abs();

    if det > epsilon * permanent {
        Orientation::CounterClockwise
    } else if det < -epsilon * permanent {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Check if `d` lies strictly inside the circumcircle of counter-clockwise `abc`
///
/// Points on the circle (within tolerance) are reported as outside.
pub fn in_circumcircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2, epsilon: f64) -> bool {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;

    let alift = ad.length_squared();
    let blift = bd.length_squared();
    let clift = cd.length_squared();

    let bc = bd.x * cd.y - cd.x * bd.y;
    let ca = cd.x * ad.y - ad.x * cd.y;
    let ab = ad.x * bd.y - bd.x * ad.y;
    let det = alift * bc + blift * ca + clift * ab;

    let permanent = alift * ((bd.x * cd.y).abs() + (cd.x * bd.y).abs())
        + blift * ((cd.x * ad.y).abs() + (ad.x * cd.y).abs())
        + clift * ((ad.x * bd.y).abs() + (bd.x * ad.y).abs());

    det > epsilon * permanent
}

/// Check if `p` lies strictly between `a` and `b`, assuming the three are collinear
pub fn strictly_between(a: DVec2, b: DVec2, p: DVec2) -> bool {
    let ab = b - a;
    let t = (p - a).dot(ab);
    t > 0.0 && t < ab.length_squared()
}

/// Check if two points coincide within a relative tolerance
///
/// Exactly equal points always coincide, including at the origin.
#[inline]
pub fn coincident(a: DVec2, b: DVec2, tolerance: f64) -> bool {
    let scale = a.length_squared().max(b.length_squared()).max(f64::MIN_POSITIVE);
    a.distance_squared(b) <= tolerance * tolerance * scale
}

/// Circumcenter and squared circumradius of `abc`
///
/// Returns `None` for (near-)collinear input.
pub fn circumcircle(a: DVec2, b: DVec2, c: DVec2) -> Option<(DVec2, f64)> {
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.perp_dot(ac);
    if d.abs() <= f64::EPSILON * (ab.length_squared() + ac.length_squared()) {
        return None;
    }

    let ab2 = ab.length_squared();
    let ac2 = ac.length_squared();
    let offset = DVec2::new(ac.y * ab2 - ab.y * ac2, ab.x * ac2 - ac.x * ab2) / d;
    Some((a + offset, offset.length_squared()))
}
