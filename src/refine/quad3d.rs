//! Quadratic fit of the DoG function in `(scale, y, x)`.
//!
//! Around a sample `D` the function is approximated by
//! `D(o) ≈ D + gᵀo + ½ oᵀHo` with `g` and `H` from central differences over
//! the 3x3x3 neighbourhood. The stationary point solves `H o = -g`. Vectors
//! are ordered `(s, y, x)`.

use crate::image::OwnedImage;

/// Result of fitting the quadratic at one integer location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadraticFit3 {
    /// Sample value at the integer location.
    pub value: f32,
    /// Finite-difference gradient `(ds, dy, dx)`.
    pub gradient: [f32; 3],
    /// Offset of the stationary point `(ds, dy, dx)`.
    pub offset: [f32; 3],
}

impl QuadraticFit3 {
    /// Value of the fitted quadratic at the stationary point.
    pub fn interpolated_value(&self) -> f32 {
        let dot: f32 = self
            .gradient
            .iter()
            .zip(self.offset.iter())
            .map(|(g, o)| g * o)
            .sum();
        self.value + 0.5 * dot
    }
}

/// Fits the quadratic at `(x, y)` of `cur` using the adjacent levels.
///
/// Returns `None` when the Hessian is singular or the solution is not finite.
pub fn fit_quadratic_3d(
    prev: &OwnedImage,
    cur: &OwnedImage,
    next: &OwnedImage,
    x: usize,
    y: usize,
) -> Option<QuadraticFit3> {
    let value = cur.at(x, y);
    let gradient = [
        0.5 * (next.at(x, y) - prev.at(x, y)),
        0.5 * (cur.at(x, y + 1) - cur.at(x, y - 1)),
        0.5 * (cur.at(x + 1, y) - cur.at(x - 1, y)),
    ];

    let value2 = 2.0 * value;
    let hss = next.at(x, y) + prev.at(x, y) - value2;
    let hyy = cur.at(x, y + 1) + cur.at(x, y - 1) - value2;
    let hxx = cur.at(x + 1, y) + cur.at(x - 1, y) - value2;
    let hsy =
        0.25 * (next.at(x, y + 1) - next.at(x, y - 1) - prev.at(x, y + 1) + prev.at(x, y - 1));
    let hsx =
        0.25 * (next.at(x + 1, y) - next.at(x - 1, y) - prev.at(x + 1, y) + prev.at(x - 1, y));
    let hyx = 0.25
        * (cur.at(x + 1, y + 1) - cur.at(x - 1, y + 1) - cur.at(x + 1, y - 1)
            + cur.at(x - 1, y - 1));

    let hessian = [[hss, hsy, hsx], [hsy, hyy, hyx], [hsx, hyx, hxx]];
    let rhs = [-gradient[0], -gradient[1], -gradient[2]];
    let offset = solve_symmetric_3x3(hessian, rhs)?;

    Some(QuadraticFit3 {
        value,
        gradient,
        offset,
    })
}

/// Solves `H o = b` for a symmetric 3x3 `H` via its adjugate.
pub(crate) fn solve_symmetric_3x3(h: [[f32; 3]; 3], b: [f32; 3]) -> Option<[f32; 3]> {
    let [[a, d, e], [_, bb, f], [_, _, c]] = h;

    let det = a * (bb * c - f * f) - d * (d * c - f * e) + e * (d * f - bb * e);
    if !det.is_normal() {
        return None;
    }

    let inv00 = bb * c - f * f;
    let inv01 = e * f - d * c;
    let inv02 = d * f - bb * e;
    let inv11 = a * c - e * e;
    let inv12 = d * e - a * f;
    let inv22 = a * bb - d * d;

    let out = [
        (inv00 * b[0] + inv01 * b[1] + inv02 * b[2]) / det,
        (inv01 * b[0] + inv11 * b[1] + inv12 * b[2]) / det,
        (inv02 * b[0] + inv12 * b[1] + inv22 * b[2]) / det,
    ];
    if out.iter().all(|v| v.is_finite()) {
        Some(out)
    } else {
        None
    }
}
