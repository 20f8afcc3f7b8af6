//! Per-pixel tests applied while scanning an octave.

use crate::image::OwnedImage;

/// Cheap pre-filter on the absolute DoG response.
#[inline]
pub fn first_check(value: f32, threshold: f32) -> bool {
    value.abs() > threshold
}

/// Tests `value` at `(x, y)` of the middle level against its 26 neighbours.
///
/// A positive centre must not be exceeded by any neighbour; a non-positive
/// centre must not be undercut. Ties do not disqualify the centre. The scan
/// exits on the first neighbour that breaks the condition.
pub fn is_local_extremum(levels: [&OwnedImage; 3], x: usize, y: usize, value: f32) -> bool {
    if value > 0.0 {
        scan_neighbourhood(levels, x, y, |v| v > value)
    } else {
        scan_neighbourhood(levels, x, y, |v| v < value)
    }
}

#[inline]
fn scan_neighbourhood<F>(levels: [&OwnedImage; 3], x: usize, y: usize, beats_centre: F) -> bool
where
    F: Fn(f32) -> bool,
{
    for (li, level) in levels.iter().enumerate() {
        for yy in y - 1..=y + 1 {
            let row = level.row(yy);
            for (xx, &v) in row.iter().enumerate().take(x + 2).skip(x - 1) {
                if li == 1 && xx == x && yy == y {
                    continue;
                }
                if beats_centre(v) {
                    return false;
                }
            }
        }
    }
    true
}

/// Finite-difference 2x2 Hessian `(dxx, dyy, dxy)` at `(x, y)`.
#[inline]
pub fn hessian_2d(img: &OwnedImage, x: usize, y: usize) -> (f32, f32, f32) {
    let centre2 = 2.0 * img.at(x, y);
    let dxx = img.at(x + 1, y) + img.at(x - 1, y) - centre2;
    let dyy = img.at(x, y + 1) + img.at(x, y - 1) - centre2;
    let dxy = (img.at(x + 1, y + 1) - img.at(x - 1, y + 1) - img.at(x + 1, y - 1)
        + img.at(x - 1, y - 1))
        * 0.25;
    (dxx, dyy, dxy)
}

/// Principal-curvature ratio test.
///
/// Rejects when `det(H) * (r + 1)^2 <= r * trace(H)^2`. Points on a straight
/// edge have one dominant eigenvalue (or a non-positive determinant) and fail.
pub fn passes_edge_test(img: &OwnedImage, x: usize, y: usize, eigenvalue_ratio: f32) -> bool {
    let (dxx, dyy, dxy) = hessian_2d(img, x, y);
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    let r = eigenvalue_ratio;
    det * (r + 1.0) * (r + 1.0) > r * trace * trace
}
