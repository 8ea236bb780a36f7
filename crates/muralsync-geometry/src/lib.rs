//! Pure geometry behind the `eraseArea` command.
//!
//! Paths are flat `[x0, y0, x1, y1, ...]` slices. Nothing here allocates
//! state or knows about sessions; the store calls these per drawing and
//! per text anchor.
//!
//! # Known artifact
//!
//! [`erase_from_path`] drops the points inside the circle and keeps the
//! rest in their original order. When the circle cuts a stroke in two,
//! the survivors are rejoined, so a renderer draws a straight chord across
//! the erased gap. Splitting into sub-paths would need one drawing to map
//! to several paths, which is a wire format change.

/// Fewest values a stored path may have: two points.
pub const MIN_PATH_LEN: usize = 4;

/// A circular erase region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraseCircle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl EraseCircle {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    /// Whether `(px, py)` lies inside or on the circle.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        contains_point(px, py, self.x, self.y, self.radius)
    }

    /// See [`erase_from_path`].
    pub fn erase(&self, path: &[f64]) -> Vec<f64> {
        erase_from_path(path, self.x, self.y, self.radius)
    }
}

/// Euclidean distance from `(px, py)` to `(cx, cy)` is at most `r`.
///
/// A negative or NaN radius contains nothing.
pub fn contains_point(px: f64, py: f64, cx: f64, cy: f64, r: f64) -> bool {
    (px - cx).hypot(py - cy) <= r
}

/// Returns the points of `path` that lie outside the circle, in order.
///
/// A trailing unpaired value is dropped.
pub fn erase_from_path(path: &[f64], cx: f64, cy: f64, r: f64) -> Vec<f64> {
    let mut kept = Vec::with_capacity(path.len());
    for pair in path.chunks_exact(2) {
        if !contains_point(pair[0], pair[1], cx, cy, r) {
            kept.extend_from_slice(pair);
        }
    }
    kept
}

/// Whether a path is long enough to be kept as a drawing.
pub fn is_drawable(path: &[f64]) -> bool {
    path.len() >= MIN_PATH_LEN && path.len() % 2 == 0
}
