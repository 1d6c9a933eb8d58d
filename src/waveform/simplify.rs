//! Douglas–Peucker polyline simplification.
//!
//! The segment stack replaces recursion so deeply nested splits cannot overflow
//! the call stack. Worst case is still O(n²) when every split peels off a single
//! point, typical inputs run in O(n log n).

use serde::{Deserialize, Serialize};

/// A polyline vertex: `x` is time-like, `y` amplitude-like.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate, strictly increasing along a polyline.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Squared distance from `point` to the segment `start..end`.
///
/// A zero-length segment measures the distance to `start`.
fn segment_distance_squared(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return point.distance_squared(start);
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_squared).clamp(0.0, 1.0);
    point.distance_squared(Point::new(start.x + t * dx, start.y + t * dy))
}

/// Indices of the points kept by [`simplify`], in ascending order.
///
/// Both endpoints are always included. Inputs of two points or fewer are kept
/// whole. A negative or NaN `max_error` behaves like zero.
pub fn simplify_indices(points: &[Point], max_error: f64) -> Vec<usize> {
    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let tolerance = max_error.max(0.0);
    let tolerance = tolerance * tolerance;
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut segments = vec![(0usize, n - 1)];
    while let Some((first, last)) = segments.pop() {
        if last - first < 2 {
            continue;
        }

        let mut max_distance = 0.0;
        let mut split = first;
        for i in first + 1..last {
            let distance = segment_distance_squared(points[i], points[first], points[last]);
            // Strict comparison: the earliest maximum wins.
            if distance > max_distance {
                max_distance = distance;
                split = i;
            }
        }

        if max_distance > tolerance {
            keep[split] = true;
            segments.push((first, split));
            segments.push((split, last));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &kept)| kept.then_some(i))
        .collect()
}

/// Reduce `points` to the subsequence within `max_error` of the original.
///
/// Every discarded point lies within `max_error` of the simplified polyline.
/// The result is deterministic and simplifying it again with the same
/// `max_error` returns it unchanged.
///
/// # Example
/// ```rust
/// use waveform_stream::waveform::{Point, simplify};
///
/// let line: Vec<Point> = (0..100).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
/// assert_eq!(simplify(&line, 1e-6), vec![line[0], line[99]]);
/// ```
pub fn simplify(points: &[Point], max_error: f64) -> Vec<Point> {
    simplify_indices(points, max_error)
        .into_iter()
        .map(|i| points[i])
        .collect()
}
