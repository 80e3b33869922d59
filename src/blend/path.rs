//! Arc-length sampling of drawn pad paths.
//!
//! A path is the polyline a stroke leaves on the pad. Playback walks it at a
//! constant speed, so positions are looked up by travelled distance rather
//! than by vertex index.

use crate::shared::Point2D;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Running length at every vertex: `lengths[0] == 0`, last entry is the total.
pub fn cumulative_lengths(path: &[Point2D]) -> Vec<f32> {
    let mut lengths = Vec::with_capacity(path.len());
    let mut total = 0.0;
    lengths.push(0.0);
    for pair in path.windows(2) {
        total += pair[0].distance(pair[1]);
        lengths.push(total);
    }
    lengths
}

pub fn path_length(path: &[Point2D]) -> f32 {
    path.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Point at fraction `t` of the path's arc length.
///
/// Degenerate input never fails: an empty path gives the pad centre, a
/// single point (or a path whose points all coincide) gives its first point.
pub fn sample_by_arc_length(path: &[Point2D], t: f32) -> Point2D {
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return Point2D::CENTER;
    };
    if t <= 0.0 {
        return *first;
    }
    if t >= 1.0 {
        return *last;
    }
    if path.len() == 1 {
        return *first;
    }

    let lengths = cumulative_lengths(path);
    let total = lengths[lengths.len() - 1];
    if total == 0.0 {
        return *first;
    }

    let target = t * total;
    // first segment whose end reaches the target
    let segment = lengths[1..]
        .partition_point(|&len| len < target)
        .min(path.len() - 2);

    let before = lengths[segment];
    let segment_length = lengths[segment + 1] - before;
    let progress = if segment_length == 0.0 {
        0.0
    } else {
        (target - before) / segment_length
    };

    let p1 = path[segment];
    let p2 = path[segment + 1];
    Point2D::new(lerp(p1.x, p2.x, progress), lerp(p1.y, p2.y, progress))
}

/// Resample a raw stroke into an evenly spaced path.
///
/// Strokes with fewer than two points carry no direction and are dropped
/// (empty result). Otherwise the output has
/// `max(min_points, floor(length * density))` points spread uniformly by arc
/// length, starting and ending on the stroke's endpoints.
pub fn finalize_path(raw: &[Point2D], density: f32, min_points: usize) -> Vec<Point2D> {
    if raw.len() < 2 {
        return Vec::new();
    }
    let total = path_length(raw);
    let resolution = min_points.max((total * density).floor() as usize).max(1);
    (0..resolution)
        .map(|i| {
            let t = if resolution == 1 {
                0.0
            } else {
                i as f32 / (resolution - 1) as f32
            };
            sample_by_arc_length(raw, t)
        })
        .collect()
}
