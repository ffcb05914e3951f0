//! Fixed-stride decimation of long series for rendering.

/// Reduce `points` to at most `max_points` representative elements.
///
/// Sequences short enough pass through unchanged. Longer sequences are
/// decimated with a fixed stride starting at index 0; if the stride does not
/// land on the final element it is appended explicitly, because the most
/// recent metric is the most important one to show. The output may therefore
/// hold `max_points + 1` elements.
///
/// This is plain decimation, not a statistically representative sampler: it
/// neither averages nor keeps local extrema. Known limitation.
pub fn downsample<T: Clone>(points: &[T], max_points: usize) -> Vec<T> {
    let max_points = max_points.max(2);
    if points.len() <= max_points {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_points);
    let mut out: Vec<T> = points.iter().step_by(stride).cloned().collect();
    let last_index = points.len() - 1;
    if last_index % stride != 0 {
        out.push(points[last_index].clone());
    }
    out
}
