//! Path post-processing: simplification, spline smoothing, resampling,
//! and the composed closed-loop pipeline for interactive editing.

use nalgebra::Point3;
use tracing::debug;

use crate::error::{GeodesicError, GeodesicResult};
use crate::graph::MeshGraph;
use crate::search;
use crate::types::ClosedLoop;

/// Default spline density: samples emitted per control segment.
pub const DEFAULT_SAMPLES_PER_SEGMENT: usize = 4;

/// Floor on each centripetal knot increment; keeps duplicate control
/// points from collapsing the parameterization.
const MIN_KNOT_STEP: f64 = 1e-8;

// ── Douglas–Peucker ─────────────────────────────────────────────────────

/// Distance from `p` to segment `ab`, clamped to the segment span.
fn point_segment_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-24 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    let projected = a + ab * t;
    (p - projected).norm()
}

fn douglas_peucker(points: &[Point3<f64>], epsilon: f64, keep: &mut Vec<bool>, lo: usize, hi: usize) {
    if hi <= lo + 1 {
        return;
    }
    let mut max_distance = 0.0;
    let mut max_index = lo;
    for i in (lo + 1)..hi {
        let d = point_segment_distance(&points[i], &points[lo], &points[hi]);
        if d > max_distance {
            max_distance = d;
            max_index = i;
        }
    }
    if max_distance > epsilon {
        keep[max_index] = true;
        douglas_peucker(points, epsilon, keep, lo, max_index);
        douglas_peucker(points, epsilon, keep, max_index, hi);
    }
}

/// Douglas–Peucker simplification of a welded-vertex polyline.
///
/// Endpoints are always kept. The default epsilon is
/// `0.1 × average_edge_length`; pass `Some(eps)` to override.
pub fn simplify(graph: &MeshGraph, vertices: &[usize], epsilon: Option<f64>) -> Vec<usize> {
    if vertices.len() < 3 {
        return vertices.to_vec();
    }
    let epsilon = epsilon.unwrap_or(0.1 * graph.average_edge_length());
    let points: Vec<Point3<f64>> = vertices.iter().map(|&v| graph.position(v)).collect();

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    *keep.last_mut().unwrap() = true;
    douglas_peucker(&points, epsilon, &mut keep, 0, points.len() - 1);

    vertices
        .iter()
        .zip(&keep)
        .filter_map(|(&v, &k)| k.then_some(v))
        .collect()
}

// ── Centripetal Catmull–Rom ─────────────────────────────────────────────

fn lerp(a: &Point3<f64>, b: &Point3<f64>, t: f64) -> Point3<f64> {
    Point3::from(a.coords * (1.0 - t) + b.coords * t)
}

/// Barry–Goldman evaluation of one centripetal segment `p1 → p2` at
/// `t ∈ [t1, t2]`.
fn catmull_rom_segment(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    t: f64,
) -> Point3<f64> {
    let knot = |a: &Point3<f64>, b: &Point3<f64>| (b - a).norm().sqrt().max(MIN_KNOT_STEP);
    let t0 = 0.0;
    let t1 = t0 + knot(p0, p1);
    let t2 = t1 + knot(p1, p2);
    let t3 = t2 + knot(p2, p3);

    let t = t1 + (t2 - t1) * t;

    let a1 = Point3::from(p0.coords * ((t1 - t) / (t1 - t0)) + p1.coords * ((t - t0) / (t1 - t0)));
    let a2 = Point3::from(p1.coords * ((t2 - t) / (t2 - t1)) + p2.coords * ((t - t1) / (t2 - t1)));
    let a3 = Point3::from(p2.coords * ((t3 - t) / (t3 - t2)) + p3.coords * ((t - t2) / (t3 - t2)));

    let b1 = Point3::from(a1.coords * ((t2 - t) / (t2 - t0)) + a2.coords * ((t - t0) / (t2 - t0)));
    let b2 = Point3::from(a2.coords * ((t3 - t) / (t3 - t1)) + a3.coords * ((t - t1) / (t3 - t1)));

    Point3::from(b1.coords * ((t2 - t) / (t2 - t1)) + b2.coords * ((t - t1) / (t2 - t1)))
}

/// Centripetal Catmull–Rom through an open control polyline.
///
/// Two control points fall back to linear interpolation. For `n ≥ 3`
/// control points the output has `(n − 1) · samples + 1` points and passes
/// through both endpoints.
pub fn smooth(points: &[Point3<f64>], samples_per_segment: usize) -> Vec<Point3<f64>> {
    let n = points.len();
    let samples = samples_per_segment.max(1);
    match n {
        0 | 1 => points.to_vec(),
        2 => {
            let mut out = Vec::with_capacity(samples + 1);
            for j in 0..=samples {
                out.push(lerp(&points[0], &points[1], j as f64 / samples as f64));
            }
            out
        }
        _ => {
            let mut out = Vec::with_capacity((n - 1) * samples + 1);
            for i in 0..n - 1 {
                let p0 = &points[i.saturating_sub(1)];
                let p1 = &points[i];
                let p2 = &points[i + 1];
                let p3 = &points[(i + 2).min(n - 1)];
                for j in 0..samples {
                    out.push(catmull_rom_segment(p0, p1, p2, p3, j as f64 / samples as f64));
                }
            }
            out.push(points[n - 1]);
            out
        }
    }
}

/// Closed centripetal Catmull–Rom: wraps around the control loop and emits
/// `n · samples` points covering the full cycle.
pub fn closed_smooth(points: &[Point3<f64>], samples_per_segment: usize) -> Vec<Point3<f64>> {
    let n = points.len();
    let samples = samples_per_segment.max(1);
    if n < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(n * samples);
    for i in 0..n {
        let p0 = &points[(i + n - 1) % n];
        let p1 = &points[i];
        let p2 = &points[(i + 1) % n];
        let p3 = &points[(i + 2) % n];
        for j in 0..samples {
            out.push(catmull_rom_segment(p0, p1, p2, p3, j as f64 / samples as f64));
        }
    }
    out
}

// ── Arc-length resampling ───────────────────────────────────────────────

/// Resample a polyline at (approximately) equal arc-length spacing.
///
/// The composed pipelines pass `2 × average_edge_length` as the spacing.
/// The first sample is the exact first input point; the last sample is
/// snapped to the exact last input point, appended instead when the
/// remaining gap exceeds 10% of the sample spacing.
pub fn resample_by_arc_length(points: &[Point3<f64>], spacing: f64) -> Vec<Point3<f64>> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0);
    for pair in points.windows(2) {
        let last = *cumulative.last().unwrap();
        cumulative.push(last + (pair[1] - pair[0]).norm());
    }
    let total = *cumulative.last().unwrap();
    if total < 1e-12 {
        return vec![points[0], *points.last().unwrap()];
    }

    let num_samples = ((total / spacing).ceil() as usize + 1).max(2);
    let step = total / (num_samples - 1) as f64;

    let mut out = Vec::with_capacity(num_samples);
    let mut segment = 0usize;
    for k in 0..num_samples {
        let target = (k as f64 * step).min(total);
        while segment + 1 < cumulative.len() - 1 && cumulative[segment + 1] < target {
            segment += 1;
        }
        let seg_len = cumulative[segment + 1] - cumulative[segment];
        let t = if seg_len > 1e-12 {
            (target - cumulative[segment]) / seg_len
        } else {
            0.0
        };
        out.push(lerp(&points[segment], &points[segment + 1], t));
    }

    // Snap or append the exact endpoint.
    let end = *points.last().unwrap();
    let gap = (end - *out.last().unwrap()).norm();
    if gap > 0.1 * step {
        out.push(end);
    } else {
        *out.last_mut().unwrap() = end;
    }
    out
}

// ── Composed pipelines ──────────────────────────────────────────────────

/// A* then centripetal Catmull–Rom: the interactive per-segment path.
///
/// Returns an empty polyline when no path exists.
pub fn smooth_path(
    graph: &MeshGraph,
    start: usize,
    end: usize,
    samples_per_segment: usize,
) -> Vec<Point3<f64>> {
    let vertices = search::shortest_path(graph, start, end);
    let points: Vec<Point3<f64>> = vertices.iter().map(|&v| graph.position(v)).collect();
    smooth(&points, samples_per_segment)
}

/// Build a closed loop through user-picked surface vertices.
///
/// Filters out-of-range indices, collapses duplicates, connects
/// consecutive picks with A*, simplifies, applies the closed spline, and
/// resamples by arc length. Returns the simplified control vertices and
/// the resampled polyline as flat coordinates.
///
/// # Errors
///
/// [`GeodesicError::InsufficientPoints`] when fewer than three distinct
/// vertices survive any stage.
pub fn generate_closed_loop(
    graph: &MeshGraph,
    surface_vertices: &[usize],
) -> GeodesicResult<ClosedLoop> {
    let n = graph.vertex_count();

    // Filter out-of-range picks and collapse consecutive duplicates.
    let mut picks: Vec<usize> = Vec::with_capacity(surface_vertices.len());
    for &v in surface_vertices {
        if v < n && picks.last() != Some(&v) {
            picks.push(v);
        }
    }
    // Drop a duplicated head at the tail (callers often close the loop
    // themselves).
    if picks.len() > 1 && picks.first() == picks.last() {
        picks.pop();
    }
    if picks.len() < 3 {
        return Err(GeodesicError::InsufficientPoints { found: picks.len() });
    }

    // Connect consecutive picks (wrapping around) with A*, deduplicating
    // across segment boundaries.
    let mut loop_vertices: Vec<usize> = Vec::new();
    for i in 0..picks.len() {
        let from = picks[i];
        let to = picks[(i + 1) % picks.len()];
        let segment = search::shortest_path(graph, from, to);
        if segment.is_empty() {
            debug!(
                target: "mesh_geodesic::graph",
                from = from,
                to = to,
                "No path between consecutive loop picks, skipping segment"
            );
            continue;
        }
        for v in segment {
            if loop_vertices.last() != Some(&v) {
                loop_vertices.push(v);
            }
        }
    }
    // Remove the wrap-around duplicate left by the final segment.
    if loop_vertices.len() > 1 && loop_vertices.first() == loop_vertices.last() {
        loop_vertices.pop();
    }
    if distinct_count(&loop_vertices) < 3 {
        return Err(GeodesicError::InsufficientPoints {
            found: distinct_count(&loop_vertices),
        });
    }

    let simplified = simplify(graph, &loop_vertices, None);
    if distinct_count(&simplified) < 3 {
        return Err(GeodesicError::InsufficientPoints {
            found: distinct_count(&simplified),
        });
    }

    let control: Vec<Point3<f64>> = simplified.iter().map(|&v| graph.position(v)).collect();
    let mut smoothed = closed_smooth(&control, DEFAULT_SAMPLES_PER_SEGMENT);
    // Close the polyline explicitly so resampling lands back on the start.
    if let Some(&first) = smoothed.first() {
        smoothed.push(first);
    }
    let resampled = resample_by_arc_length(&smoothed, 2.0 * graph.average_edge_length());

    let mut polyline = Vec::with_capacity(resampled.len() * 3);
    for p in &resampled {
        polyline.extend_from_slice(&[p.x, p.y, p.z]);
    }

    Ok(ClosedLoop {
        simplified_vertices: simplified,
        polyline,
    })
}

fn distinct_count(vertices: &[usize]) -> usize {
    let mut sorted = vertices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}
