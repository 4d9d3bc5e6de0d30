//! Property-based tests for welding, graph construction, and path
//! post-processing.
//!
//! Run with: cargo test -p mesh-geodesic -- proptest

use mesh_geodesic::{path, MeshGraph};
use nalgebra::Point3;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A bounded random 3D point.
fn arb_point() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-100.0..100.0f64)
}

/// A random open polyline with 3 to 10 control points.
fn arb_polyline() -> impl Strategy<Value = Vec<Point3<f64>>> {
    prop::collection::vec(arb_point(), 3..10)
        .prop_map(|pts| pts.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect())
}

/// A grid mesh as (positions, indices), n+1 x n+1 vertices.
fn grid_mesh(n: usize) -> (Vec<f64>, Vec<usize>) {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            positions.extend_from_slice(&[i as f64, j as f64, 0.0]);
        }
    }
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            indices.extend_from_slice(&[v00, v00 + 1, v00 + n + 2]);
            indices.extend_from_slice(&[v00, v00 + n + 2, v00 + n + 1]);
        }
    }
    (positions, indices)
}

/// A soup built from a pool of points: each face re-emits its corner
/// coordinates, so welding has real work to do.
fn arb_soup() -> impl Strategy<Value = Vec<f64>> {
    (
        prop::collection::vec(arb_point(), 4..12),
        prop::collection::vec((0usize..100, 0usize..100, 0usize..100), 1..20),
    )
        .prop_map(|(pool, faces)| {
            let n = pool.len();
            let mut soup = Vec::new();
            for (a, b, c) in faces {
                for corner in [a % n, b % n, c % n] {
                    soup.extend_from_slice(&pool[corner]);
                }
            }
            soup
        })
}

// =============================================================================
// Welding and graph invariants
// =============================================================================

proptest! {
    /// Coincident soup corners always weld to the same index.
    #[test]
    fn prop_weld_merges_equal_coordinates(soup in arb_soup()) {
        let Ok(graph) = MeshGraph::from_triangle_soup(&soup) else {
            // Every face collapsed; nothing to check.
            return Ok(());
        };
        let geometry = graph.geometry();
        let n = soup.len() / 3;
        for a in 0..n {
            for b in (a + 1)..n {
                if soup[3 * a..3 * a + 3] == soup[3 * b..3 * b + 3] {
                    prop_assert_eq!(
                        geometry.merged_index(a),
                        geometry.merged_index(b)
                    );
                }
            }
        }
    }

    /// Adjacency is symmetric, deduplicated, and free of self-loops.
    #[test]
    fn prop_graph_symmetry(soup in arb_soup()) {
        let Ok(graph) = MeshGraph::from_triangle_soup(&soup) else {
            return Ok(());
        };
        for v in 0..graph.vertex_count() {
            let mut seen = std::collections::HashSet::new();
            for &(u, w) in graph.neighbors(v) {
                prop_assert_ne!(u, v, "self-loop at {}", v);
                prop_assert!(seen.insert(u), "duplicate edge {} -> {}", v, u);
                let reciprocal = graph
                    .neighbors(u)
                    .iter()
                    .find(|&&(x, _)| x == v);
                prop_assert!(reciprocal.is_some(), "missing edge {} -> {}", u, v);
                prop_assert_eq!(reciprocal.unwrap().1, w);
            }
        }
    }
}

// =============================================================================
// A* optimality
// =============================================================================

proptest! {
    /// A* path length equals the Dijkstra optimum on grid meshes.
    #[test]
    fn prop_astar_matches_dijkstra(
        n in 2usize..6,
        seed_start in 0usize..1000,
        seed_end in 0usize..1000,
    ) {
        let (positions, indices) = grid_mesh(n);
        let graph = MeshGraph::build(&positions, &indices).unwrap();
        let count = graph.vertex_count();
        let start = seed_start % count;
        let end = seed_end % count;

        let path = graph.shortest_path(start, end);
        prop_assert!(!path.is_empty());
        prop_assert_eq!(*path.first().unwrap(), start);
        prop_assert_eq!(*path.last().unwrap(), end);

        // The path is a walk in the graph.
        for pair in path.windows(2) {
            prop_assert!(graph.neighbors(pair[0]).iter().any(|&(u, _)| u == pair[1]));
        }

        let astar_len: f64 = path
            .windows(2)
            .map(|p| (graph.position(p[1]) - graph.position(p[0])).norm())
            .sum();
        let optimum = dijkstra(&graph, start)[end];
        prop_assert!((astar_len - optimum).abs() < 1e-9,
            "A* {} vs Dijkstra {}", astar_len, optimum);
    }
}

fn dijkstra(graph: &MeshGraph, start: usize) -> Vec<f64> {
    let n = graph.vertex_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut visited = vec![false; n];
    dist[start] = 0.0;
    for _ in 0..n {
        let mut best: Option<usize> = None;
        for v in 0..n {
            if !visited[v]
                && dist[v].is_finite()
                && best.map_or(true, |b| dist[v] < dist[b])
            {
                best = Some(v);
            }
        }
        let Some(v) = best else { break };
        visited[v] = true;
        for &(u, w) in graph.neighbors(v) {
            if dist[v] + w < dist[u] {
                dist[u] = dist[v] + w;
            }
        }
    }
    dist
}

// =============================================================================
// Path post-processing invariants
// =============================================================================

proptest! {
    /// Simplification is idempotent at a fixed epsilon.
    #[test]
    fn prop_simplify_idempotent(
        n in 2usize..6,
        seed_start in 0usize..1000,
        seed_end in 0usize..1000,
        epsilon in 0.01f64..1.0,
    ) {
        let (positions, indices) = grid_mesh(n);
        let graph = MeshGraph::build(&positions, &indices).unwrap();
        let count = graph.vertex_count();
        let path = graph.shortest_path(seed_start % count, seed_end % count);
        let once = graph.simplify(&path, Some(epsilon));
        let twice = graph.simplify(&once, Some(epsilon));
        prop_assert_eq!(once, twice);
    }

    /// Simplification always keeps the endpoints.
    #[test]
    fn prop_simplify_keeps_endpoints(
        n in 2usize..6,
        seed_start in 0usize..1000,
        seed_end in 0usize..1000,
    ) {
        let (positions, indices) = grid_mesh(n);
        let graph = MeshGraph::build(&positions, &indices).unwrap();
        let count = graph.vertex_count();
        let path = graph.shortest_path(seed_start % count, seed_end % count);
        let simplified = graph.simplify(&path, None);
        prop_assert_eq!(simplified.first(), path.first());
        prop_assert_eq!(simplified.last(), path.last());
    }

    /// Open smoothing interpolates both endpoints and emits the promised
    /// sample count.
    #[test]
    fn prop_smooth_endpoints(points in arb_polyline(), samples in 1usize..8) {
        let out = path::smooth(&points, samples);
        prop_assert_eq!(out.len(), (points.len() - 1) * samples + 1);
        let head_gap = (out[0] - points[0]).norm();
        let tail_gap = (out[out.len() - 1] - points[points.len() - 1]).norm();
        prop_assert!(head_gap < 1e-9, "head gap {}", head_gap);
        prop_assert!(tail_gap < 1e-9, "tail gap {}", tail_gap);
    }

    /// Resampling preserves endpoints and keeps sample gaps within 10% of
    /// the nominal spacing (except possibly the final interval).
    #[test]
    fn prop_resample_spacing(points in arb_polyline(), spacing in 0.5f64..50.0) {
        let out = path::resample_by_arc_length(&points, spacing);
        prop_assert!(out.len() >= 2);
        prop_assert_eq!(out[0], points[0]);
        prop_assert_eq!(out[out.len() - 1], points[points.len() - 1]);

        let total: f64 = points.windows(2).map(|p| (p[1] - p[0]).norm()).sum();
        let step = total / (out.len().saturating_sub(2).max(1)) as f64;
        // Consecutive arc-length differences along the resampled polyline
        // stay near-uniform; chord lengths can only be shorter, so bound
        // them above by the step plus slack.
        for pair in out.windows(2).take(out.len().saturating_sub(2)) {
            let gap = (pair[1] - pair[0]).norm();
            prop_assert!(gap <= step * 1.1 + 1e-9, "gap {} vs step {}", gap, step);
        }
    }
}
