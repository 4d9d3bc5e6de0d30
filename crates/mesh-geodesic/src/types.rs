//! Core welded-mesh data types.

use nalgebra::Point3;

/// A welded triangle mesh: canonical vertex positions, faces rewritten to
/// welded indices, and the map from original to welded indices.
///
/// Produced by [`crate::weld::weld`]. Immutable once built; the solver and
/// the graph both borrow or own one of these.
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    /// Canonical vertex positions after welding.
    pub positions: Vec<Point3<f64>>,

    /// Triangle faces as welded vertex indices, all three distinct.
    pub faces: Vec<[usize; 3]>,

    /// For every original vertex, the welded index it maps to.
    pub orig_to_welded: Vec<usize>,

    /// Faces dropped because welding collapsed two or more of their corners.
    pub dropped_faces: usize,

    /// Epsilon the coordinates were quantized with.
    pub weld_epsilon: f64,
}

impl MeshGeometry {
    /// Number of welded vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of surviving faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Position of a welded vertex.
    #[inline]
    pub fn position(&self, index: usize) -> Point3<f64> {
        self.positions[index]
    }

    /// Welded index for an original (pre-weld) vertex index, if in range.
    #[inline]
    pub fn merged_index(&self, original: usize) -> Option<usize> {
        self.orig_to_welded.get(original).copied()
    }

    /// Mean length over the deduplicated undirected edge set.
    ///
    /// Falls back to 0.01 when the mesh has no edges.
    pub fn mean_edge_length(&self) -> f64 {
        let mut seen = hashbrown::HashSet::new();
        let mut total = 0.0;
        let mut count = 0usize;
        for &[i, j, k] in &self.faces {
            for (a, b) in [(i, j), (j, k), (k, i)] {
                let key = if a < b { (a, b) } else { (b, a) };
                if seen.insert(key) {
                    total += (self.positions[b] - self.positions[a]).norm();
                    count += 1;
                }
            }
        }
        if count == 0 {
            0.01
        } else {
            total / count as f64
        }
    }

    /// Sorted, duplicate-free vertex adjacency derived from the faces.
    pub fn vertex_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.positions.len()];
        for &[i, j, k] in &self.faces {
            for (a, b) in [(i, j), (j, k), (k, i)] {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
        adjacency
    }
}

/// Outcome of a steepest-descent trace.
///
/// `Stalled` means the walk hit a local minimum of the distance field
/// before reaching the source; the returned path is a best-effort prefix
/// with the source prepended so the polyline stays well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// The walk reached the requested source vertex.
    Reached,
    /// Descent halted at a local minimum before the source.
    Stalled,
}

/// A traced geodesic path from source to target.
#[derive(Debug, Clone)]
pub struct GeodesicPath {
    /// Welded vertex indices, ordered source → target.
    pub vertices: Vec<usize>,

    /// World-space polyline sampled at the path vertices.
    pub polyline: Vec<Point3<f64>>,

    /// Distance-field value at the target vertex.
    pub length: f64,

    /// Whether the descent reached the source.
    pub outcome: TraceOutcome,
}

impl GeodesicPath {
    /// True when the descent stalled at a local minimum.
    #[inline]
    pub fn is_stalled(&self) -> bool {
        self.outcome == TraceOutcome::Stalled
    }
}

/// Result of closed-loop generation: the simplified control vertices and
/// the arc-length resampled polyline as flat `[x, y, z, …]` coordinates.
#[derive(Debug, Clone)]
pub struct ClosedLoop {
    /// Simplified welded vertex indices along the loop.
    pub simplified_vertices: Vec<usize>,

    /// Resampled polyline, flat coordinate triples.
    pub polyline: Vec<f64>,
}
