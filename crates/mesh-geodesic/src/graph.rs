//! Weighted mesh graph over welded vertices.
//!
//! The graph is the shared substrate for A* queries and path
//! post-processing: welded positions plus a symmetric adjacency list whose
//! edge weights are Euclidean edge lengths. Read-only after build.

use hashbrown::HashSet;
use nalgebra::Point3;
use tracing::info;

use crate::error::GeodesicResult;
use crate::types::MeshGeometry;
use crate::weld::{self, DEFAULT_WELD_EPSILON};

/// Undirected weighted graph of mesh edges.
#[derive(Debug, Clone)]
pub struct MeshGraph {
    geometry: MeshGeometry,
    adjacency: Vec<Vec<(usize, f64)>>,
    mean_edge_length: f64,
}

impl MeshGraph {
    /// Build a graph from flat positions (`3n` coordinates) and indexed
    /// triangles, welding coincident vertices with the default epsilon.
    pub fn build(positions: &[f64], indices: &[usize]) -> GeodesicResult<Self> {
        Self::build_with_epsilon(positions, indices, DEFAULT_WELD_EPSILON)
    }

    /// Build with an explicit welding epsilon.
    pub fn build_with_epsilon(
        positions: &[f64],
        indices: &[usize],
        merge_epsilon: f64,
    ) -> GeodesicResult<Self> {
        let geometry = weld::weld(positions, indices, merge_epsilon)?;
        Ok(Self::from_geometry(geometry))
    }

    /// Build from a raw triangle soup (every 3 consecutive positions form
    /// a face); welding recovers the shared vertices.
    pub fn from_triangle_soup(positions: &[f64]) -> GeodesicResult<Self> {
        let geometry = weld::weld_soup(positions, DEFAULT_WELD_EPSILON)?;
        Ok(Self::from_geometry(geometry))
    }

    /// Build from an already-welded geometry.
    pub fn from_geometry(geometry: MeshGeometry) -> Self {
        let n = geometry.vertex_count();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut edges: HashSet<(usize, usize)> = HashSet::new();
        let mut total_length = 0.0;

        for &[i, j, k] in &geometry.faces {
            for (a, b) in [(i, j), (j, k), (k, i)] {
                let key = if a < b { (a, b) } else { (b, a) };
                if edges.insert(key) {
                    let weight = (geometry.positions[b] - geometry.positions[a]).norm();
                    adjacency[a].push((b, weight));
                    adjacency[b].push((a, weight));
                    total_length += weight;
                }
            }
        }

        let mean_edge_length = if edges.is_empty() {
            0.01
        } else {
            total_length / edges.len() as f64
        };

        info!(
            target: "mesh_geodesic::graph",
            vertices = n,
            edges = edges.len(),
            mean_edge_length = format!("{:.4}", mean_edge_length),
            "Built mesh graph"
        );

        Self {
            geometry,
            adjacency,
            mean_edge_length,
        }
    }

    /// Number of welded vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    /// Position of a welded vertex.
    #[inline]
    pub fn position(&self, index: usize) -> Point3<f64> {
        self.geometry.position(index)
    }

    /// Welded index for an original (pre-weld) vertex index.
    #[inline]
    pub fn merged_index(&self, original: usize) -> Option<usize> {
        self.geometry.merged_index(original)
    }

    /// Mean Euclidean edge length, 0.01 when the mesh has no edges.
    #[inline]
    pub fn average_edge_length(&self) -> f64 {
        self.mean_edge_length
    }

    /// `(neighbor, edge_length)` entries for a vertex.
    #[inline]
    pub fn neighbors(&self, index: usize) -> &[(usize, f64)] {
        &self.adjacency[index]
    }

    /// The welded geometry backing this graph.
    #[inline]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }
}
