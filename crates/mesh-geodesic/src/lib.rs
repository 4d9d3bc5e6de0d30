//! Geodesic distances and shortest paths on triangle meshes.
//!
//! This crate implements two complementary path engines over a shared
//! welded mesh representation:
//!
//! - **Heat Method solver** ([`HeatGeodesicSolver`]): smooth geodesic
//!   distance fields via two pre-factorized sparse solves, plus
//!   steepest-descent path extraction. Build once per mesh, query many
//!   times.
//! - **Graph A\*** ([`MeshGraph`]): edge-only shortest paths with an
//!   indexed binary min-heap, feeding Douglas–Peucker simplification and
//!   centripetal Catmull–Rom smoothing for interactive display.
//!
//! Both accept a triangle soup or indexed triangles; coincident vertices
//! are welded into a canonical vertex set first (configurable epsilon,
//! default `1e-5` world units).
//!
//! # Quick Start
//!
//! ```
//! use mesh_geodesic::{HeatGeodesicSolver, MeshGraph};
//!
//! // A unit right triangle.
//! let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
//! let faces = [0usize, 1, 2];
//!
//! // Smooth geodesic distance + traced polyline.
//! let solver = HeatGeodesicSolver::new(&positions, &faces).unwrap();
//! let distances = solver.compute_distance(&[0]).unwrap();
//! let path = solver.trace_path(&distances, 0, 1).unwrap();
//! assert_eq!(path.vertices, vec![0, 1]);
//!
//! // Discrete edge-following shortest path.
//! let graph = MeshGraph::build(&positions, &faces).unwrap();
//! assert_eq!(graph.shortest_path(0, 1), vec![0, 1]);
//! ```
//!
//! # Units and determinism
//!
//! The crate is unit-agnostic; the default welding epsilon assumes
//! roughly unit-scale coordinates. Results are deterministic across runs
//! on the same platform for identical inputs; bit-exact floating-point
//! reproducibility across platforms is not promised.
//!
//! # Error Handling
//!
//! Operations return [`GeodesicResult<T>`]. Construction errors abort
//! construction; per-query errors leave the solver untouched. A failed
//! sparse solve is reported as [`GeodesicError::SolverFailure`]; the
//! crate never silently returns wrong numerical output.

mod error;
mod types;

pub mod graph;
pub mod heat;
pub mod operators;
pub mod path;
pub mod search;
pub mod tracing_ext;
pub mod weld;

// Re-export core types at crate root
pub use error::{GeodesicError, GeodesicErrorCode, GeodesicResult};
pub use graph::MeshGraph;
pub use heat::{HeatGeodesicSolver, SolverParams, DEFAULT_DESCENT_EPSILON};
pub use types::{ClosedLoop, GeodesicPath, MeshGeometry, TraceOutcome};
pub use weld::DEFAULT_WELD_EPSILON;

// Convenience methods on MeshGraph
impl MeshGraph {
    /// A* shortest path between two welded vertices.
    ///
    /// Returns the vertex sequence including both endpoints, `[start]`
    /// when `start == end`, and an empty vector when either endpoint is
    /// out of range or unreachable.
    pub fn shortest_path(&self, start: usize, end: usize) -> Vec<usize> {
        search::shortest_path(self, start, end)
    }

    /// A* then centripetal Catmull–Rom smoothing; the interactive
    /// per-segment path. Empty when no path exists.
    pub fn smooth_path(
        &self,
        start: usize,
        end: usize,
        samples_per_segment: usize,
    ) -> Vec<nalgebra::Point3<f64>> {
        path::smooth_path(self, start, end, samples_per_segment)
    }

    /// Douglas–Peucker simplification of a vertex path on this graph.
    ///
    /// `epsilon` defaults to `0.1 × average_edge_length`.
    pub fn simplify(&self, vertices: &[usize], epsilon: Option<f64>) -> Vec<usize> {
        path::simplify(self, vertices, epsilon)
    }

    /// Build a closed, smoothed, arc-length resampled loop through
    /// user-picked surface vertices.
    pub fn generate_closed_loop(&self, surface_vertices: &[usize]) -> GeodesicResult<ClosedLoop> {
        path::generate_closed_loop(self, surface_vertices)
    }

    /// Resample a polyline at equal arc-length spacing.
    ///
    /// `spacing` defaults to `2 × average_edge_length`.
    pub fn resample_by_arc_length(
        &self,
        points: &[nalgebra::Point3<f64>],
        spacing: Option<f64>,
    ) -> Vec<nalgebra::Point3<f64>> {
        path::resample_by_arc_length(
            points,
            spacing.unwrap_or(2.0 * self.average_edge_length()),
        )
    }
}
