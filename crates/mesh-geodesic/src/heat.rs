//! Heat Method geodesic distance solver (Crane et al. 2013).
//!
//! Four steps per query: short-time heat diffusion, normalized negative
//! gradient field, a Poisson solve for the scalar potential, and a
//! steepest-descent walk over vertex neighbors for path extraction. Both
//! linear systems are factorized once at construction and reused across
//! queries, so repeated `compute_distance` calls cost two back-substitutions.

use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use sprs_ldl::{Ldl, LdlNumeric};
use tracing::info;

use crate::error::{GeodesicError, GeodesicResult};
use crate::operators::{self, Operators};
use crate::tracing_ext::OperationTimer;
use crate::types::{GeodesicPath, MeshGeometry, TraceOutcome};
use crate::weld::{self, DEFAULT_WELD_EPSILON};

/// Regularization added to the Poisson matrix; absorbs the constant null
/// space of the Laplacian on each connected component.
const POISSON_REGULARIZATION: f64 = 1e-8;

/// Default minimum decrease per steepest-descent step.
pub const DEFAULT_DESCENT_EPSILON: f64 = 1e-6;

/// Construction parameters for [`HeatGeodesicSolver`].
#[derive(Debug, Clone)]
pub struct SolverParams {
    /// Multiplier on `mean_edge_length²` for the diffusion time.
    pub time_scale: f64,

    /// Vertex welding epsilon.
    pub weld_epsilon: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            weld_epsilon: DEFAULT_WELD_EPSILON,
        }
    }
}

/// Reusable Heat Method solver with pre-factorized linear systems.
///
/// Built once per mesh; `compute_distance` and `trace_path` are read-only
/// afterwards. The factorizations are owned exclusively by the solver and
/// invalidated only by rebuilding it.
pub struct HeatGeodesicSolver {
    geometry: MeshGeometry,
    operators: Operators,
    heat_factorization: LdlNumeric<f64, usize>,
    poisson_factorization: LdlNumeric<f64, usize>,
    adjacency: Vec<Vec<usize>>,
    time_step: f64,
}

impl HeatGeodesicSolver {
    /// Build a solver from flat positions (`3n` coordinates) and indexed
    /// triangles with default parameters.
    pub fn new(positions: &[f64], faces: &[usize]) -> GeodesicResult<Self> {
        Self::with_params(positions, faces, &SolverParams::default())
    }

    /// Build with explicit parameters.
    pub fn with_params(
        positions: &[f64],
        faces: &[usize],
        params: &SolverParams,
    ) -> GeodesicResult<Self> {
        let geometry = weld::weld(positions, faces, params.weld_epsilon)?;
        Self::from_geometry(geometry, params.time_scale)
    }

    /// Build from a raw triangle soup (every 3 consecutive positions form
    /// a face).
    pub fn from_triangle_soup(positions: &[f64]) -> GeodesicResult<Self> {
        let geometry = weld::weld_soup(positions, DEFAULT_WELD_EPSILON)?;
        Self::from_geometry(geometry, 1.0)
    }

    /// Build from an already-welded geometry.
    pub fn from_geometry(geometry: MeshGeometry, time_scale: f64) -> GeodesicResult<Self> {
        let _timer = OperationTimer::with_context(
            "heat_solver_build",
            geometry.face_count(),
            geometry.vertex_count(),
        );

        let operators = Operators::build(&geometry)?;
        let n = geometry.vertex_count();

        let mean_edge = geometry.mean_edge_length();
        let time_step = (time_scale * mean_edge * mean_edge).max(1e-7);

        let heat_matrix = assemble_shifted(&operators.laplacian, &operators.mass, time_step, 1.0);
        let poisson_matrix =
            assemble_shifted(&operators.laplacian, &operators.mass, 1.0, POISSON_REGULARIZATION);

        let heat_factorization = factorize(&heat_matrix, "heat diffusion")?;
        let poisson_factorization = factorize(&poisson_matrix, "Poisson")?;

        let adjacency = geometry.vertex_adjacency();

        info!(
            target: "mesh_geodesic::heat",
            vertices = n,
            faces = geometry.face_count(),
            time_step = format!("{:.3e}", time_step),
            "Heat solver factorized"
        );

        Ok(Self {
            geometry,
            operators,
            heat_factorization,
            poisson_factorization,
            adjacency,
            time_step,
        })
    }

    /// Number of welded vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    /// Welded vertex positions.
    #[inline]
    pub fn positions(&self) -> &[nalgebra::Point3<f64>] {
        &self.geometry.positions
    }

    /// Welded faces.
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.geometry.faces
    }

    /// Welded index for an original (pre-weld) vertex index.
    #[inline]
    pub fn merged_index(&self, original: usize) -> Option<usize> {
        self.geometry.merged_index(original)
    }

    /// Diffusion time used by the heat step.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Solve for the geodesic distance field from one or more sources.
    ///
    /// Pure given the cached factorizations: the result depends only on
    /// `sources` and the mesh.
    ///
    /// # Errors
    ///
    /// - [`GeodesicError::EmptyMesh`] when `sources` is empty.
    /// - [`GeodesicError::IndexOutOfRange`] for a bad source index.
    /// - [`GeodesicError::SolverFailure`] when a linear solve produces
    ///   non-finite values.
    pub fn compute_distance(&self, sources: &[usize]) -> GeodesicResult<Vec<f64>> {
        if sources.is_empty() {
            return Err(GeodesicError::empty_mesh("no source vertices"));
        }
        let n = self.vertex_count();
        for &s in sources {
            if s >= n {
                return Err(GeodesicError::index_out_of_range(s, n));
            }
        }

        // Step 1: short-time diffusion of the source indicator,
        // (M + tL)·u = M·δ.
        let mut rhs = vec![0.0; n];
        for &s in sources {
            rhs[s] = self.operators.mass[s];
        }
        let u = self.solve(&self.heat_factorization, rhs, "heat diffusion")?;

        // Step 2: normalized negative gradient per face.
        let gradients = operators::face_gradients(&self.operators.gradient, &u);
        let normalized: Vec<nalgebra::Vector3<f64>> = gradients
            .par_iter()
            .map(|g| {
                let norm = g.norm();
                if norm > 1e-12 {
                    -(*g) / norm
                } else {
                    nalgebra::Vector3::zeros()
                }
            })
            .collect();
        let mut field = Vec::with_capacity(3 * normalized.len());
        for unit in &normalized {
            field.extend_from_slice(&[unit.x, unit.y, unit.z]);
        }

        // Step 3: integrated divergence, div = −Gᵀ(A ⊙ X).
        let weighted: Vec<f64> = field
            .iter()
            .zip(&self.operators.face_area_weights)
            .map(|(x, a)| x * a)
            .collect();
        let divergence: Vec<f64> = operators::mul_transpose_vec(&self.operators.gradient, &weighted)
            .into_iter()
            .map(|v| -v)
            .collect();

        // Step 4: Poisson solve and affine shift to a non-negative field.
        let phi = self.solve(&self.poisson_factorization, divergence, "Poisson")?;
        let reference = phi.iter().cloned().fold(f64::INFINITY, f64::min);
        Ok(phi.into_iter().map(|p| (p - reference).max(0.0)).collect())
    }

    /// Trace a steepest-descent path from `target` back to `source` with
    /// the default descent epsilon.
    pub fn trace_path(
        &self,
        distance_field: &[f64],
        source: usize,
        target: usize,
    ) -> GeodesicResult<GeodesicPath> {
        self.trace_path_with_epsilon(distance_field, source, target, DEFAULT_DESCENT_EPSILON)
    }

    /// Trace with an explicit minimum decrease per step.
    ///
    /// Walks greedily from `target` to the neighbor with the smallest
    /// field value, stepping only on a decrease greater than
    /// `descent_epsilon`; iterations are capped at `2n`. When the walk
    /// halts at a local minimum before reaching `source`, the source is
    /// prepended and the result is marked [`TraceOutcome::Stalled`].
    pub fn trace_path_with_epsilon(
        &self,
        distance_field: &[f64],
        source: usize,
        target: usize,
        descent_epsilon: f64,
    ) -> GeodesicResult<GeodesicPath> {
        let n = self.vertex_count();
        if distance_field.len() != n {
            return Err(GeodesicError::FieldSizeMismatch {
                expected: n,
                actual: distance_field.len(),
            });
        }
        if source >= n {
            return Err(GeodesicError::index_out_of_range(source, n));
        }
        if target >= n {
            return Err(GeodesicError::index_out_of_range(target, n));
        }

        let mut reversed = Vec::with_capacity(16);
        reversed.push(target);

        let mut current = target;
        let max_steps = 2 * n;
        for _ in 0..max_steps {
            if current == source {
                break;
            }
            let mut best_value = distance_field[current];
            let mut best_neighbor = current;
            for &neighbor in &self.adjacency[current] {
                let value = distance_field[neighbor];
                if value + descent_epsilon < best_value {
                    best_value = value;
                    best_neighbor = neighbor;
                }
            }
            if best_neighbor == current {
                // Local minimum: descent cannot make progress.
                break;
            }
            current = best_neighbor;
            reversed.push(current);
        }

        let outcome = if *reversed.last().unwrap() == source {
            TraceOutcome::Reached
        } else {
            reversed.push(source);
            TraceOutcome::Stalled
        };
        reversed.reverse();

        let polyline = reversed
            .iter()
            .map(|&v| self.geometry.position(v))
            .collect();

        Ok(GeodesicPath {
            vertices: reversed,
            polyline,
            length: distance_field[target],
            outcome,
        })
    }

    fn solve(
        &self,
        factorization: &LdlNumeric<f64, usize>,
        rhs: Vec<f64>,
        stage: &str,
    ) -> GeodesicResult<Vec<f64>> {
        let solution = factorization.solve(&rhs);
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(GeodesicError::solver_failure(format!(
                "{stage} solve produced non-finite values"
            )));
        }
        Ok(solution)
    }
}

/// Assemble `beta·M + alpha·L` as a CSC matrix ready for factorization.
fn assemble_shifted(laplacian: &CsMat<f64>, mass: &[f64], alpha: f64, beta: f64) -> CsMat<f64> {
    let n = mass.len();
    let mut triplets = TriMat::new((n, n));
    for row in 0..n {
        if let Some(row_view) = laplacian.outer_view(row) {
            for (col, &value) in row_view.iter() {
                triplets.add_triplet(row, col, alpha * value);
            }
        }
    }
    for (v, &m) in mass.iter().enumerate() {
        triplets.add_triplet(v, v, beta * m);
    }
    triplets.to_csc()
}

fn factorize(matrix: &CsMat<f64>, stage: &str) -> GeodesicResult<LdlNumeric<f64, usize>> {
    Ldl::new()
        .check_symmetry(sprs::SymmetryCheck::DontCheckSymmetry)
        .fill_in_reduction(sprs::FillInReduction::ReverseCuthillMcKee)
        .numeric(matrix.view())
        .map_err(|e| GeodesicError::solver_failure(format!("{stage} factorization: {e}")))
}
