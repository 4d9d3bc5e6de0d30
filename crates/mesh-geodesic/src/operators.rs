//! Discrete differential operators on a welded triangle mesh.
//!
//! Assembles the cotangent Laplacian (positive semi-definite sign
//! convention), the lumped Voronoi mass matrix, the per-face gradient
//! operator, and cached face areas. All operators are built once and
//! treated as immutable for the solver's lifetime; there is no
//! incremental update path.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use sprs::{CsMat, TriMat};
use tracing::debug;

use crate::error::{GeodesicError, GeodesicResult};
use crate::types::MeshGeometry;

/// Faces with area at or below this threshold contribute nothing to the
/// gradient and divergence.
const DEGENERATE_AREA: f64 = 1e-12;

/// Sparse operators derived from a welded mesh.
pub struct Operators {
    /// Cotangent Laplacian, n×n, symmetric PSD (row sums zero).
    pub laplacian: CsMat<f64>,

    /// Lumped Voronoi mass diagonal, length n.
    pub mass: Vec<f64>,

    /// Per-face gradient operator, 3m×n; rows `3f..3f+3` hold face `f`'s
    /// gradient x/y/z components.
    pub gradient: CsMat<f64>,

    /// Face areas, length m.
    pub face_areas: Vec<f64>,

    /// Face areas replicated per gradient row, length 3m.
    pub face_area_weights: Vec<f64>,

    /// Faces skipped as degenerate during assembly.
    pub degenerate_faces: usize,
}

/// Cotangent of the angle at `apex` in triangle `(apex, b, c)`.
fn cotangent(apex: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let u = b - apex;
    let v = c - apex;
    let cross = u.cross(&v).norm();
    if cross < DEGENERATE_AREA {
        return 0.0;
    }
    u.dot(&v) / cross
}

impl Operators {
    /// Assemble all operators for the given geometry.
    ///
    /// # Errors
    ///
    /// [`GeodesicError::DegenerateGeometry`] when every face has
    /// near-zero area.
    pub fn build(geometry: &MeshGeometry) -> GeodesicResult<Self> {
        let n = geometry.vertex_count();
        let m = geometry.face_count();

        let mut edge_weights: HashMap<(usize, usize), f64> = HashMap::new();
        let mut mass = vec![0.0f64; n];
        let mut face_areas = vec![0.0f64; m];
        let mut gradient_triplets = TriMat::new((3 * m, n));
        let mut degenerate = 0usize;

        for (f, &[i, j, k]) in geometry.faces.iter().enumerate() {
            let pi = geometry.positions[i];
            let pj = geometry.positions[j];
            let pk = geometry.positions[k];

            let normal = (pj - pi).cross(&(pk - pi));
            let double_area = normal.norm();
            let area = 0.5 * double_area;
            face_areas[f] = area;

            if area <= DEGENERATE_AREA {
                degenerate += 1;
                continue;
            }

            // Cotangent weights: each edge gets half the cotangent of the
            // opposite angle, summed over its (at most two) faces.
            let cot_i = cotangent(&pi, &pj, &pk);
            let cot_j = cotangent(&pj, &pk, &pi);
            let cot_k = cotangent(&pk, &pi, &pj);

            let mut add_edge = |a: usize, b: usize, w: f64| {
                let key = if a < b { (a, b) } else { (b, a) };
                *edge_weights.entry(key).or_insert(0.0) += w;
            };
            add_edge(j, k, 0.5 * cot_i);
            add_edge(i, k, 0.5 * cot_j);
            add_edge(i, j, 0.5 * cot_k);

            // Hybrid Voronoi mass: circumcentric areas for non-obtuse
            // triangles, area/2 at the obtuse corner and area/4 at the
            // others otherwise.
            let l_jk_sq = (pk - pj).norm_squared();
            let l_ik_sq = (pk - pi).norm_squared();
            let l_ij_sq = (pj - pi).norm_squared();
            if cot_i >= 0.0 && cot_j >= 0.0 && cot_k >= 0.0 {
                mass[i] += (l_ij_sq * cot_k + l_ik_sq * cot_j) / 8.0;
                mass[j] += (l_ij_sq * cot_k + l_jk_sq * cot_i) / 8.0;
                mass[k] += (l_ik_sq * cot_j + l_jk_sq * cot_i) / 8.0;
            } else {
                let (half, quarter) = (area / 2.0, area / 4.0);
                if cot_i < 0.0 {
                    mass[i] += half;
                    mass[j] += quarter;
                    mass[k] += quarter;
                } else if cot_j < 0.0 {
                    mass[j] += half;
                    mass[i] += quarter;
                    mass[k] += quarter;
                } else {
                    mass[k] += half;
                    mass[i] += quarter;
                    mass[j] += quarter;
                }
            }

            // Gradient of the piecewise-linear hat functions: the basis
            // gradient for a corner is n̂ × e_opp / (2A), with e_opp the
            // opposite edge in CCW order.
            let unit_normal = normal / double_area;
            let corners = [(i, pk - pj), (j, pi - pk), (k, pj - pi)];
            for (vertex, opposite_edge) in corners {
                let basis = unit_normal.cross(&opposite_edge) / double_area;
                for d in 0..3 {
                    gradient_triplets.add_triplet(3 * f + d, vertex, basis[d]);
                }
            }
        }

        if degenerate == m {
            return Err(GeodesicError::DegenerateGeometry { face_count: m });
        }
        if degenerate > 0 {
            debug!(
                target: "mesh_geodesic::heat",
                degenerate = degenerate,
                faces = m,
                "Skipped degenerate faces during operator assembly"
            );
        }

        // Laplacian: off-diagonals -w, diagonals the negated row sums.
        let mut laplacian_triplets = TriMat::new((n, n));
        let mut diagonal = vec![0.0f64; n];
        for (&(a, b), &w) in &edge_weights {
            laplacian_triplets.add_triplet(a, b, -w);
            laplacian_triplets.add_triplet(b, a, -w);
            diagonal[a] += w;
            diagonal[b] += w;
        }
        for (v, &d) in diagonal.iter().enumerate() {
            laplacian_triplets.add_triplet(v, v, d);
        }

        // Floor the mass so vertices incident only to degenerate faces
        // cannot produce a zero pivot in the factorizations.
        for entry in &mut mass {
            if *entry < DEGENERATE_AREA {
                *entry = DEGENERATE_AREA;
            }
        }

        let mut face_area_weights = vec![0.0f64; 3 * m];
        for f in 0..m {
            for d in 0..3 {
                face_area_weights[3 * f + d] = face_areas[f];
            }
        }

        let laplacian: CsMat<f64> = laplacian_triplets.to_csr();
        let gradient: CsMat<f64> = gradient_triplets.to_csr();

        Ok(Self {
            laplacian,
            mass,
            gradient,
            face_areas,
            face_area_weights,
            degenerate_faces: degenerate,
        })
    }

    /// Number of vertices the operators were built for.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.mass.len()
    }
}

/// `y = A · x` for a CSR matrix.
pub(crate) fn mul_vec(matrix: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; matrix.rows()];
    for (row, out) in y.iter_mut().enumerate() {
        if let Some(row_view) = matrix.outer_view(row) {
            let mut sum = 0.0;
            for (col, &value) in row_view.iter() {
                sum += value * x[col];
            }
            *out = sum;
        }
    }
    y
}

/// `y = Aᵀ · x` for a CSR matrix, via row scatter.
pub(crate) fn mul_transpose_vec(matrix: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; matrix.cols()];
    for row in 0..matrix.rows() {
        if let Some(row_view) = matrix.outer_view(row) {
            for (col, &value) in row_view.iter() {
                y[col] += value * x[row];
            }
        }
    }
    y
}

/// Per-face gradient of a vertex scalar field, read out of `G · u`.
pub(crate) fn face_gradients(gradient: &CsMat<f64>, u: &[f64]) -> Vec<Vector3<f64>> {
    let stacked = mul_vec(gradient, u);
    stacked
        .chunks_exact(3)
        .map(|g| Vector3::new(g[0], g[1], g[2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weld::{weld, DEFAULT_WELD_EPSILON};
    use approx::assert_relative_eq;

    fn unit_right_triangle() -> MeshGeometry {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        weld(&positions, &[0, 1, 2], DEFAULT_WELD_EPSILON).unwrap()
    }

    fn square_geometry() -> MeshGeometry {
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        weld(&positions, &[0, 1, 2, 0, 2, 3], DEFAULT_WELD_EPSILON).unwrap()
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() {
        let ops = Operators::build(&square_geometry()).unwrap();
        let ones = vec![1.0; ops.vertex_count()];
        let result = mul_vec(&ops.laplacian, &ones);
        for value in result {
            assert_relative_eq!(value, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_laplacian_is_symmetric_and_psd_diagonal() {
        let geometry = square_geometry();
        let ops = Operators::build(&geometry).unwrap();
        let n = ops.vertex_count();
        for r in 0..n {
            let row = ops.laplacian.outer_view(r).unwrap();
            for (c, &value) in row.iter() {
                let transposed = ops
                    .laplacian
                    .outer_view(c)
                    .unwrap()
                    .iter()
                    .find(|&(cc, _)| cc == r)
                    .map(|(_, &v)| v)
                    .unwrap_or(0.0);
                assert_relative_eq!(value, transposed, epsilon = 1e-12);
                if r == c {
                    assert!(value >= 0.0, "diagonal must be non-negative");
                }
            }
        }
    }

    #[test]
    fn test_mass_total_equals_surface_area() {
        // Voronoi cells partition the surface; the mass diagonal must sum
        // to the total area (1.0 for the unit square).
        let ops = Operators::build(&square_geometry()).unwrap();
        let total: f64 = ops.mass.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gradient_of_linear_field_is_exact() {
        // For u(x, y, z) = x the per-face gradient must be exactly (1,0,0).
        let geometry = square_geometry();
        let ops = Operators::build(&geometry).unwrap();
        let u: Vec<f64> = geometry.positions.iter().map(|p| p.x).collect();
        let gradients = face_gradients(&ops.gradient, &u);
        assert_eq!(gradients.len(), geometry.face_count());
        for g in gradients {
            assert_relative_eq!(g.x, 1.0, epsilon = 1e-12);
            assert_relative_eq!(g.y, 0.0, epsilon = 1e-12);
            assert_relative_eq!(g.z, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gradient_hat_function_single_triangle() {
        let geometry = unit_right_triangle();
        let ops = Operators::build(&geometry).unwrap();
        let u = vec![1.0, 0.0, 0.0];
        let gradients = face_gradients(&ops.gradient, &u);
        // u = 1 - x - y on this triangle.
        assert_relative_eq!(gradients[0].x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(gradients[0].y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_face_contributes_zero_gradient() {
        // Second face is collinear; it must be counted and its gradient
        // rows left empty.
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            2.0, 0.0, 0.0, //
            3.0, 0.0, 0.0, //
            4.0, 0.0, 0.0, //
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let geometry = weld(&positions, &indices, DEFAULT_WELD_EPSILON).unwrap();
        let ops = Operators::build(&geometry).unwrap();
        assert_eq!(ops.degenerate_faces, 1);
        let u: Vec<f64> = (0..geometry.vertex_count()).map(|i| i as f64).collect();
        let gradients = face_gradients(&ops.gradient, &u);
        assert_relative_eq!(gradients[1].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_degenerate_is_an_error() {
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, //
        ];
        let geometry = weld(&positions, &[0, 1, 2], DEFAULT_WELD_EPSILON).unwrap();
        let result = Operators::build(&geometry);
        assert!(matches!(
            result,
            Err(GeodesicError::DegenerateGeometry { face_count: 1 })
        ));
    }

    #[test]
    fn test_mul_transpose_is_adjoint_of_mul() {
        // <G·u, w> must equal <u, Gᵀ·w>.
        let geometry = square_geometry();
        let ops = Operators::build(&geometry).unwrap();
        let u: Vec<f64> = (0..geometry.vertex_count())
            .map(|i| (i as f64) * 0.7 - 1.0)
            .collect();
        let w: Vec<f64> = (0..3 * geometry.face_count())
            .map(|i| (i as f64) * 0.5 - 2.0)
            .collect();
        let gu = mul_vec(&ops.gradient, &u);
        let gtw = mul_transpose_vec(&ops.gradient, &w);
        let lhs: f64 = gu.iter().zip(&w).map(|(a, b)| a * b).sum();
        let rhs: f64 = u.iter().zip(&gtw).map(|(a, b)| a * b).sum();
        assert_relative_eq!(lhs, rhs, epsilon = 1e-10);
    }
}
