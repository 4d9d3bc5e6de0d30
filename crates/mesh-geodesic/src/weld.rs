//! Coincident-vertex welding.
//!
//! Triangle soups (and meshes exported per-face) duplicate vertices; every
//! consumer in this crate works on a canonical welded vertex set instead.
//! Welding quantizes each coordinate by `round(x / epsilon)` into an
//! integer bucket key; the first vertex seen in a bucket is canonical and
//! later vertices in the same bucket map to it.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::error::{GeodesicError, GeodesicResult};
use crate::types::MeshGeometry;

/// Default welding epsilon in world units.
pub const DEFAULT_WELD_EPSILON: f64 = 1e-5;

/// Weld a flat position array (`3n` coordinates) and indexed triangles
/// (`3m` indices) into a canonical [`MeshGeometry`].
///
/// Faces whose three welded indices are not all distinct are dropped and
/// counted. Deterministic given input order: ties within a bucket always
/// resolve to the earliest original vertex.
///
/// # Errors
///
/// - [`GeodesicError::EmptyMesh`] when positions or faces are empty.
/// - [`GeodesicError::InvalidTriangle`] when no face survives welding.
pub fn weld(positions: &[f64], indices: &[usize], epsilon: f64) -> GeodesicResult<MeshGeometry> {
    if positions.is_empty() {
        return Err(GeodesicError::empty_mesh("no vertex positions"));
    }
    if indices.is_empty() {
        return Err(GeodesicError::empty_mesh("no faces"));
    }

    let original_count = positions.len() / 3;
    let quantize = |v: f64| -> i64 { (v / epsilon).round() as i64 };

    let mut buckets: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut welded: Vec<Point3<f64>> = Vec::new();
    let mut orig_to_welded: Vec<usize> = Vec::with_capacity(original_count);

    for i in 0..original_count {
        let p = Point3::new(positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]);
        let key = (quantize(p.x), quantize(p.y), quantize(p.z));
        let index = *buckets.entry(key).or_insert_with(|| {
            let index = welded.len();
            welded.push(p);
            index
        });
        orig_to_welded.push(index);
    }

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(indices.len() / 3);
    let mut dropped = 0usize;
    for face in indices.chunks_exact(3) {
        if face.iter().any(|&v| v >= original_count) {
            return Err(GeodesicError::index_out_of_range(
                *face.iter().find(|&&v| v >= original_count).unwrap(),
                original_count,
            ));
        }
        let a = orig_to_welded[face[0]];
        let b = orig_to_welded[face[1]];
        let c = orig_to_welded[face[2]];
        if a != b && b != c && a != c {
            faces.push([a, b, c]);
        } else {
            dropped += 1;
        }
    }

    if faces.is_empty() {
        return Err(GeodesicError::InvalidTriangle { dropped });
    }

    if dropped > 0 {
        debug!(
            target: "mesh_geodesic::weld",
            dropped = dropped,
            "Dropped faces with coincident corners"
        );
    }
    info!(
        target: "mesh_geodesic::weld",
        original_vertices = original_count,
        welded_vertices = welded.len(),
        faces = faces.len(),
        epsilon = epsilon,
        "Welded mesh"
    );

    Ok(MeshGeometry {
        positions: welded,
        faces,
        orig_to_welded,
        dropped_faces: dropped,
        weld_epsilon: epsilon,
    })
}

/// Weld a raw triangle soup: every three consecutive positions form a face.
pub fn weld_soup(positions: &[f64], epsilon: f64) -> GeodesicResult<MeshGeometry> {
    let vertex_count = positions.len() / 3;
    let indices: Vec<usize> = (0..vertex_count).collect();
    weld(positions, &indices, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weld_merges_coincident_vertices() {
        // Two triangles sharing an edge, with the shared vertices duplicated.
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let geometry = weld(&positions, &indices, DEFAULT_WELD_EPSILON).unwrap();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.face_count(), 2);
        assert_eq!(geometry.merged_index(0), geometry.merged_index(3));
        assert_eq!(geometry.merged_index(2), geometry.merged_index(4));
    }

    #[test]
    fn test_weld_within_epsilon() {
        let eps = 1e-3;
        let positions = [
            0.0, 0.0, 0.0, //
            1e-4, -1e-4, 0.0, // same bucket as the first vertex at eps=1e-3
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        let indices = [1, 2, 3];
        let geometry = weld(&positions, &indices, eps).unwrap();
        assert_eq!(geometry.merged_index(0), geometry.merged_index(1));
        assert_eq!(geometry.vertex_count(), 3);
    }

    #[test]
    fn test_weld_drops_collapsed_faces() {
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        // Second face repeats vertex 0.
        let indices = [0, 1, 2, 0, 0, 1];
        let geometry = weld(&positions, &indices, DEFAULT_WELD_EPSILON).unwrap();
        assert_eq!(geometry.face_count(), 1);
        assert_eq!(geometry.dropped_faces, 1);
    }

    #[test]
    fn test_weld_rejects_empty_input() {
        assert!(matches!(
            weld(&[], &[0, 1, 2], DEFAULT_WELD_EPSILON),
            Err(GeodesicError::EmptyMesh { .. })
        ));
        assert!(matches!(
            weld(&[0.0, 0.0, 0.0], &[], DEFAULT_WELD_EPSILON),
            Err(GeodesicError::EmptyMesh { .. })
        ));
    }

    #[test]
    fn test_weld_fails_when_no_face_survives() {
        let positions = [
            0.0, 0.0, 0.0, //
            1e-7, 0.0, 0.0, //
            0.0, 1e-7, 0.0, //
        ];
        // All three corners collapse into one bucket at the default epsilon.
        let result = weld(&positions, &[0, 1, 2], DEFAULT_WELD_EPSILON);
        assert!(matches!(
            result,
            Err(GeodesicError::InvalidTriangle { dropped: 1 })
        ));
    }

    #[test]
    fn test_weld_soup() {
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        let geometry = weld_soup(&positions, DEFAULT_WELD_EPSILON).unwrap();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.face_count(), 2);
    }

    #[test]
    fn test_weld_out_of_range_face_index() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let result = weld(&positions, &[0, 1, 7], DEFAULT_WELD_EPSILON);
        assert!(matches!(
            result,
            Err(GeodesicError::IndexOutOfRange { index: 7, .. })
        ));
    }
}
