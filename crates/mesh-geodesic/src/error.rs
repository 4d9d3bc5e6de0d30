//! Error types for geodesic operations.

use thiserror::Error;

/// Result type alias for geodesic operations.
pub type GeodesicResult<T> = Result<T, GeodesicError>;

/// Machine-readable error codes for geodesic operations.
///
/// Codes follow the pattern `GEO-XXXX` where:
/// - 1xxx = Input validation errors
/// - 2xxx = Solver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeodesicErrorCode {
    /// GEO-1001: Input mesh is empty
    EmptyMesh = 1001,
    /// GEO-1002: No valid triangles survived welding
    InvalidTriangle = 1002,
    /// GEO-1003: Vertex index out of range
    IndexOutOfRange = 1003,
    /// GEO-1004: Distance field does not match the mesh
    FieldSizeMismatch = 1004,
    /// GEO-1005: Not enough distinct vertices for a closed loop
    InsufficientPoints = 1005,

    /// GEO-2001: Solver used before construction completed
    NotInitialized = 2001,
    /// GEO-2002: Sparse factorization or solve failed
    SolverFailure = 2002,
    /// GEO-2003: Every triangle in the mesh is degenerate
    DegenerateGeometry = 2003,
}

impl GeodesicErrorCode {
    /// Returns the error code as a string in the format `GEO-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeodesicErrorCode::EmptyMesh => "GEO-1001",
            GeodesicErrorCode::InvalidTriangle => "GEO-1002",
            GeodesicErrorCode::IndexOutOfRange => "GEO-1003",
            GeodesicErrorCode::FieldSizeMismatch => "GEO-1004",
            GeodesicErrorCode::InsufficientPoints => "GEO-1005",
            GeodesicErrorCode::NotInitialized => "GEO-2001",
            GeodesicErrorCode::SolverFailure => "GEO-2002",
            GeodesicErrorCode::DegenerateGeometry => "GEO-2003",
        }
    }
}

impl std::fmt::Display for GeodesicErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during geodesic operations.
///
/// Construction-time errors abort construction and release any partial
/// state. Per-query errors return failure without mutating the solver.
#[derive(Debug, Error)]
pub enum GeodesicError {
    /// Input positions or faces are empty.
    #[error("mesh is empty: {details}")]
    EmptyMesh { details: String },

    /// No face survived welding with three distinct vertex indices.
    #[error("no valid triangles: all {dropped} faces collapsed during welding")]
    InvalidTriangle { dropped: usize },

    /// A source/target vertex index is outside `[0, n)`.
    #[error("vertex index {index} out of range: mesh has {vertex_count} vertices")]
    IndexOutOfRange { index: usize, vertex_count: usize },

    /// A distance field was passed whose length does not match the mesh.
    #[error("distance field has {actual} entries, expected {expected}")]
    FieldSizeMismatch { expected: usize, actual: usize },

    /// Closed-loop generation could not keep three distinct vertices.
    #[error("closed loop needs at least 3 distinct vertices, found {found}")]
    InsufficientPoints { found: usize },

    /// A solver method was called before construction completed.
    #[error("solver is not initialized")]
    NotInitialized,

    /// Sparse factorization or a linear solve reported non-success.
    #[error("sparse solver failed: {details}")]
    SolverFailure { details: String },

    /// Every triangle in the mesh is degenerate after welding.
    #[error("degenerate geometry: all {face_count} faces have near-zero area")]
    DegenerateGeometry { face_count: usize },
}

impl GeodesicError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> GeodesicErrorCode {
        match self {
            GeodesicError::EmptyMesh { .. } => GeodesicErrorCode::EmptyMesh,
            GeodesicError::InvalidTriangle { .. } => GeodesicErrorCode::InvalidTriangle,
            GeodesicError::IndexOutOfRange { .. } => GeodesicErrorCode::IndexOutOfRange,
            GeodesicError::FieldSizeMismatch { .. } => GeodesicErrorCode::FieldSizeMismatch,
            GeodesicError::InsufficientPoints { .. } => GeodesicErrorCode::InsufficientPoints,
            GeodesicError::NotInitialized => GeodesicErrorCode::NotInitialized,
            GeodesicError::SolverFailure { .. } => GeodesicErrorCode::SolverFailure,
            GeodesicError::DegenerateGeometry { .. } => GeodesicErrorCode::DegenerateGeometry,
        }
    }

    /// Returns a one-line recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            GeodesicError::EmptyMesh { .. } => {
                "Check that the mesh was loaded correctly and has at least one triangle"
            }
            GeodesicError::InvalidTriangle { .. } => {
                "The welding epsilon may be too large for this mesh scale; try a smaller value"
            }
            GeodesicError::IndexOutOfRange { .. } => {
                "Vertex indices are zero-based into the welded vertex array"
            }
            GeodesicError::FieldSizeMismatch { .. } => {
                "Pass the distance field returned by compute_distance for this same mesh"
            }
            GeodesicError::InsufficientPoints { .. } => {
                "Pick at least three distinct, mutually reachable vertices"
            }
            GeodesicError::NotInitialized => "Construct the solver before querying it",
            GeodesicError::SolverFailure { .. } => {
                "The mesh may contain degenerate or disconnected geometry; repair it first"
            }
            GeodesicError::DegenerateGeometry { .. } => {
                "Remove zero-area triangles or check the mesh scale against the welding epsilon"
            }
        }
    }

    // Constructor helpers

    /// Create an empty mesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        GeodesicError::EmptyMesh {
            details: details.into(),
        }
    }

    /// Create a solver failure error.
    pub fn solver_failure(details: impl Into<String>) -> Self {
        GeodesicError::SolverFailure {
            details: details.into(),
        }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(index: usize, vertex_count: usize) -> Self {
        GeodesicError::IndexOutOfRange {
            index,
            vertex_count,
        }
    }
}
