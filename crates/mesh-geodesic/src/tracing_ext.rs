//! Tracing helpers for geodesic operations.
//!
//! Enable output by installing a subscriber in the host application and
//! setting `RUST_LOG=mesh_geodesic=debug` (or `=trace` for per-query
//! detail).

use std::time::Instant;
use tracing::{debug, info};

/// A performance timer that logs duration on drop.
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        debug!(target: "mesh_geodesic::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Create a timer that also records the mesh dimensions.
    pub fn with_context(name: &'static str, face_count: usize, vertex_count: usize) -> Self {
        debug!(
            target: "mesh_geodesic::timing",
            operation = name,
            faces = face_count,
            vertices = vertex_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "mesh_geodesic::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log summary statistics of a distance field at debug level.
pub fn log_field_stats(field: &[f64], context: &str) {
    let min = field.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = field.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    debug!(
        target: "mesh_geodesic::heat",
        context = context,
        entries = field.len(),
        min = format!("{:.4}", min),
        max = format!("{:.4}", max),
        "Distance field"
    );
}
