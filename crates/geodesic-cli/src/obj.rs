//! Minimal Wavefront OBJ reader.
//!
//! Parses only `v` and `f` records; faces with more than three corners
//! are fan-triangulated. Negative (relative) indices and texture/normal
//! references (`f v/vt/vn`) are handled; everything else is skipped.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Flat positions (`3n` coordinates) and triangle indices parsed from an
/// OBJ file.
pub struct ObjMesh {
    pub positions: Vec<f64>,
    pub indices: Vec<usize>,
}

pub fn load(path: &Path) -> Result<ObjMesh> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse(text: &str) -> Result<ObjMesh> {
    let mut positions: Vec<f64> = Vec::new();
    let mut indices: Vec<usize> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let mut coord = |name| -> Result<f64> {
                    fields
                        .next()
                        .with_context(|| format!("line {}: missing {name}", line_no + 1))?
                        .parse::<f64>()
                        .with_context(|| format!("line {}: bad {name}", line_no + 1))
                };
                let x = coord("x")?;
                let y = coord("y")?;
                let z = coord("z")?;
                positions.extend_from_slice(&[x, y, z]);
            }
            Some("f") => {
                let vertex_count = positions.len() / 3;
                let mut corners: Vec<usize> = Vec::with_capacity(4);
                for field in fields {
                    let index_text = field.split('/').next().unwrap_or(field);
                    let raw: i64 = index_text
                        .parse()
                        .with_context(|| format!("line {}: bad face index", line_no + 1))?;
                    let index = if raw < 0 {
                        // Relative to the vertices seen so far.
                        vertex_count as i64 + raw
                    } else {
                        raw - 1
                    };
                    if index < 0 || index as usize >= vertex_count {
                        bail!(
                            "line {}: face index {} out of range (have {} vertices)",
                            line_no + 1,
                            raw,
                            vertex_count
                        );
                    }
                    corners.push(index as usize);
                }
                if corners.len() < 3 {
                    bail!("line {}: face with fewer than 3 corners", line_no + 1);
                }
                for i in 1..corners.len() - 1 {
                    indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() || indices.is_empty() {
        bail!("no usable geometry (need v and f records)");
    }

    Ok(ObjMesh { positions, indices })
}
