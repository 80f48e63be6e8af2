//! Topography maps and command-text export.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::core::GridIndex;
use crate::mesh::MeshGrid;

/// Character width of one human-readable cell, brackets included
const CELL_WIDTH: usize = 8;

/// Mesh map layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapFormat {
    /// Bordered grid with coordinate headers
    Human {
        /// Omit the spacer rows between grid rows
        compact: bool,
    },
    /// Tab-separated values
    Csv,
    /// One space-separated line per row for host software
    Host,
}

impl MapFormat {
    /// Format selected by a `T` map code (0 human, 1 CSV, 2 host).
    pub fn from_code(code: u8, compact: bool) -> Option<Self> {
        match code {
            0 => Some(MapFormat::Human { compact }),
            1 => Some(MapFormat::Csv),
            2 => Some(MapFormat::Host),
            _ => None,
        }
    }
}

/// Render the mesh, top row (highest Y) first.
///
/// `current` marks the cell under the nozzle in the human layout. `idle` is
/// called once per rendered row so the host can service other duties.
pub fn render_map(
    mesh: &MeshGrid,
    format: MapFormat,
    current: Option<GridIndex>,
    mut idle: impl FnMut(),
) -> String {
    let geometry = mesh.geometry();
    let (width, height) = (geometry.width(), geometry.height());
    let mut out = String::new();

    match format {
        MapFormat::Human { .. } => out.push_str("\nBed Topography Report:\n\n"),
        MapFormat::Csv => out.push_str("\nBed Topography Report for CSV:\n\n"),
        MapFormat::Host => {}
    }

    if let MapFormat::Human { .. } = format {
        push_column_labels(&mut out, width);
        push_corners(&mut out, mesh, geometry.height() - 1);
    }

    for y in (0..height).rev() {
        match format {
            MapFormat::Human { compact } => {
                let _ = write!(out, "{:3} |", y);
                for x in 0..width {
                    let Some(idx) = mesh.index(x, y) else { continue };
                    let marked = current == Some(idx);
                    out.push(if marked { '[' } else { ' ' });
                    out.push_str(&human_value(mesh.get(idx)));
                    out.push(if marked { ']' } else { ' ' });
                }
                out.push_str(" |\n");
                if y > 0 && !compact {
                    let _ = writeln!(out, "    |{} |", " ".repeat(width * CELL_WIDTH));
                }
            }
            MapFormat::Csv => {
                let row: Vec<String> = (0..width)
                    .filter_map(|x| mesh.index(x, y))
                    .map(|idx| match mesh.get(idx) {
                        z if z.is_nan() => "NAN".to_string(),
                        z => format!("{:.3}", z),
                    })
                    .collect();
                out.push_str(&row.join("\t"));
                out.push('\n');
            }
            MapFormat::Host => {
                let row: Vec<String> = (0..width)
                    .filter_map(|x| mesh.index(x, y))
                    .map(|idx| match mesh.get(idx) {
                        z if z.is_nan() => "nan".to_string(),
                        z => format!("{:.3}", z),
                    })
                    .collect();
                out.push_str(&row.join(" "));
                out.push('\n');
            }
        }
        idle();
    }

    if let MapFormat::Human { .. } = format {
        push_corners(&mut out, mesh, 0);
        push_column_labels(&mut out, width);
    }
    out
}

fn human_value(z: f32) -> String {
    if z.is_nan() {
        "  .   ".to_string()
    } else if z == 0.0 {
        " 0.000".to_string()
    } else {
        format!("{:>+6.3}", z)
    }
}

fn push_column_labels(out: &mut String, width: usize) {
    out.push_str("     ");
    for x in 0..width {
        let _ = write!(out, "{:^w$}", x, w = CELL_WIDTH);
    }
    out.push('\n');
}

fn push_corners(out: &mut String, mesh: &MeshGrid, y: usize) {
    let geometry = mesh.geometry();
    let yy = geometry.y_pos(y);
    let left = format!("({:.0},{:.0})", geometry.min().x, yy);
    let right = format!("({:.0},{:.0})", geometry.max().x, yy);
    let span = (geometry.width() * CELL_WIDTH + 5).saturating_sub(left.len());
    let _ = writeln!(out, "{}{:>w$}", left, right, w = span);
}

/// Mesh as replayable commands: `G29 I<cells>` then one `M421` per defined
/// cell.
pub fn export_mesh(mesh: &MeshGrid) -> String {
    let mut out = format!("G29 I{}\n", mesh.values().len());
    for (idx, z) in mesh.defined() {
        let _ = writeln!(out, "M421 I{} J{} Z{:.4}", idx.x(), idx.y(), z);
    }
    out
}
