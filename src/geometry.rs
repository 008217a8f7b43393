use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::surface::SurfaceRegistry;
use crate::vector::{Direction, Position};
use std::collections::HashSet;
use std::sync::Arc;

/// Geometry is the immutable set of surfaces and cells for transport.
/// It is shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct Geometry {
    surfaces: Arc<SurfaceRegistry>,
    pub cells: Vec<Cell>,
}

impl Geometry {
    /// Create a geometry, checking that cell ids are unique and that every
    /// region refers to a registered surface
    pub fn new(surfaces: Arc<SurfaceRegistry>, cells: Vec<Cell>) -> Result<Self> {
        let mut used_cell_ids = HashSet::new();
        for cell in &cells {
            if !used_cell_ids.insert(cell.cell_id) {
                return Err(Error::config(
                    "geometry",
                    format!(
                        "Duplicate cell_id {} found. All cell IDs must be unique.",
                        cell.cell_id
                    ),
                ));
            }
            if let Some(&bad) = cell
                .surface_indices()
                .iter()
                .find(|&&index| index >= surfaces.len())
            {
                return Err(Error::config(
                    format!("cell with id {}", cell.cell_id),
                    format!(
                        "refers to surface index {} but only {} surfaces exist",
                        bad,
                        surfaces.len()
                    ),
                ));
            }
        }

        Ok(Geometry { surfaces, cells })
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn surface_registry(&self) -> Arc<SurfaceRegistry> {
        Arc::clone(&self.surfaces)
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Index of the first cell containing the point, or None if not found
    pub fn find_cell(&self, r: &Position, u: &Direction, on_surface: Option<usize>) -> Option<usize> {
        self.cells
            .iter()
            .position(|cell| cell.contains(&self.surfaces, r, u, on_surface))
    }
}
