use crate::region::Region;
use crate::surface::{Boundary, SurfaceRegistry};
use crate::vector::{Direction, Position};

/// A Cell is a region of space filled with one material, or void.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub cell_id: u32,
    pub name: Option<String>,
    pub region: Region,
    /// Index into the material list, `None` for void
    pub material: Option<usize>,
    surfaces: Vec<usize>,
}

impl Cell {
    pub fn new(cell_id: u32, region: Region, name: Option<String>, material: Option<usize>) -> Self {
        let surfaces = region.surface_indices();
        Cell {
            cell_id,
            name,
            region,
            material,
            surfaces,
        }
    }

    pub fn contains(
        &self,
        surfaces: &SurfaceRegistry,
        r: &Position,
        u: &Direction,
        on_surface: Option<usize>,
    ) -> bool {
        self.region.contains(surfaces, r, u, on_surface)
    }

    pub fn material(&self) -> Option<usize> {
        self.material
    }

    /// Indices of the surfaces bounding this cell
    pub fn surface_indices(&self) -> &[usize] {
        &self.surfaces
    }

    /// First crossing of any bounding surface along `u`. The surface the
    /// point currently sits on only counts for its far intersection.
    pub fn nearest_boundary(
        &self,
        surfaces: &SurfaceRegistry,
        r: &Position,
        u: &Direction,
        on_surface: Option<usize>,
    ) -> Boundary {
        let mut nearest = Boundary::none();
        for &index in &self.surfaces {
            let surface = &surfaces[index];
            let d = surface.distance(r, u, on_surface == Some(index));
            if d < nearest.distance {
                nearest = Boundary::new(d, Some(index), surface.boundary());
            }
        }
        nearest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{BoundaryType, Surface};

    fn slab() -> (SurfaceRegistry, Cell) {
        let surfaces = SurfaceRegistry::new(vec![
            Surface::x_plane(-1.0, 1, Some(BoundaryType::Reflective)),
            Surface::x_plane(1.0, 2, Some(BoundaryType::Vacuum)),
        ])
        .unwrap();
        let cell = Cell::new(
            7,
            Region::above(0).intersection(&Region::below(1)),
            Some("slab".to_string()),
            Some(0),
        );
        (surfaces, cell)
    }

    #[test]
    fn test_cell_contains_and_fill() {
        let (surfaces, cell) = slab();
        let u = Direction::new(1.0, 0.0, 0.0);
        assert!(cell.contains(&surfaces, &Position::new(0.0, 5.0, 0.0), &u, None));
        assert!(!cell.contains(&surfaces, &Position::new(1.5, 0.0, 0.0), &u, None));
        assert_eq!(cell.material(), Some(0));
        assert_eq!(cell.name.as_deref(), Some("slab"));
        assert_eq!(cell.surface_indices(), &[0, 1]);
    }

    #[test]
    fn test_nearest_boundary() {
        let (surfaces, cell) = slab();
        let b = cell.nearest_boundary(
            &surfaces,
            &Position::new(0.5, 0.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0),
            None,
        );
        assert!((b.distance - 0.5).abs() < 1e-12);
        assert_eq!(b.surface_index, Some(1));
        assert_eq!(b.boundary_type, BoundaryType::Vacuum);

        let back = cell.nearest_boundary(
            &surfaces,
            &Position::new(-1.0, 0.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0),
            Some(0),
        );
        assert!((back.distance - 2.0).abs() < 1e-12);
        assert_eq!(back.surface_index, Some(1));
    }

    #[test]
    fn test_unbounded_direction() {
        let (surfaces, cell) = slab();
        let b = cell.nearest_boundary(
            &surfaces,
            &Position::new(0.0, 0.0, 0.0),
            &Direction::new(0.0, 1.0, 0.0),
            None,
        );
        assert!(b.distance.is_infinite());
        assert_eq!(b.surface_index, None);
    }
}
