// Geometry cursor for one particle.
//
// The tracker answers "which cell am I in" and "where is the next boundary"
// for a position and direction. It borrows the shared geometry and owns only
// its own coordinates, so each history creates its own.

use crate::cell::Cell;
use crate::geometry::Geometry;
use crate::particle::Particle;
use crate::surface::{Boundary, BoundaryType};
use crate::vector::{Direction, Position};

/// Upper bound on Normal-surface crossings walked in one boundary search
const MAX_BOUNDARY_CROSSINGS: usize = 100_000;

#[derive(Clone, Debug)]
pub struct Tracker<'g> {
    geometry: &'g Geometry,
    r: Position,
    u: Direction,
    cell: Option<usize>,
    /// Surface the tracker sits on after a crossing or reflection
    on_surface: Option<usize>,
}

impl<'g> Tracker<'g> {
    pub fn new(geometry: &'g Geometry, r: Position, u: Direction) -> Self {
        let mut tracker = Tracker {
            geometry,
            r,
            u,
            cell: None,
            on_surface: None,
        };
        tracker.get_current();
        tracker
    }

    pub fn geometry(&self) -> &'g Geometry {
        self.geometry
    }

    pub fn r(&self) -> &Position {
        &self.r
    }

    pub fn u(&self) -> &Direction {
        &self.u
    }

    /// Advance along the current direction. The cell is not updated until
    /// `get_current` is called.
    pub fn move_by(&mut self, distance: f64) {
        if distance > 0.0 {
            self.r += distance * self.u;
            self.on_surface = None;
        }
    }

    pub fn set_r(&mut self, r: Position) {
        self.r = r;
        self.on_surface = None;
    }

    pub fn set_u(&mut self, u: Direction) {
        self.u = u;
    }

    /// Locate the cell holding the current position
    pub fn get_current(&mut self) {
        self.cell = self.geometry.find_cell(&self.r, &self.u, self.on_surface);
    }

    pub fn is_lost(&self) -> bool {
        self.cell.is_none()
    }

    pub fn cell(&self) -> Option<&'g Cell> {
        self.cell.and_then(|index| self.geometry.cell(index))
    }

    pub fn cell_index(&self) -> Option<usize> {
        self.cell
    }

    /// Material filling the current cell, `None` for void or when lost
    pub fn material(&self) -> Option<usize> {
        self.cell().and_then(Cell::material)
    }

    /// Nearest surface of the current cell along the direction of flight
    pub fn get_nearest_boundary(&self) -> Boundary {
        match self.cell() {
            Some(cell) => cell.nearest_boundary(
                self.geometry.surfaces(),
                &self.r,
                &self.u,
                self.on_surface,
            ),
            None => Boundary::none(),
        }
    }

    /// Distance along the direction of flight to the first Vacuum or
    /// Reflective surface, walking through any Normal surfaces on the way.
    ///
    /// If the walk leaves the geometry through a Normal surface the tracker is
    /// marked lost and an infinite boundary is returned. The position of the
    /// tracker itself is not changed.
    pub fn get_boundary_condition(&mut self) -> Boundary {
        let geometry = self.geometry;
        let surfaces = geometry.surfaces();
        let mut r = self.r;
        let mut cell = self.cell;
        let mut on_surface = self.on_surface;
        let mut travelled = 0.0;

        for _ in 0..MAX_BOUNDARY_CROSSINGS {
            let current = match cell.and_then(|index| geometry.cell(index)) {
                Some(c) => c,
                None => break,
            };

            let next = current.nearest_boundary(surfaces, &r, &self.u, on_surface);
            if next.distance.is_infinite() {
                return Boundary::none();
            }
            travelled += next.distance;

            match next.boundary_type {
                BoundaryType::Vacuum | BoundaryType::Reflective => {
                    return Boundary::new(travelled, next.surface_index, next.boundary_type);
                }
                BoundaryType::Normal => {
                    r += next.distance * self.u;
                    on_surface = next.surface_index;
                    cell = geometry.find_cell(&r, &self.u, on_surface);
                }
            }
        }

        self.cell = None;
        Boundary::none()
    }

    /// Move onto the boundary and continue into the neighbouring cell
    pub fn cross_boundary(&mut self, boundary: &Boundary) {
        self.move_by(boundary.distance);
        self.on_surface = boundary.surface_index;
        self.get_current();
    }

    /// Move to a reflective boundary, reflect specularly and relocate. The
    /// particle is updated to the new position and direction.
    pub fn do_reflection(&mut self, p: &mut Particle, boundary: &Boundary) {
        self.move_by(boundary.distance);

        let index = match boundary.surface_index {
            Some(index) => index,
            None => {
                self.cell = None;
                return;
            }
        };
        let n = self.geometry.surfaces()[index].norm(&self.r);
        let reflected = self.u - 2.0 * self.u.dot(&n) * n;
        let mag = reflected.norm();
        self.u = if mag > 0.0 { reflected / mag } else { reflected };
        self.on_surface = Some(index);
        self.get_current();

        p.set_position(self.r);
        p.set_direction(self.u);
    }
}
