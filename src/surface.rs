use crate::constants::{INF, SURFACE_COINCIDENT};
use crate::error::{Error, Result};
use crate::vector::{Direction, Position};
use std::collections::HashMap;

/// What happens to a particle reaching a surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryType {
    Vacuum,
    Reflective,
    Normal,
}

impl Default for BoundaryType {
    fn default() -> Self {
        BoundaryType::Normal
    }
}

impl BoundaryType {
    /// Parse a boundary type from a string, returning None for invalid strings
    pub fn from_str_option(s: &str) -> Option<Self> {
        match s {
            "vacuum" => Some(BoundaryType::Vacuum),
            "reflective" => Some(BoundaryType::Reflective),
            "normal" => Some(BoundaryType::Normal),
            _ => None,
        }
    }
}

/// Result of a boundary query: how far along the current direction the
/// surface lies, which surface it is and how it behaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundary {
    pub distance: f64,
    pub surface_index: Option<usize>,
    pub boundary_type: BoundaryType,
}

impl Boundary {
    pub fn new(distance: f64, surface_index: Option<usize>, boundary_type: BoundaryType) -> Self {
        Boundary {
            distance,
            surface_index,
            boundary_type,
        }
    }

    /// A boundary that is never reached.
    pub fn none() -> Self {
        Boundary::new(INF, None, BoundaryType::Normal)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceKind {
    XPlane { x0: f64 },
    YPlane { y0: f64 },
    ZPlane { z0: f64 },
    /// ax + by + cz = d, stored with a unit normal (a, b, c)
    Plane { a: f64, b: f64, c: f64, d: f64 },
    Sphere { x0: f64, y0: f64, z0: f64, radius: f64 },
    XCylinder { y0: f64, z0: f64, radius: f64 },
    YCylinder { x0: f64, z0: f64, radius: f64 },
    ZCylinder { x0: f64, y0: f64, radius: f64 },
}

/// An immutable geometric surface. Built once, then shared read-only by
/// every worker thread.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub surface_id: u32,
    pub name: String,
    pub kind: SurfaceKind,
    pub boundary_type: BoundaryType,
    /// Evaluations closer to zero than this count as on the surface
    pub tolerance: f64,
}

impl Surface {
    pub fn new(kind: SurfaceKind, surface_id: u32, boundary_type: Option<BoundaryType>) -> Self {
        Surface {
            surface_id,
            name: String::new(),
            kind,
            boundary_type: boundary_type.unwrap_or_default(),
            tolerance: SURFACE_COINCIDENT,
        }
    }

    pub fn x_plane(x0: f64, surface_id: u32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(SurfaceKind::XPlane { x0 }, surface_id, boundary_type)
    }

    pub fn y_plane(y0: f64, surface_id: u32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(SurfaceKind::YPlane { y0 }, surface_id, boundary_type)
    }

    pub fn z_plane(z0: f64, surface_id: u32, boundary_type: Option<BoundaryType>) -> Self {
        Self::new(SurfaceKind::ZPlane { z0 }, surface_id, boundary_type)
    }

    /// General plane ax + by + cz = d. The coefficients are rescaled so that
    /// (a, b, c) has unit length; a zero normal gives `None`.
    pub fn plane(
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        surface_id: u32,
        boundary_type: Option<BoundaryType>,
    ) -> Option<Self> {
        let mag = (a * a + b * b + c * c).sqrt();
        if mag == 0.0 {
            return None;
        }
        Some(Self::new(
            SurfaceKind::Plane {
                a: a / mag,
                b: b / mag,
                c: c / mag,
                d: d / mag,
            },
            surface_id,
            boundary_type,
        ))
    }

    pub fn sphere(
        x0: f64,
        y0: f64,
        z0: f64,
        radius: f64,
        surface_id: u32,
        boundary_type: Option<BoundaryType>,
    ) -> Self {
        Self::new(SurfaceKind::Sphere { x0, y0, z0, radius }, surface_id, boundary_type)
    }

    /// Cylinder parallel to the X axis through (y0, z0)
    pub fn x_cylinder(
        y0: f64,
        z0: f64,
        radius: f64,
        surface_id: u32,
        boundary_type: Option<BoundaryType>,
    ) -> Self {
        Self::new(SurfaceKind::XCylinder { y0, z0, radius }, surface_id, boundary_type)
    }

    /// Cylinder parallel to the Y axis through (x0, z0)
    pub fn y_cylinder(
        x0: f64,
        z0: f64,
        radius: f64,
        surface_id: u32,
        boundary_type: Option<BoundaryType>,
    ) -> Self {
        Self::new(SurfaceKind::YCylinder { x0, z0, radius }, surface_id, boundary_type)
    }

    /// Cylinder parallel to the Z axis through (x0, y0)
    pub fn z_cylinder(
        x0: f64,
        y0: f64,
        radius: f64,
        surface_id: u32,
        boundary_type: Option<BoundaryType>,
    ) -> Self {
        Self::new(SurfaceKind::ZCylinder { x0, y0, radius }, surface_id, boundary_type)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn id(&self) -> u32 {
        self.surface_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> BoundaryType {
        self.boundary_type
    }

    /// Algebraic surface function. Negative inside spheres and cylinders,
    /// negative below planes.
    pub fn evaluate(&self, r: &Position) -> f64 {
        match self.kind {
            SurfaceKind::XPlane { x0 } => r.x - x0,
            SurfaceKind::YPlane { y0 } => r.y - y0,
            SurfaceKind::ZPlane { z0 } => r.z - z0,
            SurfaceKind::Plane { a, b, c, d } => a * r.x + b * r.y + c * r.z - d,
            SurfaceKind::Sphere { x0, y0, z0, radius } => {
                let x = r.x - x0;
                let y = r.y - y0;
                let z = r.z - z0;
                x * x + y * y + z * z - radius * radius
            }
            SurfaceKind::XCylinder { y0, z0, radius } => {
                let y = r.y - y0;
                let z = r.z - z0;
                y * y + z * z - radius * radius
            }
            SurfaceKind::YCylinder { x0, z0, radius } => {
                let x = r.x - x0;
                let z = r.z - z0;
                x * x + z * z - radius * radius
            }
            SurfaceKind::ZCylinder { x0, y0, radius } => {
                let x = r.x - x0;
                let y = r.y - y0;
                x * x + y * y - radius * radius
            }
        }
    }

    /// Side of the surface the point is on: +1 or -1. Inside the coincidence
    /// band the particle is assigned to the side it is moving into.
    pub fn sign(&self, r: &Position, u: &Direction) -> i32 {
        let eval = self.evaluate(r);
        if eval > self.tolerance {
            1
        } else if eval < -self.tolerance {
            -1
        } else if u.dot(&self.norm(r)) > 0.0 {
            1
        } else {
            -1
        }
    }

    /// Distance along `u` to the surface, or `INF` when no forward
    /// intersection exists. When `on_surf` is set (or the point is coincident
    /// with the surface) the root at zero is discarded.
    pub fn distance(&self, r: &Position, u: &Direction, on_surf: bool) -> f64 {
        match self.kind {
            SurfaceKind::XPlane { x0 } => plane_distance(x0 - r.x, u.x, on_surf, self.tolerance),
            SurfaceKind::YPlane { y0 } => plane_distance(y0 - r.y, u.y, on_surf, self.tolerance),
            SurfaceKind::ZPlane { z0 } => plane_distance(z0 - r.z, u.z, on_surf, self.tolerance),
            SurfaceKind::Plane { a, b, c, d } => {
                let diff = d - (a * r.x + b * r.y + c * r.z);
                let u_n = a * u.x + b * u.y + c * u.z;
                plane_distance(diff, u_n, on_surf, self.tolerance)
            }
            SurfaceKind::Sphere { x0, y0, z0, radius } => {
                let x = r.x - x0;
                let y = r.y - y0;
                let z = r.z - z0;
                let k = x * u.x + y * u.y + z * u.z;
                let c = x * x + y * y + z * z - radius * radius;
                quadric_distance(1.0, k, c, on_surf, self.tolerance)
            }
            SurfaceKind::XCylinder { y0, z0, radius } => {
                let y = r.y - y0;
                let z = r.z - z0;
                let a = u.y * u.y + u.z * u.z;
                let k = y * u.y + z * u.z;
                let c = y * y + z * z - radius * radius;
                quadric_distance(a, k, c, on_surf, self.tolerance)
            }
            SurfaceKind::YCylinder { x0, z0, radius } => {
                let x = r.x - x0;
                let z = r.z - z0;
                let a = u.x * u.x + u.z * u.z;
                let k = x * u.x + z * u.z;
                let c = x * x + z * z - radius * radius;
                quadric_distance(a, k, c, on_surf, self.tolerance)
            }
            SurfaceKind::ZCylinder { x0, y0, radius } => {
                let x = r.x - x0;
                let y = r.y - y0;
                let a = u.x * u.x + u.y * u.y;
                let k = x * u.x + y * u.y;
                let c = x * x + y * y - radius * radius;
                quadric_distance(a, k, c, on_surf, self.tolerance)
            }
        }
    }

    /// Outward unit normal at a point assumed to lie on the surface
    pub fn norm(&self, r: &Position) -> Direction {
        let n = match self.kind {
            SurfaceKind::XPlane { .. } => Direction::new(1.0, 0.0, 0.0),
            SurfaceKind::YPlane { .. } => Direction::new(0.0, 1.0, 0.0),
            SurfaceKind::ZPlane { .. } => Direction::new(0.0, 0.0, 1.0),
            SurfaceKind::Plane { a, b, c, .. } => Direction::new(a, b, c),
            SurfaceKind::Sphere { x0, y0, z0, .. } => Direction::new(r.x - x0, r.y - y0, r.z - z0),
            SurfaceKind::XCylinder { y0, z0, .. } => Direction::new(0.0, r.y - y0, r.z - z0),
            SurfaceKind::YCylinder { x0, z0, .. } => Direction::new(r.x - x0, 0.0, r.z - z0),
            SurfaceKind::ZCylinder { x0, y0, .. } => Direction::new(r.x - x0, r.y - y0, 0.0),
        };
        let mag = n.norm();
        if mag > 0.0 {
            n / mag
        } else {
            n
        }
    }
}

/// Plane crossing: `diff` is the signed offset to the plane along its
/// normal, `u_n` the direction component along the normal.
fn plane_distance(diff: f64, u_n: f64, on_surf: bool, tolerance: f64) -> f64 {
    if on_surf || diff.abs() < tolerance || u_n == 0.0 {
        return INF;
    }
    let d = diff / u_n;
    if d < 0.0 {
        INF
    } else {
        d
    }
}

/// Smallest positive root of a t^2 + 2 k t + c = 0.
fn quadric_distance(a: f64, k: f64, c: f64, on_surf: bool, tolerance: f64) -> f64 {
    if a == 0.0 {
        return INF;
    }
    let quad = k * k - a * c;
    if quad < 0.0 {
        INF
    } else if on_surf || c.abs() < tolerance {
        // On the surface: only the far root counts, and only when heading inwards
        if k >= 0.0 {
            INF
        } else {
            (-k + quad.sqrt()) / a
        }
    } else if c < 0.0 {
        (-k + quad.sqrt()) / a
    } else {
        let d = (-k - quad.sqrt()) / a;
        if d < 0.0 {
            INF
        } else {
            d
        }
    }
}

/// Arena of every surface in the model, addressed by index.
/// The id map only serves diagnostics and input cross-references.
#[derive(Clone, Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: Vec<Surface>,
    index_by_id: HashMap<u32, usize>,
}

impl SurfaceRegistry {
    /// Build the registry, rejecting duplicate or zero ids
    pub fn new(surfaces: Vec<Surface>) -> Result<Self> {
        let mut index_by_id = HashMap::with_capacity(surfaces.len());
        for (index, surface) in surfaces.iter().enumerate() {
            if surface.surface_id == 0 {
                return Err(Error::config(
                    "surface registry",
                    "surface ids must be positive integers",
                ));
            }
            if index_by_id.insert(surface.surface_id, index).is_some() {
                return Err(Error::config(
                    "surface registry",
                    format!(
                        "Duplicate surface_id {} found. All surface IDs must be unique.",
                        surface.surface_id
                    ),
                ));
            }
        }
        Ok(SurfaceRegistry {
            surfaces,
            index_by_id,
        })
    }

    pub fn get(&self, index: usize) -> Option<&Surface> {
        self.surfaces.get(index)
    }

    pub fn index_of(&self, surface_id: u32) -> Option<usize> {
        self.index_by_id.get(&surface_id).copied()
    }

    /// Id of the surface at `index`, for messages. Unknown indices give 0.
    pub fn id_of(&self, index: Option<usize>) -> u32 {
        index
            .and_then(|i| self.surfaces.get(i))
            .map(|s| s.surface_id)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter()
    }
}

impl std::ops::Index<usize> for SurfaceRegistry {
    type Output = Surface;

    fn index(&self, index: usize) -> &Surface {
        &self.surfaces[index]
    }
}
