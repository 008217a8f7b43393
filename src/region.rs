use crate::surface::SurfaceRegistry;
use crate::vector::{Direction, Position};

/// Constructive solid geometry over surfaces in a `SurfaceRegistry`,
/// referenced by index.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub expr: RegionExpr,
}

/// Side of a surface: `Above` is the positive sense, `Below` the negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalfspaceType {
    Above(usize),
    Below(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum RegionExpr {
    Halfspace(HalfspaceType),
    Union(Box<RegionExpr>, Box<RegionExpr>),
    Intersection(Box<RegionExpr>, Box<RegionExpr>),
    Complement(Box<RegionExpr>),
}

impl RegionExpr {
    fn contains(
        &self,
        surfaces: &SurfaceRegistry,
        r: &Position,
        u: &Direction,
        on_surface: Option<usize>,
    ) -> bool {
        // The surface just crossed is judged by direction alone, so the
        // particle always lands on the side it is moving into.
        let sign_of = |index: usize| {
            let surface = &surfaces[index];
            if on_surface == Some(index) {
                if u.dot(&surface.norm(r)) > 0.0 {
                    1
                } else {
                    -1
                }
            } else {
                surface.sign(r, u)
            }
        };
        match self {
            RegionExpr::Halfspace(HalfspaceType::Above(i)) => sign_of(*i) > 0,
            RegionExpr::Halfspace(HalfspaceType::Below(i)) => sign_of(*i) < 0,
            RegionExpr::Union(a, b) => {
                a.contains(surfaces, r, u, on_surface) || b.contains(surfaces, r, u, on_surface)
            }
            RegionExpr::Intersection(a, b) => {
                a.contains(surfaces, r, u, on_surface) && b.contains(surfaces, r, u, on_surface)
            }
            RegionExpr::Complement(inner) => !inner.contains(surfaces, r, u, on_surface),
        }
    }
}

impl Region {
    pub fn new_from_halfspace(halfspace_type: HalfspaceType) -> Self {
        Region {
            expr: RegionExpr::Halfspace(halfspace_type),
        }
    }

    pub fn above(surface_index: usize) -> Self {
        Self::new_from_halfspace(HalfspaceType::Above(surface_index))
    }

    pub fn below(surface_index: usize) -> Self {
        Self::new_from_halfspace(HalfspaceType::Below(surface_index))
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Region {
            expr: RegionExpr::Intersection(
                Box::new(self.expr.clone()),
                Box::new(other.expr.clone()),
            ),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Region {
            expr: RegionExpr::Union(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
        }
    }

    pub fn complement(&self) -> Self {
        Region {
            expr: RegionExpr::Complement(Box::new(self.expr.clone())),
        }
    }

    /// Recursively collect the index of every surface bounding the region,
    /// without duplicates
    pub fn surface_indices(&self) -> Vec<usize> {
        fn collect(expr: &RegionExpr, out: &mut Vec<usize>) {
            match expr {
                RegionExpr::Halfspace(HalfspaceType::Above(i))
                | RegionExpr::Halfspace(HalfspaceType::Below(i)) => {
                    if !out.contains(i) {
                        out.push(*i);
                    }
                }
                RegionExpr::Union(a, b) | RegionExpr::Intersection(a, b) => {
                    collect(a, out);
                    collect(b, out);
                }
                RegionExpr::Complement(inner) => collect(inner, out),
            }
        }
        let mut result = Vec::new();
        collect(&self.expr, &mut result);
        result
    }

    /// Point-in-region test. `on_surface` names a surface the point sits on.
    pub fn contains(
        &self,
        surfaces: &SurfaceRegistry,
        r: &Position,
        u: &Direction,
        on_surface: Option<usize>,
    ) -> bool {
        self.expr.contains(surfaces, r, u, on_surface)
    }
}
