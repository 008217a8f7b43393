// Numerical constants shared by the geometry and transport kernels

/// Distance returned when no forward intersection exists.
pub const INF: f64 = f64::INFINITY;

/// Default band around zero in which a surface evaluation counts as "on the surface".
pub const SURFACE_COINCIDENT: f64 = 1e-12;

/// Default amount by which a true total cross section may exceed the majorant.
pub const MAJORANT_TOLERANCE: f64 = 1e-10;

/// Neutron rest mass energy in eV.
pub const NEUTRON_MASS_EV: f64 = 939.56542052e6;

/// Speed of light in cm/s.
pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

/// Neutron speed (cm/s) at kinetic energy `energy` (eV), non-relativistic.
pub fn neutron_speed(energy: f64) -> f64 {
    SPEED_OF_LIGHT * (2.0 * energy / NEUTRON_MASS_EV).sqrt()
}
