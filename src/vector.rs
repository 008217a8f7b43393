use nalgebra::Vector3;

/// Point in space (cm).
pub type Position = Vector3<f64>;

/// Flight direction. Always kept at unit length by the code that creates it.
pub type Direction = Vector3<f64>;

/// Build a unit direction from arbitrary components.
/// A zero vector is returned unchanged so callers can detect it.
pub fn unit_direction(x: f64, y: f64, z: f64) -> Direction {
    let v = Vector3::new(x, y, z);
    let n = v.norm();
    if n > 0.0 {
        v / n
    } else {
        v
    }
}
