// Scattering and fission kinematics for Monte Carlo transport

use crate::vector::Direction;
use rand::Rng;
use std::f64::consts::PI;

/// Rotate a direction vector by angle theta (cos(theta)=mu) around an
/// arbitrary axis at azimuth phi
pub fn rotate_direction_3d(u_old: &Direction, mu: f64, phi: f64) -> Direction {
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    // Find a perpendicular vector to u_old
    let perp = if u_old.x.abs() < 0.99 {
        Direction::new(1.0, 0.0, 0.0).cross(u_old).normalize()
    } else {
        Direction::new(0.0, 1.0, 0.0).cross(u_old).normalize()
    };
    let ortho = u_old.cross(&perp);

    let rotated = mu * u_old + sin_theta * phi.cos() * perp + sin_theta * phi.sin() * ortho;
    rotated.normalize()
}

/// Rotate by cosine `mu` with a uniformly sampled azimuth
pub fn rotate_direction(u_old: &Direction, mu: f64, rng: &mut impl Rng) -> Direction {
    let phi = 2.0 * PI * rng.gen::<f64>();
    rotate_direction_3d(u_old, mu, phi)
}

/// Uniformly distributed unit vector
pub fn isotropic_direction(rng: &mut impl Rng) -> Direction {
    let mu = 2.0 * rng.gen::<f64>() - 1.0;
    let phi = 2.0 * PI * rng.gen::<f64>();
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();
    Direction::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Elastic scattering off a target at rest with an isotropic CM cosine.
/// Returns the outgoing (energy, direction).
pub fn target_at_rest_elastic(
    energy: f64,
    u: &Direction,
    awr: f64,
    rng: &mut impl Rng,
) -> (f64, Direction) {
    let mu_cm = 2.0 * rng.gen::<f64>() - 1.0;
    let a = awr;

    // E_out = E_in * (A^2 + 1 + 2 A mu_cm) / (A + 1)^2
    let denom = a * a + 2.0 * a * mu_cm + 1.0;
    let e_out = energy * denom / ((a + 1.0) * (a + 1.0));

    // mu_lab = (1 + A mu_cm) / sqrt(A^2 + 2 A mu_cm + 1)
    let mu_lab = if denom > 0.0 {
        ((1.0 + a * mu_cm) / denom.sqrt()).clamp(-1.0, 1.0)
    } else {
        1.0
    };

    (e_out, rotate_direction(u, mu_lab, rng))
}

/// Sample fission neutron energy from the Watt spectrum
/// χ(E) = C * exp(-E/a) * sinh(sqrt(b*E)).
/// Parameters are for U-235 thermal fission: a = 0.988 MeV, b = 2.249 MeV^-1.
/// Returns energy in eV
pub fn sample_watt_spectrum(rng: &mut impl Rng) -> f64 {
    let a = 0.988;
    let b = 2.249;

    // Maxwellian with temperature a, shifted by a random sinh-weighted term
    // (LA-UR-14-27694 rule C64)
    let maxwell = {
        // Uniform on (0, 1] keeps the logarithms finite
        let r1 = 1.0 - rng.gen::<f64>();
        let r2 = 1.0 - rng.gen::<f64>();
        let c = (PI / 2.0 * rng.gen::<f64>()).cos();
        -a * (r1.ln() + r2.ln() * c * c)
    };
    let mu = 2.0 * rng.gen::<f64>() - 1.0;
    let e = maxwell + a * a * b / 4.0 + mu * (a * a * b * maxwell).sqrt();

    // Convert from MeV to eV
    e.max(0.0) * 1.0e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rotate_preserves_norm_and_cosine() {
        let mut rng = StdRng::seed_from_u64(42);
        let u = Direction::new(0.0, 0.0, 1.0);
        let v = rotate_direction(&u, 0.5, &mut rng);
        assert!((v.norm() - 1.0).abs() < 1e-12, "norm = {}", v.norm());
        assert!((v.z - 0.5).abs() < 1e-12, "z = {}", v.z);

        let w = rotate_direction_3d(&Direction::new(1.0, 0.0, 0.0), -0.3, 1.0);
        assert!((w.x + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_isotropic_direction_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 100_000;
        let mut sum = Direction::zeros();
        for _ in 0..n {
            let u = isotropic_direction(&mut rng);
            assert!((u.norm() - 1.0).abs() < 1e-12);
            sum += u;
        }
        let mean = sum / n as f64;
        assert!(mean.norm() < 0.01, "mean = {:?}", mean);
    }

    #[test]
    fn test_elastic_energy_bounds() {
        let mut rng = StdRng::seed_from_u64(123);
        let awr: f64 = 11.9;
        let alpha = ((awr - 1.0) / (awr + 1.0)).powi(2);
        let u = Direction::new(0.0, 0.0, 1.0);
        for _ in 0..1000 {
            let (e, dir) = target_at_rest_elastic(2.0e6, &u, awr, &mut rng);
            assert!(e <= 2.0e6 * (1.0 + 1e-12));
            assert!(e >= alpha * 2.0e6 * (1.0 - 1e-12));
            assert!((dir.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_watt_spectrum_mean() {
        // Mean of the Watt spectrum is 3a/2 + a^2 b / 4
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 200_000;
        let mean = (0..n).map(|_| sample_watt_spectrum(&mut rng)).sum::<f64>() / n as f64;
        let expected = (1.5 * 0.988 + 0.988 * 0.988 * 2.249 / 4.0) * 1.0e6;
        assert!((mean - expected).abs() / expected < 0.01, "mean = {}", mean);
    }

    #[test]
    fn test_watt_spectrum_finite_for_zero_draws() {
        // Every uniform draw is exactly 0.0
        let mut rng = StepRng::new(0, 0);
        let e = sample_watt_spectrum(&mut rng);
        assert!(e.is_finite() && e > 0.0, "E = {}", e);
    }
}
