// Resolution of real collisions for frequency-domain noise transport.

use crate::error::Result;
use crate::material::MaterialHelper;
use crate::nuclide::{MicroXSs, Nuclide};
use crate::particle::{Particle, SecondaryOrigin};
use crate::physics::{isotropic_direction, sample_watt_spectrum};
use crate::scores::ThreadLocalScores;
use crate::settings::Settings;

/// Play Russian roulette on the weight magnitude.
///
/// Below `cutoff` the particle survives with probability |w| / `survival`
/// and both weight components are rescaled so that |w| == `survival`.
pub fn russian_roulette(p: &mut Particle, cutoff: f64, survival: f64) {
    let magnitude = p.weight_magnitude();
    if magnitude >= cutoff {
        return;
    }
    if magnitude > 0.0 && p.rng.random() < magnitude / survival {
        p.scale_weights(survival / magnitude);
    } else {
        p.kill();
    }
}

/// Creates fission secondaries at the collision site.
#[derive(Debug, Clone, Copy, Default)]
pub struct FissionOperator;

impl FissionOperator {
    /// Bank ⌊ν̄σf/σt + ξ⌋ fission neutrons carrying the parent's weight pair.
    /// Returns the number created.
    pub fn fission(&self, p: &mut Particle, xs: &MicroXSs) -> usize {
        if !(xs.fission > 0.0) || !(xs.total > 0.0) {
            return 0;
        }
        let expected = xs.nu_total * xs.fission / xs.total;
        let n = (expected + p.rng.random()).floor() as usize;
        for _ in 0..n {
            let energy = sample_watt_spectrum(&mut p.rng);
            let direction = isotropic_direction(&mut p.rng);
            p.make_secondary(direction, energy, p.wgt, p.wgt2, SecondaryOrigin::Fission);
        }
        n
    }
}

/// Real-collision operator with fission, noise-copy and scattering branches.
///
/// Absorption and noise copies are handled implicitly: the primary keeps
/// flying with its weight reduced by their probability, and roulette keeps
/// the weight from vanishing.
#[derive(Debug, Clone)]
pub struct NoiseBranchingCollision {
    pub min_energy: f64,
    pub weight_cutoff: f64,
    pub weight_survival: f64,
    fission: FissionOperator,
}

impl NoiseBranchingCollision {
    pub fn new(settings: &Settings) -> Self {
        NoiseBranchingCollision {
            min_energy: settings.min_energy,
            weight_cutoff: settings.weight_cutoff,
            weight_survival: settings.weight_survival,
            fission: FissionOperator,
        }
    }

    pub fn collision(
        &self,
        p: &mut Particle,
        mat: &mut MaterialHelper,
        scores: &mut ThreadLocalScores,
    ) -> Result<()> {
        let (nuclide, xs) = mat.sample_nuclide(p.energy, &mut p.rng)?;
        scores.collisions += 1;
        scores.k_abs_score += p.wgt * xs.nu_total * xs.fission / xs.total;

        self.fission.fission(p, &xs);

        if let Some(noise) = mat.noise_params() {
            self.noise_copy(p, &xs, noise.eta);
        }

        p.scale_weights(1.0 - (xs.absorption + xs.noise_copy) / xs.total);
        russian_roulette(p, self.weight_cutoff, self.weight_survival);

        if p.is_alive() {
            self.scatter(p, nuclide, &xs);
        }
        if p.is_alive() && p.energy < self.min_energy {
            p.kill();
        }
        Ok(())
    }

    /// With probability noise_copy/total, bank a copy whose weight is the
    /// complex product (w + i·w2)(1 − i/η).
    pub(crate) fn noise_copy(&self, p: &mut Particle, xs: &MicroXSs, eta: f64) -> bool {
        if !(xs.noise_copy > 0.0) || xs.noise_copy / xs.total + p.rng.random() < 1.0 {
            return false;
        }
        let (wgt, wgt2) = noise_copy_weight(p.wgt, p.wgt2, eta);
        p.make_secondary(p.direction, p.energy, wgt, wgt2, SecondaryOrigin::Noise);
        true
    }

    pub(crate) fn scatter(&self, p: &mut Particle, nuclide: &Nuclide, xs: &MicroXSs) {
        let info = nuclide.sample_scatter(p.energy, &p.direction, xs, &mut p.rng);
        let mut yield_ = info.yield_;

        if yield_ == 0.0 {
            p.kill();
            return;
        }

        if yield_ > 1.0 && yield_.fract() == 0.0 {
            let extra = yield_ as usize - 1;
            for _ in 0..extra {
                let other = nuclide.sample_scatter_mt(
                    info.mt,
                    p.energy,
                    &p.direction,
                    xs.energy_index,
                    &mut p.rng,
                );
                p.make_secondary(other.direction, other.energy, p.wgt, p.wgt2, SecondaryOrigin::Scatter);
            }
            yield_ = 1.0;
        }

        p.set_direction(info.direction);
        p.energy = info.energy;
        if yield_ != 1.0 {
            p.scale_weights(yield_);
        }
    }
}

/// (w + i·w2)(1 − i/η) split into real and imaginary parts
fn noise_copy_weight(wgt: f64, wgt2: f64, eta: f64) -> (f64, f64) {
    (wgt + wgt2 / eta, wgt2 - wgt / eta)
}
