use crate::error::Result;
use crate::material::MaterialHelper;
use crate::parallel::Communicator;
use crate::particle::Particle;
use std::ops::AddAssign;

/// Per-thread generation scores. Each worker owns one; they are only
/// combined by addition once the generation is over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadLocalScores {
    /// Track-length scores are only taken once the source has converged
    pub converged: bool,
    /// Absorption estimate of k: sum of w ν̄ σf / σt over real collisions
    pub k_abs_score: f64,
    pub leakage_score: f64,
    /// Sum of w |r_leak - r_birth|^2 over leaking particles
    pub mig_score: f64,
    pub flux_real: f64,
    pub flux_imag: f64,
    /// Track-length estimate of the total reaction rate
    pub total_rate: f64,
    pub collisions: u64,
}

impl ThreadLocalScores {
    pub fn new(converged: bool) -> Self {
        ThreadLocalScores {
            converged,
            ..Default::default()
        }
    }

    /// Track-length contribution of a flight of `distance` in the current material
    pub fn score_flight(&mut self, p: &Particle, distance: f64, mat: &MaterialHelper) {
        if !self.converged || !distance.is_finite() || distance <= 0.0 {
            return;
        }
        self.flux_real += p.wgt * distance;
        self.flux_imag += p.wgt2 * distance;
        self.total_rate += p.wgt * distance * mat.total(p.energy);
    }

    fn as_array(&self) -> [f64; 7] {
        [
            self.k_abs_score,
            self.leakage_score,
            self.mig_score,
            self.flux_real,
            self.flux_imag,
            self.total_rate,
            self.collisions as f64,
        ]
    }

    /// Sum every score onto rank 0
    pub fn reduce(&mut self, comm: &dyn Communicator) -> Result<()> {
        let mut values = self.as_array();
        comm.reduce_sum(&mut values, 0)?;
        if comm.rank() == 0 {
            let [k, leak, mig, flux_r, flux_i, rate, coll] = values;
            self.k_abs_score = k;
            self.leakage_score = leak;
            self.mig_score = mig;
            self.flux_real = flux_r;
            self.flux_imag = flux_i;
            self.total_rate = rate;
            self.collisions = coll.round() as u64;
        }
        Ok(())
    }
}

impl AddAssign<&ThreadLocalScores> for ThreadLocalScores {
    fn add_assign(&mut self, other: &ThreadLocalScores) {
        self.k_abs_score += other.k_abs_score;
        self.leakage_score += other.leakage_score;
        self.mig_score += other.mig_score;
        self.flux_real += other.flux_real;
        self.flux_imag += other.flux_imag;
        self.total_rate += other.total_rate;
        self.collisions += other.collisions;
    }
}

impl AddAssign for ThreadLocalScores {
    fn add_assign(&mut self, other: ThreadLocalScores) {
        *self += &other;
    }
}
