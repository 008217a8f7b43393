// History loop and one generation of noise transport.
//
// Geometry, materials and operators are shared read-only by the worker
// threads. Each thread owns its scores, its entropy mesh and its slice of
// the next fission bank; these are merged once the generation is over.

use crate::bank::ParticleBank;
use crate::collision::NoiseBranchingCollision;
use crate::entropy::Entropy;
use crate::error::Result;
use crate::fast_rng::FastRng;
use crate::geometry::Geometry;
use crate::material::{Material, MaterialHelper, NoiseParameters};
use crate::parallel::Communicator;
use crate::particle::{BankedParticle, Particle, SecondaryOrigin};
use crate::physics::isotropic_direction;
use crate::scores::ThreadLocalScores;
use crate::settings::Settings;
use crate::tracker::Tracker;
use crate::transport::TransportOperator;
use crate::vector::Position;
use log::{debug, info};
use rayon::prelude::*;

/// Everything one generation produces
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub scores: ThreadLocalScores,
    /// Entropy of the fission birth sites, when a mesh was given
    pub entropy: Option<Entropy>,
    /// Fission neutrons that start the next generation
    pub fission_bank: Vec<BankedParticle>,
}

impl GenerationResult {
    fn new(converged: bool, entropy: Option<&Entropy>) -> Self {
        GenerationResult {
            scores: ThreadLocalScores::new(converged),
            entropy: entropy.map(Entropy::empty_like),
            fission_bank: Vec::new(),
        }
    }

    fn merge(mut self, other: GenerationResult) -> Self {
        self.scores += other.scores;
        if let (Some(mine), Some(theirs)) = (self.entropy.as_mut(), other.entropy.as_ref()) {
            mine.merge(theirs);
        }
        self.fission_bank.extend(other.fission_bank);
        self
    }

    fn bank_fission(&mut self, fission: Vec<BankedParticle>) {
        if let Some(entropy) = self.entropy.as_mut() {
            for site in &fission {
                entropy.add_point(&site.position, site.wgt);
            }
        }
        self.fission_bank.extend(fission);
    }
}

pub struct Simulation<'a> {
    geometry: &'a Geometry,
    materials: &'a [Material],
    noise: Option<NoiseParameters>,
    transport: TransportOperator,
    collision: NoiseBranchingCollision,
}

impl<'a> Simulation<'a> {
    pub fn new(
        geometry: &'a Geometry,
        materials: &'a [Material],
        noise: Option<NoiseParameters>,
        transport: TransportOperator,
        settings: &Settings,
    ) -> Self {
        info!("Transporting with {}", transport.name());
        Simulation {
            geometry,
            materials,
            noise,
            transport,
            collision: NoiseBranchingCollision::new(settings),
        }
    }

    pub fn transport_operator(&self) -> &TransportOperator {
        &self.transport
    }

    /// Transport a source particle and every secondary it spawns, except
    /// fission neutrons, which are added to the generation result.
    pub fn transport_history(&self, source: Particle, result: &mut GenerationResult) -> Result<()> {
        let mut bank = ParticleBank::new(source.history_id);
        let mut next = Some(source);

        while let Some(mut p) = next {
            let mut trkr = Tracker::new(self.geometry, p.position, p.direction);
            let mut mat = MaterialHelper::new(self.materials, self.noise);
            mat.set_material(trkr.material(), p.energy);

            while p.is_alive() {
                self.transport.transport(&mut p, &mut trkr, &mut mat, &mut result.scores)?;
                if !p.is_alive() {
                    debug!("Particle {}.{} leaked", p.history_id, p.secondary_id);
                    break;
                }
                self.collision.collision(&mut p, &mut mat, &mut result.scores)?;
                trkr.set_u(p.direction);
                let fission = bank.bank_history_secondaries(&mut p);
                result.bank_fission(fission);
            }

            next = bank.pop_particle();
        }
        Ok(())
    }

    /// Run every source particle once, in parallel. History ids are
    /// `first_history_id` plus the index of the source. Scores and entropy
    /// are reduced onto rank 0 of `comm`; the first fatal error aborts the
    /// generation.
    pub fn run_generation(
        &self,
        sources: &[BankedParticle],
        first_history_id: u64,
        converged: bool,
        entropy: Option<&Entropy>,
        comm: &dyn Communicator,
    ) -> Result<GenerationResult> {
        let mut result = sources
            .par_iter()
            .enumerate()
            .try_fold(
                || GenerationResult::new(converged, entropy),
                |mut acc, (i, site)| -> Result<GenerationResult> {
                    let p = Particle::from_banked(site.clone(), first_history_id + i as u64, 0);
                    self.transport_history(p, &mut acc)?;
                    Ok(acc)
                },
            )
            .try_reduce(
                || GenerationResult::new(converged, entropy),
                |a, b| Ok(a.merge(b)),
            )?;

        result.scores.reduce(comm)?;
        if let Some(mesh) = result.entropy.as_mut() {
            mesh.synchronize(comm)?;
        }

        info!(
            "Generation of {} histories: {} collisions, {} fission neutrons banked",
            sources.len(),
            result.scores.collisions,
            result.fission_bank.len()
        );
        Ok(result)
    }
}

/// Isotropic point source of unit-weight particles, one random stream per
/// particle derived from `seed`
pub fn isotropic_point_source(position: Position, energy: f64, count: usize, seed: u64) -> Vec<BankedParticle> {
    (0..count as u64)
        .map(|i| {
            let mut rng = FastRng::for_history(seed, i);
            let direction = isotropic_direction(&mut rng);
            BankedParticle {
                position,
                direction,
                energy,
                wgt: 1.0,
                wgt2: 0.0,
                origin: SecondaryOrigin::Fission,
                rng: rng.split(),
            }
        })
        .collect()
}
