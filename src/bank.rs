// Particle banking system
//
// Holds secondaries produced during one history (fission, noise copies,
// multiplying scatters) until they are promoted to active particles.

use crate::particle::{BankedParticle, Particle, SecondaryOrigin};
use log::debug;
use std::collections::VecDeque;

/// FIFO queue of banked secondaries for a single history.
///
/// Every promoted particle keeps the history id of its source particle and
/// receives the next secondary id in sequence.
pub struct ParticleBank {
    queue: VecDeque<BankedParticle>,
    history_id: u64,
    next_secondary_id: u64,
}

impl ParticleBank {
    pub fn new(history_id: u64) -> Self {
        ParticleBank {
            queue: VecDeque::new(),
            history_id,
            next_secondary_id: 1,
        }
    }

    /// Bank the secondaries that continue this history. Fission neutrons
    /// start the next generation instead and are returned.
    pub fn bank_history_secondaries(&mut self, particle: &mut Particle) -> Vec<BankedParticle> {
        let (fission, rest): (Vec<_>, Vec<_>) = particle
            .take_secondaries()
            .into_iter()
            .partition(|s| s.origin == SecondaryOrigin::Fission);
        if !rest.is_empty() {
            debug!(
                "History {}: banking {} secondaries",
                self.history_id,
                rest.len()
            );
        }
        self.queue.extend(rest);
        fission
    }

    /// Promote the next banked secondary, or None if the bank is empty
    pub fn pop_particle(&mut self) -> Option<Particle> {
        let banked = self.queue.pop_front()?;
        let p = Particle::from_banked(banked, self.history_id, self.next_secondary_id);
        self.next_secondary_id += 1;
        Some(p)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_rng::FastRng;
    use crate::vector::{Direction, Position};

    fn parent() -> Particle {
        Particle::new(
            Position::new(0.0, 0.0, 0.0),
            Direction::new(0.0, 0.0, 1.0),
            14.0e6,
            1.0,
            42,
            FastRng::new(1),
        )
    }

    #[test]
    fn test_particle_bank_fifo_and_ids() {
        let mut p = parent();
        p.make_secondary(p.direction, 7.0e6, 1.0, 0.0, SecondaryOrigin::Scatter);
        p.make_secondary(p.direction, 2.0e6, 1.0, 0.0, SecondaryOrigin::Noise);

        let mut bank = ParticleBank::new(p.history_id);
        assert!(bank.is_empty());
        assert!(bank.bank_history_secondaries(&mut p).is_empty());
        assert_eq!(bank.len(), 2);
        assert!(p.secondaries().is_empty());

        // First banked comes out first
        let s1 = bank.pop_particle().unwrap();
        assert_eq!(s1.energy, 7.0e6);
        assert_eq!((s1.history_id, s1.secondary_id), (42, 1));

        let s2 = bank.pop_particle().unwrap();
        assert_eq!(s2.energy, 2.0e6);
        assert_eq!(s2.secondary_id, 2);

        assert!(bank.pop_particle().is_none());
    }

    #[test]
    fn test_fission_neutrons_leave_the_history() {
        let mut p = parent();
        p.make_secondary(p.direction, 2.0e6, 1.0, 0.0, SecondaryOrigin::Fission);
        p.make_secondary(p.direction, 14.0e6, 0.5, -0.5, SecondaryOrigin::Noise);
        let mut bank = ParticleBank::new(p.history_id);
        let fission = bank.bank_history_secondaries(&mut p);
        assert_eq!(fission.len(), 1);
        assert_eq!(fission[0].energy, 2.0e6);
        assert_eq!(bank.len(), 1);
        let noise = bank.pop_particle().unwrap();
        assert_eq!((noise.wgt, noise.wgt2), (0.5, -0.5));
    }
}
