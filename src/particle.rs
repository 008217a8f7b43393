use crate::fast_rng::FastRng;
use crate::vector::{Direction, Position};

/// Reaction that produced a banked secondary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecondaryOrigin {
    Fission,
    Noise,
    Scatter,
}

/// A secondary waiting in the bank. It carries its own random stream,
/// split off the parent at birth.
#[derive(Clone, Debug)]
pub struct BankedParticle {
    pub position: Position,
    pub direction: Direction,
    pub energy: f64,
    pub wgt: f64,
    pub wgt2: f64,
    pub origin: SecondaryOrigin,
    pub rng: FastRng,
}

/// A neutron in flight.
///
/// The weight is a pair (`wgt`, `wgt2`) holding the real and imaginary
/// parts of a complex noise weight; plain transport leaves `wgt2` at zero.
#[derive(Clone, Debug)]
pub struct Particle {
    pub position: Position,
    pub direction: Direction,
    pub energy: f64,
    pub wgt: f64,
    pub wgt2: f64,
    pub alive: bool,
    pub r_birth: Position,
    pub previous_position: Position,
    pub previous_direction: Direction,
    pub history_id: u64,
    pub secondary_id: u64,
    pub rng: FastRng,
    /// Set when the last tentative collision was rejected
    pub previous_collision_virtual: bool,
    /// Sampling cross section of the last flight, kept for cancellation tallies
    pub esmp: f64,
    secondaries: Vec<BankedParticle>,
}

impl Particle {
    pub fn new(
        position: Position,
        direction: Direction,
        energy: f64,
        wgt: f64,
        history_id: u64,
        rng: FastRng,
    ) -> Self {
        Particle {
            position,
            direction,
            energy,
            wgt,
            wgt2: 0.0,
            alive: true,
            r_birth: position,
            previous_position: position,
            previous_direction: direction,
            history_id,
            secondary_id: 0,
            rng,
            previous_collision_virtual: false,
            esmp: 0.0,
            secondaries: Vec::new(),
        }
    }

    /// Promote a banked secondary to an active particle
    pub fn from_banked(banked: BankedParticle, history_id: u64, secondary_id: u64) -> Self {
        let mut p = Particle::new(
            banked.position,
            banked.direction,
            banked.energy,
            banked.wgt,
            history_id,
            banked.rng,
        );
        p.wgt2 = banked.wgt2;
        p.secondary_id = secondary_id;
        p
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Move the particle along its direction by a distance
    pub fn move_by(&mut self, distance: f64) {
        self.previous_position = self.position;
        self.position += distance * self.direction;
    }

    pub fn set_position(&mut self, position: Position) {
        self.previous_position = self.position;
        self.position = position;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.previous_direction = self.direction;
        self.direction = direction;
    }

    pub fn set_weights(&mut self, wgt: f64, wgt2: f64) {
        self.wgt = wgt;
        self.wgt2 = wgt2;
    }

    pub fn scale_weights(&mut self, factor: f64) {
        self.wgt *= factor;
        self.wgt2 *= factor;
    }

    /// Magnitude of the complex weight
    pub fn weight_magnitude(&self) -> f64 {
        self.wgt.hypot(self.wgt2)
    }

    pub fn set_previous_collision_virtual(&mut self) {
        self.previous_collision_virtual = true;
    }

    pub fn set_previous_collision_real(&mut self) {
        self.previous_collision_virtual = false;
    }

    /// Queue a secondary born at the current position
    pub fn make_secondary(
        &mut self,
        direction: Direction,
        energy: f64,
        wgt: f64,
        wgt2: f64,
        origin: SecondaryOrigin,
    ) {
        let rng = self.rng.split();
        self.secondaries.push(BankedParticle {
            position: self.position,
            direction,
            energy,
            wgt,
            wgt2,
            origin,
            rng,
        });
    }

    pub fn secondaries(&self) -> &[BankedParticle] {
        &self.secondaries
    }

    pub fn take_secondaries(&mut self) -> Vec<BankedParticle> {
        std::mem::take(&mut self.secondaries)
    }
}
