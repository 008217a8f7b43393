mod bank;
mod cell;
mod collision;
mod config;
mod constants;
mod entropy;
mod error;
mod fast_rng;
mod geometry;
mod majorant;
mod material;
mod nuclide;
mod parallel;
mod particle;
mod physics;
mod region;
mod scores;
mod settings;
mod simulation;
mod surface;
mod tracker;
mod transport;
mod utilities;
mod vector;

pub use bank::ParticleBank;
pub use cell::Cell;
pub use collision::{russian_roulette, FissionOperator, NoiseBranchingCollision};
pub use config::{entropy_from_json, surface_from_json, surfaces_from_json, surfaces_from_json_with};
pub use constants::{neutron_speed, MAJORANT_TOLERANCE, NEUTRON_MASS_EV, SPEED_OF_LIGHT, SURFACE_COINCIDENT};
pub use entropy::{Entropy, Sign};
pub use error::{Error, Result};
pub use fast_rng::FastRng;
pub use geometry::Geometry;
pub use majorant::Majorant;
pub use material::{Material, MaterialHelper, NoiseParameters};
pub use nuclide::{MicroXSs, Nuclide, ScatterInfo, ScatterReaction, ELASTIC_MT};
pub use parallel::{Communicator, LocalCommunicator, SerialCommunicator};
pub use particle::{BankedParticle, Particle, SecondaryOrigin};
pub use physics::{isotropic_direction, rotate_direction, sample_watt_spectrum, target_at_rest_elastic};
pub use region::{HalfspaceType, Region, RegionExpr};
pub use scores::ThreadLocalScores;
pub use settings::Settings;
pub use simulation::{isotropic_point_source, GenerationResult, Simulation};
pub use surface::{Boundary, BoundaryType, Surface, SurfaceKind, SurfaceRegistry};
pub use tracker::Tracker;
pub use transport::{CarterTracker, DeltaTracker, SurfaceTracker, TransportOperator};
pub use utilities::{interpolate_linear, lower_index};
pub use vector::{unit_direction, Direction, Position};
