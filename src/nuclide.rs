// Tabulated neutron cross sections for a single nuclide, read from JSON
use crate::error::{Error, Result};
use crate::physics::{isotropic_direction, target_at_rest_elastic};
use crate::utilities::{interpolate_at, lower_index};
use crate::vector::Direction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// MT number of elastic scattering
pub const ELASTIC_MT: i32 = 2;

fn unit_yield() -> f64 {
    1.0
}

/// A scattering channel other than elastic, e.g. (n,n') or (n,2n).
/// Cross sections are tabulated on the nuclide energy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterReaction {
    pub mt: i32,
    #[serde(default)]
    pub q_value: f64,
    /// Neutrons emitted per reaction
    #[serde(rename = "yield", default = "unit_yield")]
    pub yield_: f64,
    pub xs: Vec<f64>,
}

/// Microscopic cross sections of one nuclide at one energy (barns).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MicroXSs {
    pub energy: f64,
    pub energy_index: usize,
    pub total: f64,
    pub elastic: f64,
    pub absorption: f64,
    pub fission: f64,
    /// Average neutrons released per fission
    pub nu_total: f64,
    /// Share of the total given to noise copies, filled in by the material
    pub noise_copy: f64,
}

/// Outcome of a scattering event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterInfo {
    pub energy: f64,
    pub direction: Direction,
    pub yield_: f64,
    pub mt: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nuclide {
    pub name: String,
    /// Target mass over neutron mass
    pub atomic_weight_ratio: f64,
    /// Energy grid in eV, strictly increasing
    pub energy: Vec<f64>,
    pub elastic: Vec<f64>,
    #[serde(default)]
    pub capture: Vec<f64>,
    #[serde(default)]
    pub fission: Vec<f64>,
    #[serde(default)]
    pub nu_total: Vec<f64>,
    #[serde(default)]
    pub reactions: Vec<ScatterReaction>,
    #[serde(skip)]
    total: Vec<f64>,
}

impl Nuclide {
    /// Build from tables. Missing capture/fission tables count as zero.
    pub fn new(
        name: impl Into<String>,
        atomic_weight_ratio: f64,
        energy: Vec<f64>,
        elastic: Vec<f64>,
        capture: Vec<f64>,
    ) -> Result<Self> {
        let mut nuclide = Nuclide {
            name: name.into(),
            atomic_weight_ratio,
            energy,
            elastic,
            capture,
            fission: Vec::new(),
            nu_total: Vec::new(),
            reactions: Vec::new(),
            total: Vec::new(),
        };
        nuclide.finalize()?;
        Ok(nuclide)
    }

    pub fn with_fission(mut self, fission: Vec<f64>, nu_total: Vec<f64>) -> Result<Self> {
        self.fission = fission;
        self.nu_total = nu_total;
        self.finalize()?;
        Ok(self)
    }

    pub fn with_reaction(mut self, reaction: ScatterReaction) -> Result<Self> {
        self.reactions.push(reaction);
        self.finalize()?;
        Ok(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut nuclide: Nuclide = serde_json::from_str(json)?;
        nuclide.finalize()?;
        Ok(nuclide)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn table_error(&self, message: String) -> Error {
        Error::config(format!("nuclide {}", self.name), message)
    }

    /// Validate table shapes and precompute the total cross section
    fn finalize(&mut self) -> Result<()> {
        let n = self.energy.len();
        if n == 0 {
            return Err(self.table_error("has an empty energy grid".to_string()));
        }
        if self.energy.windows(2).any(|w| w[1] <= w[0]) {
            return Err(self.table_error("energy grid is not strictly increasing".to_string()));
        }
        if !(self.atomic_weight_ratio > 0.0) {
            return Err(self.table_error(format!(
                "has invalid atomic_weight_ratio {}",
                self.atomic_weight_ratio
            )));
        }
        if self.capture.is_empty() {
            self.capture = vec![0.0; n];
        }
        if self.fission.is_empty() {
            self.fission = vec![0.0; n];
        }
        if self.nu_total.is_empty() {
            self.nu_total = vec![0.0; n];
        }

        let tables: Vec<(String, &Vec<f64>)> = [
            ("elastic".to_string(), &self.elastic),
            ("capture".to_string(), &self.capture),
            ("fission".to_string(), &self.fission),
            ("nu_total".to_string(), &self.nu_total),
        ]
        .into_iter()
        .chain(self.reactions.iter().map(|r| (format!("MT {}", r.mt), &r.xs)))
        .collect();
        for (label, table) in &tables {
            if table.len() != n {
                return Err(self.table_error(format!(
                    "{} table has {} points but the energy grid has {}",
                    label,
                    table.len(),
                    n
                )));
            }
            if table.iter().any(|v| !(*v >= 0.0)) {
                return Err(self.table_error(format!("{} table has negative or NaN values", label)));
            }
        }
        if let Some(r) = self.reactions.iter().find(|r| r.mt == ELASTIC_MT || r.yield_ < 0.0) {
            return Err(self.table_error(format!(
                "reaction MT {} with yield {} is not a valid extra scatter channel",
                r.mt, r.yield_
            )));
        }

        self.total = (0..n)
            .map(|i| {
                self.elastic[i]
                    + self.capture[i]
                    + self.fission[i]
                    + self.reactions.iter().map(|r| r.xs[i]).sum::<f64>()
            })
            .collect();
        Ok(())
    }

    pub fn awr(&self) -> f64 {
        self.atomic_weight_ratio
    }

    pub fn energy_grid(&self) -> &[f64] {
        &self.energy
    }

    pub fn fissile(&self) -> bool {
        self.fission.iter().any(|&f| f > 0.0)
    }

    pub fn total_xs(&self, energy: f64) -> f64 {
        let i = lower_index(&self.energy, energy);
        interpolate_at(&self.energy, &self.total, i, energy)
    }

    fn at(&self, table: &[f64], energy: f64, index: usize) -> f64 {
        interpolate_at(&self.energy, table, index, energy)
    }

    pub fn micro_xs(&self, energy: f64) -> MicroXSs {
        let i = lower_index(&self.energy, energy);
        let fission = self.at(&self.fission, energy, i);
        MicroXSs {
            energy,
            energy_index: i,
            total: self.at(&self.total, energy, i),
            elastic: self.at(&self.elastic, energy, i),
            absorption: self.at(&self.capture, energy, i) + fission,
            fission,
            nu_total: self.at(&self.nu_total, energy, i),
            noise_copy: 0.0,
        }
    }

    /// Sample a scattering channel in proportion to its cross section, then
    /// its outgoing state
    pub fn sample_scatter<R: Rng>(
        &self,
        energy: f64,
        u: &Direction,
        xs: &MicroXSs,
        rng: &mut R,
    ) -> ScatterInfo {
        let i = xs.energy_index;
        let channel_xs: Vec<f64> = self
            .reactions
            .iter()
            .map(|r| self.at(&r.xs, energy, i))
            .collect();
        let scatter_total = xs.elastic + channel_xs.iter().sum::<f64>();

        let mut mt = ELASTIC_MT;
        if scatter_total > 0.0 {
            let xi = rng.gen::<f64>() * scatter_total;
            let mut cumulative = xs.elastic;
            if xi >= cumulative {
                for (reaction, sigma) in self.reactions.iter().zip(&channel_xs) {
                    cumulative += sigma;
                    mt = reaction.mt;
                    if xi < cumulative {
                        break;
                    }
                }
            }
        }
        self.sample_scatter_mt(mt, energy, u, i, rng)
    }

    /// Outgoing state for a given channel. Elastic uses target-at-rest
    /// kinematics; other channels split the available energy equally between
    /// the emitted neutrons, isotropic in the lab.
    pub fn sample_scatter_mt<R: Rng>(
        &self,
        mt: i32,
        energy: f64,
        u: &Direction,
        _energy_index: usize,
        rng: &mut R,
    ) -> ScatterInfo {
        let reaction = match self.reactions.iter().find(|r| r.mt == mt) {
            Some(r) if mt != ELASTIC_MT => r,
            _ => {
                let (e_out, direction) = target_at_rest_elastic(energy, u, self.atomic_weight_ratio, rng);
                return ScatterInfo {
                    energy: e_out,
                    direction,
                    yield_: 1.0,
                    mt: ELASTIC_MT,
                };
            }
        };

        let a = self.atomic_weight_ratio;
        let available = (a / (a + 1.0) * energy + reaction.q_value).max(0.0);
        let neutrons = reaction.yield_.round().max(1.0);
        ScatterInfo {
            energy: available / neutrons,
            direction: isotropic_direction(rng),
            yield_: reaction.yield_,
            mt,
        }
    }
}
