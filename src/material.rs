use crate::constants::neutron_speed;
use crate::error::{Error, Result};
use crate::nuclide::{MicroXSs, Nuclide};
use rand::Rng;
use std::sync::Arc;

/// Frequency-domain noise parameters: `eta` scales the noise-copy cross
/// section, `omega` is the angular frequency of the perturbation (rad/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParameters {
    pub eta: f64,
    pub omega: f64,
}

impl NoiseParameters {
    pub fn new(eta: f64, omega: f64) -> Result<Self> {
        if !(eta > 0.0) || !(omega >= 0.0) {
            return Err(Error::config(
                "noise parameters",
                format!("need eta > 0 and omega >= 0, got eta = {}, omega = {}", eta, omega),
            ));
        }
        Ok(NoiseParameters { eta, omega })
    }
}

/// A homogeneous mixture of nuclides.
#[derive(Debug, Clone)]
pub struct Material {
    pub material_id: u32,
    pub name: Option<String>,
    /// Nuclide data with its atom density in atoms/b-cm
    components: Vec<(Arc<Nuclide>, f64)>,
}

impl Material {
    pub fn new(material_id: u32) -> Self {
        Material {
            material_id,
            name: None,
            components: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Add a nuclide at the given atom density (atoms/b-cm)
    pub fn add_nuclide(&mut self, nuclide: Arc<Nuclide>, atom_density: f64) -> Result<()> {
        if !(atom_density > 0.0) {
            return Err(Error::config(
                format!("material with id {}", self.material_id),
                format!(
                    "has invalid atom density {} for nuclide {}",
                    atom_density, nuclide.name
                ),
            ));
        }
        self.components.push((nuclide, atom_density));
        Ok(())
    }

    pub fn components(&self) -> &[(Arc<Nuclide>, f64)] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Macroscopic total cross section (1/cm)
    pub fn total_xs(&self, energy: f64) -> f64 {
        self.components
            .iter()
            .map(|(nuclide, density)| density * nuclide.total_xs(energy))
            .sum()
    }
}

/// Per-history view of the material data: tracks the material at the
/// particle position and answers cross-section queries for it.
#[derive(Debug, Clone)]
pub struct MaterialHelper<'m> {
    materials: &'m [Material],
    noise: Option<NoiseParameters>,
    current: Option<usize>,
}

impl<'m> MaterialHelper<'m> {
    pub fn new(materials: &'m [Material], noise: Option<NoiseParameters>) -> Self {
        MaterialHelper {
            materials,
            noise,
            current: None,
        }
    }

    /// Select the material at the particle position; `None` is void
    pub fn set_material(&mut self, material: Option<usize>, _energy: f64) {
        self.current = material.filter(|&index| index < self.materials.len());
    }

    pub fn material(&self) -> Option<&'m Material> {
        self.current.and_then(|index| self.materials.get(index))
    }

    pub fn materials(&self) -> &'m [Material] {
        self.materials
    }

    pub fn noise_params(&self) -> Option<NoiseParameters> {
        self.noise
    }

    /// Noise-copy cross section η·ω/v(E). It does not depend on the
    /// material, so it can be added to a global majorant.
    #[allow(non_snake_case)]
    pub fn Ew(&self, energy: f64) -> f64 {
        match self.noise {
            Some(noise) if energy > 0.0 => noise.eta * noise.omega / neutron_speed(energy),
            _ => 0.0,
        }
    }

    /// Macroscopic total cross section of the current material, without noise
    pub fn total(&self, energy: f64) -> f64 {
        self.material().map_or(0.0, |m| m.total_xs(energy))
    }

    /// Total cross section governing collisions: Σt + Ew inside a material,
    /// zero in void
    #[allow(non_snake_case)]
    pub fn Et(&self, energy: f64) -> f64 {
        match self.material() {
            Some(m) if !m.is_empty() => m.total_xs(energy) + self.Ew(energy),
            _ => 0.0,
        }
    }

    /// Choose the colliding nuclide in proportion to its macroscopic total
    /// cross section. The noise-copy share is spread over the nuclides so that
    /// `noise_copy / total == Ew / Et` for every pick.
    pub fn sample_nuclide<R: Rng>(&self, energy: f64, rng: &mut R) -> Result<(&'m Nuclide, MicroXSs)> {
        let material = self.material().ok_or_else(|| {
            Error::config(
                "material helper",
                format!("no material to collide with at {} eV", energy),
            )
        })?;

        let macro_total = material.total_xs(energy);
        if !(macro_total > 0.0) {
            return Err(Error::config(
                format!("material with id {}", material.material_id),
                format!("has zero total cross section at {} eV", energy),
            ));
        }

        let xi = rng.gen::<f64>() * macro_total;
        let mut cumulative = 0.0;
        let mut chosen = &material.components[material.components.len() - 1].0;
        for (nuclide, density) in &material.components {
            cumulative += density * nuclide.total_xs(energy);
            if xi < cumulative {
                chosen = nuclide;
                break;
            }
        }

        let mut xs = chosen.micro_xs(energy);
        xs.noise_copy = xs.total * self.Ew(energy) / macro_total;
        xs.total += xs.noise_copy;
        Ok((chosen.as_ref(), xs))
    }
}
