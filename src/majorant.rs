// Majorant cross section for delta tracking: an upper bound of the total
// cross section of every material at every energy.

use crate::error::{Error, Result};
use crate::material::Material;
use crate::parallel::Communicator;
use crate::utilities::{interpolate_at, lower_index};
use log::info;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Majorant {
    energy: Vec<f64>,
    xs: Vec<f64>,
}

impl Majorant {
    /// Build on the union of every nuclide energy grid. Between grid points
    /// each material total is linear, so the pointwise maximum interpolated
    /// linearly bounds all of them.
    pub fn build(materials: &[Material]) -> Result<Self> {
        let mut energy: Vec<f64> = materials
            .iter()
            .flat_map(|m| m.components().iter())
            .flat_map(|(nuclide, _)| nuclide.energy_grid().iter().copied())
            .collect();
        if energy.is_empty() {
            return Err(Error::config(
                "majorant",
                "no nuclide data found in any material",
            ));
        }
        energy.sort_by(|a, b| a.total_cmp(b));
        energy.dedup();

        let xs = energy
            .iter()
            .map(|&e| {
                materials
                    .iter()
                    .map(|m| m.total_xs(e))
                    .fold(0.0, f64::max)
            })
            .collect();

        info!("Majorant cross section built on {} energy points", energy.len());
        Ok(Majorant { energy, xs })
    }

    /// Majorant from explicit tables, e.g. a multigroup sampling cross section
    pub fn from_tables(energy: Vec<f64>, xs: Vec<f64>) -> Result<Self> {
        if energy.is_empty() || energy.len() != xs.len() {
            return Err(Error::config(
                "majorant",
                format!(
                    "energy grid and values must be non-empty and equally long, got {} and {}",
                    energy.len(),
                    xs.len()
                ),
            ));
        }
        if energy.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::config("majorant", "energy grid is not strictly increasing"));
        }
        Ok(Majorant { energy, xs })
    }

    pub fn energy_grid(&self) -> &[f64] {
        &self.energy
    }

    pub fn values(&self) -> &[f64] {
        &self.xs
    }

    pub fn evaluate(&self, energy: f64) -> f64 {
        let i = lower_index(&self.energy, energy);
        interpolate_at(&self.energy, &self.xs, i, energy)
    }

    /// Two rows: energies then majorant values
    pub fn to_rows(&self) -> [Vec<f64>; 2] {
        [self.energy.clone(), self.xs.clone()]
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer(std::io::BufWriter::new(file), &self.to_rows())?;
        info!("Majorant cross section written to {}", path.as_ref().display());
        Ok(())
    }

    #[cfg(feature = "hdf5")]
    pub fn write_hdf5<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = hdf5::File::create(path.as_ref())?;
        let n = self.energy.len();
        let flat: Vec<f64> = self.energy.iter().chain(self.xs.iter()).copied().collect();
        let dataset = file
            .new_dataset::<f64>()
            .shape([2, n])
            .create("majorant-xs")?;
        dataset.write_raw(&flat)?;
        info!("Majorant cross section written to {}", path.as_ref().display());
        Ok(())
    }

    /// Write the table once per run: only rank 0 touches the file system.
    /// Files ending in `.h5` are written as HDF5 when that feature is enabled.
    pub fn write_artifact<P: AsRef<Path>>(&self, comm: &dyn Communicator, path: P) -> Result<()> {
        if comm.rank() != 0 {
            return Ok(());
        }
        #[cfg(feature = "hdf5")]
        if path.as_ref().extension().map_or(false, |ext| ext == "h5") {
            return self.write_hdf5(path);
        }
        self.write_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nuclide::Nuclide;
    use crate::parallel::{LocalCommunicator, SerialCommunicator};
    use std::sync::Arc;

    fn materials() -> Vec<Material> {
        let a = Arc::new(
            Nuclide::new("A", 1.0, vec![1.0, 10.0, 100.0], vec![1.0, 5.0, 1.0], vec![]).unwrap(),
        );
        let b = Arc::new(
            Nuclide::new("B", 1.0, vec![1.0, 30.0, 100.0], vec![4.0, 2.0, 4.0], vec![]).unwrap(),
        );
        let mut m1 = Material::new(1);
        m1.add_nuclide(a, 1.0).unwrap();
        let mut m2 = Material::new(2);
        m2.add_nuclide(b, 1.0).unwrap();
        vec![m1, m2]
    }

    #[test]
    fn test_majorant_bounds_every_material() {
        let mats = materials();
        let maj = Majorant::build(&mats).unwrap();
        assert_eq!(maj.energy_grid(), &[1.0, 10.0, 30.0, 100.0]);
        let mut e = 0.5;
        while e < 200.0 {
            let bound = maj.evaluate(e);
            for m in &mats {
                assert!(m.total_xs(e) <= bound + 1e-12, "E = {}", e);
            }
            e *= 1.07;
        }
    }

    #[test]
    fn test_empty_materials_rejected() {
        assert!(Majorant::build(&[Material::new(1)]).is_err());
        assert!(Majorant::from_tables(vec![1.0, 2.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_artifact_written_by_root_only() {
        let maj = Majorant::from_tables(vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
        let dir = std::env::temp_dir();
        let root_path = dir.join(format!("majorant-root-{}.json", std::process::id()));
        maj.write_artifact(&SerialCommunicator, &root_path).unwrap();
        let rows: Vec<Vec<f64>> =
            serde_json::from_str(&std::fs::read_to_string(&root_path).unwrap()).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        std::fs::remove_file(&root_path).unwrap();

        let other = LocalCommunicator::group(2).pop().unwrap();
        let other_path = dir.join(format!("majorant-rank1-{}.json", std::process::id()));
        maj.write_artifact(&other, &other_path).unwrap();
        assert!(!other_path.exists());
    }
}
