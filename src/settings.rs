use crate::constants::{MAJORANT_TOLERANCE, SURFACE_COINCIDENT};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run-time knobs consumed by the transport and collision operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Particles below this energy (eV) are killed after scattering
    pub min_energy: f64,
    pub surface_coincident: f64,
    /// Allowed excess of the true total cross section over the majorant
    pub majorant_tolerance: f64,
    /// Russian roulette is played below this weight magnitude
    pub weight_cutoff: f64,
    /// Weight magnitude given to roulette survivors
    pub weight_survival: f64,
    pub seed: u64,
    /// Where rank 0 writes the majorant table, if anywhere. A `.h5`
    /// extension selects HDF5 when that feature is enabled.
    pub majorant_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_energy: 1.0e-5,
            surface_coincident: SURFACE_COINCIDENT,
            majorant_tolerance: MAJORANT_TOLERANCE,
            weight_cutoff: 0.25,
            weight_survival: 1.0,
            seed: 19073486328125,
            majorant_file: None,
        }
    }
}

impl Settings {
    /// Read settings from a JSON object, filling unspecified fields with defaults
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let settings: Settings = serde_json::from_value(value.clone())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_energy >= 0.0) {
            return Err(Error::config(
                "settings",
                format!("min_energy must be non-negative, got {}", self.min_energy),
            ));
        }
        if !(self.surface_coincident > 0.0) || !(self.majorant_tolerance >= 0.0) {
            return Err(Error::config(
                "settings",
                format!(
                    "invalid tolerances: surface_coincident = {}, majorant_tolerance = {}",
                    self.surface_coincident, self.majorant_tolerance
                ),
            ));
        }
        if !(self.weight_cutoff > 0.0) || self.weight_survival <= self.weight_cutoff {
            return Err(Error::config(
                "settings",
                format!(
                    "roulette needs 0 < weight_cutoff < weight_survival, got {} and {}",
                    self.weight_cutoff, self.weight_survival
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.min_energy, 1.0e-5);
        assert_eq!(settings.majorant_tolerance, 1.0e-10);
        assert_eq!(settings.surface_coincident, 1.0e-12);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_partial_json() {
        let settings = Settings::from_json(&json!({"seed": 7, "weight_cutoff": 0.1})).unwrap();
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.weight_cutoff, 0.1);
        assert_eq!(settings.weight_survival, 1.0);
        assert!(settings.majorant_file.is_none());

        let settings = Settings::from_json(&json!({"majorant_file": "out/majorant.json"})).unwrap();
        assert_eq!(settings.majorant_file, Some(PathBuf::from("out/majorant.json")));
    }

    #[test]
    fn test_settings_rejects_bad_roulette() {
        let err = Settings::from_json(&json!({"weight_cutoff": 2.0})).unwrap_err();
        assert!(err.to_string().contains("weight_cutoff"));
    }
}
