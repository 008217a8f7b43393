//! Error types for the transport kernel

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Conditions that abort a run. Particle-level outcomes (roulette kills,
/// zero-yield scatters, out-of-mesh entropy points) are never errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{context}: {message}")]
    Config { context: String, message: String },

    #[error(
        "Particle {history_id}.{secondary_id} has become lost. \
         Previous valid coordinates: r = {previous_r:?}, u = {previous_u:?}. \
         {detail} Currently lost at r = {r:?}, u = {u:?}."
    )]
    LostParticle {
        history_id: u64,
        secondary_id: u64,
        previous_r: [f64; 3],
        previous_u: [f64; 3],
        detail: String,
        r: [f64; 3],
        u: [f64; 3],
    },

    #[error("Total cross section exceeded majorant at {energy} eV. Et = {et}, Emaj = {emaj}")]
    MajorantExceeded { energy: f64, et: f64, emaj: f64 },

    #[error("Impossible boundary condition: {0}")]
    ImpossibleBoundary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl Error {
    pub fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            context: context.into(),
            message: message.into(),
        }
    }
}
