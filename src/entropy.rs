// Spatial Shannon entropy of the particle weight distribution, used to judge
// whether the fission source has converged.

use crate::error::{Error, Result};
use crate::parallel::Communicator;
use crate::vector::Position;
use log::warn;
use serde::Deserialize;

/// Which particle weights an entropy mesh tallies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
    #[default]
    Total,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entropy {
    lower_corner: Position,
    upper_corner: Position,
    shape: [usize; 3],
    dx: f64,
    dy: f64,
    dz: f64,
    bins: Vec<f64>,
    total_weight: f64,
    sign: Sign,
}

impl Entropy {
    pub fn new(
        lower_corner: Position,
        upper_corner: Position,
        shape: [usize; 3],
        sign: Sign,
    ) -> Result<Self> {
        if shape.iter().any(|&n| n == 0) {
            return Err(Error::config(
                "entropy mesh",
                format!("shape entries must be positive, got {:?}", shape),
            ));
        }
        for axis in 0..3 {
            if !(upper_corner[axis] > lower_corner[axis]) {
                return Err(Error::config(
                    "entropy mesh",
                    format!(
                        "upper corner {:?} must exceed lower corner {:?} on every axis",
                        upper_corner.as_slice(),
                        lower_corner.as_slice()
                    ),
                ));
            }
        }

        Ok(Entropy {
            lower_corner,
            upper_corner,
            shape,
            dx: (upper_corner.x - lower_corner.x) / shape[0] as f64,
            dy: (upper_corner.y - lower_corner.y) / shape[1] as f64,
            dz: (upper_corner.z - lower_corner.z) / shape[2] as f64,
            bins: vec![0.0; shape[0] * shape[1] * shape[2]],
            total_weight: 0.0,
            sign,
        })
    }

    /// Flat bin index for a position, or `None` when it lies outside the mesh
    fn bin_index(&self, r: &Position) -> Option<usize> {
        let nx = ((r.x - self.lower_corner.x) / self.dx).floor();
        let ny = ((r.y - self.lower_corner.y) / self.dy).floor();
        let nz = ((r.z - self.lower_corner.z) / self.dz).floor();

        let inside = |n: f64, len: usize| n >= 0.0 && n < len as f64;
        if inside(nx, self.shape[0]) && inside(ny, self.shape[1]) && inside(nz, self.shape[2]) {
            let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
            Some(self.shape[1] * self.shape[2] * nx + self.shape[2] * ny + nz)
        } else {
            None
        }
    }

    pub fn add_point(&mut self, r: &Position, w: f64) {
        self.total_weight += w;

        let point_sign = match self.sign {
            Sign::Total => Sign::Total,
            _ if w > 0.0 => Sign::Positive,
            _ => Sign::Negative,
        };
        if point_sign != self.sign {
            return;
        }
        if let Some(index) = self.bin_index(r) {
            self.bins[index] += w;
        }
    }

    /// Shannon entropy in bits
    pub fn calculate_entropy(&self) -> f64 {
        let total = self.total_weight.abs();
        if total == 0.0 {
            return 0.0;
        }

        let mut sum = 0.0;
        for &b in &self.bins {
            let p = b.abs() / total;
            if p > 1.0 {
                warn!(
                    "Negative entropy: p = {}, bin = {}, total_weight = {}",
                    p, b, self.total_weight
                );
            } else if p != 0.0 {
                sum -= p * p.log2();
            }
        }
        sum
    }

    pub fn calculate_empty_fraction(&self) -> f64 {
        let empty = self.bins.iter().filter(|&&b| b == 0.0).count();
        empty as f64 / self.bins.len() as f64
    }

    pub fn zero(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0.0);
        self.total_weight = 0.0;
    }

    /// Empty mesh with the same layout, for per-thread accumulation
    pub fn empty_like(&self) -> Self {
        let mut copy = self.clone();
        copy.zero();
        copy
    }

    /// Fold another mesh with the same layout into this one
    pub fn merge(&mut self, other: &Entropy) {
        debug_assert_eq!(self.shape, other.shape);
        for (b, o) in self.bins.iter_mut().zip(other.bins.iter()) {
            *b += *o;
        }
        self.total_weight += other.total_weight;
    }

    /// Sum bins and total weight over all ranks onto rank 0
    pub fn synchronize(&mut self, comm: &dyn Communicator) -> Result<()> {
        comm.reduce_sum(&mut self.bins, 0)?;
        comm.reduce_sum_scalar(&mut self.total_weight, 0)
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn lower_corner(&self) -> &Position {
        &self.lower_corner
    }

    pub fn upper_corner(&self) -> &Position {
        &self.upper_corner
    }
}
