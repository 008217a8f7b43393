// Sum-reduction between cooperating workers.
//
// Every rank of a group must call `reduce_sum` the same number of times with
// buffers of the same length; the call blocks until all of them arrive.

use crate::error::{Error, Result};
use std::sync::{Arc, Barrier, Mutex};

pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Add `values` elementwise across all ranks. Only `root` receives the
    /// result; the buffers of other ranks are left untouched.
    fn reduce_sum(&self, values: &mut [f64], root: usize) -> Result<()>;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }

    fn reduce_sum_scalar(&self, value: &mut f64, root: usize) -> Result<()> {
        self.reduce_sum(std::slice::from_mut(value), root)
    }
}

/// Single worker: reductions are the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn reduce_sum(&self, _values: &mut [f64], _root: usize) -> Result<()> {
        Ok(())
    }
}

struct SharedBuffer {
    sum: Mutex<Vec<f64>>,
    mismatch: Mutex<bool>,
    barrier: Barrier,
}

/// In-process group of workers, one handle per rank, typically moved into
/// one thread each.
#[derive(Clone)]
pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    shared: Arc<SharedBuffer>,
}

impl LocalCommunicator {
    /// Handles for a group of `size` ranks sharing one reduction buffer
    pub fn group(size: usize) -> Vec<LocalCommunicator> {
        let size = size.max(1);
        let shared = Arc::new(SharedBuffer {
            sum: Mutex::new(Vec::new()),
            mismatch: Mutex::new(false),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| LocalCommunicator {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl std::fmt::Debug for LocalCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn reduce_sum(&self, values: &mut [f64], root: usize) -> Result<()> {
        if root >= self.size {
            return Err(Error::config(
                "reduce_sum",
                format!("root rank {} outside group of size {}", root, self.size),
            ));
        }

        if self.rank == root {
            let mut sum = self.shared.sum.lock().unwrap_or_else(|e| e.into_inner());
            sum.clear();
            sum.resize(values.len(), 0.0);
            *self.shared.mismatch.lock().unwrap_or_else(|e| e.into_inner()) = false;
        }
        self.shared.barrier.wait();

        {
            let mut sum = self.shared.sum.lock().unwrap_or_else(|e| e.into_inner());
            if sum.len() == values.len() {
                for (acc, v) in sum.iter_mut().zip(values.iter()) {
                    *acc += *v;
                }
            } else {
                *self.shared.mismatch.lock().unwrap_or_else(|e| e.into_inner()) = true;
            }
        }
        self.shared.barrier.wait();

        // Every rank reads the flag before root can reset it in the next round
        let mismatch = *self.shared.mismatch.lock().unwrap_or_else(|e| e.into_inner());
        if self.rank == root && !mismatch {
            let sum = self.shared.sum.lock().unwrap_or_else(|e| e.into_inner());
            values.copy_from_slice(&sum);
        }
        self.shared.barrier.wait();

        if mismatch {
            return Err(Error::config(
                "reduce_sum",
                "ranks supplied buffers of different lengths",
            ));
        }
        Ok(())
    }
}
