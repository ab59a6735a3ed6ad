use crate::core::error::{BenchError, Result};

/// How a fixed number of work units is split across workers.
///
/// With `total_units / workers >= 1` each worker runs that many units and
/// the remainder is not run by anyone. With more workers than units the
/// fallback split applies, which assigns the same integer quotient (zero)
/// but reports progress against `total_units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub total_units: u32,
    pub workers: usize,
    pub units_per_worker: u32,
    pub fallback: bool,
}

impl Partition {
    /// Plans the split of `total_units` over `workers`.
    pub fn plan(total_units: u32, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(BenchError::InvalidParameter(
                "worker count must be at least 1".to_string(),
            ));
        }
        if total_units == 0 {
            return Err(BenchError::InvalidParameter(
                "total units must be at least 1".to_string(),
            ));
        }

        let per_worker = Self::quotient(total_units, workers);

        Ok(Self {
            total_units,
            workers,
            units_per_worker: per_worker,
            fallback: per_worker == 0,
        })
    }

    fn quotient(total_units: u32, workers: usize) -> u32 {
        // workers > u32::MAX can only give a zero quotient
        u32::try_from(workers).map_or(0, |w| total_units / w)
    }

    /// Units that will actually run across all workers.
    pub fn executed_units(&self) -> u64 {
        u64::from(self.units_per_worker) * self.workers as u64
    }

    /// Units of `total_units` that no worker runs.
    pub fn dropped_units(&self) -> u64 {
        u64::from(self.total_units).saturating_sub(self.executed_units())
    }

    /// Progress reported by `worker` after finishing its local `iteration`
    /// (0-indexed).
    pub fn progress(&self, worker: usize, iteration: u32) -> f32 {
        let done = worker as f64 * f64::from(self.units_per_worker) + f64::from(iteration) + 1.0;
        let denominator = if self.fallback {
            f64::from(self.total_units)
        } else {
            self.workers as f64 * f64::from(self.units_per_worker)
        };
        (done / denominator) as f32
    }
}
