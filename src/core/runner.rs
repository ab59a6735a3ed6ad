use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use log::{debug, info, warn, error};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::config::{BenchConfig, TOTAL_UNITS};
use crate::core::error::{Result, BenchError};
use crate::core::partition::Partition;
use crate::core::result::{BenchmarkResult, ThreadMode};
use crate::core::score::calculate_score;
use crate::workloads::{run_work_unit, WorkloadParams};

/// Shared flag used to stop a run between work units.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not yet cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; workers stop before their next unit.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Benchmark execution engine.
///
/// Holds only immutable parameters, so one engine can serve any number of
/// runs from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkEngine {
    params: WorkloadParams,
    total_units: u32,
}

impl Default for BenchmarkEngine {
    fn default() -> Self {
        Self::new(WorkloadParams::default(), TOTAL_UNITS)
    }
}

impl BenchmarkEngine {
    /// Create an engine running `total_units` units of `params` per run
    pub fn new(params: WorkloadParams, total_units: u32) -> Self {
        Self { params, total_units }
    }

    /// Create an engine from the workload section of a config
    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(config.workload, config.total_units)
    }

    pub fn params(&self) -> &WorkloadParams {
        &self.params
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    /// Run every unit sequentially on the calling thread.
    ///
    /// `on_progress` receives `(i + 1) / total_units` after unit `i`.
    pub fn run_single_thread<F>(&self, cancel: &CancelToken, mut on_progress: F) -> Result<BenchmarkResult>
    where
        F: FnMut(f32),
    {
        let partition = Partition::plan(self.total_units, 1)?;
        info!("Starting single-thread benchmark ({} units)", partition.total_units);

        let start_time = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut rng = StdRng::from_entropy();
            for i in 0..partition.total_units {
                if cancel.is_cancelled() {
                    return Err(BenchError::Cancelled);
                }
                run_work_unit(&self.params, &mut rng);
                on_progress((i + 1) as f32 / partition.total_units as f32);
            }
            Ok(())
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                info!("Single-thread benchmark stopped: {}", e);
                return Err(e);
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Single-thread benchmark failed: {}", reason);
                return Err(BenchError::ExecutionFailure(reason));
            }
        }

        let result = Self::finish(start_time, ThreadMode::SingleThread, 1);
        info!("Single-thread benchmark finished in {} ms (score {})", result.time_taken_ms, result.score);
        Ok(result)
    }

    /// Split the units across `worker_count` threads and wait for all of them.
    ///
    /// `on_progress` receives `(progress, worker)` and is called concurrently
    /// from every worker thread.
    pub fn run_multi_thread<F>(&self, worker_count: usize, cancel: &CancelToken, on_progress: F) -> Result<BenchmarkResult>
    where
        F: Fn(f32, usize) + Sync,
    {
        let partition = Partition::plan(self.total_units, worker_count)?;

        if partition.fallback {
            warn!(
                "{} workers exceed {} units; using fixed partition of {} units per worker",
                worker_count, partition.total_units, partition.units_per_worker
            );
        } else if partition.dropped_units() > 0 {
            warn!(
                "{} units do not divide across {} workers; {} units will not run",
                partition.total_units, worker_count, partition.dropped_units()
            );
        }
        info!(
            "Starting multi-thread benchmark ({} workers x {} units)",
            worker_count, partition.units_per_worker
        );

        let start_time = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|index| format!("cpumark-worker-{}", index))
            .build()
            .map_err(|e| BenchError::ExecutionFailure(format!("Failed to start worker pool: {}", e)))?;

        // One call per pool thread, so exactly `worker_count` workers run.
        let outcomes: Vec<Result<u32>> = pool.broadcast(|ctx| {
            let worker = ctx.index();
            debug!("Worker {} dispatched", worker);
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_worker(worker, &partition, cancel, &on_progress)
            }))
            .unwrap_or_else(|payload| {
                Err(BenchError::ExecutionFailure(format!(
                    "worker {} panicked: {}",
                    worker,
                    panic_message(payload.as_ref())
                )))
            })
        });
        drop(pool);

        let mut executed = 0u64;
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                Ok(units) => executed += u64::from(units),
                Err(BenchError::Cancelled) => cancelled = true,
                Err(e) => {
                    error!("Multi-thread benchmark failed: {}", e);
                    return Err(e);
                }
            }
        }
        if cancelled {
            info!("Multi-thread benchmark cancelled");
            return Err(BenchError::Cancelled);
        }

        let result = Self::finish(start_time, ThreadMode::MultiThread, worker_count);
        info!(
            "Multi-thread benchmark finished in {} ms (score {}, {} units executed)",
            result.time_taken_ms, result.score, executed
        );
        Ok(result)
    }

    fn run_worker<F>(&self, worker: usize, partition: &Partition, cancel: &CancelToken, on_progress: &F) -> Result<u32>
    where
        F: Fn(f32, usize) + Sync,
    {
        let mut rng = StdRng::from_entropy();
        for iteration in 0..partition.units_per_worker {
            if cancel.is_cancelled() {
                debug!("Worker {} stopping after {} units", worker, iteration);
                return Err(BenchError::Cancelled);
            }
            run_work_unit(&self.params, &mut rng);
            on_progress(partition.progress(worker, iteration), worker);
        }
        Ok(partition.units_per_worker)
    }

    fn finish(start_time: Instant, mode: ThreadMode, workers_used: usize) -> BenchmarkResult {
        let time_taken_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        BenchmarkResult {
            score: calculate_score(i64::try_from(time_taken_ms).unwrap_or(i64::MAX)),
            time_taken_ms,
            mode,
            workers_used,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn light_engine() -> BenchmarkEngine {
        BenchmarkEngine::new(WorkloadParams::light(), TOTAL_UNITS)
    }

    #[test]
    fn test_single_thread_result_structure() {
        let mut progress = Vec::new();
        let result = light_engine()
            .run_single_thread(&CancelToken::new(), |p| progress.push(p))
            .unwrap();

        assert_eq!(result.mode, ThreadMode::SingleThread);
        assert_eq!(result.workers_used, 1);
        assert_eq!(result.score, calculate_score(result.time_taken_ms as i64));

        assert_eq!(progress.len(), 50);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*progress.last().unwrap(), 1.0);
    }

    #[test]
    fn test_single_thread_with_default_workload() {
        let engine = BenchmarkEngine::new(WorkloadParams::default(), 1);
        let mut calls = 0;
        let result = engine.run_single_thread(&CancelToken::new(), |_| calls += 1).unwrap();
        assert_eq!(calls, 1);
        assert_eq!(result.workers_used, 1);
    }

    #[test]
    fn test_multi_thread_drops_remainder() {
        let calls = AtomicUsize::new(0);
        let result = light_engine()
            .run_multi_thread(4, &CancelToken::new(), |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(result.mode, ThreadMode::MultiThread);
        assert_eq!(result.workers_used, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 48);
    }

    #[test]
    fn test_multi_thread_progress_per_worker_is_increasing() {
        let seen: Mutex<HashMap<usize, Vec<f32>>> = Mutex::new(HashMap::new());
        light_engine()
            .run_multi_thread(5, &CancelToken::new(), |p, worker| {
                seen.lock().unwrap().entry(worker).or_default().push(p);
            })
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 5);
        for (worker, progress) in &seen {
            assert_eq!(progress.len(), 10, "worker {}", worker);
            assert!(progress.windows(2).all(|w| w[0] < w[1]));
            assert!(progress.iter().all(|&p| p > 0.0 && p <= 1.0));
        }
        assert_eq!(*seen[&4].last().unwrap(), 1.0);
    }

    #[test]
    fn test_multi_thread_fallback_partition() {
        let calls = AtomicUsize::new(0);
        let result = light_engine()
            .run_multi_thread(60, &CancelToken::new(), |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(result.workers_used, 60);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multi_thread_single_worker_runs_everything() {
        let calls = AtomicUsize::new(0);
        light_engine()
            .run_multi_thread(1, &CancelToken::new(), |_, worker| {
                assert_eq!(worker, 0);
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_multi_thread_rejects_zero_workers() {
        let result = light_engine().run_multi_thread(0, &CancelToken::new(), |_, _| {});
        assert!(matches!(result, Err(BenchError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_units_rejected() {
        let engine = BenchmarkEngine::new(WorkloadParams::light(), 0);
        assert!(matches!(
            engine.run_single_thread(&CancelToken::new(), |_| {}),
            Err(BenchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let engine = light_engine();
        assert!(matches!(engine.run_single_thread(&cancel, |_| {}), Err(BenchError::Cancelled)));
        assert!(matches!(engine.run_multi_thread(4, &cancel, |_, _| {}), Err(BenchError::Cancelled)));
    }

    #[test]
    fn test_single_thread_cancel_mid_run() {
        let cancel = CancelToken::new();
        let mut calls = 0;
        let result = light_engine().run_single_thread(&cancel, |_| {
            calls += 1;
            if calls == 3 {
                cancel.cancel();
            }
        });

        assert!(matches!(result, Err(BenchError::Cancelled)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_multi_thread_cancel_stops_new_units() {
        let cancel = CancelToken::new();
        let calls = AtomicUsize::new(0);
        let result = light_engine().run_multi_thread(2, &cancel, |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            cancel.cancel();
        });

        assert!(matches!(result, Err(BenchError::Cancelled)));
        // Each worker finishes at most the unit it was running.
        assert!(calls.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_worker_panic_fails_run() {
        let result = light_engine().run_multi_thread(3, &CancelToken::new(), |_, worker| {
            if worker == 1 {
                panic!("simulated resource exhaustion");
            }
        });

        match result {
            Err(BenchError::ExecutionFailure(reason)) => {
                assert!(reason.contains("worker 1"));
                assert!(reason.contains("simulated resource exhaustion"));
            }
            other => panic!("expected execution failure, got {:?}", other),
        }
    }

    #[test]
    fn test_single_thread_panic_fails_run() {
        let result = light_engine().run_single_thread(&CancelToken::new(), |_| {
            panic!("progress observer exploded");
        });
        assert!(matches!(result, Err(BenchError::ExecutionFailure(reason)) if reason.contains("exploded")));
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
