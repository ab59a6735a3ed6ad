//! Caller-side ownership of a run's lifecycle.
//!
//! A [`BenchmarkSession`] runs the engine on a background thread and keeps
//! the resulting [`RunState`] in a shared cell that callers can poll or
//! block on. At most one run is active per session. Every run is tagged
//! with a generation number, and events from a generation that has been
//! cancelled or superseded are dropped, so a late worker callback can never
//! revive a run the caller has abandoned.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, info, warn};

use crate::core::error::{BenchError, Result};
use crate::core::partition::Partition;
use crate::core::result::{BenchmarkResult, RunState, SpeedupReport, ThreadMode};
use crate::core::runner::{BenchmarkEngine, CancelToken};
use crate::core::score;

/// Notification pushed to subscribers as a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started { generation: u64, mode: ThreadMode, workers: usize },
    /// `progress` is the session's running maximum, not the raw worker value.
    Progress { generation: u64, progress: f32, worker: usize },
    Completed { generation: u64, result: BenchmarkResult },
    Failed { generation: u64, reason: String },
    Cancelled { generation: u64 },
}

impl RunEvent {
    pub fn generation(&self) -> u64 {
        match self {
            RunEvent::Started { generation, .. }
            | RunEvent::Progress { generation, .. }
            | RunEvent::Completed { generation, .. }
            | RunEvent::Failed { generation, .. }
            | RunEvent::Cancelled { generation } => *generation,
        }
    }
}

#[derive(Debug)]
struct Shared {
    generation: u64,
    state: RunState,
    single_result: Option<BenchmarkResult>,
    multi_result: Option<BenchmarkResult>,
    subscribers: Vec<Sender<RunEvent>>,
}

impl Shared {
    fn publish(&mut self, event: RunEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn cancel_running(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        let cancelled = self.generation;
        self.generation += 1;
        self.state = RunState::Idle;
        self.publish(RunEvent::Cancelled { generation: cancelled });
        true
    }
}

#[derive(Debug)]
struct StateCell {
    shared: Mutex<Shared>,
    changed: Condvar,
}

impl StateCell {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_progress(&self, generation: u64, progress: f32, worker: usize) {
        let mut shared = self.lock();
        if shared.generation != generation {
            return;
        }
        if let RunState::Running { progress: current, active_workers } = shared.state {
            let progress = current.max(progress.clamp(0.0, 1.0));
            shared.state = RunState::Running { progress, active_workers };
            shared.publish(RunEvent::Progress { generation, progress, worker });
            self.changed.notify_all();
        }
    }

    fn finish(&self, generation: u64, outcome: Result<BenchmarkResult>) {
        let mut shared = self.lock();
        if shared.generation != generation {
            debug!("Discarding outcome of superseded run {}", generation);
            return;
        }

        match outcome {
            Ok(result) => {
                match result.mode {
                    ThreadMode::SingleThread => shared.single_result = Some(result),
                    ThreadMode::MultiThread => shared.multi_result = Some(result),
                }
                shared.state = RunState::Completed { result };
                shared.publish(RunEvent::Completed { generation, result });
            }
            Err(BenchError::Cancelled) => {
                shared.cancel_running();
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Run {} failed: {}", generation, reason);
                shared.state = RunState::Failed { reason: reason.clone() };
                shared.publish(RunEvent::Failed { generation, reason });
            }
        }
        self.changed.notify_all();
    }
}

struct ActiveRun {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl ActiveRun {
    fn join(self) {
        if self.handle.join().is_err() {
            warn!("Benchmark thread terminated abnormally");
        }
    }
}

/// Runs benchmarks in the background and tracks their state.
pub struct BenchmarkSession {
    engine: BenchmarkEngine,
    cell: Arc<StateCell>,
    active: Mutex<Option<ActiveRun>>,
}

impl BenchmarkSession {
    pub fn new(engine: BenchmarkEngine) -> Self {
        Self {
            engine,
            cell: Arc::new(StateCell {
                shared: Mutex::new(Shared {
                    generation: 0,
                    state: RunState::Idle,
                    single_result: None,
                    multi_result: None,
                    subscribers: Vec::new(),
                }),
                changed: Condvar::new(),
            }),
            active: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &BenchmarkEngine {
        &self.engine
    }

    /// Start a single-thread run, cancelling any run in flight.
    pub fn start_single(&self) -> Result<()> {
        Partition::plan(self.engine.total_units(), 1)?;
        self.launch(ThreadMode::SingleThread, 1)
    }

    /// Start a multi-thread run on `workers` threads, cancelling any run in flight.
    pub fn start_multi(&self, workers: usize) -> Result<()> {
        Partition::plan(self.engine.total_units(), workers)?;
        self.launch(ThreadMode::MultiThread, workers)
    }

    fn launch(&self, mode: ThreadMode, workers: usize) -> Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = active.take() {
            previous.cancel.cancel();
            self.cell.lock().cancel_running();
            self.cell.changed.notify_all();
            previous.join();
        }

        let generation = {
            let mut shared = self.cell.lock();
            shared.generation += 1;
            shared.state = RunState::Running { progress: 0.0, active_workers: workers };
            let generation = shared.generation;
            shared.publish(RunEvent::Started { generation, mode, workers });
            self.cell.changed.notify_all();
            generation
        };
        info!("Run {} started ({}, {} workers)", generation, mode.label(), workers);

        let cancel = CancelToken::new();
        let engine = self.engine;
        let cell = Arc::clone(&self.cell);
        let token = cancel.clone();

        let spawned = thread::Builder::new()
            .name(format!("cpumark-run-{}", generation))
            .spawn(move || {
                let outcome = match mode {
                    ThreadMode::SingleThread => engine.run_single_thread(&token, |progress| {
                        cell.report_progress(generation, progress, 0)
                    }),
                    ThreadMode::MultiThread => engine.run_multi_thread(workers, &token, |progress, worker| {
                        cell.report_progress(generation, progress, worker)
                    }),
                };
                cell.finish(generation, outcome);
            });

        match spawned {
            Ok(handle) => {
                *active = Some(ActiveRun { cancel, handle });
                Ok(())
            }
            Err(e) => {
                self.cell.finish(generation, Err(BenchError::ExecutionFailure(format!(
                    "Failed to spawn benchmark thread: {}", e
                ))));
                Err(BenchError::IoError(e))
            }
        }
    }

    /// Cancel the run in flight, if any. The state returns to `Idle`.
    ///
    /// Does not wait for workers; they stop after their current unit.
    pub fn cancel(&self) {
        if let Some(active) = self.active.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            active.cancel.cancel();
        }
        if self.cell.lock().cancel_running() {
            info!("Run cancelled");
        }
        self.cell.changed.notify_all();
    }

    /// Cancel any run and forget stored results.
    pub fn reset(&self) {
        self.cancel();
        let mut shared = self.cell.lock();
        shared.state = RunState::Idle;
        shared.single_result = None;
        shared.multi_result = None;
        self.cell.changed.notify_all();
    }

    pub fn state(&self) -> RunState {
        self.cell.lock().state.clone()
    }

    /// Block until the current run leaves `Running`.
    pub fn wait(&self) -> RunState {
        let shared = self.cell.lock();
        let shared = self
            .cell
            .changed
            .wait_while(shared, |s| s.state.is_running())
            .unwrap_or_else(PoisonError::into_inner);
        shared.state.clone()
    }

    /// Block until the state changes or `timeout` elapses, then return it.
    pub fn wait_timeout(&self, timeout: Duration) -> RunState {
        let shared = self.cell.lock();
        if !shared.state.is_running() {
            return shared.state.clone();
        }
        let (shared, _) = self
            .cell
            .changed
            .wait_timeout(shared, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        shared.state.clone()
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<RunEvent> {
        let (tx, rx) = mpsc::channel();
        self.cell.lock().subscribers.push(tx);
        rx
    }

    pub fn single_result(&self) -> Option<BenchmarkResult> {
        self.cell.lock().single_result
    }

    pub fn multi_result(&self) -> Option<BenchmarkResult> {
        self.cell.lock().multi_result
    }

    /// Comparison of the latest single- and multi-thread results.
    pub fn comparison(&self) -> Option<SpeedupReport> {
        let shared = self.cell.lock();
        match (shared.single_result, shared.multi_result) {
            (Some(single), Some(multi)) => Some(score::compare(single, multi)),
            _ => None,
        }
    }
}

impl Drop for BenchmarkSession {
    fn drop(&mut self) {
        self.cancel();
        let active = self.active.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(active) = active {
            active.join();
        }
    }
}
