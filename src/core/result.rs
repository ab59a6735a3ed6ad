use serde::{Serialize, Deserialize};

/// How a benchmark run was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadMode {
    SingleThread,
    MultiThread,
}

impl ThreadMode {
    /// Short label used by reporters.
    pub fn label(&self) -> &'static str {
        match self {
            ThreadMode::SingleThread => "single-thread",
            ThreadMode::MultiThread => "multi-thread",
        }
    }
}

/// The outcome of one completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub score: u64,
    pub time_taken_ms: u64,
    pub mode: ThreadMode,
    pub workers_used: usize,
}

/// Lifecycle of a run as seen by the caller that started it.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Running { progress: f32, active_workers: usize },
    Completed { result: BenchmarkResult },
    Failed { reason: String },
}

impl RunState {
    /// Returns `true` while a run is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    /// Returns `true` if no run is in flight and nothing is pending review.
    pub fn is_idle(&self) -> bool {
        matches!(self, RunState::Idle)
    }

    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed { .. } | RunState::Failed { .. })
    }

    /// Current progress in `[0, 1]`; `1.0` once completed.
    pub fn progress(&self) -> f32 {
        match self {
            RunState::Running { progress, .. } => *progress,
            RunState::Completed { .. } => 1.0,
            RunState::Idle | RunState::Failed { .. } => 0.0,
        }
    }
}

/// Side-by-side view of a single-thread and a multi-thread result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedupReport {
    pub single: BenchmarkResult,
    pub multi: BenchmarkResult,
    pub theoretical_speedup: f64,
    /// Multi-thread time divided by single-thread time.
    pub actual_speedup: f64,
    /// Inverse of `actual_speedup`; above 1.0 means multi-thread was faster.
    pub speedup_multiplier: f64,
    /// `speedup_multiplier / theoretical_speedup`.
    pub efficiency: f64,
}
