pub mod text;
pub mod json;
pub mod csv;

use chrono::{DateTime, Utc};

use crate::core::config::BenchConfig;
use crate::core::hardware::DeviceInfo;
use crate::core::result::{BenchmarkResult, SpeedupReport, ThreadMode};
use crate::core::score;

/// Everything produced by one invocation of the tool.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub device: DeviceInfo,
    pub results: Vec<BenchmarkResult>,
    pub comparison: Option<SpeedupReport>,
    pub failure: Option<String>,
}

impl RunSummary {
    pub fn new(device: DeviceInfo) -> Self {
        Self {
            started_at: Utc::now(),
            device,
            results: Vec::new(),
            comparison: None,
            failure: None,
        }
    }

    /// Build the comparison once both modes have a result.
    pub fn finalize(&mut self) {
        let single = self.latest(ThreadMode::SingleThread);
        let multi = self.latest(ThreadMode::MultiThread);
        self.comparison = match (single, multi) {
            (Some(single), Some(multi)) => Some(score::compare(single, multi)),
            _ => None,
        };
    }

    fn latest(&self, mode: ThreadMode) -> Option<BenchmarkResult> {
        self.results.iter().rev().find(|r| r.mode == mode).copied()
    }
}

/// Reporter trait for outputting benchmark results
pub trait Reporter {
    /// Report the start of benchmarking
    fn report_start(&self, config: &BenchConfig, device: &DeviceInfo);

    /// Report the start of a single run
    fn report_run_start(&self, mode: ThreadMode, workers: usize);

    /// Report the result of a single run
    fn report_result(&self, result: &BenchmarkResult);

    /// Report the final summary
    fn report_summary(&self, summary: &RunSummary);

    /// Report a warning message
    fn report_warning(&self, message: &str);

    /// Report an informational message
    fn report_info(&self, message: &str);
}
