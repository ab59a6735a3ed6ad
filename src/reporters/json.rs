use std::io::{self, Write};
use std::fs::File;
use serde_json::{json, Value};

use crate::core::config::BenchConfig;
use crate::core::hardware::DeviceInfo;
use crate::core::result::{BenchmarkResult, ThreadMode};
use crate::reporters::{Reporter, RunSummary};

/// JSON reporter for machine-readable output
pub struct JsonReporter {
    output_file: Option<String>,
    verbose: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new(output_file: Option<String>, verbose: bool) -> Self {
        Self { output_file, verbose }
    }

    fn result_value(result: &BenchmarkResult) -> Value {
        json!({
            "mode": result.mode.label(),
            "score": result.score,
            "time_taken_ms": result.time_taken_ms,
            "workers_used": result.workers_used,
        })
    }

    /// Build the final document for a summary
    pub fn summary_value(summary: &RunSummary) -> Value {
        let results: Vec<Value> = summary.results.iter().map(Self::result_value).collect();

        let comparison = summary.comparison.as_ref().map(|c| {
            json!({
                "theoretical_speedup": c.theoretical_speedup,
                "actual_speedup": c.actual_speedup,
                "speedup_multiplier": c.speedup_multiplier,
                "efficiency": c.efficiency,
            })
        });

        json!({
            "summary": {
                "result": if summary.failure.is_some() { "FAIL" } else { "PASS" },
                "failure": summary.failure,
                "timestamp": summary.started_at.to_rfc3339(),
                "device": summary.device,
            },
            "results": results,
            "comparison": comparison,
        })
    }

    /// Write JSON to file or stdout
    fn write_json(&self, json_value: Value) -> io::Result<()> {
        let json_string = serde_json::to_string_pretty(&json_value)?;

        match &self.output_file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(json_string.as_bytes())?;
            }
            None => {
                println!("{}", json_string);
            }
        }

        Ok(())
    }

    fn write_event(&self, event: Value) {
        // Events go to stdout only; a file receives just the summary.
        if self.verbose && self.output_file.is_none() {
            let _ = self.write_json(event);
        }
    }
}

impl Reporter for JsonReporter {
    fn report_start(&self, config: &BenchConfig, device: &DeviceInfo) {
        self.write_event(json!({
            "event": "benchmark_start",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "device": device,
            "config": {
                "total_units": config.total_units,
                "workers": config.workers,
                "workload": config.workload,
            }
        }));
    }

    fn report_run_start(&self, mode: ThreadMode, workers: usize) {
        self.write_event(json!({
            "event": "run_start",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "mode": mode.label(),
            "workers": workers,
        }));
    }

    fn report_result(&self, result: &BenchmarkResult) {
        self.write_event(json!({
            "event": "run_result",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "result": Self::result_value(result),
        }));
    }

    fn report_summary(&self, summary: &RunSummary) {
        if let Err(e) = self.write_json(Self::summary_value(summary)) {
            eprintln!("Error writing JSON output: {}", e);
        }
    }

    fn report_warning(&self, message: &str) {
        self.write_event(json!({
            "event": "warning",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "message": message,
        }));
    }

    fn report_info(&self, message: &str) {
        self.write_event(json!({
            "event": "info",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "message": message,
        }));
    }
}
