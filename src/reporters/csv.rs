use std::fs::File;
use std::io::{self, Write};
use csv::Writer;

use crate::core::config::BenchConfig;
use crate::core::hardware::DeviceInfo;
use crate::core::result::{BenchmarkResult, ThreadMode};
use crate::reporters::{Reporter, RunSummary};

/// CSV reporter for spreadsheet-compatible output
pub struct CsvReporter {
    output_file: Option<String>,
}

impl CsvReporter {
    /// Create a new CSV reporter
    pub fn new(output_file: Option<String>) -> Self {
        Self { output_file }
    }

    /// Create a CSV writer
    fn create_writer(&self) -> io::Result<Writer<Box<dyn Write>>> {
        match &self.output_file {
            Some(path) => {
                let file = File::create(path)?;
                Ok(csv::Writer::from_writer(Box::new(file) as Box<dyn Write>))
            }
            None => {
                Ok(csv::Writer::from_writer(Box::new(io::stdout()) as Box<dyn Write>))
            }
        }
    }

    /// Write the summary sections to `writer`
    pub fn write_summary<W: Write>(writer: &mut Writer<W>, summary: &RunSummary) -> csv::Result<()> {
        writer.write_record(["Mode", "Workers", "Time (ms)", "Score"])?;
        for result in &summary.results {
            let workers = result.workers_used.to_string();
            let time_taken = result.time_taken_ms.to_string();
            let score = result.score.to_string();
            writer.write_record([result.mode.label(), workers.as_str(), time_taken.as_str(), score.as_str()])?;
        }

        writer.write_record([""; 4])?;
        writer.write_record(["Summary", "", "", ""])?;

        let mut records = vec![
            ["Device".to_string(), summary.device.device_name.clone()],
            ["CPU".to_string(), summary.device.cpu_brand.clone()],
            ["Logical Cores".to_string(), summary.device.logical_cores.to_string()],
            ["Test Date".to_string(), summary.started_at.format("%Y-%m-%d").to_string()],
            ["Test Time".to_string(), summary.started_at.format("%H:%M:%S").to_string()],
        ];
        if let Some(comparison) = &summary.comparison {
            records.push(["Theoretical Speedup".to_string(), format!("{:.2}", comparison.theoretical_speedup)]);
            records.push(["Time Ratio".to_string(), format!("{:.3}", comparison.actual_speedup)]);
            records.push(["Speedup".to_string(), format!("{:.2}", comparison.speedup_multiplier)]);
            records.push(["Efficiency".to_string(), format!("{:.3}", comparison.efficiency)]);
        }
        if let Some(reason) = &summary.failure {
            records.push(["Failure".to_string(), reason.clone()]);
        }

        for [key, value] in &records {
            writer.write_record([key.as_str(), value.as_str(), "", ""])?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Reporter for CsvReporter {
    fn report_start(&self, _config: &BenchConfig, _device: &DeviceInfo) {
        // CSV reporter doesn't output anything at start
    }

    fn report_run_start(&self, _mode: ThreadMode, _workers: usize) {}

    fn report_result(&self, _result: &BenchmarkResult) {
        // Individual results are only reported in the final output
    }

    fn report_summary(&self, summary: &RunSummary) {
        let mut writer = match self.create_writer() {
            Ok(w) => w,
            Err(e) => {
                eprintln!("Error creating CSV writer: {}", e);
                return;
            }
        };

        if let Err(e) = Self::write_summary(&mut writer, summary) {
            eprintln!("Error writing CSV output: {}", e);
        }
    }

    fn report_warning(&self, _message: &str) {}

    fn report_info(&self, _message: &str) {}
}
