use std::io::{self, Write};
use std::time::Duration;
use colored::*;
use chrono::Local;

use crate::core::config::BenchConfig;
use crate::core::hardware::DeviceInfo;
use crate::core::result::{BenchmarkResult, ThreadMode};
use crate::reporters::{Reporter, RunSummary};

/// Text reporter for console output
pub struct TextReporter {
    verbose: bool,
    quiet: bool,
}

impl TextReporter {
    /// Create a new text reporter
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    fn format_time(time_taken_ms: u64) -> String {
        humantime::format_duration(Duration::from_millis(time_taken_ms)).to_string()
    }

    fn format_mode(mode: ThreadMode) -> ColoredString {
        match mode {
            ThreadMode::SingleThread => "SINGLE-THREAD".cyan().bold(),
            ThreadMode::MultiThread => "MULTI-THREAD".magenta().bold(),
        }
    }

    fn format_result(result: &BenchmarkResult) -> String {
        format!(
            "{}  score {}  time {}  workers {}",
            Self::format_mode(result.mode),
            result.score.to_string().green().bold(),
            Self::format_time(result.time_taken_ms),
            result.workers_used
        )
    }

    fn flush() {
        let _ = io::stdout().flush();
    }
}

impl Reporter for TextReporter {
    fn report_start(&self, config: &BenchConfig, device: &DeviceInfo) {
        if self.quiet {
            return;
        }

        println!("{}", "CPU BENCHMARK STARTING".bold());
        println!("======================");
        println!("Started: {}", Local::now().format("%Y-%m-%d %H:%M:%S %Z"));
        println!("Device:  {}", device.device_name);
        println!("CPU:     {} [{}]", device.cpu_brand, device.tier());

        if self.verbose {
            println!("\nBenchmark Configuration:");
            println!("  Work units: {}", config.total_units);
            println!("  Workers: {}", if config.workers == 0 { "auto".to_string() } else { config.workers.to_string() });
            println!("  Fibonacci index: {}", config.workload.fibonacci_index);
            println!("  Matrix size: {}", config.workload.matrix_size);
            println!("  Monte-Carlo iterations: {}", config.workload.monte_carlo_iterations);
            println!("  Prime limit: {}", config.workload.prime_limit);
        }

        println!();
        Self::flush();
    }

    fn report_run_start(&self, mode: ThreadMode, workers: usize) {
        if self.quiet {
            return;
        }

        if self.verbose {
            println!("Starting {} run on {} worker(s)", mode.label().cyan(), workers);
        } else {
            println!("Running {} benchmark...", mode.label().cyan());
        }
        Self::flush();
    }

    fn report_result(&self, result: &BenchmarkResult) {
        if self.quiet {
            return;
        }

        println!("{}", Self::format_result(result));
        Self::flush();
    }

    fn report_summary(&self, summary: &RunSummary) {
        if self.quiet {
            for result in &summary.results {
                println!("{} {}", result.mode.label(), result.score);
            }
            if let Some(reason) = &summary.failure {
                println!("FAILED {}", reason);
            }
            return;
        }

        println!("\n{}", "CPU BENCHMARK RESULTS".bold());
        println!("=====================");
        println!("Device: {} ({})", summary.device.device_name, summary.device.os_version);
        println!("Started: {}", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!();

        for result in &summary.results {
            println!("{}", Self::format_result(result));
        }

        if let Some(comparison) = &summary.comparison {
            println!("\n{}", "SPEEDUP".bold());
            println!("  Theoretical: {:.2}x", comparison.theoretical_speedup);
            println!("  Actual:      {:.2}x", comparison.speedup_multiplier);
            println!("  Time ratio:  {:.3} (multi / single)", comparison.actual_speedup);
            let efficiency = format!("{:.0}%", comparison.efficiency * 100.0);
            let efficiency = if comparison.efficiency >= 0.75 {
                efficiency.green()
            } else if comparison.efficiency >= 0.4 {
                efficiency.yellow()
            } else {
                efficiency.red()
            };
            println!("  Efficiency:  {}", efficiency);
        }

        if let Some(reason) = &summary.failure {
            println!("\n{}: {}", "FAILED".red().bold(), reason);
        }
        Self::flush();
    }

    fn report_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        eprintln!("{}: {}", "WARNING".yellow().bold(), message);
    }

    fn report_info(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.verbose {
            println!("{}: {}", "INFO".blue().bold(), message);
        }
    }
}
