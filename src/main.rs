use std::process;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use anyhow::{Result, Context};
use indicatif::{ProgressBar, ProgressStyle};
use indoc::formatdoc;
use log::{info, error};
use simple_logger::SimpleLogger;

use cpumark::core::config::{self, BenchConfig};
use cpumark::core::hardware::{self, DeviceInfo};
use cpumark::core::partition::Partition;
use cpumark::core::result::{RunState, ThreadMode};
use cpumark::core::runner::{BenchmarkEngine, CancelToken};
use cpumark::core::session::BenchmarkSession;
use cpumark::reporters::{Reporter, RunSummary, text::TextReporter, json::JsonReporter, csv::CsvReporter};

const EXIT_FAILED: i32 = 1;
const EXIT_CANCELLED: i32 = 130;


#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the summary to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,

    /// Load settings from a TOML or JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use light workloads for a fast smoke run
    #[arg(long, global = true)]
    quick: bool,

    #[command(subcommand)]
    command: Commands,
}


#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl From<OutputFormat> for config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => config::OutputFormat::Text,
            OutputFormat::Json => config::OutputFormat::Json,
            OutputFormat::Csv => config::OutputFormat::Csv,
        }
    }
}


#[derive(Subcommand)]
enum Commands {
    /// Run every work unit on one thread
    Single,

    /// Split the work units across worker threads
    Multi {
        /// Worker threads (defaults to the logical core count)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Run both modes and report the speedup
    Compare {
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show the detected CPU
    Hardware,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(log_level)
        .init()
        .context("Failed to initialize logger")?;

    info!("Cpumark v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_file(&path.to_string_lossy())
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BenchConfig::default(),
    };
    update_config_from_args(&mut config, &cli);

    let device = hardware::detect();

    let mut requested_workers = None;
    let plan: Vec<ThreadMode> = match &cli.command {
        Commands::Hardware => {
            print_hardware_info(&device);
            return Ok(());
        }
        Commands::Single => vec![ThreadMode::SingleThread],
        Commands::Multi { workers } => {
            requested_workers = *workers;
            vec![ThreadMode::MultiThread]
        }
        Commands::Compare { workers } => {
            requested_workers = *workers;
            vec![ThreadMode::SingleThread, ThreadMode::MultiThread]
        }
    };

    // An explicit --workers 0 is passed through so the engine rejects it.
    let workers = requested_workers.unwrap_or_else(|| config.resolve_workers(device.logical_cores));
    let output_file = config.output_file.as_ref().map(|p| p.to_string_lossy().into_owned());

    let reporter: Box<dyn Reporter + Send + Sync> = match config.output_format {
        config::OutputFormat::Text => Box::new(TextReporter::new(config.verbose, config.quiet)),
        config::OutputFormat::Json => Box::new(JsonReporter::new(output_file, config.verbose)),
        config::OutputFormat::Csv => Box::new(CsvReporter::new(output_file)),
    };

    let session = Arc::new(BenchmarkSession::new(BenchmarkEngine::from_config(&config)));
    let interrupted = CancelToken::new();
    {
        let session = Arc::clone(&session);
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal, cancelling benchmark...");
            interrupted.cancel();
            session.cancel();
        })
        .context("Failed to set Ctrl-C handler")?;
    }

    reporter.report_start(&config, &device);

    let show_bar = config.show_progress && !config.quiet && config.output_format == config::OutputFormat::Text;
    let mut summary = RunSummary::new(device);

    let outcome = run_plan(&session, &plan, workers, reporter.as_ref(), &interrupted, show_bar, &mut summary);
    if outcome == PlanOutcome::Cancelled {
        reporter.report_warning("Benchmark cancelled; no score was recorded");
        process::exit(EXIT_CANCELLED);
    }

    summary.finalize();
    if let Some(comparison) = &summary.comparison {
        if comparison.actual_speedup > 1.0 {
            reporter.report_warning("Multi-thread run was slower than single-thread");
        }
    }
    reporter.report_summary(&summary);

    if summary.failure.is_some() {
        process::exit(EXIT_FAILED);
    }

    Ok(())
}


fn update_config_from_args(config: &mut BenchConfig, cli: &Cli) {
    if cli.quick {
        config.apply_preset_quick();
    }

    if let Some(format) = cli.format {
        config.output_format = format.into();
    }

    if let Some(output) = &cli.output {
        config.output_file = Some(PathBuf::from(output));
    }

    config.verbose |= cli.verbose;
    config.quiet |= cli.quiet;
}


#[derive(Debug, PartialEq, Eq)]
enum PlanOutcome {
    Finished,
    Cancelled,
}

/// Run each mode in order, stopping at the first failure or interrupt.
fn run_plan(
    session: &BenchmarkSession,
    plan: &[ThreadMode],
    workers: usize,
    reporter: &dyn Reporter,
    interrupted: &CancelToken,
    show_bar: bool,
    summary: &mut RunSummary,
) -> PlanOutcome {
    for &mode in plan {
        if interrupted.is_cancelled() {
            return PlanOutcome::Cancelled;
        }

        let run_workers = match mode {
            ThreadMode::SingleThread => 1,
            ThreadMode::MultiThread => workers,
        };
        reporter.report_run_start(mode, run_workers);

        if mode == ThreadMode::MultiThread {
            if let Ok(partition) = Partition::plan(session.engine().total_units(), run_workers) {
                if partition.fallback {
                    reporter.report_warning(&format!(
                        "{} workers exceed {} work units; no unit will run",
                        run_workers, partition.total_units
                    ));
                } else if partition.dropped_units() > 0 {
                    reporter.report_info(&format!(
                        "{} of {} work units run; {} dropped by the even split",
                        partition.executed_units(), partition.total_units, partition.dropped_units()
                    ));
                }
            }
        }

        let started = match mode {
            ThreadMode::SingleThread => session.start_single(),
            ThreadMode::MultiThread => session.start_multi(run_workers),
        };
        if let Err(e) = started {
            error!("Benchmark could not start: {}", e);
            summary.failure = Some(e.to_string());
            break;
        }
        // The handler may have fired between the check above and the start.
        if interrupted.is_cancelled() {
            session.cancel();
        }

        let bar = progress_bar(show_bar);
        match drive(session, &bar) {
            RunState::Completed { result } => {
                reporter.report_result(&result);
                summary.results.push(result);
            }
            RunState::Failed { reason } => {
                error!("Benchmark failed: {}", reason);
                summary.failure = Some(reason);
                break;
            }
            RunState::Idle | RunState::Running { .. } => return PlanOutcome::Cancelled,
        }
    }

    PlanOutcome::Finished
}


fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(1000);
    let style = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

/// Poll the session until the run leaves `Running`.
fn drive(session: &BenchmarkSession, bar: &ProgressBar) -> RunState {
    loop {
        match session.wait_timeout(Duration::from_millis(100)) {
            RunState::Running { progress, active_workers } => {
                bar.set_position((progress * 1000.0) as u64);
                bar.set_message(format!("{} worker(s)", active_workers));
            }
            state => {
                bar.finish_and_clear();
                return state;
            }
        }
    }
}


fn print_hardware_info(device: &DeviceInfo) {
    print!("{}", formatdoc! {"
        System Hardware Information:
        ============================
        Device: {name}
        OS: {os}
        CPU: {brand}
          Cores: {physical} physical, {logical} logical
          Class: {tier}
        ",
        name = device.device_name,
        os = device.os_version,
        brand = device.cpu_brand,
        physical = device.physical_cores,
        logical = device.logical_cores,
        tier = device.tier(),
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use cpumark::core::result::BenchmarkResult;
    use cpumark::workloads::WorkloadParams;

    #[derive(Default)]
    struct RecordingReporter {
        runs: Mutex<Vec<ThreadMode>>,
        infos: Mutex<Vec<String>>,
        warnings: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn report_start(&self, _config: &BenchConfig, _device: &DeviceInfo) {}

        fn report_run_start(&self, mode: ThreadMode, _workers: usize) {
            self.runs.lock().unwrap().push(mode);
        }

        fn report_result(&self, _result: &BenchmarkResult) {}

        fn report_summary(&self, _summary: &RunSummary) {}

        fn report_warning(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }

        fn report_info(&self, message: &str) {
            self.infos.lock().unwrap().push(message.to_string());
        }
    }

    fn device() -> DeviceInfo {
        DeviceInfo {
            device_name: "bench-host".to_string(),
            cpu_brand: "Test CPU".to_string(),
            logical_cores: 4,
            physical_cores: 4,
            os_version: "Linux".to_string(),
        }
    }

    fn session() -> BenchmarkSession {
        BenchmarkSession::new(BenchmarkEngine::new(WorkloadParams::light(), 50))
    }

    #[test]
    fn test_compare_plan_runs_both_modes() {
        let session = session();
        let reporter = RecordingReporter::default();
        let mut summary = RunSummary::new(device());
        let plan = [ThreadMode::SingleThread, ThreadMode::MultiThread];

        let outcome = run_plan(&session, &plan, 4, &reporter, &CancelToken::new(), false, &mut summary);

        assert_eq!(outcome, PlanOutcome::Finished);
        assert_eq!(summary.results.len(), 2);
        assert_eq!(*reporter.runs.lock().unwrap(), plan.to_vec());
        let infos = reporter.infos.lock().unwrap();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].contains("48 of 50"));
        assert!(infos[0].contains("2 dropped"));
    }

    #[test]
    fn test_interrupt_stops_remaining_modes() {
        let session = session();
        let reporter = RecordingReporter::default();
        let mut summary = RunSummary::new(device());
        let interrupted = CancelToken::new();

        let outcome = run_plan(&session, &[ThreadMode::SingleThread], 2, &reporter, &interrupted, false, &mut summary);
        assert_eq!(outcome, PlanOutcome::Finished);
        assert!(matches!(session.state(), RunState::Completed { .. }));

        // Interrupt arrives while the session sits in Completed, where cancel() is a no-op.
        interrupted.cancel();
        session.cancel();
        let outcome = run_plan(&session, &[ThreadMode::MultiThread], 2, &reporter, &interrupted, false, &mut summary);

        assert_eq!(outcome, PlanOutcome::Cancelled);
        assert_eq!(*reporter.runs.lock().unwrap(), vec![ThreadMode::SingleThread]);
        assert!(session.multi_result().is_none());
        assert_eq!(summary.results.len(), 1);
    }

    #[test]
    fn test_fallback_partition_warns() {
        let session = session();
        let reporter = RecordingReporter::default();
        let mut summary = RunSummary::new(device());

        let outcome = run_plan(&session, &[ThreadMode::MultiThread], 60, &reporter, &CancelToken::new(), false, &mut summary);

        assert_eq!(outcome, PlanOutcome::Finished);
        assert!(reporter.infos.lock().unwrap().is_empty());
        assert!(reporter.warnings.lock().unwrap()[0].contains("60 workers exceed 50"));
    }
}
