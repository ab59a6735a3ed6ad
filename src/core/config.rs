use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::core::error::{BenchError, Result};
use crate::workloads::WorkloadParams;

/// Work units per run.
pub const TOTAL_UNITS: u32 = 50;

/// Benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub total_units: u32,
    /// Worker count for multi-thread runs; 0 means one per logical core.
    pub workers: usize,
    pub workload: WorkloadParams,
    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,
    pub show_progress: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            total_units: TOTAL_UNITS,
            workers: 0,
            workload: WorkloadParams::default(),
            output_format: OutputFormat::Text,
            output_file: None,
            verbose: false,
            quiet: false,
            show_progress: true,
        }
    }
}

impl BenchConfig {
    /// Light workloads for smoke runs
    pub fn quick() -> Self {
        let mut config = Self::default();
        config.apply_preset_quick();
        config
    }


    /// The fixed-parameter benchmark
    pub fn standard() -> Self {
        Self::default()
    }

    /// Presets only swap the workload; `total_units` is left as configured.
    pub fn apply_preset_quick(&mut self) {
        self.workload = WorkloadParams::light();
    }

    pub fn apply_preset_standard(&mut self) {
        self.workload = WorkloadParams::default();
    }

    /// Worker count to use, falling back to `detected` when unset.
    pub fn resolve_workers(&self, detected: usize) -> usize {
        if self.workers == 0 {
            detected.max(1)
        } else {
            self.workers
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_units == 0 {
            return Err(BenchError::ConfigError("total_units must be at least 1".to_string()));
        }
        if let Some(field) = self.workload.first_zero_field() {
            return Err(BenchError::ConfigError(format!("workload.{} must be at least 1", field)));
        }
        if self.workload.matrix_elements().is_none() {
            return Err(BenchError::ConfigError(format!(
                "workload.matrix_size {} is too large", self.workload.matrix_size
            )));
        }
        Ok(())
    }

    /// Load a config from a `.toml` file, or JSON for any other extension
    pub fn from_file(path: &str) -> Result<Self> {
        use std::fs;
        use std::path::Path;

        let path = Path::new(path);
        if !path.exists() {
            return Err(BenchError::ConfigError(format!("Config file not found: {}", path.display())));
        }

        let contents = fs::read_to_string(path)?;

        let config = if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            toml::from_str::<Self>(&contents)
                .map_err(|e| BenchError::ConfigError(format!("Failed to parse TOML config: {}", e)))?
        } else {
            serde_json::from_str::<Self>(&contents)
                .map_err(|e| BenchError::ConfigError(format!("Failed to parse JSON config: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }
}
