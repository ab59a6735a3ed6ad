use serde::{Serialize, Deserialize};
use sysinfo::System;


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_name: String,
    pub cpu_brand: String,
    pub logical_cores: usize,
    pub physical_cores: usize,
    pub os_version: String,
}

impl DeviceInfo {
    /// Human-readable class of the CPU, e.g. "Performance (8 cores)".
    pub fn tier(&self) -> String {
        tier_label(self.logical_cores)
    }
}

/// Discover the host's CPU and OS details.
pub fn detect() -> DeviceInfo {
    let mut system = System::new();
    system.refresh_cpu();

    let brand = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    DeviceInfo {
        device_name: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        cpu_brand: brand,
        logical_cores: logical_cores(),
        physical_cores: num_cpus::get_physical().max(1),
        os_version: System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Number of logical cores; this is the default worker count.
pub fn logical_cores() -> usize {
    num_cpus::get().max(1)
}


pub fn tier_label(cores: usize) -> String {
    let tier = match cores {
        0..=4 => "Low-power",
        5..=8 => "Performance",
        _ => "Flagship",
    };
    format!("{} ({} cores)", tier, cores)
}
