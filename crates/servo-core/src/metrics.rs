//! Host metrics reported alongside servo status.
//!
//! Collection is best-effort: a value the host cannot provide is `None` and
//! serializes as `null`.

use serde::Serialize;
use std::sync::Mutex;
use sysinfo::{Components, System};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    /// Degrees Celsius.
    pub temperature: Option<f64>,
}

pub trait MetricsSource: Send + Sync {
    fn sample(&self) -> SystemMetrics;
}

/// Always reports the same sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMetrics(pub SystemMetrics);

impl MetricsSource for FixedMetrics {
    fn sample(&self) -> SystemMetrics {
        self.0
    }
}

/// Reads the local host through `sysinfo`. CPU usage is measured between
/// consecutive samples, so the first one after construction covers the
/// time since `new`.
pub struct HostMetrics {
    system: Mutex<System>,
}

impl Default for HostMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl MetricsSource for HostMetrics {
    fn sample(&self) -> SystemMetrics {
        let (cpu_percent, memory_percent) = {
            let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
            system.refresh_cpu_usage();
            system.refresh_memory();
            let cpu = (!system.cpus().is_empty()).then(|| system.global_cpu_usage() as f64);
            (cpu, percent(system.used_memory(), system.total_memory()))
        };

        let components = Components::new_with_refreshed_list();
        let temperature = cpu_temperature(
            components
                .iter()
                .filter_map(|c| Some((c.label(), c.temperature()?))),
        );

        SystemMetrics {
            cpu_percent: cpu_percent.filter(|v| v.is_finite()),
            memory_percent,
            temperature,
        }
    }
}

fn percent(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 * 100.0 / total as f64)
}

/// Prefer a sensor whose label mentions "cpu", otherwise the first one with
/// a finite reading.
fn cpu_temperature<'a>(readings: impl Iterator<Item = (&'a str, f32)>) -> Option<f64> {
    let readings: Vec<(&str, f32)> = readings.filter(|(_, t)| t.is_finite()).collect();
    readings
        .iter()
        .find(|(label, _)| label.to_lowercase().contains("cpu"))
        .or_else(|| readings.first())
        .map(|&(_, t)| t as f64)
}
