use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

const BAR_WIDTH: usize = 40;

/// CPU and memory usage at one point in time, as shown by `monitor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub timestamp: i64,
    pub cpu_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub uptime_seconds: u64,
}

impl SystemSnapshot {
    /// Blocks for `sample` (at least sysinfo's minimum CPU interval) so the
    /// CPU reading covers a real window.
    pub fn capture(sample: Duration) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        std::thread::sleep(sample.max(MINIMUM_CPU_UPDATE_INTERVAL));
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            timestamp: chrono::Utc::now().timestamp(),
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            memory_used_mb: sys.used_memory() / 1024 / 1024,
            memory_total_mb: sys.total_memory() / 1024 / 1024,
            uptime_seconds: System::uptime(),
        }
    }

    pub async fn capture_async(sample: Duration) -> Result<Self, tokio::task::JoinError> {
        tokio::task::spawn_blocking(move || Self::capture(sample)).await
    }

    pub fn memory_percent(&self) -> f32 {
        if self.memory_total_mb == 0 {
            return 0.0;
        }
        (self.memory_used_mb as f64 / self.memory_total_mb as f64 * 100.0) as f32
    }

    pub fn to_report(&self) -> String {
        format!(
            "CPU Usage:\n{} {:.1}%\nMemory Usage:\n{} {:.1}% ({} MB used of {} MB)",
            usage_bar(self.cpu_percent),
            self.cpu_percent,
            usage_bar(self.memory_percent()),
            self.memory_percent(),
            self.memory_used_mb,
            self.memory_total_mb
        )
    }
}

/// Fixed-width text bar for a 0-100 percentage.
pub fn usage_bar(percent: f32) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture() {
        let snapshot = SystemSnapshot::capture(Duration::from_millis(10));
        assert!(snapshot.memory_total_mb > 0);
        assert!(snapshot.cpu_percent >= 0.0);
    }

    #[test]
    fn test_usage_bar_bounds() {
        assert_eq!(usage_bar(0.0), format!("[{}]", "-".repeat(BAR_WIDTH)));
        assert_eq!(usage_bar(100.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(usage_bar(250.0), usage_bar(100.0));
        assert_eq!(usage_bar(50.0).matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn test_report_lines() {
        let snapshot = SystemSnapshot {
            timestamp: 0,
            cpu_percent: 12.5,
            memory_used_mb: 512,
            memory_total_mb: 2048,
            uptime_seconds: 1,
        };
        let report = snapshot.to_report();
        assert!(report.contains("CPU Usage:"));
        assert!(report.contains("12.5%"));
        assert!(report.contains("25.0% (512 MB used of 2048 MB)"));
    }
}
