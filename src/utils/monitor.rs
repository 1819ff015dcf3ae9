#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed: Duration,
}

/// Samples this process's CPU and resident memory so a long import can show
/// that memory stays flat while batches are flushed.
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    inner: Option<MonitorState>,
}

#[cfg(feature = "cli")]
struct MonitorState {
    system: Mutex<System>,
    pid: Pid,
    started: Instant,
    peak_memory_mb: Mutex<u64>,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { inner: None };
        }

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                tracing::warn!("⚠️ System monitoring disabled, cannot resolve own PID: {}", e);
                return Self { inner: None };
            }
        };

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        Self {
            inner: Some(MonitorState {
                system: Mutex::new(system),
                pid,
                started: Instant::now(),
                peak_memory_mb: Mutex::new(0),
            }),
        }
    }

    pub fn sample(&self) -> Option<ProcessStats> {
        let state = self.inner.as_ref()?;

        let mut system = state.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[state.pid]), true);
        let process = system.process(state.pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = state.peak_memory_mb.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_mb,
            peak_memory_mb: *peak,
            elapsed: state.started.elapsed(),
        })
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_mb,
                stats.peak_memory_mb,
                stats.elapsed
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// no-op stand-in when built without the cli feature
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
