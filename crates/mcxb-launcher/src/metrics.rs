use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Resident memory of a single process, refreshed at most every five seconds.
pub struct ProcessSampler {
    system: Mutex<System>,
    pid: Pid,
    last_sample: Mutex<Option<Instant>>,
    cached_memory: AtomicU64,
}

impl ProcessSampler {
    pub fn current() -> Self {
        Self::for_pid(std::process::id())
    }

    pub fn for_pid(pid: u32) -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: Pid::from_u32(pid),
            last_sample: Mutex::new(None),
            cached_memory: AtomicU64::new(0),
        }
    }

    /// Bytes of resident memory, or `None` when the process cannot be read.
    pub fn memory_bytes(&self) -> Option<u64> {
        self.refresh();
        match self.cached_memory.load(Ordering::Relaxed) {
            0 => None,
            bytes => Some(bytes),
        }
    }

    fn refresh(&self) {
        let mut last_sample = self.last_sample.lock();
        if matches!(*last_sample, Some(at) if at.elapsed() < SAMPLE_INTERVAL) {
            return;
        }
        *last_sample = Some(Instant::now());

        let mut system = self.system.lock();
        system.refresh_process(self.pid);
        let memory = system.process(self.pid).map(|p| p.memory()).unwrap_or(0);
        self.cached_memory.store(memory, Ordering::Relaxed);
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::current()
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{}d {:02}h {:02}m {:02}s", days, hours, minutes, seconds)
    } else {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    }
}
