//! sysinfo-based implementation of the MemoryProbe trait.

use colloq_core::telemetry::{HeapUsage, MemoryProbe};
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Reports this process's resident memory against total system memory.
///
/// Falls back to system-wide used memory when the process cannot be
/// inspected.
pub struct SysinfoMemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoMemoryProbe {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| tracing::debug!("[SysinfoMemoryProbe] no pid: {}", e))
            .ok();
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for SysinfoMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoMemoryProbe {
    fn heap_usage(&self) -> Option<HeapUsage> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();

        let total_bytes = system.total_memory();
        if total_bytes == 0 {
            return None;
        }

        let process_bytes = self.pid.and_then(|pid| {
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            system.process(pid).map(|process| process.memory())
        });

        Some(HeapUsage {
            used_bytes: process_bytes.unwrap_or_else(|| system.used_memory()),
            total_bytes,
        })
    }
}
