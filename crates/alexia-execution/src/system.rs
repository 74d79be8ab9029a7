//! Host-wide process listing, with supervisor-managed processes marked.

use std::collections::HashMap;
use std::time::Duration;
use sysinfo::System;
use tracing::debug;

use crate::supervisor::ProcessSummary;

/// CPU usage is measured between two refreshes this far apart.
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// One row of the system process table.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemProcess {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    /// Present when the supervisor started this process.
    pub managed: Option<ProcessSummary>,
}

impl SystemProcess {
    pub fn is_managed(&self) -> bool {
        self.managed.is_some()
    }
}

/// Every process on the host, busiest first. Managed processes that have
/// already exited but were not stopped yet are listed too.
///
/// Blocks for a short CPU sampling interval; call it off the async runtime.
pub fn system_processes(managed: Vec<ProcessSummary>) -> Vec<SystemProcess> {
    let mut system = System::new_all();
    std::thread::sleep(CPU_SAMPLE_INTERVAL);
    system.refresh_processes();

    let total_memory = system.total_memory();
    let mut managed: HashMap<u32, ProcessSummary> =
        managed.into_iter().map(|p| (p.pid, p)).collect();

    let mut rows: Vec<SystemProcess> = system
        .processes()
        .iter()
        .map(|(pid, process)| {
            let pid = pid.as_u32();
            SystemProcess {
                pid,
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_percent: memory_percent(process.memory(), total_memory),
                managed: managed.remove(&pid),
            }
        })
        .collect();

    rows.extend(managed.into_values().map(|summary| SystemProcess {
        pid: summary.pid,
        name: summary.command.clone(),
        cpu_percent: 0.0,
        memory_percent: 0.0,
        managed: Some(summary),
    }));

    sort_by_cpu(&mut rows);
    debug!("Listed {} system processes", rows.len());
    rows
}

fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0) as f32
}

/// Highest CPU first; ties keep a stable pid order.
fn sort_by_cpu(rows: &mut [SystemProcess]) {
    rows.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then(a.pid.cmp(&b.pid))
    });
}
