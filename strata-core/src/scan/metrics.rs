use strata_model::MemorySnapshot;

/// Samples host memory and this process's resident set for an audit row:
/// `max_memory` is physical memory, `total_memory` the process RSS and
/// `free_memory` what the host still has available. Runs the probe on the
/// blocking pool; `None` when the probe fails or metrics are compiled out.
#[cfg(feature = "memory-metrics")]
pub async fn sample_memory() -> Option<MemorySnapshot> {
    use sysinfo::{Process, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

    let join = tokio::task::spawn_blocking(|| {
        let mut system = System::new_with_specifics(RefreshKind::nothing());
        system.refresh_memory();
        let resident = sysinfo::get_current_pid().ok().and_then(|pid| {
            system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                false,
                ProcessRefreshKind::nothing().with_memory(),
            );
            system.process(pid).map(Process::memory)
        });
        MemorySnapshot {
            max_memory: system.total_memory(),
            total_memory: resident.unwrap_or(0),
            free_memory: system.available_memory(),
        }
    });

    match join.await {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            tracing::debug!(target: "scan::audit", error = %err, "memory probe join failed");
            None
        }
    }
}

/// Process memory for an audit row, if the platform reports it.
#[cfg(not(feature = "memory-metrics"))]
pub async fn sample_memory() -> Option<MemorySnapshot> {
    None
}
