//! Host and resource status for the snapshot token and the banner.

use sysinfo::System;

/// One-line resource summary: memory, load average, CPU count.
pub fn resource_summary() -> String {
    let mut sys = System::new();
    sys.refresh_memory();

    let used_mb = sys.used_memory() / (1024 * 1024);
    let total_mb = sys.total_memory() / (1024 * 1024);
    let load = System::load_average();

    format!(
        "Mem: {}/{} MB | Load: {:.2} | CPUs: {}",
        used_mb,
        total_mb,
        load.one,
        num_cpus::get()
    )
}

pub fn host_name() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

pub fn username() -> String {
    std::env::var("USER").unwrap_or_else(|_| "user".to_string())
}
