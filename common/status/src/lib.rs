use std::io;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to look up hostname: {0}")]
    Hostname(#[source] nix::errno::Errno),
    #[error("hostname is not valid UTF-8")]
    HostnameEncoding,
    #[error("failed to read memory usage: {0}")]
    Memory(#[source] io::Error),
}

/// Static facts about the host and this process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsInfo {
    pub architecture: String,
    pub hostname: String,
    pub num_cpu: usize,
    pub pid: u32,
    pub platform: String,
}

/// Point-in-time snapshot of the process, as served to status endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub architecture: String,
    pub hostname: String,
    /// Resident memory in megabytes (10^6 bytes). Read from procfs, so always 0
    /// on platforms without it; a procfs read failure is an error, never 0.
    pub memory_mb: f64,
    pub num_cpu: usize,
    /// Tasks alive on the current tokio runtime, 0 outside of one.
    pub num_tasks: usize,
    pub pid: u32,
    pub platform: String,
    /// Whole seconds since the process started.
    pub uptime: u64,
}

/// Produces [`Status`] snapshots. The start instant is captured once by the caller
/// at process start and handed in here.
#[derive(Clone, Copy, Debug)]
pub struct StatusReporter {
    started_at: Instant,
}

impl StatusReporter {
    pub fn new(started_at: Instant) -> Self {
        Self { started_at }
    }

    pub fn os_info(&self) -> Result<OsInfo, StatusError> {
        let hostname = nix::unistd::gethostname()
            .map_err(StatusError::Hostname)?
            .into_string()
            .map_err(|_| StatusError::HostnameEncoding)?;

        Ok(OsInfo {
            architecture: std::env::consts::ARCH.to_string(),
            hostname,
            num_cpu: num_cpus::get(),
            pid: std::process::id(),
            platform: std::env::consts::OS.to_string(),
        })
    }

    pub fn snapshot(&self) -> Result<Status, StatusError> {
        let os = self.os_info()?;
        let memory_bytes = resident_memory_bytes()?;

        Ok(Status {
            architecture: os.architecture,
            hostname: os.hostname,
            memory_mb: memory_bytes as f64 / 1_000_000.0,
            num_cpu: os.num_cpu,
            num_tasks: alive_tasks(),
            pid: os.pid,
            platform: os.platform,
            uptime: self.started_at.elapsed().as_secs(),
        })
    }
}

fn alive_tasks() -> usize {
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_alive_tasks())
        .unwrap_or(0)
}

#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Result<u64, StatusError> {
    let status = std::fs::read_to_string("/proc/self/status").map_err(StatusError::Memory)?;
    parse_vm_rss(&status).ok_or_else(|| {
        StatusError::Memory(io::Error::new(
            io::ErrorKind::InvalidData,
            "VmRSS missing from /proc/self/status",
        ))
    })
}

// No procfs: reported as 0 (unsupported), see `Status::memory_mb`.
#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Result<u64, StatusError> {
    Ok(0)
}

/// Parses the `VmRSS:   1234 kB` line of `/proc/<pid>/status` into bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => value.checked_mul(1024),
        Some(_) => None,
    }
}
