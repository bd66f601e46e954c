//! Host and bot status reporting for `/status` and `/stats`.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sysinfo::{Disks, System};

const MIB: f64 = 1024.0 * 1024.0;

// ── Bot counters ────────────────────────────────────────────────────────────

/// Process-lifetime usage counters. Lock-free; shared by every handler task.
#[derive(Debug)]
pub struct BotStats {
    started_at: DateTime<Utc>,
    started: Instant,
    messages: AtomicU64,
    replies: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
    bans: AtomicU64,
}

/// Point-in-time copy of [`BotStats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime: Duration,
    pub messages: u64,
    pub replies: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub bans: u64,
}

impl Default for BotStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            messages: AtomicU64::new(0),
            replies: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            bans: AtomicU64::new(0),
        }
    }

    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply(&self) {
        self.replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ban(&self) {
        self.bans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.started_at,
            uptime: self.started.elapsed(),
            messages: self.messages.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bans: self.bans.load(Ordering::Relaxed),
        }
    }
}

// ── Host metrics ────────────────────────────────────────────────────────────

/// Host metrics gathered with `sysinfo`. Fields are `None` when the
/// platform does not report them.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    pub cpu: Option<String>,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub os: Option<String>,
    pub host: Option<String>,
    pub host_uptime: Duration,
}

impl SystemSnapshot {
    /// Refresh and read memory, CPU, root-disk and OS details.
    ///
    /// Blocking: call from `spawn_blocking` inside the runtime.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        let cpu = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty());

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| disks.list().first());
        let (disk_used, disk_total) = root
            .map(|d| (d.total_space().saturating_sub(d.available_space()), d.total_space()))
            .unwrap_or_default();

        Self {
            cpu,
            memory_used: sys.used_memory(),
            memory_total: sys.total_memory(),
            disk_used,
            disk_total,
            os: System::long_os_version(),
            host: System::host_name(),
            host_uptime: Duration::from_secs(System::uptime()),
        }
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 * 100.0 / total as f64
    }
}

/// `1d 2h 3m`, `2h 3m` or `3m 4s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (days, hours, mins, s) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m {s}s")
    }
}

/// Render the host section of `/status` (HTML).
pub fn render_system(sys: &SystemSnapshot) -> String {
    format!(
        "• CPU: {}\n\
         • RAM: {:.1}MB/{:.1}MB ({:.1}%)\n\
         • Storage: {:.1}MB/{:.1}MB ({:.1}%)\n\
         • OS: {}\n\
         • Host: {} (up {})",
        teloxide::utils::html::escape(sys.cpu.as_deref().unwrap_or("unknown")),
        sys.memory_used as f64 / MIB,
        sys.memory_total as f64 / MIB,
        percent(sys.memory_used, sys.memory_total),
        sys.disk_used as f64 / MIB,
        sys.disk_total as f64 / MIB,
        percent(sys.disk_used, sys.disk_total),
        teloxide::utils::html::escape(sys.os.as_deref().unwrap_or("unknown")),
        teloxide::utils::html::escape(sys.host.as_deref().unwrap_or("unknown")),
        format_duration(sys.host_uptime),
    )
}

/// Render bot usage counters (HTML).
pub fn render_stats(stats: &StatsSnapshot, chats: usize, turns: usize) -> String {
    format!(
        "• Started: {}\n\
         • Uptime: {}\n\
         • Active chats: {chats}\n\
         • Stored turns: {turns}\n\
         • Messages handled: {}\n\
         • Replies sent: {}\n\
         • Timeouts: {}\n\
         • Backend errors: {}\n\
         • Users removed: {}",
        stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration(stats.uptime),
        stats.messages,
        stats.replies,
        stats.timeouts,
        stats.failures,
        stats.bans,
    )
}
