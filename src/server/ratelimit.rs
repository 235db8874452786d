//! Per-address upload rate limiting over fixed windows.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Window length used by the server; tests inject shorter ones.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

struct UploadWindow {
    window_start: Instant,
    count: u32,
}

/// Fixed-window counter keyed by source address.
///
/// A window starts on the first request from an address and resets once it
/// has expired. Entries are never evicted, so the table grows with the set
/// of distinct source addresses seen.
pub struct RateLimiter {
    windows: DashMap<IpAddr, UploadWindow>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Records one request from `addr` and reports whether it is admitted.
    ///
    /// The entry guard keeps the read-bump-reset sequence atomic per key.
    pub fn admit(&self, addr: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(addr).or_insert_with(|| UploadWindow {
            window_start: now,
            count: 0,
        });

        let window = entry.value_mut();
        if now.duration_since(window.window_start) > self.window {
            window.window_start = now;
            window.count = 1;
            return true;
        }

        window.count += 1;
        window.count <= self.limit
    }
}
