//! Sliding-window attempt throttling.
//!
//! Tracks attempts per source key (typically a client address) inside
//! a rolling window and rejects once the limit is reached. State is
//! held in memory only, so a restart forgets all counts. The
//! orchestrator itself never consults this; the transport boundary
//! applies it to the operations it wraps.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::AuthConfig;

#[derive(Debug)]
pub struct AttemptThrottle {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl AttemptThrottle {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.throttle_max_attempts,
            Duration::from_secs(config.throttle_window_secs),
        )
    }

    /// Records an attempt for `key` and reports whether it is allowed.
    ///
    /// Attempts older than the window are pruned on every check, so
    /// the counter slides rather than resetting on a fixed boundary.
    /// Rejected attempts are not recorded; a blocked caller recovers
    /// as soon as older attempts age out.
    pub fn check(&self, key: &str) -> bool {
        let Ok(mut attempts) = self.attempts.lock() else {
            // A poisoned lock only loses throttle state; the guarded
            // operations stay available.
            return true;
        };

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|seen| seen.elapsed() < self.window);

        if entry.len() as u32 >= self.max_attempts {
            return false;
        }
        entry.push(Instant::now());
        true
    }
}
