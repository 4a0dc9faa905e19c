//! Once-per-process notice gate.
//!
//! Structural calibration problems are effectively per-job constants, so
//! their diagnostics are emitted once per key instead of once per event.

use std::sync::Mutex;

use fxhash::FxHashSet;

/// Rate limiter for log messages keyed by a stable string.
#[derive(Debug, Default)]
pub struct Notices {
    seen: Mutex<FxHashSet<String>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `key` is seen; false afterwards.
    pub fn first(&self, key: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        if seen.contains(key) {
            false
        } else {
            seen.insert(key.to_string());
            true
        }
    }
}

/// Log through `log::warn!` at most once per key.
macro_rules! warn_once {
    ($notices:expr, $key:expr, $($arg:tt)*) => {
        if $notices.first($key) {
            log::warn!($($arg)*);
        }
    };
}

/// Log through `log::info!` at most once per key.
macro_rules! info_once {
    ($notices:expr, $key:expr, $($arg:tt)*) => {
        if $notices.first($key) {
            log::info!($($arg)*);
        }
    };
}

/// Log through `log::error!` at most once per key.
macro_rules! error_once {
    ($notices:expr, $key:expr, $($arg:tt)*) => {
        if $notices.first($key) {
            log::error!($($arg)*);
        }
    };
}

pub(crate) use error_once;
pub(crate) use info_once;
pub(crate) use warn_once;
