//! Process-wide engine state: the active logger, the texture atlas, the
//! default asset collection, and the single-active-view guard.
//!
//! Mirrors the process-wide module statics of the engine this was ported
//! from (one texture dictionary, one default collection, one CRC table) as a
//! lazily-initialized [`OnceLock`] rather than static mutable globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, RwLock};
use std::time::SystemTime;

use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::error::{set_err, EngineError, EngineResult};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::texture::Atlas;

static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();
static PNG_CRC_TABLE: OnceLock<[u32; 256]> = OnceLock::new();

struct EngineState {
    config: EngineConfig,
    atlas: Mutex<Atlas>,
    default_collection: Mutex<Collection>,
    /// At most one view may be active at a time; mirrors the window-system
    /// singleton used for presentation.
    view_active: AtomicBool,
}

impl EngineState {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            atlas: Mutex::new(Atlas::new()),
            default_collection: Mutex::new(Collection::new()),
            view_active: AtomicBool::new(false),
        }
    }
}

/// Entry point for every piece of process-wide engine state.
pub struct Engine;

impl Engine {
    fn state() -> &'static EngineState {
        ENGINE_STATE.get_or_init(|| EngineState::new(EngineConfig::default()))
    }

    /// Initializes the engine with a specific configuration. Only the first
    /// call in a process takes effect; later calls are no-ops, matching a
    /// lazily-initialized singleton rather than an explicit construction
    /// step that could fail on double-init.
    pub fn init(config: EngineConfig) {
        ENGINE_STATE.get_or_init(|| EngineState::new(config));
    }

    pub fn config() -> EngineConfig {
        Self::state().config
    }

    /// Runs `f` with exclusive access to the process-wide texture atlas.
    pub fn atlas<R>(f: impl FnOnce(&mut Atlas) -> R) -> R {
        let mut guard = Self::state().atlas.lock().unwrap();
        f(&mut guard)
    }

    /// Runs `f` with exclusive access to the default (unnamed) asset
    /// collection, the one named items are deposited in when the caller
    /// doesn't manage its own.
    pub fn default_collection<R>(f: impl FnOnce(&mut Collection) -> R) -> R {
        let mut guard = Self::state().default_collection.lock().unwrap();
        f(&mut guard)
    }

    /// Claims the single process-wide view slot. Fails with
    /// [`EngineError::Exist`] if a view is already active.
    pub fn acquire_view() -> EngineResult<()> {
        let was_active = Self::state().view_active.swap(true, Ordering::AcqRel);
        if was_active {
            Err(set_err(EngineError::Exist))
        } else {
            Ok(())
        }
    }

    pub fn release_view() {
        Self::state().view_active.store(false, Ordering::Release);
    }

    /// Installs a custom logger. Only the first call takes effect.
    pub fn set_logger(logger: Box<dyn Logger>) {
        let _ = LOGGER.set(RwLock::new(logger));
    }

    fn logger() -> &'static RwLock<Box<dyn Logger>> {
        LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
    }

    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = Self::logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = Self::logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }

    /// The reversed-polynomial (`0xedb8_8320`) CRC-32 lookup table used by
    /// the PNG decoder, computed once per process.
    pub(crate) fn png_crc_table() -> &'static [u32; 256] {
        PNG_CRC_TABLE.get_or_init(|| {
            let mut table = [0u32; 256];
            for (n, slot) in table.iter_mut().enumerate() {
                let mut c = n as u32;
                for _ in 0..8 {
                    c = if c & 1 != 0 {
                        0xedb8_8320 ^ (c >> 1)
                    } else {
                        c >> 1
                    };
                }
                *slot = c;
            }
            table
        })
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
