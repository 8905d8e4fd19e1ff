//! Error types for the Nebula engine.
//!
//! A single flat taxonomy, surfaced both as an ordinary `Result` error type
//! and, for call sites that need to recover the *kind* of the most recent
//! failure after a `Result` has already been collapsed into a simpler shape
//! (see the resource manager and orchestrator), as a thread-local slot.

use std::cell::Cell;
use std::fmt;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Flat error taxonomy used throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Unknown,
    NoMemory,
    InvalidArgument,
    NilPointer,
    NoFile,
    InvalidFile,
    /// A pooled resource has no free slots. Expected and locally recoverable:
    /// drives the multi-pass fallback in the render orchestrator.
    InUse,
    Busy,
    InvalidCommand,
    QueueFull,
    NotFound,
    /// A name already exists in a collection. Expected and locally
    /// recoverable: retry with an auto-generated name.
    Exist,
    /// The view needs to be recreated. Reserved for windowing integration.
    InvalidWindow,
    Unsupported,
    Overflow,
    Limit,
    DeviceGenerated,
    Other(String),
}

impl EngineError {
    /// A short tag identifying the error kind, independent of any payload.
    pub fn kind_str(&self) -> &'static str {
        match self {
            EngineError::Unknown => "unknown",
            EngineError::NoMemory => "no_memory",
            EngineError::InvalidArgument => "invalid_argument",
            EngineError::NilPointer => "nil_pointer",
            EngineError::NoFile => "no_file",
            EngineError::InvalidFile => "invalid_file",
            EngineError::InUse => "in_use",
            EngineError::Busy => "busy",
            EngineError::InvalidCommand => "invalid_command",
            EngineError::QueueFull => "queue_full",
            EngineError::NotFound => "not_found",
            EngineError::Exist => "exist",
            EngineError::InvalidWindow => "invalid_window",
            EngineError::Unsupported => "unsupported",
            EngineError::Overflow => "overflow",
            EngineError::Limit => "limit",
            EngineError::DeviceGenerated => "device_generated",
            EngineError::Other(_) => "other",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Unknown => write!(f, "unknown error"),
            EngineError::NoMemory => write!(f, "no memory"),
            EngineError::InvalidArgument => write!(f, "invalid argument"),
            EngineError::NilPointer => write!(f, "unexpected null pointer"),
            EngineError::NoFile => write!(f, "no such file or directory"),
            EngineError::InvalidFile => write!(f, "invalid file or directory"),
            EngineError::InUse => write!(f, "in use"),
            EngineError::Busy => write!(f, "busy"),
            EngineError::InvalidCommand => write!(f, "invalid command"),
            EngineError::QueueFull => write!(f, "queue full"),
            EngineError::NotFound => write!(f, "not found"),
            EngineError::Exist => write!(f, "already exists"),
            EngineError::InvalidWindow => write!(f, "invalid window"),
            EngineError::Unsupported => write!(f, "unsupported"),
            EngineError::Overflow => write!(f, "overflow"),
            EngineError::Limit => write!(f, "limit exceeded"),
            EngineError::DeviceGenerated => write!(f, "device-specific error"),
            EngineError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

thread_local! {
    static LAST_ERROR: Cell<LastError> = const { Cell::new(LastError::Unknown) };
}

/// A `Copy`-able shadow of [`EngineError`]'s kind, stored in the thread-local
/// slot (the `Other(String)` payload isn't retained there).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastError {
    Unknown,
    NoMemory,
    InvalidArgument,
    NilPointer,
    NoFile,
    InvalidFile,
    InUse,
    Busy,
    InvalidCommand,
    QueueFull,
    NotFound,
    Exist,
    InvalidWindow,
    Unsupported,
    Overflow,
    Limit,
    DeviceGenerated,
    Other,
}

impl From<&EngineError> for LastError {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Unknown => LastError::Unknown,
            EngineError::NoMemory => LastError::NoMemory,
            EngineError::InvalidArgument => LastError::InvalidArgument,
            EngineError::NilPointer => LastError::NilPointer,
            EngineError::NoFile => LastError::NoFile,
            EngineError::InvalidFile => LastError::InvalidFile,
            EngineError::InUse => LastError::InUse,
            EngineError::Busy => LastError::Busy,
            EngineError::InvalidCommand => LastError::InvalidCommand,
            EngineError::QueueFull => LastError::QueueFull,
            EngineError::NotFound => LastError::NotFound,
            EngineError::Exist => LastError::Exist,
            EngineError::InvalidWindow => LastError::InvalidWindow,
            EngineError::Unsupported => LastError::Unsupported,
            EngineError::Overflow => LastError::Overflow,
            EngineError::Limit => LastError::Limit,
            EngineError::DeviceGenerated => LastError::DeviceGenerated,
            EngineError::Other(_) => LastError::Other,
        }
    }
}

/// Records `err` in the thread-local last-error slot and returns it unchanged.
///
/// Call sites that must collapse a `Result` into an `Option`/`bool` at an
/// FFI-shaped boundary (e.g. the resource manager's `obtain`) use this so
/// callers can still recover the error *kind* via [`last_error`].
pub fn set_err(err: EngineError) -> EngineError {
    LAST_ERROR.with(|cell| cell.set(LastError::from(&err)));
    err
}

/// Returns the most recently set error kind on this thread.
pub fn last_error() -> LastError {
    LAST_ERROR.with(|cell| cell.get())
}
