//! Host functions for plugins.
//!
//! Artifacts may import these from the `env` module. Anything else they
//! import is unresolved and makes instantiation fail.

use wasmtime::{AsContext, Caller, Engine, Linker, Memory};

use super::{PluginError, PluginResult, MEMORY_EXPORT};

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Convert from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Trace),
            1 => Some(Self::Debug),
            2 => Some(Self::Info),
            3 => Some(Self::Warn),
            4 => Some(Self::Error),
            _ => None,
        }
    }

    fn emit(self, source: &str, message: &str) {
        match self {
            Self::Trace => tracing::trace!(plugin = source, "{}", message),
            Self::Debug => tracing::debug!(plugin = source, "{}", message),
            Self::Info => tracing::info!(plugin = source, "{}", message),
            Self::Warn => tracing::warn!(plugin = source, "{}", message),
            Self::Error => tracing::error!(plugin = source, "{}", message),
        }
    }
}

/// Per-store host data.
#[derive(Debug, Clone)]
pub struct HostState {
    /// Label used on log lines coming from the guest.
    pub source: String,
}

impl HostState {
    /// Create host data labelled `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

/// Build a linker exposing the host functions.
pub fn build_linker(engine: &Engine) -> PluginResult<Linker<HostState>> {
    let mut linker = Linker::new(engine);

    linker.func_wrap(
        "env",
        "log",
        |mut caller: Caller<'_, HostState>, level: i32, ptr: i32, len: i32| {
            let message = caller
                .get_export(MEMORY_EXPORT)
                .and_then(|export| export.into_memory())
                .and_then(|memory| {
                    let data = memory.data(&caller);
                    let start = ptr as u32 as usize;
                    let end = start.checked_add(len as u32 as usize)?;
                    data.get(start..end).map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                })
                .unwrap_or_else(|| "<unreadable guest message>".to_string());

            let level = LogLevel::from_u32(level as u32).unwrap_or(LogLevel::Info);
            level.emit(&caller.data().source, &message);
        },
    )?;

    Ok(linker)
}

/// Pack a string reference the way guests return it: `(ptr << 32) | len`.
pub fn pack_str_ref(ptr: u32, len: u32) -> i64 {
    ((u64::from(ptr) << 32) | u64::from(len)) as i64
}

/// Split a packed string reference into `(ptr, len)`.
pub fn unpack_str_ref(packed: i64) -> (u32, u32) {
    let raw = packed as u64;
    ((raw >> 32) as u32, (raw & 0xffff_ffff) as u32)
}

/// Read a packed UTF-8 string out of guest memory.
pub fn read_guest_str(
    memory: &Memory,
    store: impl AsContext,
    packed: i64,
    what: &str,
) -> PluginResult<String> {
    let (ptr, len) = unpack_str_ref(packed);
    let start = ptr as usize;
    let end = start + len as usize;

    let data = memory.data(&store);
    let bytes = data.get(start..end).ok_or_else(|| {
        PluginError::ExecutionError(format!("{what}: string {start}..{end} is out of bounds"))
    })?;

    String::from_utf8(bytes.to_vec())
        .map_err(|e| PluginError::ExecutionError(format!("{what}: invalid UTF-8: {e}")))
}
