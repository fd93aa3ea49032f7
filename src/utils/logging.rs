//! Structured Logging with Redaction
//!
//! Signing logs name keys, paths and hashes. By default they are shortened:
//! - public keys and wallet keys: first and last few hex digits
//! - hashes and signatures: prefix and suffix
//! - anything that looks like secret material: fully redacted
//!
//! Redaction of keys and hashes can be switched off for local debugging,
//! globally or per entry (`redact = ...;` in the macros). Secrets are always
//! redacted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to enable/disable debug logging
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Global flag for partial redaction of keys and hashes
static REDACTION_ENABLED: AtomicBool = AtomicBool::new(true);

/// Enable debug logging
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disable debug logging
pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// Toggle shortening of public keys and hashes
pub fn set_redaction(enabled: bool) {
    REDACTION_ENABLED.store(enabled, Ordering::SeqCst);
}

pub fn is_redaction_enabled() -> bool {
    REDACTION_ENABLED.load(Ordering::SeqCst)
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
    /// Shorten keys and hashes; defaults to the global flag
    redact: bool,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
            redact: is_redaction_enabled(),
        }
    }

    /// Override the global redaction flag for this entry.
    ///
    /// Applies to fields added afterwards.
    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    /// Add a field, redacted according to its key
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value = redact_for_key(key, &value.to_string(), self.redact);
        self.fields.push((key, value));
        self
    }

    /// Render without timestamp
    pub fn format_line(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&fields);
        }
        line
    }

    /// Write the entry to stderr
    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.format_line());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldClass {
    Secret,
    Key,
    Hash,
    Plain,
}

fn classify(key: &str) -> FieldClass {
    let key = key.to_lowercase();

    const SECRET: &[&str] = &["private", "secret", "seed", "mnemonic", "password", "pin", "access_code"];
    const KEY: &[&str] = &["public_key", "pubkey", "wallet", "card"];
    const HASH: &[&str] = &["hash", "signature", "sig"];

    if SECRET.iter().any(|s| key.contains(s)) {
        FieldClass::Secret
    } else if KEY.iter().any(|s| key.contains(s)) {
        FieldClass::Key
    } else if HASH.iter().any(|s| key.contains(s)) {
        FieldClass::Hash
    } else {
        FieldClass::Plain
    }
}

fn redact_for_key(key: &str, value: &str, partial_redaction: bool) -> String {
    match classify(key) {
        FieldClass::Secret => redact_value(value),
        FieldClass::Key if partial_redaction => shorten(value, 6, 4),
        FieldClass::Hash if partial_redaction => shorten(value, 10, 6),
        _ => value.to_string(),
    }
}

/// Fully redact a sensitive value
fn redact_value(value: &str) -> String {
    match value.len() {
        0 => "[EMPTY]".to_string(),
        1..=4 => "[REDACTED]".to_string(),
        len => format!("[REDACTED:{}chars]", len),
    }
}

/// Keep `prefix` and `suffix` characters, skipping a leading `0x`
fn shorten(value: &str, prefix: usize, suffix: usize) -> String {
    let trimmed = value.trim();
    let (marker, body) = match trimmed.strip_prefix("0x") {
        Some(body) => ("0x", body),
        None => ("", trimmed),
    };

    if body.len() <= prefix + suffix + 3 || !body.is_ascii() {
        return trimmed.to_string();
    }

    format!(
        "{}{}...{}",
        marker,
        &body[..prefix],
        &body[body.len() - suffix..]
    )
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, redact = $redact:expr; $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg
        )
        .with_redaction($redact)
        $(.field(stringify!($key), &$value))*
        .log()
    };
    ($level:ident, $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($($args:tt)*) => { $crate::__log_at!(Debug, $($args)*) };
}

/// Convenience macro for info logging
#[macro_export]
macro_rules! log_info {
    ($($args:tt)*) => { $crate::__log_at!(Info, $($args)*) };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($($args:tt)*) => { $crate::__log_at!(Warn, $($args)*) };
}

/// Convenience macro for error logging
#[macro_export]
macro_rules! log_error {
    ($($args:tt)*) => { $crate::__log_at!(Error, $($args)*) };
}
