//! Environment variable helpers used by the config layer
//!
//! Every tunable in syslib has a compile-time default and an optional
//! `SYSLIB_*` environment override. Unset variables fall back silently;
//! set-but-unparsable variables fall back too, with a `tracing` warning.
//!
//! ```ignore
//! use syslib_core::env::{env_or, env_flag};
//!
//! let workers: usize = env_or("SYSLIB_NUM_WORKERS", 4);
//! let on_pool = env_flag("SYSLIB_LOG_ON_POOL", true);
//! ```

use std::str::FromStr;
use tracing::warn;

/// Parse `key` as `T`. `None` if unset or unparsable.
pub fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

/// Parse `key` as `T`, or return `default`
#[inline]
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_parse(key).unwrap_or(default)
}

/// Boolean flag. "1", "true", "yes", "on" are true; "0", "false", "no",
/// "off" are false (case-insensitive). Anything else yields `default`.
pub fn env_flag(key: &str, default: bool) -> bool {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(key, value = %raw, "ignoring unparsable boolean override");
            default
        }
    }
}
