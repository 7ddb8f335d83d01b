// src/types.rs

//! Small shared value types: identifiers, the cancellation flag, and the
//! duration syntax used in config (`"250ms"`, `"30s"`, `"5m"`, `"1h"`).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Merge templates are addressed by their config key (e.g. `"welcome"`).
pub type TemplateId = String;

/// Identity of a single merge run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Fresh random run id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token routing progress events to one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionToken(String);

impl ConnectionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConnectionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ConnectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cooperative cancellation flag shared between a caller and a run.
///
/// The orchestrator only looks at it on row boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Milliseconds per unit accepted by [`parse_duration`].
const DURATION_UNITS: [(&str, u64); 4] = [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

/// Parse a config duration: an unsigned integer followed by `ms`, `s`, `m`
/// or `h` (`"250ms"`, `"30s"`). Whitespace before the unit is allowed.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{text}' has no unit"))?;
    let (amount, unit) = text.split_at(digits_end);
    let amount: u64 = amount
        .parse()
        .map_err(|e| format!("bad duration amount in '{text}': {e}"))?;

    let unit = unit.trim().to_ascii_lowercase();
    let per_unit = DURATION_UNITS
        .iter()
        .find_map(|(name, millis)| (*name == unit).then_some(*millis))
        .ok_or_else(|| format!("unknown duration unit '{unit}' (use ms, s, m or h)"))?;

    amount
        .checked_mul(per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{text}' overflows"))
}
