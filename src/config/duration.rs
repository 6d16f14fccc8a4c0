//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "300" into a [`Duration`].
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Milliseconds suffix: "500ms"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    // Longest suffix first so "ms" is not read as minutes
    const UNITS: [(&str, fn(u64) -> Option<Duration>); 4] = [
        ("ms", |n| Some(Duration::from_millis(n))),
        ("h", |n| n.checked_mul(3600).map(Duration::from_secs)),
        ("m", |n| n.checked_mul(60).map(Duration::from_secs)),
        ("s", |n| Some(Duration::from_secs(n))),
    ];

    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (digits, unit): (&str, fn(u64) -> Option<Duration>) = UNITS
        .iter()
        .find_map(|(suffix, unit)| s.strip_suffix(suffix).map(|digits| (digits, *unit)))
        .unwrap_or((s, |n| Some(Duration::from_secs(n))));
    let value: u64 = digits
        .parse()
        .with_context(|| format!("Invalid duration '{s}'"))?;
    unit(value).ok_or_else(|| anyhow::anyhow!("Duration '{s}' is too large"))
}
