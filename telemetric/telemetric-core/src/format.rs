use std::fmt::Write as _;

use chrono::{DateTime, Utc};

/// Render bytes as colon-separated lowercase hex pairs, e.g. `aa:bb:cc`.
pub fn format_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Render a millisecond epoch timestamp as `"<date> (<ms>ms)"` in UTC.
///
/// Values outside the representable date range fall back to the raw number.
pub fn format_timestamp(millis: u64) -> String {
    let date = i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis);
    match date {
        Some(dt) => format!("{} ({}ms)", dt.format("%a %b %e %H:%M:%S %Y"), millis % 1000),
        None => millis.to_string(),
    }
}
