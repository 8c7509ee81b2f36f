use chrono::{Local, NaiveDateTime};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current local time as written to job status files
pub fn now_timestamp() -> String {
    Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f").ok()
}

/// Seconds between two status file timestamps, `None` if either can't be parsed
pub fn seconds_between(started: &str, ended: &str) -> Option<i64> {
    let s = parse_timestamp(started)?;
    let e = parse_timestamp(ended)?;
    Some((e - s).num_seconds())
}

/// Short elapsed time: the two most significant of days, hours, minutes and seconds
///
/// `3725` → ` 1h:02m`, `65` → `01m:05s`, `90061` → ` 1d:01h`
pub fn format_duration(seconds: i64) -> String {
    let lasted = seconds.max(0);
    let mut parts = Vec::with_capacity(4);

    let days = lasted / (24 * 3600);
    if days > 0 {
        parts.push(format!("{days:2}d"));
    }
    let mut rest = lasted - days * 24 * 3600;

    let hours = rest / 3600;
    if hours > 0 || !parts.is_empty() {
        parts.push(if parts.is_empty() { format!("{hours:2}h") } else { format!("{hours:02}h") });
    }
    rest -= hours * 3600;

    let mins = rest / 60;
    parts.push(format!("{mins:02}m"));
    parts.push(format!("{:02}s", rest - mins * 60));

    parts.truncate(2);
    parts.join(":")
}
