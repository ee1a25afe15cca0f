//! Timeout values as they appear in peer configuration files.
//!
//! Accepted forms:
//! - a JSON number of seconds: `5`, `2.5`
//! - a clock string: `"00:00:05"`, `"01:30"` (minutes:seconds), `"1.02:00:00"` (days prefix)
//! - an ISO-8601 duration: `"PT5S"`, `"PT1M30S"`, `"P1DT2H"`

use std::time::Duration;

use serde_json::Value;

/// Parse a configuration timeout value. Returns `None` when the value is not understood.
pub fn parse_timeout(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        Value::String(s) => parse_timeout_str(s),
        _ => None,
    }
}

fn parse_timeout_str(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(rest) = s.strip_prefix('P').or_else(|| s.strip_prefix('p')) {
        return parse_iso8601(rest);
    }
    if s.contains(':') {
        return parse_clock(s);
    }
    s.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// `[d.]hh:mm:ss[.fff]` or `mm:ss`
fn parse_clock(s: &str) -> Option<Duration> {
    let (days, clock) = match s.split_once('.') {
        Some((d, rest)) if rest.contains(':') && !d.contains(':') => (d.parse::<u64>().ok()?, rest),
        _ => (0, s),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, sec] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *sec),
        [m, sec] => (0, m.parse::<u64>().ok()?, *sec),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    let seconds = seconds.parse::<f64>().ok().filter(|v| *v >= 0.0 && *v < 60.0)?;

    let whole = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60)?;
    Duration::from_secs(whole).checked_add(Duration::try_from_secs_f64(seconds).ok()?)
}

/// The part after `P`: `[nD][T[nH][nM][nS]]`
fn parse_iso8601(s: &str) -> Option<Duration> {
    let (date, time) = match s.split_once(|c: char| c == 'T' || c == 't') {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };

    let mut total = 0f64;
    let mut seen = false;

    for (number, unit) in designators(date)? {
        match unit {
            'D' => total += number * 86_400.0,
            'W' => total += number * 604_800.0,
            _ => return None,
        }
        seen = true;
    }
    if let Some(time) = time {
        let parts = designators(time)?;
        if parts.is_empty() {
            return None;
        }
        for (number, unit) in parts {
            match unit {
                'H' => total += number * 3_600.0,
                'M' => total += number * 60.0,
                'S' => total += number,
                _ => return None,
            }
            seen = true;
        }
    }

    if !seen {
        return None;
    }
    Duration::try_from_secs_f64(total).ok()
}

fn designators(s: &str) -> Option<Vec<(f64, char)>> {
    let mut out = Vec::new();
    let mut number = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
        } else {
            let value = number.parse::<f64>().ok()?;
            out.push((value, c.to_ascii_uppercase()));
            number.clear();
        }
    }
    number.is_empty().then_some(out)
}
