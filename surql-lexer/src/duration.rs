// Copyright 2025 ScopeDB, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Go-style duration literals: one or more `<digits><unit>` pairs back to
//! back, e.g. `1h30m`, `2w`, `500ms`. No separators, no sign, no fractional
//! digits — the grammar this scanner serves doesn't need them.

const UNITS: &[&str] = &["ns", "us", "µs", "ms", "s", "m", "h", "d", "w", "y"];

/// Nanoseconds per unit. `d`/`w`/`y` are fixed-length (24h days, 7-day
/// weeks, 365-day years) rather than calendar-aware, matching a scanner
/// that has no notion of a calendar.
fn unit_nanos(unit: &str) -> u64 {
    const NS: u64 = 1;
    const US: u64 = 1_000 * NS;
    const MS: u64 = 1_000 * US;
    const S: u64 = 1_000 * MS;
    const M: u64 = 60 * S;
    const H: u64 = 60 * M;
    const D: u64 = 24 * H;
    const W: u64 = 7 * D;
    const Y: u64 = 365 * D;
    match unit {
        "ns" => NS,
        "us" | "µs" => US,
        "ms" => MS,
        "s" => S,
        "m" => M,
        "h" => H,
        "d" => D,
        "w" => W,
        "y" => Y,
        _ => 0,
    }
}

/// Whether `s` is entirely made up of one or more `<digits><unit>` groups,
/// with nothing left over. Used by the scanner to decide whether a closed
/// string literal should be up-typed to `DURATION`.
pub fn looks_like_duration(s: &str) -> bool {
    parse_groups(s).is_some()
}

/// Parses `s` into a total nanosecond count, or `None` if it isn't a well
/// formed duration literal.
pub fn parse_duration_nanos(s: &str) -> Option<u64> {
    let groups = parse_groups(s)?;
    let mut total: u64 = 0;
    for (count, unit) in groups {
        total = total.checked_add(count.checked_mul(unit_nanos(unit))?)?;
    }
    Some(total)
}

fn parse_groups(s: &str) -> Option<Vec<(u64, &str)>> {
    if s.is_empty() {
        return None;
    }
    let mut groups = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let count: u64 = s[digits_start..i].parse().ok()?;

        let unit_start = i;
        let unit = UNITS
            .iter()
            .filter(|u| s[unit_start..].starts_with(**u))
            // Prefer the longest matching unit spelling so `ms` doesn't
            // get mis-split into `m` + a dangling `s`.
            .max_by_key(|u| u.len())?;
        i = unit_start + unit.len();
        groups.push((count, *unit));
    }
    Some(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_simple_durations() {
        assert!(looks_like_duration("1h"));
        assert!(looks_like_duration("1h30m"));
        assert!(looks_like_duration("500ms"));
        assert!(looks_like_duration("2w"));
        assert!(looks_like_duration("1y2w3d4h5m6s7ms8us9ns"));
    }

    #[test]
    fn rejects_non_durations() {
        assert!(!looks_like_duration(""));
        assert!(!looks_like_duration("hello"));
        assert!(!looks_like_duration("1.5h"));
        assert!(!looks_like_duration("h1"));
        assert!(!looks_like_duration("1"));
    }

    #[test]
    fn computes_nanos() {
        assert_eq!(parse_duration_nanos("1s"), Some(1_000_000_000));
        assert_eq!(parse_duration_nanos("1m"), Some(60_000_000_000));
        assert_eq!(parse_duration_nanos("1h"), Some(3_600_000_000_000));
    }
}
