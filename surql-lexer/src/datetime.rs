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

//! Recognizers for the two date-shaped literal upgrades the scanner
//! performs on string close: a bare `YYYY-MM-DD` up-types to `DATE`, a full
//! RFC3339 timestamp up-types to `TIME`. These are probes, not validating
//! parsers — they only decide which token category to emit. The Value
//! Constructor in `surql-parser` is what actually rejects e.g. `2023-02-30`.

/// `YYYY-MM-DD`, nothing else.
pub fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && is_digits(&b[0..4])
        && b[4] == b'-'
        && is_digits(&b[5..7])
        && b[7] == b'-'
        && is_digits(&b[8..10])
}

/// A full RFC3339 timestamp: `YYYY-MM-DDTHH:MM:SS[.fraction](Z|+HH:MM|-HH:MM)`.
/// The `T` may also be a plain space, matching the looser spellings the
/// scanner sees from hand-typed queries.
pub fn looks_like_datetime(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 20 {
        return false;
    }
    if !(is_digits(&b[0..4]) && b[4] == b'-' && is_digits(&b[5..7]) && b[7] == b'-' && is_digits(&b[8..10])) {
        return false;
    }
    if !(b[10] == b'T' || b[10] == b't' || b[10] == b' ') {
        return false;
    }
    if !(is_digits(&b[11..13]) && b[13] == b':' && is_digits(&b[14..16]) && b[16] == b':' && is_digits(&b[17..19])) {
        return false;
    }

    let mut i = 19;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }

    if i >= b.len() {
        return false;
    }
    match b[i] {
        b'Z' | b'z' => i + 1 == b.len(),
        b'+' | b'-' => {
            let rest = &s[i + 1..];
            let rb = rest.as_bytes();
            rb.len() == 5 && is_digits(&rb[0..2]) && rb[2] == b':' && is_digits(&rb[3..5])
        }
        _ => false,
    }
}

fn is_digits(b: &[u8]) -> bool {
    !b.is_empty() && b.iter().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_dates() {
        assert!(looks_like_date("2023-01-15"));
        assert!(!looks_like_date("2023-1-15"));
        assert!(!looks_like_date("2023-01-15T00:00:00Z"));
        assert!(!looks_like_date("not a date"));
    }

    #[test]
    fn recognizes_datetimes() {
        assert!(looks_like_datetime("2023-01-15T12:30:00Z"));
        assert!(looks_like_datetime("2023-01-15T12:30:00.123Z"));
        assert!(looks_like_datetime("2023-01-15T12:30:00+01:00"));
        assert!(looks_like_datetime("2023-01-15 12:30:00Z"));
        assert!(!looks_like_datetime("2023-01-15"));
        assert!(!looks_like_datetime("2023-01-15T12:30:00"));
    }
}
