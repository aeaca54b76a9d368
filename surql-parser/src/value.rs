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

//! Maps `(Token, literal text)` to a typed [`Expression`] leaf. This is the
//! `declare` function from the component design: every primary token the
//! expression parser reads bottoms out here.

use std::str::FromStr;

use surql_lexer::Token;

use crate::ast::{Expression, JsonValue, Literal, Thing, ThingId};
use crate::error::{LiteralKind, ParseError, Result};

/// Strips one layer of quoting (`"…"`, `'…'`, `` `…` ``, `⟨…⟩`) and resolves
/// backslash escapes. Unknown escapes pass the escaped character through
/// unchanged — the scanner already rejected invalid escapes inside JSON,
/// and plain strings have no fixed escape alphabet to enforce.
fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next();
    chars.next_back();
    let inner = chars.as_str();

    let mut out = String::with_capacity(inner.len());
    let mut it = inner.chars();
    while let Some(c) = it.next() {
        if c == '\\' {
            match it.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn declare(token: Token, literal: &str) -> Result<Expression> {
    use Token::*;
    Ok(match token {
        True => Expression::Literal(Literal::Bool(true)),
        False => Expression::Literal(Literal::Bool(false)),
        Null => Expression::Literal(Literal::Null),
        Void => Expression::Literal(Literal::Void),
        Missing => Expression::Literal(Literal::Missing),
        Empty => Expression::Literal(Literal::Empty),
        Mul => Expression::Literal(Literal::All),
        Qmark => Expression::Literal(Literal::Any),
        Ident | Expr => Expression::Ident(unquote_if_quoted(literal)),
        Param => Expression::Param(literal.trim_start_matches('$').to_string()),
        Regex => Expression::Literal(Literal::Regex(strip_slashes(literal))),
        Value => Expression::Value,
        String | Region => Expression::Literal(Literal::String(unquote(literal))),
        Number | Double => Expression::Literal(Literal::Number(parse_number(literal)?)),
        Date => Expression::Literal(Literal::Date(parse_date(&unquote_if_quoted(literal))?)),
        Time => Expression::Literal(Literal::Time(parse_time(&unquote_if_quoted(literal))?)),
        Duration => Expression::Literal(Literal::Duration(parse_duration(&unquote_if_quoted(literal))?)),
        Json => Expression::Literal(Literal::Json(parse_json(literal)?)),
        Array => {
            let JsonValue::Array(items) = parse_json(literal)? else {
                return Err(ParseError::literal(LiteralKind::Json, literal));
            };
            Expression::Literal(Literal::Array(items))
        }
        Thing => Expression::Thing(parse_thing(literal)?),
        Model => Expression::Model(strip_delims(literal)),
        other => {
            return Err(ParseError::parse(other.to_string(), vec!["a value".to_string()]));
        }
    })
}

/// Strips quoting from an identifier-ish literal if present; used by the
/// statement parsers when an identifier position may also receive a
/// backtick- or angle-quoted spelling.
pub fn unquote_ident(s: &str) -> String {
    unquote_if_quoted(s)
}

fn unquote_if_quoted(s: &str) -> String {
    if s.len() >= 2 {
        let first = s.chars().next().unwrap();
        let last = s.chars().next_back().unwrap();
        if matches!((first, last), ('"', '"') | ('\'', '\'') | ('`', '`') | ('⟨', '⟩')) {
            return unquote(s);
        }
    }
    s.to_string()
}

fn strip_slashes(s: &str) -> String {
    strip_delims(s)
}

/// Drops the first and last character of `s` (a matched pair of
/// delimiters the scanner already balanced, e.g. `/…/` or `|…|`).
fn strip_delims(s: &str) -> String {
    let mut it = s.chars();
    it.next();
    it.next_back();
    it.as_str().to_string()
}

fn parse_number(s: &str) -> Result<f64> {
    f64::from_str(s).map_err(|_| ParseError::literal(LiteralKind::Number, s))
}

fn parse_duration(s: &str) -> Result<u64> {
    surql_lexer::parse_duration_nanos(s).ok_or_else(|| ParseError::literal(LiteralKind::Duration, s))
}

fn parse_date(s: &str) -> Result<jiff::civil::Date> {
    jiff::civil::Date::from_str(s).map_err(|_| ParseError::literal(LiteralKind::Date, s))
}

fn parse_time(s: &str) -> Result<jiff::Timestamp> {
    jiff::Timestamp::from_str(s).map_err(|_| ParseError::literal(LiteralKind::Time, s))
}

fn parse_thing(literal: &str) -> Result<Thing> {
    let colon = literal.find(':').ok_or_else(|| ParseError::parse(literal, vec!["table:id".to_string()]))?;
    let table = literal[..colon].to_string();
    let id_raw = &literal[colon + 1..];
    let id_text = unquote_if_quoted(id_raw);
    let id = retype_thing_id(&id_text);
    Ok(Thing { table, id })
}

/// Recursively re-types a Thing's id part: int, then float, then bool,
/// then date, then time, falling back to the raw string.
fn retype_thing_id(s: &str) -> ThingId {
    if let Ok(i) = i64::from_str(s) {
        return ThingId::Int(i);
    }
    if let Ok(f) = f64::from_str(s) {
        return ThingId::Float(f);
    }
    if let Ok(b) = bool::from_str(s) {
        return ThingId::Bool(b);
    }
    if let Ok(d) = jiff::civil::Date::from_str(s) {
        return ThingId::Date(d);
    }
    if let Ok(t) = jiff::Timestamp::from_str(s) {
        return ThingId::Time(t);
    }
    ThingId::String(s.to_string())
}

/// A lenient hand-rolled JSON decoder: permissive about key quoting is
/// *not* allowed (unquoted keys like `{name: "x"}` are rejected, matching
/// the negative case `{"name","London"}` → `Invalid JSON`), but otherwise
/// a thin recursive-descent reader over the already-balanced blob the
/// scanner handed us.
pub fn parse_json(s: &str) -> Result<JsonValue> {
    let mut p = JsonParser { chars: s.char_indices().peekable(), src: s };
    p.skip_ws();
    let value = p.parse_value().ok_or_else(|| ParseError::literal(LiteralKind::Json, s))?;
    p.skip_ws();
    if p.chars.peek().is_some() {
        return Err(ParseError::literal(LiteralKind::Json, s));
    }
    Ok(value)
}

struct JsonParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl<'a> JsonParser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn parse_value(&mut self) -> Option<JsonValue> {
        self.skip_ws();
        match self.peek_char()? {
            '{' => self.parse_object(),
            '[' => self.parse_array(),
            '"' => self.parse_string().map(JsonValue::String),
            't' => self.parse_keyword("true", JsonValue::Bool(true)),
            'f' => self.parse_keyword("false", JsonValue::Bool(false)),
            'n' => self.parse_keyword("null", JsonValue::Null),
            c if c == '-' || c.is_ascii_digit() => self.parse_number(),
            _ => None,
        }
    }

    fn parse_keyword(&mut self, kw: &str, value: JsonValue) -> Option<JsonValue> {
        for expected in kw.chars() {
            let (_, c) = self.chars.next()?;
            if c != expected {
                return None;
            }
        }
        Some(value)
    }

    fn parse_number(&mut self) -> Option<JsonValue> {
        let (start, _) = *self.chars.peek()?;
        if self.peek_char() == Some('-') {
            self.chars.next();
        }
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.chars.next();
        }
        if self.peek_char() == Some('.') {
            self.chars.next();
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.chars.next();
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            self.chars.next();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.chars.next();
            }
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.chars.next();
            }
        }
        let end = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.src.len());
        self.src[start..end].parse::<f64>().ok().map(JsonValue::Number)
    }

    fn parse_string(&mut self) -> Option<String> {
        self.chars.next(); // opening quote
        let mut out = String::new();
        loop {
            let (_, c) = self.chars.next()?;
            match c {
                '"' => return Some(out),
                '\\' => {
                    let (_, esc) = self.chars.next()?;
                    match esc {
                        'b' => out.push('\u{8}'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'n' => out.push('\n'),
                        'f' => out.push('\u{c}'),
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        _ => return None,
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn parse_array(&mut self) -> Option<JsonValue> {
        self.chars.next(); // '['
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek_char() == Some(']') {
            self.chars.next();
            return Some(JsonValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.chars.next()? {
                (_, ',') => continue,
                (_, ']') => break,
                _ => return None,
            }
        }
        Some(JsonValue::Array(items))
    }

    fn parse_object(&mut self) -> Option<JsonValue> {
        self.chars.next(); // '{'
        let mut fields = Vec::new();
        self.skip_ws();
        if self.peek_char() == Some('}') {
            self.chars.next();
            return Some(JsonValue::Object(fields));
        }
        loop {
            self.skip_ws();
            if self.peek_char() != Some('"') {
                return None;
            }
            let key = self.parse_string()?;
            self.skip_ws();
            if self.chars.next()?.1 != ':' {
                return None;
            }
            let value = self.parse_value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.chars.next()? {
                (_, ',') => continue,
                (_, '}') => break,
                _ => return None,
            }
        }
        Some(JsonValue::Object(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_numbers_and_strings() {
        assert_eq!(declare(Token::Number, "42").unwrap(), Expression::Literal(Literal::Number(42.0)));
        assert_eq!(
            declare(Token::String, "'hi'").unwrap(),
            Expression::Literal(Literal::String("hi".to_string()))
        );
    }

    #[test]
    fn declares_thing_with_retyped_int_id() {
        let Expression::Thing(thing) = declare(Token::Thing, "person:123").unwrap() else {
            panic!("expected a Thing");
        };
        assert_eq!(thing.table, "person");
        assert_eq!(thing.id, ThingId::Int(123));
    }

    #[test]
    fn declares_thing_with_quoted_string_id() {
        let Expression::Thing(thing) = declare(Token::Thing, "email:⟨a@b.c⟩").unwrap() else {
            panic!("expected a Thing");
        };
        assert_eq!(thing.id, ThingId::String("a@b.c".to_string()));
    }

    #[test]
    fn rejects_object_literal_missing_keys() {
        let err = parse_json(r#"{"name","London"}"#).unwrap_err();
        assert!(matches!(err, ParseError::Literal { kind: LiteralKind::Json, .. }));
    }

    #[test]
    fn parses_nested_json() {
        let v = parse_json(r#"{"a": 1, "b": [1, 2, {"c": true}]}"#).unwrap();
        assert_eq!(
            v,
            JsonValue::Object(vec![
                ("a".to_string(), JsonValue::Number(1.0)),
                (
                    "b".to_string(),
                    JsonValue::Array(vec![
                        JsonValue::Number(1.0),
                        JsonValue::Number(2.0),
                        JsonValue::Object(vec![("c".to_string(), JsonValue::Bool(true))]),
                    ])
                ),
            ])
        );
    }

    #[test]
    fn declares_duration() {
        let Expression::Literal(Literal::Duration(nanos)) = declare(Token::Duration, "'1h'").unwrap() else {
            panic!("expected a duration");
        };
        assert_eq!(nanos, 3_600_000_000_000);
    }
}
