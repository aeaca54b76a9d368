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

use std::iter::Peekable;
use std::ops::Range;
use std::str::Chars;

use crate::datetime;
use crate::duration;
use crate::token::Token;

/// A scanned token: its category, its source span, and the raw slice of
/// source text that produced it (still quoted/escaped — the Value
/// Constructor in `surql-parser` is what decodes it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub token: Token,
    pub literal: &'a str,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnterminatedString,
    UnterminatedBlockComment,
    UnterminatedObject,
    UnterminatedArray,
    UnterminatedThing,
    UnknownEscape(char),
    UnexpectedChar(char),
}

/// Scans a `&str` into a stream of [`Lexeme`]s.
///
/// The forward side of the two-sided rune stack described by the design is
/// just the underlying `Peekable<Chars>`; a second, one-`char`-deeper peek
/// (`peek2`) is obtained by cloning the iterator, the same trick the
/// numeric scanner below uses to decide `1.2` vs `1.2.3`. Nothing in this
/// grammar needs true push-back: the `-`/`->`/`<-`/`<->` cascade and the
/// float/duration suffixes are all resolved by lookahead alone.
pub struct Lexer<'a> {
    original: &'a str,
    chars: Peekable<Chars<'a>>,
    start_index: usize,
    current_index: usize,
    done: bool,
}

pub const MAX_ERROR_LITERAL: usize = 1000;

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            original: source,
            chars: source.chars().peekable(),
            start_index: 0,
            current_index: 0,
            done: false,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start_index..self.current_index
    }

    pub fn slice(&self) -> &'a str {
        &self.original[self.start_index..self.current_index]
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.current_index += c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn read_while<F>(&mut self, predicate: F)
    where
        F: Fn(char) -> bool,
    {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn emit(&self, token: Token) -> Lexeme<'a> {
        Lexeme {
            token,
            literal: self.slice(),
            span: self.span(),
        }
    }

    /// Maps the multi-byte Unicode operator spellings onto their ASCII
    /// counterparts, keeping every other match arm in the scanner ASCII.
    fn map_unicode_operator(c: char) -> Option<Token> {
        use Token::*;
        Some(match c {
            '×' | '∙' => Mul,
            '÷' => Div,
            '¬' => Not,
            '≤' => Lte,
            '≥' => Gte,
            '∈' => Inside,
            '∉' => NotInside,
            '∋' => Contains,
            '∌' => ContainsNot,
            '⊆' | '⊇' => AllInside,
            '⊂' | '⊃' => AnyInside,
            '⊄' | '⊅' => NoneInside,
            '~' => Fuzzy,
            _ => return None,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Lexeme<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.start_index = self.current_index;
        match self.peek() {
            Some(c) if c.is_whitespace() => {
                self.read_while(|c| c.is_whitespace());
                return Some(Ok(self.emit(Token::Ws)));
            }
            Some('#') => {
                self.read_while(|c| c != '\n');
                return Some(Ok(self.emit(Token::Ws)));
            }
            Some('-') if self.peek2() == Some('-') => {
                self.advance();
                self.advance();
                self.read_while(|c| c != '\n');
                return Some(Ok(self.emit(Token::Ws)));
            }
            Some('/') if self.peek2() == Some('*') => {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.matches('/') => break,
                        Some(_) => continue,
                        None => return Some(Err(LexError::UnterminatedBlockComment)),
                    }
                }
                return Some(Ok(self.emit(Token::Ws)));
            }
            _ => {}
        }

        self.start_index = self.current_index;
        let Some(c) = self.advance() else {
            self.done = true;
            return Some(Ok(Lexeme {
                token: Token::Eof,
                literal: "",
                span: self.current_index..self.current_index,
            }));
        };

        Some(self.scan_one(c))
    }
}

impl<'a> Lexer<'a> {
    fn scan_one(&mut self, c: char) -> Result<Lexeme<'a>, LexError> {
        use Token::*;

        match c {
            '(' => Ok(self.emit(LParen)),
            ')' => Ok(self.emit(RParen)),
            '[' => self.scan_array(),
            ']' => Ok(self.emit(RBracket)),
            '{' => self.scan_json(),
            '}' => Ok(self.emit(RBrace)),
            ',' => Ok(self.emit(Comma)),
            ';' => Ok(self.emit(Semicolon)),
            '+' => Ok(self.emit(Add)),
            '*' => Ok(self.emit(Mul)),
            '?' => {
                if self.matches('=') {
                    Ok(self.emit(Fuzzy))
                } else {
                    Ok(self.emit(Qmark))
                }
            }
            ':' => Ok(self.emit(Colon)),
            '.' => {
                // Leading-dot float: `.2`
                if self.peek().is_some_and(|d| d.is_ascii_digit()) {
                    self.read_while(|c| c.is_ascii_digit());
                    self.scan_exponent();
                    return Ok(self.emit(Double));
                }
                Ok(self.emit(Dot))
            }
            '=' => {
                if self.matches('=') {
                    Ok(self.emit(Exq))
                } else {
                    Ok(self.emit(Eq))
                }
            }
            '!' => {
                if self.matches('=') {
                    if self.matches('=') {
                        Ok(self.emit(Nex))
                    } else {
                        Ok(self.emit(Neq))
                    }
                } else {
                    Err(LexError::UnexpectedChar('!'))
                }
            }
            '<' => {
                if self.matches('-') {
                    if self.matches('>') {
                        Ok(self.emit(ArrowBoth))
                    } else {
                        Ok(self.emit(ArrowBack))
                    }
                } else if self.matches('=') {
                    Ok(self.emit(Lte))
                } else if self.matches('>') {
                    Ok(self.emit(Neq))
                } else {
                    Ok(self.emit(Lt))
                }
            }
            '>' => {
                if self.matches('=') {
                    Ok(self.emit(Gte))
                } else {
                    Ok(self.emit(Gt))
                }
            }
            '-' => {
                if self.matches('>') {
                    Ok(self.emit(Arrow))
                } else {
                    Ok(self.emit(Sub))
                }
            }
            '/' => {
                if self.starts_regex() {
                    self.scan_regex()
                } else {
                    Ok(self.emit(Div))
                }
            }
            '$' => self.scan_param(),
            '"' => self.scan_quoted('"'),
            '\'' => self.scan_quoted('\''),
            '`' => self.scan_backtick_ident(),
            '⟨' => self.scan_angle_ident(),
            '@' => self.scan_legacy_thing(),
            '|' => self.scan_model(),
            '0'..='9' => self.scan_number(c),
            c if c.is_alphabetic() || c == '_' => self.scan_ident_or_thing(),
            c => {
                if let Some(tok) = Self::map_unicode_operator(c) {
                    Ok(self.emit(tok))
                } else {
                    Err(LexError::UnexpectedChar(c))
                }
            }
        }
    }

    /// `/` starts a regex literal unless it's immediately followed by
    /// whitespace or EOF, in which case it's division.
    fn starts_regex(&mut self) -> bool {
        !matches!(self.peek(), None | Some(' ') | Some('\t') | Some('\n') | Some('\r'))
    }

    fn scan_regex(&mut self) -> Result<Lexeme<'a>, LexError> {
        loop {
            match self.advance() {
                Some('/') => return Ok(self.emit(Token::Regex)),
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(LexError::UnterminatedString);
                    }
                }
                Some(_) => continue,
                None => return Err(LexError::UnterminatedString),
            }
        }
    }

    fn scan_param(&mut self) -> Result<Lexeme<'a>, LexError> {
        self.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
        Ok(self.emit(Token::Param))
    }

    fn scan_quoted(&mut self, quote: char) -> Result<Lexeme<'a>, LexError> {
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(LexError::UnterminatedString);
                    }
                }
                Some(_) => continue,
                None => return Err(LexError::UnterminatedString),
            }
        }
        Ok(self.emit(self.probe_string_upgrade()))
    }

    fn scan_backtick_ident(&mut self) -> Result<Lexeme<'a>, LexError> {
        loop {
            match self.advance() {
                Some('`') => break,
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(LexError::UnterminatedString);
                    }
                }
                Some(_) => continue,
                None => return Err(LexError::UnterminatedString),
            }
        }
        Ok(self.emit(Token::Expr))
    }

    fn scan_angle_ident(&mut self) -> Result<Lexeme<'a>, LexError> {
        loop {
            match self.advance() {
                Some('⟩') => break,
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(LexError::UnterminatedString);
                    }
                }
                Some(_) => continue,
                None => return Err(LexError::UnterminatedString),
            }
        }
        Ok(self.emit(Token::Expr))
    }

    /// Having just closed a quoted string, probe the unescaped content to
    /// see whether it should be up-typed to `DURATION`, `DATE`, or `TIME`.
    /// The literal carried on the lexeme is unchanged either way — only the
    /// token category changes — the Value Constructor still does the
    /// actual parse and is the source of truth for validity.
    fn probe_string_upgrade(&self) -> Token {
        let raw = self.slice();
        let inner = &raw[1..raw.len().saturating_sub(1)];
        if duration::looks_like_duration(inner) {
            Token::Duration
        } else if datetime::looks_like_date(inner) {
            Token::Date
        } else if datetime::looks_like_datetime(inner) {
            Token::Time
        } else {
            Token::String
        }
    }

    fn scan_model(&mut self) -> Result<Lexeme<'a>, LexError> {
        loop {
            match self.advance() {
                Some('|') => break,
                Some(_) => continue,
                None => return Err(LexError::UnterminatedString),
            }
        }
        Ok(self.emit(Token::Model))
    }

    fn scan_number(&mut self, _first: char) -> Result<Lexeme<'a>, LexError> {
        use Token::*;

        self.read_while(|c| c.is_ascii_digit());

        let mut float_dots = 0usize;
        while self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.read_while(|c| c.is_ascii_digit());
            float_dots += 1;
            if float_dots > 1 {
                break;
            }
        }

        // `1.2.3`: a second `.` collapses the whole run into a bare
        // identifier instead of two numbers, per the scanner's upgrade
        // rule (NUMBER -> DOUBLE on the first `.`, DOUBLE -> IDENT on the
        // second).
        if float_dots > 1 {
            self.read_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
            return Ok(self.emit(Ident));
        }

        let had_exponent = self.scan_exponent();
        let is_float = float_dots == 1 || had_exponent;

        if !is_float && self.scan_duration_suffix() {
            // Greedily consume further `<digits><unit>` groups so `1h30m`
            // scans as a single DURATION instead of `1h` followed by a
            // bare `30m` identifier-looking remainder.
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                let checkpoint_chars = self.chars.clone();
                let checkpoint_cur = self.current_index;
                self.read_while(|c| c.is_ascii_digit());
                if !self.scan_duration_suffix() {
                    self.chars = checkpoint_chars;
                    self.current_index = checkpoint_cur;
                    break;
                }
            }
            return Ok(self.emit(Duration));
        }

        Ok(self.emit(if is_float { Double } else { Number }))
    }

    /// Consumes a trailing `[eE][+-]?[0-9]+`, returning whether one was
    /// present.
    fn scan_exponent(&mut self) -> bool {
        if !matches!(self.peek(), Some('e') | Some('E')) {
            return false;
        }
        let mut lookahead = self.chars.clone();
        lookahead.next(); // the e/E itself
        let has_sign = matches!(lookahead.clone().next(), Some('+') | Some('-'));
        if has_sign {
            lookahead.next();
        }
        if !lookahead.next().is_some_and(|c| c.is_ascii_digit()) {
            return false;
        }

        self.advance(); // e/E
        if has_sign {
            self.advance();
        }
        self.read_while(|c| c.is_ascii_digit());
        true
    }

    /// Consumes a duration unit (`ns us µs ms s m h d w y`) immediately
    /// following a run of digits, backtracking if what follows isn't a
    /// recognized unit.
    fn scan_duration_suffix(&mut self) -> bool {
        let Some(c) = self.peek() else { return false };
        if !(c.is_ascii_alphabetic() || c == 'µ') {
            return false;
        }

        let checkpoint_chars = self.chars.clone();
        let checkpoint_cur = self.current_index;
        let unit_start = self.current_index;

        self.read_while(|c| c.is_ascii_alphabetic() || c == 'µ');
        let unit = &self.original[unit_start..self.current_index];

        let valid = matches!(unit, "ns" | "us" | "µs" | "ms" | "s" | "m" | "h" | "d" | "w" | "y");
        if !valid {
            self.chars = checkpoint_chars;
            self.current_index = checkpoint_cur;
        }
        valid
    }

    /// Legacy `@table:id` Thing reference. The `@` sigil is only ever a
    /// prefix on a full `table:id` pair, never on a bare table name, so this
    /// discards it and re-bases the span to start at `table`: the emitted
    /// `THING` token's literal is then identical to the post-layer
    /// `table:id` spelling, and nothing downstream needs to special-case
    /// the `@` form at all.
    fn scan_legacy_thing(&mut self) -> Result<Lexeme<'a>, LexError> {
        self.start_index = self.current_index;
        self.read_while(|c| c.is_alphanumeric() || c == '_');
        if self.peek() == Some(':') && self.peek2() != Some(':') {
            self.scan_thing_from()
        } else {
            Err(LexError::UnexpectedChar('@'))
        }
    }

    fn scan_ident_or_thing(&mut self) -> Result<Lexeme<'a>, LexError> {
        self.read_while(|c| c.is_alphanumeric() || c == '_');

        // `math::max` — a scoped function path. Each `::segment` folds into
        // the same token, so the parser sees one identifier, not a `Colon`
        // pair either side of a bare `max`.
        while self.peek() == Some(':') && self.peek2() == Some(':') {
            self.advance();
            self.advance();
            self.read_while(|c| c.is_alphanumeric() || c == '_');
        }

        let text = self.slice();

        // `table:id` — a bare identifier immediately followed by a single
        // `:` (not `::`, already consumed above as part of a scoped path)
        // becomes a whole THING token.
        if self.peek() == Some(':') && self.peek2() != Some(':') {
            return self.scan_thing_from();
        }

        let kw = Token::from_name(text);
        if kw != Token::Illegal {
            return Ok(self.emit(kw));
        }

        Ok(self.emit(Token::Ident))
    }

    fn scan_thing_from(&mut self) -> Result<Lexeme<'a>, LexError> {
        self.advance(); // ':'
        match self.peek() {
            Some('⟨') => {
                self.advance();
                loop {
                    match self.advance() {
                        Some('⟩') => break,
                        Some('\\') => {
                            if self.advance().is_none() {
                                return Err(LexError::UnterminatedThing);
                            }
                        }
                        Some(_) => continue,
                        None => return Err(LexError::UnterminatedThing),
                    }
                }
            }
            Some('`') => {
                self.advance();
                loop {
                    match self.advance() {
                        Some('`') => break,
                        Some(_) => continue,
                        None => return Err(LexError::UnterminatedThing),
                    }
                }
            }
            _ => {
                self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ':');
            }
        }
        Ok(self.emit(Token::Thing))
    }

    fn scan_array(&mut self) -> Result<Lexeme<'a>, LexError> {
        let mut depth = 1usize;
        let mut in_string: Option<char> = None;
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedArray),
                Some(c) => {
                    if let Some(q) = in_string {
                        if c == '\\' {
                            if self.advance().is_none() {
                                return Err(LexError::UnterminatedArray);
                            }
                        } else if c == q {
                            in_string = None;
                        }
                        continue;
                    }
                    match c {
                        '"' | '\'' => in_string = Some(c),
                        '[' => depth += 1,
                        ']' => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(self.emit(Token::Array));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn scan_json(&mut self) -> Result<Lexeme<'a>, LexError> {
        let mut depth = 1usize;
        let mut in_string: Option<char> = None;
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedObject),
                Some(c) => {
                    if let Some(q) = in_string {
                        if c == '\\' {
                            match self.advance() {
                                Some('b' | 't' | 'r' | 'n' | 'f' | '"' | '\\') => {}
                                Some(other) => return Err(LexError::UnknownEscape(other)),
                                None => return Err(LexError::UnterminatedObject),
                            }
                        } else if c == q {
                            in_string = None;
                        }
                        continue;
                    }
                    match c {
                        '"' => in_string = Some(c),
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(self.emit(Token::Json));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

pub fn truncate_for_error(s: &str) -> &str {
    if s.len() <= MAX_ERROR_LITERAL {
        s
    } else {
        let mut end = MAX_ERROR_LITERAL;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}
