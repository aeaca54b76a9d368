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

//! The parser's single error sum type. Every variant carries enough
//! context for a user-facing message without holding onto source offsets
//! beyond the current token's literal.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Your SQL query is empty")]
    Empty,

    #[error("Found `{found}` but expected `{}`", expected.join(", "))]
    Parse { found: String, expected: Vec<String> },

    #[error(
        "Found '{found}' but field is not an aggregate function, and is not present in GROUP expression"
    )]
    Group { found: String },

    #[error("You don't have permission to perform this query type")]
    Query,

    #[error("You need to specify a namespace and a database to use")]
    Blank,

    #[error("DEFINE and REMOVE statements must be outside of a transaction")]
    Tx,

    #[error("You don't have permission to access the '{resource}' namespace/database")]
    Perms { resource: String },

    #[error("Invalid {kind}: {literal}")]
    Literal { kind: LiteralKind, literal: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Json,
    Number,
    Duration,
    Date,
    Time,
}

impl std::fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LiteralKind::Json => "JSON",
            LiteralKind::Number => "number",
            LiteralKind::Duration => "duration",
            LiteralKind::Date => "date",
            LiteralKind::Time => "datetime",
        };
        write!(f, "{s}")
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

impl ParseError {
    /// Truncates the offending literal to 1000 characters before it's
    /// embedded in a `Parse` error, per the statement parser's failure
    /// semantics.
    pub fn parse(found: impl Into<String>, expected: Vec<String>) -> Self {
        let found = found.into();
        ParseError::Parse {
            found: surql_lexer::truncate_for_error(&found).to_string(),
            expected,
        }
    }

    pub fn literal(kind: LiteralKind, literal: impl Into<String>) -> Self {
        let literal = literal.into();
        ParseError::Literal {
            kind,
            literal: surql_lexer::truncate_for_error(&literal).to_string(),
        }
    }
}
