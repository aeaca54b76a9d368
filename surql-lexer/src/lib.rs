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

//! Token set and scanner for the SurQL query language. This crate has no
//! runtime dependencies: it turns source text into a stream of [`Lexeme`]s
//! and nothing else. Turning that stream into an AST is `surql-parser`'s
//! job.

mod datetime;
mod duration;
mod lexer;
mod token;

pub use duration::parse_duration_nanos;
pub use lexer::{truncate_for_error, LexError, Lexeme, Lexer, MAX_ERROR_LITERAL};
pub use token::Token;
