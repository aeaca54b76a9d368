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

//! AST, statement/expression parser, pretty-printer, and binary codec for
//! the SurQL query language. Scanning is `surql-lexer`'s job; this crate
//! turns that token stream into a tree, back into canonical text, and
//! into/out of the wire format.

mod ast;
mod codec;
mod error;
mod options;
mod parser;
mod pretty;
mod value;

pub use ast::*;
pub use codec::{decode, encode, CodecError};
pub use error::{LiteralKind, ParseError, Result};
pub use options::{AuthLevel, Possible, Selected, Session, SessionConfig};
pub use parser::{parse, Parser};
pub use pretty::print_expr;
