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

//! Statement and expression parsing. A [`Parser`] wraps the scanner with a
//! single token of pushback, a write-capability flag reset before every
//! top-level statement, and a transaction flag that rejects `DEFINE`/
//! `REMOVE` while a `BEGIN … COMMIT` block is open.

use surql_lexer::{LexError, Lexer, Token};

use crate::ast::*;
use crate::error::{ParseError, Result};
use crate::options::{AuthLevel, Session};
use crate::value;

/// Function registry entry: accepted argument counts (`None` = variadic)
/// and whether the call is an aggregate, permitted in a `GROUP BY` field
/// list without appearing in the grouping key.
struct FnSpec {
    name: &'static str,
    arities: &'static [i32],
    aggregate: bool,
}

const FUNCTIONS: &[FnSpec] = &[
    FnSpec { name: "count", arities: &[0, 1], aggregate: true },
    FnSpec { name: "math::mean", arities: &[1], aggregate: true },
    FnSpec { name: "math::sum", arities: &[1], aggregate: true },
    FnSpec { name: "math::min", arities: &[1], aggregate: true },
    FnSpec { name: "math::max", arities: &[1], aggregate: true },
    FnSpec { name: "array::len", arities: &[1], aggregate: false },
    FnSpec { name: "string::len", arities: &[1], aggregate: false },
    FnSpec { name: "string::lowercase", arities: &[1], aggregate: false },
    FnSpec { name: "string::uppercase", arities: &[1], aggregate: false },
    FnSpec { name: "time::now", arities: &[0], aggregate: false },
    FnSpec { name: "type::string", arities: &[1], aggregate: false },
    FnSpec { name: "type::bool", arities: &[1], aggregate: false },
    FnSpec { name: "is::number", arities: &[1], aggregate: false },
    FnSpec { name: "rand", arities: &[0], aggregate: false },
];

fn lookup_fn(name: &str) -> Option<&'static FnSpec> {
    FUNCTIONS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

fn describe_arities(arities: &[i32]) -> String {
    let parts: Vec<String> = arities
        .iter()
        .map(|n| match n {
            0 => "0 arguments".to_string(),
            1 => "1 argument".to_string(),
            n => format!("{n} arguments"),
        })
        .collect();
    parts.join(" or ")
}

/// Whether termination of an expression should also stop at `,`/`)` — set
/// while reading a function's argument list, per the expression parser's
/// explicit termination rule.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Stop {
    Normal,
    Arglist,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pending: Option<(Token, &'a str)>,
    /// Set once a subquery statement mutates the database; carried across
    /// the whole parse, not reset per statement (only before a *new*
    /// top-level statement).
    rw: bool,
    /// True between an open `BEGIN` and its matching `CANCEL`/`COMMIT`.
    txn: bool,
}

/// Parses `source` against `session`, returning the statement sequence or
/// the first fatal [`ParseError`] encountered.
pub fn parse(source: &str, session: &mut Session) -> Result<Query> {
    Parser::new(source).parse_query(session)
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser { lexer: Lexer::new(source), pending: None, rw: false, txn: false }
    }

    /// Whether any statement in the parse so far has mutated the database
    /// (directly or through a subquery) — carried across the whole parse.
    pub fn is_read_write(&self) -> bool {
        self.rw
    }

    fn advance(&mut self) -> Result<(Token, &'a str)> {
        if let Some(tok) = self.pending.take() {
            return Ok(tok);
        }
        loop {
            match self.lexer.next() {
                None => return Ok((Token::Eof, "")),
                Some(Err(err)) => return Err(lex_err_to_parse_err(err)),
                Some(Ok(lexeme)) if lexeme.token == Token::Ws => continue,
                Some(Ok(lexeme)) => return Ok((lexeme.token, lexeme.literal)),
            }
        }
    }

    fn push_back(&mut self, tok: Token, literal: &'a str) {
        debug_assert!(self.pending.is_none(), "at most one token of pushback");
        self.pending = Some((tok, literal));
    }

    fn peek(&mut self) -> Result<(Token, &'a str)> {
        let tok = self.advance()?;
        self.push_back(tok.0, tok.1);
        Ok(tok)
    }

    fn expect(&mut self, expected: Token) -> Result<&'a str> {
        let (tok, lit) = self.advance()?;
        if tok == expected {
            Ok(lit)
        } else {
            Err(ParseError::parse(tok.to_string(), vec![expected.to_string()]))
        }
    }

    fn eat(&mut self, candidate: Token) -> Result<bool> {
        let (tok, lit) = self.advance()?;
        if tok == candidate {
            Ok(true)
        } else {
            self.push_back(tok, lit);
            Ok(false)
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        let (tok, lit) = self.advance()?;
        match tok {
            Token::Ident | Token::Expr => Ok(value::unquote_ident(lit)),
            other => Err(ParseError::parse(other.to_string(), vec!["identifier".to_string()])),
        }
    }

    fn end_of_statement(&mut self, subquery: bool) -> Result<()> {
        let (tok, lit) = self.advance()?;
        let ok = if subquery {
            tok == Token::RParen
        } else {
            tok == Token::Eof || tok == Token::Semicolon
        };
        if ok {
            Ok(())
        } else {
            let expected = if subquery { ")" } else { "; or EOF" };
            Err(ParseError::parse(lit, vec![expected.to_string()]))
        }
    }

    // ---- top level ---------------------------------------------------

    pub fn parse_query(&mut self, session: &mut Session) -> Result<Query> {
        let (first, first_lit) = self.peek()?;
        if first == Token::Eof {
            return Err(ParseError::Empty);
        }
        let _ = first_lit;

        let mut statements = Vec::new();
        loop {
            let (tok, lit) = self.peek()?;
            if tok == Token::Eof {
                break;
            }
            self.rw = false;
            let stmt = self.parse_statement(session, false)?;
            statements.push(stmt);
            let _ = lit;
            if !self.eat(Token::Semicolon)? {
                break;
            }
        }
        self.expect(Token::Eof)?;
        Ok(Query { statements })
    }

    /// Parses one statement. `subquery` selects the terminator
    /// (`)` instead of `;`/EOF) used when this is invoked from inside a
    /// parenthesised expression.
    fn parse_statement(&mut self, session: &mut Session, subquery: bool) -> Result<Statement> {
        let (tok, lit) = self.advance()?;
        let stmt = match tok {
            Token::Begin => {
                self.eat(Token::Transaction)?;
                self.txn = true;
                Statement::Begin
            }
            Token::Cancel => {
                self.eat(Token::Transaction)?;
                self.txn = false;
                Statement::Cancel
            }
            Token::Commit => {
                self.eat(Token::Transaction)?;
                self.txn = false;
                Statement::Commit
            }
            Token::Use => self.parse_use(session)?,
            Token::Let => self.parse_let(session)?,
            Token::Return => Statement::Return(self.parse_expr(session, Stop::Normal)?),
            Token::If => Statement::If(self.parse_ifel(session)?),
            Token::Info => self.parse_info(session)?,
            Token::Select => Statement::Select(self.parse_select(session)?),
            Token::Create => {
                self.rw = true;
                Statement::Create(self.parse_create(session)?)
            }
            Token::Update => {
                self.rw = true;
                Statement::Update(self.parse_update(session)?)
            }
            Token::Delete => {
                self.rw = true;
                Statement::Delete(self.parse_delete(session)?)
            }
            Token::Relate => {
                self.rw = true;
                Statement::Relate(self.parse_relate(session)?)
            }
            Token::Insert | Token::Upsert => {
                self.rw = true;
                Statement::Insert(self.parse_insert(session, tok == Token::Upsert)?)
            }
            Token::Live => Statement::Live(self.parse_live(session)?),
            Token::Kill => {
                session.get(AuthLevel::Sc)?;
                Statement::Kill(self.parse_expr(session, Stop::Normal)?)
            }
            Token::Define => {
                self.reject_in_txn()?;
                Statement::Define(self.parse_define(session)?)
            }
            Token::Remove => {
                self.reject_in_txn()?;
                Statement::Remove(self.parse_remove(session)?)
            }
            other => return Err(ParseError::parse(other.to_string(), vec!["a statement".to_string()])),
        };
        let _ = (lit, subquery);
        Ok(stmt)
    }

    fn reject_in_txn(&self) -> Result<()> {
        if self.txn {
            Err(ParseError::Tx)
        } else {
            Ok(())
        }
    }

    // ---- USE / LET / IF / INFO ----------------------------------------

    fn parse_use(&mut self, session: &mut Session) -> Result<Statement> {
        // `USE` is what performs namespace/database selection, so unlike
        // every other statement it must not require one to already be
        // selected: gate on privilege level alone, not `Session::get`.
        if session.kind > AuthLevel::Sc {
            return Err(ParseError::Query);
        }
        let mut ns = None;
        let mut db = None;
        loop {
            let (tok, _) = self.advance()?;
            match tok {
                Token::Namespace | Token::Ns => {
                    let name = self.expect_ident()?;
                    session.use_ns(&name)?;
                    ns = Some(name);
                }
                Token::Database | Token::Db => {
                    let name = self.expect_ident()?;
                    session.use_db(&name)?;
                    db = Some(name);
                }
                other => return Err(ParseError::parse(other.to_string(), vec!["NAMESPACE".into(), "DATABASE".into()])),
            }
            let (next, lit) = self.advance()?;
            match next {
                Token::Namespace | Token::Ns | Token::Database | Token::Db => self.push_back(next, lit),
                _ => {
                    self.push_back(next, lit);
                    break;
                }
            }
        }
        Ok(Statement::Use { ns, db })
    }

    fn parse_let(&mut self, session: &mut Session) -> Result<Statement> {
        session.get(AuthLevel::Db)?;
        let (tok, lit) = self.advance()?;
        let name = match tok {
            Token::Param => lit.trim_start_matches('$').to_string(),
            other => return Err(ParseError::parse(other.to_string(), vec!["parameter".to_string()])),
        };
        self.expect(Token::Eq)?;
        let value = self.parse_expr(session, Stop::Normal)?;
        Ok(Statement::Let { name, value })
    }

    fn parse_ifel(&mut self, session: &mut Session) -> Result<Expression> {
        let mut branches = Vec::new();
        let cond = self.parse_expr(session, Stop::Normal)?;
        self.expect(Token::Then)?;
        let then = self.parse_expr(session, Stop::Normal)?;
        branches.push((cond, then));
        let mut else_ = None;
        loop {
            if self.eat(Token::Else)? {
                if self.eat(Token::If)? {
                    let cond = self.parse_expr(session, Stop::Normal)?;
                    self.expect(Token::Then)?;
                    let then = self.parse_expr(session, Stop::Normal)?;
                    branches.push((cond, then));
                    continue;
                }
                let e = self.parse_expr(session, Stop::Normal)?;
                else_ = Some(Box::new(e));
            }
            break;
        }
        self.expect(Token::End)?;
        Ok(Expression::Ifel { branches, else_ })
    }

    fn parse_info(&mut self, session: &mut Session) -> Result<Statement> {
        self.expect(Token::For)?;
        let (tok, _) = self.advance()?;
        let target = match tok {
            Token::Kill if false => unreachable!(),
            Token::Namespace | Token::Ns => {
                session.get(AuthLevel::Kv)?;
                InfoTarget::Ns
            }
            Token::Database | Token::Db => {
                session.get(AuthLevel::Ns)?;
                InfoTarget::Db
            }
            Token::Scope => {
                session.get(AuthLevel::Db)?;
                InfoTarget::Scope(self.expect_ident()?)
            }
            Token::TableKw => {
                session.get(AuthLevel::Db)?;
                InfoTarget::Table(self.expect_ident()?)
            }
            other => {
                if other.to_string().eq_ignore_ascii_case("kv") {
                    session.get(AuthLevel::Kv)?;
                    InfoTarget::Kv
                } else {
                    return Err(ParseError::parse(
                        other.to_string(),
                        vec!["NS".into(), "DB".into(), "SCOPE".into(), "TABLE".into()],
                    ));
                }
            }
        };
        Ok(Statement::Info(target))
    }

    // ---- idiom / what lists -------------------------------------------

    fn parse_what_list(&mut self, session: &mut Session) -> Result<Vec<Expression>> {
        let mut out = vec![self.parse_expr(session, Stop::Normal)?];
        while self.eat(Token::Comma)? {
            out.push(self.parse_expr(session, Stop::Normal)?);
        }
        Ok(out)
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>> {
        let mut out = vec![self.expect_ident()?];
        while self.eat(Token::Comma)? {
            out.push(self.expect_ident()?);
        }
        Ok(out)
    }

    // ---- data clause ----------------------------------------------------

    fn parse_data(&mut self, session: &mut Session) -> Result<Data> {
        let (tok, _) = self.advance()?;
        match tok {
            Token::Set => {
                let mut items = Vec::new();
                loop {
                    let lhs = self.parse_expr(session, Stop::Arglist)?;
                    let (op_tok, op_lit) = self.advance()?;
                    let op = match op_tok {
                        Token::Eq => BinaryOp::Eq,
                        Token::Add if self.eat(Token::Eq)? => BinaryOp::Add,
                        other => return Err(ParseError::parse(other.to_string(), vec!["=".to_string()])),
                    };
                    let _ = op_lit;
                    let rhs = self.parse_expr(session, Stop::Arglist)?;
                    items.push((lhs, op, rhs));
                    if !self.eat(Token::Comma)? {
                        break;
                    }
                }
                Ok(Data::Set(items))
            }
            Token::Content => Ok(Data::Content(self.parse_expr(session, Stop::Normal)?)),
            Token::Merge => Ok(Data::Merge(self.parse_expr(session, Stop::Normal)?)),
            Token::Diff => Ok(Data::Diff(self.parse_expr(session, Stop::Normal)?)),
            other => Err(ParseError::parse(other.to_string(), vec!["SET".into(), "CONTENT".into(), "MERGE".into(), "DIFF".into()])),
        }
    }

    fn parse_echo(&mut self) -> Result<Echo> {
        if !self.eat(Token::Return)? {
            return Ok(Echo::default());
        }
        self.parse_echo_keyword()
    }

    fn parse_echo_keyword(&mut self) -> Result<Echo> {
        let (tok, _) = self.advance()?;
        Ok(match tok {
            Token::None_ => Echo::None,
            Token::Before => Echo::Before,
            Token::After => Echo::After,
            Token::Diff => Echo::Diff,
            Token::Both => Echo::Both,
            Token::Id => Echo::Id,
            Token::Info => Echo::Info,
            other => {
                return Err(ParseError::parse(
                    other.to_string(),
                    vec!["NONE".into(), "BEFORE".into(), "AFTER".into(), "DIFF".into(), "BOTH".into(), "ID".into(), "INFO".into()],
                ));
            }
        })
    }

    fn parse_meta(&mut self) -> Result<Meta> {
        let mut meta = Meta::default();
        loop {
            if self.eat(Token::Timeout)? {
                let (tok, lit) = self.advance()?;
                if tok != Token::Duration {
                    return Err(ParseError::parse(tok.to_string(), vec!["duration".to_string()]));
                }
                meta.timeout = Some(value::declare(tok, lit).and_then(|e| match e {
                    Expression::Literal(Literal::Duration(n)) => Ok(n),
                    _ => unreachable!(),
                })?);
                continue;
            }
            if self.eat(Token::Parallel)? {
                meta.parallel = true;
                continue;
            }
            break;
        }
        Ok(meta)
    }

    // ---- SELECT --------------------------------------------------------

    fn parse_select(&mut self, session: &mut Session) -> Result<SelectStatement> {
        session.get(AuthLevel::Db)?;
        let expr = self.parse_field_list(session)?;
        self.expect(Token::From)?;
        let what = self.parse_what_list(session)?;

        let cond = if self.eat(Token::Where)? { Some(self.parse_expr(session, Stop::Normal)?) } else { None };

        let mut split = Vec::new();
        if self.eat(Token::Split)? {
            self.eat(Token::On)?;
            split = self.parse_what_list(session)?;
        }

        let mut group_all = false;
        let mut group = Vec::new();
        if self.eat(Token::Group)? {
            self.eat(Token::By)?;
            if self.eat(Token::All)? {
                group_all = true;
            } else {
                group = self.parse_what_list(session)?;
            }
        }

        let mut order = Vec::new();
        if self.eat(Token::Order)? {
            self.eat(Token::By)?;
            loop {
                let expr = self.parse_expr(session, Stop::Normal)?;
                let collate = if self.eat(Token::Collate)? { Some(self.expect_ident()?) } else { None };
                let numeric = self.eat(Token::Numeric)?;
                let descending = if self.eat(Token::Desc)? {
                    true
                } else {
                    self.eat(Token::Asc)?;
                    false
                };
                order.push(OrderItem { expr, collate, numeric, descending });
                if !self.eat(Token::Comma)? {
                    break;
                }
            }
        }

        let mut limit = None;
        if self.eat(Token::Limit)? {
            self.eat(Token::By)?;
            limit = Some(self.parse_expr(session, Stop::Normal)?);
        }
        let mut start = None;
        if self.eat(Token::Start)? {
            self.eat(Token::At)?;
            start = Some(self.parse_expr(session, Stop::Normal)?);
        }
        let mut fetch = Vec::new();
        if self.eat(Token::Fetch)? {
            fetch = self.parse_ident_list()?;
        }
        let mut version = None;
        if self.eat(Token::Version)? || self.eat(Token::On)? {
            version = Some(self.parse_expr(session, Stop::Normal)?);
        }
        let meta = self.parse_meta()?;

        let stmt = SelectStatement { expr, what, cond, split, group_all, group, order, limit, start, fetch, version, meta };
        check_aggregation(&stmt)?;
        Ok(stmt)
    }

    fn parse_field_list(&mut self, session: &mut Session) -> Result<Vec<Field>> {
        let (first, first_lit) = self.peek()?;
        if matches!(first, Token::From | Token::Eof | Token::Semicolon) {
            return Err(ParseError::parse(first_lit, vec!["field name".to_string()]));
        }
        let mut out = Vec::new();
        loop {
            let expr = self.parse_expr(session, Stop::Arglist)?;
            // No explicit aliasing syntax in this grammar: the field's
            // display name is derived (source identifier/param, else the
            // pretty-printed expression) by the caller, not stored here.
            out.push(Field { expr, alias: None });
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        Ok(out)
    }

    // ---- CREATE / UPDATE / DELETE --------------------------------------

    fn parse_create(&mut self, session: &mut Session) -> Result<CreateStatement> {
        session.get(AuthLevel::Db)?;
        self.eat(Token::Into)?;
        let what = self.parse_what_list(session)?;
        let data = if matches!(self.peek()?.0, Token::Set | Token::Content | Token::Merge | Token::Diff) {
            Some(self.parse_data(session)?)
        } else {
            None
        };
        let echo = self.parse_echo()?;
        let meta = self.parse_meta()?;
        Ok(CreateStatement { what, data, echo, meta })
    }

    fn parse_update(&mut self, session: &mut Session) -> Result<UpdateStatement> {
        session.get(AuthLevel::Db)?;
        self.eat(Token::Into)?;
        let what = self.parse_what_list(session)?;
        let data = if matches!(self.peek()?.0, Token::Set | Token::Content | Token::Merge | Token::Diff) {
            Some(self.parse_data(session)?)
        } else {
            None
        };
        let cond = if self.eat(Token::Where)? { Some(self.parse_expr(session, Stop::Normal)?) } else { None };
        let echo = self.parse_echo()?;
        let meta = self.parse_meta()?;
        Ok(UpdateStatement { what, data, cond, echo, meta })
    }

    fn parse_delete(&mut self, session: &mut Session) -> Result<DeleteStatement> {
        session.get(AuthLevel::Db)?;
        let hard = if self.eat(Token::And)? {
            self.expect(Token::Expunge)?;
            true
        } else {
            false
        };
        self.eat(Token::From)?;
        let what = self.parse_what_list(session)?;
        let cond = if self.eat(Token::Where)? { Some(self.parse_expr(session, Stop::Normal)?) } else { None };
        // DELETE's default echo is `NONE`, unlike every other write statement.
        let echo = if self.eat(Token::Return)? { self.parse_echo_keyword()? } else { Echo::None };
        let meta = self.parse_meta()?;
        Ok(DeleteStatement { hard, what, cond, echo, meta })
    }

    fn parse_relate(&mut self, session: &mut Session) -> Result<RelateStatement> {
        session.get(AuthLevel::Db)?;
        // Each operand is a bare primary, not a full expression: a trailing
        // `->`/`<-` belongs to the edge direction, not to path continuation
        // on the operand, so `parse_primary_no_path` is used instead of
        // `parse_expr` here.
        let from = self.parse_primary_no_path(session)?;
        let (join, _) = self.advance()?;
        let reversed = match join {
            Token::Arrow => false,
            Token::ArrowBack => true,
            other => return Err(ParseError::parse(other.to_string(), vec!["->".into(), "<-".into()])),
        };
        let kind = self.parse_primary_no_path(session)?;
        let (join2, _) = self.advance()?;
        match (reversed, join2) {
            (false, Token::Arrow) | (true, Token::ArrowBack) => {}
            _ => return Err(ParseError::parse(join2.to_string(), vec!["matching edge direction".to_string()])),
        }
        let with = self.parse_primary_no_path(session)?;
        let unique = self.eat(Token::Unique)?;
        let data = if matches!(self.peek()?.0, Token::Set | Token::Content | Token::Merge | Token::Diff) {
            Some(self.parse_data(session)?)
        } else {
            None
        };
        let echo = self.parse_echo()?;
        let meta = self.parse_meta()?;
        Ok(RelateStatement { from, kind, with, reversed, unique, data, echo, meta })
    }

    fn parse_insert(&mut self, session: &mut Session, upsert: bool) -> Result<InsertStatement> {
        session.get(AuthLevel::Db)?;
        let data = self.parse_data(session)?;
        self.expect(Token::Into)?;
        let into = self.parse_expr(session, Stop::Normal)?;
        let echo = self.parse_echo()?;
        let meta = self.parse_meta()?;
        Ok(InsertStatement { upsert, into, data, echo, meta })
    }

    fn parse_live(&mut self, session: &mut Session) -> Result<LiveStatement> {
        session.get(AuthLevel::Sc)?;
        self.expect(Token::Select)?;
        let diff = self.eat(Token::Diff)?;
        let expr = if diff { Vec::new() } else { self.parse_field_list(session)? };
        self.expect(Token::From)?;
        let what = self.parse_expr(session, Stop::Normal)?;
        let cond = if self.eat(Token::Where)? { Some(self.parse_expr(session, Stop::Normal)?) } else { None };
        let fetch = if self.eat(Token::Fetch)? { self.parse_ident_list()? } else { Vec::new() };
        Ok(LiveStatement { diff, expr, what, cond, fetch })
    }

    // ---- DEFINE / REMOVE ------------------------------------------------

    fn parse_define(&mut self, session: &mut Session) -> Result<DefineStatement> {
        let (tok, _) = self.advance()?;
        Ok(match tok {
            Token::Namespace => {
                session.get(AuthLevel::Kv)?;
                DefineStatement::Namespace(self.expect_ident()?)
            }
            Token::Database => {
                session.get(AuthLevel::Ns)?;
                DefineStatement::Database(self.expect_ident()?)
            }
            Token::Login => {
                session.get(AuthLevel::Ns)?;
                let name = self.expect_ident()?;
                let on_scope = self.parse_on_scope()?;
                let mut password = None;
                let mut hash = None;
                loop {
                    if self.eat(Token::Password)? {
                        password = Some(self.expect_string_like()?);
                        continue;
                    }
                    if self.eat(Token::Passhash)? {
                        hash = Some(self.expect_string_like()?);
                        continue;
                    }
                    break;
                }
                DefineStatement::Login(DefineLoginStatement { name, on_scope, password, hash })
            }
            Token::Token => {
                session.get(AuthLevel::Ns)?;
                let name = self.expect_ident()?;
                let on_scope = self.parse_on_scope()?;
                self.expect(Token::Type)?;
                let kind = self.expect_ident()?;
                self.expect(Token::Value)?;
                let value = self.expect_string_like()?;
                DefineStatement::Token(DefineTokenStatement { name, on_scope, kind, value })
            }
            Token::Scope => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                let mut session_dur = None;
                let mut signup = None;
                let mut signin = None;
                loop {
                    if self.eat(Token::Session)? {
                        let (t, l) = self.advance()?;
                        session_dur = Some(
                            value::declare(t, l).and_then(|e| match e {
                                Expression::Literal(Literal::Duration(n)) => Ok(n),
                                _ => Err(ParseError::parse(l, vec!["duration".to_string()])),
                            })?,
                        );
                        continue;
                    }
                    if self.eat(Token::Signup)? {
                        signup = Some(self.parse_expr(session, Stop::Normal)?);
                        continue;
                    }
                    if self.eat(Token::Signin)? {
                        signin = Some(self.parse_expr(session, Stop::Normal)?);
                        continue;
                    }
                    break;
                }
                DefineStatement::Scope(DefineScopeStatement { name, session: session_dur, signup, signin })
            }
            Token::TableKw => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                let mut schemaless = true;
                if self.eat(Token::Type)? {
                    schemaless = !self.eat(Token::Full)?;
                }
                let perms = self.parse_optional_perms(session)?;
                DefineStatement::Table(DefineTableStatement { name, schemaless, perms })
            }
            Token::Event => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                self.expect(Token::On)?;
                self.eat(Token::TableKw)?;
                let table = self.expect_ident()?;
                self.expect(Token::When)?;
                let when = self.parse_expr(session, Stop::Normal)?;
                self.expect(Token::Then)?;
                let mut then = vec![self.parse_expr(session, Stop::Arglist)?];
                while self.eat(Token::Comma)? {
                    then.push(self.parse_expr(session, Stop::Arglist)?);
                }
                DefineStatement::Event(DefineEventStatement { name, table, when, then })
            }
            Token::Field => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                self.expect(Token::On)?;
                self.eat(Token::TableKw)?;
                let table = self.expect_ident()?;
                let mut out = DefineFieldStatement {
                    name,
                    table,
                    kind: None,
                    min: None,
                    max: None,
                    enum_values: None,
                    code: None,
                    regex_match: None,
                    default: None,
                    readonly: false,
                    mandatory: false,
                    notnull: false,
                    validate: None,
                    perms: None,
                };
                loop {
                    if self.eat(Token::Type)? {
                        out.kind = Some(self.expect_ident()?);
                        continue;
                    }
                    if self.eat(Token::Min)? {
                        out.min = Some(self.parse_expr(session, Stop::Arglist)?);
                        continue;
                    }
                    if self.eat(Token::Max)? {
                        out.max = Some(self.parse_expr(session, Stop::Arglist)?);
                        continue;
                    }
                    if self.eat(Token::Enum)? {
                        out.enum_values = Some(self.parse_expr(session, Stop::Arglist)?);
                        continue;
                    }
                    if self.eat(Token::Code)? {
                        out.code = Some(self.parse_expr(session, Stop::Arglist)?);
                        continue;
                    }
                    if self.eat(Token::Match)? {
                        out.regex_match = Some(self.parse_expr(session, Stop::Arglist)?);
                        continue;
                    }
                    if self.eat(Token::Default)? {
                        out.default = Some(self.parse_expr(session, Stop::Normal)?);
                        continue;
                    }
                    if self.eat(Token::Readonly)? {
                        out.readonly = true;
                        continue;
                    }
                    if self.eat(Token::Mandatory)? {
                        out.mandatory = true;
                        continue;
                    }
                    if self.eat(Token::Notnull)? {
                        out.notnull = true;
                        continue;
                    }
                    if self.eat(Token::Validate)? {
                        out.validate = Some(self.parse_expr(session, Stop::Normal)?);
                        continue;
                    }
                    if matches!(self.peek()?.0, Token::Permissions) {
                        out.perms = Some(self.parse_perms(session)?);
                        continue;
                    }
                    break;
                }
                DefineStatement::Field(out)
            }
            Token::Index => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                self.expect(Token::On)?;
                self.eat(Token::TableKw)?;
                let what = self.parse_what_list(session)?;
                self.expect(Token::Columns)?;
                let cols = self.parse_ident_list()?;
                let unique = self.eat(Token::Unique)?;
                DefineStatement::Index(DefineIndexStatement { name, what, cols, unique })
            }
            other => {
                return Err(ParseError::parse(
                    other.to_string(),
                    vec![
                        "NAMESPACE".into(), "DATABASE".into(), "LOGIN".into(), "TOKEN".into(), "SCOPE".into(),
                        "TABLE".into(), "EVENT".into(), "FIELD".into(), "INDEX".into(),
                    ],
                ));
            }
        })
    }

    fn parse_remove(&mut self, session: &mut Session) -> Result<RemoveStatement> {
        let (tok, _) = self.advance()?;
        Ok(match tok {
            Token::Namespace => {
                session.get(AuthLevel::Kv)?;
                RemoveStatement::Namespace(self.expect_ident()?)
            }
            Token::Database => {
                session.get(AuthLevel::Ns)?;
                RemoveStatement::Database(self.expect_ident()?)
            }
            Token::Login => {
                session.get(AuthLevel::Ns)?;
                let name = self.expect_ident()?;
                self.parse_on_scope()?;
                RemoveStatement::Login(name)
            }
            Token::Token => {
                session.get(AuthLevel::Ns)?;
                let name = self.expect_ident()?;
                self.parse_on_scope()?;
                RemoveStatement::Token(name)
            }
            Token::Scope => {
                session.get(AuthLevel::Db)?;
                RemoveStatement::Scope(self.expect_ident()?)
            }
            Token::TableKw => {
                session.get(AuthLevel::Db)?;
                RemoveStatement::Table(self.expect_ident()?)
            }
            Token::Event => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                self.expect(Token::On)?;
                self.eat(Token::TableKw)?;
                RemoveStatement::Event { name, table: self.expect_ident()? }
            }
            Token::Field => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                self.expect(Token::On)?;
                self.eat(Token::TableKw)?;
                RemoveStatement::Field { name, table: self.expect_ident()? }
            }
            Token::Index => {
                session.get(AuthLevel::Db)?;
                let name = self.expect_ident()?;
                self.expect(Token::On)?;
                self.eat(Token::TableKw)?;
                RemoveStatement::Index { name, table: self.expect_ident()? }
            }
            other => {
                return Err(ParseError::parse(
                    other.to_string(),
                    vec![
                        "NAMESPACE".into(), "DATABASE".into(), "LOGIN".into(), "TOKEN".into(), "SCOPE".into(),
                        "TABLE".into(), "EVENT".into(), "FIELD".into(), "INDEX".into(),
                    ],
                ));
            }
        })
    }

    fn parse_on_scope(&mut self) -> Result<Option<String>> {
        if self.eat(Token::On)? {
            self.eat(Token::Scope)?;
            Ok(Some(self.expect_ident()?))
        } else {
            Ok(None)
        }
    }

    fn expect_string_like(&mut self) -> Result<String> {
        let (tok, lit) = self.advance()?;
        match tok {
            Token::String | Token::Region => Ok(value::unquote_ident(lit)),
            Token::Ident | Token::Expr => Ok(value::unquote_ident(lit)),
            other => Err(ParseError::parse(other.to_string(), vec!["string".to_string()])),
        }
    }

    fn parse_optional_perms(&mut self, session: &mut Session) -> Result<Option<Perms>> {
        if matches!(self.peek()?.0, Token::Permissions) {
            Ok(Some(self.parse_perms(session)?))
        } else {
            Ok(None)
        }
    }

    fn parse_perms(&mut self, session: &mut Session) -> Result<Perms> {
        self.expect(Token::Permissions)?;
        if self.eat(Token::For)? {
            let mut perms = Perms::uniform(PermRule::None);
            loop {
                let mut verbs = vec![self.parse_perm_verb()?];
                while self.eat(Token::Comma)? {
                    verbs.push(self.parse_perm_verb()?);
                }
                let rule = self.parse_perm_rule(session)?;
                for verb in verbs {
                    match verb {
                        PermVerb::Select => perms.select = rule.clone(),
                        PermVerb::Create => perms.create = rule.clone(),
                        PermVerb::Update => perms.update = rule.clone(),
                        PermVerb::Delete => perms.delete = rule.clone(),
                    }
                }
                if !self.eat(Token::For)? {
                    break;
                }
            }
            Ok(perms)
        } else {
            let rule = self.parse_perm_rule(session)?;
            Ok(Perms::uniform(rule))
        }
    }

    fn parse_perm_verb(&mut self) -> Result<PermVerb> {
        let (tok, _) = self.advance()?;
        Ok(match tok {
            Token::Select => PermVerb::Select,
            Token::Create => PermVerb::Create,
            Token::Update => PermVerb::Update,
            Token::Delete => PermVerb::Delete,
            other => {
                return Err(ParseError::parse(
                    other.to_string(),
                    vec!["SELECT".into(), "CREATE".into(), "UPDATE".into(), "DELETE".into()],
                ));
            }
        })
    }

    fn parse_perm_rule(&mut self, session: &mut Session) -> Result<PermRule> {
        let (tok, _) = self.advance()?;
        Ok(match tok {
            Token::Full => PermRule::Full,
            Token::None_ => PermRule::None,
            Token::Where => PermRule::Where(self.parse_expr(session, Stop::Normal)?),
            other => {
                return Err(ParseError::parse(other.to_string(), vec!["FULL".into(), "NONE".into(), "WHERE".into()]));
            }
        })
    }

    // ---- expression parser ----------------------------------------------

    fn parse_expr(&mut self, session: &mut Session, stop: Stop) -> Result<Expression> {
        let lhs = self.parse_unary(session, stop)?;
        self.parse_binary_rhs(session, lhs, 0, stop)
    }

    /// A signed numeric literal (`+12`, `-3.4`) is split into `Add`/`Sub` +
    /// the unsigned literal, per the expression parser's explicit rule.
    fn parse_unary(&mut self, session: &mut Session, stop: Stop) -> Result<Expression> {
        let (tok, lit) = self.advance()?;
        match tok {
            Token::Add | Token::Sub if is_numeric_literal_start(self.peek()?.0) => {
                let (num_tok, num_lit) = self.advance()?;
                let inner = value::declare(num_tok, num_lit)?;
                let op = if tok == Token::Add { BinaryOp::Add } else { BinaryOp::Sub };
                let unsigned = Expression::Unary { op, rhs: Box::new(inner) };
                self.parse_path_continuation(session, unsigned, stop)
            }
            Token::Arrow | Token::ArrowBack | Token::ArrowBoth => {
                self.push_back(tok, lit);
                self.parse_path(session, stop)
            }
            _ => {
                self.push_back(tok, lit);
                self.parse_primary(session, stop)
            }
        }
    }

    fn parse_primary(&mut self, session: &mut Session, stop: Stop) -> Result<Expression> {
        let (tok, lit) = self.advance()?;
        let expr = match tok {
            Token::LParen => {
                let inner = self.parse_subq(session)?;
                self.expect(Token::RParen)?;
                inner
            }
            Token::If => self.parse_ifel(session)?,
            Token::Ident if self.eat(Token::LParen)? => self.parse_call(session, lit)?,
            _ => value::declare(tok, lit)?,
        };
        self.parse_path_continuation(session, expr, stop)
    }

    fn parse_subq(&mut self, session: &mut Session) -> Result<Expression> {
        let (tok, lit) = self.peek()?;
        let is_statement_kw = matches!(
            tok,
            Token::Select
                | Token::Create
                | Token::Update
                | Token::Delete
                | Token::Relate
                | Token::Insert
                | Token::Upsert
                | Token::Define
                | Token::Remove
                | Token::Use
                | Token::Let
        );
        if is_statement_kw {
            self.rw = self.rw
                || matches!(
                    tok,
                    Token::Create | Token::Update | Token::Delete | Token::Relate | Token::Insert | Token::Upsert | Token::Define | Token::Remove
                );
            let stmt = self.parse_statement(session, true)?;
            Ok(Expression::Subquery(Box::new(stmt)))
        } else {
            let _ = lit;
            self.parse_expr(session, Stop::Normal)
        }
    }

    fn parse_call(&mut self, session: &mut Session, name: &'a str) -> Result<Expression> {
        let mut args = Vec::new();
        if !self.eat(Token::RParen)? {
            loop {
                args.push(self.parse_expr(session, Stop::Arglist)?);
                if !self.eat(Token::Comma)? {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }
        let spec = lookup_fn(name).ok_or_else(|| {
            ParseError::parse(format!("{name}()"), vec!["a known function".to_string()])
        })?;
        if !spec.arities.contains(&-1) && !spec.arities.contains(&(args.len() as i32)) {
            return Err(ParseError::parse(
                format!("{name}({}) with {} arguments", args.iter().map(|_| "_").collect::<Vec<_>>().join(", "), args.len()),
                vec![describe_arities(spec.arities)],
            ));
        }
        Ok(Expression::Func { name: name.to_string(), args, aggregate: spec.aggregate })
    }

    fn parse_path_continuation(&mut self, session: &mut Session, first: Expression, stop: Stop) -> Result<Expression> {
        let (tok, lit) = self.peek()?;
        if !matches!(tok, Token::Dot | Token::Arrow | Token::ArrowBack | Token::ArrowBoth) {
            return Ok(first);
        }
        let _ = lit;
        let mut parts = vec![PathPart { join: None, expr: Box::new(first) }];
        loop {
            let (tok, _) = self.peek()?;
            let join = match tok {
                Token::Dot => Join::Dot,
                Token::Arrow => Join::Arrow,
                Token::ArrowBack => Join::ArrowBack,
                Token::ArrowBoth => Join::ArrowBoth,
                _ => break,
            };
            self.advance()?;
            let part = self.parse_primary_no_path(session)?;
            parts.push(PathPart { join: Some(join), expr: Box::new(part) });
        }
        Ok(Expression::Path(parts))
    }

    /// Reads one path segment's primary without recursing back into path
    /// continuation (that's handled by the caller's loop).
    fn parse_primary_no_path(&mut self, session: &mut Session) -> Result<Expression> {
        let (tok, lit) = self.advance()?;
        match tok {
            Token::LParen => {
                let inner = self.parse_subq(session)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident if self.eat(Token::LParen)? => self.parse_call(session, lit),
            _ => value::declare(tok, lit),
        }
    }

    fn parse_path(&mut self, session: &mut Session, stop: Stop) -> Result<Expression> {
        let (tok, _) = self.peek()?;
        let join = match tok {
            Token::Arrow => Join::Arrow,
            Token::ArrowBack => Join::ArrowBack,
            Token::ArrowBoth => Join::ArrowBoth,
            _ => unreachable!("caller only invokes parse_path on a join token"),
        };
        let _ = stop;
        self.advance()?;
        let part = self.parse_primary_no_path(session)?;
        let mut parts = vec![PathPart { join: Some(join), expr: Box::new(part) }];
        loop {
            let (tok, _) = self.peek()?;
            let join = match tok {
                Token::Dot => Join::Dot,
                Token::Arrow => Join::Arrow,
                Token::ArrowBack => Join::ArrowBack,
                Token::ArrowBoth => Join::ArrowBoth,
                _ => break,
            };
            self.advance()?;
            let part = self.parse_primary_no_path(session)?;
            parts.push(PathPart { join: Some(join), expr: Box::new(part) });
        }
        Ok(Expression::Path(parts))
    }

    /// Precedence-climbing loop: repeatedly reads an operator and builds up
    /// the tree while the operator's precedence exceeds `min_prec`. Equal
    /// precedence is left-associative (strictly-greater recursion bound).
    fn parse_binary_rhs(&mut self, session: &mut Session, mut lhs: Expression, min_prec: u8, stop: Stop) -> Result<Expression> {
        loop {
            let (tok, _) = self.peek()?;
            if stop == Stop::Arglist && matches!(tok, Token::RParen | Token::Comma) {
                return Ok(lhs);
            }
            let prec = binary_op_precedence(tok);
            if prec == 0 || prec <= min_prec {
                return Ok(lhs);
            }
            let op = self.consume_binary_op(tok)?;
            let rhs_first = self.parse_unary(session, stop)?;
            let rhs = self.parse_binary_rhs(session, rhs_first, prec, stop)?;
            lhs = Expression::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs) };
        }
    }

    /// Consumes the already-peeked operator token `tok` and resolves the
    /// contextual rewrites: `CONTAINS NOT` → `ContainsNot`, and
    /// `IS [NOT] [IN]` → `{Eq, Neq, Inside, NotInside}`.
    fn consume_binary_op(&mut self, tok: Token) -> Result<BinaryOp> {
        self.advance()?;
        Ok(match tok {
            Token::Add => BinaryOp::Add,
            Token::Sub => BinaryOp::Sub,
            Token::Mul => BinaryOp::Mul,
            Token::Div => BinaryOp::Div,
            Token::Eq => BinaryOp::Eq,
            Token::Neq => BinaryOp::Neq,
            Token::Exq => BinaryOp::Exq,
            Token::Nex => BinaryOp::Nex,
            Token::Lt => BinaryOp::Lt,
            Token::Lte => BinaryOp::Lte,
            Token::Gt => BinaryOp::Gt,
            Token::Gte => BinaryOp::Gte,
            Token::Fuzzy => BinaryOp::Fuzzy,
            Token::Inside => BinaryOp::Inside,
            Token::NotInside => BinaryOp::NotInside,
            Token::Contains => {
                if self.eat(Token::Not)? {
                    BinaryOp::ContainsNot
                } else {
                    BinaryOp::Contains
                }
            }
            Token::ContainsAll => BinaryOp::ContainsAll,
            Token::ContainsAny => BinaryOp::ContainsAny,
            Token::ContainsNone => BinaryOp::ContainsNone,
            Token::AllInside => BinaryOp::AllInside,
            Token::AnyInside => BinaryOp::AnyInside,
            Token::NoneInside => BinaryOp::NoneInside,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            Token::Is => {
                let not = self.eat(Token::Not)?;
                let inside = self.eat(Token::Inside)?;
                match (not, inside) {
                    (false, false) => BinaryOp::Eq,
                    (true, false) => BinaryOp::Neq,
                    (false, true) => BinaryOp::Inside,
                    (true, true) => BinaryOp::NotInside,
                }
            }
            other => unreachable!("binary_op_precedence admitted a non-operator token {other:?}"),
        })
    }
}

/// `0` for anything that doesn't begin a binary operator. A thin wrapper
/// around `Token::precedence`: the lead token alone is enough to decide
/// whether to consume at all, even though the contextual rewrites (`IS`,
/// `CONTAINS`) still need resolving afterward before the tree shape is final.
fn binary_op_precedence(tok: Token) -> u8 {
    tok.precedence()
}

fn is_numeric_literal_start(tok: Token) -> bool {
    matches!(tok, Token::Number | Token::Double)
}

fn lex_err_to_parse_err(err: LexError) -> ParseError {
    let (found, kind) = match err {
        LexError::UnterminatedString => (String::new(), "unterminated string"),
        LexError::UnterminatedBlockComment => (String::new(), "unterminated comment"),
        LexError::UnterminatedObject => (String::new(), "unterminated object"),
        LexError::UnterminatedArray => (String::new(), "unterminated array"),
        LexError::UnterminatedThing => (String::new(), "unterminated record id"),
        LexError::UnknownEscape(c) => (c.to_string(), "unknown escape"),
        LexError::UnexpectedChar(c) => (c.to_string(), "unexpected character"),
    };
    ParseError::parse(found, vec![kind.to_string()])
}

/// Rolling/aggregate functions allowed in a `GROUP BY` field list without
/// themselves appearing in the grouping key, per the aggregation check.
fn is_allowed_in_group(expr: &Expression, group: &[Expression]) -> bool {
    match expr {
        Expression::Func { aggregate, .. } => *aggregate,
        Expression::Ident(name) => group.iter().any(|g| matches!(g, Expression::Ident(n) if n == name)),
        Expression::Literal(_) => true,
        Expression::Path(_) => group.iter().any(|g| g == expr),
        _ => false,
    }
}

fn check_aggregation(stmt: &SelectStatement) -> Result<()> {
    if stmt.group.is_empty() && !stmt.group_all {
        return Ok(());
    }
    for field in &stmt.expr {
        if !is_allowed_in_group(&field.expr, &stmt.group) {
            return Err(ParseError::Group { found: crate::pretty::print_expr(&field.expr) });
        }
    }
    Ok(())
}
