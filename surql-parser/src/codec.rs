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

//! Stable tagged binary codec for the AST. Every node type owns a 1-byte
//! tag; fields are written as a length-prefixed typed stream so a decoder
//! can skip nothing and must rebuild the exact same node it was given.
//!
//! Tag ranges are grouped by category so a corrupt stream fails fast on
//! an out-of-range byte rather than silently decoding the wrong shape:
//! `0x01..0x10` JSON values, `0x10..0x20` thing ids, `0x20..0x30`
//! literals, `0x30..0x50` binary/join/echo/perm small enums, `0x50..0x70`
//! expressions, `0x70..0x90` statements, `0x90..0x9f` define/remove leaf
//! kinds.

use thiserror::Error;

use crate::ast::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of codec stream")]
    Eof,

    #[error("invalid tag byte 0x{tag:02x} for {context}")]
    InvalidTag { tag: u8, context: &'static str },

    #[error("codec stream contained invalid UTF-8")]
    InvalidUtf8,

    #[error("codec stream contained an out-of-range value for {context}")]
    OutOfRange { context: &'static str },
}

type CResult<T> = std::result::Result<T, CodecError>;

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.u64(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn option<T>(&mut self, v: &Option<T>, f: impl FnOnce(&mut Self, &T)) {
        match v {
            None => self.bool(false),
            Some(inner) => {
                self.bool(true);
                f(self, inner);
            }
        }
    }

    fn list<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.u64(items.len() as u64);
        for item in items {
            f(self, item);
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn u8(&mut self) -> CResult<u8> {
        let b = *self.buf.get(self.pos).ok_or(CodecError::Eof)?;
        self.pos += 1;
        Ok(b)
    }

    fn bool(&mut self) -> CResult<bool> {
        Ok(self.u8()? != 0)
    }

    fn take(&mut self, n: usize) -> CResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(CodecError::Eof);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u64(&mut self) -> CResult<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| CodecError::Eof)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn i64(&mut self) -> CResult<i64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| CodecError::Eof)?;
        Ok(i64::from_le_bytes(bytes))
    }

    fn f64(&mut self) -> CResult<f64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| CodecError::Eof)?;
        Ok(f64::from_le_bytes(bytes))
    }

    fn str(&mut self) -> CResult<String> {
        let len = self.u64()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    fn option<T>(&mut self, f: impl FnOnce(&mut Self) -> CResult<T>) -> CResult<Option<T>> {
        if self.bool()? {
            Ok(Some(f(self)?))
        } else {
            Ok(None)
        }
    }

    fn list<T>(&mut self, mut f: impl FnMut(&mut Self) -> CResult<T>) -> CResult<Vec<T>> {
        let len = self.u64()? as usize;
        let mut out = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            out.push(f(self)?);
        }
        Ok(out)
    }
}

// --- JsonValue -------------------------------------------------------

mod json_tag {
    pub const NULL: u8 = 0x01;
    pub const BOOL: u8 = 0x02;
    pub const NUMBER: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const ARRAY: u8 = 0x05;
    pub const OBJECT: u8 = 0x06;
}

fn write_json(w: &mut Writer, v: &JsonValue) {
    match v {
        JsonValue::Null => w.u8(json_tag::NULL),
        JsonValue::Bool(b) => {
            w.u8(json_tag::BOOL);
            w.bool(*b);
        }
        JsonValue::Number(n) => {
            w.u8(json_tag::NUMBER);
            w.f64(*n);
        }
        JsonValue::String(s) => {
            w.u8(json_tag::STRING);
            w.str(s);
        }
        JsonValue::Array(items) => {
            w.u8(json_tag::ARRAY);
            w.list(items, write_json);
        }
        JsonValue::Object(fields) => {
            w.u8(json_tag::OBJECT);
            w.list(fields, |w, (k, v)| {
                w.str(k);
                write_json(w, v);
            });
        }
    }
}

fn read_json(r: &mut Reader) -> CResult<JsonValue> {
    let tag = r.u8()?;
    Ok(match tag {
        json_tag::NULL => JsonValue::Null,
        json_tag::BOOL => JsonValue::Bool(r.bool()?),
        json_tag::NUMBER => JsonValue::Number(r.f64()?),
        json_tag::STRING => JsonValue::String(r.str()?),
        json_tag::ARRAY => JsonValue::Array(r.list(read_json)?),
        json_tag::OBJECT => {
            JsonValue::Object(r.list(|r| Ok((r.str()?, read_json(r)?)))?)
        }
        _ => return Err(CodecError::InvalidTag { tag, context: "JsonValue" }),
    })
}

// --- ThingId / Thing --------------------------------------------------

mod thing_tag {
    pub const STRING: u8 = 0x10;
    pub const INT: u8 = 0x11;
    pub const FLOAT: u8 = 0x12;
    pub const BOOL: u8 = 0x13;
    pub const DATE: u8 = 0x14;
    pub const TIME: u8 = 0x15;
}

fn write_thing_id(w: &mut Writer, id: &ThingId) {
    match id {
        ThingId::String(s) => {
            w.u8(thing_tag::STRING);
            w.str(s);
        }
        ThingId::Int(i) => {
            w.u8(thing_tag::INT);
            w.i64(*i);
        }
        ThingId::Float(n) => {
            w.u8(thing_tag::FLOAT);
            w.f64(*n);
        }
        ThingId::Bool(b) => {
            w.u8(thing_tag::BOOL);
            w.bool(*b);
        }
        ThingId::Date(d) => {
            w.u8(thing_tag::DATE);
            w.str(&d.to_string());
        }
        ThingId::Time(t) => {
            w.u8(thing_tag::TIME);
            w.str(&t.to_string());
        }
    }
}

fn read_thing_id(r: &mut Reader) -> CResult<ThingId> {
    let tag = r.u8()?;
    Ok(match tag {
        thing_tag::STRING => ThingId::String(r.str()?),
        thing_tag::INT => ThingId::Int(r.i64()?),
        thing_tag::FLOAT => ThingId::Float(r.f64()?),
        thing_tag::BOOL => ThingId::Bool(r.bool()?),
        thing_tag::DATE => {
            let s = r.str()?;
            let d: jiff::civil::Date =
                s.parse().map_err(|_| CodecError::OutOfRange { context: "ThingId::Date" })?;
            ThingId::Date(d)
        }
        thing_tag::TIME => {
            let s = r.str()?;
            let ts: jiff::Timestamp =
                s.parse().map_err(|_| CodecError::OutOfRange { context: "ThingId::Time" })?;
            ThingId::Time(ts)
        }
        _ => return Err(CodecError::InvalidTag { tag, context: "ThingId" }),
    })
}

fn write_thing(w: &mut Writer, thing: &Thing) {
    w.str(&thing.table);
    write_thing_id(w, &thing.id);
}

fn read_thing(r: &mut Reader) -> CResult<Thing> {
    let table = r.str()?;
    let id = read_thing_id(r)?;
    Ok(Thing { table, id })
}

// --- Literal -----------------------------------------------------------

mod lit_tag {
    pub const ALL: u8 = 0x20;
    pub const ANY: u8 = 0x21;
    pub const NULL: u8 = 0x22;
    pub const VOID: u8 = 0x23;
    pub const EMPTY: u8 = 0x24;
    pub const MISSING: u8 = 0x25;
    pub const BOOL: u8 = 0x26;
    pub const NUMBER: u8 = 0x27;
    pub const STRING: u8 = 0x28;
    pub const DURATION: u8 = 0x29;
    pub const DATE: u8 = 0x2a;
    pub const TIME: u8 = 0x2b;
    pub const REGEX: u8 = 0x2c;
    pub const JSON: u8 = 0x2d;
    pub const ARRAY: u8 = 0x2e;
}

fn write_literal(w: &mut Writer, lit: &Literal) {
    match lit {
        Literal::All => w.u8(lit_tag::ALL),
        Literal::Any => w.u8(lit_tag::ANY),
        Literal::Null => w.u8(lit_tag::NULL),
        Literal::Void => w.u8(lit_tag::VOID),
        Literal::Empty => w.u8(lit_tag::EMPTY),
        Literal::Missing => w.u8(lit_tag::MISSING),
        Literal::Bool(b) => {
            w.u8(lit_tag::BOOL);
            w.bool(*b);
        }
        Literal::Number(n) => {
            w.u8(lit_tag::NUMBER);
            w.f64(*n);
        }
        Literal::String(s) => {
            w.u8(lit_tag::STRING);
            w.str(s);
        }
        Literal::Duration(nanos) => {
            w.u8(lit_tag::DURATION);
            w.u64(*nanos);
        }
        Literal::Date(d) => {
            w.u8(lit_tag::DATE);
            w.str(&d.to_string());
        }
        Literal::Time(t) => {
            w.u8(lit_tag::TIME);
            w.str(&t.to_string());
        }
        Literal::Regex(s) => {
            w.u8(lit_tag::REGEX);
            w.str(s);
        }
        Literal::Json(v) => {
            w.u8(lit_tag::JSON);
            write_json(w, v);
        }
        Literal::Array(items) => {
            w.u8(lit_tag::ARRAY);
            w.list(items, write_json);
        }
    }
}

fn read_literal(r: &mut Reader) -> CResult<Literal> {
    let tag = r.u8()?;
    Ok(match tag {
        lit_tag::ALL => Literal::All,
        lit_tag::ANY => Literal::Any,
        lit_tag::NULL => Literal::Null,
        lit_tag::VOID => Literal::Void,
        lit_tag::EMPTY => Literal::Empty,
        lit_tag::MISSING => Literal::Missing,
        lit_tag::BOOL => Literal::Bool(r.bool()?),
        lit_tag::NUMBER => Literal::Number(r.f64()?),
        lit_tag::STRING => Literal::String(r.str()?),
        lit_tag::DURATION => Literal::Duration(r.u64()?),
        lit_tag::DATE => {
            let s = r.str()?;
            Literal::Date(s.parse().map_err(|_| CodecError::OutOfRange { context: "Literal::Date" })?)
        }
        lit_tag::TIME => {
            let s = r.str()?;
            Literal::Time(s.parse().map_err(|_| CodecError::OutOfRange { context: "Literal::Time" })?)
        }
        lit_tag::REGEX => Literal::Regex(r.str()?),
        lit_tag::JSON => Literal::Json(read_json(r)?),
        lit_tag::ARRAY => Literal::Array(r.list(read_json)?),
        _ => return Err(CodecError::InvalidTag { tag, context: "Literal" }),
    })
}

// --- small fixed enums: BinaryOp, Join, Echo, PermVerb -----------------

fn binary_op_tag(op: BinaryOp) -> u8 {
    use BinaryOp::*;
    match op {
        Add => 0x30,
        Sub => 0x31,
        Mul => 0x32,
        Div => 0x33,
        Eq => 0x34,
        Neq => 0x35,
        Exq => 0x36,
        Nex => 0x37,
        Lt => 0x38,
        Lte => 0x39,
        Gt => 0x3a,
        Gte => 0x3b,
        Fuzzy => 0x3c,
        Inside => 0x3d,
        NotInside => 0x3e,
        Contains => 0x3f,
        ContainsNot => 0x40,
        ContainsAll => 0x41,
        ContainsAny => 0x42,
        ContainsNone => 0x43,
        AllInside => 0x44,
        AnyInside => 0x45,
        NoneInside => 0x46,
        And => 0x47,
        Or => 0x48,
    }
}

fn binary_op_from_tag(tag: u8) -> CResult<BinaryOp> {
    use BinaryOp::*;
    Ok(match tag {
        0x30 => Add,
        0x31 => Sub,
        0x32 => Mul,
        0x33 => Div,
        0x34 => Eq,
        0x35 => Neq,
        0x36 => Exq,
        0x37 => Nex,
        0x38 => Lt,
        0x39 => Lte,
        0x3a => Gt,
        0x3b => Gte,
        0x3c => Fuzzy,
        0x3d => Inside,
        0x3e => NotInside,
        0x3f => Contains,
        0x40 => ContainsNot,
        0x41 => ContainsAll,
        0x42 => ContainsAny,
        0x43 => ContainsNone,
        0x44 => AllInside,
        0x45 => AnyInside,
        0x46 => NoneInside,
        0x47 => And,
        0x48 => Or,
        _ => return Err(CodecError::InvalidTag { tag, context: "BinaryOp" }),
    })
}

fn write_binary_op(w: &mut Writer, op: BinaryOp) {
    w.u8(binary_op_tag(op));
}

fn read_binary_op(r: &mut Reader) -> CResult<BinaryOp> {
    binary_op_from_tag(r.u8()?)
}

fn write_join(w: &mut Writer, join: &Join) {
    let tag = match join {
        Join::Dot => 0x49,
        Join::Arrow => 0x4a,
        Join::ArrowBack => 0x4b,
        Join::ArrowBoth => 0x4c,
    };
    w.u8(tag);
}

fn read_join(r: &mut Reader) -> CResult<Join> {
    let tag = r.u8()?;
    Ok(match tag {
        0x49 => Join::Dot,
        0x4a => Join::Arrow,
        0x4b => Join::ArrowBack,
        0x4c => Join::ArrowBoth,
        _ => return Err(CodecError::InvalidTag { tag, context: "Join" }),
    })
}

fn write_echo(w: &mut Writer, echo: Echo) {
    let tag = match echo {
        Echo::None => 0x4d,
        Echo::Before => 0x4e,
        Echo::After => 0x4f,
        Echo::Diff => 0x50,
        Echo::Both => 0x51,
        Echo::Id => 0x52,
        Echo::Info => 0x53,
    };
    w.u8(tag);
}

fn read_echo(r: &mut Reader) -> CResult<Echo> {
    let tag = r.u8()?;
    Ok(match tag {
        0x4d => Echo::None,
        0x4e => Echo::Before,
        0x4f => Echo::After,
        0x50 => Echo::Diff,
        0x51 => Echo::Both,
        0x52 => Echo::Id,
        0x53 => Echo::Info,
        _ => return Err(CodecError::InvalidTag { tag, context: "Echo" }),
    })
}

fn write_perm_rule(w: &mut Writer, rule: &PermRule) {
    match rule {
        PermRule::Full => w.u8(0x54),
        PermRule::None => w.u8(0x55),
        PermRule::Where(e) => {
            w.u8(0x56);
            write_expr(w, e);
        }
    }
}

fn read_perm_rule(r: &mut Reader) -> CResult<PermRule> {
    let tag = r.u8()?;
    Ok(match tag {
        0x54 => PermRule::Full,
        0x55 => PermRule::None,
        0x56 => PermRule::Where(read_expr(r)?),
        _ => return Err(CodecError::InvalidTag { tag, context: "PermRule" }),
    })
}

fn write_perms(w: &mut Writer, perms: &Perms) {
    write_perm_rule(w, &perms.select);
    write_perm_rule(w, &perms.create);
    write_perm_rule(w, &perms.update);
    write_perm_rule(w, &perms.delete);
}

fn read_perms(r: &mut Reader) -> CResult<Perms> {
    Ok(Perms {
        select: read_perm_rule(r)?,
        create: read_perm_rule(r)?,
        update: read_perm_rule(r)?,
        delete: read_perm_rule(r)?,
    })
}

fn write_data(w: &mut Writer, data: &Data) {
    match data {
        Data::Set(items) => {
            w.u8(0x57);
            w.list(items, |w, (lhs, op, rhs)| {
                write_expr(w, lhs);
                write_binary_op(w, *op);
                write_expr(w, rhs);
            });
        }
        Data::Content(e) => {
            w.u8(0x58);
            write_expr(w, e);
        }
        Data::Merge(e) => {
            w.u8(0x59);
            write_expr(w, e);
        }
        Data::Diff(e) => {
            w.u8(0x5a);
            write_expr(w, e);
        }
    }
}

fn read_data(r: &mut Reader) -> CResult<Data> {
    let tag = r.u8()?;
    Ok(match tag {
        0x57 => Data::Set(r.list(|r| {
            let lhs = read_expr(r)?;
            let op = read_binary_op(r)?;
            let rhs = read_expr(r)?;
            Ok((lhs, op, rhs))
        })?),
        0x58 => Data::Content(read_expr(r)?),
        0x59 => Data::Merge(read_expr(r)?),
        0x5a => Data::Diff(read_expr(r)?),
        _ => return Err(CodecError::InvalidTag { tag, context: "Data" }),
    })
}

fn write_meta(w: &mut Writer, meta: &Meta) {
    w.option(&meta.timeout, |w, t| w.u64(*t));
    w.bool(meta.parallel);
}

fn read_meta(r: &mut Reader) -> CResult<Meta> {
    let timeout = r.option(|r| r.u64())?;
    let parallel = r.bool()?;
    Ok(Meta { timeout, parallel })
}

fn write_field(w: &mut Writer, field: &Field) {
    write_expr(w, &field.expr);
    w.option(&field.alias, |w, s| w.str(s));
}

fn read_field(r: &mut Reader) -> CResult<Field> {
    let expr = read_expr(r)?;
    let alias = r.option(|r| r.str())?;
    Ok(Field { expr, alias })
}

fn write_order_item(w: &mut Writer, item: &OrderItem) {
    write_expr(w, &item.expr);
    w.option(&item.collate, |w, s| w.str(s));
    w.bool(item.numeric);
    w.bool(item.descending);
}

fn read_order_item(r: &mut Reader) -> CResult<OrderItem> {
    let expr = read_expr(r)?;
    let collate = r.option(|r| r.str())?;
    let numeric = r.bool()?;
    let descending = r.bool()?;
    Ok(OrderItem { expr, collate, numeric, descending })
}

// --- Expression ----------------------------------------------------------

mod expr_tag {
    pub const LITERAL: u8 = 0x60;
    pub const IDENT: u8 = 0x61;
    pub const PARAM: u8 = 0x62;
    pub const TABLE: u8 = 0x63;
    pub const THING: u8 = 0x64;
    pub const VALUE: u8 = 0x65;
    pub const MODEL: u8 = 0x66;
    pub const SUB: u8 = 0x67;
    pub const UNARY: u8 = 0x68;
    pub const BINARY: u8 = 0x69;
    pub const FUNC: u8 = 0x6a;
    pub const IFEL: u8 = 0x6b;
    pub const PATH: u8 = 0x6c;
    pub const SUBQUERY: u8 = 0x6d;
    pub const DATA: u8 = 0x6e;
    pub const PERM: u8 = 0x6f;
}

fn write_expr(w: &mut Writer, expr: &Expression) {
    match expr {
        Expression::Literal(l) => {
            w.u8(expr_tag::LITERAL);
            write_literal(w, l);
        }
        Expression::Ident(s) => {
            w.u8(expr_tag::IDENT);
            w.str(s);
        }
        Expression::Param(s) => {
            w.u8(expr_tag::PARAM);
            w.str(s);
        }
        Expression::Table(s) => {
            w.u8(expr_tag::TABLE);
            w.str(s);
        }
        Expression::Thing(t) => {
            w.u8(expr_tag::THING);
            write_thing(w, t);
        }
        Expression::Value => w.u8(expr_tag::VALUE),
        Expression::Model(s) => {
            w.u8(expr_tag::MODEL);
            w.str(s);
        }
        Expression::Sub(inner) => {
            w.u8(expr_tag::SUB);
            write_expr(w, inner);
        }
        Expression::Unary { op, rhs } => {
            w.u8(expr_tag::UNARY);
            write_binary_op(w, *op);
            write_expr(w, rhs);
        }
        Expression::Binary { lhs, op, rhs } => {
            w.u8(expr_tag::BINARY);
            write_expr(w, lhs);
            write_binary_op(w, *op);
            write_expr(w, rhs);
        }
        Expression::Func { name, args, aggregate } => {
            w.u8(expr_tag::FUNC);
            w.str(name);
            w.list(args, |w, a| write_expr(w, a));
            w.bool(*aggregate);
        }
        Expression::Ifel { branches, else_ } => {
            w.u8(expr_tag::IFEL);
            w.list(branches, |w, (cond, then)| {
                write_expr(w, cond);
                write_expr(w, then);
            });
            w.option(else_, |w, e| write_expr(w, e));
        }
        Expression::Path(parts) => {
            w.u8(expr_tag::PATH);
            w.list(parts, |w, part| {
                w.option(&part.join, write_join);
                write_expr(w, &part.expr);
            });
        }
        Expression::Subquery(stmt) => {
            w.u8(expr_tag::SUBQUERY);
            write_statement(w, stmt);
        }
        Expression::Data(data) => {
            w.u8(expr_tag::DATA);
            write_data(w, data);
        }
        Expression::Perm(perms) => {
            w.u8(expr_tag::PERM);
            write_perms(w, perms);
        }
    }
}

fn read_expr(r: &mut Reader) -> CResult<Expression> {
    let tag = r.u8()?;
    Ok(match tag {
        expr_tag::LITERAL => Expression::Literal(read_literal(r)?),
        expr_tag::IDENT => Expression::Ident(r.str()?),
        expr_tag::PARAM => Expression::Param(r.str()?),
        expr_tag::TABLE => Expression::Table(r.str()?),
        expr_tag::THING => Expression::Thing(read_thing(r)?),
        expr_tag::VALUE => Expression::Value,
        expr_tag::MODEL => Expression::Model(r.str()?),
        expr_tag::SUB => Expression::Sub(Box::new(read_expr(r)?)),
        expr_tag::UNARY => {
            let op = read_binary_op(r)?;
            let rhs = Box::new(read_expr(r)?);
            Expression::Unary { op, rhs }
        }
        expr_tag::BINARY => {
            let lhs = Box::new(read_expr(r)?);
            let op = read_binary_op(r)?;
            let rhs = Box::new(read_expr(r)?);
            Expression::Binary { lhs, op, rhs }
        }
        expr_tag::FUNC => {
            let name = r.str()?;
            let args = r.list(read_expr)?;
            let aggregate = r.bool()?;
            Expression::Func { name, args, aggregate }
        }
        expr_tag::IFEL => {
            let branches = r.list(|r| {
                let cond = read_expr(r)?;
                let then = read_expr(r)?;
                Ok((cond, then))
            })?;
            let else_ = r.option(|r| Ok(Box::new(read_expr(r)?)))?;
            Expression::Ifel { branches, else_ }
        }
        expr_tag::PATH => {
            let parts = r.list(|r| {
                let join = r.option(read_join)?;
                let expr = Box::new(read_expr(r)?);
                Ok(PathPart { join, expr })
            })?;
            Expression::Path(parts)
        }
        expr_tag::SUBQUERY => Expression::Subquery(Box::new(read_statement(r)?)),
        expr_tag::DATA => Expression::Data(read_data(r)?),
        expr_tag::PERM => Expression::Perm(read_perms(r)?),
        _ => return Err(CodecError::InvalidTag { tag, context: "Expression" }),
    })
}

// --- Statement -------------------------------------------------------------

mod stmt_tag {
    pub const BEGIN: u8 = 0x70;
    pub const CANCEL: u8 = 0x71;
    pub const COMMIT: u8 = 0x72;
    pub const USE: u8 = 0x73;
    pub const LET: u8 = 0x74;
    pub const RETURN: u8 = 0x75;
    pub const IF: u8 = 0x76;
    pub const INFO: u8 = 0x77;
    pub const SELECT: u8 = 0x78;
    pub const CREATE: u8 = 0x79;
    pub const UPDATE: u8 = 0x7a;
    pub const DELETE: u8 = 0x7b;
    pub const RELATE: u8 = 0x7c;
    pub const INSERT: u8 = 0x7d;
    pub const LIVE: u8 = 0x7e;
    pub const KILL: u8 = 0x7f;
    pub const DEFINE: u8 = 0x80;
    pub const REMOVE: u8 = 0x81;
}

fn write_select(w: &mut Writer, s: &SelectStatement) {
    w.list(&s.expr, write_field);
    w.list(&s.what, |w, e| write_expr(w, e));
    w.option(&s.cond, |w, e| write_expr(w, e));
    w.list(&s.split, |w, e| write_expr(w, e));
    w.bool(s.group_all);
    w.list(&s.group, |w, e| write_expr(w, e));
    w.list(&s.order, write_order_item);
    w.option(&s.limit, |w, e| write_expr(w, e));
    w.option(&s.start, |w, e| write_expr(w, e));
    w.list(&s.fetch, |w, f| w.str(f));
    w.option(&s.version, |w, e| write_expr(w, e));
    write_meta(w, &s.meta);
}

fn read_select(r: &mut Reader) -> CResult<SelectStatement> {
    Ok(SelectStatement {
        expr: r.list(read_field)?,
        what: r.list(read_expr)?,
        cond: r.option(read_expr)?,
        split: r.list(read_expr)?,
        group_all: r.bool()?,
        group: r.list(read_expr)?,
        order: r.list(read_order_item)?,
        limit: r.option(read_expr)?,
        start: r.option(read_expr)?,
        fetch: r.list(|r| r.str())?,
        version: r.option(read_expr)?,
        meta: read_meta(r)?,
    })
}

fn write_create(w: &mut Writer, s: &CreateStatement) {
    w.list(&s.what, |w, e| write_expr(w, e));
    w.option(&s.data, write_data);
    write_echo(w, s.echo);
    write_meta(w, &s.meta);
}

fn read_create(r: &mut Reader) -> CResult<CreateStatement> {
    Ok(CreateStatement {
        what: r.list(read_expr)?,
        data: r.option(read_data)?,
        echo: read_echo(r)?,
        meta: read_meta(r)?,
    })
}

fn write_update(w: &mut Writer, s: &UpdateStatement) {
    w.list(&s.what, |w, e| write_expr(w, e));
    w.option(&s.data, write_data);
    w.option(&s.cond, |w, e| write_expr(w, e));
    write_echo(w, s.echo);
    write_meta(w, &s.meta);
}

fn read_update(r: &mut Reader) -> CResult<UpdateStatement> {
    Ok(UpdateStatement {
        what: r.list(read_expr)?,
        data: r.option(read_data)?,
        cond: r.option(read_expr)?,
        echo: read_echo(r)?,
        meta: read_meta(r)?,
    })
}

fn write_delete(w: &mut Writer, s: &DeleteStatement) {
    w.bool(s.hard);
    w.list(&s.what, |w, e| write_expr(w, e));
    w.option(&s.cond, |w, e| write_expr(w, e));
    write_echo(w, s.echo);
    write_meta(w, &s.meta);
}

fn read_delete(r: &mut Reader) -> CResult<DeleteStatement> {
    Ok(DeleteStatement {
        hard: r.bool()?,
        what: r.list(read_expr)?,
        cond: r.option(read_expr)?,
        echo: read_echo(r)?,
        meta: read_meta(r)?,
    })
}

fn write_relate(w: &mut Writer, s: &RelateStatement) {
    write_expr(w, &s.from);
    write_expr(w, &s.kind);
    write_expr(w, &s.with);
    w.bool(s.reversed);
    w.bool(s.unique);
    w.option(&s.data, write_data);
    write_echo(w, s.echo);
    write_meta(w, &s.meta);
}

fn read_relate(r: &mut Reader) -> CResult<RelateStatement> {
    Ok(RelateStatement {
        from: read_expr(r)?,
        kind: read_expr(r)?,
        with: read_expr(r)?,
        reversed: r.bool()?,
        unique: r.bool()?,
        data: r.option(read_data)?,
        echo: read_echo(r)?,
        meta: read_meta(r)?,
    })
}

fn write_insert(w: &mut Writer, s: &InsertStatement) {
    w.bool(s.upsert);
    write_expr(w, &s.into);
    write_data(w, &s.data);
    write_echo(w, s.echo);
    write_meta(w, &s.meta);
}

fn read_insert(r: &mut Reader) -> CResult<InsertStatement> {
    Ok(InsertStatement {
        upsert: r.bool()?,
        into: read_expr(r)?,
        data: read_data(r)?,
        echo: read_echo(r)?,
        meta: read_meta(r)?,
    })
}

fn write_live(w: &mut Writer, s: &LiveStatement) {
    w.bool(s.diff);
    w.list(&s.expr, write_field);
    write_expr(w, &s.what);
    w.option(&s.cond, |w, e| write_expr(w, e));
    w.list(&s.fetch, |w, f| w.str(f));
}

fn read_live(r: &mut Reader) -> CResult<LiveStatement> {
    Ok(LiveStatement {
        diff: r.bool()?,
        expr: r.list(read_field)?,
        what: read_expr(r)?,
        cond: r.option(read_expr)?,
        fetch: r.list(|r| r.str())?,
    })
}

mod info_tag {
    pub const KV: u8 = 0x90;
    pub const NS: u8 = 0x91;
    pub const DB: u8 = 0x92;
    pub const SCOPE: u8 = 0x93;
    pub const TABLE: u8 = 0x94;
}

fn write_info(w: &mut Writer, info: &InfoTarget) {
    match info {
        InfoTarget::Kv => w.u8(info_tag::KV),
        InfoTarget::Ns => w.u8(info_tag::NS),
        InfoTarget::Db => w.u8(info_tag::DB),
        InfoTarget::Scope(name) => {
            w.u8(info_tag::SCOPE);
            w.str(name);
        }
        InfoTarget::Table(name) => {
            w.u8(info_tag::TABLE);
            w.str(name);
        }
    }
}

fn read_info(r: &mut Reader) -> CResult<InfoTarget> {
    let tag = r.u8()?;
    Ok(match tag {
        info_tag::KV => InfoTarget::Kv,
        info_tag::NS => InfoTarget::Ns,
        info_tag::DB => InfoTarget::Db,
        info_tag::SCOPE => InfoTarget::Scope(r.str()?),
        info_tag::TABLE => InfoTarget::Table(r.str()?),
        _ => return Err(CodecError::InvalidTag { tag, context: "InfoTarget" }),
    })
}

mod define_tag {
    pub const NAMESPACE: u8 = 0x95;
    pub const DATABASE: u8 = 0x96;
    pub const LOGIN: u8 = 0x97;
    pub const TOKEN: u8 = 0x98;
    pub const SCOPE: u8 = 0x99;
    pub const TABLE: u8 = 0x9a;
    pub const EVENT: u8 = 0x9b;
    pub const FIELD: u8 = 0x9c;
    pub const INDEX: u8 = 0x9d;
}

fn write_define(w: &mut Writer, def: &DefineStatement) {
    match def {
        DefineStatement::Namespace(name) => {
            w.u8(define_tag::NAMESPACE);
            w.str(name);
        }
        DefineStatement::Database(name) => {
            w.u8(define_tag::DATABASE);
            w.str(name);
        }
        DefineStatement::Login(l) => {
            w.u8(define_tag::LOGIN);
            w.str(&l.name);
            w.option(&l.on_scope, |w, s| w.str(s));
            w.option(&l.password, |w, s| w.str(s));
            w.option(&l.hash, |w, s| w.str(s));
        }
        DefineStatement::Token(t) => {
            w.u8(define_tag::TOKEN);
            w.str(&t.name);
            w.option(&t.on_scope, |w, s| w.str(s));
            w.str(&t.kind);
            w.str(&t.value);
        }
        DefineStatement::Scope(s) => {
            w.u8(define_tag::SCOPE);
            w.str(&s.name);
            w.option(&s.session, |w, v| w.u64(*v));
            w.option(&s.signup, |w, e| write_expr(w, e));
            w.option(&s.signin, |w, e| write_expr(w, e));
        }
        DefineStatement::Table(t) => {
            w.u8(define_tag::TABLE);
            w.str(&t.name);
            w.bool(t.schemaless);
            w.option(&t.perms, write_perms);
        }
        DefineStatement::Event(e) => {
            w.u8(define_tag::EVENT);
            w.str(&e.name);
            w.str(&e.table);
            write_expr(w, &e.when);
            w.list(&e.then, |w, t| write_expr(w, t));
        }
        DefineStatement::Field(f) => {
            w.u8(define_tag::FIELD);
            w.str(&f.name);
            w.str(&f.table);
            w.option(&f.kind, |w, s| w.str(s));
            w.option(&f.min, |w, e| write_expr(w, e));
            w.option(&f.max, |w, e| write_expr(w, e));
            w.option(&f.enum_values, |w, e| write_expr(w, e));
            w.option(&f.code, |w, e| write_expr(w, e));
            w.option(&f.regex_match, |w, e| write_expr(w, e));
            w.option(&f.default, |w, e| write_expr(w, e));
            w.bool(f.readonly);
            w.bool(f.mandatory);
            w.bool(f.notnull);
            w.option(&f.validate, |w, e| write_expr(w, e));
            w.option(&f.perms, write_perms);
        }
        DefineStatement::Index(idx) => {
            w.u8(define_tag::INDEX);
            w.str(&idx.name);
            w.list(&idx.what, |w, e| write_expr(w, e));
            w.list(&idx.cols, |w, s| w.str(s));
            w.bool(idx.unique);
        }
    }
}

fn read_define(r: &mut Reader) -> CResult<DefineStatement> {
    let tag = r.u8()?;
    Ok(match tag {
        define_tag::NAMESPACE => DefineStatement::Namespace(r.str()?),
        define_tag::DATABASE => DefineStatement::Database(r.str()?),
        define_tag::LOGIN => DefineStatement::Login(DefineLoginStatement {
            name: r.str()?,
            on_scope: r.option(|r| r.str())?,
            password: r.option(|r| r.str())?,
            hash: r.option(|r| r.str())?,
        }),
        define_tag::TOKEN => DefineStatement::Token(DefineTokenStatement {
            name: r.str()?,
            on_scope: r.option(|r| r.str())?,
            kind: r.str()?,
            value: r.str()?,
        }),
        define_tag::SCOPE => DefineStatement::Scope(DefineScopeStatement {
            name: r.str()?,
            session: r.option(|r| r.u64())?,
            signup: r.option(read_expr)?,
            signin: r.option(read_expr)?,
        }),
        define_tag::TABLE => DefineStatement::Table(DefineTableStatement {
            name: r.str()?,
            schemaless: r.bool()?,
            perms: r.option(read_perms)?,
        }),
        define_tag::EVENT => DefineStatement::Event(DefineEventStatement {
            name: r.str()?,
            table: r.str()?,
            when: read_expr(r)?,
            then: r.list(read_expr)?,
        }),
        define_tag::FIELD => DefineStatement::Field(DefineFieldStatement {
            name: r.str()?,
            table: r.str()?,
            kind: r.option(|r| r.str())?,
            min: r.option(read_expr)?,
            max: r.option(read_expr)?,
            enum_values: r.option(read_expr)?,
            code: r.option(read_expr)?,
            regex_match: r.option(read_expr)?,
            default: r.option(read_expr)?,
            readonly: r.bool()?,
            mandatory: r.bool()?,
            notnull: r.bool()?,
            validate: r.option(read_expr)?,
            perms: r.option(read_perms)?,
        }),
        define_tag::INDEX => DefineStatement::Index(DefineIndexStatement {
            name: r.str()?,
            what: r.list(read_expr)?,
            cols: r.list(|r| r.str())?,
            unique: r.bool()?,
        }),
        _ => return Err(CodecError::InvalidTag { tag, context: "DefineStatement" }),
    })
}

mod remove_tag {
    pub const NAMESPACE: u8 = 0x9e;
    pub const DATABASE: u8 = 0x9f;
    pub const LOGIN: u8 = 0xa0;
    pub const TOKEN: u8 = 0xa1;
    pub const SCOPE: u8 = 0xa2;
    pub const TABLE: u8 = 0xa3;
    pub const EVENT: u8 = 0xa4;
    pub const FIELD: u8 = 0xa5;
    pub const INDEX: u8 = 0xa6;
}

fn write_remove(w: &mut Writer, rem: &RemoveStatement) {
    match rem {
        RemoveStatement::Namespace(name) => {
            w.u8(remove_tag::NAMESPACE);
            w.str(name);
        }
        RemoveStatement::Database(name) => {
            w.u8(remove_tag::DATABASE);
            w.str(name);
        }
        RemoveStatement::Login(name) => {
            w.u8(remove_tag::LOGIN);
            w.str(name);
        }
        RemoveStatement::Token(name) => {
            w.u8(remove_tag::TOKEN);
            w.str(name);
        }
        RemoveStatement::Scope(name) => {
            w.u8(remove_tag::SCOPE);
            w.str(name);
        }
        RemoveStatement::Table(name) => {
            w.u8(remove_tag::TABLE);
            w.str(name);
        }
        RemoveStatement::Event { name, table } => {
            w.u8(remove_tag::EVENT);
            w.str(name);
            w.str(table);
        }
        RemoveStatement::Field { name, table } => {
            w.u8(remove_tag::FIELD);
            w.str(name);
            w.str(table);
        }
        RemoveStatement::Index { name, table } => {
            w.u8(remove_tag::INDEX);
            w.str(name);
            w.str(table);
        }
    }
}

fn read_remove(r: &mut Reader) -> CResult<RemoveStatement> {
    let tag = r.u8()?;
    Ok(match tag {
        remove_tag::NAMESPACE => RemoveStatement::Namespace(r.str()?),
        remove_tag::DATABASE => RemoveStatement::Database(r.str()?),
        remove_tag::LOGIN => RemoveStatement::Login(r.str()?),
        remove_tag::TOKEN => RemoveStatement::Token(r.str()?),
        remove_tag::SCOPE => RemoveStatement::Scope(r.str()?),
        remove_tag::TABLE => RemoveStatement::Table(r.str()?),
        remove_tag::EVENT => RemoveStatement::Event { name: r.str()?, table: r.str()? },
        remove_tag::FIELD => RemoveStatement::Field { name: r.str()?, table: r.str()? },
        remove_tag::INDEX => RemoveStatement::Index { name: r.str()?, table: r.str()? },
        _ => return Err(CodecError::InvalidTag { tag, context: "RemoveStatement" }),
    })
}

fn write_statement(w: &mut Writer, stmt: &Statement) {
    match stmt {
        Statement::Begin => w.u8(stmt_tag::BEGIN),
        Statement::Cancel => w.u8(stmt_tag::CANCEL),
        Statement::Commit => w.u8(stmt_tag::COMMIT),
        Statement::Use { ns, db } => {
            w.u8(stmt_tag::USE);
            w.option(ns, |w, s| w.str(s));
            w.option(db, |w, s| w.str(s));
        }
        Statement::Let { name, value } => {
            w.u8(stmt_tag::LET);
            w.str(name);
            write_expr(w, value);
        }
        Statement::Return(e) => {
            w.u8(stmt_tag::RETURN);
            write_expr(w, e);
        }
        Statement::If(e) => {
            w.u8(stmt_tag::IF);
            write_expr(w, e);
        }
        Statement::Info(target) => {
            w.u8(stmt_tag::INFO);
            write_info(w, target);
        }
        Statement::Select(s) => {
            w.u8(stmt_tag::SELECT);
            write_select(w, s);
        }
        Statement::Create(s) => {
            w.u8(stmt_tag::CREATE);
            write_create(w, s);
        }
        Statement::Update(s) => {
            w.u8(stmt_tag::UPDATE);
            write_update(w, s);
        }
        Statement::Delete(s) => {
            w.u8(stmt_tag::DELETE);
            write_delete(w, s);
        }
        Statement::Relate(s) => {
            w.u8(stmt_tag::RELATE);
            write_relate(w, s);
        }
        Statement::Insert(s) => {
            w.u8(stmt_tag::INSERT);
            write_insert(w, s);
        }
        Statement::Live(s) => {
            w.u8(stmt_tag::LIVE);
            write_live(w, s);
        }
        Statement::Kill(e) => {
            w.u8(stmt_tag::KILL);
            write_expr(w, e);
        }
        Statement::Define(s) => {
            w.u8(stmt_tag::DEFINE);
            write_define(w, s);
        }
        Statement::Remove(s) => {
            w.u8(stmt_tag::REMOVE);
            write_remove(w, s);
        }
    }
}

fn read_statement(r: &mut Reader) -> CResult<Statement> {
    let tag = r.u8()?;
    Ok(match tag {
        stmt_tag::BEGIN => Statement::Begin,
        stmt_tag::CANCEL => Statement::Cancel,
        stmt_tag::COMMIT => Statement::Commit,
        stmt_tag::USE => Statement::Use { ns: r.option(|r| r.str())?, db: r.option(|r| r.str())? },
        stmt_tag::LET => Statement::Let { name: r.str()?, value: read_expr(r)? },
        stmt_tag::RETURN => Statement::Return(read_expr(r)?),
        stmt_tag::IF => Statement::If(read_expr(r)?),
        stmt_tag::INFO => Statement::Info(read_info(r)?),
        stmt_tag::SELECT => Statement::Select(read_select(r)?),
        stmt_tag::CREATE => Statement::Create(read_create(r)?),
        stmt_tag::UPDATE => Statement::Update(read_update(r)?),
        stmt_tag::DELETE => Statement::Delete(read_delete(r)?),
        stmt_tag::RELATE => Statement::Relate(read_relate(r)?),
        stmt_tag::INSERT => Statement::Insert(read_insert(r)?),
        stmt_tag::LIVE => Statement::Live(read_live(r)?),
        stmt_tag::KILL => Statement::Kill(read_expr(r)?),
        stmt_tag::DEFINE => Statement::Define(read_define(r)?),
        stmt_tag::REMOVE => Statement::Remove(read_remove(r)?),
        _ => return Err(CodecError::InvalidTag { tag, context: "Statement" }),
    })
}

/// Encodes a full query to the stable tagged wire format.
pub fn encode(query: &Query) -> Vec<u8> {
    let mut w = Writer::new();
    w.list(&query.statements, |w, s| write_statement(w, s));
    w.buf
}

/// Decodes a query previously produced by [`encode`]. Any truncated or
/// tag-corrupted input is rejected rather than partially decoded.
pub fn decode(bytes: &[u8]) -> CResult<Query> {
    let mut r = Reader::new(bytes);
    let statements = r.list(read_statement)?;
    Ok(Query { statements })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query() -> Query {
        Query {
            statements: vec![Statement::Select(SelectStatement {
                expr: vec![Field { expr: Expression::Literal(Literal::All), alias: None }],
                what: vec![Expression::Table("person".to_string())],
                cond: Some(Expression::Binary {
                    lhs: Box::new(Expression::Ident("age".to_string())),
                    op: BinaryOp::Gt,
                    rhs: Box::new(Expression::Literal(Literal::Number(18.0))),
                }),
                split: vec![],
                group_all: false,
                group: vec![],
                order: vec![],
                limit: Some(Expression::Literal(Literal::Number(10.0))),
                start: None,
                fetch: vec![],
                version: None,
                meta: Meta { timeout: Some(5_000_000_000), parallel: true },
            })],
        }
    }

    #[test]
    fn round_trips_a_select_statement() {
        let query = sample_query();
        let bytes = encode(&query);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn rejects_truncated_input() {
        let query = sample_query();
        let mut bytes = encode(&query);
        bytes.truncate(bytes.len() - 1);
        assert_eq!(decode(&bytes), Err(CodecError::Eof));
    }

    #[test]
    fn rejects_corrupt_tag_byte() {
        let query = sample_query();
        let mut bytes = encode(&query);
        // Corrupt the outer statement-list length's first payload byte,
        // which is the statement tag itself.
        let tag_offset = 8;
        bytes[tag_offset] = 0xff;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn round_trips_thing_and_relate() {
        let query = Query {
            statements: vec![Statement::Relate(RelateStatement {
                from: Expression::Thing(Thing { table: "person".to_string(), id: ThingId::Int(1) }),
                kind: Expression::Table("knows".to_string()),
                with: Expression::Thing(Thing { table: "person".to_string(), id: ThingId::Int(2) }),
                reversed: false,
                unique: true,
                data: Some(Data::Set(vec![(
                    Expression::Ident("since".to_string()),
                    BinaryOp::Eq,
                    Expression::Literal(Literal::Number(2020.0)),
                )])),
                echo: Echo::After,
                meta: Meta::default(),
            })],
        };
        let bytes = encode(&query);
        assert_eq!(decode(&bytes).unwrap(), query);
    }
}
