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

//! The canonical round-trip pretty-printer: every AST node's `Display`
//! impl renders text that re-parses to an equal tree.

use std::fmt;

use crate::ast::*;

fn ident_needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if surql_lexer::Token::from_name(s) != surql_lexer::Token::Illegal {
        return true;
    }
    !s.chars().all(|c| c.is_ascii_alphanumeric() || "_.*[]-".contains(c))
}

fn write_ident(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if ident_needs_quoting(s) {
        write!(f, "`{s}`")
    } else {
        write!(f, "{s}")
    }
}

fn write_thing_part(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') && !s.is_empty() {
        write!(f, "{s}")
    } else {
        write!(f, "⟨{s}⟩")
    }
}

/// Renders an `f64` via Rust's shortest round-trip `Display`, which is
/// what `ryu`-class formatters also converge on for finite values.
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    write!(f, "{n}")
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Null => write!(f, "null"),
            JsonValue::Bool(b) => write!(f, "{b}"),
            JsonValue::Number(n) => write_float(f, *n),
            JsonValue::String(s) => write!(f, "{:?}", s),
            JsonValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            JsonValue::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:?}:{v}", k)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThingId::String(s) => write_thing_part(f, s),
            ThingId::Int(i) => write!(f, "{i}"),
            ThingId::Float(n) => write_float(f, *n),
            ThingId::Bool(b) => write!(f, "{b}"),
            ThingId::Date(d) => write!(f, "⟨{d}⟩"),
            ThingId::Time(t) => write!(f, "⟨{t}⟩"),
        }
    }
}

impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_thing_part(f, &self.table)?;
        write!(f, ":{}", self.id)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::All => write!(f, "*"),
            Literal::Any => write!(f, "?"),
            Literal::Null => write!(f, "NULL"),
            Literal::Void => write!(f, "VOID"),
            Literal::Empty => write!(f, "EMPTY"),
            Literal::Missing => write!(f, "MISSING"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Number(n) => write_float(f, *n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Duration(nanos) => write!(f, "{}ns", nanos),
            Literal::Date(d) => write!(f, "\"{d}\""),
            Literal::Time(t) => write!(f, "\"{t}\""),
            Literal::Regex(s) => write!(f, "/{s}/"),
            Literal::Json(v) => write!(f, "{v}"),
            Literal::Array(items) => write!(f, "{}", JsonValue::Array(items.clone())),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Exq => "==",
            BinaryOp::Nex => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Fuzzy => "?=",
            BinaryOp::Inside => "IN",
            BinaryOp::NotInside => "IS NOT IN",
            BinaryOp::Contains => "CONTAINS",
            BinaryOp::ContainsNot => "CONTAINS NOT",
            BinaryOp::ContainsAll => "CONTAINSALL",
            BinaryOp::ContainsAny => "CONTAINSANY",
            BinaryOp::ContainsNone => "CONTAINSNONE",
            BinaryOp::AllInside => "ALLINSIDE",
            BinaryOp::AnyInside => "ANYINSIDE",
            BinaryOp::NoneInside => "NONEINSIDE",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Join::Dot => ".",
            Join::Arrow => "->",
            Join::ArrowBack => "<-",
            Join::ArrowBoth => "<->",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(l) => write!(f, "{l}"),
            Expression::Ident(s) => write_ident(f, s),
            Expression::Param(s) => write!(f, "${s}"),
            Expression::Table(s) => write_ident(f, s),
            Expression::Thing(t) => write!(f, "{t}"),
            Expression::Value => write!(f, "VALUE"),
            Expression::Model(s) => write!(f, "|{s}|"),
            Expression::Sub(e) => write!(f, "({e})"),
            Expression::Unary { op, rhs } => write!(f, "{op}{rhs}"),
            Expression::Binary { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Expression::Func { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expression::Ifel { branches, else_ } => {
                write!(f, "IF ")?;
                for (i, (cond, then)) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ELSE IF ")?;
                    }
                    write!(f, "{cond} THEN {then}")?;
                }
                if let Some(e) = else_ {
                    write!(f, " ELSE {e}")?;
                }
                write!(f, " END")
            }
            Expression::Path(parts) => {
                for part in parts {
                    if let Some(join) = &part.join {
                        write!(f, "{join}")?;
                    }
                    write!(f, "{}", part.expr)?;
                }
                Ok(())
            }
            Expression::Subquery(stmt) => write!(f, "({stmt})"),
            Expression::Data(data) => write!(f, "{data}"),
            Expression::Perm(perms) => write!(f, "{perms}"),
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Set(items) => {
                write!(f, "SET ")?;
                for (i, (lhs, op, rhs)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{lhs} {op} {rhs}")?;
                }
                Ok(())
            }
            Data::Content(e) => write!(f, "CONTENT {e}"),
            Data::Merge(e) => write!(f, "MERGE {e}"),
            Data::Diff(e) => write!(f, "DIFF {e}"),
        }
    }
}

impl fmt::Display for Echo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Echo::None => "NONE",
            Echo::Before => "BEFORE",
            Echo::After => "AFTER",
            Echo::Diff => "DIFF",
            Echo::Both => "BOTH",
            Echo::Id => "ID",
            Echo::Info => "INFO",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for PermRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermRule::Full => write!(f, "FULL"),
            PermRule::None => write!(f, "NONE"),
            PermRule::Where(e) => write!(f, "WHERE {e}"),
        }
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PERMISSIONS FOR SELECT {} FOR CREATE {} FOR UPDATE {} FOR DELETE {}",
            self.select, self.create, self.update, self.delete
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS ")?;
            write_ident(f, alias)?;
        }
        Ok(())
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(timeout) = self.timeout {
            write!(f, " TIMEOUT {timeout}ns")?;
        }
        if self.parallel {
            write!(f, " PARALLEL")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        write_list(f, &self.expr)?;
        write!(f, " FROM ")?;
        write_list(f, &self.what)?;
        if let Some(cond) = &self.cond {
            write!(f, " WHERE {cond}")?;
        }
        if self.group_all {
            write!(f, " GROUP ALL")?;
        } else if !self.group.is_empty() {
            write!(f, " GROUP BY ")?;
            write_list(f, &self.group)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(start) = &self.start {
            write!(f, " START {start}")?;
        }
        write!(f, "{}", self.meta)
    }
}

impl fmt::Display for CreateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE ")?;
        write_list(f, &self.what)?;
        if let Some(data) = &self.data {
            write!(f, " {data}")?;
        }
        write!(f, " RETURN {}", self.echo)?;
        write!(f, "{}", self.meta)
    }
}

impl fmt::Display for UpdateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE ")?;
        write_list(f, &self.what)?;
        if let Some(data) = &self.data {
            write!(f, " {data}")?;
        }
        if let Some(cond) = &self.cond {
            write!(f, " WHERE {cond}")?;
        }
        write!(f, " RETURN {}", self.echo)?;
        write!(f, "{}", self.meta)
    }
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE")?;
        if self.hard {
            write!(f, " AND EXPUNGE")?;
        }
        write!(f, " ")?;
        write_list(f, &self.what)?;
        if let Some(cond) = &self.cond {
            write!(f, " WHERE {cond}")?;
        }
        write!(f, " RETURN {}", self.echo)?;
        write!(f, "{}", self.meta)
    }
}

impl fmt::Display for RelateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RELATE {}", self.from)?;
        if self.reversed {
            write!(f, "<-{}<-", self.kind)?;
        } else {
            write!(f, "->{}->", self.kind)?;
        }
        write!(f, "{}", self.with)?;
        if self.unique {
            write!(f, " UNIQUE")?;
        }
        if let Some(data) = &self.data {
            write!(f, " {data}")?;
        }
        write!(f, " RETURN {}", self.echo)?;
        write!(f, "{}", self.meta)
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} INTO {}", if self.upsert { "UPSERT" } else { "INSERT" }, self.data, self.into)?;
        write!(f, " RETURN {}", self.echo)?;
        write!(f, "{}", self.meta)
    }
}

impl fmt::Display for LiveStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIVE SELECT ")?;
        if self.diff {
            write!(f, "DIFF ")?;
        } else {
            write_list(f, &self.expr)?;
            write!(f, " ")?;
        }
        write!(f, "FROM {}", self.what)?;
        if let Some(cond) = &self.cond {
            write!(f, " WHERE {cond}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DefineStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DEFINE ")?;
        match self {
            DefineStatement::Namespace(name) => write!(f, "NAMESPACE {name}"),
            DefineStatement::Database(name) => write!(f, "DATABASE {name}"),
            DefineStatement::Login(l) => write!(f, "LOGIN {}", l.name),
            DefineStatement::Token(t) => write!(f, "TOKEN {}", t.name),
            DefineStatement::Scope(s) => write!(f, "SCOPE {}", s.name),
            DefineStatement::Table(t) => write!(f, "TABLE {}", t.name),
            DefineStatement::Event(e) => write!(f, "EVENT {} ON {}", e.name, e.table),
            DefineStatement::Field(field) => {
                write!(f, "FIELD {} ON {}", field.name, field.table)?;
                if let Some(kind) = &field.kind {
                    write!(f, " TYPE {kind}")?;
                }
                if let Some(min) = &field.min {
                    write!(f, " MIN {min}")?;
                }
                if let Some(max) = &field.max {
                    write!(f, " MAX {max}")?;
                }
                if let Some(enum_values) = &field.enum_values {
                    write!(f, " ENUM {enum_values}")?;
                }
                if let Some(code) = &field.code {
                    write!(f, " CODE {code}")?;
                }
                if let Some(regex_match) = &field.regex_match {
                    write!(f, " MATCH {regex_match}")?;
                }
                if let Some(default) = &field.default {
                    write!(f, " DEFAULT {default}")?;
                }
                if field.readonly {
                    write!(f, " READONLY")?;
                }
                if field.mandatory {
                    write!(f, " MANDATORY")?;
                }
                if field.notnull {
                    write!(f, " NOTNULL")?;
                }
                if let Some(validate) = &field.validate {
                    write!(f, " VALIDATE {validate}")?;
                }
                if let Some(perms) = &field.perms {
                    write!(f, " PERMISSIONS {perms}")?;
                }
                Ok(())
            }
            DefineStatement::Index(idx) => {
                write!(f, "INDEX {} ON ", idx.name)?;
                write_list(f, &idx.what)?;
                write!(f, " COLUMNS {}", idx.cols.join(", "))?;
                if idx.unique {
                    write!(f, " UNIQUE")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RemoveStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REMOVE ")?;
        match self {
            RemoveStatement::Namespace(name) => write!(f, "NAMESPACE {name}"),
            RemoveStatement::Database(name) => write!(f, "DATABASE {name}"),
            RemoveStatement::Login(name) => write!(f, "LOGIN {name}"),
            RemoveStatement::Token(name) => write!(f, "TOKEN {name}"),
            RemoveStatement::Scope(name) => write!(f, "SCOPE {name}"),
            RemoveStatement::Table(name) => write!(f, "TABLE {name}"),
            RemoveStatement::Event { name, table } => write!(f, "EVENT {name} ON {table}"),
            RemoveStatement::Field { name, table } => write!(f, "FIELD {name} ON {table}"),
            RemoveStatement::Index { name, table } => write!(f, "INDEX {name} ON {table}"),
        }
    }
}

impl fmt::Display for InfoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoTarget::Kv => write!(f, "INFO FOR KV"),
            InfoTarget::Ns => write!(f, "INFO FOR NS"),
            InfoTarget::Db => write!(f, "INFO FOR DB"),
            InfoTarget::Scope(name) => write!(f, "INFO FOR SCOPE {name}"),
            InfoTarget::Table(name) => write!(f, "INFO FOR TABLE {name}"),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Begin => write!(f, "BEGIN TRANSACTION"),
            Statement::Cancel => write!(f, "CANCEL TRANSACTION"),
            Statement::Commit => write!(f, "COMMIT TRANSACTION"),
            Statement::Use { ns, db } => {
                write!(f, "USE")?;
                if let Some(ns) = ns {
                    write!(f, " NAMESPACE {ns}")?;
                }
                if let Some(db) = db {
                    write!(f, " DATABASE {db}")?;
                }
                Ok(())
            }
            Statement::Let { name, value } => write!(f, "LET ${name} = {value}"),
            Statement::Return(e) => write!(f, "RETURN {e}"),
            Statement::If(e) => write!(f, "{e}"),
            Statement::Info(target) => write!(f, "{target}"),
            Statement::Select(s) => write!(f, "{s}"),
            Statement::Create(s) => write!(f, "{s}"),
            Statement::Update(s) => write!(f, "{s}"),
            Statement::Delete(s) => write!(f, "{s}"),
            Statement::Relate(s) => write!(f, "{s}"),
            Statement::Insert(s) => write!(f, "{s}"),
            Statement::Live(s) => write!(f, "{s}"),
            Statement::Kill(e) => write!(f, "KILL {e}"),
            Statement::Define(s) => write!(f, "{s}"),
            Statement::Remove(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt};")?;
        }
        Ok(())
    }
}

/// Used by the aggregation check to name the offending field in a
/// `ParseError::Group`.
pub fn print_expr(expr: &Expression) -> String {
    expr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_quote_only_when_needed() {
        assert!(!ident_needs_quoting("firstname"));
        assert!(ident_needs_quoting("select"));
        assert!(ident_needs_quoting("has space"));
    }

    #[test]
    fn thing_prints_as_table_colon_id() {
        let thing = Thing { table: "person".to_string(), id: ThingId::Int(123) };
        assert_eq!(thing.to_string(), "person:123");
    }

    #[test]
    fn select_round_trips_textually() {
        let stmt = SelectStatement {
            expr: vec![Field { expr: Expression::Literal(Literal::All), alias: None }],
            what: vec![Expression::Table("person".to_string())],
            cond: None,
            split: vec![],
            group_all: false,
            group: vec![],
            order: vec![],
            limit: None,
            start: None,
            fetch: vec![],
            version: None,
            meta: Meta::default(),
        };
        assert_eq!(stmt.to_string(), "SELECT * FROM person");
    }
}
