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

//! The AST: one sum type per layer (Query/Statement, Expression, Literal),
//! matching the source's own layering rather than a universal `Any` node.

/// A parsed lenient-JSON value, used for both `JSON` objects and `ARRAY`
/// blobs — the scanner hands both to the same decoder in [`crate::value`].
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<JsonValue>),
    Object(Vec<(String, JsonValue)>),
}

/// `table:id`. `id` is recursively re-typed by the Value Constructor if it
/// parses as an int, float, bool, date, or time.
#[derive(Debug, Clone, PartialEq)]
pub struct Thing {
    pub table: String,
    pub id: ThingId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThingId {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(jiff::civil::Date),
    Time(jiff::Timestamp),
}

/// Literal leaves of an [`Expression`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    All,
    Any,
    Null,
    Void,
    Empty,
    Missing,
    Bool(bool),
    Number(f64),
    String(String),
    Duration(u64),
    Date(jiff::civil::Date),
    Time(jiff::Timestamp),
    Regex(String),
    Json(JsonValue),
    Array(Vec<JsonValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Exq,
    Nex,
    Lt,
    Lte,
    Gt,
    Gte,
    Fuzzy,
    Inside,
    NotInside,
    Contains,
    ContainsNot,
    ContainsAll,
    ContainsAny,
    ContainsNone,
    AllInside,
    AnyInside,
    NoneInside,
    And,
    Or,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Or => 1,
            And => 2,
            Eq | Neq | Exq | Nex | Lt | Lte | Gt | Gte | Fuzzy | Inside | NotInside | Contains
            | ContainsNot | ContainsAll | ContainsAny | ContainsNone | AllInside | AnyInside
            | NoneInside => 3,
            Add | Sub => 4,
            Mul | Div => 5,
        }
    }
}

/// A single hop of a [`Expression::Path`]: either a `.field` member access
/// or a graph edge traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Join {
    Dot,
    Arrow,
    ArrowBack,
    ArrowBoth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathPart {
    pub join: Option<Join>,
    pub expr: Box<Expression>,
}

/// The write-data clause shared by CREATE/UPDATE/INSERT/UPSERT/RELATE.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Set(Vec<(Expression, BinaryOp, Expression)>),
    Content(Expression),
    Merge(Expression),
    Diff(Expression),
}

/// `RETURN {NONE|BEFORE|AFTER|DIFF|BOTH|ID|INFO}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Echo {
    None,
    Before,
    #[default]
    After,
    Diff,
    Both,
    Id,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermVerb {
    Select,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PermRule {
    Full,
    None,
    Where(Expression),
}

/// `PERMISSIONS` clause: either one rule applied to all four verbs, or a
/// per-verb map.
#[derive(Debug, Clone, PartialEq)]
pub struct Perms {
    pub select: PermRule,
    pub create: PermRule,
    pub update: PermRule,
    pub delete: PermRule,
}

impl Perms {
    pub fn uniform(rule: PermRule) -> Self {
        Perms {
            select: rule.clone(),
            create: rule.clone(),
            update: rule.clone(),
            delete: rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expression,
    pub collate: Option<String>,
    pub numeric: bool,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub expr: Expression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Ident(String),
    Param(String),
    Table(String),
    Thing(Thing),
    Value,
    Model(String),
    Sub(Box<Expression>),
    Unary { op: BinaryOp, rhs: Box<Expression> },
    Binary { lhs: Box<Expression>, op: BinaryOp, rhs: Box<Expression> },
    Func { name: String, args: Vec<Expression>, aggregate: bool },
    Ifel { branches: Vec<(Expression, Expression)>, else_: Option<Box<Expression>> },
    Path(Vec<PathPart>),
    Subquery(Box<Statement>),
    Data(Data),
    Perm(Perms),
}

/// Every non-transactional statement carries the storage root it will run
/// against plus an optional timeout/parallelism hint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Meta {
    pub timeout: Option<u64>,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub expr: Vec<Field>,
    pub what: Vec<Expression>,
    pub cond: Option<Expression>,
    pub split: Vec<Expression>,
    pub group_all: bool,
    pub group: Vec<Expression>,
    pub order: Vec<OrderItem>,
    pub limit: Option<Expression>,
    pub start: Option<Expression>,
    pub fetch: Vec<String>,
    pub version: Option<Expression>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStatement {
    pub what: Vec<Expression>,
    pub data: Option<Data>,
    pub echo: Echo,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub what: Vec<Expression>,
    pub data: Option<Data>,
    pub cond: Option<Expression>,
    pub echo: Echo,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub hard: bool,
    pub what: Vec<Expression>,
    pub cond: Option<Expression>,
    pub echo: Echo,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelateStatement {
    pub from: Expression,
    pub kind: Expression,
    pub with: Expression,
    pub reversed: bool,
    pub unique: bool,
    pub data: Option<Data>,
    pub echo: Echo,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub upsert: bool,
    pub into: Expression,
    pub data: Data,
    pub echo: Echo,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveStatement {
    pub diff: bool,
    pub expr: Vec<Field>,
    pub what: Expression,
    pub cond: Option<Expression>,
    pub fetch: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineFieldStatement {
    pub name: String,
    pub table: String,
    pub kind: Option<String>,
    pub min: Option<Expression>,
    pub max: Option<Expression>,
    pub enum_values: Option<Expression>,
    pub code: Option<Expression>,
    pub regex_match: Option<Expression>,
    pub default: Option<Expression>,
    pub readonly: bool,
    pub mandatory: bool,
    pub notnull: bool,
    pub validate: Option<Expression>,
    pub perms: Option<Perms>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineIndexStatement {
    pub name: String,
    pub what: Vec<Expression>,
    pub cols: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineTableStatement {
    pub name: String,
    pub schemaless: bool,
    pub perms: Option<Perms>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineEventStatement {
    pub name: String,
    pub table: String,
    pub when: Expression,
    pub then: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineScopeStatement {
    pub name: String,
    pub session: Option<u64>,
    pub signup: Option<Expression>,
    pub signin: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineLoginStatement {
    pub name: String,
    pub on_scope: Option<String>,
    pub password: Option<String>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineTokenStatement {
    pub name: String,
    pub on_scope: Option<String>,
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefineStatement {
    Namespace(String),
    Database(String),
    Login(DefineLoginStatement),
    Token(DefineTokenStatement),
    Scope(DefineScopeStatement),
    Table(DefineTableStatement),
    Event(DefineEventStatement),
    Field(DefineFieldStatement),
    Index(DefineIndexStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveStatement {
    Namespace(String),
    Database(String),
    Login(String),
    Token(String),
    Scope(String),
    Table(String),
    Event { name: String, table: String },
    Field { name: String, table: String },
    Index { name: String, table: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoTarget {
    Kv,
    Ns,
    Db,
    Scope(String),
    Table(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Begin,
    Cancel,
    Commit,
    Use { ns: Option<String>, db: Option<String> },
    Let { name: String, value: Expression },
    Return(Expression),
    If(Expression),
    Info(InfoTarget),
    Select(SelectStatement),
    Create(CreateStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Relate(RelateStatement),
    Insert(InsertStatement),
    Live(LiveStatement),
    Kill(Expression),
    Define(DefineStatement),
    Remove(RemoveStatement),
}

/// An ordered sequence of [`Statement`]s. Empty input never reaches this
/// type — the parser rejects it with `ParseError::Empty` first.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub statements: Vec<Statement>,
}
