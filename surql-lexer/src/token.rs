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

//! The fixed enumeration of lexical categories recognized by the scanner,
//! partitioned into three contiguous ranges (literals, operators, keywords)
//! bounded by sentinel markers so that range membership is a single
//! comparison rather than a match over every variant.

use std::fmt;

/// A single lexical category.
///
/// Variants are grouped into three contiguous bands delimited by the
/// `*_BEG`/`*_END` sentinels below. Adding a token means inserting it inside
/// the right band and nowhere else, or the sentinel comparisons silently go
/// stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
#[repr(u16)]
pub enum Token {
    /// End of input.
    Eof,
    /// A lexical error; carries no payload itself, the offending text is
    /// reported out of band by the scanner.
    Illegal,
    /// Whitespace and comments, filtered by the parser rather than the
    /// scanner so that a caller inspecting raw tokens can still see them.
    Ws,

    LiteralsBeg,
    Ident,
    /// An identifier quoted with `⟨...⟩` or produced by unescaping a
    /// backtick-quoted identifier; distinguished from `Ident` because it
    /// must never be re-interpreted as a keyword.
    Expr,
    Param,
    Table,
    Thing,
    Number,
    Double,
    String,
    /// Reserved for geometry literals (`POINT`, `POLYGON`, ...). The
    /// scanner never emits this on its own; it exists so the Value
    /// Constructor has a stable arm to grow into.
    Region,
    Regex,
    Duration,
    Date,
    Time,
    Json,
    Array,
    /// `|model:1,2..3|` style inline model reference.
    Model,
    True,
    False,
    Null,
    Void,
    Empty,
    Missing,
    /// The bare `VALUE` keyword used as an expression (refers to the
    /// current field's incoming value inside `DEFINE FIELD`/`ASSERT`).
    Value,
    LiteralsEnd,

    OperatorsBeg,
    Mul,  // *, also the `All` literal spelling
    Qmark, // ?, also the `Any` literal spelling
    Add,
    Sub,
    Div,
    Eq,
    Neq,
    Exq, // ==
    Nex, // !==
    Lt,
    Lte,
    Gt,
    Gte,
    Fuzzy, // ?=
    Inside,       // IN, ∈
    NotInside,    // IS NOT IN, ∉
    Contains,     // CONTAINS, ∋
    ContainsNot,  // CONTAINS NOT, ∌
    ContainsAll,
    ContainsAny,
    ContainsNone,
    AllInside,
    AnyInside,
    NoneInside,
    And,
    Or,
    Not,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Dollar,
    Arrow,      // ->
    ArrowBack,  // <-
    ArrowBoth,  // <->
    OperatorsEnd,

    KeywordsBeg,
    Select,
    Create,
    Update,
    Delete,
    Relate,
    Insert,
    Upsert,
    Live,
    Kill,
    Define,
    Remove,
    Namespace,
    Database,
    Login,
    Token,
    Scope,
    Session,
    Signup,
    Signin,
    TableKw,
    Event,
    Field,
    Index,
    Let,
    Return,
    If,
    Else,
    Then,
    End,
    Info,
    Begin,
    Cancel,
    Commit,
    Transaction,
    Use,
    Ns,
    Db,
    From,
    Into,
    Where,
    Split,
    On,
    Group,
    By,
    All,
    Order,
    Asc,
    Desc,
    Collate,
    Numeric,
    Limit,
    Start,
    At,
    Fetch,
    Version,
    Timeout,
    Parallel,
    Set,
    Content,
    Merge,
    Diff,
    Unique,
    Expunge,
    Permissions,
    Full,
    None_,
    For,
    Min,
    Max,
    Type,
    Enum,
    Code,
    Match,
    Default,
    Notnull,
    Readonly,
    Mandatory,
    Validate,
    Columns,
    Both,
    Id,
    Before,
    After,
    When,
    Password,
    Passhash,
    /// The `IS` keyword. Never appears in a finished AST: the statement
    /// parser rewrites `IS`, `IS NOT`, `IS IN`, and `IS NOT IN` into
    /// `Eq`/`Neq`/`Inside`/`NotInside` before building the expression node.
    Is,
    KeywordsEnd,
}

pub(crate) use Token::*;

const KEYWORD_TABLE: &[(&str, Token)] = &[
    ("SELECT", Select),
    ("CREATE", Create),
    ("UPDATE", Update),
    ("DELETE", Delete),
    ("RELATE", Relate),
    ("INSERT", Insert),
    ("UPSERT", Upsert),
    ("LIVE", Live),
    ("KILL", Kill),
    ("DEFINE", Define),
    ("REMOVE", Remove),
    ("NAMESPACE", Namespace),
    ("DATABASE", Database),
    ("LOGIN", Login),
    ("TOKEN", Token),
    ("SCOPE", Scope),
    ("SESSION", Session),
    ("SIGNUP", Signup),
    ("SIGNIN", Signin),
    ("TABLE", TableKw),
    ("EVENT", Event),
    ("FIELD", Field),
    ("INDEX", Index),
    ("LET", Let),
    ("RETURN", Return),
    ("IF", If),
    ("ELSE", Else),
    ("THEN", Then),
    ("END", End),
    ("INFO", Info),
    ("BEGIN", Begin),
    ("CANCEL", Cancel),
    ("COMMIT", Commit),
    ("TRANSACTION", Transaction),
    ("USE", Use),
    ("NS", Ns),
    ("DB", Db),
    ("FROM", From),
    ("INTO", Into),
    ("WHERE", Where),
    ("SPLIT", Split),
    ("ON", On),
    ("GROUP", Group),
    ("BY", By),
    ("ALL", All),
    ("ORDER", Order),
    ("ASC", Asc),
    ("DESC", Desc),
    ("COLLATE", Collate),
    ("NUMERIC", Numeric),
    ("LIMIT", Limit),
    ("START", Start),
    ("AT", At),
    ("FETCH", Fetch),
    ("VERSION", Version),
    ("TIMEOUT", Timeout),
    ("PARALLEL", Parallel),
    ("SET", Set),
    ("CONTENT", Content),
    ("MERGE", Merge),
    ("DIFF", Diff),
    ("UNIQUE", Unique),
    ("EXPUNGE", Expunge),
    ("PERMISSIONS", Permissions),
    ("FULL", Full),
    ("NONE", None_),
    ("FOR", For),
    ("MIN", Min),
    ("MAX", Max),
    ("TYPE", Type),
    ("ENUM", Enum),
    ("CODE", Code),
    ("MATCH", Match),
    ("DEFAULT", Default),
    ("NOTNULL", Notnull),
    ("READONLY", Readonly),
    ("MANDATORY", Mandatory),
    ("VALIDATE", Validate),
    ("COLUMNS", Columns),
    ("BOTH", Both),
    ("ID", Id),
    ("BEFORE", Before),
    ("AFTER", After),
    ("WHEN", When),
    ("PASSWORD", Password),
    ("PASSHASH", Passhash),
    ("AND", And),
    ("OR", Or),
    ("NOT", Not),
    ("IN", Inside),
    ("CONTAINS", Contains),
    ("CONTAINSALL", ContainsAll),
    ("CONTAINSANY", ContainsAny),
    ("CONTAINSNONE", ContainsNone),
    ("ALLINSIDE", AllInside),
    ("ANYINSIDE", AnyInside),
    ("NONEINSIDE", NoneInside),
    ("IS", Is),
    ("TRUE", True),
    ("FALSE", False),
    ("NULL", Null),
    ("VOID", Void),
    ("EMPTY", Empty),
    ("MISSING", Missing),
    ("VALUE", Value),
];

impl Token {
    /// `tok ∈ {LiteralsBeg+1 .. LiteralsEnd-1}`.
    pub fn is_literal(self) -> bool {
        (LiteralsBeg as u16) < (self as u16) && (self as u16) < (LiteralsEnd as u16)
    }

    /// `tok ∈ {OperatorsBeg+1 .. OperatorsEnd-1}`.
    pub fn is_operator(self) -> bool {
        (OperatorsBeg as u16) < (self as u16) && (self as u16) < (OperatorsEnd as u16)
    }

    /// `tok ∈ {KeywordsBeg+1 .. KeywordsEnd-1}`.
    pub fn is_keyword(self) -> bool {
        (KeywordsBeg as u16) < (self as u16) && (self as u16) < (KeywordsEnd as u16)
    }

    /// Case-insensitive keyword lookup. Returns [`Token::Illegal`] for
    /// anything that isn't a recognized keyword, mirroring the scanner's
    /// convention of never surfacing a bare `Option` for this path.
    pub fn from_name(name: &str) -> Token {
        let upper = name.to_ascii_uppercase();
        KEYWORD_TABLE
            .iter()
            .find(|(spelling, _)| *spelling == upper)
            .map(|(_, tok)| *tok)
            .unwrap_or(Illegal)
    }

    /// The canonical uppercase spelling of a keyword or symbolic operator,
    /// used by the pretty-printer. Panics on tokens that have no fixed
    /// spelling (literals, EOF, illegal, whitespace) — those are a parser
    /// bug, not a user-facing condition.
    pub fn to_name(self) -> &'static str {
        match self {
            Mul => "*",
            Qmark => "?",
            Add => "+",
            Sub => "-",
            Div => "/",
            Eq => "=",
            Neq => "!=",
            Exq => "==",
            Nex => "!==",
            Lt => "<",
            Lte => "<=",
            Gt => ">",
            Gte => ">=",
            Fuzzy => "?=",
            Inside => "IN",
            NotInside => "NOT IN",
            Contains => "CONTAINS",
            ContainsNot => "CONTAINS NOT",
            ContainsAll => "CONTAINSALL",
            ContainsAny => "CONTAINSANY",
            ContainsNone => "CONTAINSNONE",
            AllInside => "ALLINSIDE",
            AnyInside => "ANYINSIDE",
            NoneInside => "NONEINSIDE",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LBrace => "{",
            RBrace => "}",
            Comma => ",",
            Dot => ".",
            Colon => ":",
            Semicolon => ";",
            Dollar => "$",
            Arrow => "->",
            ArrowBack => "<-",
            ArrowBoth => "<->",
            _ => {
                for (spelling, tok) in KEYWORD_TABLE {
                    if *tok as u16 == self as u16 {
                        return spelling;
                    }
                }
                "<unnamed>"
            }
        }
    }

    /// Binary operator precedence, `0..=5`. Non-operators are `0`. `OR` and
    /// `AND` are *not* fused: `AND` binds tighter, matching
    /// `parse("a OR b AND c") == (a OR (b AND c))`.
    pub fn precedence(self) -> u8 {
        match self {
            Or => 1,
            And => 2,
            Eq | Neq | Exq | Nex | Lt | Lte | Gt | Gte | Fuzzy | Is | Inside | NotInside
            | Contains | ContainsNot | ContainsAll | ContainsAny | ContainsNone | AllInside
            | AnyInside | NoneInside => 3,
            Add | Sub => 4,
            Mul | Div => 5,
            _ => 0,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eof => write!(f, "EOF"),
            Illegal => write!(f, "ILLEGAL"),
            Ws => write!(f, "WS"),
            Ident => write!(f, "identifier"),
            Expr => write!(f, "quoted identifier"),
            Param => write!(f, "parameter"),
            Table => write!(f, "table"),
            Thing => write!(f, "record id"),
            Number => write!(f, "number"),
            Double => write!(f, "float"),
            String => write!(f, "string"),
            Region => write!(f, "geometry"),
            Regex => write!(f, "regex"),
            Duration => write!(f, "duration"),
            Date => write!(f, "date"),
            Time => write!(f, "datetime"),
            Json => write!(f, "object"),
            Array => write!(f, "array"),
            Model => write!(f, "model"),
            tok if tok.is_operator() || tok.is_keyword() => write!(f, "{}", tok.to_name()),
            _ => write!(f, "{self:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use enum_iterator::all;

    use super::*;

    #[test]
    fn bands_are_mutually_exclusive_and_cover_every_keyword_and_operator() {
        for tok in all::<Token>() {
            let bands = [tok.is_literal(), tok.is_operator(), tok.is_keyword()];
            assert!(bands.iter().filter(|b| **b).count() <= 1, "{tok:?} is in more than one band");
        }
    }

    #[test]
    fn every_keyword_round_trips_through_from_name() {
        for (spelling, tok) in KEYWORD_TABLE {
            assert!(
                tok.is_keyword() || tok.is_operator(),
                "{spelling} maps outside the keyword/operator bands"
            );
            assert_eq!(Token::from_name(spelling), *tok);
            assert_eq!(Token::from_name(&spelling.to_ascii_lowercase()), *tok);
        }
    }

    #[test]
    fn unknown_identifiers_are_illegal_keywords() {
        assert_eq!(Token::from_name("not_a_keyword"), Token::Illegal);
        assert_eq!(Token::from_name(""), Token::Illegal);
    }

    #[test]
    fn precedence_layers_or_below_and() {
        assert!(Or.precedence() < And.precedence());
        assert!(And.precedence() < Eq.precedence());
        assert!(Eq.precedence() < Add.precedence());
        assert!(Add.precedence() < Mul.precedence());
        assert_eq!(Ident.precedence(), 0);
    }

    #[test]
    fn is_shares_the_comparison_layer() {
        assert_eq!(Is.precedence(), Eq.precedence());
    }
}
