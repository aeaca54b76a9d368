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

use surql_lexer::{LexError, Lexer, Token};

fn lex(sql: &str) -> Vec<Result<(Token, &str), LexError>> {
    Lexer::new(sql)
        .map(|res| res.map(|lexeme| (lexeme.token, lexeme.literal)))
        .collect()
}

fn lex_skip_ws(sql: &str) -> Vec<Token> {
    lex(sql)
        .into_iter()
        .filter_map(|r| r.ok())
        .map(|(tok, _)| tok)
        .filter(|tok| !matches!(tok, Token::Ws))
        .collect()
}

#[test]
fn test_basic_statement() {
    let tokens = lex_skip_ws("SELECT * FROM person WHERE age > 18");
    assert_eq!(
        tokens,
        vec![
            Token::Select,
            Token::Mul,
            Token::From,
            Token::Ident,
            Token::Where,
            Token::Ident,
            Token::Gt,
            Token::Number,
            Token::Eof,
        ]
    );
}

#[test]
fn test_complex_query() {
    let tokens = lex_skip_ws("SELECT * FROM person WHERE age > 18 AND name = 'Tobie' OR age < 5");
    assert_eq!(
        tokens,
        vec![
            Token::Select,
            Token::Mul,
            Token::From,
            Token::Ident,
            Token::Where,
            Token::Ident,
            Token::Gt,
            Token::Number,
            Token::And,
            Token::Ident,
            Token::Eq,
            Token::String,
            Token::Or,
            Token::Ident,
            Token::Lt,
            Token::Number,
            Token::Eof,
        ]
    );
}

#[test]
fn test_comments_are_whitespace() {
    let sql = "
        # hash comment
        -- dash comment
        SELECT 1;
        /* block
           comment */
        SELECT 2;
    ";
    let tokens = lex_skip_ws(sql);
    assert_eq!(
        tokens,
        vec![
            Token::Select,
            Token::Number,
            Token::Semicolon,
            Token::Select,
            Token::Number,
            Token::Semicolon,
            Token::Eof,
        ]
    );
}

#[test]
fn test_string_escapes() {
    let tokens = lex(r#"'it\'s' "a\"b""#);
    let toks: Vec<_> = tokens.into_iter().filter_map(|r| r.ok()).map(|(t, _)| t).collect();
    assert_eq!(toks, vec![Token::String, Token::Ws, Token::String, Token::Eof]);
}

#[test]
fn test_numbers_and_dot_ambiguity() {
    let tokens = lex_skip_ws("123 123.456 1e10 1.2e-3 .5 1.2.3");
    assert_eq!(
        tokens,
        vec![
            Token::Number,
            Token::Double,
            Token::Double,
            Token::Double,
            Token::Double,
            Token::Ident, // 1.2.3 collapses to an identifier
            Token::Eof,
        ]
    );
}

#[test]
fn test_dot_then_number_vs_number_then_dot() {
    // "1." scans as NUMBER followed by DOT (no digit follows the dot).
    let tokens = lex_skip_ws("1. x");
    assert_eq!(tokens, vec![Token::Number, Token::Dot, Token::Ident, Token::Eof]);
}

#[test]
fn test_symbols() {
    let tokens = lex_skip_ws("+ - * / = == != !== < > <= >= ? ?= ( ) , . : ; -> <- <->");
    assert_eq!(
        tokens,
        vec![
            Token::Add,
            Token::Sub,
            Token::Mul,
            Token::Div,
            Token::Eq,
            Token::Exq,
            Token::Neq,
            Token::Nex,
            Token::Lt,
            Token::Gt,
            Token::Lte,
            Token::Gte,
            Token::Qmark,
            Token::Fuzzy,
            Token::LParen,
            Token::RParen,
            Token::Comma,
            Token::Dot,
            Token::Colon,
            Token::Semicolon,
            Token::Arrow,
            Token::ArrowBack,
            Token::ArrowBoth,
            Token::Eof,
        ]
    );
}

#[test]
fn test_keywords_are_case_insensitive() {
    let tokens = lex_skip_ws("SeLeCt * FrOm person wHeRe id = 1");
    assert_eq!(
        tokens,
        vec![
            Token::Select,
            Token::Mul,
            Token::From,
            Token::Ident,
            Token::Where,
            Token::Id,
            Token::Eq,
            Token::Number,
            Token::Eof,
        ]
    );
}

#[test]
fn test_scanner_errors() {
    let results = lex("'unterminated");
    assert_eq!(results.last(), Some(&Err(LexError::UnterminatedString)));

    let results = lex("/* unterminated");
    assert_eq!(results.last(), Some(&Err(LexError::UnterminatedBlockComment)));

    let results = lex("{\"a\": 1");
    assert_eq!(results.last(), Some(&Err(LexError::UnterminatedObject)));

    let results = lex("[1, 2");
    assert_eq!(results.last(), Some(&Err(LexError::UnterminatedArray)));
}

#[test]
fn test_things() {
    let (tok, lit) = lex_skip_ws_literal("person:tobie");
    assert_eq!(tok, Token::Thing);
    assert_eq!(lit, "person:tobie");

    let (tok, lit) = lex_skip_ws_literal("person:⟨john doe⟩");
    assert_eq!(tok, Token::Thing);
    assert_eq!(lit, "person:⟨john doe⟩");
}

#[test]
fn test_legacy_at_prefixed_things() {
    // The legacy `@table:id` spelling lexes to the same THING token, with
    // the same literal, as the post-layer bare `table:id` form.
    let (tok, lit) = lex_skip_ws_literal("@person:tobie");
    assert_eq!(tok, Token::Thing);
    assert_eq!(lit, "person:tobie");

    let (tok, lit) = lex_skip_ws_literal("@person:⟨1987-06-22T08:30:30.511Z⟩");
    assert_eq!(tok, Token::Thing);
    assert_eq!(lit, "person:⟨1987-06-22T08:30:30.511Z⟩");
}

#[test]
fn test_bare_at_sign_without_a_thing_is_an_error() {
    let results = lex("@ person");
    assert!(matches!(results.first(), Some(Err(LexError::UnexpectedChar('@')))));
}

fn lex_skip_ws_literal(sql: &str) -> (Token, &str) {
    Lexer::new(sql)
        .filter_map(|r| r.ok())
        .find(|lex| lex.token != Token::Ws)
        .map(|lex| (lex.token, lex.literal))
        .unwrap()
}

#[test]
fn test_params_and_regex() {
    let tokens = lex_skip_ws("$name $0 /foo.*bar/ a / b");
    assert_eq!(
        tokens,
        vec![
            Token::Param,
            Token::Param,
            Token::Regex,
            Token::Ident,
            Token::Div,
            Token::Ident,
            Token::Eof,
        ]
    );
}

#[test]
fn test_duration_and_date_upgrades() {
    assert_eq!(lex_skip_ws_literal("'1h30m'"), (Token::Duration, "'1h30m'"));
    assert_eq!(lex_skip_ws_literal("'2023-01-15'"), (Token::Date, "'2023-01-15'"));
    assert_eq!(
        lex_skip_ws_literal("'2023-01-15T12:30:00Z'"),
        (Token::Time, "'2023-01-15T12:30:00Z'")
    );
    assert_eq!(lex_skip_ws_literal("'just a string'"), (Token::String, "'just a string'"));
}

#[test]
fn test_bare_duration_literal() {
    let tokens = lex_skip_ws("1h30m");
    assert_eq!(tokens, vec![Token::Duration, Token::Eof]);
}

#[test]
fn test_unicode_operators() {
    let tokens = lex_skip_ws("a × b ÷ c ∈ d ∉ e ~ f");
    assert_eq!(
        tokens,
        vec![
            Token::Ident,
            Token::Mul,
            Token::Ident,
            Token::Div,
            Token::Ident,
            Token::Inside,
            Token::Ident,
            Token::NotInside,
            Token::Ident,
            Token::Fuzzy,
            Token::Ident,
            Token::Eof,
        ]
    );
}

#[test]
fn test_json_and_array_blobs() {
    let (tok, lit) = lex_skip_ws_literal(r#"{"a": 1, "b": [1, 2, {"c": 3}]}"#);
    assert_eq!(tok, Token::Json);
    assert_eq!(lit, r#"{"a": 1, "b": [1, 2, {"c": 3}]}"#);

    let (tok, lit) = lex_skip_ws_literal("[1, 2, [3, 4]]");
    assert_eq!(tok, Token::Array);
    assert_eq!(lit, "[1, 2, [3, 4]]");
}

#[test]
fn test_model_literal() {
    let (tok, lit) = lex_skip_ws_literal("|time-series:1,2..3|");
    assert_eq!(tok, Token::Model);
    assert_eq!(lit, "|time-series:1,2..3|");
}

#[test]
fn test_backtick_and_angle_idents_never_rewrite_to_keywords() {
    let (tok, _) = lex_skip_ws_literal("`select`");
    assert_eq!(tok, Token::Expr);

    let (tok, _) = lex_skip_ws_literal("⟨select⟩");
    assert_eq!(tok, Token::Expr);
}

#[test]
fn test_struct_access_and_path_joins() {
    let tokens = lex_skip_ws("person->wrote->article");
    assert_eq!(
        tokens,
        vec![
            Token::Ident,
            Token::Arrow,
            Token::Ident,
            Token::Arrow,
            Token::Ident,
            Token::Eof,
        ]
    );
}

#[test]
fn test_is_token_kept_distinct_for_contextual_rewrite() {
    let tokens = lex_skip_ws("a IS NOT NULL");
    assert_eq!(tokens, vec![Token::Ident, Token::Is, Token::Not, Token::Null, Token::Eof]);
}
