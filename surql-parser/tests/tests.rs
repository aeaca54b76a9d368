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

use surql_parser::*;

fn root_session() -> Session {
    Session::new(AuthLevel::Kv).with_possible("*", "*")
}

fn parse_one(sql: &str) -> Statement {
    let mut session = root_session();
    session.use_ns("acme").unwrap();
    session.use_db("main").unwrap();
    let mut query = parse(sql, &mut session).unwrap();
    assert_eq!(query.statements.len(), 1);
    query.statements.remove(0)
}

#[test]
fn select_star_from_table() {
    let stmt = parse_one("SELECT * FROM person");
    let Statement::Select(select) = stmt else { panic!("expected SELECT") };
    assert_eq!(select.expr, vec![Field { expr: Expression::Literal(Literal::All), alias: None }]);
    assert_eq!(select.what, vec![Expression::Table("person".to_string())]);
}

#[test]
fn select_where_chains_three_comparisons() {
    let stmt = parse_one("SELECT * FROM person WHERE id != null AND id > 13.9 AND id <= 29.9");
    let Statement::Select(select) = stmt else { panic!("expected SELECT") };
    let cond = select.cond.expect("WHERE clause");

    // `AND` is left-associative at equal precedence: ((neq AND gt) AND lte).
    let Expression::Binary { lhs: outer_lhs, op: BinaryOp::And, rhs: lte_rhs } = cond else {
        panic!("expected a top-level AND")
    };
    let Expression::Binary { op: BinaryOp::Lte, rhs: lte_value, .. } = *lte_rhs else {
        panic!("expected LTE on the right")
    };
    assert_eq!(*lte_value, Expression::Literal(Literal::Number(29.9)));

    let Expression::Binary { lhs: neq_side, op: BinaryOp::And, rhs: gt_side } = *outer_lhs else {
        panic!("expected the middle node to be another AND")
    };
    let Expression::Binary { op: BinaryOp::Neq, rhs: neq_value, .. } = *neq_side else {
        panic!("expected NEQ on the far left")
    };
    assert_eq!(*neq_value, Expression::Literal(Literal::Null));
    let Expression::Binary { op: BinaryOp::Gt, rhs: gt_value, .. } = *gt_side else {
        panic!("expected GT in the middle")
    };
    assert_eq!(*gt_value, Expression::Literal(Literal::Number(13.9)));
}

#[test]
fn create_with_set_clause() {
    let stmt = parse_one(r#"CREATE person SET firstname = "Tobie""#);
    let Statement::Create(create) = stmt else { panic!("expected CREATE") };
    assert_eq!(create.what, vec![Expression::Table("person".to_string())]);
    let Some(Data::Set(items)) = create.data else { panic!("expected a SET data clause") };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].0, Expression::Ident("firstname".to_string()));
    assert_eq!(items[0].1, BinaryOp::Eq);
    assert_eq!(items[0].2, Expression::Literal(Literal::String("Tobie".to_string())));
}

#[test]
fn define_index_with_columns_and_unique() {
    let stmt = parse_one("DEFINE INDEX temp ON person COLUMNS firstname, lastname UNIQUE");
    let Statement::Define(DefineStatement::Index(idx)) = stmt else { panic!("expected DEFINE INDEX") };
    assert_eq!(idx.name, "temp");
    assert_eq!(idx.what, vec![Expression::Table("person".to_string())]);
    assert_eq!(idx.cols, vec!["firstname".to_string(), "lastname".to_string()]);
    assert!(idx.unique);
}

#[test]
fn thing_id_is_retyped_to_a_quoted_datetime() {
    let stmt = parse_one("SELECT * FROM @person:⟨1987-06-22T08:30:30.511Z⟩");
    let Statement::Select(select) = stmt else { panic!("expected SELECT") };
    let Expression::Thing(thing) = &select.what[0] else { panic!("expected a Thing in FROM") };
    assert_eq!(thing.table, "person");
    assert!(matches!(thing.id, ThingId::Time(_)));
}

#[test]
fn bare_thing_without_the_legacy_at_prefix_parses_identically() {
    let legacy = parse_one("SELECT * FROM @person:⟨1987-06-22T08:30:30.511Z⟩");
    let bare = parse_one("SELECT * FROM person:⟨1987-06-22T08:30:30.511Z⟩");
    assert_eq!(legacy, bare);
}

#[test]
fn thing_string_id_is_unquoted() {
    let stmt = parse_one("SELECT * FROM email:⟨a@b.c⟩");
    let Statement::Select(select) = stmt else { panic!("expected SELECT") };
    let Expression::Thing(thing) = &select.what[0] else { panic!("expected a Thing") };
    assert_eq!(thing.id, ThingId::String("a@b.c".to_string()));
}

#[test]
fn use_statement_selects_namespace_and_database() {
    let mut session = Session::new(AuthLevel::Ns).with_possible("*", "*");
    let query = parse("USE NAMESPACE acme DATABASE main", &mut session).unwrap();
    assert_eq!(query.statements, vec![Statement::Use { ns: Some("acme".to_string()), db: Some("main".to_string()) }]);
    assert_eq!(session.selected.ns.as_deref(), Some("acme"));
    assert_eq!(session.selected.db.as_deref(), Some("main"));
}

#[test]
fn use_statement_rejects_a_namespace_outside_possible() {
    let mut session = Session::new(AuthLevel::Ns).with_possible("other", "*");
    let err = parse("USE NAMESPACE acme DATABASE main", &mut session).unwrap_err();
    assert_eq!(err, ParseError::Perms { resource: "acme".to_string() });
}

#[test]
fn transaction_rejects_define_inside_it() {
    let mut session = root_session();
    let err = parse("BEGIN; DEFINE TABLE x; COMMIT", &mut session).unwrap_err();
    assert_eq!(err, ParseError::Tx);
}

#[test]
fn empty_select_reports_the_missing_field_name() {
    let mut session = root_session();
    let err = parse("SELECT FROM person", &mut session).unwrap_err();
    assert!(matches!(err, ParseError::Parse { expected, .. } if expected == vec!["field name".to_string()]));
}

#[test]
fn empty_query_is_rejected() {
    let mut session = root_session();
    assert_eq!(parse("", &mut session), Err(ParseError::Empty));
    assert_eq!(parse("   ", &mut session), Err(ParseError::Empty));
}

#[test]
fn object_literal_with_bare_keys_is_invalid_json() {
    let mut session = root_session();
    let err = parse(r#"RETURN {"name","London"}"#, &mut session).unwrap_err();
    assert!(matches!(err, ParseError::Literal { kind: LiteralKind::Json, .. }));
}

#[test]
fn function_arity_mismatch_is_reported() {
    let mut session = root_session();
    let err = parse("RETURN math::max()", &mut session).unwrap_err();
    let ParseError::Parse { found, expected } = err else { panic!("expected a Parse error") };
    assert_eq!(found, "math::max() with 0 arguments");
    assert_eq!(expected, vec!["1 argument".to_string()]);
}

#[test]
fn or_binds_looser_than_and() {
    let stmt = parse_one("RETURN a OR b AND c");
    let Statement::Return(Expression::Binary { lhs, op: BinaryOp::Or, rhs }) = stmt else {
        panic!("expected a top-level OR")
    };
    assert_eq!(*lhs, Expression::Ident("a".to_string()));
    assert!(matches!(*rhs, Expression::Binary { op: BinaryOp::And, .. }));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let stmt = parse_one("RETURN a + b * c");
    let Statement::Return(Expression::Binary { lhs, op: BinaryOp::Add, rhs }) = stmt else {
        panic!("expected a top-level ADD")
    };
    assert_eq!(*lhs, Expression::Ident("a".to_string()));
    assert!(matches!(*rhs, Expression::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn containment_keywords_and_symbols_parse_identically() {
    let keyword = parse_one("RETURN a IN b");
    let symbol = parse_one("RETURN a ∈ b");
    assert_eq!(keyword, symbol);

    let keyword_not = parse_one("RETURN a IS NOT IN b");
    let symbol_not = parse_one("RETURN a ∉ b");
    assert_eq!(keyword_not, symbol_not);

    let keyword_contains = parse_one("RETURN a CONTAINS b");
    let symbol_contains = parse_one("RETURN a ∋ b");
    assert_eq!(keyword_contains, symbol_contains);
}

#[test]
fn relate_requires_matching_edge_direction() {
    let mut session = root_session();
    let stmt = parse_one("RELATE person:1->knows->person:2 UNIQUE");
    let Statement::Relate(relate) = stmt else { panic!("expected RELATE") };
    assert!(!relate.reversed);
    assert!(relate.unique);

    let err = parse("RELATE person:1->knows<-person:2", &mut session).unwrap_err();
    assert!(matches!(err, ParseError::Parse { .. }));
}

#[test]
fn group_by_rejects_non_aggregate_non_grouped_fields() {
    let mut session = root_session();
    let err = parse("SELECT firstname, count() FROM person GROUP BY lastname", &mut session).unwrap_err();
    assert!(matches!(err, ParseError::Group { .. }));
}

#[test]
fn group_by_allows_aggregates_and_grouped_idents() {
    let stmt = parse_one("SELECT lastname, count() FROM person GROUP BY lastname");
    assert!(matches!(stmt, Statement::Select(_)));
}

#[test]
fn subquery_marks_the_outer_query_read_write() {
    let mut session = root_session();
    let mut parser = Parser::new("RETURN (CREATE person)");
    parser.parse_query(&mut session).unwrap();
    assert!(parser.is_read_write());

    let mut plain = Parser::new("RETURN (SELECT * FROM person)");
    plain.parse_query(&mut session).unwrap();
    assert!(!plain.is_read_write());
}

#[test]
fn pretty_print_round_trips_a_select_statement() {
    let stmt = parse_one("SELECT * FROM person WHERE age > 18");
    let printed = stmt.to_string();
    let reparsed = parse_one(&printed);
    assert_eq!(stmt, reparsed);
}

#[test]
fn codec_round_trips_a_parsed_query() {
    let mut session = root_session();
    let query = parse("SELECT * FROM person WHERE age > 18 LIMIT 10", &mut session).unwrap();
    let bytes = encode(&query);
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, query);
}
