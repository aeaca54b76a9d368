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

use divan::Bencher;

fn main() {
    divan::main();
}

const TEMPLATE: &str = r#"
            SELECT * FROM person WHERE age > 18 AND name = 'Tobie' OR age < 5;

            CREATE person SET firstname = 'Tobie', lastname = 'Morgan Hitchcock', age = 26;

            UPDATE person:tobie SET age += 1 WHERE age < 100;

            RELATE person:tobie->wrote->article:first SET time.written = time::now();

            SELECT ->wrote->article<-wrote<-person AS coauthors FROM person:tobie;

            DEFINE INDEX userEmailIndex ON TABLE user COLUMNS email UNIQUE;

            LIVE SELECT * FROM person WHERE age > 18;

            BEGIN TRANSACTION;
            DEFINE TABLE reading SCHEMALESS;
            COMMIT TRANSACTION;
    "#;

#[divan::bench(args = [1000, 10000])]
fn benchmark_lexer(bencher: Bencher, n: usize) {
    bencher.with_inputs(|| TEMPLATE.repeat(n)).bench_refs(|input| {
        surql_lexer::Lexer::new(input.as_str()).for_each(|token| {
            let _ = divan::black_box(token);
        });
    });
}
