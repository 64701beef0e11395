// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use matches::assert_matches;

use mysqldump_scrambler::policy::ADMIN_PASSWORD_HASH;
use mysqldump_scrambler::{
    CollectingHandler, DumpError, ObfuscatingHandler, ObfuscationStats, Parser, Policy, Row,
    Scrambler, Statement, Value,
};

const DUMP: &str = include_str!("fixtures/archivesspace.sql");

fn init_logger() {
    let _ = simple_logger::init_with_level(log::Level::Warn);
}

fn obfuscate_with(input: &str, policy: Policy) -> (String, ObfuscationStats) {
    init_logger();
    let handler = ObfuscatingHandler::new(Vec::new(), Scrambler::with_secret("fixture"), policy);
    let handler = Parser::parse_dump(input.as_bytes(), handler).unwrap();
    let stats = handler.stats();
    (String::from_utf8(handler.into_inner()).unwrap(), stats)
}

fn obfuscate(input: &str) -> String {
    obfuscate_with(input, Policy::default()).0
}

/// Rows of every INSERT into `table`, read back from a dump.
fn rows_of(dump: &str, table: &str) -> Vec<Row> {
    let prefix = format!("INSERT INTO `{}`", table);
    Parser::parse_dump(dump.as_bytes(), CollectingHandler::new())
        .unwrap()
        .into_statements()
        .into_iter()
        .filter_map(|statement| match statement {
            Statement::Insert { header, rows } if header.starts_with(&prefix) => Some(rows),
            _ => None,
        })
        .flatten()
        .collect()
}

fn text(value: &Value) -> &str {
    match value.as_text() {
        Some(text) => text,
        None => panic!("expected a string, got {:?}", value),
    }
}

/// Blank lines after a `;` are not reproduced.
fn content_lines(dump: &str) -> Vec<&str> {
    dump.lines().filter(|line| !line.is_empty()).collect()
}

fn same_shape(original: &str, scrambled: &str) -> bool {
    let preserved = |c: char| c.is_ascii_punctuation() || c.is_whitespace();
    original.chars().count() == scrambled.chars().count()
        && original
            .chars()
            .zip(scrambled.chars())
            .all(|(a, b)| if preserved(a) { a == b } else { !preserved(b) })
}

#[test]
fn everything_but_insert_lines_is_copied_verbatim() {
    let output = obfuscate(DUMP);
    let input_lines = content_lines(DUMP);
    let output_lines = content_lines(&output);

    assert_eq!(input_lines.len(), output_lines.len());
    for (input, output) in input_lines.iter().zip(&output_lines) {
        if !input.starts_with("INSERT ") {
            assert_eq!(input, output);
        }
    }
}

#[test]
fn scrambled_insert_lines_keep_their_shape() {
    let output = obfuscate(DUMP);
    for (input, output) in content_lines(DUMP).into_iter().zip(content_lines(&output)) {
        // the password hashes are swapped for a longer constant
        if input.starts_with("INSERT ") && !input.starts_with("INSERT INTO `auth_db`") {
            assert_ne!(input, output);
            assert!(same_shape(input, output), "{}\n{}", input, output);
        }
    }
}

#[test]
fn password_hashes_are_replaced() {
    let output = obfuscate(DUMP);
    let rows = rows_of(&output, "auth_db");
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row[4], Value::Text(ADMIN_PASSWORD_HASH.to_string()));
    }
}

#[test]
fn datetime_values_pass_through() {
    let output = obfuscate(DUMP);
    for (table, column) in &[("auth_db", 2), ("auth_db", 3), ("resource", 9), ("note", 6)] {
        let before: Vec<Value> = rows_of(DUMP, table)
            .into_iter()
            .map(|row| row[*column].clone())
            .collect();
        let after: Vec<Value> = rows_of(&output, table)
            .into_iter()
            .map(|row| row[*column].clone())
            .collect();
        assert_eq!(before, after, "`{}` column {}", table, column);
    }
    assert!(output.contains("'2019-04-02 15:13:44','2019-04-02 15:13:44'"));
}

#[test]
fn exempt_columns_pass_through() {
    let output = obfuscate(DUMP);

    let original = rows_of(DUMP, "resource");
    let scrambled = rows_of(&output, "resource");
    for (before, after) in original.iter().zip(&scrambled) {
        // identifier is exempt for this table, jsonmodel_type everywhere
        assert_eq!(before[4], after[4]);
        assert_eq!(before[5], after[5]);
        assert_ne!(before[3], after[3]);
        assert!(same_shape(text(&before[3]), text(&after[3])));
        // numbers and NULLs are never touched
        assert_eq!(before[0..3], after[0..3]);
        assert_eq!(before[6], after[6]);
    }

    let profile = &rows_of(&output, "container_profile")[0];
    assert_eq!(profile[2], Value::Text("5.25".to_string()));
    assert_eq!(profile[3], Value::Text("15.5".to_string()));
    assert_eq!(profile[5], Value::Float(-2.75));
    assert_ne!(profile[1], Value::Text("Hollinger box".to_string()));
}

#[test]
fn equal_values_get_equal_pseudonyms() {
    let output = obfuscate(DUMP);
    let rows = rows_of(&output, "resource");

    // "Papers of Jane Doe" in two titles and one finding aid title
    assert_eq!(rows[0][3], rows[2][3]);
    assert_eq!(rows[0][3], rows[1][8]);
    assert_ne!(rows[0][3], rows[1][3]);
}

#[test]
fn notes_are_scrambled_inside_their_json() {
    let output = obfuscate(DUMP);
    let rows = rows_of(&output, "note");

    let single: serde_json::Value = serde_json::from_str(text(&rows[0][5])).unwrap();
    assert_eq!(single["jsonmodel_type"], "note_singlepart");
    assert_eq!(single["publish"], true);
    assert_eq!(single["persistent_id"], "aspace_42");
    let content = single["content"][0].as_str().unwrap();
    assert_ne!(content, "Letters written by Jane Doe to her sister");
    assert!(same_shape("Letters written by Jane Doe to her sister", content));

    let multi: serde_json::Value = serde_json::from_str(text(&rows[1][5])).unwrap();
    let subnote = &multi["subnotes"][0];
    assert_eq!(subnote["jsonmodel_type"], "note_text");
    assert_ne!(subnote["content"], "Born in Ohio");
    assert_eq!(subnote["content"].as_str().unwrap().len(), "Born in Ohio".len());
}

#[test]
fn run_statistics() {
    let (_, stats) = obfuscate_with(DUMP, Policy::default());
    assert_eq!(
        stats,
        ObfuscationStats {
            tables: 4,
            rows: 8,
            scrambled: 9,
            replaced: 2,
            notes: 2,
        }
    );
}

#[test]
fn same_secret_same_output() {
    assert_eq!(obfuscate(DUMP), obfuscate(DUMP));
}

#[test]
fn policy_loaded_from_json() {
    let policy = Policy::from_json(r#"{ "exempt_columns": { "auth_db": ["username"] } }"#).unwrap();
    let (output, stats) = obfuscate_with(DUMP, policy);

    let users = rows_of(&output, "auth_db");
    assert_eq!(users[0][1], Value::Text("admin".to_string()));
    assert_eq!(users[1][1], Value::Text("jdoe".to_string()));
    // without the built-in policy the hashes and notes are plain text
    assert_eq!(stats.replaced, 0);
    assert_eq!(stats.notes, 0);
    assert_ne!(users[0][4], Value::Text(ADMIN_PASSWORD_HASH.to_string()));
}

#[test]
fn more_initials_than_pseudonyms() {
    let values: Vec<String> = ('A'..='Z')
        .chain('a'..='z')
        .enumerate()
        .map(|(id, initial)| format!("({},'{}')", id, initial))
        .collect();
    let input = format!(
        "CREATE TABLE `person` (\n  `id` int(11) NOT NULL,\n  `initial` varchar(1) DEFAULT NULL\n) ENGINE=InnoDB;\nINSERT INTO `person` VALUES {};\n",
        values.join(",")
    );

    let (output, stats) = obfuscate_with(&input, Policy::default());
    assert_eq!(stats.scrambled, 52);

    let initials: Vec<String> = rows_of(&output, "person")
        .iter()
        .map(|row| text(&row[1]).to_string())
        .collect();
    let distinct: std::collections::HashSet<&String> = initials.iter().collect();
    assert_eq!(distinct.len(), 52);
    assert_eq!(initials.iter().filter(|i| i.chars().count() == 1).count(), 36);
}

#[test]
fn schemas_are_learned_from_create_table() {
    init_logger();
    let handler = ObfuscatingHandler::new(Vec::new(), Scrambler::new(), Policy::default());
    let handler = Parser::parse_dump(DUMP.as_bytes(), handler).unwrap();

    let columns: Vec<(&str, &str)> = handler
        .schema("auth_db")
        .unwrap()
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("id", "int(11)"),
            ("username", "varchar(255)"),
            ("create_time", "datetime"),
            ("system_mtime", "datetime"),
            ("pwhash", "varchar(255)"),
        ]
    );
    assert_eq!(handler.schema("container_profile").map(<[_]>::len), Some(6));
    assert!(handler.schema("agent_person").is_none());
}

#[test]
fn insert_before_create_table_is_an_error() {
    init_logger();
    let input = "LOCK TABLES `ghost` WRITE;\nINSERT INTO `ghost` VALUES (1,'boo');\n";
    let handler = ObfuscatingHandler::new(Vec::new(), Scrambler::new(), Policy::default());
    let mut parser = Parser::new(input.as_bytes(), handler);

    assert_matches!(
        parser.parse(),
        Err(DumpError::UnknownTable(ref table)) if table == "ghost"
    );
    // output written before the failure stays
    let written = String::from_utf8(parser.into_handler().into_inner()).unwrap();
    assert_eq!(written, "LOCK TABLES `ghost` WRITE;\n");
}

#[test]
fn too_wide_row_is_an_error() {
    init_logger();
    let input = "CREATE TABLE `t` (\n  `id` int(11) NOT NULL,\n  `name` varchar(50) DEFAULT NULL\n) ENGINE=InnoDB;\nINSERT INTO `t` VALUES (1,'a'),(2,'b','c');\n";
    let handler = ObfuscatingHandler::new(Vec::new(), Scrambler::new(), Policy::empty());
    let error = Parser::parse_dump(input.as_bytes(), handler)
        .err()
        .expect("the second row has three values");

    match error {
        DumpError::RowWidthMismatch {
            table,
            row,
            columns,
        } => {
            assert_eq!(table, "t");
            assert_eq!(row, 1);
            assert_eq!(columns, 2);
        }
        other => panic!("expected a row width mismatch, got {:?}", other),
    }
}

#[test]
fn bad_note_json_is_reported() {
    init_logger();
    let input = "CREATE TABLE `note` (\n  `id` int(11) NOT NULL,\n  `notes` mediumblob NOT NULL\n) ENGINE=InnoDB;\nINSERT INTO `note` VALUES (1,'not json');\n";
    let handler = ObfuscatingHandler::new(Vec::new(), Scrambler::new(), Policy::default());
    assert_matches!(
        Parser::parse_dump(input.as_bytes(), handler).err(),
        Some(DumpError::MalformedNote { .. })
    );
}
