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

//! Structures recognized in a dump

mod value;

pub use self::value::{escape_mysql_string, DisplayRow, EscapeMysqlString, Row, Value};

use std::fmt;

/// A `` `name` type options `` line of a CREATE TABLE body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDefinition {
    pub name: String,
    /// Raw type token, e.g. `varchar(50)`
    pub data_type: String,
    /// Whatever follows the type, e.g. `NOT NULL DEFAULT '0'`
    pub options: String,
    /// The trimmed line without its trailing comma
    pub raw_text: String,
}

impl ColumnDefinition {
    /// Split a trimmed CREATE TABLE line shaped like `` `name` type[ rest] ``.
    /// Returns `None` for anything else (keys, constraints).
    pub fn parse(line: &str) -> Option<ColumnDefinition> {
        let quoted = line.strip_prefix('`')?;
        let name_end = quoted.find("` ")?;
        let name = &quoted[..name_end];
        let rest = &quoted[name_end + 2..];

        // The type token is at least one character and ends at the next space.
        let first_len = rest.chars().next()?.len_utf8();
        let (data_type, options) = match rest[first_len..].find(' ') {
            Some(space) => {
                let split = first_len + space;
                (&rest[..split], &rest[split + 1..])
            }
            None => (rest, ""),
        };

        Some(ColumnDefinition {
            name: name.to_string(),
            data_type: data_type.to_string(),
            options: options.to_string(),
            raw_text: line.to_string(),
        })
    }
}

/// A non-column line of a CREATE TABLE body (`PRIMARY KEY`, `KEY`, `CONSTRAINT` ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintDefinition {
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableElement {
    Column(ColumnDefinition),
    Constraint(ConstraintDefinition),
}

impl TableElement {
    pub fn raw_text(&self) -> &str {
        match self {
            TableElement::Column(c) => &c.raw_text,
            TableElement::Constraint(c) => &c.raw_text,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnDefinition> {
        match self {
            TableElement::Column(c) => Some(c),
            TableElement::Constraint(_) => None,
        }
    }
}

/// A fully materialized statement. The parser hands INSERT rows to its
/// handler lazily; `Insert::rows` only exists here once someone collected them.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Comment or blank line, without its line terminator
    Text(String),
    DropTable(String),
    CreateTable {
        header: String,
        columns: Vec<TableElement>,
        trailing_options: String,
    },
    Lock(String),
    Unlock(String),
    Insert {
        header: String,
        rows: Vec<Row>,
    },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Text(text) => writeln!(f, "{}", text),
            Statement::DropTable(s) | Statement::Lock(s) | Statement::Unlock(s) => {
                writeln!(f, "{};", s)
            }
            Statement::CreateTable {
                header,
                columns,
                trailing_options,
            } => write!(
                f,
                "{}",
                DisplayCreateTable {
                    header,
                    columns,
                    trailing_options
                }
            ),
            Statement::Insert { header, rows } => {
                f.write_str(header)?;
                let mut delim = "";
                for row in rows {
                    write!(f, "{}{}", delim, DisplayRow(row))?;
                    delim = ",";
                }
                writeln!(f, ";")
            }
        }
    }
}

/// Renders a CREATE TABLE statement in mysqldump's layout, one element per
/// line, indented by two spaces.
pub struct DisplayCreateTable<'a> {
    pub header: &'a str,
    pub columns: &'a [TableElement],
    pub trailing_options: &'a str,
}

impl<'a> fmt::Display for DisplayCreateTable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}(", self.header)?;
        let mut delim = "";
        for element in self.columns {
            write!(f, "{}  {}", delim, element.raw_text())?;
            delim = ",\n";
        }
        if !self.columns.is_empty() {
            writeln!(f)?;
        }
        writeln!(f, "){};", self.trailing_options)
    }
}
