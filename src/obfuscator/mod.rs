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

//! Obfuscating handler
//!
//! Re-emits the dump as it is parsed, with text values pseudonymized
//! according to a [`Policy`]. Schemas are learned from CREATE TABLE
//! statements, so every INSERT must come after its table's definition.

mod note;

use log::{debug, warn};
use std::collections::HashMap;
use std::io::Write;

use crate::ast::{ColumnDefinition, DisplayCreateTable, Row, TableElement, Value};
use crate::error::{DumpError, Result};
use crate::handler::ParseHandler;
use crate::policy::{Policy, ValueAction};
use crate::scrambler::Scrambler;

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObfuscationStats {
    pub tables: usize,
    pub rows: usize,
    pub scrambled: usize,
    pub replaced: usize,
    pub notes: usize,
}

pub struct ObfuscatingHandler<W> {
    out: W,
    scrambler: Scrambler,
    policy: Policy,
    schemas: HashMap<String, Vec<ColumnDefinition>>,
    stats: ObfuscationStats,
}

/// The name between the first pair of backticks following `keyword`.
fn quoted_table_name<'a>(header: &'a str, keyword: &str) -> Option<&'a str> {
    let start = header.find(keyword)? + keyword.len();
    let rest = header[start..].trim_start().strip_prefix('`')?;
    let end = rest.find('`')?;
    Some(&rest[..end])
}

impl<W: Write> ObfuscatingHandler<W> {
    pub fn new(out: W, scrambler: Scrambler, policy: Policy) -> Self {
        ObfuscatingHandler {
            out,
            scrambler,
            policy,
            schemas: HashMap::new(),
            stats: ObfuscationStats::default(),
        }
    }

    pub fn stats(&self) -> ObfuscationStats {
        self.stats
    }

    /// Columns recorded for `table`, in declaration order.
    pub fn schema(&self, table: &str) -> Option<&[ColumnDefinition]> {
        self.schemas.get(table).map(Vec::as_slice)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ParseHandler for ObfuscatingHandler<W> {
    fn on_text(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    fn on_drop_table(&mut self, statement: &str) -> Result<()> {
        writeln!(self.out, "{};", statement)?;
        Ok(())
    }

    fn on_lock(&mut self, statement: &str) -> Result<()> {
        writeln!(self.out, "{};", statement)?;
        Ok(())
    }

    fn on_unlock(&mut self, statement: &str) -> Result<()> {
        writeln!(self.out, "{};", statement)?;
        Ok(())
    }

    fn on_ddl(
        &mut self,
        header: &str,
        columns: &[TableElement],
        trailing_options: &str,
    ) -> Result<()> {
        match quoted_table_name(header, "CREATE TABLE") {
            Some(table) => {
                let definitions: Vec<ColumnDefinition> = columns
                    .iter()
                    .filter_map(TableElement::as_column)
                    .cloned()
                    .collect();
                debug!("schema for `{}`: {} column(s)", table, definitions.len());
                self.schemas.insert(table.to_string(), definitions);
                self.stats.tables += 1;
            }
            None => warn!("no table name in {:?}, schema not recorded", header),
        }

        write!(
            self.out,
            "{}",
            DisplayCreateTable {
                header,
                columns,
                trailing_options,
            }
        )?;
        Ok(())
    }

    fn on_insert<I>(&mut self, header: &str, rows: I) -> Result<()>
    where
        I: Iterator<Item = Result<Row>>,
    {
        let table = quoted_table_name(header, "INSERT INTO")
            .ok_or_else(|| DumpError::UnknownTable(header.trim().to_string()))?;
        let columns = self
            .schemas
            .get(table)
            .ok_or_else(|| DumpError::UnknownTable(table.to_string()))?;

        let policy = &self.policy;
        let actions: Vec<ValueAction<'_>> = columns
            .iter()
            .map(|column| policy.action_for(table, column))
            .collect();

        let out = &mut self.out;
        let scrambler = &mut self.scrambler;
        let stats = &mut self.stats;

        out.write_all(header.as_bytes())?;

        for (index, row) in rows.enumerate() {
            let row = row?;
            if index > 0 {
                out.write_all(b",")?;
            }
            out.write_all(b"(")?;

            for (position, value) in row.into_iter().enumerate() {
                if position > 0 {
                    out.write_all(b",")?;
                }

                let action = actions
                    .get(position)
                    .ok_or_else(|| DumpError::RowWidthMismatch {
                        table: table.to_string(),
                        row: index,
                        columns: columns.len(),
                    })?;

                let value = match value {
                    Value::Text(text) => Value::Text(match *action {
                        ValueAction::StructuredNote => {
                            stats.notes += 1;
                            note::scramble_note(scrambler, table, &columns[position].name, &text)?
                        }
                        ValueAction::Replace(constant) => {
                            stats.replaced += 1;
                            constant.to_string()
                        }
                        ValueAction::Keep => text,
                        ValueAction::Scramble => {
                            stats.scrambled += 1;
                            scrambler.scramble(&text)?
                        }
                    }),
                    other => other,
                };
                write!(out, "{}", value)?;
            }

            out.write_all(b")")?;
            stats.rows += 1;
        }

        out.write_all(b";\n")?;
        Ok(())
    }
}
