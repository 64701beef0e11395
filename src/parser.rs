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

//! mysqldump Parser

use log::{debug, warn};
use std::io::Read;

use crate::ast::{ColumnDefinition, ConstraintDefinition, TableElement};
use crate::cursor::Cursor;
use crate::error::{DumpError, Result};
use crate::handler::ParseHandler;
use crate::tokenizer::{Rows, NEWLINES};

/// Longest piece of unrecognized input quoted in an error.
const SNIPPET_LEN: usize = 70;

/// What the input at the cursor starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    Comment,
    BlankLines,
    DropTable,
    CreateTable,
    Lock,
    Unlock,
    Insert,
}

/// Checked in order, first match wins.
const PREFIXES: &[(&[u8], StatementKind)] = &[
    (b"--", StatementKind::Comment),
    (b"/*", StatementKind::Comment),
    (b"\r", StatementKind::BlankLines),
    (b"\n", StatementKind::BlankLines),
    (b"DROP TABLE", StatementKind::DropTable),
    (b"CREATE TABLE", StatementKind::CreateTable),
    (b"LOCK TABLES", StatementKind::Lock),
    (b"UNLOCK TABLES", StatementKind::Unlock),
    (b"INSERT ", StatementKind::Insert),
];

/// mysqldump Parser
///
/// Reads one statement at a time and reports it to the handler. INSERT rows
/// are handed over lazily, so tables of any size stream in constant memory.
pub struct Parser<R, H> {
    cursor: Cursor<R>,
    handler: H,
}

impl<R: Read, H: ParseHandler> Parser<R, H> {
    pub fn new(source: R, handler: H) -> Self {
        Parser {
            cursor: Cursor::new(source),
            handler,
        }
    }

    /// Like `new`, with a cursor window of `capacity` bytes.
    pub fn with_capacity(source: R, capacity: usize, handler: H) -> Self {
        Parser {
            cursor: Cursor::with_capacity(source, capacity),
            handler,
        }
    }

    /// Parse a whole dump and give the handler back.
    pub fn parse_dump(source: R, handler: H) -> Result<H> {
        let mut parser = Parser::new(source, handler);
        parser.parse()?;
        Ok(parser.into_handler())
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Absolute byte offset reached so far.
    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    /// Run until the source is exhausted. The first error ends the run.
    pub fn parse(&mut self) -> Result<()> {
        loop {
            self.cursor.ensure(1)?;
            if self.cursor.at_eof() {
                return Ok(());
            }

            let kind = match self.classify()? {
                Some(kind) => kind,
                None => {
                    return Err(DumpError::MalformedStatement {
                        offset: self.cursor.offset(),
                        snippet: self.cursor.snippet(SNIPPET_LEN)?,
                    })
                }
            };
            debug!("{:?} at offset {}", kind, self.cursor.offset());

            match kind {
                StatementKind::Comment => {
                    let bytes = self.cursor.read_until_or_eof(NEWLINES)?;
                    let text = self.decode(bytes)?;
                    self.handler.on_text(&text)?;
                }
                StatementKind::BlankLines => {
                    let text = self.read_text_until(NEWLINES, true)?;
                    self.handler.on_text(&text)?;
                }
                StatementKind::DropTable => {
                    let statement = self.read_statement()?;
                    self.handler.on_drop_table(&statement)?;
                }
                StatementKind::CreateTable => self.parse_create_table()?,
                StatementKind::Lock => {
                    let statement = self.read_statement()?;
                    self.handler.on_lock(&statement)?;
                }
                StatementKind::Unlock => {
                    let statement = self.read_statement()?;
                    self.handler.on_unlock(&statement)?;
                }
                StatementKind::Insert => self.parse_insert()?,
            }
        }
    }

    fn classify(&mut self) -> Result<Option<StatementKind>> {
        for (prefix, kind) in PREFIXES {
            if self.cursor.peek_matches(prefix)? {
                return Ok(Some(*kind));
            }
        }
        Ok(None)
    }

    fn read_text_until(&mut self, delimiters: &[u8], strip_trailing: bool) -> Result<String> {
        let bytes = self.cursor.read_until(delimiters, strip_trailing)?;
        self.decode(bytes)
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        String::from_utf8(bytes).map_err(|_| DumpError::InvalidUtf8 {
            offset: self.cursor.offset(),
        })
    }

    /// Everything up to the `;`, then the line terminators after it.
    fn read_statement(&mut self) -> Result<String> {
        let statement = self.read_text_until(b";", false)?;
        self.cursor.skip_while_in(NEWLINES)?;
        Ok(statement)
    }

    fn parse_create_table(&mut self) -> Result<()> {
        let header = self.read_text_until(b"(", false)?;
        let columns = self.parse_table_elements()?;

        if self.cursor.peek_matches(b")")? {
            self.cursor.read_one()?;
        }
        let trailing_options = self.read_statement()?;

        self.handler.on_ddl(&header, &columns, &trailing_options)
    }

    /// One element per line until the closing parenthesis.
    fn parse_table_elements(&mut self) -> Result<Vec<TableElement>> {
        let mut elements = vec![];

        loop {
            self.cursor.skip_while_in(NEWLINES)?;
            if self.cursor.peek_matches(b")")? {
                break;
            }

            let line = self.read_text_until(NEWLINES, true)?;
            let line = line.trim();
            if line.is_empty() {
                warn!(
                    "blank line inside CREATE TABLE at offset {}",
                    self.cursor.offset()
                );
                break;
            }
            let definition = line.strip_suffix(',').unwrap_or(line);

            let element = match ColumnDefinition::parse(definition) {
                Some(column) => TableElement::Column(column),
                None => TableElement::Constraint(ConstraintDefinition {
                    raw_text: definition.to_string(),
                }),
            };
            elements.push(element);
        }

        Ok(elements)
    }

    fn parse_insert(&mut self) -> Result<()> {
        let header = self.read_text_until(b"(", false)?;
        // Hand the opening parenthesis back to the row reader.
        self.cursor.rewind(1)?;

        let mut rows = Rows::new(&mut self.cursor);
        self.handler.on_insert(&header, &mut rows)?;

        let mut skipped = 0;
        for row in rows {
            row?;
            skipped += 1;
        }
        if skipped > 0 {
            warn!("handler left {} row(s) of {:?} unread", skipped, header);
        }
        Ok(())
    }
}
