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

//! INSERT value tokenizer
//!
//! Turns the `(..),(..);` tail of an INSERT statement into rows, one tuple
//! per pull, straight off the cursor.

use std::io::Read;

use crate::ast::{Row, Value};
use crate::cursor::Cursor;
use crate::error::{DumpError, Result};

pub(crate) const NEWLINES: &[u8] = b"\r\n";

const NUMBER_BYTES: &[u8] = b"-0123456789.";

#[derive(Debug, Clone, Copy, PartialEq)]
enum RowsState {
    /// Nothing read yet, expecting the opening `(`.
    First,
    /// Expecting `,(` for another tuple or the closing `;`.
    Between,
    Done,
}

/// Lazy, single-pass sequence of the tuples of one INSERT statement.
///
/// Each call to `next` parses exactly one tuple. Once the terminating `;`
/// (and the line terminators after it) is consumed the sequence is exhausted.
/// After an error it yields nothing further.
pub struct Rows<'a, R> {
    cursor: &'a mut Cursor<R>,
    state: RowsState,
}

impl<'a, R: Read> Rows<'a, R> {
    pub(crate) fn new(cursor: &'a mut Cursor<R>) -> Self {
        Rows {
            cursor,
            state: RowsState::First,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == RowsState::Done
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        let ch = self.cursor.read_one()?;

        match (self.state, ch) {
            (RowsState::Between, b';') => {
                self.cursor.skip_while_in(NEWLINES)?;
                return Ok(None);
            }
            (RowsState::First, b'(') => {}
            (RowsState::Between, b',') => {
                let open = self.cursor.read_one()?;
                if open != b'(' {
                    return Err(unexpected(self.cursor.offset(), open, "'(' to open the next row"));
                }
            }
            (_, other) => return Err(unexpected(self.cursor.offset(), other, "a row")),
        }
        self.state = RowsState::Between;

        let mut values = Vec::new();
        loop {
            values.push(read_value(self.cursor)?);

            match self.cursor.read_one()? {
                b')' => break,
                b',' => continue,
                other => return Err(unexpected(self.cursor.offset(), other, "',' or ')' after a value")),
            }
        }

        Ok(Some(values))
    }
}

impl<'a, R: Read> Iterator for Rows<'a, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == RowsState::Done {
            return None;
        }

        match self.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.state = RowsState::Done;
                None
            }
            Err(e) => {
                self.state = RowsState::Done;
                Some(Err(e))
            }
        }
    }
}

/// `offset` is the position just after the offending byte.
fn unexpected(offset: u64, found: u8, expected: &str) -> DumpError {
    DumpError::MalformedValue {
        offset: offset.saturating_sub(1),
        reason: format!("expected {}, found {:?}", expected, found as char),
    }
}

/// Read one value: a quoted string, `NULL` or a number.
pub(crate) fn read_value<R: Read>(cursor: &mut Cursor<R>) -> Result<Value> {
    if cursor.peek_matches(b"'")? {
        tokenize_single_quoted_string(cursor).map(Value::Text)
    } else if cursor.peek_matches(b"NULL")? {
        for _ in 0..4 {
            cursor.read_one()?;
        }
        Ok(Value::Null)
    } else {
        tokenize_number(cursor)
    }
}

/// Read a single quoted string, starting with the opening quote. A backslash
/// takes the byte after it literally.
fn tokenize_single_quoted_string<R: Read>(cursor: &mut Cursor<R>) -> Result<String> {
    let start = cursor.offset();
    cursor.read_one()?; // consume the opening quote

    let mut bytes = Vec::new();
    loop {
        match cursor.read_one().map_err(|e| unterminated(e, start))? {
            b'\'' => break,
            b'\\' => bytes.push(cursor.read_one().map_err(|e| unterminated(e, start))?),
            other => bytes.push(other),
        }
    }

    String::from_utf8(bytes).map_err(|_| DumpError::InvalidUtf8 {
        offset: cursor.offset(),
    })
}

fn unterminated(e: DumpError, start: u64) -> DumpError {
    match e {
        DumpError::UnexpectedEof { .. } => DumpError::MalformedValue {
            offset: start,
            reason: "unterminated string literal".to_string(),
        },
        other => other,
    }
}

/// Read the longest run of digits, `-` and `.`, then push back the byte that
/// ended it.
fn tokenize_number<R: Read>(cursor: &mut Cursor<R>) -> Result<Value> {
    let start = cursor.offset();
    let mut literal = String::new();
    loop {
        let ch = cursor.read_one()?;
        if NUMBER_BYTES.contains(&ch) {
            literal.push(ch as char);
        } else {
            cursor.rewind(1)?;
            break;
        }
    }

    let malformed = |reason: String| DumpError::MalformedValue {
        offset: start,
        reason,
    };

    if literal.is_empty() {
        let found = cursor.snippet(16)?;
        return Err(malformed(format!("expected a value, found {:?}", found)));
    }

    if literal.contains('.') {
        literal
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| malformed(format!("could not parse '{}' as float: {}", literal, e)))
    } else {
        literal
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| malformed(format!("could not parse '{}' as integer: {}", literal, e)))
    }
}
