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

use std::io;
use thiserror::Error;

/// Everything that can abort a dump conversion.
///
/// None of these are recoverable: a dump is either well-formed or it is not,
/// and output already written up to the failure stays where it is.
#[derive(Error, Debug)]
pub enum DumpError {
    /// The source ran dry in the middle of a token.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: u64 },

    /// Top-level input that starts none of the recognized statements.
    #[error("unknown input at offset {offset}: {snippet:?}")]
    MalformedStatement { offset: u64, snippet: String },

    /// A bad literal inside an INSERT tuple.
    #[error("malformed value at offset {offset}: {reason}")]
    MalformedValue { offset: u64, reason: String },

    /// A rewind past the retained window. Always a parser bug.
    #[error("cannot rewind {requested} byte(s), only {available} retained")]
    RewindUnderflow { requested: usize, available: usize },

    #[error("INSERT references a table with no recorded schema: {0}")]
    UnknownTable(String),

    #[error("row {row} of `{table}` has more values than its {columns} column(s)")]
    RowWidthMismatch {
        table: String,
        row: usize,
        columns: usize,
    },

    #[error("invalid UTF-8 in token ending at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    #[error("no unused pseudonym for a {length}-character value after {attempts} attempt(s)")]
    PseudonymSpaceExhausted { length: usize, attempts: usize },

    #[error("malformed structured note in `{table}`.`{column}`: {source}")]
    MalformedNote {
        table: String,
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = DumpError> = std::result::Result<T, E>;
