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

//! Streaming mysqldump parser and value scrambler
//!
//! This crate reads a mysqldump file one statement at a time and writes it
//! back with its text values pseudonymized. The output reloads into MySQL
//! like the original, but names, notes and free text are replaced by
//! same-length gibberish that stays consistent within the run, so joins on
//! scrambled columns still line up. It's intended to share production
//! backups with developers.
//!
//! ```rust,no_run
//! use mysqldump_scrambler::{ObfuscatingHandler, Parser, Policy, Scrambler};
//! # use std::fs::File;
//! # use std::io::{self, BufReader, Write};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let file: String = std::env::args().collect::<Vec<String>>()[1].clone();
//!
//! let handler = ObfuscatingHandler::new(
//!     io::stdout().lock(),
//!     // A fresh secret per run: pseudonyms differ between runs.
//!     Scrambler::new(),
//!     // Which columns stay readable. Policy::empty() scrambles everything.
//!     Policy::default(),
//! );
//!
//! let handler = Parser::parse_dump(BufReader::new(File::open(&file)?), handler)?;
//! handler.into_inner().flush()?;
//! # Ok(())
//! # }
//! ```
//!
//! Any other [`ParseHandler`] can be plugged into the [`Parser`]; the
//! [`CollectingHandler`] simply keeps every [`Statement`].

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod ast;
pub mod cursor;
mod error;
mod handler;
mod obfuscator;
mod parser;
pub mod policy;
pub mod scrambler;
mod tokenizer;

pub use ast::{ColumnDefinition, ConstraintDefinition, Row, Statement, TableElement, Value};
pub use cursor::Cursor;
pub use error::{DumpError, Result};
pub use handler::{CollectingHandler, ParseHandler};
pub use obfuscator::{ObfuscatingHandler, ObfuscationStats};
pub use parser::Parser;
pub use policy::{Policy, ValueAction};
pub use scrambler::Scrambler;
pub use tokenizer::Rows;
