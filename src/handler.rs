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

use crate::ast::{Row, Statement, TableElement};
use crate::error::Result;

/// Receives parse events, in file order, on the thread that called
/// [`Parser::parse`](crate::Parser::parse).
///
/// Returning an error from any callback aborts the parse.
pub trait ParseHandler {
    /// A comment line or a run of blank lines, without line terminators.
    fn on_text(&mut self, text: &str) -> Result<()>;

    /// `DROP TABLE ...` without the `;`.
    fn on_drop_table(&mut self, statement: &str) -> Result<()>;

    /// `LOCK TABLES ...` without the `;`.
    fn on_lock(&mut self, statement: &str) -> Result<()>;

    /// `UNLOCK TABLES` without the `;`.
    fn on_unlock(&mut self, statement: &str) -> Result<()>;

    /// A CREATE TABLE statement. `header` runs up to the opening parenthesis,
    /// `trailing_options` from after the closing one up to the `;`.
    fn on_ddl(
        &mut self,
        header: &str,
        columns: &[TableElement],
        trailing_options: &str,
    ) -> Result<()>;

    /// An INSERT statement. `rows` parses one tuple per pull straight off the
    /// input, so it must be drained in order. Rows left unpulled are skipped
    /// by the parser once this returns.
    fn on_insert<I>(&mut self, header: &str, rows: I) -> Result<()>
    where
        I: Iterator<Item = Result<Row>>;
}

/// Materializes every event, rows included. Meant for tests and small dumps.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    pub statements: Vec<Statement>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        CollectingHandler::default()
    }

    pub fn into_statements(self) -> Vec<Statement> {
        self.statements
    }
}

impl ParseHandler for CollectingHandler {
    fn on_text(&mut self, text: &str) -> Result<()> {
        self.statements.push(Statement::Text(text.to_string()));
        Ok(())
    }

    fn on_drop_table(&mut self, statement: &str) -> Result<()> {
        self.statements
            .push(Statement::DropTable(statement.to_string()));
        Ok(())
    }

    fn on_lock(&mut self, statement: &str) -> Result<()> {
        self.statements.push(Statement::Lock(statement.to_string()));
        Ok(())
    }

    fn on_unlock(&mut self, statement: &str) -> Result<()> {
        self.statements.push(Statement::Unlock(statement.to_string()));
        Ok(())
    }

    fn on_ddl(
        &mut self,
        header: &str,
        columns: &[TableElement],
        trailing_options: &str,
    ) -> Result<()> {
        self.statements.push(Statement::CreateTable {
            header: header.to_string(),
            columns: columns.to_vec(),
            trailing_options: trailing_options.to_string(),
        });
        Ok(())
    }

    fn on_insert<I>(&mut self, header: &str, rows: I) -> Result<()>
    where
        I: Iterator<Item = Result<Row>>,
    {
        let rows = rows.collect::<Result<Vec<_>>>()?;
        self.statements.push(Statement::Insert {
            header: header.to_string(),
            rows,
        });
        Ok(())
    }
}
