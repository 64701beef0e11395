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

use std::fmt;

/// A literal found inside an INSERT tuple
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `NULL` value
    Null,
    /// Numeric literal without a decimal point
    Integer(i64),
    /// Numeric literal with a decimal point
    Float(f64),
    /// 'string value', with backslash escapes already resolved
    Text(String),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One parenthesized INSERT tuple, aligned with the table's column list.
pub type Row = Vec<Value>;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", escape_mysql_string(v)),
        }
    }
}

pub struct EscapeMysqlString<'a>(&'a str);

impl<'a> fmt::Display for EscapeMysqlString<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut start = 0;
        for (i, c) in self.0.char_indices() {
            if c == '\\' || c == '\'' || c == '"' {
                f.write_str(&self.0[start..i])?;
                write!(f, "\\{}", c)?;
                start = i + c.len_utf8();
            }
        }
        f.write_str(&self.0[start..])
    }
}

/// Backslash-escape `\`, `'` and `"` for use inside a single-quoted literal.
pub fn escape_mysql_string(s: &str) -> EscapeMysqlString<'_> {
    EscapeMysqlString(s)
}

/// Renders a row as `(v1,v2,...)`.
pub struct DisplayRow<'a>(pub &'a [Value]);

impl<'a> fmt::Display for DisplayRow<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("(")?;
        let mut delim = "";
        for value in self.0 {
            write!(f, "{}{}", delim, value)?;
            delim = ",";
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_escapes_quotes_and_backslashes() {
        let value = Value::Text(r#"it's a "quote" \ here"#.to_string());
        assert_eq!(value.to_string(), r#"'it\'s a \"quote\" \\ here'"#);
    }

    #[test]
    fn numbers_render_in_decimal_form() {
        assert_eq!(Value::Integer(-42).to_string(), "-42");
        assert_eq!(Value::Float(12.0).to_string(), "12.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn rows_are_comma_joined_without_spaces() {
        let row = vec![Value::Integer(2), Value::Null, Value::Text("x".into())];
        assert_eq!(DisplayRow(&row).to_string(), "(2,NULL,'x')");
    }
}
