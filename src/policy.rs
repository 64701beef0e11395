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

//! Which text values get scrambled, replaced or left alone.
//!
//! Table names match exactly. Column names and data types match
//! case-insensitively and are stored lower-cased.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use crate::ast::ColumnDefinition;

/// bcrypt hash of the password `admin`.
pub const ADMIN_PASSWORD_HASH: &str = "$2a$10$bq/XuojTCE1UtnAEiU5Mkux0lEAKXa9yl/d4.h3CcZB/hNWDeGJPe";

/// What to do with one text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueAction<'a> {
    /// Parse as a structured note and scramble its text fields.
    StructuredNote,
    /// Replace wholesale with a constant.
    Replace(&'a str),
    /// Leave as is.
    Keep,
    Scramble,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Policy {
    /// table -> columns left unscrambled in that table
    #[serde(default)]
    pub exempt_columns: BTreeMap<String, BTreeSet<String>>,
    /// columns left unscrambled in every table
    #[serde(default)]
    pub exempt_column_names: BTreeSet<String>,
    /// data types left unscrambled in every table
    #[serde(default)]
    pub exempt_data_types: BTreeSet<String>,
    /// table -> columns holding structured notes
    #[serde(default)]
    pub structured_notes: BTreeMap<String, BTreeSet<String>>,
    /// table -> column -> replacement
    #[serde(default)]
    pub fixed_values: BTreeMap<String, BTreeMap<String, String>>,
}

impl Policy {
    /// A policy that scrambles every text value.
    pub fn empty() -> Self {
        Policy {
            exempt_columns: BTreeMap::new(),
            exempt_column_names: BTreeSet::new(),
            exempt_data_types: BTreeSet::new(),
            structured_notes: BTreeMap::new(),
            fixed_values: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Policy>(json).map(Policy::normalized)
    }

    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader::<_, Policy>(reader).map(Policy::normalized)
    }

    fn normalized(self) -> Self {
        fn lower_set(set: BTreeSet<String>) -> BTreeSet<String> {
            set.into_iter().map(|s| s.to_lowercase()).collect()
        }

        Policy {
            exempt_columns: self
                .exempt_columns
                .into_iter()
                .map(|(table, columns)| (table, lower_set(columns)))
                .collect(),
            exempt_column_names: lower_set(self.exempt_column_names),
            exempt_data_types: lower_set(self.exempt_data_types),
            structured_notes: self
                .structured_notes
                .into_iter()
                .map(|(table, columns)| (table, lower_set(columns)))
                .collect(),
            fixed_values: self
                .fixed_values
                .into_iter()
                .map(|(table, columns)| {
                    let columns = columns
                        .into_iter()
                        .map(|(column, value)| (column.to_lowercase(), value))
                        .collect();
                    (table, columns)
                })
                .collect(),
        }
    }

    pub fn exempt_column(mut self, table: &str, column: &str) -> Self {
        self.exempt_columns
            .entry(table.to_string())
            .or_default()
            .insert(column.to_lowercase());
        self
    }

    pub fn exempt_column_name(mut self, column: &str) -> Self {
        self.exempt_column_names.insert(column.to_lowercase());
        self
    }

    pub fn exempt_data_type(mut self, data_type: &str) -> Self {
        self.exempt_data_types.insert(data_type.to_lowercase());
        self
    }

    pub fn structured_note(mut self, table: &str, column: &str) -> Self {
        self.structured_notes
            .entry(table.to_string())
            .or_default()
            .insert(column.to_lowercase());
        self
    }

    pub fn fixed_value(mut self, table: &str, column: &str, value: &str) -> Self {
        self.fixed_values
            .entry(table.to_string())
            .or_default()
            .insert(column.to_lowercase(), value.to_string());
        self
    }

    fn in_table(map: &BTreeMap<String, BTreeSet<String>>, table: &str, column: &str) -> bool {
        map.get(table).map_or(false, |columns| columns.contains(column))
    }

    /// Whether `data_type` (lower-cased) or its base before `(` is exempt.
    fn exempt_type(&self, data_type: &str) -> bool {
        let base = data_type.split('(').next().unwrap_or(data_type);
        self.exempt_data_types.contains(data_type) || self.exempt_data_types.contains(base)
    }

    /// Structured note, then fixed value, then exemptions, then scramble.
    pub fn action_for(&self, table: &str, column: &ColumnDefinition) -> ValueAction<'_> {
        let name = column.name.to_lowercase();

        if Policy::in_table(&self.structured_notes, table, &name) {
            return ValueAction::StructuredNote;
        }

        if let Some(value) = self
            .fixed_values
            .get(table)
            .and_then(|columns| columns.get(&name))
        {
            return ValueAction::Replace(value);
        }

        if Policy::in_table(&self.exempt_columns, table, &name)
            || self.exempt_column_names.contains(&name)
            || self.exempt_type(&column.data_type.to_lowercase())
        {
            return ValueAction::Keep;
        }

        ValueAction::Scramble
    }
}

impl Default for Policy {
    /// The policy for ArchivesSpace dumps: identifiers, enumerations, codes,
    /// measurements and dates stay readable, notes are scrambled inside their
    /// JSON, and every user gets the password `admin`.
    fn default() -> Self {
        let table_columns: &[(&str, &[&str])] = &[
            ("permission", &["permission_code"]),
            ("enumeration", &["name"]),
            ("enumeration_value", &["value"]),
            ("resource", &["identifier"]),
            ("accession", &["identifier"]),
            ("container", &["container_extent"]),
            (
                "container_profile",
                &["width", "depth", "height", "stacking_limit"],
            ),
            ("user", &["agent_record_type"]),
            (
                "collection_management",
                &[
                    "processing_hours_per_foot_estimate",
                    "processing_total_extent",
                    "processing_hours_total",
                ],
            ),
            ("date", &["begin", "end"]),
            ("subnote_metadata", &["guid"]),
        ];

        let mut policy = Policy::empty()
            .structured_note("note", "notes")
            .fixed_value("auth_db", "pwhash", ADMIN_PASSWORD_HASH);

        for (table, columns) in table_columns {
            for column in columns.iter() {
                policy = policy.exempt_column(table, column);
            }
        }
        for column in &[
            "real_1",
            "real_2",
            "integer_1",
            "integer_2",
            "integer_3",
            "jsonmodel_type",
        ] {
            policy = policy.exempt_column_name(column);
        }
        for data_type in &["datetime", "date", "timestamp"] {
            policy = policy.exempt_data_type(data_type);
        }

        policy
    }
}
