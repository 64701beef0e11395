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

//! Structured notes: JSON documents stored in a text column. Only the
//! fields that carry prose are scrambled; keys, types and layout survive.

use serde_json::Value as Json;

use crate::error::{DumpError, Result};
use crate::scrambler::Scrambler;

/// String attributes scrambled wherever they appear.
const TEXT_ATTRIBUTES: &[&str] = &[
    "actuate",
    "arcrole",
    "href",
    "role",
    "show",
    "title",
    "type",
    "value",
    "reference_text",
];

pub(crate) fn scramble_note(
    scrambler: &mut Scrambler,
    table: &str,
    column: &str,
    text: &str,
) -> Result<String> {
    let malformed = |source: serde_json::Error| DumpError::MalformedNote {
        table: table.to_string(),
        column: column.to_string(),
        source,
    };

    let mut document: Json = serde_json::from_str(text).map_err(malformed)?;
    scrub(scrambler, &mut document)?;
    serde_json::to_string(&document).map_err(malformed)
}

fn is_truthy(value: &Json) -> bool {
    !matches!(value, Json::Null | Json::Bool(false))
}

fn scramble_in_place(scrambler: &mut Scrambler, text: &mut String) -> Result<()> {
    *text = scrambler.scramble(text)?;
    Ok(())
}

fn scrub(scrambler: &mut Scrambler, node: &mut Json) -> Result<()> {
    match node {
        Json::Object(map) => {
            if map.get("content").map_or(false, is_truthy) {
                if let Some(content) = map.get_mut("content") {
                    scrub_content(scrambler, content)?;
                }
            } else {
                for (key, value) in map.iter_mut() {
                    if key != "items" {
                        scrub(scrambler, value)?;
                    }
                }
            }

            if let Some(Json::Array(items)) = map.get_mut("items") {
                for item in items.iter_mut() {
                    match item {
                        Json::String(text) => scramble_in_place(scrambler, text)?,
                        other => scrub(scrambler, other)?,
                    }
                }
            }

            for attribute in TEXT_ATTRIBUTES {
                if let Some(Json::String(text)) = map.get_mut(*attribute) {
                    scramble_in_place(scrambler, text)?;
                }
            }
        }
        Json::Array(elements) => {
            for element in elements.iter_mut() {
                scrub(scrambler, element)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// `content` is a string, a list of strings, or (rarely) nested structure.
fn scrub_content(scrambler: &mut Scrambler, content: &mut Json) -> Result<()> {
    match content {
        Json::String(text) => scramble_in_place(scrambler, text),
        Json::Array(parts) => {
            for part in parts.iter_mut() {
                match part {
                    Json::String(text) => scramble_in_place(scrambler, text)?,
                    other => scrub(scrambler, other)?,
                }
            }
            Ok(())
        }
        other => scrub(scrambler, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;
    use serde_json::json;

    fn scrub_json(scrambler: &mut Scrambler, document: Json) -> Json {
        let text = document.to_string();
        let scrubbed = scramble_note(scrambler, "note", "notes", &text).unwrap();
        serde_json::from_str(&scrubbed).unwrap()
    }

    #[test]
    fn content_string_and_attributes_are_scrambled() {
        let mut scrambler = Scrambler::with_secret("k");
        let note = json!({
            "jsonmodel_type": "note_singlepart",
            "type": "abstract",
            "content": ["Letters written by Jane Doe in 1910"],
            "publish": true,
            "persistent_id": "aspace_123"
        });

        let out = scrub_json(&mut scrambler, note);

        assert_eq!(out["jsonmodel_type"], "note_singlepart");
        assert_eq!(out["publish"], true);
        assert_eq!(out["persistent_id"], "aspace_123");
        let expected_type = scrambler.scramble("abstract").unwrap();
        assert_eq!(out["type"], Json::String(expected_type));
        let expected_content = scrambler
            .scramble("Letters written by Jane Doe in 1910")
            .unwrap();
        assert_eq!(out["content"][0], Json::String(expected_content));
    }

    #[test]
    fn without_content_every_value_is_visited_once() {
        let mut scrambler = Scrambler::with_secret("k");
        let note = json!({
            "jsonmodel_type": "note_multipart",
            "subnotes": [
                { "jsonmodel_type": "note_text", "content": "Series one" },
                {
                    "jsonmodel_type": "note_orderedlist",
                    "title": "Contents",
                    "items": ["first item", { "label": "x", "value": "second item" }]
                }
            ]
        });

        let out = scrub_json(&mut scrambler, note);

        let subnotes = &out["subnotes"];
        assert_eq!(subnotes[0]["jsonmodel_type"], "note_text");
        assert_eq!(
            subnotes[0]["content"],
            Json::String(scrambler.scramble("Series one").unwrap())
        );
        assert_eq!(
            subnotes[1]["title"],
            Json::String(scrambler.scramble("Contents").unwrap())
        );
        assert_eq!(
            subnotes[1]["items"][0],
            Json::String(scrambler.scramble("first item").unwrap())
        );
        assert_eq!(subnotes[1]["items"][1]["label"], "x");
        assert_eq!(
            subnotes[1]["items"][1]["value"],
            Json::String(scrambler.scramble("second item").unwrap())
        );
    }

    #[test]
    fn key_order_and_compact_layout_survive() {
        let mut scrambler = Scrambler::with_secret("k");
        let out = scramble_note(&mut scrambler, "note", "notes", r#"{"z":1,"a":[true,null]}"#).unwrap();
        assert_eq!(out, r#"{"z":1,"a":[true,null]}"#);
    }

    #[test]
    fn invalid_json_names_the_column() {
        let mut scrambler = Scrambler::with_secret("k");
        assert_matches!(
            scramble_note(&mut scrambler, "note", "notes", "{not json"),
            Err(DumpError::MalformedNote { ref table, ref column, .. })
                if table == "note" && column == "notes"
        );
    }
}
