//! Document root and the JSON channels.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::block::Block;

/// Error reading or writing a Pandoc JSON document.
#[derive(Debug, thiserror::Error)]
pub enum AstError {
    #[error("invalid Pandoc JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A Pandoc document: API version, metadata and top-level blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pandoc {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    pub meta: Map<String, Value>,
    pub blocks: Vec<Block>,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self {
            api_version: vec![1, 23, 1],
            meta: Map::new(),
            blocks: Vec::new(),
        }
    }
}

impl Pandoc {
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AstError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn read<R: Read>(reader: R) -> Result<Self, AstError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), AstError> {
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Append raw LaTeX to the `header-includes` metadata.
    ///
    /// Existing entries are kept; a single non-list value is turned into a
    /// list holding the old value first.
    pub fn push_header_include(&mut self, latex: &str) {
        let entry = json!({
            "t": "MetaBlocks",
            "c": [{"t": "RawBlock", "c": ["latex", latex]}]
        });

        match self.meta.remove("header-includes") {
            Some(mut existing) if existing.get("t").and_then(Value::as_str) == Some("MetaList") => {
                if let Some(Value::Array(items)) = existing.get_mut("c") {
                    items.push(entry);
                }
                self.meta.insert("header-includes".to_owned(), existing);
            }
            Some(existing) => {
                self.meta.insert(
                    "header-includes".to_owned(),
                    json!({"t": "MetaList", "c": [existing, entry]}),
                );
            }
            None => {
                self.meta.insert(
                    "header-includes".to_owned(),
                    json!({"t": "MetaList", "c": [entry]}),
                );
            }
        }
    }
}
