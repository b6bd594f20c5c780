//! Table structure, down to the blocks held by each cell.
//!
//! Layout fields (alignment, spans, column specs) stay raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Attr, Block};

/// Table caption: optional short caption and caption body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Caption(pub Value, pub Vec<Block>);

/// Cell: attributes, alignment, row span, column span, content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell(pub Attr, pub Value, pub Value, pub Value, pub Vec<Block>);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row(pub Attr, pub Vec<Cell>);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableHead(pub Attr, pub Vec<Row>);

/// Body: attributes, row-head column count, intermediate head rows, rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableBody(pub Attr, pub Value, pub Vec<Row>, pub Vec<Row>);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableFoot(pub Attr, pub Vec<Row>);

/// Block lists of every cell in `rows`.
pub(crate) fn cell_blocks_mut<'a>(
    rows: impl IntoIterator<Item = &'a mut Row>,
) -> impl Iterator<Item = &'a mut Vec<Block>> {
    rows.into_iter()
        .flat_map(|Row(_, cells)| cells.iter_mut().map(|Cell(.., blocks)| blocks))
}
