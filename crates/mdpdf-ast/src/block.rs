//! Block-level nodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inline::{self, Inline};
use crate::table::{self, Caption, TableBody, TableFoot, TableHead};

/// Pandoc attribute triple: identifier, classes, key-value pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr(pub String, pub Vec<String>, pub Vec<(String, String)>);

impl Attr {
    /// Attribute with only classes set.
    #[must_use]
    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            String::new(),
            classes.into_iter().map(Into::into).collect(),
            Vec::new(),
        )
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.1
    }

    /// First class, which Pandoc fills from the fence info string.
    #[must_use]
    pub fn first_class(&self) -> Option<&str> {
        self.1.first().map(String::as_str)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.1.iter().any(|c| c == class)
    }

    /// Value of a `key=value` attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.2
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw block format name (`latex`, `html`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format(pub String);

impl Format {
    #[must_use]
    pub fn latex() -> Self {
        Self("latex".to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A block node of the Pandoc AST.
///
/// Container variants are modelled so a tree walk can reach code blocks
/// nested in quotes, divs, lists and table cells. Any block kind not listed here
/// round-trips through [`Block::Other`] unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Block {
    Plain(Vec<Inline>),
    Para(Vec<Inline>),
    CodeBlock(Attr, String),
    RawBlock(Format, String),
    BlockQuote(Vec<Block>),
    OrderedList(Value, Vec<Vec<Block>>),
    BulletList(Vec<Vec<Block>>),
    DefinitionList(Vec<(Vec<Inline>, Vec<Vec<Block>>)>),
    Header(u8, Attr, Vec<Inline>),
    Figure(Attr, Value, Vec<Block>),
    Table(Attr, Caption, Vec<Value>, TableHead, Vec<TableBody>, TableFoot),
    Div(Attr, Vec<Block>),
    /// Any other block, kept as the JSON Pandoc produced.
    #[serde(untagged)]
    Other(Value),
}

impl Block {
    /// Code block with the given classes.
    #[must_use]
    pub fn code<S: Into<String>>(classes: &[&str], text: S) -> Self {
        Self::CodeBlock(Attr::with_classes(classes.iter().copied()), text.into())
    }

    /// Raw LaTeX block.
    #[must_use]
    pub fn raw_latex<S: Into<String>>(text: S) -> Self {
        Self::RawBlock(Format::latex(), text.into())
    }

    /// Header with plain-text content.
    #[must_use]
    pub fn header(level: u8, text: &str) -> Self {
        Self::Header(level, Attr::default(), inline::text(text))
    }

    /// Paragraph with plain-text content.
    #[must_use]
    pub fn para(text: &str) -> Self {
        Self::Para(inline::text(text))
    }

    /// Nested block lists, in document order.
    pub fn children_mut(&mut self) -> Vec<&mut Vec<Block>> {
        match self {
            Self::BlockQuote(blocks) | Self::Figure(_, _, blocks) | Self::Div(_, blocks) => {
                vec![blocks]
            }
            Self::OrderedList(_, items) | Self::BulletList(items) => items.iter_mut().collect(),
            Self::DefinitionList(entries) => entries
                .iter_mut()
                .flat_map(|(_, definitions)| definitions.iter_mut())
                .collect(),
            Self::Table(
                _,
                Caption(_, caption),
                _,
                TableHead(_, head),
                bodies,
                TableFoot(_, foot),
            ) => {
                let mut lists = vec![caption];
                lists.extend(table::cell_blocks_mut(head.iter_mut()));
                for TableBody(_, _, intermediate, rows) in bodies.iter_mut() {
                    let rows = intermediate.iter_mut().chain(rows.iter_mut());
                    lists.extend(table::cell_blocks_mut(rows));
                }
                lists.extend(table::cell_blocks_mut(foot.iter_mut()));
                lists
            }
            Self::Plain(_)
            | Self::Para(_)
            | Self::CodeBlock(..)
            | Self::RawBlock(..)
            | Self::Header(..)
            | Self::Other(_) => Vec::new(),
        }
    }

    /// Visit every raw JSON value held by this block and its descendants.
    ///
    /// Inline lists, captions and pass-through blocks are visited; typed
    /// fields (attributes, code text) are not.
    pub fn visit_json_mut(&mut self, f: &mut dyn FnMut(&mut Value)) {
        match self {
            Self::Plain(inlines) | Self::Para(inlines) | Self::Header(_, _, inlines) => {
                inlines.iter_mut().for_each(&mut *f);
            }
            Self::DefinitionList(entries) => {
                for (term, _) in entries.iter_mut() {
                    term.iter_mut().for_each(&mut *f);
                }
            }
            Self::Figure(_, caption, _) => f(caption),
            Self::Table(_, Caption(short, _), ..) => f(short),
            Self::Other(value) => f(value),
            Self::CodeBlock(..)
            | Self::RawBlock(..)
            | Self::BlockQuote(_)
            | Self::OrderedList(..)
            | Self::BulletList(_)
            | Self::Div(..) => {}
        }
        for children in self.children_mut() {
            for child in children.iter_mut() {
                child.visit_json_mut(f);
            }
        }
    }

    /// Visit this block and all nested blocks, pre-order.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Block)) {
        f(self);
        for children in self.children_mut() {
            for child in children.iter_mut() {
                child.visit_mut(f);
            }
        }
    }
}
