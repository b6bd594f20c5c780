//! In-process `CommonMark` parser producing Pandoc blocks.
//!
//! Covers the constructs that matter for inclusion: headers with
//! Pandoc-style identifiers, paragraphs, fenced and indented code, quotes,
//! lists, images, links and raw HTML. Tables and footnotes degrade to their
//! text content.

use std::mem;
use std::path::Path;

use mdpdf_ast::{Attr, Block, Format, Inline, inline};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use serde_json::{Value, json};

use crate::parser::{DocumentParser, ParseError};

/// `pulldown-cmark` based parser, no external process.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmarkParser;

impl DocumentParser for CmarkParser {
    fn parse(&self, markdown: &str, path: &Path) -> Result<Vec<Block>, ParseError> {
        tracing::debug!(path = %path.display(), "parsing included document with builtin parser");
        Ok(convert(markdown))
    }
}

#[derive(Debug)]
enum Node {
    Document,
    Paragraph,
    Heading { level: u8, id: Option<String>, classes: Vec<String> },
    BlockQuote,
    List { start: Option<u64> },
    Item,
    Code { classes: Vec<String>, text: String },
    Html(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: String },
    Image { url: String, title: String },
    /// Constructs without a modelled counterpart; content moves to the parent.
    Passthrough,
}

#[derive(Debug)]
struct Frame {
    node: Node,
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    items: Vec<Vec<Block>>,
}

impl Frame {
    fn new(node: Node) -> Self {
        Self {
            node,
            blocks: Vec::new(),
            inlines: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Turn loose inlines (tight list items) into a `Plain` block.
    fn flush_inlines(&mut self) {
        if !self.inlines.is_empty() {
            self.blocks.push(Block::Plain(mem::take(&mut self.inlines)));
        }
    }

    fn push_block(&mut self, block: Block) {
        self.flush_inlines();
        self.blocks.push(block);
    }
}

fn convert(markdown: &str) -> Vec<Block> {
    let options = Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_HEADING_ATTRIBUTES;
    let mut stack = vec![Frame::new(Node::Document)];

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(tag) => stack.push(Frame::new(node_for(tag))),
            Event::End(_) => {
                if stack.len() > 1
                    && let Some(frame) = stack.pop()
                    && let Some(parent) = stack.last_mut()
                {
                    close(frame, parent);
                }
            }
            other => {
                if let Some(top) = stack.last_mut() {
                    leaf(other, top);
                }
            }
        }
    }

    let mut document = stack.swap_remove(0);
    document.flush_inlines();
    document.blocks
}

fn node_for(tag: Tag<'_>) -> Node {
    match tag {
        Tag::Paragraph => Node::Paragraph,
        Tag::Heading {
            level, id, classes, ..
        } => Node::Heading {
            level: heading_level_to_num(level),
            id: id.map(|id| id.to_string()),
            classes: classes.iter().map(ToString::to_string).collect(),
        },
        Tag::BlockQuote(_) => Node::BlockQuote,
        Tag::List(start) => Node::List { start },
        Tag::Item => Node::Item,
        Tag::CodeBlock(kind) => Node::Code {
            classes: match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .map(|lang| vec![lang.to_owned()])
                    .unwrap_or_default(),
                CodeBlockKind::Indented => Vec::new(),
            },
            text: String::new(),
        },
        Tag::HtmlBlock => Node::Html(String::new()),
        Tag::Emphasis => Node::Emphasis,
        Tag::Strong => Node::Strong,
        Tag::Strikethrough => Node::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => Node::Link {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        Tag::Image {
            dest_url, title, ..
        } => Node::Image {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        _ => Node::Passthrough,
    }
}

/// Handle a non-container event inside `top`.
fn leaf(event: Event<'_>, top: &mut Frame) {
    if let Node::Code { text, .. } | Node::Html(text) = &mut top.node
        && let Event::Text(s) | Event::Html(s) = &event
    {
        text.push_str(s);
        return;
    }

    match event {
        Event::Text(s) => push_text(&mut top.inlines, &s),
        Event::Code(s) => top.inlines.push(inline::code(&s)),
        Event::InlineHtml(s) => top
            .inlines
            .push(json!({"t": "RawInline", "c": ["html", &*s]})),
        Event::Html(s) => top.push_block(Block::RawBlock(Format("html".to_owned()), s.to_string())),
        Event::InlineMath(s) => top
            .inlines
            .push(json!({"t": "Math", "c": [{"t": "InlineMath"}, &*s]})),
        Event::DisplayMath(s) => top
            .inlines
            .push(json!({"t": "Math", "c": [{"t": "DisplayMath"}, &*s]})),
        Event::SoftBreak => top.inlines.push(json!({"t": "SoftBreak"})),
        Event::HardBreak => top.inlines.push(json!({"t": "LineBreak"})),
        Event::Rule => top.push_block(Block::Other(json!({"t": "HorizontalRule"}))),
        _ => {}
    }
}

/// Attach a finished frame to its parent.
fn close(mut frame: Frame, parent: &mut Frame) {
    let empty_attr = || json!(["", [], []]);

    match frame.node {
        Node::Paragraph => parent.push_block(Block::Para(frame.inlines)),
        Node::Heading { level, id, classes } => {
            let id = id.unwrap_or_else(|| slugify(&inline::plain_text(&frame.inlines)));
            parent.push_block(Block::Header(level, Attr(id, classes, Vec::new()), frame.inlines));
        }
        Node::BlockQuote => {
            frame.flush_inlines();
            parent.push_block(Block::BlockQuote(frame.blocks));
        }
        Node::List { start } => parent.push_block(match start {
            Some(start) => Block::OrderedList(
                json!([start, {"t": "Decimal"}, {"t": "Period"}]),
                frame.items,
            ),
            None => Block::BulletList(frame.items),
        }),
        Node::Item => {
            frame.flush_inlines();
            parent.items.push(frame.blocks);
        }
        Node::Code { classes, text } => {
            let text = text.strip_suffix('\n').unwrap_or(&text).to_owned();
            parent.push_block(Block::CodeBlock(Attr::with_classes(classes), text));
        }
        Node::Html(text) => parent.push_block(Block::RawBlock(Format("html".to_owned()), text)),
        Node::Emphasis => parent.inlines.push(json!({"t": "Emph", "c": frame.inlines})),
        Node::Strong => parent.inlines.push(inline::strong(frame.inlines)),
        Node::Strikethrough => parent
            .inlines
            .push(json!({"t": "Strikeout", "c": frame.inlines})),
        Node::Link { url, title } => parent.inlines.push(json!({
            "t": "Link",
            "c": [empty_attr(), frame.inlines, [url, title]]
        })),
        Node::Image { url, title } => parent.inlines.push(json!({
            "t": "Image",
            "c": [empty_attr(), frame.inlines, [url, title]]
        })),
        Node::Passthrough | Node::Document => {
            parent.inlines.append(&mut frame.inlines);
            parent.blocks.append(&mut frame.blocks);
            for item in frame.items {
                parent.blocks.extend(item);
            }
        }
    }
}

/// Append prose as `Str`/`Space` inlines, collapsing whitespace runs.
fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    let mut word = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            if !word.is_empty() {
                inlines.push(inline::str(&mem::take(&mut word)));
            }
            if !matches!(inlines.last(), Some(Value::Object(o)) if o.get("t") == Some(&json!("Space")))
            {
                inlines.push(inline::space());
            }
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        inlines.push(inline::str(&word));
    }
}

/// Pandoc-style header identifier.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars().skip_while(|c| !c.is_alphabetic()) {
        if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_owned();
    if slug.is_empty() {
        "section".to_owned()
    } else {
        slug
    }
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
