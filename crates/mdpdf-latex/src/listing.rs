//! Code blocks as `lstlisting` environments.

use mdpdf_ast::{Attr, Block};
use mdpdf_config::{LanguageColors, Rgb, StyleConfig};

use crate::escape::escape_latex;
use crate::language::listings_language;
use crate::preamble::color;

/// Rewrites verbatim code into `listings` markup using a fixed style.
///
/// Formatting cannot fail: unknown languages fall back to the generic style
/// and the style itself is validated when configuration loads.
#[derive(Debug, Clone, Default)]
pub struct CodeFormatter {
    style: StyleConfig,
}

impl CodeFormatter {
    #[must_use]
    pub fn new(style: StyleConfig) -> Self {
        Self { style }
    }

    #[must_use]
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Raw LaTeX block for a code block, language taken from its first class.
    #[must_use]
    pub fn format_block(&self, attr: &Attr, text: &str) -> Block {
        Block::raw_latex(self.format(attr.first_class(), attr.attribute("caption"), text))
    }

    /// `lstlisting` environment for `text`.
    ///
    /// `language` is the fence tag (`python`, `yaml`, ...), not the
    /// `listings` name.
    #[must_use]
    pub fn format(&self, language: Option<&str>, caption: Option<&str>, text: &str) -> String {
        let style = &self.style;
        let overrides = language.and_then(|tag| {
            style
                .colors
                .get(tag)
                .or_else(|| style.colors.get(&tag.to_ascii_lowercase()))
        });

        let mut options = Vec::new();
        if let Some(name) = language.and_then(listings_language) {
            options.push(format!("language={name}"));
        }
        if let Some(caption) = caption.map(str::trim).filter(|c| !c.is_empty()) {
            options.push(format!("caption={{{}}}", escape_latex(caption)));
        }
        options.push(format!("aboveskip={}pt", style.margin_before));
        options.push(format!("belowskip={}pt", style.margin_after));
        options.push(format!("framerule={}pt", style.border_thickness));
        options.push(format!(
            "backgroundcolor={}",
            color_ref(overrides.and_then(|o| o.background), "background")
        ));
        options.extend(color_overrides(overrides));

        let mut body = text.to_owned();
        if !body.ends_with('\n') {
            body.push('\n');
        }

        format!(
            "\\noindent\n\\begin{{lstlisting}}[{}]\n{body}\\end{{lstlisting}}",
            options.join(", ")
        )
    }
}

fn color_overrides(overrides: Option<&LanguageColors>) -> Vec<String> {
    let Some(colors) = overrides else {
        return Vec::new();
    };
    let mut options = Vec::new();
    if let Some(rgb) = colors.keyword {
        options.push(format!("keywordstyle={}", color_ref(Some(rgb), "keyword")));
    }
    if let Some(rgb) = colors.comment {
        options.push(format!(
            "commentstyle=\\itshape{}",
            color_ref(Some(rgb), "comment")
        ));
    }
    if let Some(rgb) = colors.string {
        options.push(format!("stringstyle={}", color_ref(Some(rgb), "string")));
    }
    options
}

/// `\color` command for an explicit colour, or for a named preamble colour.
fn color_ref(rgb: Option<Rgb>, fallback: &str) -> String {
    match rgb {
        Some(rgb) => format!("\\color[RGB]{{{}}}", rgb.latex()),
        None => format!("\\color{{{}}}", color(fallback)),
    }
}
