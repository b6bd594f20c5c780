//! Target output formats.

use mdpdf_diagrams::ImageFormat;

/// Family of the writer Pandoc runs after the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `latex`, `beamer` and PDF output: raw LaTeX blocks are honoured.
    Latex,
    /// HTML-based writers.
    Html,
    Other,
}

impl OutputFormat {
    /// Classify the format name Pandoc passes as the filter's first argument.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let base = name
            .split(['+', '-'])
            .next()
            .unwrap_or(name)
            .to_ascii_lowercase();
        match base.as_str() {
            "latex" | "pdf" | "beamer" => Self::Latex,
            "html" | "html4" | "html5" | "epub" | "epub2" | "epub3" | "revealjs" | "slidy"
            | "s5" | "dzslides" | "slideous" => Self::Html,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn is_latex(self) -> bool {
        self == Self::Latex
    }

    /// Diagram artifact format suited to this writer.
    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Html => ImageFormat::Svg,
            Self::Latex | Self::Other => ImageFormat::Png,
        }
    }
}
