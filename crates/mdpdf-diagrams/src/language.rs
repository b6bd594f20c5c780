//! Diagram kinds, artifact formats and request/result types.

use std::fmt;
use std::path::PathBuf;

/// Supported diagram languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Mermaid,
    PlantUml,
}

impl DiagramKind {
    /// Parse kind from a code block class.
    ///
    /// Returns None if the class is not a diagram fence tag.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mermaid" => Some(Self::Mermaid),
            "plantuml" => Some(Self::PlantUml),
            _ => None,
        }
    }

    /// Fence tag and cache key component.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
        }
    }

    /// Human-readable label used in captions and diagnostics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mermaid => "Mermaid",
            Self::PlantUml => "PlantUML",
        }
    }

    /// Extension of the scratch source file handed to the renderer.
    #[must_use]
    pub fn source_extension(self) -> &'static str {
        match self {
            Self::Mermaid => "mmd",
            Self::PlantUml => "puml",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Artifact image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Raster output, embeddable by every LaTeX engine.
    #[default]
    Png,
    Pdf,
    Svg,
}

impl ImageFormat {
    /// Parse format from a file extension.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// File extension, also the `{format}` placeholder value.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Svg => "svg",
        }
    }
}

/// A diagram to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramRequest {
    pub kind: DiagramKind,
    /// Diagram source as written in the document.
    pub source: String,
}

impl DiagramRequest {
    #[must_use]
    pub fn new(kind: DiagramKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }
}

/// A rendered diagram on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Content digest naming the artifact.
    pub key: String,
    pub image_path: PathBuf,
    pub format: ImageFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(DiagramKind::parse("mermaid"), Some(DiagramKind::Mermaid));
        assert_eq!(DiagramKind::parse("plantuml"), Some(DiagramKind::PlantUml));
        assert_eq!(DiagramKind::parse("Mermaid"), None);
        assert_eq!(DiagramKind::parse("python"), None);
    }

    #[test]
    fn test_format_round_trip_names() {
        for format in [ImageFormat::Png, ImageFormat::Pdf, ImageFormat::Svg] {
            assert_eq!(ImageFormat::parse(format.extension()), Some(format));
        }
        assert_eq!(ImageFormat::parse("gif"), None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DiagramKind::PlantUml.to_string(), "PlantUML");
    }
}
