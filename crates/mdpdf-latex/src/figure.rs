//! Figures, error markers and spacing.

use crate::escape::escape_latex;
use crate::preamble::color;

/// Float placement of a figure environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `[H]`: exactly here (needs the `float` package).
    Here,
    /// `[htbp]`: let LaTeX choose.
    Float,
}

impl Placement {
    fn option(self) -> &'static str {
        match self {
            Self::Here => "H",
            Self::Float => "htbp",
        }
    }
}

/// Full-width figure showing an image file.
#[must_use]
pub fn figure(image_path: &str, caption: &str, placement: Placement) -> String {
    let prefix = match placement {
        Placement::Here => "\\noindent\n",
        Placement::Float => "",
    };
    format!(
        "{prefix}\\begin{{figure}}[{}]\n\\centering\n\\includegraphics[width=\\textwidth]{{{}}}\n\\caption{{{}}}\n\\end{{figure}}",
        placement.option(),
        image_path.replace('\\', "/"),
        escape_latex(caption),
    )
}

/// Red framed box standing in for a node that failed to process.
#[must_use]
pub fn error_box(message: &str) -> String {
    let error = color("error");
    format!(
        "\\noindent\\fcolorbox{{{error}}}{{white}}{{\\parbox{{\\dimexpr\\linewidth-2\\fboxsep-2\\fboxrule\\relax}}{{\\textcolor{{{error}}}{{\\textbf{{Error:}}}} {}}}}}",
        escape_latex(message)
    )
}

/// Vertical space of a LaTeX length such as `5pt`.
#[must_use]
pub fn vspace(length: &str) -> String {
    format!("\\vspace{{{length}}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_figure_here() {
        assert_eq!(
            figure("diagram-images/ab12.png", "Mermaid diagram", Placement::Here),
            "\\noindent\n\\begin{figure}[H]\n\\centering\n\\includegraphics[width=\\textwidth]{diagram-images/ab12.png}\n\\caption{Mermaid diagram}\n\\end{figure}"
        );
    }

    #[test]
    fn test_figure_float() {
        let latex = figure("x.png", "Flow & states", Placement::Float);

        assert!(latex.starts_with("\\begin{figure}[htbp]"));
        assert!(latex.contains("\\caption{Flow \\& states}"));
    }

    #[test]
    fn test_error_box_escapes_message() {
        let latex = error_box("missing file: chapter_1.md");

        assert!(latex.starts_with("\\noindent\\fcolorbox{mdpdferror}{white}"));
        assert!(latex.contains("\\textbf{Error:}} missing file: chapter\\_1.md"));
        assert_eq!(latex.matches('{').count(), latex.matches('}').count());
    }

    #[test]
    fn test_vspace() {
        assert_eq!(vspace("5pt"), "\\vspace{5pt}");
    }
}
