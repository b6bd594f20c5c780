//! LaTeX text escaping.

/// Escape LaTeX special characters for use in running text.
///
/// Newlines become `\newline` so multi-line diagnostics keep their shape.
#[must_use]
pub fn escape_latex(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str(r"\textbackslash{}"),
            '{' => result.push_str(r"\{"),
            '}' => result.push_str(r"\}"),
            '#' | '$' | '%' | '&' | '_' => {
                result.push('\\');
                result.push(c);
            }
            '~' => result.push_str(r"\textasciitilde{}"),
            '^' => result.push_str(r"\textasciicircum{}"),
            '\n' => result.push_str(r"\newline "),
            _ => result.push(c),
        }
    }
    result
}
