//! Listing style configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::ConfigError;

/// RGB colour, written as `[r, g, b]` in TOML.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Value for the `xcolor` RGB model, without braces.
    #[must_use]
    pub fn latex(self) -> String {
        format!("{}, {}, {}", self.0, self.1, self.2)
    }
}

/// Colour overrides for a single listing language.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageColors {
    pub keyword: Option<Rgb>,
    pub comment: Option<Rgb>,
    pub string: Option<Rgb>,
    pub background: Option<Rgb>,
}

impl LanguageColors {
    fn is_empty(&self) -> bool {
        self.keyword.is_none()
            && self.comment.is_none()
            && self.string.is_none()
            && self.background.is_none()
    }
}

/// Layout and colours for code listings and error markers.
///
/// Margins and thickness are in points.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Vertical space before a listing.
    pub margin_before: f32,
    /// Vertical space after a listing.
    pub margin_after: f32,
    /// Frame rule thickness.
    pub border_thickness: f32,
    /// Horizontal and vertical padding between frame and code.
    pub frame_margin: f32,
    pub background: Rgb,
    pub border: Rgb,
    pub keyword: Rgb,
    pub comment: Rgb,
    pub string: Rgb,
    pub identifier: Rgb,
    /// Frame and label colour of error markers.
    pub error: Rgb,
    /// Per-language overrides keyed by fence language tag.
    pub colors: BTreeMap<String, LanguageColors>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            margin_before: 10.0,
            margin_after: 10.0,
            border_thickness: 0.1,
            frame_margin: 5.0,
            background: Rgb(250, 251, 254),
            border: Rgb(230, 230, 230),
            keyword: Rgb(0, 0, 255),
            comment: Rgb(58, 127, 179),
            string: Rgb(163, 21, 21),
            identifier: Rgb(0, 0, 0),
            error: Rgb(200, 0, 0),
            colors: BTreeMap::new(),
        }
    }
}

impl StyleConfig {
    /// Validate numeric ranges and language overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MAX_MARGIN: f32 = 100.0;
        const MAX_BORDER: f32 = 10.0;

        for (value, field) in [
            (self.margin_before, "style.margin_before"),
            (self.margin_after, "style.margin_after"),
            (self.frame_margin, "style.frame_margin"),
        ] {
            if !value.is_finite() || !(0.0..=MAX_MARGIN).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{field} must be between 0 and {MAX_MARGIN}"
                )));
            }
        }

        if !self.border_thickness.is_finite()
            || !(0.0..=MAX_BORDER).contains(&self.border_thickness)
        {
            return Err(ConfigError::Validation(format!(
                "style.border_thickness must be between 0 and {MAX_BORDER}"
            )));
        }

        for (language, colors) in &self.colors {
            if language.is_empty()
                || !language
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
            {
                return Err(ConfigError::Validation(format!(
                    "style.colors: invalid language name '{language}'"
                )));
            }
            if colors.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "style.colors.{language} sets no colours"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_style_is_valid() {
        StyleConfig::default().validate().unwrap();
    }

    #[test]
    fn test_parse_language_colors() {
        let toml = r"
margin_before = 4.0

[colors.python]
keyword = [0, 0, 160]
";
        let style: StyleConfig = toml::from_str(toml).unwrap();

        assert_eq!(style.margin_before, 4.0);
        assert_eq!(style.margin_after, 10.0);
        assert_eq!(style.colors["python"].keyword, Some(Rgb(0, 0, 160)));
        assert_eq!(style.colors["python"].comment, None);
    }

    #[test]
    fn test_negative_margin_rejected() {
        let style = StyleConfig {
            margin_after: -1.0,
            ..StyleConfig::default()
        };

        let err = style.validate().unwrap_err();
        assert!(err.to_string().contains("style.margin_after"));
    }

    #[test]
    fn test_nan_border_rejected() {
        let style = StyleConfig {
            border_thickness: f32::NAN,
            ..StyleConfig::default()
        };

        assert!(style.validate().is_err());
    }

    #[test]
    fn test_empty_language_override_rejected() {
        let mut style = StyleConfig::default();
        style
            .colors
            .insert("rust".to_owned(), LanguageColors::default());

        let err = style.validate().unwrap_err();
        assert!(err.to_string().contains("style.colors.rust"));
    }

    #[test]
    fn test_color_component_out_of_range_is_parse_error() {
        let result: Result<StyleConfig, _> = toml::from_str("keyword = [0, 0, 300]");
        assert!(result.is_err());
    }

    #[test]
    fn test_rgb_latex() {
        assert_eq!(Rgb(1, 2, 3).latex(), "1, 2, 3");
    }
}
