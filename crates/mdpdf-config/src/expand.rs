//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//! - a leading `~` - expands to the home directory

use crate::ConfigError;

/// Expand environment variable references and a leading `~` in a string.
///
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let expanded = if value.contains("${") {
        shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
            match std::env::var(var) {
                Ok(val) => Ok(Some(val)),
                Err(_) => Err(LookupError {
                    var_name: var.to_owned(),
                }),
            }
        })
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{0}}} not set", e.cause.var_name),
        })?
    } else {
        value.to_owned()
    };

    Ok(shellexpand::tilde(&expanded).into_owned())
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}
