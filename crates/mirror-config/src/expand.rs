//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// Bare `$VAR` is left alone, so ids and URLs containing a dollar sign
/// pass through untouched.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var).map(Some).map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.0),
    })
}

/// Expand an optional identifier; a value that expands to blank becomes `None`.
///
/// Identifiers are allowed to be missing, so `id = "${PAGE_ID:-}"` simply
/// disables the target instead of producing an empty id.
pub(crate) fn expand_optional(
    value: Option<&str>,
    field: &str,
) -> Result<Option<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let expanded = expand_env(value, field)?;
    let trimmed = expanded.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
}

/// Name of a variable that was referenced without a default but is unset.
struct UnsetVar(String);
