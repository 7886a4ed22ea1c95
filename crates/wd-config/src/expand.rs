//! Environment variable expansion for configuration strings.

use std::sync::LazyLock;

use regex::Regex;

use crate::ConfigError;

/// A `${VAR}` or `${VAR:-default}` reference.
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[A-Za-z_][A-Za-z0-9_]*(?::-[^}]*)?\}").unwrap());

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Any other `$` is kept literally, so secrets such as `k8$ab` survive.
/// `field` names the configuration key for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(value.len());
    let mut last = 0;
    for reference in REFERENCE_RE.find_iter(value) {
        expanded.push_str(&value[last..reference.start()]);
        let resolved = shellexpand::env(reference.as_str()).map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })?;
        expanded.push_str(&resolved);
        last = reference.end();
    }
    expanded.push_str(&value[last..]);
    Ok(expanded)
}

/// Expand an optional value in place.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(expand_env(raw, field)?);
    }
    Ok(())
}
