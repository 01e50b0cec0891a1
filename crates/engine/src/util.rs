//! Internal helpers for input validation and model conversion.
//!
//! These utilities are **not** part of the public API.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trim a required display name, rejecting empty values.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Case and accent insensitive key used for uniqueness checks
/// ("Alimentação" and "alimentacao" collide).
pub(crate) fn normalize_name_key(display: &str) -> String {
    display
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_folds_case_and_accents() {
        assert_eq!(normalize_name_key("Alimentação"), "alimentacao");
        assert_eq!(normalize_name_key("SAÚDE"), "saude");
    }

    #[test]
    fn required_name_collapses_whitespace() {
        assert_eq!(
            normalize_required_name("  Cartão   Nubank ", "account").unwrap(),
            "Cartão Nubank"
        );
        assert!(normalize_required_name("   ", "account").is_err());
    }
}
