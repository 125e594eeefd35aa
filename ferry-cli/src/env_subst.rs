//! Environment variable substitution for configuration files
//!
//! Secrets stay out of the config file itself: `${AZURE_DEVOPS_PAT}` style
//! placeholders are resolved from the environment before the TOML is parsed.
//! Every placeholder must resolve; a missing variable is an error naming all
//! of the missing ones at once.

use anyhow::bail;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z][A-Z0-9_]*)\}").expect("placeholder regex"));

pub fn substitute(raw: &str) -> anyhow::Result<String> {
    let mut missing = Vec::new();

    let resolved = PLACEHOLDER.replace_all(raw, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.push(name.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        bail!(
            "unresolved environment variables in config: {}",
            missing.join(", ")
        );
    }

    Ok(resolved.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_known_variables() {
        std::env::set_var("FERRY_TEST_PAT", "secret-value");
        let out = substitute("token = \"${FERRY_TEST_PAT}\"").unwrap();
        assert_eq!(out, "token = \"secret-value\"");
    }

    #[test]
    fn test_missing_variables_reported_together() {
        std::env::remove_var("FERRY_TEST_MISSING_A");
        std::env::remove_var("FERRY_TEST_MISSING_B");
        let err = substitute("a = \"${FERRY_TEST_MISSING_A}\"\nb = \"${FERRY_TEST_MISSING_B}\"")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("FERRY_TEST_MISSING_A"));
        assert!(message.contains("FERRY_TEST_MISSING_B"));
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(substitute("level = \"info\"").unwrap(), "level = \"info\"");
    }

    #[test]
    fn test_lowercase_braces_ignored() {
        assert_eq!(substitute("path = \"${not_a_var}\"").unwrap(), "path = \"${not_a_var}\"");
    }
}
