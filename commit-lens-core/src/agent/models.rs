// model selection

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// pick the model: explicit choice, then the configured environment value, then the default
pub fn resolve_model(cli_choice: Option<&str>, env_choice: Option<&str>) -> String {
    [cli_choice, env_choice]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_order() {
        assert_eq!(resolve_model(Some("a"), Some("b")), "a");
        assert_eq!(resolve_model(None, Some("b")), "b");
        assert_eq!(resolve_model(None, None), DEFAULT_MODEL);
        // blank values do not count as a choice
        assert_eq!(resolve_model(Some("  "), None), DEFAULT_MODEL);
    }
}
