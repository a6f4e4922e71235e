use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// the first `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => &text[..byte_pos],
        None => text,
    }
}

/// truncate a string to a maximum length with ellipsis
pub fn truncate_with_ellipsis(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", truncate_chars(text, max_length.saturating_sub(3)))
    }
}

/// the short form of a commit hash; pseudo-commit ids pass through unchanged
pub fn short_hash(hash: &str) -> &str {
    if hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        &hash[..8]
    } else {
        hash
    }
}

/// a steady-ticking spinner, or a hidden one when output is suppressed
pub fn spinner(message: impl Into<String>, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("🧙🧙🧙", 2), "🧙🧙");
    }

    #[test]
    fn ellipsis_only_when_needed() {
        assert_eq!(truncate_with_ellipsis("abc", 5), "abc");
        assert_eq!(truncate_with_ellipsis("abcdefghij", 6), "abc...");
    }

    #[test]
    fn short_hash_keeps_pseudo_ids() {
        let full = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(short_hash(full), "01234567");
        assert_eq!(short_hash("unstaged"), "unstaged");
    }
}
