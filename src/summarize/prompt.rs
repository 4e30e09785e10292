// src/summarize/prompt.rs

/// Final prompt for one cycle.
///
/// `{time}` in `base` becomes the cycle's `HH:MM`. When yesterday left a summary, a continuity
/// clause quoting it is appended.
pub fn build_prompt(base: &str, previous: Option<&str>, time: &str) -> String {
    let mut prompt = base.replace("{time}", time);
    if let Some(prev) = previous.map(str::trim).filter(|p| !p.is_empty()) {
        prompt.push_str("\n\nFor continuity, here is yesterday's summary:\n\"\"\"\n");
        prompt.push_str(prev);
        prompt.push_str(
            "\n\"\"\"\nDo not repeat anything from it unless something materially new has happened since.",
        );
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_placeholder_is_filled() {
        assert_eq!(build_prompt("It is {time}.", None, "07:30"), "It is 07:30.");
    }

    #[test]
    fn continuity_clause_quotes_previous_summary() {
        let p = build_prompt("Base", Some("Went for a run"), "09:00");
        assert!(p.starts_with("Base\n\n"));
        assert!(p.contains("yesterday's summary"));
        assert!(p.contains("Went for a run"));
        assert!(p.contains("materially new"));
    }

    #[test]
    fn blank_previous_adds_nothing() {
        assert_eq!(build_prompt("Base", Some("  "), "09:00"), "Base");
    }
}
