//! Provider routing.

/// Returns `true` if `query` should also be sent to the secondary provider.
///
/// The secondary index only covers the script-restricted subset of the
/// corpus, so any query containing a Latin letter is served by the primary
/// provider alone.
pub fn should_use_secondary(query: &str) -> bool {
    !query.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hebrew_query_uses_both() {
        assert!(should_use_secondary("שלום"));
    }

    #[test]
    fn latin_query_uses_primary_only() {
        assert!(!should_use_secondary("shalom"));
        assert!(!should_use_secondary("SHALOM"));
    }

    #[test]
    fn mixed_script_uses_primary_only() {
        assert!(!should_use_secondary("שלום world"));
    }

    #[test]
    fn digits_and_punctuation_do_not_count() {
        assert!(should_use_secondary("בראשית 1:1"));
        assert!(should_use_secondary("\"אור\""));
    }
}
