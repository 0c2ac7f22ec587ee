/// Truncate to at most `limit` characters, appending an ellipsis when
/// anything was cut. Operates on chars so multi-byte input never splits.
pub fn truncate(value: &str, limit: usize) -> String {
    if value.is_empty() {
        return String::new();
    }
    let mut truncated: String = value.chars().take(limit).collect();
    if truncated.len() < value.len() {
        truncated.push('…');
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_input_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("hello world", 5), "hello…");
    }

    #[test]
    fn truncate_handles_multibyte() {
        assert_eq!(truncate("héllo", 2), "hé…");
    }
}
