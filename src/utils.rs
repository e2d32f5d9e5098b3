//! # Utility Functions Module
//!
//! Small helpers shared by the tool invocation code.

/// Builds a `Vec<String>` of command line arguments from mixed types.
///
/// # Example
/// ```rust,ignore
/// let args = args!["-crf", 28, "-preset", "medium"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        ::std::vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}

/// Keeps the last `limit` bytes of a tool's output, cut on a char boundary.
///
/// ffmpeg prints the actual error at the end of its output, so the tail is
/// the useful part. Truncated text is prefixed with `...`.
pub fn truncate_diagnostic(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.len() <= limit {
        return text.to_string();
    }

    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_macro() {
        let crf = 28;
        let result = args!["-crf", crf, "-preset", "medium"];
        assert_eq!(result, vec!["-crf", "28", "-preset", "medium"]);
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_diagnostic("  all good \n", 100), "all good");
    }

    #[test]
    fn test_truncate_keeps_tail() {
        let text = "header line\nInvalid data found when processing input";
        let truncated = truncate_diagnostic(text, 20);
        assert!(truncated.starts_with("..."));
        assert!(truncated.ends_with("processing input"));
        assert!(truncated.len() <= 20 + 3);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "èèèèèèèèèè";
        let truncated = truncate_diagnostic(text, 5);
        // 'è' is two bytes: a 5 byte tail must shrink to 4 bytes
        assert_eq!(truncated, "...èè");
    }
}
