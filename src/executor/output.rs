//! Output shaping for error messages.

/// Shorten command output for inclusion in error messages.
///
/// Configure scripts and compilers can print thousands of lines; only the
/// head is kept, with long lines clipped.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    const MAX_LINE_LENGTH: usize = 200;
    const MAX_TOTAL_LENGTH: usize = 2000;

    let mut result = String::new();

    for line in output.lines().take(max_lines) {
        let truncated = if line.chars().count() > MAX_LINE_LENGTH {
            let head: String = line.chars().take(MAX_LINE_LENGTH).collect();
            format!("{}...", head)
        } else {
            line.to_string()
        };

        if result.len() + truncated.len() > MAX_TOTAL_LENGTH {
            result.push_str("...[truncated]");
            return result;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&truncated);
    }

    if output.lines().count() > max_lines {
        result.push_str("\n...[additional output truncated]");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_output_short() {
        let output = "Hello\nWorld";
        assert_eq!(sanitize_output(output, 10), "Hello\nWorld");
    }

    #[test]
    fn test_sanitize_output_truncates_lines() {
        let output = "Line 1\nLine 2\nLine 3\nLine 4\nLine 5";
        let sanitized = sanitize_output(output, 3);
        assert!(sanitized.contains("Line 3"));
        assert!(!sanitized.contains("Line 4"));
        assert!(sanitized.contains("[additional output truncated]"));
    }

    #[test]
    fn test_sanitize_output_truncates_long_lines() {
        let long_line = "x".repeat(300);
        let sanitized = sanitize_output(&long_line, 10);
        assert!(sanitized.len() < 300);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_sanitize_output_multibyte() {
        let line = "é".repeat(250);
        let sanitized = sanitize_output(&line, 1);
        assert!(sanitized.ends_with("..."));
    }
}
