//! Model output sanitizer
//!
//! Models sometimes wrap code in Markdown fences despite being told not to.
//! [`sanitize`] removes those fences and nothing else.

/// Code fence marker
pub const FENCE: &str = "```";

/// Strip surrounding code fences from model output
///
/// If the trimmed text starts with a fence, its first line is dropped, and
/// its last line too when that line is also a fence. Text that does not
/// start with a fence is returned unchanged. Nested fences are peeled until
/// none remain at the start, so `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let mut current = match strip_fence_once(text) {
        Some(stripped) => stripped,
        None => return text.to_string(),
    };
    while let Some(stripped) = strip_fence_once(&current) {
        current = stripped;
    }
    current
}

/// Remove one layer of fencing, or `None` if the text is not fenced
fn strip_fence_once(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return None;
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines
        .last()
        .is_some_and(|line| line.trim_start().starts_with(FENCE))
    {
        lines.pop();
    }
    Some(lines.join("\n"))
}
