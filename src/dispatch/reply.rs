//! Reply text formatting.

/// Wrap CLI output in a monospace code fence.
pub fn fenced(output: &str) -> String {
    format!("```\n{}\n```", output.trim_end_matches('\n'))
}

/// Failure description followed by the fenced output.
pub fn failure(description: &str, output: &str) -> String {
    format!("{}\n{}", description, fenced(output))
}
