//! Pass 1 — sanitize. Strips blank lines and whole-line comments (`//`
//! as the first non-whitespace token; trailing inline comments are not
//! supported).

pub fn sanitize(lines: Vec<(usize, String)>) -> Vec<(usize, String)> {
    lines
        .into_iter()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("//")
        })
        .collect()
}
