//! Line splitting and quote-aware field tokenizing

/// Non-blank lines of a statement with their 1-based line numbers
///
/// A trailing `\r` is dropped so CRLF exports split the same way as LF ones.
pub fn content_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Split one line into fields
///
/// A `"` toggles the quoted state unless it directly follows a `\`; the
/// delimiter is not a boundary inside quotes. Each field is trimmed and one
/// pair of wrapping quotes is removed.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut previous: Option<char> = None;

    for ch in line.chars() {
        if ch == '"' && previous != Some('\\') {
            in_quotes = !in_quotes;
            current.push(ch);
        } else if ch == delimiter && !in_quotes {
            fields.push(clean_field(&current));
            current.clear();
        } else {
            current.push(ch);
        }
        previous = Some(ch);
    }
    fields.push(clean_field(&current));

    fields
}

fn clean_field(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}
