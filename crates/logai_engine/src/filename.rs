const MAX_STEM_LEN: usize = 80;

/// `logai-report-{file name, whitespace runs as '_'}.md`
pub fn report_filename(file_name: &str) -> String {
    format!("logai-report-{}.md", sanitize_stem(file_name))
}

fn sanitize_stem(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut in_whitespace = false;
    for c in input.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                cleaned.push('_');
            }
            in_whitespace = true;
        } else {
            cleaned.push(if is_forbidden(c) { '_' } else { c });
            in_whitespace = false;
        }
    }
    let cleaned = cleaned.trim_matches(&['_', '.'][..]);
    if cleaned.is_empty() {
        return "Untitled".to_string();
    }
    truncate_on_char_boundary(cleaned, MAX_STEM_LEN).to_string()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn truncate_on_char_boundary(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
