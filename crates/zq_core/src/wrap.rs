//! Greedy line wrapping against a measured pixel width.

use crate::font::TextMeasure;

/// Split `text` into whitespace-delimited tokens, each keeping its trailing
/// whitespace. Whitespace before the first token is dropped.
pub fn split_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_trailing = false;

    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match start {
            None if is_space => {}
            None => {
                start = Some(idx);
                in_trailing = false;
            }
            Some(_) if is_space => in_trailing = true,
            Some(token_start) if in_trailing => {
                tokens.push(&text[token_start..idx]);
                start = Some(idx);
                in_trailing = false;
            }
            Some(_) => {}
        }
    }
    if let Some(token_start) = start {
        tokens.push(&text[token_start..]);
    }
    tokens
}

/// Greedily pack tokens into lines no wider than `max_width`.
///
/// A token is appended to the current line when the measured width of the
/// combined string fits; otherwise it starts a new line. A token wider than
/// the budget on its own still gets a line to itself. Text without any
/// non-whitespace character produces no lines.
pub fn wrap_lines<M: TextMeasure + ?Sized>(text: &str, measure: &M, max_width: u32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for token in split_tokens(text) {
        if let Some(line) = lines.last_mut() {
            let mut candidate = String::with_capacity(line.len() + token.len());
            candidate.push_str(line);
            candidate.push_str(token);
            if measure.text_width(&candidate) <= max_width {
                *line = candidate;
                continue;
            }
        }
        lines.push(token.to_string());
    }
    lines
}

/// Group wrapped lines into pages of at most `lines_per_page` lines.
pub fn paginate(lines: Vec<String>, lines_per_page: usize) -> Vec<Vec<String>> {
    let per_page = lines_per_page.max(1);
    let mut pages = Vec::with_capacity(lines.len().div_ceil(per_page));
    let mut lines = lines.into_iter().peekable();
    while lines.peek().is_some() {
        pages.push(lines.by_ref().take(per_page).collect());
    }
    pages
}
