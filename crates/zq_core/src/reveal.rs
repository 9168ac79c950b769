//! Character-by-character reveal of a single line of text.
//!
//! The cursor is a byte offset into the line. Each step moves it to the end of
//! the next non-whitespace grapheme, so spaces never cost a frame of their own;
//! trailing whitespace is folded into the last step so the final prefix is
//! always the full line.

use unicode_segmentation::UnicodeSegmentation;

/// End offset of the prefix that follows `current`, or `None` once the whole
/// of `text` has been revealed.
pub fn next_reveal_end(text: &str, current: usize) -> Option<usize> {
    if current >= text.len() {
        return None;
    }
    for (idx, grapheme) in text.grapheme_indices(true) {
        let end = idx + grapheme.len();
        if end <= current || is_blank(grapheme) {
            continue;
        }
        return if is_blank(&text[end..]) {
            Some(text.len())
        } else {
            Some(end)
        };
    }
    // Only whitespace remains past the cursor.
    Some(text.len())
}

fn is_blank(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealCursor {
    end: usize,
    interrupted: bool,
    done: bool,
}

impl RevealCursor {
    /// A cursor at the start of `text`. Empty text is complete immediately.
    pub fn new(text: &str) -> Self {
        Self {
            end: 0,
            interrupted: false,
            done: text.is_empty(),
        }
    }

    /// A cursor that has already revealed all of `text`.
    pub fn completed(text: &str) -> Self {
        Self {
            end: text.len(),
            interrupted: false,
            done: true,
        }
    }

    /// Reveal one more step and return the new visible prefix, or `None` if
    /// the cursor was already complete.
    pub fn advance<'a>(&mut self, text: &'a str) -> Option<&'a str> {
        if self.done {
            return None;
        }
        let next = if self.interrupted {
            Some(text.len())
        } else {
            next_reveal_end(text, self.end)
        };
        match next {
            Some(end) => {
                self.end = end;
                self.done = end >= text.len();
                Some(&text[..end])
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    /// Make the next `advance` yield the full text.
    pub fn interrupt(&mut self) {
        if !self.done {
            self.interrupted = true;
        }
    }

    pub fn visible<'a>(&self, text: &'a str) -> &'a str {
        &text[..self.end.min(text.len())]
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Bytes of the line revealed so far.
    pub fn revealed(&self) -> usize {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_prefixes(text: &str) -> Vec<&str> {
        let mut cursor = RevealCursor::new(text);
        let mut out = Vec::new();
        while let Some(prefix) = cursor.advance(text) {
            out.push(prefix);
        }
        assert!(cursor.is_done());
        out
    }

    #[test]
    fn spaces_are_not_reveal_steps() {
        assert_eq!(
            all_prefixes("abc def"),
            vec!["a", "ab", "abc", "abc d", "abc de", "abc def"]
        );
    }

    #[test]
    fn trailing_whitespace_folds_into_last_step() {
        assert_eq!(all_prefixes("hi  "), vec!["h", "hi  "]);
    }

    #[test]
    fn whitespace_only_line_reveals_in_one_step() {
        assert_eq!(all_prefixes("   "), vec!["   "]);
    }

    #[test]
    fn empty_line_is_complete_without_steps() {
        let cursor = RevealCursor::new("");
        assert!(cursor.is_done());
        assert!(all_prefixes("").is_empty());
    }

    #[test]
    fn sequence_is_strictly_increasing_and_ends_at_full_length() {
        for text in ["Lorem ipsum dolor", "x", "  lead", "tab\tsep end ", "caf\u{e9} na\u{ef}ve"] {
            let prefixes = all_prefixes(text);
            assert_eq!(prefixes.last().copied(), Some(text));
            for pair in prefixes.windows(2) {
                assert!(pair[0].len() < pair[1].len(), "{pair:?} not increasing");
            }
        }
    }

    #[test]
    fn combining_marks_are_revealed_with_their_base() {
        // "e" + combining acute accent is one grapheme.
        let text = "e\u{301}x";
        assert_eq!(all_prefixes(text), vec!["e\u{301}", "e\u{301}x"]);
    }

    #[test]
    fn interrupt_yields_full_text_next() {
        let text = "abc def ghi";
        let mut cursor = RevealCursor::new(text);
        assert_eq!(cursor.advance(text), Some("a"));
        cursor.interrupt();
        assert_eq!(cursor.advance(text), Some(text));
        assert!(cursor.is_done());
        assert_eq!(cursor.advance(text), None);
    }

    #[test]
    fn interrupt_before_first_step_yields_full_text() {
        let text = "abc";
        let mut cursor = RevealCursor::new(text);
        cursor.interrupt();
        assert_eq!(cursor.advance(text), Some(text));
    }

    #[test]
    fn visible_tracks_cursor() {
        let text = "ab cd";
        let mut cursor = RevealCursor::new(text);
        assert_eq!(cursor.visible(text), "");
        cursor.advance(text);
        cursor.advance(text);
        cursor.advance(text);
        assert_eq!(cursor.visible(text), "ab c");
        assert_eq!(cursor.revealed(), 4);
    }

    #[test]
    fn completed_cursor_shows_everything() {
        let cursor = RevealCursor::completed("done");
        assert!(cursor.is_done());
        assert_eq!(cursor.visible("done"), "done");
    }

    #[test]
    fn next_reveal_end_is_pure() {
        assert_eq!(next_reveal_end("ab cd", 2), Some(4));
        assert_eq!(next_reveal_end("ab cd", 2), Some(4));
        assert_eq!(next_reveal_end("ab cd", 5), None);
    }
}
