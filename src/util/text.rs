use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Calculates the display width of a string in monospace columns.
///
/// CJK characters and most emoji count as 2 columns, combining marks as 0.
///
/// # Examples
///
/// ```
/// use reviewfeed::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("你好"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Greedy word wrap into lines of at most `max_columns` display columns.
///
/// Explicit newlines always break. A single word wider than the limit is
/// split at character boundaries so no line ever exceeds `max_columns`
/// (except when `max_columns` is 0, where every character gets its own line).
/// Empty input yields no lines; an empty paragraph between two newlines
/// yields an empty line.
///
/// # Examples
///
/// ```
/// use reviewfeed::util::wrap_to_width;
///
/// assert_eq!(wrap_to_width("one two three", 7), vec!["one two", "three"]);
/// assert_eq!(wrap_to_width("abcdef", 4), vec!["abcd", "ef"]);
/// ```
pub fn wrap_to_width(s: &str, max_columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if s.is_empty() {
        return lines;
    }

    for paragraph in s.split('\n') {
        let mut line = String::new();
        let mut line_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = display_width(word);
            let gap = usize::from(!line.is_empty());

            if line_width + gap + word_width <= max_columns {
                if gap == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += gap + word_width;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }

            if word_width <= max_columns {
                line.push_str(word);
                line_width = word_width;
                continue;
            }

            // Hard-break a word that cannot fit on any line.
            for c in word.chars() {
                let w = UnicodeWidthChar::width(c).unwrap_or(0);
                if line_width + w > max_columns && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(c);
                line_width += w;
            }
        }

        lines.push(line);
    }

    lines
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Review text comes from an external source and ends up printed by the
/// CLI, so it must not be able to drive the terminal. Tab, newline and
/// carriage return survive. Returns `Cow::Borrowed` for clean input.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    fn is_control(c: char) -> bool {
        (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')) || c == '\u{1b}'
    }

    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            if !is_control(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            // CSI: parameters until a final byte in 0x40..=0x7e
            Some('[') => {
                chars.next();
                for next in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&next) {
                        break;
                    }
                }
            }
            // OSC: until BEL or ST (ESC \)
            Some(']') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '\u{07}' {
                        break;
                    }
                    if next == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}
