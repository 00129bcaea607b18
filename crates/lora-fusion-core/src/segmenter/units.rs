//! Sentence-like unit splitting.

/// Byte span of one unit in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpan {
    pub start: usize,
    pub end: usize,
}

impl UnitSpan {
    #[inline]
    #[must_use]
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

#[inline]
fn is_terminator(c: char, split_on_colon: bool) -> bool {
    matches!(c, '.' | '!' | '?' | ';') || (split_on_colon && c == ':')
}

/// Split `text` into units ending at a terminator followed by whitespace or
/// end of input.
///
/// Whitespace between units belongs to neither. Trailing text without a
/// terminator forms the last unit. Whitespace-only input yields no units.
#[must_use]
pub fn split_units(text: &str, split_on_colon: bool) -> Vec<UnitSpan> {
    let mut units = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }

        if is_terminator(c, split_on_colon) {
            let at_boundary = match chars.peek() {
                None => true,
                Some((_, next)) => next.is_whitespace(),
            };
            if at_boundary {
                if let Some(s) = start.take() {
                    units.push(UnitSpan {
                        start: s,
                        end: i + c.len_utf8(),
                    });
                }
            }
        }
    }

    if let Some(s) = start {
        let end = text.trim_end().len();
        if end > s {
            units.push(UnitSpan { start: s, end });
        }
    }
    units
}
