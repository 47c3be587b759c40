mod display;
pub use self::display::DisplayCommaSeparated;

use std::ops::Range;

/// Returns the offset of the `\n` terminating the line containing `offset`,
/// or `buffer.len()` if that line is the last one.
pub fn line_end(buffer: &[u8], offset: usize) -> usize {
    let offset = offset.min(buffer.len());
    memchr::memchr(b'\n', &buffer[offset..])
        .map(|idx| offset + idx)
        .unwrap_or(buffer.len())
}

/// Iterate over the lines of `buffer` that intersect `range`, each clipped to `range`.
///
/// The yielded ranges never include the terminating newline.
pub fn lines_in(buffer: &[u8], range: Range<usize>) -> impl Iterator<Item = Range<usize>> + '_ {
    let end = range.end.min(buffer.len());
    let mut start = Some(range.start.min(end));
    core::iter::from_fn(move || {
        let line_start = start?;
        let eol = line_end(buffer, line_start).min(end);
        start = if eol < end { Some(eol + 1) } else { None };
        Some(line_start..eol)
    })
}

/// Precomputed line start offsets for a source buffer, used to translate
/// byte offsets into line/column pairs when reporting.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    starts: Vec<usize>,
}
impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut starts = Vec::with_capacity(bytes.len() / 32 + 1);
        starts.push(0);
        starts.extend(memchr::memchr_iter(b'\n', bytes).map(|idx| idx + 1));
        Self { starts }
    }

    /// Get the zero-based index of the line containing `offset`
    pub fn line_index(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Get the one-based line and column numbers for `offset`
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_index(offset);
        (line + 1, offset - self.starts[line] + 1)
    }
}

#[inline]
pub fn is_horizontal_whitespace(c: char) -> bool {
    c == ' ' || is_non_canonical_horizontal_whitespace(c)
}

#[inline]
fn is_non_canonical_horizontal_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}
