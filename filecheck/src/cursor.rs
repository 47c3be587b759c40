use crate::common::*;

/// A forward-only position in the candidate input.
///
/// Besides the current offset, a cursor tracks the end of the current block,
/// i.e. the start of the next `CHECK-LABEL` match, or EOF. Searches never
/// extend past the end of the block.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buffer: &'a [u8],
    /// The offset at which the next search starts, i.e. the end of the previous match
    start: usize,
    /// The offset at which the current block ends
    block_end: usize,
}
impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            start: 0,
            block_end: buffer.len(),
        }
    }

    #[inline(always)]
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    #[inline(always)]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline(always)]
    pub fn block_end(&self) -> usize {
        self.block_end
    }

    #[inline(always)]
    pub fn eof(&self) -> usize {
        self.buffer.len()
    }

    /// Move the cursor to `offset`, which must not precede the current position
    pub fn advance_to(&mut self, offset: usize) {
        debug_assert!(offset >= self.start, "cursor cannot move backwards");
        self.start = offset.max(self.start).min(self.buffer.len());
    }

    /// Set the end of the current block
    pub fn set_block_end(&mut self, offset: usize) {
        self.block_end = offset.min(self.buffer.len());
    }

    /// The range searched by an unanchored directive: from the cursor to the end of the block
    pub fn search_block(&self) -> Range<usize> {
        self.start..self.block_end.max(self.start)
    }

    /// The remainder of the line on which the previous match ended, clipped to the block
    pub fn search_line(&self) -> Range<usize> {
        let eol = text::line_end(self.buffer, self.start);
        self.start..eol.min(self.block_end).max(self.start)
    }

    /// The line following the one on which the previous match ended, clipped to the block.
    ///
    /// Returns `None` if there is no such line.
    pub fn search_next_line(&self) -> Option<Range<usize>> {
        let eol = text::line_end(self.buffer, self.start);
        if eol >= self.buffer.len() {
            return None;
        }
        let next = eol + 1;
        if next > self.block_end {
            return None;
        }
        let next_eol = text::line_end(self.buffer, next);
        Some(next..next_eol.min(self.block_end))
    }
}
