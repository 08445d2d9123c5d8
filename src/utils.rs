use core::ops::Range;

pub(crate) trait RangeChunk {
    /// Returns the `index`-th of `parts` contiguous chunks of `ceil(len /
    /// parts)` positions. Trailing chunks past the end are empty.
    fn chunk(&self, index: usize, parts: usize) -> Range<usize>;
}

impl RangeChunk for Range<usize> {
    #[inline]
    fn chunk(&self, index: usize, parts: usize) -> Range<usize> {
        let len = self.end.saturating_sub(self.start);
        if parts == 0 || len == 0 {
            return self.end..self.end;
        }
        let chunk = len.div_ceil(parts);
        let start = index
            .checked_mul(chunk)
            .and_then(|offset| self.start.checked_add(offset))
            .map_or(self.end, |start| start.min(self.end));
        let end = start.saturating_add(chunk).min(self.end);
        start..end
    }
}
