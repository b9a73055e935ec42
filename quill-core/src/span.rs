//! Half-open byte spans into a source buffer.

use std::fmt;

/// A half-open range `[start, start + length)` of byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub const fn new(start: usize, length: usize) -> Self {
        TextSpan { start, length }
    }

    /// Build a span from its two bounds. `end` is clamped to `start`.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        TextSpan {
            start,
            length: end.saturating_sub(start),
        }
    }

    pub const fn end(&self) -> usize {
        self.start + self.length
    }

    /// Two spans overlap when they share at least one offset.
    /// Spans that merely touch at a boundary do not overlap.
    pub fn overlaps_with(&self, other: TextSpan) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end()
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: TextSpan) -> TextSpan {
        TextSpan::from_bounds(self.start.min(other.start), self.end().max(other.end()))
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_start_plus_length() {
        for (start, length) in [(0, 0), (0, 5), (7, 3), (100, 0)] {
            let span = TextSpan::new(start, length);
            assert_eq!(span.end(), start + length);
        }
    }

    #[test]
    fn from_bounds_round_trips() {
        let span = TextSpan::from_bounds(4, 10);
        assert_eq!(span, TextSpan::new(4, 6));
        assert_eq!(TextSpan::from_bounds(span.start, span.end()), span);
    }

    #[test]
    fn overlap_covers_all_interval_relations() {
        let base = TextSpan::from_bounds(10, 20);

        // disjoint
        assert!(!base.overlaps_with(TextSpan::from_bounds(0, 5)));
        assert!(!base.overlaps_with(TextSpan::from_bounds(25, 30)));
        // touching at a boundary
        assert!(!base.overlaps_with(TextSpan::from_bounds(0, 10)));
        assert!(!base.overlaps_with(TextSpan::from_bounds(20, 30)));
        // partial overlap from either side
        assert!(base.overlaps_with(TextSpan::from_bounds(5, 11)));
        assert!(base.overlaps_with(TextSpan::from_bounds(19, 25)));
        // containment both ways
        assert!(base.overlaps_with(TextSpan::from_bounds(12, 15)));
        assert!(base.overlaps_with(TextSpan::from_bounds(0, 30)));
    }

    #[test]
    fn overlap_is_symmetric() {
        let spans = [
            TextSpan::from_bounds(0, 5),
            TextSpan::from_bounds(3, 8),
            TextSpan::from_bounds(5, 10),
            TextSpan::from_bounds(1, 2),
            TextSpan::from_bounds(0, 20),
        ];
        for a in spans {
            for b in spans {
                assert_eq!(a.overlaps_with(b), b.overlaps_with(a), "{a} vs {b}");
            }
        }
    }
}
