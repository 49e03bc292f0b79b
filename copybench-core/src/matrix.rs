//! Test Matrix Generator
//!
//! Lazily enumerates `(length, alignment)` cases in a fixed order:
//!
//! | Sweep | Lengths | Index `i` |
//! |-------|---------|-----------|
//! | 1 | `2^i` | `0..18` |
//! | 2 | `i` | `0..32` |
//! | 3 | `16 * i` | `3..32`, skipping powers of two |
//! | 4 | `32 * i` | `32..64` |
//! | 5 | OS page size | single case, alignment `(0, 0)` |
//!
//! Each index expands to the alignment pairs `(0,0)`, `(i,0)`, `(0,i)`, `(i,i)`
//! as `(align_src, align_dst)`: the offset grows with the sweep index rather
//! than being an independent axis. Cases that would overrun the scratch
//! buffers are dropped.

use crate::arena::ALIGN_WINDOW;
use serde::{Deserialize, Serialize};

/// One `(length, alignment pair)` to run against every candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    /// Bytes to copy
    pub length: usize,
    /// Source offset from its region base (reported as `align1`)
    pub align_src: usize,
    /// Destination offset from its region base (reported as `align2`)
    pub align_dst: usize,
}

impl TestCase {
    /// Build a case, reducing both alignments modulo the alignment window
    pub fn new(length: usize, align_src: usize, align_dst: usize) -> Self {
        Self {
            length,
            align_src: align_src & (ALIGN_WINDOW - 1),
            align_dst: align_dst & (ALIGN_WINDOW - 1),
        }
    }

    /// Whether both views stay strictly inside buffers of `capacity` bytes
    pub fn fits(&self, capacity: usize) -> bool {
        let inside = |align: usize| align.checked_add(self.length).is_some_and(|end| end < capacity);
        inside(self.align_src) && inside(self.align_dst)
    }
}

/// The four alignment combinations derived from sweep index `i`
fn quad(i: usize, length: usize) -> [TestCase; 4] {
    [
        TestCase::new(length, 0, 0),
        TestCase::new(length, i, 0),
        TestCase::new(length, 0, i),
        TestCase::new(length, i, i),
    ]
}

/// Deterministic case generator bound to a buffer capacity and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestMatrix {
    capacity: usize,
    page_size: usize,
}

impl TestMatrix {
    /// Matrix for buffers of `capacity` bytes on a system with `page_size` pages
    pub fn new(capacity: usize, page_size: usize) -> Self {
        Self {
            capacity,
            page_size,
        }
    }

    /// Scratch capacity cases are filtered against
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of the final single case
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// A fresh pass over the cases. Every call yields the same sequence.
    pub fn cases(&self) -> impl Iterator<Item = TestCase> + Clone + use<> {
        let capacity = self.capacity;
        let page = self.page_size;

        let powers = (0..18usize).flat_map(|i| quad(i, 1 << i));
        let small = (0..32usize).flat_map(|i| quad(i, i));
        let multiples_16 = (3..32usize)
            .filter(|i| !i.is_power_of_two())
            .flat_map(|i| quad(i, 16 * i));
        let multiples_32 = (32..64usize).flat_map(|i| quad(i, 32 * i));
        let page_case = std::iter::once(TestCase::new(page, 0, 0));

        powers
            .chain(small)
            .chain(multiples_16)
            .chain(multiples_32)
            .chain(page_case)
            .filter(move |case| case.fits(capacity))
    }

    /// Number of cases a pass yields
    pub fn len(&self) -> usize {
        self.cases().count()
    }

    /// Whether every generated case was filtered out
    pub fn is_empty(&self) -> bool {
        self.cases().next().is_none()
    }

    /// Largest length any case will request
    pub fn max_length(&self) -> usize {
        self.cases().map(|c| c.length).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::MIN_BUFFER_SIZE;

    fn default_matrix() -> TestMatrix {
        TestMatrix::new(MIN_BUFFER_SIZE, 4096)
    }

    #[test]
    fn test_case_count() {
        // 17 power-of-two lengths fit (2^17 does not), 32 small lengths,
        // 26 multiples of 16, 32 multiples of 32, plus the page case.
        assert_eq!(default_matrix().len(), (17 + 32 + 26 + 32) * 4 + 1);
    }

    #[test]
    fn test_deterministic() {
        let matrix = default_matrix();
        let first: Vec<_> = matrix.cases().collect();
        let second: Vec<_> = matrix.cases().collect();
        assert_eq!(first, second);
        assert_eq!(first, TestMatrix::new(MIN_BUFFER_SIZE, 4096).cases().collect::<Vec<_>>());
    }

    #[test]
    fn test_sweep_order() {
        let cases: Vec<_> = default_matrix().cases().take(8).collect();
        assert_eq!(
            cases,
            vec![
                TestCase::new(1, 0, 0),
                TestCase::new(1, 0, 0),
                TestCase::new(1, 0, 0),
                TestCase::new(1, 0, 0),
                TestCase::new(2, 0, 0),
                TestCase::new(2, 1, 0),
                TestCase::new(2, 0, 1),
                TestCase::new(2, 1, 1),
            ]
        );
    }

    #[test]
    fn test_filter_invariant() {
        for capacity in [64, 1000, 4096, MIN_BUFFER_SIZE] {
            let matrix = TestMatrix::new(capacity, 4096);
            for case in matrix.cases() {
                assert!(case.align_src + case.length < capacity, "{:?}", case);
                assert!(case.align_dst + case.length < capacity, "{:?}", case);
            }
        }
    }

    #[test]
    fn test_multiples_of_16_skip_powers_of_two() {
        let lengths: Vec<_> = default_matrix()
            .cases()
            .map(|c| c.length)
            .skip(17 * 4 + 32 * 4)
            .step_by(4)
            .take(26)
            .collect();
        assert_eq!(lengths[0], 48);
        assert!(!lengths.contains(&64));
        assert!(!lengths.contains(&128));
        assert!(!lengths.contains(&256));
        assert_eq!(*lengths.last().unwrap(), 16 * 31);
    }

    #[test]
    fn test_last_case_is_page() {
        let last = default_matrix().cases().last().unwrap();
        assert_eq!(last, TestCase::new(4096, 0, 0));
    }

    #[test]
    fn test_page_case_dropped_when_too_large() {
        let matrix = TestMatrix::new(4096, 4096);
        assert!(matrix.cases().all(|c| c.length < 4096));
    }

    #[test]
    fn test_alignment_wraps_window() {
        let case = TestCase::new(10, 65, 127);
        assert_eq!(case.align_src, 1);
        assert_eq!(case.align_dst, 63);
    }

    #[test]
    fn test_max_length() {
        assert_eq!(default_matrix().max_length(), 65_536);
    }
}
