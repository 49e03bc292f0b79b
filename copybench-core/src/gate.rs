//! Correctness Gate
//!
//! Every (candidate, case) pair is checked once before it may be timed:
//! the destination is zeroed, the candidate runs, and both its return value
//! and the copied bytes are compared against the operation's contract.

use crate::arena::CaseView;
use crate::matrix::TestCase;
use crate::registry::{Candidate, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a candidate failed the gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateFailure {
    /// Returned pointer does not match the operation's contract
    #[error("wrong result: returned {actual:#x}, expected {expected:#x}")]
    WrongResult {
        /// Address the candidate returned
        actual: usize,
        /// Address the operation requires
        expected: usize,
    },

    /// Destination differs from source
    #[error("content mismatch at byte {offset}: dst {actual:#04x}, src {expected:#04x}")]
    ContentMismatch {
        /// First differing byte
        offset: usize,
        /// Destination byte
        actual: u8,
        /// Source byte
        expected: u8,
    },
}

/// Failure category, for summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// See [`GateFailure::WrongResult`]
    WrongResult,
    /// See [`GateFailure::ContentMismatch`]
    ContentMismatch,
}

impl GateFailure {
    /// Category of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            GateFailure::WrongResult { .. } => FailureKind::WrongResult,
            GateFailure::ContentMismatch { .. } => FailureKind::ContentMismatch,
        }
    }
}

/// A recorded gate failure for one (candidate, case) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectnessFailure {
    /// Candidate name
    pub implementation: String,
    /// Case that failed
    pub case: TestCase,
    /// What went wrong
    pub failure: GateFailure,
}

/// Run `candidate` once on `view` and validate the outcome.
///
/// The source view must already hold the reference pattern.
pub fn check(
    operation: Operation,
    candidate: &Candidate,
    view: &mut CaseView<'_>,
) -> Result<(), GateFailure> {
    view.clear_destination();

    let dst = view.dst_ptr();
    let len = view.len();
    // SAFETY: the view's pointers cover `len` bytes in separate regions.
    let returned = unsafe { candidate.call(dst, view.src_ptr(), len) };

    let expected = operation.expected_result(dst, len);
    if returned != expected {
        return Err(GateFailure::WrongResult {
            actual: returned as usize,
            expected: expected as usize,
        });
    }

    let mismatch = view
        .destination()
        .iter()
        .zip(view.source())
        .position(|(d, s)| d != s);

    match mismatch {
        Some(offset) => Err(GateFailure::ContentMismatch {
            offset,
            actual: view.destination()[offset],
            expected: view.source()[offset],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ScratchBuffers, default_capacity, os_page_size};
    use crate::candidates::{builtin_memcpy, builtin_mempcpy};
    use crate::registry::Role;

    unsafe fn short_copy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        // SAFETY: copies fewer bytes than the caller allows.
        unsafe { std::ptr::copy_nonoverlapping(src, dst, len.saturating_sub(1)) };
        dst
    }

    unsafe fn untouched(dst: *mut u8, _src: *const u8, _len: usize) -> *mut u8 {
        dst
    }

    fn buffers() -> ScratchBuffers {
        let page = os_page_size();
        ScratchBuffers::new(default_capacity(page), page).unwrap()
    }

    #[test]
    fn test_correct_candidate_passes() {
        let mut buffers = buffers();
        let mut view = buffers.view(&TestCase::new(100, 3, 5)).unwrap();
        view.fill_source();

        let candidate = Candidate::new("builtin", builtin_memcpy, Role::Baseline);
        assert_eq!(check(Operation::Memcpy, &candidate, &mut view), Ok(()));
    }

    #[test]
    fn test_short_copy_is_content_mismatch() {
        let mut buffers = buffers();
        let mut view = buffers.view(&TestCase::new(10, 0, 0)).unwrap();
        view.fill_source();

        let candidate = Candidate::new("broken", short_copy, Role::Production);
        let failure = check(Operation::Memcpy, &candidate, &mut view).unwrap_err();
        assert_eq!(
            failure,
            GateFailure::ContentMismatch {
                offset: 9,
                actual: 0,
                expected: (1 + 23 * 9) as u8,
            }
        );
        assert_eq!(failure.kind(), FailureKind::ContentMismatch);
    }

    #[test]
    fn test_wrong_family_is_wrong_result() {
        let mut buffers = buffers();
        let mut view = buffers.view(&TestCase::new(32, 0, 0)).unwrap();
        view.fill_source();

        // A correct mempcpy checked against the memcpy contract
        let candidate = Candidate::new("mempcpy", builtin_mempcpy, Role::Baseline);
        let failure = check(Operation::Memcpy, &candidate, &mut view).unwrap_err();
        assert_eq!(failure.kind(), FailureKind::WrongResult);
        assert!(check(Operation::Mempcpy, &candidate, &mut view).is_ok());
    }

    #[test]
    fn test_stale_destination_is_cleared() {
        let mut buffers = buffers();
        let mut view = buffers.view(&TestCase::new(16, 0, 0)).unwrap();
        view.fill_source();

        // Leave correct bytes in the destination from a previous run
        let good = Candidate::new("builtin", builtin_memcpy, Role::Baseline);
        assert!(check(Operation::Memcpy, &good, &mut view).is_ok());

        let lazy = Candidate::new("lazy", untouched, Role::Production);
        let failure = check(Operation::Memcpy, &lazy, &mut view).unwrap_err();
        assert!(matches!(failure, GateFailure::ContentMismatch { offset: 0, .. }));
    }

    #[test]
    fn test_zero_length_always_passes() {
        let mut buffers = buffers();
        let lazy = Candidate::new("lazy", untouched, Role::Production);
        for align_src in [0, 1, 31, 63] {
            for align_dst in [0, 7, 63] {
                let mut view = buffers.view(&TestCase::new(0, align_src, align_dst)).unwrap();
                view.fill_source();
                assert!(check(Operation::Memcpy, &lazy, &mut view).is_ok());
            }
        }
    }

    #[test]
    fn test_failure_message_names_values() {
        let failure = GateFailure::ContentMismatch {
            offset: 3,
            actual: 0,
            expected: 0x46,
        };
        assert_eq!(
            failure.to_string(),
            "content mismatch at byte 3: dst 0x00, src 0x46"
        );
    }
}
