//! Scratch Buffers
//!
//! Two fixed-size regions (source and destination) allocated once per run.
//! Test cases borrow offset-based views into them; nothing is reallocated
//! between cases.
//!
//! On Unix each region is an anonymous mapping followed by a `PROT_NONE`
//! guard page, so a candidate that writes or reads past the end of its view
//! faults instead of silently corrupting the neighbouring region.

use crate::matrix::TestCase;
use std::marker::PhantomData;
use std::ptr::NonNull;
use thiserror::Error;

/// Smallest scratch capacity, matching the largest power-of-two sweep length
pub const MIN_BUFFER_SIZE: usize = 131_072;

/// Alignment offsets are taken modulo this window
pub const ALIGN_WINDOW: usize = 64;

/// Errors raised while setting up scratch memory
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The anonymous mapping could not be created
    #[error("failed to map {size} bytes of scratch memory: {source}")]
    Map {
        /// Bytes requested, guard page included
        size: usize,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// `mprotect` on the trailing page failed
    #[error("failed to install guard page: {0}")]
    Guard(#[source] std::io::Error),

    /// Zero, overflowing or otherwise unusable size
    #[error("invalid scratch capacity {0}")]
    InvalidCapacity(usize),
}

/// Operating-system page size, queried once by the caller and passed down.
pub fn os_page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    4096
}

/// Capacity used when none is configured: two OS pages, at least [`MIN_BUFFER_SIZE`].
pub fn default_capacity(page_size: usize) -> usize {
    (2 * page_size).max(MIN_BUFFER_SIZE)
}

/// Usable capacity for a `requested` size: rounded up to a page multiple,
/// with room left for the trailing guard page.
pub fn scratch_capacity(requested: usize, page_size: usize) -> Result<usize, ArenaError> {
    if requested == 0 || page_size == 0 || !page_size.is_power_of_two() {
        return Err(ArenaError::InvalidCapacity(requested));
    }
    requested
        .checked_next_multiple_of(page_size)
        .filter(|capacity| capacity.checked_add(page_size).is_some())
        .ok_or(ArenaError::InvalidCapacity(requested))
}

// ─── Region ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Region {
    base: NonNull<u8>,
    capacity: usize,
    #[cfg(unix)]
    mapped: usize,
    #[cfg(not(unix))]
    layout: std::alloc::Layout,
}

#[cfg(unix)]
impl Region {
    fn allocate(capacity: usize, page_size: usize) -> Result<Self, ArenaError> {
        let mapped = capacity
            .checked_add(page_size)
            .ok_or(ArenaError::InvalidCapacity(capacity))?;

        // SAFETY: anonymous private mapping with no address hint.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                mapped,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(ArenaError::Map {
                size: mapped,
                source: std::io::Error::last_os_error(),
            });
        }

        // SAFETY: `capacity` is a page multiple inside the mapping just created.
        let guarded = unsafe {
            libc::mprotect(
                ptr.cast::<u8>().add(capacity).cast(),
                page_size,
                libc::PROT_NONE,
            )
        };
        if guarded != 0 {
            let err = std::io::Error::last_os_error();
            // SAFETY: unmapping exactly what was mapped above.
            unsafe { libc::munmap(ptr, mapped) };
            return Err(ArenaError::Guard(err));
        }

        let base = NonNull::new(ptr.cast::<u8>()).ok_or(ArenaError::InvalidCapacity(capacity))?;
        Ok(Self {
            base,
            capacity,
            mapped,
        })
    }
}

#[cfg(unix)]
impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: `base` and `mapped` describe a live mapping owned by self.
        unsafe { libc::munmap(self.base.as_ptr().cast(), self.mapped) };
    }
}

#[cfg(not(unix))]
impl Region {
    fn allocate(capacity: usize, page_size: usize) -> Result<Self, ArenaError> {
        let layout = std::alloc::Layout::from_size_align(capacity, page_size)
            .map_err(|_| ArenaError::InvalidCapacity(capacity))?;
        // SAFETY: layout has non-zero size (checked by ScratchBuffers::new).
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or_else(|| ArenaError::Map {
            size: capacity,
            source: std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        })?;
        Ok(Self {
            base,
            capacity,
            layout,
        })
    }
}

#[cfg(not(unix))]
impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: allocated in `allocate` with exactly this layout.
        unsafe { std::alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

// ─── ScratchBuffers ──────────────────────────────────────────────────────────

/// Source and destination scratch regions owned by the driver for a whole run
#[derive(Debug)]
pub struct ScratchBuffers {
    source: Region,
    destination: Region,
    capacity: usize,
}

impl ScratchBuffers {
    /// Allocate both regions. `capacity` is rounded up to a page multiple.
    pub fn new(capacity: usize, page_size: usize) -> Result<Self, ArenaError> {
        let capacity = scratch_capacity(capacity, page_size)?;

        let source = Region::allocate(capacity, page_size)?;
        let destination = Region::allocate(capacity, page_size)?;

        tracing::debug!(capacity, page_size, "allocated scratch buffers");

        Ok(Self {
            source,
            destination,
            capacity,
        })
    }

    /// Usable bytes in each region
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the views for `case`, or `None` if it does not fit.
    pub fn view(&mut self, case: &TestCase) -> Option<CaseView<'_>> {
        if !case.fits(self.capacity) {
            return None;
        }
        debug_assert_eq!(self.source.capacity, self.destination.capacity);

        // SAFETY: `fits` guarantees `align + length < capacity` for both regions.
        let (src, dst) = unsafe {
            (
                self.source.base.as_ptr().add(case.align_src),
                self.destination.base.as_ptr().add(case.align_dst),
            )
        };

        Some(CaseView {
            src,
            dst,
            len: case.length,
            _buffers: PhantomData,
        })
    }
}

/// Source and destination sub-views for one test case.
///
/// The views never overlap: they live in different regions.
#[derive(Debug)]
pub struct CaseView<'a> {
    src: *mut u8,
    dst: *mut u8,
    len: usize,
    _buffers: PhantomData<&'a mut ScratchBuffers>,
}

impl CaseView<'_> {
    /// Bytes covered by each view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the views are empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Destination start address
    pub fn dst_ptr(&self) -> *mut u8 {
        self.dst
    }

    /// Source start address
    pub fn src_ptr(&self) -> *const u8 {
        self.src
    }

    /// Fill the source with the reference pattern `1 + 23 * i` (mod 256).
    pub fn fill_source(&mut self) {
        // SAFETY: `src` is valid for `len` bytes and exclusively borrowed.
        let src = unsafe { std::slice::from_raw_parts_mut(self.src, self.len) };
        let mut value: u8 = 1;
        for byte in src {
            *byte = value;
            value = value.wrapping_add(23);
        }
    }

    /// Reset the destination to zero
    pub fn clear_destination(&mut self) {
        // SAFETY: `dst` is valid for `len` bytes and exclusively borrowed.
        unsafe { std::ptr::write_bytes(self.dst, 0, self.len) };
    }

    /// Source bytes
    pub fn source(&self) -> &[u8] {
        // SAFETY: `src` is valid for `len` bytes for the view's lifetime.
        unsafe { std::slice::from_raw_parts(self.src, self.len) }
    }

    /// Destination bytes
    pub fn destination(&self) -> &[u8] {
        // SAFETY: `dst` is valid for `len` bytes for the view's lifetime.
        unsafe { std::slice::from_raw_parts(self.dst, self.len) }
    }
}
