//! Built-in copy candidates
//!
//! Each family ships byte-loop and compiler-intrinsic baselines next to the
//! production paths (a word-at-a-time copy and the platform C library).

use crate::registry::{Operation, Registry};
use std::mem::size_of;

/// Registry of built-in candidates for `operation`
pub fn default_registry(operation: Operation) -> Registry {
    match operation {
        Operation::Memcpy => Registry::builder(operation)
            .baseline("simple_memcpy", simple_memcpy)
            .baseline("builtin_memcpy", builtin_memcpy)
            .production("word_memcpy", word_memcpy)
            .production("memcpy", libc_memcpy)
            .build(),
        Operation::Mempcpy => Registry::builder(operation)
            .baseline("simple_mempcpy", simple_mempcpy)
            .baseline("builtin_mempcpy", builtin_mempcpy)
            .production("mempcpy", libc_mempcpy)
            .build(),
    }
}

/// Byte-at-a-time copy
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn simple_memcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    for i in 0..len {
        // SAFETY: caller guarantees both ranges cover `len` bytes.
        unsafe { *dst.add(i) = *src.add(i) };
    }
    dst
}

/// Compiler intrinsic copy
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn builtin_memcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    // SAFETY: caller guarantees valid, non-overlapping ranges.
    unsafe { std::ptr::copy_nonoverlapping(src, dst, len) };
    dst
}

/// Word-at-a-time copy: aligns the destination with single bytes, then moves
/// `usize` words using unaligned source loads, then finishes the tail.
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn word_memcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    const WORD: usize = size_of::<usize>();

    let head = dst.align_offset(WORD).min(len);
    let mut offset = 0;

    // SAFETY: every access stays below `len`, which the caller guarantees is
    // valid for both ranges; word stores land on `WORD`-aligned addresses.
    unsafe {
        while offset < head {
            *dst.add(offset) = *src.add(offset);
            offset += 1;
        }
        while len - offset >= WORD {
            let word = src.add(offset).cast::<usize>().read_unaligned();
            dst.add(offset).cast::<usize>().write(word);
            offset += WORD;
        }
        while offset < len {
            *dst.add(offset) = *src.add(offset);
            offset += 1;
        }
    }
    dst
}

/// Platform C library `memcpy`
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn libc_memcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    // SAFETY: caller guarantees valid, non-overlapping ranges.
    unsafe { libc::memcpy(dst.cast(), src.cast(), len).cast() }
}

/// Byte-at-a-time copy returning the end of the destination
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn simple_mempcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    // SAFETY: forwarded to the caller.
    unsafe { simple_memcpy(dst, src, len).add(len) }
}

/// Compiler intrinsic copy returning the end of the destination
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn builtin_mempcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    // SAFETY: forwarded to the caller.
    unsafe { builtin_memcpy(dst, src, len).add(len) }
}

/// C library `memcpy` returning the end of the destination
///
/// # Safety
///
/// `dst` and `src` must satisfy the [`CopyFn`](crate::CopyFn) contract for `len` bytes.
pub unsafe fn libc_mempcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    // SAFETY: forwarded to the caller.
    unsafe { libc_memcpy(dst, src, len).add(len) }
}
