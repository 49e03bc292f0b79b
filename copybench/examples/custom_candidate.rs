//! Copybench Custom Candidate
//!
//! Registers an extra memcpy next to the built-in baselines and prints the
//! results as a table.
//!
//! Run with:
//!   cargo run --release --example custom_candidate

use copybench::prelude::*;
use copybench::{HumanSink, libc_memcpy};
use std::process::ExitCode;

/// Copies 16 bytes at a time, then the tail
unsafe fn chunked_memcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    let chunks = len / 16;
    for i in 0..chunks {
        unsafe {
            let block = std::ptr::read_unaligned(src.add(i * 16) as *const u128);
            std::ptr::write_unaligned(dst.add(i * 16) as *mut u128, block);
        }
    }
    for i in chunks * 16..len {
        unsafe { *dst.add(i) = *src.add(i) };
    }
    dst
}

fn main() -> ExitCode {
    let registry = Registry::builder(Operation::Memcpy)
        .baseline("simple_memcpy", simple_memcpy)
        .production("chunked_memcpy", chunked_memcpy)
        .production("memcpy", libc_memcpy)
        .build();

    let cases = [
        TestCase::new(16, 0, 0),
        TestCase::new(256, 3, 0),
        TestCase::new(4096, 0, 7),
        TestCase::new(4096, 13, 13),
    ];

    let mut driver = match Driver::new(registry, DriverConfig::default()) {
        Ok(driver) => driver,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut sink = HumanSink::new(std::io::stdout());
    match driver.run_cases(&mut sink, &cases) {
        Ok(summary) => summary.status().into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
