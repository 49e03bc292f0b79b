//! High-Precision Timing
//!
//! Two timing sources are available:
//! - `hp_timing`: the CPU cycle counter (RDTSCP on x86_64, CNTVCT_EL0 on AArch64)
//! - `clock_gettime`: the monotonic clock via `std::time::Instant`, in nanoseconds
//!
//! The names match the `timing_type` values downstream tooling already knows.

use std::fmt;
use std::str::FromStr;

// ─── Inline cycle counter helpers ────────────────────────────────────────────

/// Read the CPU cycle/tick counter (platform-specific).
#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_cycles() -> u64 {
    // SAFETY: RDTSCP is available on all x86_64 CPUs since ~2006.
    // It waits for all prior instructions to complete before reading the counter.
    unsafe {
        let mut _aux: u32 = 0;
        std::arch::x86_64::__rdtscp(&mut _aux)
    }
}

/// Read the virtual counter timer on AArch64 (comparable to x86 TSC).
#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_cycles() -> u64 {
    let cnt: u64;
    // SAFETY: CNTVCT_EL0 is accessible from EL0 (userspace) on all
    // AArch64 implementations.
    unsafe {
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) cnt, options(nostack, nomem));
    }
    cnt
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn read_cycles() -> u64 {
    0
}

/// Whether this platform provides real cycle counters.
pub const HAS_CYCLE_COUNTER: bool = cfg!(target_arch = "x86_64") || cfg!(target_arch = "aarch64");

// ─── TimingSource ────────────────────────────────────────────────────────────

/// Clock used to bracket a timing loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingSource {
    /// Hardware cycle counter; values are in cycles
    Cycles,
    /// Monotonic OS clock; values are in nanoseconds
    Monotonic,
}

impl TimingSource {
    /// The best source this platform offers
    pub fn detect() -> Self {
        if HAS_CYCLE_COUNTER {
            TimingSource::Cycles
        } else {
            TimingSource::Monotonic
        }
    }

    /// Identifier written as `timing_type` in result documents
    pub fn name(self) -> &'static str {
        match self {
            TimingSource::Cycles => "hp_timing",
            TimingSource::Monotonic => "clock_gettime",
        }
    }

    /// Unit of a tick difference
    pub fn unit(self) -> &'static str {
        match self {
            TimingSource::Cycles => "cycles",
            TimingSource::Monotonic => "ns",
        }
    }

    /// Whether the source can actually be read on this platform
    pub fn is_available(self) -> bool {
        match self {
            TimingSource::Cycles => HAS_CYCLE_COUNTER,
            TimingSource::Monotonic => true,
        }
    }

    /// Capture the current time from this source
    #[inline(always)]
    pub fn now(self) -> Timestamp {
        match self {
            TimingSource::Cycles => Timestamp::Cycles(read_cycles()),
            TimingSource::Monotonic => Timestamp::Monotonic(std::time::Instant::now()),
        }
    }
}

impl fmt::Display for TimingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hp_timing" | "cycles" | "tsc" => Ok(TimingSource::Cycles),
            "clock_gettime" | "monotonic" | "ns" => Ok(TimingSource::Monotonic),
            other => Err(format!("Unknown timing source: {}", other)),
        }
    }
}

// ─── Timestamp ───────────────────────────────────────────────────────────────

/// A reading taken from a [`TimingSource`]
#[derive(Debug, Clone, Copy)]
pub enum Timestamp {
    /// Raw cycle counter value
    Cycles(u64),
    /// Monotonic clock instant
    Monotonic(std::time::Instant),
}

impl Timestamp {
    /// Ticks elapsed from `earlier` to `self`, in the unit of their source.
    ///
    /// Readings from different sources cannot be compared and yield 0.
    #[inline(always)]
    pub fn ticks_since(&self, earlier: &Timestamp) -> u64 {
        match (self, earlier) {
            (Timestamp::Cycles(stop), Timestamp::Cycles(start)) => stop.saturating_sub(*start),
            (Timestamp::Monotonic(stop), Timestamp::Monotonic(start)) => {
                stop.saturating_duration_since(*start).as_nanos() as u64
            }
            _ => 0,
        }
    }
}

/// Set CPU affinity to pin the current thread to a specific core
///
/// This improves TSC stability by avoiding core migrations.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    // CPU_SET indexes a fixed-size bitmap
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("CPU {} exceeds the affinity mask size {}", cpu, libc::CPU_SETSIZE),
        ));
    }

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Set CPU affinity (no-op on this platform)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monotonic_ticks() {
        let source = TimingSource::Monotonic;
        let start = source.now();
        std::thread::sleep(Duration::from_millis(10));
        let stop = source.now();

        let nanos = stop.ticks_since(&start);
        // Should be at least 5ms in nanos
        assert!(nanos >= 5_000_000);
        // Should be less than 1s (accounting for scheduling)
        assert!(nanos < 1_000_000_000);
    }

    #[test]
    fn test_cycle_counter() {
        if HAS_CYCLE_COUNTER {
            let source = TimingSource::Cycles;
            let a = source.now();
            let b = source.now();
            assert!(b.ticks_since(&a) < u64::MAX / 2, "cycle counter should be monotonic");
        }
    }

    #[test]
    fn test_mixed_sources_yield_zero() {
        let a = TimingSource::Cycles.now();
        let b = TimingSource::Monotonic.now();
        assert_eq!(b.ticks_since(&a), 0);
        assert_eq!(a.ticks_since(&b), 0);
    }

    #[test]
    fn test_detect_is_available() {
        assert!(TimingSource::detect().is_available());
    }

    #[test]
    fn test_parse_source() {
        assert_eq!("hp_timing".parse::<TimingSource>().unwrap(), TimingSource::Cycles);
        assert_eq!("CYCLES".parse::<TimingSource>().unwrap(), TimingSource::Cycles);
        assert_eq!(
            "clock_gettime".parse::<TimingSource>().unwrap(),
            TimingSource::Monotonic
        );
        assert!("sundial".parse::<TimingSource>().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_out_of_range_cpu() {
        let err = pin_to_cpu(libc::CPU_SETSIZE as usize).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert_eq!(pin_to_cpu(5000).unwrap_err().kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_names_round_trip() {
        for source in [TimingSource::Cycles, TimingSource::Monotonic] {
            assert_eq!(source.name().parse::<TimingSource>().unwrap(), source);
        }
    }
}
