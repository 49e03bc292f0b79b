//! Implementation Registry
//!
//! An ordered, immutable table of named copy candidates. Order matters: it is
//! the order of the `ifuncs` array and of every `timings` array in the output.

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature shared by every candidate: `(destination, source, length) -> pointer`.
///
/// # Safety
///
/// Callers must pass `dst` valid for `len` byte writes and `src` valid for
/// `len` byte reads, with the two ranges not overlapping.
pub type CopyFn = unsafe fn(dst: *mut u8, src: *const u8, len: usize) -> *mut u8;

/// Copy operation family, which fixes the return-value contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Returns the destination start
    Memcpy,
    /// Returns one past the last written destination byte
    Mempcpy,
}

impl Operation {
    /// All supported families
    pub const ALL: [Operation; 2] = [Operation::Memcpy, Operation::Mempcpy];

    /// Name used as the key under `functions` in the result document
    pub fn name(self) -> &'static str {
        match self {
            Operation::Memcpy => "memcpy",
            Operation::Mempcpy => "mempcpy",
        }
    }

    /// Pointer a correct candidate must return for this call
    pub fn expected_result(self, dst: *mut u8, len: usize) -> *mut u8 {
        match self {
            Operation::Memcpy => dst,
            Operation::Mempcpy => dst.wrapping_add(len),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memcpy" => Ok(Operation::Memcpy),
            "mempcpy" => Ok(Operation::Mempcpy),
            other => Err(format!("Unknown operation: {}", other)),
        }
    }
}

/// What a candidate stands for in the comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Straightforward reference implementation
    Baseline,
    /// Optimized or dispatched path that production code would call
    Production,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Baseline => f.write_str("baseline"),
            Role::Production => f.write_str("production"),
        }
    }
}

/// A named candidate implementation
#[derive(Debug, Clone)]
pub struct Candidate {
    name: String,
    entry: CopyFn,
    role: Role,
}

impl Candidate {
    /// Create a candidate
    pub fn new(name: impl Into<String>, entry: CopyFn, role: Role) -> Self {
        Self {
            name: name.into(),
            entry,
            role,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role in the comparison
    pub fn role(&self) -> Role {
        self.role
    }

    /// Invoke the candidate
    ///
    /// # Safety
    ///
    /// Same contract as [`CopyFn`].
    #[inline(always)]
    pub unsafe fn call(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        // SAFETY: forwarded to the caller.
        unsafe { (self.entry)(dst, src, len) }
    }
}

/// Immutable, ordered set of candidates for one operation family
#[derive(Debug, Clone)]
pub struct Registry {
    operation: Operation,
    candidates: Vec<Candidate>,
}

impl Registry {
    /// Start building a registry
    pub fn builder(operation: Operation) -> RegistryBuilder {
        RegistryBuilder {
            operation,
            candidates: Vec::new(),
        }
    }

    /// Operation family every candidate implements
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Candidates in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the registry has no candidates
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate at `index`
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name.clone()).collect()
    }

    /// Candidates usable as a correctness reference
    pub fn baselines(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.role == Role::Baseline)
    }

    /// New registry keeping only candidates whose name satisfies `keep`.
    ///
    /// Relative order is preserved.
    pub fn retain_names<F>(&self, mut keep: F) -> Registry
    where
        F: FnMut(&str) -> bool,
    {
        Registry {
            operation: self.operation,
            candidates: self
                .candidates
                .iter()
                .filter(|c| keep(&c.name))
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Collects candidates before freezing them into a [`Registry`]
#[derive(Debug)]
pub struct RegistryBuilder {
    operation: Operation,
    candidates: Vec<Candidate>,
}

impl RegistryBuilder {
    /// Append a candidate with an explicit role
    pub fn register(mut self, name: impl Into<String>, entry: CopyFn, role: Role) -> Self {
        self.candidates.push(Candidate::new(name, entry, role));
        self
    }

    /// Append a baseline candidate
    pub fn baseline(self, name: impl Into<String>, entry: CopyFn) -> Self {
        self.register(name, entry, Role::Baseline)
    }

    /// Append a production candidate
    pub fn production(self, name: impl Into<String>, entry: CopyFn) -> Self {
        self.register(name, entry, Role::Production)
    }

    /// Freeze the table. Duplicate names are allowed but reported.
    pub fn build(self) -> Registry {
        let mut seen = FxHashSet::default();
        for candidate in &self.candidates {
            if !seen.insert(candidate.name.as_str()) {
                tracing::warn!(
                    name = %candidate.name,
                    "duplicate candidate name; results are told apart by position only"
                );
            }
        }

        Registry {
            operation: self.operation,
            candidates: self.candidates,
        }
    }
}
