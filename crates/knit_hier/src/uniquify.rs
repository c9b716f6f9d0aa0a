//! Per-module name allocation.

use std::collections::{HashMap, HashSet};

/// Issues collision-free names within one namespace.
///
/// A base name is handed out unchanged the first time; later requests for the
/// same base receive `base_1`, `base_2`, and so on, skipping anything already
/// claimed through [`Uniquifier::reserve`].
#[derive(Debug, Clone, Default)]
pub struct Uniquifier {
    taken: HashSet<String>,
    next_suffix: HashMap<String, u32>,
}

impl Uniquifier {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `name` has been handed out or reserved.
    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Claims `name` exactly. Returns `false` if it is already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_string())
    }

    /// Returns a free name derived from `base` and claims it.
    pub fn uniquify(&mut self, base: &str) -> String {
        if self.reserve(base) {
            return base.to_string();
        }
        let mut n = self.next_suffix.get(base).copied().unwrap_or(1);
        loop {
            let candidate = format!("{base}_{n}");
            n += 1;
            if self.reserve(&candidate) {
                self.next_suffix.insert(base.to_string(), n);
                return candidate;
            }
        }
    }

    /// Number of names claimed so far.
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    /// Returns `true` if no name has been claimed.
    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}
