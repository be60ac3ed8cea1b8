//! Fresh-identifier allocation.
//!
//! One [`NameGenerator`] exists per compilation, owned by the transform
//! driver and lent to every pass that needs a synthetic name. Names are
//! `_a`, `_b`, ... `_z`, then `_0`, `_1`, ..., skipping anything reserved from
//! the source program, so generated names never collide with each other or
//! with user code across the whole transformed program.

use rustc_hash::FxHashSet;

/// Counter-backed source of collision-free synthetic identifiers.
#[derive(Debug, Default)]
pub struct NameGenerator {
    next_id: u32,
    reserved: FxHashSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator::default()
    }

    /// Mark a name as taken by the source program. Reserved names are never
    /// returned by [`next`](Self::next).
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    /// Allocate the next fresh name. Monotonic within one compilation.
    pub fn next(&mut self) -> String {
        loop {
            let id = self.next_id;
            self.next_id += 1;

            let candidate = if id < 26 {
                format!("_{}", (b'a' + id as u8) as char)
            } else {
                format!("_{}", id - 26)
            };

            if !self.reserved.contains(&candidate) {
                // A generated name is reserved too, in case a later pass
                // reserves source names after allocation has started.
                self.reserved.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sequential_and_unique() {
        let mut names = NameGenerator::new();
        assert_eq!(names.next(), "_a");
        assert_eq!(names.next(), "_b");

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(names.next()), "generator repeated a name");
        }
    }

    #[test]
    fn reserved_names_are_skipped() {
        let mut names = NameGenerator::new();
        names.reserve("_a");
        names.reserve("_c");
        assert_eq!(names.next(), "_b");
        assert_eq!(names.next(), "_d");
    }

    #[test]
    fn rolls_over_to_numeric_suffixes() {
        let mut names = NameGenerator::new();
        for _ in 0..26 {
            names.next();
        }
        assert_eq!(names.next(), "_0");
        assert_eq!(names.next(), "_1");
    }
}
