//! Coordinates within a sectioned list.
//!
//! An [`IndexPath`] addresses one row inside one section. A [`SectionSet`] is
//! an ordered set of section indices. Both are plain values: whether they are
//! local to a provider or global to a composite depends only on who holds them.

use std::collections::BTreeSet;
use std::fmt;

/// A (section, row) position.
///
/// Index paths order by section first, then by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath {
    /// The section index.
    pub section: usize,
    /// The row within the section.
    pub row: usize,
}

impl IndexPath {
    /// Creates an index path.
    #[inline]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }

    /// Returns the same row in a different section.
    #[inline]
    pub const fn with_section(self, section: usize) -> Self {
        Self {
            section,
            row: self.row,
        }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

impl From<(usize, usize)> for IndexPath {
    fn from((section, row): (usize, usize)) -> Self {
        Self::new(section, row)
    }
}

/// An ordered set of section indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SectionSet(BTreeSet<usize>);

impl SectionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Creates a set holding a single section.
    pub fn single(section: usize) -> Self {
        Self(BTreeSet::from([section]))
    }

    /// Creates a set from a half-open range of sections.
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        Self(range.collect())
    }

    /// Adds a section. Returns `false` if it was already present.
    pub fn insert(&mut self, section: usize) -> bool {
        self.0.insert(section)
    }

    /// Removes a section. Returns `false` if it was not present.
    pub fn remove(&mut self, section: usize) -> bool {
        self.0.remove(&section)
    }

    /// Returns `true` if the set contains `section`.
    pub fn contains(&self, section: usize) -> bool {
        self.0.contains(&section)
    }

    /// Number of sections in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The lowest section in the set.
    pub fn first(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// The highest section in the set.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Iterates sections in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Returns `true` if the set is a gap-free run of sections.
    pub fn is_contiguous(&self) -> bool {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last - first + 1 == self.len(),
            _ => true,
        }
    }

    /// Collects the sections into a `Vec` in ascending order.
    pub fn to_vec(&self) -> Vec<usize> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<usize> for SectionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<usize> for SectionSet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<const N: usize> From<[usize; N]> for SectionSet {
    fn from(sections: [usize; N]) -> Self {
        sections.into_iter().collect()
    }
}

impl IntoIterator for SectionSet {
    type Item = usize;
    type IntoIter = std::collections::btree_set::IntoIter<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SectionSet {
    type Item = usize;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl fmt::Display for SectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}
