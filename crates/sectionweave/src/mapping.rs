//! Per-provider translation between local and global coordinates.
//!
//! A [`SectionMapping`] assigns one provider a contiguous block of global
//! sections. The block is rebuilt wholesale from the provider's live section
//! count by [`SectionMapping::update_mappings`]; nothing else mutates it.
//!
//! Lookups outside the block return `None`, and the batch variants silently
//! drop coordinates that do not map.

use std::collections::HashMap;
use std::sync::Arc;

use sectionweave_core::logging::targets;

use crate::index::{IndexPath, SectionSet};
use crate::provider::{ProviderId, SectionProvider};

/// Bidirectional section map for one registered provider.
pub struct SectionMapping {
    provider: Arc<dyn SectionProvider>,
    global_to_local: HashMap<usize, usize>,
    local_to_global: HashMap<usize, usize>,
    start: usize,
}

impl SectionMapping {
    /// Creates an empty mapping. Call [`update_mappings`](Self::update_mappings)
    /// before querying it.
    pub fn new(provider: Arc<dyn SectionProvider>) -> Self {
        Self {
            provider,
            global_to_local: HashMap::new(),
            local_to_global: HashMap::new(),
            start: 0,
        }
    }

    pub fn provider(&self) -> &Arc<dyn SectionProvider> {
        &self.provider
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider.base().id()
    }

    /// Rebuild the mapping as `[start, start + n)` where `n` is the provider's
    /// current section count. Returns the first global section after the block.
    pub fn update_mappings(&mut self, start: usize) -> usize {
        let count = self.provider.section_count();
        self.global_to_local.clear();
        self.local_to_global.clear();
        self.global_to_local.reserve(count);
        self.local_to_global.reserve(count);
        self.start = start;

        for local in 0..count {
            let global = start + local;
            let collided = self.global_to_local.insert(global, local);
            debug_assert!(
                collided.is_none(),
                "global section {global} mapped twice for provider {}",
                self.provider_id()
            );
            self.local_to_global.insert(local, global);
        }

        tracing::trace!(
            target: targets::MAPPING,
            provider = %self.provider_id(),
            start,
            count,
            "section mapping rebuilt"
        );
        start + count
    }

    /// Number of sections in the block.
    pub fn section_count(&self) -> usize {
        self.local_to_global.len()
    }

    /// The global sections this mapping occupies.
    pub fn global_block(&self) -> SectionSet {
        SectionSet::from_range(self.start..self.start + self.section_count())
    }

    pub fn contains_global_section(&self, global: usize) -> bool {
        self.global_to_local.contains_key(&global)
    }

    pub fn local_section(&self, global: usize) -> Option<usize> {
        self.global_to_local.get(&global).copied()
    }

    pub fn global_section(&self, local: usize) -> Option<usize> {
        self.local_to_global.get(&local).copied()
    }

    pub fn local_index_path(&self, global: IndexPath) -> Option<IndexPath> {
        self.local_section(global.section)
            .map(|section| global.with_section(section))
    }

    pub fn global_index_path(&self, local: IndexPath) -> Option<IndexPath> {
        self.global_section(local.section)
            .map(|section| local.with_section(section))
    }

    pub fn local_sections(&self, global: &SectionSet) -> SectionSet {
        global.iter().filter_map(|s| self.local_section(s)).collect()
    }

    pub fn global_sections(&self, local: &SectionSet) -> SectionSet {
        local.iter().filter_map(|s| self.global_section(s)).collect()
    }

    pub fn local_index_paths(&self, global: &[IndexPath]) -> Vec<IndexPath> {
        global
            .iter()
            .filter_map(|&ip| self.local_index_path(ip))
            .collect()
    }

    pub fn global_index_paths(&self, local: &[IndexPath]) -> Vec<IndexPath> {
        local
            .iter()
            .filter_map(|&ip| self.global_index_path(ip))
            .collect()
    }
}

impl std::fmt::Debug for SectionMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionMapping")
            .field("provider", &self.provider_id())
            .field("block", &(self.start..self.start + self.section_count()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellData;
    use crate::provider::ProviderBase;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Sections {
        base: ProviderBase,
        count: AtomicUsize,
    }

    impl Sections {
        fn new(count: usize) -> Arc<Self> {
            Arc::new(Self {
                base: ProviderBase::new(),
                count: AtomicUsize::new(count),
            })
        }
    }

    impl SectionProvider for Sections {
        fn base(&self) -> &ProviderBase {
            &self.base
        }
        fn section_count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
        fn row_count(&self, _section: usize) -> usize {
            0
        }
        fn cell(&self, _index_path: IndexPath) -> CellData {
            CellData::None
        }
    }

    #[test]
    fn test_bijection_for_any_offset() {
        for count in [0, 1, 4] {
            for start in [0, 3, 10] {
                let mut mapping = SectionMapping::new(Sections::new(count));
                assert_eq!(mapping.update_mappings(start), start + count);

                for local in 0..count {
                    assert_eq!(mapping.global_section(local), Some(start + local));
                    assert_eq!(mapping.local_section(start + local), Some(local));
                }
                assert_eq!(mapping.global_section(count), None);
                assert_eq!(mapping.local_section(start + count), None);
                if start > 0 {
                    assert_eq!(mapping.local_section(start - 1), None);
                }
            }
        }
    }

    #[test]
    fn test_index_paths_keep_row() {
        let mut mapping = SectionMapping::new(Sections::new(2));
        mapping.update_mappings(5);

        assert_eq!(
            mapping.global_index_path(IndexPath::new(1, 7)),
            Some(IndexPath::new(6, 7))
        );
        assert_eq!(
            mapping.local_index_path(IndexPath::new(5, 2)),
            Some(IndexPath::new(0, 2))
        );
        assert_eq!(mapping.local_index_path(IndexPath::new(7, 0)), None);
    }

    #[test]
    fn test_batches_drop_unmapped() {
        let mut mapping = SectionMapping::new(Sections::new(2));
        mapping.update_mappings(3);

        assert_eq!(
            mapping.global_sections(&SectionSet::from([0, 1, 2])),
            SectionSet::from([3, 4])
        );
        assert_eq!(
            mapping.local_sections(&SectionSet::from([2, 3, 9])),
            SectionSet::from([0])
        );
        assert_eq!(
            mapping.global_index_paths(&[IndexPath::new(0, 0), IndexPath::new(5, 0)]),
            vec![IndexPath::new(3, 0)]
        );
    }

    #[test]
    fn test_rebuild_follows_live_count() {
        let provider = Sections::new(3);
        let mut mapping = SectionMapping::new(provider.clone());
        mapping.update_mappings(0);
        assert_eq!(mapping.global_block(), SectionSet::from_range(0..3));

        provider.count.store(1, Ordering::SeqCst);
        // Stale until rebuilt.
        assert_eq!(mapping.section_count(), 3);
        assert_eq!(mapping.update_mappings(2), 3);
        assert_eq!(mapping.global_block(), SectionSet::single(2));
        assert_eq!(mapping.local_section(0), None);
    }
}
