//! The ordered registry of child providers and their mappings.
//!
//! Registration order is global section order. The `global section ->
//! mapping` table is derived state: [`Composition::update_mappings`] rebuilds
//! it, together with every mapping, from the providers' live section counts.
//! Callers must rebuild after any membership change and before any query that
//! depends on current section counts.

use std::sync::Arc;

use sectionweave_core::logging::targets;

use crate::error::{CompositionError, Result};
use crate::index::{IndexPath, SectionSet};
use crate::mapping::SectionMapping;
use crate::provider::{ProviderCapabilities, ProviderId, SectionProvider};

struct Entry {
    mapping: SectionMapping,
    capabilities: ProviderCapabilities,
}

/// Registry of child providers, in global section order.
pub struct Composition {
    owner: ProviderId,
    entries: Vec<Entry>,
    /// Index into `entries`, by global section.
    section_table: Vec<usize>,
    total_sections: usize,
}

impl Default for Composition {
    fn default() -> Self {
        Self::new()
    }
}

impl Composition {
    /// Creates an empty registry with its own owner identity.
    pub fn new() -> Self {
        Self::with_owner(ProviderId::next())
    }

    /// Creates an empty registry that claims providers on behalf of `owner`.
    pub fn with_owner(owner: ProviderId) -> Self {
        Self {
            owner,
            entries: Vec::new(),
            section_table: Vec::new(),
            total_sections: 0,
        }
    }

    pub fn owner(&self) -> ProviderId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.position(id).is_some()
    }

    /// The registered providers, in order.
    pub fn children(&self) -> Vec<Arc<dyn SectionProvider>> {
        self.entries
            .iter()
            .map(|entry| entry.mapping.provider().clone())
            .collect()
    }

    /// The registered providers paired with their capabilities.
    pub fn children_with_capabilities(&self) -> Vec<(Arc<dyn SectionProvider>, ProviderCapabilities)> {
        self.entries
            .iter()
            .map(|entry| (entry.mapping.provider().clone(), entry.capabilities))
            .collect()
    }

    /// Capabilities resolved when `id` was added.
    pub fn capabilities(&self, id: ProviderId) -> Option<ProviderCapabilities> {
        self.position(id).map(|i| self.entries[i].capabilities)
    }

    /// Register a provider at the end and return the global sections it now
    /// occupies.
    pub fn add(&mut self, provider: Arc<dyn SectionProvider>) -> Result<SectionSet> {
        let id = provider.base().id();
        if id == self.owner {
            return Err(CompositionError::SelfComposition(id));
        }
        if self.contains(id) {
            return Err(CompositionError::AlreadyRegistered(id));
        }
        provider.base().claim(self.owner)?;

        let capabilities = provider.capabilities();
        self.entries.push(Entry {
            mapping: SectionMapping::new(provider),
            capabilities,
        });
        self.update_mappings();

        let sections = self.sections_for(id);
        tracing::debug!(
            target: targets::COMPOSITION,
            owner = %self.owner,
            provider = %id,
            %sections,
            "provider added"
        );
        Ok(sections)
    }

    /// Unregister a provider and return the global sections it occupied just
    /// before removal.
    pub fn remove(&mut self, id: ProviderId) -> Result<SectionSet> {
        let Some(position) = self.position(id) else {
            return Err(CompositionError::NotRegistered(id));
        };

        let sections = self.entries[position].mapping.global_block();
        let entry = self.entries.remove(position);
        entry.mapping.provider().base().release(self.owner);
        self.update_mappings();

        tracing::debug!(
            target: targets::COMPOSITION,
            owner = %self.owner,
            provider = %id,
            %sections,
            "provider removed"
        );
        Ok(sections)
    }

    /// Rebuild every mapping in order and the section table. Returns the total
    /// number of sections.
    #[tracing::instrument(skip_all, target = "sectionweave::composition", level = "trace")]
    pub fn update_mappings(&mut self) -> usize {
        self.section_table.clear();
        let mut next = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let end = entry.mapping.update_mappings(next);
            self.section_table.extend(std::iter::repeat_n(index, end - next));
            next = end;
        }
        debug_assert_eq!(self.section_table.len(), next);
        self.total_sections = next;
        next
    }

    /// Total sections as of the last [`update_mappings`](Self::update_mappings).
    pub fn total_sections(&self) -> usize {
        self.total_sections
    }

    pub fn mapping_for(&self, id: ProviderId) -> Option<&SectionMapping> {
        self.position(id).map(|i| &self.entries[i].mapping)
    }

    pub fn mapping_for_section(&self, global: usize) -> Option<&SectionMapping> {
        self.section_table
            .get(global)
            .map(|&index| &self.entries[index].mapping)
    }

    /// Global sections occupied by `id`; empty if it is not registered.
    pub fn sections_for(&self, id: ProviderId) -> SectionSet {
        self.mapping_for(id)
            .map(SectionMapping::global_block)
            .unwrap_or_default()
    }

    /// Translate `id`'s local sections to global ones, dropping the unmapped.
    pub fn global_sections(&self, local: &SectionSet, id: ProviderId) -> SectionSet {
        self.mapping_for(id)
            .map(|mapping| mapping.global_sections(local))
            .unwrap_or_default()
    }

    /// The provider owning a global section, and the matching local section.
    pub fn local_section(&self, global: usize) -> Option<(Arc<dyn SectionProvider>, usize)> {
        let mapping = self.mapping_for_section(global)?;
        let local = mapping.local_section(global)?;
        Some((mapping.provider().clone(), local))
    }

    /// The provider owning a global index path, and the matching local path.
    pub fn local_index_path(&self, global: IndexPath) -> Option<(Arc<dyn SectionProvider>, IndexPath)> {
        let mapping = self.mapping_for_section(global.section)?;
        let local = mapping.local_index_path(global)?;
        Some((mapping.provider().clone(), local))
    }

    fn position(&self, id: ProviderId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.mapping.provider_id() == id)
    }
}

impl Drop for Composition {
    fn drop(&mut self) {
        for entry in &self.entries {
            entry.mapping.provider().base().release(self.owner);
        }
    }
}

impl std::fmt::Debug for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composition")
            .field("owner", &self.owner)
            .field(
                "mappings",
                &self.entries.iter().map(|e| &e.mapping).collect::<Vec<_>>(),
            )
            .field("total_sections", &self.total_sections)
            .finish()
    }
}
