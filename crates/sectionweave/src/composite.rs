//! The composite provider: many providers presented as one.
//!
//! [`CompositeProvider`] owns a [`Composition`] and listens to every child's
//! signals. Child updates arrive in the child's local coordinates and leave
//! in the composite's global coordinates; see [`remap`] for the rules.
//!
//! The composite's loading state is the aggregate of its children's states.
//! While that aggregate is `Loading`, outbound updates are postponed and later
//! delivered as one batch, in notification order.
//!
//! Composites implement [`SectionProvider`] themselves, so they nest.
//!
//! # Locking
//!
//! The composition lock is never held while a signal is emitted or while a
//! child's loading or lookup methods run. Child section counts are read under
//! the lock; providers must not call back into their composite from
//! `section_count`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use sectionweave_core::ConnectionId;
use sectionweave_core::logging::{span_names, targets};

use crate::cell::CellData;
use crate::composition::Composition;
use crate::error::LoadingError;
use crate::index::{IndexPath, SectionSet};
use crate::loading::ContentLoadingState;
use crate::provider::{
    ContentLoading, ObjectLookup, ProviderBase, ProviderCapabilities, ProviderId, SectionProvider,
};
use crate::update::{BatchUpdate, ChangeKind, RowsUpdate, SectionsUpdate, Update};

/// Configuration for a [`CompositeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeConfig {
    /// Name attached to log events.
    pub name: String,

    /// Postpone outbound updates while the aggregate state is `Loading`.
    pub defer_updates_while_loading: bool,

    /// Panic on off-thread use even when global thread checks are disabled.
    pub strict_thread_checks: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            name: "composite".to_string(),
            defer_updates_while_loading: true,
            strict_thread_checks: false,
        }
    }
}

impl CompositeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_deferred_updates(mut self, defer: bool) -> Self {
        self.defer_updates_while_loading = defer;
        self
    }

    pub fn with_strict_thread_checks(mut self, strict: bool) -> Self {
        self.strict_thread_checks = strict;
        self
    }
}

struct ChildConnections {
    update: ConnectionId,
    will_load: Option<ConnectionId>,
    did_load: Option<ConnectionId>,
}

impl ChildConnections {
    fn disconnect(&self, child: &dyn SectionProvider) {
        let signals = child.base().signals();
        signals.update.disconnect(self.update);
        if let Some(id) = self.will_load {
            signals.will_load_content.disconnect(id);
        }
        if let Some(id) = self.did_load {
            signals.did_load_content.disconnect(id);
        }
    }
}

/// A provider that merges child providers into one list.
///
/// Structural mutation (`add`, `remove`, `load_content`) and update delivery
/// must happen on the thread that created the composite.
pub struct CompositeProvider {
    base: ProviderBase,
    config: CompositeConfig,
    composition: Mutex<Composition>,
    connections: Mutex<HashMap<ProviderId, ChildConnections>>,
    section_count: AtomicUsize,
    announced_loading: AtomicBool,
    self_ref: Weak<CompositeProvider>,
}

impl CompositeProvider {
    /// Creates an empty composite with the default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(CompositeConfig::default())
    }

    pub fn with_config(config: CompositeConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| {
            let base = ProviderBase::new();
            let composition = Composition::with_owner(base.id());
            Self {
                base,
                config,
                composition: Mutex::new(composition),
                connections: Mutex::new(HashMap::new()),
                section_count: AtomicUsize::new(0),
                announced_loading: AtomicBool::new(false),
                self_ref: self_ref.clone(),
            }
        })
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    /// Append a child. Returns `false` if it is already registered here or in
    /// another composite.
    pub fn add(&self, provider: Arc<dyn SectionProvider>) -> bool {
        if !self.check_thread("CompositeProvider::add") {
            return false;
        }

        let id = provider.base().id();
        let added = self.composition.lock().add(provider.clone());
        let sections = match added {
            Ok(sections) => sections,
            Err(err) => {
                tracing::warn!(target: targets::COMPOSITION, composite = %self.config.name, %err, "add rejected");
                return false;
            }
        };

        let capabilities = self
            .composition
            .lock()
            .capabilities(id)
            .unwrap_or_default();
        let connections = self.connect_child(provider.as_ref(), capabilities);
        self.connections.lock().insert(id, connections);
        self.refresh_section_count();

        tracing::debug!(
            target: targets::COMPOSITION,
            composite = %self.config.name,
            provider = %id,
            %sections,
            "child added"
        );

        if !sections.is_empty() {
            self.notify_update(Update::insert_sections(sections));
        }
        if capabilities.content_loading {
            self.announce_loading_if_needed();
        }
        true
    }

    /// Remove a child. Returns `false` if it is not registered here.
    pub fn remove(&self, provider: &dyn SectionProvider) -> bool {
        if !self.check_thread("CompositeProvider::remove") {
            return false;
        }

        let id = provider.base().id();
        let removed = self.composition.lock().remove(id);
        let sections = match removed {
            Ok(sections) => sections,
            Err(err) => {
                tracing::warn!(target: targets::COMPOSITION, composite = %self.config.name, %err, "remove rejected");
                return false;
            }
        };

        if let Some(connections) = self.connections.lock().remove(&id) {
            connections.disconnect(provider);
        }
        self.refresh_section_count();

        tracing::debug!(
            target: targets::COMPOSITION,
            composite = %self.config.name,
            provider = %id,
            %sections,
            "child removed"
        );

        if !sections.is_empty() {
            self.notify_update(Update::delete_sections(sections));
        }
        if self.announced_loading.load(Ordering::SeqCst) {
            self.settle_loading(None);
        }
        true
    }

    /// The children, in global section order.
    pub fn children(&self) -> Vec<Arc<dyn SectionProvider>> {
        self.composition.lock().children()
    }

    pub fn contains(&self, provider: &dyn SectionProvider) -> bool {
        self.composition.lock().contains(provider.base().id())
    }

    /// Global sections currently occupied by `provider`.
    pub fn sections_for(&self, provider: &dyn SectionProvider) -> SectionSet {
        let mut composition = self.composition.lock();
        let total = composition.update_mappings();
        self.section_count.store(total, Ordering::SeqCst);
        composition.sections_for(provider.base().id())
    }

    /// Resolve a global index path to its owning child and local path.
    pub fn resolve(&self, index_path: IndexPath) -> Option<(Arc<dyn SectionProvider>, IndexPath)> {
        let mut composition = self.composition.lock();
        let total = composition.update_mappings();
        self.section_count.store(total, Ordering::SeqCst);
        composition.local_index_path(index_path)
    }

    fn check_thread(&self, operation: &str) -> bool {
        if self.config.strict_thread_checks {
            self.base.affinity().assert_same_thread(operation);
            true
        } else {
            self.base.affinity().check(operation)
        }
    }

    fn refresh_section_count(&self) -> usize {
        let total = self.composition.lock().update_mappings();
        self.section_count.store(total, Ordering::SeqCst);
        total
    }

    fn connect_child(&self, child: &dyn SectionProvider, capabilities: ProviderCapabilities) -> ChildConnections {
        let id = child.base().id();
        let signals = child.base().signals();

        let weak = self.self_ref.clone();
        let update = signals.update.connect(move |update| {
            if let Some(composite) = weak.upgrade() {
                composite.child_did_update(id, update);
            }
        });

        let (will_load, did_load) = if capabilities.content_loading {
            let weak = self.self_ref.clone();
            let will = signals.will_load_content.connect(move |_| {
                if let Some(composite) = weak.upgrade() {
                    composite.announce_loading_if_needed();
                }
            });
            let weak = self.self_ref.clone();
            let did = signals.did_load_content.connect(move |error| {
                if let Some(composite) = weak.upgrade() {
                    composite.child_did_load_content(id, error.clone());
                }
            });
            (Some(will), Some(did))
        } else {
            (None, None)
        };

        ChildConnections {
            update,
            will_load,
            did_load,
        }
    }

    fn child_did_update(&self, child: ProviderId, update: &Update) {
        if !self.check_thread("CompositeProvider::child_did_update") {
            return;
        }

        let _span = tracing::trace_span!(target: targets::UPDATE, span_names::FORWARD_UPDATE).entered();
        let remapped = {
            let mut composition = self.composition.lock();
            let remapped = remap(&mut composition, child, update.clone());
            self.section_count
                .store(composition.total_sections(), Ordering::SeqCst);
            remapped
        };

        match remapped {
            Some(update) => self.notify_update(update),
            None => tracing::debug!(
                target: targets::UPDATE,
                composite = %self.config.name,
                provider = %child,
                update = %update.describe(),
                "child update dropped"
            ),
        }
    }

    fn child_did_load_content(&self, child: ProviderId, error: Option<LoadingError>) {
        if !self.check_thread("CompositeProvider::child_did_load_content") {
            return;
        }
        tracing::debug!(
            target: targets::LOADING,
            composite = %self.config.name,
            provider = %child,
            failed = error.is_some(),
            "child finished loading"
        );
        self.settle_loading(error);
    }

    fn announce_loading_if_needed(&self) {
        if self.loading_state().is_loading() && !self.announced_loading.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: targets::LOADING, composite = %self.config.name, "composite loading");
            self.base.signals().will_load_content.emit(());
        }
    }

    /// Once the aggregate leaves `Loading`, flush postponed updates and report.
    fn settle_loading(&self, error: Option<LoadingError>) {
        let state = self.loading_state();
        if state.is_loading() {
            return;
        }

        self.perform_pending_update();
        self.announced_loading.store(false, Ordering::SeqCst);

        let error = match state {
            ContentLoadingState::Error => error.or_else(|| self.loading_error()),
            _ => None,
        };
        tracing::debug!(target: targets::LOADING, composite = %self.config.name, %state, "composite finished loading");
        self.base.signals().did_load_content.emit(error);
    }
}

impl SectionProvider for CompositeProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    /// Always recomputed from the children's live counts.
    fn section_count(&self) -> usize {
        self.refresh_section_count()
    }

    fn row_count(&self, section: usize) -> usize {
        let local = {
            let mut composition = self.composition.lock();
            let total = composition.update_mappings();
            self.section_count.store(total, Ordering::SeqCst);
            composition.local_section(section)
        };
        match local {
            Some((child, local)) => child.row_count(local),
            None => 0,
        }
    }

    fn cell(&self, index_path: IndexPath) -> CellData {
        let local = {
            let mut composition = self.composition.lock();
            let total = composition.update_mappings();
            self.section_count.store(total, Ordering::SeqCst);
            composition.local_index_path(index_path)
        };
        match local {
            Some((child, local)) => child.cell(local),
            None => CellData::None,
        }
    }

    fn content_loading(&self) -> Option<&dyn ContentLoading> {
        Some(self)
    }

    fn object_lookup(&self) -> Option<&dyn ObjectLookup> {
        Some(self)
    }

    fn did_receive_memory_warning(&self) {
        for child in self.children() {
            child.did_receive_memory_warning();
        }
    }

    fn should_postpone_update(&self) -> bool {
        self.config.defer_updates_while_loading && self.loading_state().is_loading()
    }
}

impl ContentLoading for CompositeProvider {
    /// Priority aggregate over the children that load content.
    fn loading_state(&self) -> ContentLoadingState {
        let children = self.composition.lock().children_with_capabilities();
        ContentLoadingState::aggregate(
            children
                .iter()
                .filter(|(_, capabilities)| capabilities.content_loading)
                .filter_map(|(child, _)| child.content_loading().map(|l| l.loading_state())),
        )
    }

    /// The error of the first child, in section order, that failed.
    fn loading_error(&self) -> Option<LoadingError> {
        let children = self.composition.lock().children_with_capabilities();
        children
            .iter()
            .filter(|(_, capabilities)| capabilities.content_loading)
            .filter_map(|(child, _)| child.content_loading())
            .filter(|loading| loading.loading_state() == ContentLoadingState::Error)
            .find_map(|loading| loading.loading_error())
    }

    fn load_content(&self) {
        if !self.check_thread("CompositeProvider::load_content") {
            return;
        }
        let _span = tracing::trace_span!(target: targets::LOADING, span_names::LOAD_CONTENT).entered();

        let children = self.composition.lock().children_with_capabilities();
        for (child, capabilities) in &children {
            if !capabilities.content_loading {
                continue;
            }
            if let Some(loading) = child.content_loading() {
                loading.load_content();
            }
        }
        self.announce_loading_if_needed();
    }
}

impl ObjectLookup for CompositeProvider {
    fn object_at(&self, index_path: IndexPath) -> Option<CellData> {
        let (child, local) = {
            let mut composition = self.composition.lock();
            let total = composition.update_mappings();
            self.section_count.store(total, Ordering::SeqCst);
            let (child, local) = composition.local_index_path(index_path)?;
            let capabilities = composition.capabilities(child.base().id())?;
            if !capabilities.object_lookup {
                return None;
            }
            (child, local)
        };
        child.object_lookup()?.object_at(local)
    }

    fn index_paths_for(&self, object: &CellData) -> Vec<IndexPath> {
        let children = self.composition.lock().children_with_capabilities();
        let local: Vec<(ProviderId, Vec<IndexPath>)> = children
            .iter()
            .filter(|(_, capabilities)| capabilities.object_lookup)
            .filter_map(|(child, _)| {
                let paths = child.object_lookup()?.index_paths_for(object);
                Some((child.base().id(), paths))
            })
            .collect();

        let composition = self.composition.lock();
        local
            .into_iter()
            .filter_map(|(id, paths)| {
                composition
                    .mapping_for(id)
                    .map(|mapping| mapping.global_index_paths(&paths))
            })
            .flatten()
            .collect()
    }
}

impl Drop for CompositeProvider {
    fn drop(&mut self) {
        let connections = std::mem::take(self.connections.get_mut());
        for child in self.composition.get_mut().children() {
            if let Some(connections) = connections.get(&child.base().id()) {
                connections.disconnect(child.as_ref());
            }
        }
    }
}

impl std::fmt::Debug for CompositeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProvider")
            .field("name", &self.config.name)
            .field("id", &self.base.id())
            .field("sections", &self.section_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CompositeProvider: Send, Sync);

/// Rewrite an update from `child`'s local coordinates to global ones.
///
/// - Reload-data recomputes the mappings and passes through.
/// - Scroll-to-top and actions pass through untouched.
/// - Batches are remapped member by member, in order, then the mappings are
///   recomputed. Members that cannot be remapped are dropped. A child's
///   postponed batch still holds local coordinates, so it cannot be passed
///   through as is.
/// - Rows are translated through the child's mapping.
/// - Sections follow a fixed ordering around recomputation: inserts map
///   after it, deletes before it, reloads without it. Moves map the source
///   without recomputation and the destination after it.
///
/// Returns `None` when nothing valid is left to deliver.
pub fn remap(composition: &mut Composition, child: ProviderId, update: Update) -> Option<Update> {
    match update {
        Update::ReloadData => {
            composition.update_mappings();
            Some(Update::ReloadData)
        }
        Update::ScrollToTop { .. } | Update::Action(_) => Some(update),
        Update::Batch(batch) => {
            let remapped: BatchUpdate = batch
                .into_updates()
                .into_iter()
                .filter_map(|member| remap(composition, child, member))
                .collect();
            composition.update_mappings();
            (!remapped.is_empty()).then_some(Update::Batch(remapped))
        }
        Update::Rows(rows) => remap_rows(composition, child, rows),
        Update::Sections(sections) => remap_sections(composition, child, sections),
    }
}

fn remap_rows(composition: &Composition, child: ProviderId, rows: RowsUpdate) -> Option<Update> {
    let mapping = composition.mapping_for(child)?;
    let remapped = RowsUpdate {
        kind: rows.kind,
        animation: rows.animation,
        index_paths: rows
            .index_paths
            .map(|paths| mapping.global_index_paths(&paths)),
        new_index_paths: rows
            .new_index_paths
            .map(|paths| mapping.global_index_paths(&paths)),
    };

    if !remapped.is_valid() {
        tracing::trace!(target: targets::UPDATE, provider = %child, kind = %rows.kind, "rows update has no mapped paths");
        return None;
    }
    Some(Update::Rows(remapped))
}

fn remap_sections(
    composition: &mut Composition,
    child: ProviderId,
    update: SectionsUpdate,
) -> Option<Update> {
    if !composition.contains(child) {
        return None;
    }

    let SectionsUpdate {
        kind,
        animation,
        sections,
        new_sections,
    } = update;

    let sections = sections.map(|local| match kind {
        ChangeKind::Insert => {
            composition.update_mappings();
            composition.global_sections(&local, child)
        }
        ChangeKind::Delete => {
            let global = composition.global_sections(&local, child);
            composition.update_mappings();
            global
        }
        ChangeKind::Reload | ChangeKind::Move => composition.global_sections(&local, child),
    });

    let new_sections = new_sections.map(|local| {
        composition.update_mappings();
        composition.global_sections(&local, child)
    });

    let remapped = SectionsUpdate {
        kind,
        animation,
        sections,
        new_sections,
    };
    if !remapped.is_valid() {
        tracing::trace!(target: targets::UPDATE, provider = %child, %kind, "sections update has no mapped sections");
        return None;
    }
    Some(Update::Sections(remapped))
}
