//! Annotation persistence bridge: debounced, per-page, latest-wins saves.
//!
//! DESIGN
//! ======
//! Each page has at most one pending save. Scheduling a new snapshot for a
//! page replaces the old one and pushes its deadline out by the debounce
//! window, so a burst of edits collapses into a single write of the final
//! state. Snapshots are immutable once captured: a save that fires after the
//! user moved on to another page still writes the document tagged with the
//! page it was taken from.
//!
//! The bridge also keeps the most recent snapshot of every page it has seen.
//! Revisiting a page reads that cache, and the remote store is only asked
//! about a page the first time it is shown.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::doc::SceneDocument;
use crate::error::{ErrorCode, PersistenceError};
use crate::store::{AnnotationRecord, AnnotationStore};

/// A snapshot waiting for its debounce window to elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub page: u32,
    pub doc: SceneDocument,
    pub deadline: Instant,
}

/// Result of flushing the due saves.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    pub failed: usize,
}

pub struct PersistenceBridge {
    debounce: Duration,
    pending: BTreeMap<u32, PendingSave>,
    cache: HashMap<u32, SceneDocument>,
    fetched: HashSet<u32>,
}

impl PersistenceBridge {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self { debounce, pending: BTreeMap::new(), cache: HashMap::new(), fetched: HashSet::new() }
    }

    // --- Scheduling ---

    /// Queue `doc` as the latest state of `page`, restarting that page's timer.
    pub fn schedule_save(&mut self, page: u32, doc: SceneDocument, now: Instant) {
        let deadline = now + self.debounce;
        self.cache.insert(page, doc.clone());
        let superseded = self.pending.insert(page, PendingSave { page, doc, deadline }).is_some();
        debug!(page, superseded, "persistence: save scheduled");
    }

    #[must_use]
    pub fn is_pending(&self, page: u32) -> bool {
        self.pending.contains_key(&page)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest deadline among pending saves, for the host's timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every save whose deadline has passed, in page order.
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingSave> {
        let due: Vec<u32> = self.pending.values().filter(|p| p.deadline <= now).map(|p| p.page).collect();
        due.iter().filter_map(|page| self.pending.remove(page)).collect()
    }

    /// Drop every pending save. Returns how many were discarded.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        if count > 0 {
            info!(count, "persistence: pending saves cancelled");
        }
        count
    }

    // --- Cache ---

    #[must_use]
    pub fn cached(&self, page: u32) -> Option<&SceneDocument> {
        self.cache.get(&page)
    }

    /// Whether the store still has to be asked about `page`.
    #[must_use]
    pub fn needs_fetch(&self, page: u32) -> bool {
        !self.cache.contains_key(&page) && !self.fetched.contains(&page)
    }

    /// Record what the store returned for `page` and return what the page
    /// should now show.
    ///
    /// Edits made while the request was in flight stay on top of the stored
    /// objects. The merged document is queued for saving, so the next write
    /// does not replace the stored copy with the local edits alone.
    pub fn record_fetched(&mut self, page: u32, doc: Option<SceneDocument>, now: Instant) -> Option<SceneDocument> {
        self.fetched.insert(page);
        let stored = doc?;
        let Some(mut local) = self.cache.get(&page).cloned() else {
            self.cache.insert(page, stored.clone());
            return Some(stored);
        };
        local.merge_beneath(stored);
        debug!(page, objects = local.objects.len(), "persistence: stored copy merged beneath local edits");
        self.schedule_save(page, local.clone(), now);
        Some(local)
    }

    // --- Store I/O ---

    /// Write every due save. Failures are logged and dropped; nothing retries.
    pub async fn flush_due<S>(&mut self, store: &S, score_id: &str, now: Instant) -> FlushReport
    where
        S: AnnotationStore + ?Sized,
    {
        let mut report = FlushReport::default();
        for save in self.take_due(now) {
            match persist(store, score_id, &save).await {
                Ok(()) => {
                    report.saved += 1;
                    info!(page = save.page, objects = save.doc.objects.len(), "persistence: page saved");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(page = save.page, error = %e, code = e.error_code(), retryable = e.retryable(), "persistence: save failed");
                }
            }
        }
        report
    }
}

/// Ask the store for `page`'s document. `Ok(None)` when the page has never
/// been annotated or holds a blank record.
///
/// # Errors
///
/// Propagates transport and status errors other than "not found", and
/// [`PersistenceError::Malformed`] for an unreadable document.
pub async fn load_if_present<S>(store: &S, score_id: &str, page: u32) -> Result<Option<SceneDocument>, PersistenceError>
where
    S: AnnotationStore + ?Sized,
{
    let record = store.load(score_id, page).await.inspect_err(|e| {
        error!(page, error = %e, code = e.error_code(), "persistence: load failed");
    })?;
    let doc = match record {
        Some(r) if !r.annotations_json.trim().is_empty() => Some(SceneDocument::from_json(&r.annotations_json, page)?),
        _ => None,
    };
    debug!(page, found = doc.is_some(), "persistence: page loaded");
    Ok(doc)
}

async fn persist<S>(store: &S, score_id: &str, save: &PendingSave) -> Result<(), PersistenceError>
where
    S: AnnotationStore + ?Sized,
{
    let record = AnnotationRecord { page_number: save.page, annotations_json: save.doc.to_json()? };
    store.save(score_id, &record).await
}
