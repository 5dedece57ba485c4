//! Debounced persistence of the annotation list.
//!
//! The synchronizer never performs I/O itself. It hands out
//! [`PendingLoad`]s and [`PendingFlush`]es, futures that own their data and
//! can run wherever the host likes; results come back through
//! [`PersistenceSync::complete_load`].

use super::{AnnotationBackend, BackendKind, BoxFuture};
use crate::annotation::Annotation;
use crate::state::{Action, AppState, Snapshot, Store};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Quiet period after the last change before a flush.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Which backend ended up holding a flushed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    Local,
    Remote,
    /// The remote save failed and the list was written locally instead.
    LocalFallback,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub status: FlushStatus,
    pub count: usize,
}

impl FlushReport {
    pub fn is_saved(&self) -> bool {
        self.status != FlushStatus::Failed
    }
}

/// A load issued for one backend activation.
pub struct PendingLoad {
    epoch: u64,
    kind: BackendKind,
    video_id: String,
    backend: Arc<dyn AnnotationBackend>,
}

impl PendingLoad {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Read the backend. Failures produce an empty batch.
    pub fn fetch(self) -> BoxFuture<'static, LoadedBatch> {
        Box::pin(async move {
            let annotations = self.backend.load_all(&self.video_id).await;
            LoadedBatch {
                epoch: self.epoch,
                kind: self.kind,
                annotations,
            }
        })
    }
}

/// Result of a [`PendingLoad`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedBatch {
    pub epoch: u64,
    pub kind: BackendKind,
    pub annotations: Vec<Annotation>,
}

/// A save of one annotation list.
pub struct PendingFlush {
    kind: BackendKind,
    video_id: String,
    annotations: Snapshot,
    local: Arc<dyn AnnotationBackend>,
    remote: Arc<dyn AnnotationBackend>,
}

impl PendingFlush {
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Write the list. A failed remote save falls back to local storage once.
    pub fn run(self) -> BoxFuture<'static, FlushReport> {
        Box::pin(async move {
            let count = self.annotations.len();
            let status = match self.kind {
                BackendKind::Local => {
                    if self.local.save_all(&self.annotations, &self.video_id).await {
                        FlushStatus::Local
                    } else {
                        FlushStatus::Failed
                    }
                }
                BackendKind::Remote => match self.remote.store(&self.annotations, &self.video_id).await {
                    Ok(()) => FlushStatus::Remote,
                    Err(e) => {
                        log::error!("Remote save failed, falling back to local storage: {e}");
                        if self.local.save_all(&self.annotations, &self.video_id).await {
                            FlushStatus::LocalFallback
                        } else {
                            FlushStatus::Failed
                        }
                    }
                },
            };
            match status {
                FlushStatus::Failed => log::error!("Failed to save {count} annotations"),
                _ => log::info!("Saved {count} annotations ({status:?})"),
            }
            FlushReport { status, count }
        })
    }
}

/// Keeps the store and the active backend in step.
pub struct PersistenceSync {
    local: Arc<dyn AnnotationBackend>,
    remote: Arc<dyn AnnotationBackend>,
    active: BackendKind,
    video_id: String,
    /// Bumped on every load; batches from older loads are dropped.
    epoch: u64,
    loaded: bool,
    debounce: Duration,
    deadline: Option<Instant>,
    /// Store revision the last load or change was seen at.
    seen_revision: u64,
}

impl PersistenceSync {
    pub fn new(
        local: Arc<dyn AnnotationBackend>,
        remote: Arc<dyn AnnotationBackend>,
        active: BackendKind,
        video_id: impl Into<String>,
    ) -> Self {
        Self {
            local,
            remote,
            active,
            video_id: video_id.into(),
            epoch: 0,
            loaded: false,
            debounce: DEFAULT_SAVE_DEBOUNCE,
            deadline: None,
            seen_revision: 0,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn active(&self) -> BackendKind {
        self.active
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// When the pending flush is due, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn backend(&self, kind: BackendKind) -> Arc<dyn AnnotationBackend> {
        match kind {
            BackendKind::Local => Arc::clone(&self.local),
            BackendKind::Remote => Arc::clone(&self.remote),
        }
    }

    /// Start loading from the active backend.
    ///
    /// Saving stops until the matching batch is completed.
    pub fn begin_load(&mut self) -> PendingLoad {
        self.epoch += 1;
        self.loaded = false;
        self.deadline = None;
        log::debug!("Loading annotations from {} storage (epoch {})", self.active, self.epoch);
        PendingLoad {
            epoch: self.epoch,
            kind: self.active,
            video_id: self.video_id.clone(),
            backend: self.backend(self.active),
        }
    }

    /// Switch backends and start loading from the new one.
    ///
    /// Edits not yet flushed are dropped; the new backend's data replaces them.
    pub fn toggle_backend(&mut self) -> PendingLoad {
        self.active = self.active.toggled();
        log::info!("Switched to {} storage", self.active);
        self.begin_load()
    }

    /// Put a loaded batch into the store. Returns `false` for stale batches.
    pub fn complete_load(&mut self, batch: LoadedBatch, store: &mut Store) -> bool {
        if batch.epoch != self.epoch {
            log::debug!(
                "Ignoring stale load from {} storage (epoch {}, current {})",
                batch.kind,
                batch.epoch,
                self.epoch
            );
            return false;
        }
        log::info!("Loaded {} annotations from {} storage", batch.annotations.len(), batch.kind);
        store.dispatch(Action::LoadAnnotations(batch.annotations));
        self.loaded = true;
        self.deadline = None;
        self.seen_revision = store.revision();
        true
    }

    /// Note the store's revision; a new one (re)arms the debounce deadline.
    pub fn observe(&mut self, revision: u64, now: Instant) {
        if !self.loaded || revision == self.seen_revision {
            return;
        }
        self.seen_revision = revision;
        self.deadline = Some(now + self.debounce);
    }

    /// The flush that is due at `now`, if any.
    pub fn poll_flush(&mut self, now: Instant, state: &AppState) -> Option<PendingFlush> {
        match self.deadline {
            Some(deadline) if self.loaded && now >= deadline => {
                self.deadline = None;
                Some(self.flush_of(state))
            }
            _ => None,
        }
    }

    /// Flush a pending change immediately, ignoring the deadline.
    pub fn flush_now(&mut self, state: &AppState) -> Option<PendingFlush> {
        if !self.loaded {
            return None;
        }
        self.deadline.take().map(|_| self.flush_of(state))
    }

    fn flush_of(&self, state: &AppState) -> PendingFlush {
        PendingFlush {
            kind: self.active,
            video_id: self.video_id.clone(),
            annotations: Arc::clone(state.snapshot()),
            local: Arc::clone(&self.local),
            remote: Arc::clone(&self.remote),
        }
    }
}
