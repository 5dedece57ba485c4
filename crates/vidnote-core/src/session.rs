//! Annotation session.
//!
//! Wires a video surface, the interaction controller, the store and the
//! persistence synchronizer together. The host feeds it input events and
//! clock ticks and runs the load/flush futures it hands back.

use crate::annotation::{Annotation, AnnotationId};
use crate::config::SessionConfig;
use crate::input::InputEvent;
use crate::interaction::InteractionController;
use crate::state::{Action, AppState, Outcome, Store};
use crate::storage::{
    AnnotationBackend, FileKeyValue, KeyValueStore, LoadedBatch, LocalBackend, MemoryKeyValue,
    PendingFlush, PendingLoad, PersistenceSync, RemoteBackend, StorageResult,
};
use crate::tools::ToolKind;
use crate::video::VideoSurface;
use crate::visibility;
use std::sync::Arc;
use std::time::Instant;

pub struct Session<V: VideoSurface> {
    config: SessionConfig,
    store: Store,
    controller: InteractionController,
    sync: PersistenceSync,
    video: V,
}

impl<V: VideoSurface> Session<V> {
    /// Session backed by the configured file store and remote service.
    pub fn new(config: SessionConfig, video: V) -> StorageResult<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.storage_dir {
            Some(dir) => Arc::new(FileKeyValue::new(dir.clone())?),
            None => Arc::new(MemoryKeyValue::new()),
        };
        let local = Arc::new(LocalBackend::new(store));
        let remote = Arc::new(RemoteBackend::new(config.api_base_url.clone()));
        Ok(Self::with_backends(config, video, local, remote))
    }

    pub fn with_backends(
        config: SessionConfig,
        video: V,
        local: Arc<dyn AnnotationBackend>,
        remote: Arc<dyn AnnotationBackend>,
    ) -> Self {
        let mut store = Store::new();
        if let Outcome::Rejected(e) = store.dispatch(Action::SetAnnotationDuration(config.default_duration)) {
            log::warn!("Keeping default annotation duration: {e}");
        }
        let sync = PersistenceSync::new(local, remote, config.initial_backend, config.video_id.clone())
            .with_debounce(config.save_debounce);
        Self {
            controller: InteractionController::new(config.video_id.clone()),
            config,
            store,
            sync,
            video,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn sync(&self) -> &PersistenceSync {
        &self.sync
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    /// Initial load from the configured backend.
    pub fn start(&mut self) -> PendingLoad {
        self.sync.begin_load()
    }

    /// Switch backends. Unsaved edits are replaced by the new backend's data.
    pub fn toggle_backend(&mut self) -> PendingLoad {
        self.controller.cancel();
        self.sync.toggle_backend()
    }

    /// Apply a finished load. Returns `false` if a newer load superseded it.
    pub fn complete_load(&mut self, batch: LoadedBatch) -> bool {
        if !self.sync.complete_load(batch, &mut self.store) {
            return false;
        }
        self.controller.cancel();
        self.controller.observe_annotations(self.store.state().annotations());
        true
    }

    /// Feed one input event through the controller.
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) -> Option<Outcome> {
        let action = self.controller.handle(event, self.store.state(), &mut self.video)?;
        Some(self.dispatch(action, now))
    }

    /// Dispatch an action that didn't come from the controller (toolbar, menus).
    pub fn dispatch(&mut self, action: Action, now: Instant) -> Outcome {
        let outcome = self.store.dispatch(action);
        self.sync.observe(self.store.revision(), now);
        outcome
    }

    /// Switch tools. Any open text entry loses focus and commits first.
    pub fn select_tool(&mut self, tool: ToolKind, now: Instant) -> Outcome {
        self.handle_input(&InputEvent::FocusLost, now);
        self.controller.cancel();
        self.dispatch(Action::SetTool(tool), now)
    }

    /// Flush that has become due, if any.
    pub fn tick(&mut self, now: Instant) -> Option<PendingFlush> {
        self.sync.poll_flush(now, self.store.state())
    }

    /// Flush pending edits right away (for shutdown).
    pub fn flush_now(&mut self) -> Option<PendingFlush> {
        self.sync.flush_now(self.store.state())
    }

    /// Seek to the start of annotation `id` and pause there, as picking it
    /// from an annotation list does. Returns `false` for an unknown id.
    pub fn jump_to(&mut self, id: AnnotationId) -> bool {
        let Some(start) = self.store.state().annotation(id).map(|a| a.start) else {
            return false;
        };
        self.video.seek(start);
        self.video.pause();
        true
    }

    /// Annotations to draw at the current playback position.
    pub fn visible_annotations(&self) -> Vec<&Annotation> {
        visibility::visible_at(self.store.state().annotations(), self.video.current_time()).collect()
    }
}
