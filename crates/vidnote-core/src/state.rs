//! Application state and its transition function.

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch};
use crate::tools::ToolKind;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Default visibility length of new annotations, in seconds.
pub const DEFAULT_ANNOTATION_DURATION: f64 = 2.0;

/// Default color of new annotations.
pub const DEFAULT_COLOR: &str = "#ffffff";

/// A shared, immutable annotation list. Undo history holds these, so
/// pushing a snapshot never copies the list.
pub type Snapshot = Arc<Vec<Annotation>>;

/// Something that can happen to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddAnnotation(Annotation),
    /// Replace every annotation. Starts a new history.
    LoadAnnotations(Vec<Annotation>),
    UpdateAnnotation {
        id: AnnotationId,
        patch: AnnotationPatch,
    },
    DeleteAnnotation(AnnotationId),
    SetSelected(Option<AnnotationId>),
    SetTool(ToolKind),
    SetColor(String),
    SetAnnotationDuration(f64),
    Undo,
    Redo,
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("annotation id {0} already exists")]
    DuplicateId(AnnotationId),
    #[error("invalid visibility window [{start}, {end}]")]
    InvalidWindow { start: f64, end: f64 },
    #[error("invalid annotation duration {0}")]
    InvalidDuration(f64),
}

/// Result of applying an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The state changed.
    Applied,
    /// Valid action with nothing to do (e.g. undo with empty history).
    Unchanged,
    /// The action named an annotation that does not exist.
    NotFound(AnnotationId),
    /// The action would break an invariant; state is untouched.
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// New state plus what happened.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: AppState,
    pub outcome: Outcome,
}

/// Everything the editor knows about the current video's annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    annotations: Snapshot,
    selected_id: Option<AnnotationId>,
    tool: ToolKind,
    color: String,
    annotation_duration: f64,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            annotations: Arc::new(Vec::new()),
            selected_id: None,
            tool: ToolKind::default(),
            color: DEFAULT_COLOR.to_string(),
            annotation_duration: DEFAULT_ANNOTATION_DURATION,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Annotations in insertion order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Shared handle to the current list.
    pub fn snapshot(&self) -> &Snapshot {
        &self.annotations
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn selected_id(&self) -> Option<AnnotationId> {
        self.selected_id
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selected_id.and_then(|id| self.annotation(id))
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn annotation_duration(&self) -> f64 {
        self.annotation_duration
    }

    pub fn undo_stack(&self) -> &[Snapshot] {
        &self.undo_stack
    }

    pub fn redo_stack(&self) -> &[Snapshot] {
        &self.redo_stack
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Apply `action`, producing the next state.
    ///
    /// Deterministic: ids and timestamps come from the action, never from
    /// the clock. A refused action returns the state unchanged.
    pub fn apply(mut self, action: Action) -> Transition {
        let outcome = self.apply_in_place(action);
        Transition { state: self, outcome }
    }

    fn apply_in_place(&mut self, action: Action) -> Outcome {
        match action {
            Action::AddAnnotation(annotation) => {
                if self.index_of(annotation.id).is_some() {
                    return Outcome::Rejected(Rejection::DuplicateId(annotation.id));
                }
                if !annotation.has_valid_window() {
                    return Outcome::Rejected(Rejection::InvalidWindow {
                        start: annotation.start,
                        end: annotation.end,
                    });
                }
                let mut next = self.annotations.as_ref().clone();
                next.push(annotation);
                self.commit(next);
                Outcome::Applied
            }
            Action::LoadAnnotations(list) => {
                self.annotations = Arc::new(sanitize(list));
                self.undo_stack.clear();
                self.redo_stack.clear();
                self.selected_id = None;
                Outcome::Applied
            }
            Action::UpdateAnnotation { id, patch } => {
                let Some(index) = self.index_of(id) else {
                    return Outcome::NotFound(id);
                };
                let patched = patch.apply_to(&self.annotations[index]);
                if !patched.has_valid_window() {
                    return Outcome::Rejected(Rejection::InvalidWindow {
                        start: patched.start,
                        end: patched.end,
                    });
                }
                let mut next = self.annotations.as_ref().clone();
                next[index] = patched;
                self.commit(next);
                Outcome::Applied
            }
            Action::DeleteAnnotation(id) => {
                let Some(index) = self.index_of(id) else {
                    return Outcome::NotFound(id);
                };
                let mut next = self.annotations.as_ref().clone();
                next.remove(index);
                self.commit(next);
                if self.selected_id == Some(id) {
                    self.selected_id = None;
                }
                Outcome::Applied
            }
            Action::SetSelected(Some(id)) => {
                if self.index_of(id).is_none() {
                    return Outcome::NotFound(id);
                }
                self.selected_id = Some(id);
                Outcome::Applied
            }
            Action::SetSelected(None) => {
                self.selected_id = None;
                Outcome::Applied
            }
            Action::SetTool(tool) => {
                self.tool = tool;
                Outcome::Applied
            }
            Action::SetColor(color) => {
                self.color = color;
                Outcome::Applied
            }
            Action::SetAnnotationDuration(seconds) => {
                if !seconds.is_finite() || seconds < 0.0 {
                    return Outcome::Rejected(Rejection::InvalidDuration(seconds));
                }
                self.annotation_duration = seconds;
                Outcome::Applied
            }
            Action::Undo => match self.undo_stack.pop() {
                Some(previous) => {
                    let current = std::mem::replace(&mut self.annotations, previous);
                    self.redo_stack.push(current);
                    self.selected_id = None;
                    Outcome::Applied
                }
                None => Outcome::Unchanged,
            },
            Action::Redo => match self.redo_stack.pop() {
                Some(next) => {
                    let current = std::mem::replace(&mut self.annotations, next);
                    self.undo_stack.push(current);
                    self.selected_id = None;
                    Outcome::Applied
                }
                None => Outcome::Unchanged,
            },
        }
    }

    fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id == id)
    }

    /// Install `next` as the current list, pushing the old one to history.
    fn commit(&mut self, next: Vec<Annotation>) {
        let previous = std::mem::replace(&mut self.annotations, Arc::new(next));
        self.undo_stack.push(previous);
        self.redo_stack.clear();
    }
}

/// Drop loaded records that would break the list invariants.
fn sanitize(list: Vec<Annotation>) -> Vec<Annotation> {
    let mut seen = HashSet::with_capacity(list.len());
    list.into_iter()
        .filter(|a| {
            if !a.has_valid_window() {
                log::warn!("Dropping annotation {} with window [{}, {}]", a.id, a.start, a.end);
                return false;
            }
            if !seen.insert(a.id) {
                log::warn!("Dropping duplicate annotation id {}", a.id);
                return false;
            }
            true
        })
        .collect()
}

/// Owner of the current state.
///
/// Tracks a revision number that changes whenever the annotation list
/// does, so observers can tell edits from tool or color changes.
#[derive(Debug, Default)]
pub struct Store {
    state: AppState,
    revision: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AppState) -> Self {
        Self { state, revision: 0 }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Revision of the annotation list.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply an action to the current state.
    pub fn dispatch(&mut self, action: Action) -> Outcome {
        let before = Arc::clone(&self.state.annotations);
        let Transition { state, outcome } = std::mem::take(&mut self.state).apply(action);
        self.state = state;
        if !Arc::ptr_eq(&before, &self.state.annotations) {
            self.revision += 1;
        }
        if let Outcome::NotFound(id) = &outcome {
            log::debug!("Action ignored: annotation {} not found", id);
        }
        outcome
    }
}
