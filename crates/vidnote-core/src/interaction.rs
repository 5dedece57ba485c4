//! Gesture handling.
//!
//! Turns pointer and keyboard input into [`Action`]s. The controller owns
//! only per-gesture scratch data (the shape being drawn, the drag offset,
//! the pending text); everything durable lives in the store.

use crate::annotation::{
    Annotation, AnnotationId, AnnotationPatch, IdGenerator, Shape, TextContent, now_iso8601,
};
use crate::input::{InputEvent, KeyPress, MouseButton, PointerEvent};
use crate::shortcuts::{Command, ShortcutRegistry};
use crate::state::{Action, AppState};
use crate::tools::{Draft, ToolKind};
use crate::video::{SEEK_STEP_SECS, VideoSurface};
use crate::visibility;
use kurbo::{Point, Vec2};

/// Text typed at a clicked position, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEntry {
    pub position: Point,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub color: String,
}

/// Current gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing(Draft),
    Dragging {
        id: AnnotationId,
        /// Pointer position relative to the annotation's origin.
        offset: Vec2,
    },
    TextEditing(TextEntry),
}

/// Translates input into state actions.
#[derive(Debug, Clone)]
pub struct InteractionController {
    gesture: Gesture,
    ids: IdGenerator,
    video_id: String,
}

impl InteractionController {
    /// Create a controller that tags new annotations with `video_id`.
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            gesture: Gesture::Idle,
            ids: IdGenerator::new(),
            video_id: video_id.into(),
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Shape being drawn, for the renderer's preview.
    pub fn preview(&self) -> Option<Shape> {
        match &self.gesture {
            Gesture::Drawing(draft) => Some(draft.shape()),
            _ => None,
        }
    }

    /// Pending text entry, for the renderer's input box.
    pub fn text_entry(&self) -> Option<&TextEntry> {
        match &self.gesture {
            Gesture::TextEditing(entry) => Some(entry),
            _ => None,
        }
    }

    /// Keep generated ids clear of ids that already exist.
    pub fn observe_annotations(&mut self, annotations: &[Annotation]) {
        self.ids.observe(annotations);
    }

    /// Drop the current gesture without dispatching anything.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Handle one input event. Returns the action to dispatch, if any.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        state: &AppState,
        video: &mut dyn VideoSurface,
    ) -> Option<Action> {
        match event {
            InputEvent::Pointer(PointerEvent::Down { position, button: MouseButton::Left }) => {
                self.pointer_down(*position, state, video)
            }
            InputEvent::Pointer(PointerEvent::Move { position }) => self.pointer_move(*position, state),
            InputEvent::Pointer(PointerEvent::Up { position, button: MouseButton::Left }) => {
                self.pointer_up(*position)
            }
            InputEvent::Pointer(_) => None,
            InputEvent::Key(press) => self.key_press(press, state, video),
            InputEvent::Text(chars) => {
                if let Gesture::TextEditing(entry) = &mut self.gesture {
                    entry.text.push_str(chars);
                }
                None
            }
            InputEvent::FocusLost => self.commit_text(),
        }
    }

    fn pointer_down(
        &mut self,
        position: Point,
        state: &AppState,
        video: &mut dyn VideoSurface,
    ) -> Option<Action> {
        // Clicking anywhere takes focus away from an open text entry.
        if matches!(self.gesture, Gesture::TextEditing(_)) {
            let committed = self.commit_text();
            if state.tool() == ToolKind::Text {
                self.open_text_entry(position, state, video);
            }
            return committed;
        }
        if !self.is_idle() {
            return None;
        }

        match state.tool() {
            tool if tool.draws_shape() => {
                video.pause_if_playing();
                let draft = Draft::begin(
                    tool,
                    position,
                    video.current_time(),
                    state.annotation_duration(),
                    state.color().to_string(),
                );
                if let Some(draft) = draft {
                    self.gesture = Gesture::Drawing(draft);
                }
                None
            }
            ToolKind::Text => {
                self.open_text_entry(position, state, video);
                None
            }
            _ => {
                let t = video.current_time();
                match visibility::hit_test(state.annotations(), t, position) {
                    Some(annotation) => {
                        let id = annotation.id;
                        self.gesture = Gesture::Dragging {
                            id,
                            offset: position - annotation.shape.origin(),
                        };
                        Some(Action::SetSelected(Some(id)))
                    }
                    None => Some(Action::SetSelected(None)),
                }
            }
        }
    }

    fn pointer_move(&mut self, position: Point, state: &AppState) -> Option<Action> {
        match &mut self.gesture {
            Gesture::Drawing(draft) => {
                draft.update(position);
                None
            }
            Gesture::Dragging { id, offset } => {
                let (id, offset) = (*id, *offset);
                let Some(annotation) = state.annotation(id) else {
                    // Gone from under the pointer (undo, delete, load).
                    self.gesture = Gesture::Idle;
                    return None;
                };
                let target = position - offset;
                let patch = drag_patch(&annotation.shape, target).stamped(now_iso8601());
                Some(Action::UpdateAnnotation { id, patch })
            }
            Gesture::Idle | Gesture::TextEditing(_) => None,
        }
    }

    fn pointer_up(&mut self, position: Point) -> Option<Action> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Drawing(mut draft) => {
                draft.update(position);
                let id = self.allocate_id()?;
                Some(Action::AddAnnotation(draft.finish(id, &self.video_id)))
            }
            Gesture::TextEditing(entry) => {
                // Releasing the click that opened the entry keeps it open.
                self.gesture = Gesture::TextEditing(entry);
                None
            }
            Gesture::Dragging { .. } | Gesture::Idle => None,
        }
    }

    fn key_press(
        &mut self,
        press: &KeyPress,
        state: &AppState,
        video: &mut dyn VideoSurface,
    ) -> Option<Action> {
        if matches!(self.gesture, Gesture::TextEditing(_)) {
            return self.text_entry_key(press);
        }

        match ShortcutRegistry::lookup(press)? {
            Command::Undo => Some(Action::Undo),
            Command::Redo => Some(Action::Redo),
            Command::DeleteSelected => {
                if state.tool() != ToolKind::Select {
                    return None;
                }
                let id = state.selected_id()?;
                self.gesture = Gesture::Idle;
                Some(Action::DeleteAnnotation(id))
            }
            Command::TogglePlayback => {
                video.toggle_playback();
                None
            }
            Command::SeekBackward => {
                video.seek_by(-SEEK_STEP_SECS);
                None
            }
            Command::SeekForward => {
                video.seek_by(SEEK_STEP_SECS);
                None
            }
        }
    }

    fn text_entry_key(&mut self, press: &KeyPress) -> Option<Action> {
        if press.is("Enter") {
            return self.commit_text();
        }
        if press.is("Escape") {
            self.gesture = Gesture::Idle;
            return None;
        }
        if press.is("Backspace") {
            if let Gesture::TextEditing(entry) = &mut self.gesture {
                entry.text.pop();
            }
            return None;
        }
        // Undo/redo stay global; every other key belongs to the entry.
        match ShortcutRegistry::lookup(press) {
            Some(Command::Undo) => Some(Action::Undo),
            Some(Command::Redo) => Some(Action::Redo),
            _ => None,
        }
    }

    fn open_text_entry(&mut self, position: Point, state: &AppState, video: &mut dyn VideoSurface) {
        video.pause_if_playing();
        let start = video.current_time();
        self.gesture = Gesture::TextEditing(TextEntry {
            position,
            text: String::new(),
            start,
            end: start + state.annotation_duration(),
            color: state.color().to_string(),
        });
    }

    fn allocate_id(&mut self) -> Option<AnnotationId> {
        match self.ids.next_id() {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Discarding new annotation: {e}");
                None
            }
        }
    }

    /// Close the text entry, producing an annotation unless it is blank.
    fn commit_text(&mut self) -> Option<Action> {
        if !matches!(self.gesture, Gesture::TextEditing(_)) {
            return None;
        }
        let Gesture::TextEditing(entry) = std::mem::take(&mut self.gesture) else {
            return None;
        };
        if entry.text.trim().is_empty() {
            return None;
        }
        let shape = Shape::Text(TextContent {
            x: entry.position.x,
            y: entry.position.y,
            text: entry.text,
        });
        let id = self.allocate_id()?;
        let annotation =
            Annotation::new(id, entry.color, entry.start, entry.end, shape).with_video_id(&self.video_id);
        Some(Action::AddAnnotation(annotation))
    }
}

/// Patch that moves `shape` so its origin lands on `target`.
fn drag_patch(shape: &Shape, target: Point) -> AnnotationPatch {
    let delta = target - shape.origin();
    match shape {
        Shape::Text(_) => AnnotationPatch::text_position(target),
        Shape::Rectangle(g) | Shape::Circle(g) => AnnotationPatch::endpoints(
            Point::new(g.start_x, g.start_y) + delta,
            Point::new(g.end_x, g.end_y) + delta,
        ),
        Shape::Line(l) => AnnotationPatch::endpoints(l.start() + delta, l.end() + delta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::BoxGeometry;
    use crate::state::{Outcome, Store};
    use crate::video::PlaybackClock;

    struct Harness {
        store: Store,
        controller: InteractionController,
        video: PlaybackClock,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Store::new(),
                controller: InteractionController::new("default"),
                video: PlaybackClock::new(60.0),
            }
        }

        fn send(&mut self, event: InputEvent) -> Option<Outcome> {
            let action = self.controller.handle(&event, self.store.state(), &mut self.video)?;
            Some(self.store.dispatch(action))
        }

        fn tool(&mut self, tool: ToolKind) {
            self.store.dispatch(Action::SetTool(tool));
        }

        fn only(&self) -> &Annotation {
            assert_eq!(self.store.state().annotations().len(), 1);
            &self.store.state().annotations()[0]
        }
    }

    fn rect_at(id: u64, from: (f64, f64), to: (f64, f64)) -> Annotation {
        Annotation::new(
            AnnotationId::new(id as f64),
            "#f00",
            0.0,
            10.0,
            Shape::Rectangle(BoxGeometry::from_corners(
                Point::new(from.0, from.1),
                Point::new(to.0, to.1),
            )),
        )
    }

    #[test]
    fn test_draw_rectangle() {
        let mut h = Harness::new();
        h.tool(ToolKind::Rectangle);
        h.store.dispatch(Action::SetAnnotationDuration(1.5));
        h.video.seek(3.0);
        h.video.play();

        assert_eq!(h.send(InputEvent::pointer_down(10.0, 10.0)), None);
        assert!(h.video.is_paused());
        assert_eq!(h.send(InputEvent::pointer_move(30.0, 30.0)), None);
        assert!(h.controller.preview().is_some());
        assert!(h.store.state().annotations().is_empty());

        assert_eq!(h.send(InputEvent::pointer_up(50.0, 60.0)), Some(Outcome::Applied));
        assert!(h.controller.is_idle());
        let annotation = h.only();
        assert_eq!((annotation.start, annotation.end), (3.0, 4.5));
        let Shape::Rectangle(g) = &annotation.shape else { panic!("expected rectangle") };
        assert_eq!((g.start_x, g.start_y, g.end_x, g.end_y), (10.0, 10.0, 50.0, 60.0));
    }

    #[test]
    fn test_click_without_drag_still_adds() {
        let mut h = Harness::new();
        h.tool(ToolKind::Circle);
        h.send(InputEvent::pointer_down(5.0, 5.0));
        h.send(InputEvent::pointer_up(5.0, 5.0));

        let Shape::Circle(g) = &h.only().shape else { panic!("expected circle") };
        assert_eq!((g.width, g.height), (0.0, 0.0));
    }

    #[test]
    fn test_drawn_ids_are_unique() {
        let mut h = Harness::new();
        h.tool(ToolKind::Line);
        for _ in 0..3 {
            h.send(InputEvent::pointer_down(0.0, 0.0));
            h.send(InputEvent::pointer_up(10.0, 10.0));
        }
        let ids: Vec<_> = h.store.state().annotations().iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
    }

    #[test]
    fn test_text_commit_with_enter() {
        let mut h = Harness::new();
        h.tool(ToolKind::Text);
        h.video.seek(2.0);
        h.video.play();

        h.send(InputEvent::pointer_down(40.0, 50.0));
        assert!(h.video.is_paused());
        h.send(InputEvent::Text("Helo".to_string()));
        h.send(InputEvent::key("Backspace"));
        h.send(InputEvent::Text("lo".to_string()));
        assert_eq!(h.controller.text_entry().map(|e| e.text.as_str()), Some("Hello"));

        assert_eq!(h.send(InputEvent::key("Enter")), Some(Outcome::Applied));
        let annotation = h.only();
        assert_eq!(annotation.start, 2.0);
        assert_eq!(
            annotation.shape,
            Shape::Text(TextContent { x: 40.0, y: 50.0, text: "Hello".to_string() })
        );
    }

    #[test]
    fn test_blank_text_is_discarded() {
        let mut h = Harness::new();
        h.tool(ToolKind::Text);
        h.send(InputEvent::pointer_down(1.0, 1.0));
        h.send(InputEvent::Text("   ".to_string()));
        assert_eq!(h.send(InputEvent::FocusLost), None);
        assert!(h.controller.is_idle());
        assert!(h.store.state().annotations().is_empty());
    }

    #[test]
    fn test_escape_cancels_text() {
        let mut h = Harness::new();
        h.tool(ToolKind::Text);
        h.send(InputEvent::pointer_down(1.0, 1.0));
        h.send(InputEvent::Text("draft".to_string()));
        assert_eq!(h.send(InputEvent::key("Escape")), None);
        assert!(h.controller.is_idle());
        assert!(h.store.state().annotations().is_empty());
    }

    #[test]
    fn test_focus_loss_commits_text() {
        let mut h = Harness::new();
        h.tool(ToolKind::Text);
        h.send(InputEvent::pointer_down(1.0, 1.0));
        h.send(InputEvent::Text("note".to_string()));
        assert_eq!(h.send(InputEvent::FocusLost), Some(Outcome::Applied));
        assert_eq!(h.store.state().annotations().len(), 1);
    }

    #[test]
    fn test_click_elsewhere_commits_and_reopens() {
        let mut h = Harness::new();
        h.tool(ToolKind::Text);
        h.send(InputEvent::pointer_down(1.0, 1.0));
        h.send(InputEvent::pointer_up(1.0, 1.0));
        h.send(InputEvent::Text("first".to_string()));

        assert_eq!(h.send(InputEvent::pointer_down(80.0, 90.0)), Some(Outcome::Applied));
        let entry = h.controller.text_entry().expect("new entry open");
        assert_eq!(entry.position, Point::new(80.0, 90.0));
        assert!(entry.text.is_empty());
    }

    #[test]
    fn test_typing_never_deletes_selection() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (10.0, 10.0))));
        h.store.dispatch(Action::SetSelected(Some(AnnotationId::new(1.0))));
        h.tool(ToolKind::Text);
        h.send(InputEvent::pointer_down(100.0, 100.0));

        assert_eq!(h.send(InputEvent::key("Delete")), None);
        assert_eq!(h.send(InputEvent::key("Backspace")), None);
        assert_eq!(h.store.state().annotations().len(), 1);
    }

    #[test]
    fn test_drag_rectangle_scenario() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (10.0, 10.0), (50.0, 60.0))));

        assert_eq!(h.send(InputEvent::pointer_down(20.0, 20.0)), Some(Outcome::Applied));
        assert_eq!(h.store.state().selected_id(), Some(AnnotationId::new(1.0)));
        assert_eq!(h.send(InputEvent::pointer_move(25.0, 25.0)), Some(Outcome::Applied));
        assert_eq!(h.send(InputEvent::pointer_up(25.0, 25.0)), None);

        let Shape::Rectangle(g) = &h.only().shape else { panic!("expected rectangle") };
        assert_eq!((g.start_x, g.start_y, g.end_x, g.end_y), (15.0, 15.0, 55.0, 65.0));
        assert_eq!((g.end_x - g.start_x, g.end_y - g.start_y), (40.0, 50.0));
    }

    #[test]
    fn test_drag_mirrored_shape_keeps_size() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (50.0, 60.0), (10.0, 10.0))));

        h.send(InputEvent::pointer_down(30.0, 30.0));
        h.send(InputEvent::pointer_move(37.0, 21.0));

        let Shape::Rectangle(g) = &h.only().shape else { panic!("expected rectangle") };
        assert_eq!((g.end_x - g.start_x, g.end_y - g.start_y), (-40.0, -50.0));
        assert_eq!((g.start_x, g.start_y), (57.0, 51.0));
        assert_eq!((g.scale_x, g.scale_y), (-1.0, -1.0));
    }

    #[test]
    fn test_drag_text_sets_anchor() {
        let mut h = Harness::new();
        let label = Annotation::new(
            AnnotationId::new(4.0),
            "#fff",
            0.0,
            5.0,
            Shape::Text(TextContent { x: 10.0, y: 10.0, text: "label".to_string() }),
        );
        h.store.dispatch(Action::AddAnnotation(label));

        h.send(InputEvent::pointer_down(12.0, 14.0));
        h.send(InputEvent::pointer_move(22.0, 34.0));

        let Shape::Text(t) = &h.only().shape else { panic!("expected text") };
        assert_eq!((t.x, t.y), (20.0, 30.0));
    }

    #[test]
    fn test_each_drag_move_is_an_undo_step() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (20.0, 20.0))));
        let depth = h.store.state().undo_stack().len();

        h.send(InputEvent::pointer_down(5.0, 5.0));
        for step in 1..=3 {
            h.send(InputEvent::pointer_move(5.0 + step as f64, 5.0));
        }
        h.send(InputEvent::pointer_up(8.0, 5.0));

        assert_eq!(h.store.state().undo_stack().len(), depth + 3);
    }

    #[test]
    fn test_background_click_clears_selection() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (20.0, 20.0))));
        h.store.dispatch(Action::SetSelected(Some(AnnotationId::new(1.0))));

        assert_eq!(h.send(InputEvent::pointer_down(300.0, 300.0)), Some(Outcome::Applied));
        assert_eq!(h.store.state().selected_id(), None);
        assert!(h.controller.is_idle());
    }

    #[test]
    fn test_hidden_annotations_are_not_selectable() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (20.0, 20.0))));
        h.video.seek(30.0);

        h.send(InputEvent::pointer_down(10.0, 10.0));
        assert_eq!(h.store.state().selected_id(), None);
        assert!(h.controller.is_idle());
    }

    #[test]
    fn test_delete_key_removes_selection() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (20.0, 20.0))));
        h.send(InputEvent::pointer_down(5.0, 5.0));
        h.send(InputEvent::pointer_up(5.0, 5.0));

        assert_eq!(h.send(InputEvent::key("Delete")), Some(Outcome::Applied));
        assert!(h.store.state().annotations().is_empty());
        assert_eq!(h.store.state().selected_id(), None);
    }

    #[test]
    fn test_delete_key_needs_select_tool() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (20.0, 20.0))));
        h.store.dispatch(Action::SetSelected(Some(AnnotationId::new(1.0))));
        h.tool(ToolKind::Rectangle);

        assert_eq!(h.send(InputEvent::key("Delete")), None);
        assert_eq!(h.store.state().annotations().len(), 1);
    }

    #[test]
    fn test_undo_redo_keys() {
        let mut h = Harness::new();
        h.tool(ToolKind::Rectangle);
        h.send(InputEvent::pointer_down(0.0, 0.0));
        h.send(InputEvent::pointer_up(10.0, 10.0));

        h.send(InputEvent::Key(KeyPress::new("z").with_ctrl()));
        assert!(h.store.state().annotations().is_empty());
        h.send(InputEvent::Key(KeyPress::new("Z").with_ctrl().with_shift()));
        assert_eq!(h.store.state().annotations().len(), 1);
        h.send(InputEvent::Key(KeyPress::new("z").with_ctrl()));
        h.send(InputEvent::Key(KeyPress::new("y").with_ctrl()));
        assert_eq!(h.store.state().annotations().len(), 1);
    }

    #[test]
    fn test_playback_keys() {
        let mut h = Harness::new();
        h.send(InputEvent::key(" "));
        assert!(!h.video.is_paused());
        h.send(InputEvent::key("ArrowRight"));
        assert_eq!(h.video.current_time(), SEEK_STEP_SECS);
        h.send(InputEvent::key("ArrowLeft"));
        h.send(InputEvent::key("ArrowLeft"));
        assert_eq!(h.video.current_time(), 0.0);
    }

    #[test]
    fn test_space_while_typing_does_not_toggle_playback() {
        let mut h = Harness::new();
        h.tool(ToolKind::Text);
        h.send(InputEvent::pointer_down(1.0, 1.0));
        h.send(InputEvent::key(" "));
        assert!(h.video.is_paused());
    }

    #[test]
    fn test_focus_loss_outside_text_keeps_gesture() {
        let mut h = Harness::new();
        h.tool(ToolKind::Line);
        h.send(InputEvent::pointer_down(0.0, 0.0));
        assert_eq!(h.send(InputEvent::FocusLost), None);
        assert!(h.controller.preview().is_some());
    }

    #[test]
    fn test_drag_target_removed_by_undo() {
        let mut h = Harness::new();
        h.store.dispatch(Action::AddAnnotation(rect_at(1, (0.0, 0.0), (20.0, 20.0))));
        h.send(InputEvent::pointer_down(5.0, 5.0));
        h.store.dispatch(Action::Undo);

        assert_eq!(h.send(InputEvent::pointer_move(9.0, 9.0)), None);
        assert!(h.controller.is_idle());
    }
}
