//! vidnote core library
//!
//! Platform-agnostic state and interaction engine for drawing time-bound
//! annotations over a video.

pub mod annotation;
pub mod config;
pub mod input;
pub mod interaction;
pub mod session;
pub mod shortcuts;
pub mod state;
pub mod storage;
pub mod tools;
pub mod video;
pub mod visibility;

pub use annotation::{
    Annotation, AnnotationId, AnnotationPatch, BoxGeometry, IdError, IdGenerator, LineGeometry, Shape,
    TextContent, DEFAULT_VIDEO_ID,
};
pub use config::SessionConfig;
pub use input::{InputEvent, KeyPress, Modifiers, MouseButton, PointerEvent};
pub use interaction::{Gesture, InteractionController, TextEntry};
pub use session::Session;
pub use shortcuts::{Command, Shortcut, ShortcutRegistry};
pub use state::{Action, AppState, Outcome, Rejection, Store};
pub use storage::{AnnotationBackend, BackendKind, StorageError, StorageResult};
pub use tools::{Draft, ToolKind};
pub use video::{PlaybackClock, VideoSurface};
pub use visibility::{hit_test, visible_at};
