//! Tools and in-progress drawings.

use crate::annotation::{Annotation, AnnotationId, BoxGeometry, LineGeometry, Shape};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Circle,
    Rectangle,
    Line,
    Text,
}

impl ToolKind {
    /// All tools, in toolbar order.
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Select,
        ToolKind::Circle,
        ToolKind::Rectangle,
        ToolKind::Line,
        ToolKind::Text,
    ];

    /// Whether the tool draws a shape with a press-drag-release gesture.
    pub fn draws_shape(self) -> bool {
        matches!(self, ToolKind::Circle | ToolKind::Rectangle | ToolKind::Line)
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Circle => "circle",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Line => "line",
            ToolKind::Text => "text",
        }
    }
}

/// A shape being drawn, before it is committed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// Tool that started the drawing.
    pub tool: ToolKind,
    /// Where the pointer went down.
    pub origin: Point,
    /// Latest pointer position.
    pub current: Point,
    /// Visibility window captured when the drawing started.
    pub start: f64,
    pub end: f64,
    /// Color captured when the drawing started.
    pub color: String,
}

impl Draft {
    /// Start a drawing at `origin`. Returns `None` for tools that don't draw shapes.
    pub fn begin(tool: ToolKind, origin: Point, start: f64, duration: f64, color: String) -> Option<Self> {
        if !tool.draws_shape() {
            return None;
        }
        Some(Self {
            tool,
            origin,
            current: origin,
            start,
            end: start + duration,
            color,
        })
    }

    /// Track the pointer.
    pub fn update(&mut self, point: Point) {
        self.current = point;
    }

    /// Geometry spanned so far.
    pub fn shape(&self) -> Shape {
        match self.tool {
            ToolKind::Circle => Shape::Circle(BoxGeometry::from_corners(self.origin, self.current)),
            ToolKind::Line => Shape::Line(LineGeometry::new(self.origin, self.current)),
            _ => Shape::Rectangle(BoxGeometry::from_corners(self.origin, self.current)),
        }
    }

    /// Build the finished annotation. Zero-extent drawings are kept.
    pub fn finish(&self, id: AnnotationId, video_id: &str) -> Annotation {
        Annotation::new(id, self.color.clone(), self.start, self.end, self.shape())
            .with_video_id(video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_serde_names() {
        assert_eq!(serde_json::to_string(&ToolKind::Rectangle).unwrap(), "\"rectangle\"");
        let tool: ToolKind = serde_json::from_str("\"circle\"").unwrap();
        assert_eq!(tool, ToolKind::Circle);
        for tool in ToolKind::ALL {
            assert_eq!(serde_json::to_value(tool).unwrap(), tool.name());
        }
    }

    #[test]
    fn test_select_and_text_do_not_draft() {
        assert!(Draft::begin(ToolKind::Select, Point::ZERO, 0.0, 2.0, "#fff".into()).is_none());
        assert!(Draft::begin(ToolKind::Text, Point::ZERO, 0.0, 2.0, "#fff".into()).is_none());
    }

    #[test]
    fn test_draft_window_and_geometry() {
        let mut draft =
            Draft::begin(ToolKind::Rectangle, Point::new(10.0, 10.0), 4.0, 2.5, "#f00".into()).unwrap();
        draft.update(Point::new(50.0, 60.0));

        let annotation = draft.finish(AnnotationId::new(1.0), "clip");
        assert_eq!((annotation.start, annotation.end), (4.0, 6.5));
        assert_eq!(annotation.video_id, "clip");
        let Shape::Rectangle(g) = annotation.shape else { panic!("expected rectangle") };
        assert_eq!((g.width, g.height), (40.0, 50.0));
    }

    #[test]
    fn test_zero_extent_draft_is_kept() {
        let draft = Draft::begin(ToolKind::Line, Point::new(3.0, 3.0), 0.0, 1.0, "#fff".into()).unwrap();
        let annotation = draft.finish(AnnotationId::new(2.0), "default");
        assert_eq!(
            annotation.shape,
            Shape::Line(LineGeometry::new(Point::new(3.0, 3.0), Point::new(3.0, 3.0)))
        );
    }
}
