//! Annotation records.
//!
//! An annotation is a common header (id, color, visibility window, owning
//! video, timestamps) plus a geometry payload selected by the `tool` tag.
//! The JSON form is flat and camelCase, matching the remote service.

use chrono::{SecondsFormat, Utc};
use kurbo::{Point, Rect, Vec2};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Video id used when a record does not name one.
pub const DEFAULT_VIDEO_ID: &str = "default";

/// Approximate advance of one glyph of annotation text, in pixels.
pub const TEXT_CHAR_WIDTH: f64 = 9.0;
/// Height of a rendered text annotation, in pixels.
pub const TEXT_LINE_HEIGHT: f64 = 24.0;
/// Horizontal padding around rendered text, in pixels.
const TEXT_PADDING: f64 = 6.0;

/// Largest integer a JSON number carries without rounding in every client.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Errors from parsing or generating annotation ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid annotation id: {0:?}")]
    Invalid(String),
    #[error("annotation ids exhausted")]
    Exhausted,
}

/// Unique annotation identifier.
///
/// Ids are JSON numbers and may have a fractional part. Equality, ordering
/// and hashing go by value bits, with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationId(f64);

impl AnnotationId {
    pub fn new(value: f64) -> Self {
        // Folds -0.0 so it equals 0.0.
        Self(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for AnnotationId {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for AnnotationId {}

impl Hash for AnnotationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for AnnotationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AnnotationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the numeric form of an id, so `"5"`, `"5.0"` and `" 5 "` all
/// name the same record.
impl FromStr for AnnotationId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self::new(value)),
            _ => Err(IdError::Invalid(s.to_string())),
        }
    }
}

impl Serialize for AnnotationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for AnnotationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(D::Error::custom("annotation id must be a finite number"));
        }
        Ok(Self::new(value))
    }
}

/// Geometry of a rectangle or circle.
///
/// `start` is where the pointer went down, `end` where it was released.
/// Mirroring is kept in `scale_x`/`scale_y` (±1) instead of swapping
/// coordinates, so `width`/`height` are always non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxGeometry {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "unit_scale")]
    pub scale_x: f64,
    #[serde(default = "unit_scale")]
    pub scale_y: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl BoxGeometry {
    /// Build the geometry spanned by two pointer positions.
    pub fn from_corners(start: Point, end: Point) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
            width: (end.x - start.x).abs(),
            height: (end.y - start.y).abs(),
            scale_x: if end.x < start.x { -1.0 } else { 1.0 },
            scale_y: if end.y < start.y { -1.0 } else { 1.0 },
        }
    }

    /// Recompute size and mirroring from the corners.
    pub fn normalize(&mut self) {
        *self = Self::from_corners(
            Point::new(self.start_x, self.start_y),
            Point::new(self.end_x, self.end_y),
        );
    }

    /// Axis-aligned bounds.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.start_x, self.start_y, self.end_x, self.end_y).abs()
    }

    /// Move both corners by `delta`; size and mirroring are unchanged.
    pub fn translate(&mut self, delta: Vec2) {
        self.start_x += delta.x;
        self.start_y += delta.y;
        self.end_x += delta.x;
        self.end_y += delta.y;
    }
}

/// Geometry of a straight line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineGeometry {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl LineGeometry {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_x, self.end_y)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.start_x += delta.x;
        self.start_y += delta.y;
        self.end_x += delta.x;
        self.end_y += delta.y;
    }

    /// Distance from `point` to the segment.
    pub fn distance_to(&self, point: Point) -> f64 {
        let line_vec = self.end() - self.start();
        let point_vec = point - self.start();

        let line_len_sq = line_vec.hypot2();
        if line_len_sq < f64::EPSILON {
            return point_vec.hypot();
        }

        let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
        let projection = self.start() + line_vec * t;
        (point - projection).hypot()
    }
}

/// A text label anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

impl TextContent {
    /// Estimated on-screen box of the label.
    pub fn bounds(&self) -> Rect {
        let width = self.text.chars().count() as f64 * TEXT_CHAR_WIDTH + 2.0 * TEXT_PADDING;
        Rect::new(self.x, self.y, self.x + width, self.y + TEXT_LINE_HEIGHT)
    }
}

/// Geometry payload, tagged by the tool that drew it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum Shape {
    Rectangle(BoxGeometry),
    Circle(BoxGeometry),
    Line(LineGeometry),
    Text(TextContent),
}

impl Shape {
    /// Name of the tool, as written in the `tool` field.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Shape::Rectangle(_) => "rectangle",
            Shape::Circle(_) => "circle",
            Shape::Line(_) => "line",
            Shape::Text(_) => "text",
        }
    }

    /// Drag origin: top-left of the box for shapes, the anchor for text.
    pub fn origin(&self) -> Point {
        match self {
            Shape::Rectangle(g) | Shape::Circle(g) => {
                Point::new(g.start_x.min(g.end_x), g.start_y.min(g.end_y))
            }
            Shape::Line(l) => Point::new(l.start_x.min(l.end_x), l.start_y.min(l.end_y)),
            Shape::Text(t) => Point::new(t.x, t.y),
        }
    }

    /// Check whether `point` lands on the shape.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Rectangle(g) | Shape::Circle(g) => {
                g.bounds().inflate(tolerance, tolerance).contains(point)
            }
            Shape::Line(l) => l.distance_to(point) <= tolerance,
            Shape::Text(t) => t.bounds().inflate(tolerance, tolerance).contains(point),
        }
    }
}

/// A time-bound overlay on a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(default)]
    pub color: String,
    /// First second of the visibility window.
    pub start: f64,
    /// Last second of the visibility window (inclusive).
    pub end: f64,
    #[serde(default = "default_video_id")]
    pub video_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(flatten)]
    pub shape: Shape,
}

fn default_video_id() -> String {
    DEFAULT_VIDEO_ID.to_string()
}

impl Annotation {
    /// Create an annotation stamped with the current time.
    pub fn new(id: AnnotationId, color: impl Into<String>, start: f64, end: f64, shape: Shape) -> Self {
        let now = now_iso8601();
        Self {
            id,
            color: color.into(),
            start,
            end,
            video_id: default_video_id(),
            created_at: now.clone(),
            updated_at: now,
            shape,
        }
    }

    /// Set the owning video.
    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = video_id.into();
        self
    }

    /// Whether the closed window `[start, end]` contains `t`.
    pub fn is_visible_at(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn has_valid_window(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start <= self.end
    }

    pub fn tool_name(&self) -> &'static str {
        self.shape.tool_name()
    }
}

/// Partial update merged into an existing annotation.
///
/// Fields that do not exist on the target's variant are ignored, so a
/// `text` patch on a rectangle is a no-op for that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl AnnotationPatch {
    /// Patch that moves a text label's anchor.
    pub fn text_position(position: Point) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            ..Self::default()
        }
    }

    /// Patch that sets both endpoints of a shape.
    pub fn endpoints(start: Point, end: Point) -> Self {
        Self {
            start_x: Some(start.x),
            start_y: Some(start.y),
            end_x: Some(end.x),
            end_y: Some(end.y),
            ..Self::default()
        }
    }

    pub fn stamped(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }

    /// Return a copy of `annotation` with this patch merged in.
    pub fn apply_to(&self, annotation: &Annotation) -> Annotation {
        let mut out = annotation.clone();
        if let Some(color) = &self.color {
            out.color = color.clone();
        }
        if let Some(start) = self.start {
            out.start = start;
        }
        if let Some(end) = self.end {
            out.end = end;
        }
        if let Some(updated_at) = &self.updated_at {
            out.updated_at = updated_at.clone();
        }

        match &mut out.shape {
            Shape::Rectangle(g) | Shape::Circle(g) => {
                g.start_x = self.start_x.unwrap_or(g.start_x);
                g.start_y = self.start_y.unwrap_or(g.start_y);
                g.end_x = self.end_x.unwrap_or(g.end_x);
                g.end_y = self.end_y.unwrap_or(g.end_y);
                g.normalize();
            }
            Shape::Line(l) => {
                l.start_x = self.start_x.unwrap_or(l.start_x);
                l.start_y = self.start_y.unwrap_or(l.start_y);
                l.end_x = self.end_x.unwrap_or(l.end_x);
                l.end_y = self.end_y.unwrap_or(l.end_y);
            }
            Shape::Text(t) => {
                t.x = self.x.unwrap_or(t.x);
                t.y = self.y.unwrap_or(t.y);
                if let Some(text) = &self.text {
                    t.text = text.clone();
                }
            }
        }
        out
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generates annotation ids from wall-clock milliseconds.
///
/// Ids are strictly increasing per generator, even if the clock stalls or
/// steps back, and always greater than every observed id.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: f64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, never equal to any previously returned or observed id.
    ///
    /// Fails only once an id at the top of the `f64` range has been seen.
    pub fn next_id(&mut self) -> Result<AnnotationId, IdError> {
        let now = Utc::now().timestamp_millis() as f64;
        let mut next = now.max(self.last.floor() + 1.0);
        // Past 2^53 adding one no longer moves the value.
        if next <= self.last {
            next = self.last.next_up();
        }
        if !next.is_finite() {
            return Err(IdError::Exhausted);
        }
        self.last = next;
        Ok(AnnotationId::new(next))
    }

    /// Make sure future ids are greater than `id`.
    pub fn observe_id(&mut self, id: AnnotationId) {
        if id.0.is_finite() {
            self.last = self.last.max(id.0);
        }
    }

    /// Make sure future ids are greater than every id in `annotations`.
    pub fn observe<'a>(&mut self, annotations: impl IntoIterator<Item = &'a Annotation>) {
        for annotation in annotations {
            self.observe_id(annotation.id);
        }
    }
}
