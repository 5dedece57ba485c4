//! Time-windowed visibility.

use crate::annotation::Annotation;
use kurbo::Point;

/// Extra pixels around a shape that still count as a hit.
pub const HIT_TOLERANCE: f64 = 6.0;

/// Annotations whose window `[start, end]` contains `t`, in list order.
pub fn visible_at(annotations: &[Annotation], t: f64) -> impl Iterator<Item = &Annotation> {
    annotations.iter().filter(move |a| a.is_visible_at(t))
}

/// Front-most annotation visible at `t` under `point`.
///
/// Later annotations are drawn on top, so the list is searched back to front.
pub fn hit_test(annotations: &[Annotation], t: f64, point: Point) -> Option<&Annotation> {
    annotations
        .iter()
        .rev()
        .filter(|a| a.is_visible_at(t))
        .find(|a| a.shape.hit_test(point, HIT_TOLERANCE))
}
