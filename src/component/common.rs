use egui::{Pos2, Rect, pos2};

/// Radius of the resize handle anchored on the bottom-right corner
pub const SCALE_HANDLE_RADIUS: f32 = 14.0;
/// Smallest width or height a resize gesture may produce
pub const MIN_SCALED_SIZE: f32 = 50.0;
/// How far from a stroke a point may be and still hit it
pub const INK_HIT_TOLERANCE: f32 = 5.0;
/// Margin kept between a freshly loaded image and the canvas edge
pub const IMAGE_PADDING: f32 = 10.0;

/// Calculate distance from a point to a line segment
pub(crate) fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Tight bounds of every point yielded, or `None` when there are no points
pub(crate) fn calculate_bounds<'a>(points: impl IntoIterator<Item = &'a Pos2>) -> Option<Rect> {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    let mut any = false;

    for point in points {
        any = true;
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    any.then(|| Rect::from_min_max(pos2(min_x, min_y), pos2(max_x, max_y)))
}
