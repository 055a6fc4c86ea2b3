use std::collections::HashMap;

use egui::{Painter, Pos2, Shape, Stroke, Vec2, pos2};
use serde::{Deserialize, Serialize};

use super::common::{INK_HIT_TOLERANCE, calculate_bounds, distance_to_line_segment};
use super::{ComponentAction, Frame, Variant};
use crate::canvas::Canvas;
use crate::error::PathParseError;
use crate::input::{TouchEvent, TouchPhase};

/// Freehand strokes. Completed paths are polylines in logical units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InkContent {
    #[serde(rename = "paths", with = "path_string")]
    completed: Vec<Vec<Pos2>>,
    #[serde(skip)]
    in_progress: HashMap<u64, Vec<Pos2>>,
}

impl InkContent {
    pub fn paths(&self) -> &[Vec<Pos2>] {
        &self.completed
    }

    /// Number of contacts currently drawing
    pub fn active_contacts(&self) -> usize {
        self.in_progress.len()
    }

    pub(crate) fn copy_paths(&mut self, source: &InkContent) {
        self.completed = source.completed.clone();
    }

    /// Fit the frame around every path, padded by half the stroke width
    fn calculate_extents(&self, frame: &mut Frame) {
        if !frame.session.is_initialized {
            return;
        }

        let points = self.in_progress.values().chain(self.completed.iter()).flatten();
        let Some(bounds) = calculate_bounds(points) else {
            return;
        };

        let half = (frame.stroke_width / 2.0).ceil();
        frame.x = bounds.min.x - half;
        frame.y = bounds.min.y - half;
        frame.width = bounds.width() + frame.stroke_width;
        frame.height = bounds.height() + frame.stroke_width;
    }

    fn paint_path(painter: &Painter, canvas: &Canvas, path: &[Pos2], stroke: Stroke) {
        match path {
            [] => {}
            [point] => {
                painter.circle_filled(canvas.to_screen(*point), stroke.width / 2.0, stroke.color);
            }
            _ => {
                let points = path.iter().map(|p| canvas.to_screen(*p)).collect();
                painter.add(Shape::line(points, stroke));
            }
        }
    }
}

impl Variant for InkContent {
    fn handle_touch(&mut self, event: &TouchEvent, frame: &mut Frame, canvas: &Canvas) -> Option<ComponentAction> {
        match event.phase {
            TouchPhase::Pressed => {
                if !self.in_progress.contains_key(&event.id) {
                    self.in_progress.insert(event.id, vec![canvas.convert_to_pixel(event.location)]);
                    frame.session.is_initialized = true;
                    canvas.invalidate();
                }
                None
            }
            TouchPhase::Moved => {
                if let Some(path) = self.in_progress.get_mut(&event.id) {
                    path.push(canvas.convert_to_pixel(event.location));
                    canvas.invalidate();
                }
                None
            }
            TouchPhase::Released => {
                let path = self.in_progress.remove(&event.id)?;
                self.completed.push(path);
                self.calculate_extents(frame);
                canvas.invalidate();
                Some(ComponentAction::Completed(canvas.convert_to_pixel(event.location)))
            }
            TouchPhase::Cancelled => {
                if self.in_progress.remove(&event.id).is_some() {
                    canvas.invalidate();
                }
                None
            }
        }
    }

    fn handle_translate(&mut self, delta: Vec2) {
        for point in self.completed.iter_mut().flatten() {
            *point += delta;
        }
    }

    fn handle_draw(&mut self, frame: &mut Frame, painter: &Painter, canvas: &Canvas) {
        let stroke = Stroke::new(frame.stroke_width * canvas.zoom(), frame.color);

        if frame.is_visible {
            for path in &self.completed {
                Self::paint_path(painter, canvas, path, stroke);
            }
        }

        for path in self.in_progress.values() {
            Self::paint_path(painter, canvas, path, stroke);
        }
    }

    fn contains(&self, _frame: &Frame, point: Pos2) -> Option<bool> {
        let hit = self.completed.iter().any(|path| match path.as_slice() {
            [single] => single.distance(point) <= INK_HIT_TOLERANCE,
            _ => path
                .windows(2)
                .any(|segment| distance_to_line_segment(point, segment[0], segment[1]) <= INK_HIT_TOLERANCE),
        });
        Some(hit)
    }
}

/// Encode paths compactly: paths separated by `;`, coordinates by `,`
pub fn encode_paths(paths: &[Vec<Pos2>]) -> String {
    paths
        .iter()
        .map(|path| {
            path.iter()
                .map(|p| format!("{},{}", p.x, p.y))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse the compact path encoding written by [`encode_paths`]
pub fn parse_paths(value: &str) -> Result<Vec<Vec<Pos2>>, PathParseError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(';')
        .enumerate()
        .map(|(index, path)| {
            let coordinates = path
                .split(',')
                .map(|raw| {
                    raw.trim().parse::<f32>().map_err(|_| PathParseError::InvalidNumber {
                        path: index,
                        value: raw.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if coordinates.len() % 2 != 0 {
                return Err(PathParseError::OddCoordinateCount {
                    path: index,
                    count: coordinates.len(),
                });
            }

            Ok(coordinates.chunks_exact(2).map(|pair| pos2(pair[0], pair[1])).collect())
        })
        .collect()
}

mod path_string {
    use egui::Pos2;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(paths: &[Vec<Pos2>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_paths(paths))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<Pos2>>, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_paths(&value).map_err(serde::de::Error::custom)
    }
}
