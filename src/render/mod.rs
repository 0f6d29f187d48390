pub mod scheduler;

use std::time::Instant;

use serde::Serialize;
use tracing::trace;

use crate::model::{MapPoint, PointId};
use scheduler::{RedrawDecision, RedrawScheduler};

pub const MIN_RADIUS: f64 = 4.0;
pub const MAX_RADIUS: f64 = 15.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub stroke_color: &'static str,
    pub stroke_width: f64,
    pub radius: f64,
}

pub fn fill_color(point: &MapPoint) -> &'static str {
    match (point.picked, point.highlighted) {
        (true, true) => "#80FFFF",
        (true, false) => "aqua",
        (false, true) => "yellow",
        (false, false) => "steelblue",
    }
}

/// Marker radius: shrinks as the map gets busier, grows with cluster size.
pub fn radius(total_points: usize, cluster_size: usize) -> f64 {
    let base = (7.0 - (total_points.max(1) as f64).log10()).max(MIN_RADIUS);
    (base + (cluster_size.max(1) as f64).log10() * 2.0).min(MAX_RADIUS)
}

pub fn style_for(point: &MapPoint, total_points: usize) -> PointStyle {
    PointStyle {
        fill_color: fill_color(point),
        fill_opacity: if point.highlighted { 0.9 } else { 0.65 },
        stroke_color: "black",
        stroke_width: 1.0,
        radius: radius(total_points, point.ids.len()),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StyledPoint {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    pub ids: Vec<String>,
    pub title: String,
    pub style: PointStyle,
}

/// Styled points in ascending z-order.
pub fn build_frame(points: &[MapPoint]) -> Vec<StyledPoint> {
    let mut ordered: Vec<&MapPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.position);
    ordered
        .into_iter()
        .map(|p| StyledPoint {
            id: p.id,
            x: p.coordinates[0],
            y: p.coordinates[1],
            ids: p.ids.clone(),
            title: p.title(),
            style: style_for(p, points.len()),
        })
        .collect()
}

/// The host map widget.
pub trait MapWidget {
    fn set_data(&mut self, frame: Vec<StyledPoint>);
    fn draw(&mut self);
}

/// In-memory widget that keeps the last drawn frame.
#[derive(Clone, Debug, Default)]
pub struct FrameRecorder {
    staged: Vec<StyledPoint>,
    drawn: Vec<StyledPoint>,
    draws: usize,
}

impl FrameRecorder {
    pub fn last_frame(&self) -> &[StyledPoint] {
        &self.drawn
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }
}

impl MapWidget for FrameRecorder {
    fn set_data(&mut self, frame: Vec<StyledPoint>) {
        self.staged = frame;
    }

    fn draw(&mut self) {
        self.drawn = self.staged.clone();
        self.draws += 1;
        trace!(points = self.drawn.len(), draws = self.draws, "frame drawn");
    }
}

pub struct MapAdapter<W: MapWidget> {
    widget: W,
    scheduler: RedrawScheduler,
}

impl<W: MapWidget> MapAdapter<W> {
    pub fn new(widget: W) -> Self {
        Self {
            widget,
            scheduler: RedrawScheduler::default(),
        }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    /// Replaces the widget's data and draws unconditionally, as after a search.
    pub fn show(&mut self, points: &[MapPoint]) {
        self.widget.set_data(build_frame(points));
        self.widget.draw();
    }

    /// Restyles from the current state and draws, subject to coalescing.
    pub fn refresh(&mut self, points: &[MapPoint], now: Instant) -> RedrawDecision {
        self.widget.set_data(build_frame(points));
        let decision = self.scheduler.request(now);
        if decision == RedrawDecision::DrawNow {
            self.widget.draw();
        }
        decision
    }

    /// Fires a due trailing draw. Returns whether it drew.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.scheduler.poll(now) {
            self.widget.draw();
            return true;
        }
        false
    }

    /// Draws anything still queued, ignoring the window.
    pub fn flush(&mut self) {
        if let Some(at) = self.scheduler.next_deadline() {
            self.tick(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::Place;

    fn point(id: usize, ids: usize, position: usize) -> MapPoint {
        MapPoint {
            id: PointId(id),
            ids: (0..ids).map(|i| format!("a{i}")).collect(),
            coordinates: [id as f64, 0.0],
            position,
            picked: false,
            highlighted: false,
            place: Place::default(),
        }
    }

    #[test]
    fn colors_cover_every_pick_highlight_combination() {
        let mut p = point(0, 1, 0);
        assert_eq!(fill_color(&p), "steelblue");
        p.highlighted = true;
        assert_eq!(fill_color(&p), "yellow");
        p.picked = true;
        assert_eq!(fill_color(&p), "#80FFFF");
        p.highlighted = false;
        assert_eq!(fill_color(&p), "aqua");
        assert_eq!(style_for(&p, 1).fill_opacity, 0.65);
    }

    #[test]
    fn radius_is_clamped() {
        assert_eq!(radius(1, 1), 7.0);
        assert_eq!(radius(10_000_000, 1), MIN_RADIUS);
        assert_eq!(radius(1, 10_000_000), MAX_RADIUS);
        assert!((radius(100, 10) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn frame_is_sorted_by_position() {
        let frame = build_frame(&[point(0, 1, 2), point(1, 1, 0), point(2, 1, 1)]);
        let ids: Vec<_> = frame.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn adapter_coalesces_refreshes() {
        let points = vec![point(0, 1, 0)];
        let mut adapter = MapAdapter::new(FrameRecorder::default());
        let t0 = Instant::now();
        adapter.refresh(&points, t0);
        adapter.refresh(&points, t0 + Duration::from_millis(1));
        adapter.refresh(&points, t0 + Duration::from_millis(2));
        assert_eq!(adapter.widget().draw_count(), 1);
        assert!(adapter.tick(t0 + Duration::from_millis(101)));
        assert_eq!(adapter.widget().draw_count(), 2);
    }

    #[test]
    fn trailing_draw_uses_latest_data() {
        let mut points = vec![point(0, 1, 0)];
        let mut adapter = MapAdapter::new(FrameRecorder::default());
        let t0 = Instant::now();
        adapter.refresh(&points, t0);
        points[0].picked = true;
        adapter.refresh(&points, t0 + Duration::from_millis(5));
        assert_eq!(adapter.widget().last_frame()[0].style.fill_color, "steelblue");
        adapter.flush();
        assert_eq!(adapter.widget().last_frame()[0].style.fill_color, "aqua");
    }
}
