//! Camera framing for list selections.
//!
//! The map widget itself is external; [`MapViewport`] is the slice of it the
//! framing logic needs: viewport size, current zoom, and conversions between
//! geographic (`gcs`) and display pixel coordinates.

use std::f64::consts::PI;
use std::time::Duration;

use serde::Serialize;

use crate::model::Coordinates;

pub const SINGLE_POINT_ZOOM: f64 = 5.0;
pub const MAX_ZOOM: f64 = 6.0;
pub const FILL_HIGH: f64 = 0.9;
pub const FILL_LOW: f64 = 0.45;
pub const TRANSITION_DURATION: Duration = Duration::from_millis(1000);

const TILE_SIZE: f64 = 256.0;

pub trait MapViewport {
    /// Display size in pixels, `(width, height)`.
    fn size(&self) -> (f64, f64);
    fn zoom(&self) -> f64;
    fn gcs_to_display(&self, gcs: Coordinates) -> (f64, f64);
    fn display_to_gcs(&self, x: f64, y: f64) -> Coordinates;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CameraTransition {
    pub center: Coordinates,
    pub zoom: f64,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Result of the zoom search, kept separate so the loop is observable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomFit {
    pub zoom: f64,
    pub fill: f64,
    pub halvings: u32,
    pub doublings: u32,
}

/// Adjusts `zoom` by whole steps until `fill` lands in `[0.45, 0.9]`, never
/// exceeding `max_zoom`.
pub fn fit_zoom(mut fill: f64, mut zoom: f64, max_zoom: f64) -> ZoomFit {
    let mut halvings = 0;
    let mut doublings = 0;
    while fill > FILL_HIGH {
        zoom -= 1.0;
        fill /= 2.0;
        halvings += 1;
    }
    while fill < FILL_LOW && zoom < max_zoom {
        zoom += 1.0;
        fill *= 2.0;
        doublings += 1;
    }
    ZoomFit {
        zoom: zoom.min(max_zoom),
        fill,
        halvings,
        doublings,
    }
}

/// `[min_x, min_y, max_x, max_y]`. Does not handle boxes wrapping the
/// antimeridian.
pub fn bounding_box(points: &[Coordinates]) -> Option<[f64; 4]> {
    let first = points.first()?;
    let mut extents = [first[0], first[1], first[0], first[1]];
    for c in &points[1..] {
        extents[0] = extents[0].min(c[0]);
        extents[1] = extents[1].min(c[1]);
        extents[2] = extents[2].max(c[0]);
        extents[3] = extents[3].max(c[1]);
    }
    Some(extents)
}

/// Camera move that frames every location of a selected alert.
pub fn frame_points(points: &[Coordinates], viewport: &dyn MapViewport) -> Option<CameraTransition> {
    let first = *points.first()?;
    if points.len() == 1 {
        return Some(CameraTransition {
            center: first,
            zoom: SINGLE_POINT_ZOOM,
            duration: TRANSITION_DURATION,
        });
    }
    let extents = bounding_box(points)?;
    let center = [
        (extents[0] + extents[2]) * 0.5,
        (extents[1] + extents[3]) * 0.5,
    ];
    let (width, height) = viewport.size();
    let upper_left = viewport.display_to_gcs(0.0, 0.0);
    let lower_right = viewport.display_to_gcs(width, height);
    let fill_x = (extents[2] - extents[0]) / (lower_right[0] - upper_left[0]);
    let fill_y = (extents[3] - extents[1]) / (upper_left[1] - lower_right[1]);
    let fill = fill_x.max(fill_y);
    let fit = fit_zoom(fill, viewport.zoom(), MAX_ZOOM);
    Some(CameraTransition {
        center,
        zoom: fit.zoom,
        duration: TRANSITION_DURATION,
    })
}

/// Web-Mercator viewport with 256px tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct MercatorViewport {
    pub center: Coordinates,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl MercatorViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 1.0,
            width,
            height,
        }
    }

    pub fn apply(&mut self, transition: &CameraTransition) {
        self.center = transition.center;
        self.zoom = transition.zoom;
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    fn project(&self, gcs: Coordinates) -> (f64, f64) {
        let lat = gcs[1].clamp(-85.051_128_78, 85.051_128_78).to_radians();
        let world = self.world_size();
        let x = (gcs[0] + 180.0) / 360.0 * world;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
        (x, y)
    }

    fn unproject(&self, x: f64, y: f64) -> Coordinates {
        let world = self.world_size();
        let lon = x / world * 360.0 - 180.0;
        let n = PI - 2.0 * PI * y / world;
        let lat = n.sinh().atan().to_degrees();
        [lon, lat]
    }
}

impl MapViewport for MercatorViewport {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn gcs_to_display(&self, gcs: Coordinates) -> (f64, f64) {
        let (cx, cy) = self.project(self.center);
        let (x, y) = self.project(gcs);
        (x - cx + self.width / 2.0, y - cy + self.height / 2.0)
    }

    fn display_to_gcs(&self, x: f64, y: f64) -> Coordinates {
        let (cx, cy) = self.project(self.center);
        self.unproject(x - self.width / 2.0 + cx, y - self.height / 2.0 + cy)
    }
}
