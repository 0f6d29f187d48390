use serde::Serialize;

use crate::camera::MapViewport;
use crate::model::{AlertRecord, MapPoint};

/// Alerts listed in a tooltip before the remainder is summarised.
pub const MAX_LISTED: usize = 3;
const ANCHOR_GAP: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
    Left(f64),
    Right(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Top(f64),
    Bottom(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TooltipAlert {
    pub id: Option<String>,
    pub date: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tooltip {
    pub horizontal: Horizontal,
    pub vertical: Vertical,
    pub title: String,
    pub alerts: Vec<TooltipAlert>,
}

impl Tooltip {
    /// CSS declaration placing the tooltip inside the map element.
    pub fn style(&self) -> String {
        let h = match self.horizontal {
            Horizontal::Left(px) => format!("left: {px}px"),
            Horizontal::Right(px) => format!("right: {px}px"),
        };
        let v = match self.vertical {
            Vertical::Top(px) => format!("top: {px}px"),
            Vertical::Bottom(px) => format!("bottom: {px}px"),
        };
        format!("{h}; {v}")
    }
}

/// Anchors away from the nearest edges so the tooltip never leaves the map.
pub fn anchor(x: f64, y: f64, width: f64, height: f64) -> (Horizontal, Vertical) {
    let horizontal = if x > width / 2.0 {
        Horizontal::Right(width - x + ANCHOR_GAP)
    } else {
        Horizontal::Left(x + ANCHOR_GAP)
    };
    let vertical = if y > height / 2.0 {
        Vertical::Bottom(height - y + ANCHOR_GAP)
    } else {
        Vertical::Top(y + ANCHOR_GAP)
    };
    (horizontal, vertical)
}

pub fn build<'a>(
    point: &MapPoint,
    lookup: impl Fn(&str) -> Option<&'a AlertRecord>,
    viewport: &dyn MapViewport,
) -> Tooltip {
    let (x, y) = viewport.gcs_to_display(point.coordinates);
    let (width, height) = viewport.size();
    let (horizontal, vertical) = anchor(x, y, width, height);

    let mut alerts: Vec<TooltipAlert> = point
        .ids
        .iter()
        .take(MAX_LISTED)
        .map(|id| {
            let record = lookup(id);
            TooltipAlert {
                id: Some(id.clone()),
                date: record.map(|r| r.date().chars().take(10).collect()),
                description: record.map(|r| r.summary().to_string()).unwrap_or_default(),
            }
        })
        .collect();
    if point.ids.len() > MAX_LISTED {
        alerts.push(TooltipAlert {
            id: None,
            date: None,
            description: format!("and {} more ...", point.ids.len() - MAX_LISTED),
        });
    }

    Tooltip {
        horizontal,
        vertical,
        title: point.title(),
        alerts,
    }
}
