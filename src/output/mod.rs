use std::ops::Range;

use serde::Serialize;
use serde_json::json;

use crate::model::Coordinates;
use crate::render::StyledPoint;
use crate::selection::{SelectionContext, ViewState};
use crate::view::{scroll_to_center, Container, EntryBox, Marker};

const SUMMARY_WIDTH: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    GeoJson,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "geojson" | "geo" => Some(Self::GeoJson),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".geojson") {
        return Some(OutputFormat::GeoJson);
    }
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub id: String,
    pub date: String,
    pub summary: String,
    pub link: String,
    pub country: Option<String>,
    pub disease: Option<String>,
    pub species: Option<String>,
    pub num_points: usize,
    pub coordinates: Vec<Coordinates>,
    pub markers: Vec<&'static str>,
}

pub fn build_records(state: &ViewState) -> Vec<OutputRecord> {
    state
        .records()
        .iter()
        .map(|r| {
            let props = &r.feature.properties;
            OutputRecord {
                id: r.id().to_string(),
                date: r.date().to_string(),
                summary: r.summary().to_string(),
                link: r.link.clone(),
                country: props.country.clone(),
                disease: props.disease.clone(),
                species: props.species.clone(),
                num_points: r.num_points,
                coordinates: r
                    .points
                    .iter()
                    .filter_map(|id| state.point(*id).map(|p| p.coordinates))
                    .collect(),
                markers: state.list().classes(r.id()),
            }
        })
        .collect()
}

/// Rows of the result list to show so the picked entries sit in the middle.
pub fn list_window(state: &ViewState, rows: usize) -> Range<usize> {
    let total = state.records().len();
    if rows == 0 || total <= rows {
        return 0..total;
    }
    let entries: Vec<EntryBox> = state
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| state.list().has(r.id(), Marker::Picked))
        .map(|(i, _)| EntryBox {
            top: i as f64,
            outer_height: 1.0,
        })
        .collect();
    let start = scroll_to_center(&entries, &[Container::scrollable(rows as f64, 0.0)], Some(1.0))
        .map(|t| t.scroll_top.max(0.0) as usize)
        .unwrap_or(0)
        .min(total - rows);
    start..start + rows
}

fn marker_glyph(markers: &[&'static str]) -> char {
    if markers.contains(&Marker::Picked.class()) {
        '*'
    } else if markers.contains(&Marker::Highlighted.class()) {
        '~'
    } else {
        ' '
    }
}

fn selection_line(sel: &SelectionContext) -> String {
    let kind = if sel.location { "location" } else { "alert" };
    match sel.title.as_deref() {
        Some(title) if title != sel.description => {
            format!("{kind}: {} | {} ({} results)", sel.description, title, sel.count)
        }
        _ => format!("{kind}: {} ({} results)", sel.description, sel.count),
    }
}

pub fn render_text(state: &ViewState, window: Range<usize>) -> Vec<u8> {
    let records = build_records(state);
    let mut out = String::new();
    if let Some(sel) = state.selection() {
        out.push_str(&selection_line(sel));
        out.push('\n');
    }
    if window.start > 0 {
        out.push_str(&format!("  ... {} above\n", window.start));
    }
    for r in records.iter().take(window.end).skip(window.start) {
        let date: String = r.date.chars().take(10).collect();
        out.push_str(&format!(
            "{} {} [{}] {} ({} location{})\n",
            marker_glyph(&r.markers),
            date,
            r.id,
            crate::utils::truncate_chars(&r.summary, SUMMARY_WIDTH),
            r.num_points,
            if r.num_points == 1 { "" } else { "s" }
        ));
    }
    if window.end < records.len() {
        out.push_str(&format!("  ... {} below\n", records.len() - window.end));
    }
    out.into_bytes()
}

pub fn render_json(state: &ViewState) -> Vec<u8> {
    let body = json!({
        "results": build_records(state),
        "selection": state.selection(),
        "points": state.points().len(),
    });
    serde_json::to_vec_pretty(&body).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_geojson(frame: &[StyledPoint]) -> Vec<u8> {
    let features: Vec<serde_json::Value> = frame
        .iter()
        .map(|p| {
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [p.x, p.y]},
                "properties": {
                    "ids": p.ids,
                    "title": p.title,
                    "fillColor": p.style.fill_color,
                    "fillOpacity": p.style.fill_opacity,
                    "strokeColor": p.style.stroke_color,
                    "strokeWidth": p.style.stroke_width,
                    "radius": p.style.radius,
                },
            })
        })
        .collect();
    let body = json!({"type": "FeatureCollection", "features": features});
    serde_json::to_vec_pretty(&body).unwrap_or_else(|_| b"{}\n".to_vec())
}
