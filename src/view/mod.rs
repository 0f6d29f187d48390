//! Result-list side of the view: marker classes on list entries and the
//! scroll offset that brings a selection into view.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Picked,
    Highlighted,
}

impl Marker {
    pub fn class(self) -> &'static str {
        match self {
            Marker::Picked => "picked",
            Marker::Highlighted => "highlighted",
        }
    }
}

pub fn entry_id(alert_id: &str) -> String {
    format!("alert-{alert_id}")
}

/// Selector matching every list entry of the given alerts.
pub fn selector_for(alert_ids: &[String]) -> String {
    alert_ids.iter().map(|id| format!("#{}", entry_id(id))).join(",")
}

/// Marker classes currently applied to list entries, keyed by entry id.
#[derive(Clone, Debug, Default)]
pub struct ListView {
    markers: BTreeMap<String, BTreeSet<Marker>>,
}

impl ListView {
    pub fn add(&mut self, alert_ids: &[String], marker: Marker) {
        for id in alert_ids {
            self.markers.entry(entry_id(id)).or_default().insert(marker);
        }
    }

    pub fn remove(&mut self, alert_ids: &[String], marker: Marker) {
        for id in alert_ids {
            let key = entry_id(id);
            if let Some(set) = self.markers.get_mut(&key) {
                set.remove(&marker);
                if set.is_empty() {
                    self.markers.remove(&key);
                }
            }
        }
    }

    /// Removes `marker` from every entry.
    pub fn clear(&mut self, marker: Marker) {
        self.markers.retain(|_, set| {
            set.remove(&marker);
            !set.is_empty()
        });
    }

    pub fn has(&self, alert_id: &str, marker: Marker) -> bool {
        self.markers
            .get(&entry_id(alert_id))
            .is_some_and(|set| set.contains(&marker))
    }

    pub fn classes(&self, alert_id: &str) -> Vec<&'static str> {
        self.markers
            .get(&entry_id(alert_id))
            .map(|set| set.iter().map(|m| m.class()).collect())
            .unwrap_or_default()
    }

    pub fn entries_with(&self, marker: Marker) -> Vec<String> {
        self.markers
            .iter()
            .filter(|(_, set)| set.contains(&marker))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Layout box of one list entry, relative to its scroll container's content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryBox {
    pub top: f64,
    /// Height including margins.
    pub outer_height: f64,
}

/// An ancestor of the list entries, nearest first.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    pub overflow: String,
    pub overflow_y: String,
    pub scroll_top: f64,
    pub height: f64,
}

impl Container {
    pub fn scrollable(height: f64, scroll_top: f64) -> Self {
        Self {
            overflow: "visible".to_string(),
            overflow_y: "auto".to_string(),
            scroll_top,
            height,
        }
    }

    /// `overflow` or `overflow-y` is `auto` or `scroll`.
    pub fn scrolls(&self) -> bool {
        [&self.overflow, &self.overflow_y]
            .iter()
            .any(|v| v.contains("auto") || v.contains("scroll"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollTarget {
    /// Index into the ancestor list of the container to scroll.
    pub container: usize,
    pub scroll_top: f64,
}

fn union_box(entries: &[EntryBox]) -> Option<(f64, f64)> {
    let first = entries.first()?;
    let mut top = first.top;
    let mut height = first.outer_height;
    for e in &entries[1..] {
        if e.top < top {
            height += top - e.top;
            top = e.top;
        }
        if e.top + e.outer_height > top + height {
            height = e.top + e.outer_height - top;
        }
    }
    Some((top, height))
}

/// Scroll position that vertically centres `entries` in their nearest
/// scrollable ancestor, or keeps them at least `min_offset` below its top
/// when they do not fit.
pub fn scroll_to_center(
    entries: &[EntryBox],
    ancestors: &[Container],
    min_offset: Option<f64>,
) -> Option<ScrollTarget> {
    let (mut top, height) = union_box(entries)?;
    let container = ancestors.iter().position(Container::scrolls)?;
    let scroll = &ancestors[container];

    let mut offset = (scroll.height - height) / 2.0;
    if let Some(min) = min_offset.filter(|m| *m != 0.0) {
        if offset < min {
            offset = min;
        }
    }
    if offset > 0.0 {
        top -= offset;
    }
    Some(ScrollTarget {
        container,
        scroll_top: scroll.scroll_top + top,
    })
}
