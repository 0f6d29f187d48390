//! Pick and highlight state shared by the map and the result list.
//!
//! Every transition mutates [`ViewState`] synchronously and returns the
//! [`Effects`] the host must carry out: a redraw, a camera move, or scrolling
//! the list to the picked entries.

pub mod tooltip;

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::camera::{self, CameraTransition, MapViewport};
use crate::fetcher::SearchGeneration;
use crate::model::{AlertRecord, MapPoint, PointId};
use crate::view::{ListView, Marker};
use tooltip::Tooltip;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LastPicked {
    Point(PointId),
    /// Index into the record list; every point of the record is picked.
    Record(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionContext {
    pub title: Option<String>,
    pub description: String,
    pub count: usize,
    /// True when a map location was picked rather than an alert.
    pub location: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Effects {
    pub redraw: bool,
    pub tooltip_changed: bool,
    /// Alert ids whose list entries should be scrolled into view.
    pub scroll_to: Vec<String>,
    pub camera: Option<CameraTransition>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverAction {
    Add,
    Clear,
    ClearAll,
}

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    generation: u64,
    records: Vec<AlertRecord>,
    record_index: HashMap<String, usize>,
    points: Vec<MapPoint>,
    order: Vec<PointId>,
    hover: Vec<PointId>,
    last_picked: Option<LastPicked>,
    selection: Option<SelectionContext>,
    tooltip: Option<Tooltip>,
    list: ListView,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything with a fresh search result. Results from a search
    /// that has since been superseded are dropped and `false` is returned.
    pub fn load(
        &mut self,
        generations: &SearchGeneration,
        generation: u64,
        records: Vec<AlertRecord>,
        points: Vec<MapPoint>,
    ) -> bool {
        if !generations.is_current(generation) {
            warn!(
                generation,
                current = generations.current(),
                "discarding results from a superseded search"
            );
            return false;
        }
        let mut record_index = HashMap::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            record_index.entry(r.id().to_string()).or_insert(i);
        }
        *self = Self {
            generation,
            order: points.iter().map(|p| p.id).collect(),
            records,
            record_index,
            points,
            ..Self::default()
        };
        debug!(
            generation,
            records = self.records.len(),
            points = self.points.len(),
            "view state loaded"
        );
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn point(&self, id: PointId) -> Option<&MapPoint> {
        self.points.get(id.0)
    }

    pub fn record(&self, index: usize) -> Option<&AlertRecord> {
        self.records.get(index)
    }

    pub fn record_index(&self, alert_id: &str) -> Option<usize> {
        self.record_index.get(alert_id).copied()
    }

    pub fn record_by_id(&self, alert_id: &str) -> Option<&AlertRecord> {
        self.record_index(alert_id).and_then(|i| self.records.get(i))
    }

    /// Point at exactly these coordinates, if any.
    pub fn point_at(&self, coordinates: [f64; 2]) -> Option<PointId> {
        self.points
            .iter()
            .find(|p| p.coordinates == coordinates)
            .map(|p| p.id)
    }

    /// Point ids bottom to top.
    pub fn render_order(&self) -> &[PointId] {
        &self.order
    }

    pub fn hover_candidates(&self) -> &[PointId] {
        &self.hover
    }

    pub fn highlighted(&self) -> Vec<PointId> {
        self.points
            .iter()
            .filter(|p| p.highlighted)
            .map(|p| p.id)
            .collect()
    }

    pub fn picked(&self) -> Vec<PointId> {
        self.points.iter().filter(|p| p.picked).map(|p| p.id).collect()
    }

    pub fn last_picked(&self) -> Option<LastPicked> {
        self.last_picked
    }

    pub fn selection(&self) -> Option<&SelectionContext> {
        self.selection.as_ref()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    fn point_mut(&mut self, id: PointId) -> Option<&mut MapPoint> {
        self.points.get_mut(id.0)
    }

    /// Maintains the hover candidate set and the single topmost highlight.
    pub fn highlight_point(
        &mut self,
        action: HoverAction,
        point: Option<PointId>,
        viewport: &dyn MapViewport,
    ) -> Effects {
        let mut update = false;
        let mut recheck = false;
        let mut tooltip_target: Option<PointId> = None;

        match (action, point) {
            (HoverAction::Add, Some(id)) => {
                if self.hover.contains(&id) || self.point(id).is_none() {
                    return Effects::default();
                }
                self.hover.push(id);
                recheck = true;
            }
            (HoverAction::Clear, Some(id)) => {
                if let Some(idx) = self.hover.iter().position(|h| *h == id) {
                    if let Some(p) = self.point_mut(id) {
                        if p.highlighted {
                            p.highlighted = false;
                            update = true;
                        }
                    }
                    self.hover.remove(idx);
                    recheck = true;
                }
            }
            (HoverAction::ClearAll, _) => {
                for id in std::mem::take(&mut self.hover) {
                    if let Some(p) = self.point_mut(id) {
                        if p.highlighted {
                            p.highlighted = false;
                            update = true;
                        }
                    }
                }
            }
            _ => return Effects::default(),
        }

        if recheck {
            let (changed, target) = self.recheck_topmost();
            update |= changed;
            tooltip_target = target;
        }
        self.hover_effects(update, tooltip_target, viewport)
    }

    /// Highlights the candidate with the highest `position` and clears the
    /// rest. Returns whether any flag changed and the newly highlighted point.
    fn recheck_topmost(&mut self) -> (bool, Option<PointId>) {
        let topmost = self
            .hover
            .iter()
            .copied()
            .fold(None::<(PointId, usize)>, |best, id| {
                let pos = self.points[id.0].position;
                match best {
                    Some((_, top)) if pos <= top => best,
                    _ => Some((id, pos)),
                }
            })
            .map(|(id, _)| id);
        let mut changed = false;
        let mut target = None;
        for id in self.hover.clone() {
            let p = &mut self.points[id.0];
            if Some(id) == topmost && !p.highlighted {
                p.highlighted = true;
                target = Some(id);
                changed = true;
            } else if Some(id) != topmost && p.highlighted {
                p.highlighted = false;
                changed = true;
            }
        }
        (changed, target)
    }

    fn hover_effects(
        &mut self,
        update: bool,
        tooltip_target: Option<PointId>,
        viewport: &dyn MapViewport,
    ) -> Effects {
        let mut effects = Effects::default();
        if update {
            effects.redraw = true;
            match tooltip_target {
                Some(id) => {
                    let point = &self.points[id.0];
                    let tt = tooltip::build(point, |aid| self.record_by_id(aid), viewport);
                    self.tooltip = Some(tt);
                    effects.tooltip_changed = true;
                }
                None => {
                    if self.tooltip.take().is_some() {
                        effects.tooltip_changed = true;
                    }
                }
            }
        }
        effects
    }

    /// Reorders and keeps the hover highlight on the topmost candidate.
    fn reorder_and_recheck(&mut self, viewport: &dyn MapViewport) -> bool {
        self.reorder();
        if self.hover.is_empty() {
            return false;
        }
        let (changed, target) = self.recheck_topmost();
        self.hover_effects(changed, target, viewport).tooltip_changed
    }

    /// Pointer entered a map point.
    pub fn hover_add(&mut self, id: PointId, viewport: &dyn MapViewport) -> Effects {
        if let Some(ids) = self.point(id).map(|p| p.ids.clone()) {
            self.list.add(&ids, Marker::Highlighted);
        }
        self.highlight_point(HoverAction::Add, Some(id), viewport)
    }

    /// Pointer left a map point.
    pub fn hover_remove(&mut self, id: PointId, viewport: &dyn MapViewport) -> Effects {
        if let Some(ids) = self.point(id).map(|p| p.ids.clone()) {
            self.list.remove(&ids, Marker::Highlighted);
        }
        self.highlight_point(HoverAction::Clear, Some(id), viewport)
    }

    pub fn hover_clear_all(&mut self, viewport: &dyn MapViewport) -> Effects {
        self.highlight_point(HoverAction::ClearAll, None, viewport)
    }

    /// Clears the previous pick, whether a single point or a whole alert.
    pub fn unpick(&mut self) {
        match self.last_picked.take() {
            Some(LastPicked::Record(index)) => {
                let ids = self
                    .records
                    .get(index)
                    .map(|r| r.points.clone())
                    .unwrap_or_default();
                for id in ids {
                    if let Some(p) = self.point_mut(id) {
                        p.picked = false;
                    }
                }
            }
            Some(LastPicked::Point(id)) => {
                if let Some(p) = self.point_mut(id) {
                    p.picked = false;
                }
            }
            None => {}
        }
    }

    /// Unpicked points first, then picked ones, each in current render order.
    pub fn reorder(&mut self) {
        let (mut order, picked): (Vec<PointId>, Vec<PointId>) = self
            .order
            .iter()
            .copied()
            .partition(|id| !self.points[id.0].picked);
        order.extend(picked);
        for (position, id) in order.iter().enumerate() {
            self.points[id.0].position = position;
        }
        self.order = order;
    }

    /// Map click. Only the topmost feature under the pointer (`z_index == 0`)
    /// is handled.
    pub fn click(&mut self, id: PointId, z_index: usize, viewport: &dyn MapViewport) -> Effects {
        if z_index != 0 {
            return Effects::default();
        }
        let Some(point) = self.point(id) else {
            return Effects::default();
        };
        let ids = point.ids.clone();
        let selection = SelectionContext {
            title: point.place.name().map(str::to_string),
            description: point.title(),
            count: ids.len(),
            location: true,
        };

        self.list.clear(Marker::Picked);
        self.list.add(&ids, Marker::Picked);
        self.unpick();
        self.last_picked = Some(LastPicked::Point(id));
        if let Some(p) = self.point_mut(id) {
            p.picked = true;
        }
        self.selection = Some(selection);
        let tooltip_changed = self.reorder_and_recheck(viewport);
        debug!(point = id.0, alerts = ids.len(), "point picked");

        Effects {
            redraw: true,
            tooltip_changed,
            scroll_to: ids,
            ..Effects::default()
        }
    }

    /// Alert chosen from the list: pick all of its points and frame them.
    pub fn select_record(&mut self, index: usize, viewport: &dyn MapViewport) -> Effects {
        let Some(record) = self.records.get(index) else {
            return Effects::default();
        };
        let alert_id = record.id().to_string();
        let point_ids = record.points.clone();
        let selection = SelectionContext {
            title: Some(record.headline()),
            description: format!("Alert {alert_id}"),
            count: point_ids.len(),
            location: false,
        };

        self.list.clear(Marker::Picked);
        self.list.add(&[alert_id.clone()], Marker::Picked);
        self.unpick();
        for id in &point_ids {
            if let Some(p) = self.point_mut(*id) {
                p.picked = true;
            }
        }
        self.selection = Some(selection);
        self.last_picked = Some(LastPicked::Record(index));
        let tooltip_changed = self.reorder_and_recheck(viewport);

        let coordinates: Vec<[f64; 2]> = point_ids
            .iter()
            .filter_map(|id| self.point(*id).map(|p| p.coordinates))
            .collect();
        let camera = camera::frame_points(&coordinates, viewport);
        debug!(alert = %alert_id, points = point_ids.len(), "alert selected");

        Effects {
            redraw: true,
            tooltip_changed,
            camera,
            ..Effects::default()
        }
    }

    /// List entry hovered: light up every location of the alert.
    pub fn highlight_record(&mut self, index: usize, viewport: &dyn MapViewport) -> Effects {
        self.set_record_highlight(index, true, viewport)
    }

    pub fn unhighlight_record(&mut self, index: usize, viewport: &dyn MapViewport) -> Effects {
        self.set_record_highlight(index, false, viewport)
    }

    fn set_record_highlight(
        &mut self,
        index: usize,
        on: bool,
        viewport: &dyn MapViewport,
    ) -> Effects {
        let mut effects = self.highlight_point(HoverAction::ClearAll, None, viewport);
        self.list.clear(Marker::Highlighted);
        let ids = self
            .records
            .get(index)
            .map(|r| r.points.clone())
            .unwrap_or_default();
        for id in ids {
            if let Some(p) = self.point_mut(id) {
                p.highlighted = on;
            }
        }
        effects.redraw = true;
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::camera::MercatorViewport;
    use crate::model::{AlertProperties, Feature, Geometry, Place};

    fn feature(id: &str, geometry: Geometry) -> Feature {
        Feature {
            geometry,
            properties: AlertProperties {
                id: id.to_string(),
                date: Some("2014-03-01 00:00:00".to_string()),
                summary: Some(format!("summary {id}")),
                places: vec![Place {
                    place_id: None,
                    place_name: Some(format!("place {id}")),
                }],
                ..Default::default()
            },
        }
    }

    fn state(features: Vec<Feature>) -> ViewState {
        let generations = SearchGeneration::new();
        let tag = generations.begin();
        let (records, points) = aggregate(features);
        let mut vs = ViewState::new();
        assert!(vs.load(&generations, tag, records, points));
        vs
    }

    fn sample() -> ViewState {
        state(vec![
            feature("a", Geometry::Point([0.0, 0.0])),
            feature("b", Geometry::Point([10.0, 10.0])),
            feature("c", Geometry::Point([20.0, -5.0])),
            feature("d", Geometry::MultiPoint(vec![[10.0, 10.0], [30.0, 30.0]])),
        ])
    }

    fn vp() -> MercatorViewport {
        MercatorViewport::new(800.0, 600.0)
    }

    #[test]
    fn topmost_candidate_is_the_only_highlight() {
        let mut vs = sample();
        let vp = vp();
        let fx = vs.hover_add(PointId(0), &vp);
        assert!(fx.redraw && fx.tooltip_changed);
        assert_eq!(vs.highlighted(), vec![PointId(0)]);

        vs.hover_add(PointId(2), &vp);
        assert_eq!(vs.highlighted(), vec![PointId(2)]);
        assert_eq!(vs.tooltip().unwrap().title, "place c");

        let fx = vs.hover_add(PointId(1), &vp);
        assert!(!fx.redraw);
        assert_eq!(vs.highlighted(), vec![PointId(2)]);

        vs.hover_remove(PointId(2), &vp);
        assert_eq!(vs.highlighted(), vec![PointId(1)]);

        vs.hover_remove(PointId(1), &vp);
        let fx = vs.hover_remove(PointId(0), &vp);
        assert!(fx.redraw && fx.tooltip_changed);
        assert!(vs.highlighted().is_empty());
        assert!(vs.tooltip().is_none());
    }

    #[test]
    fn duplicate_hover_is_ignored() {
        let mut vs = sample();
        let vp = vp();
        vs.hover_add(PointId(1), &vp);
        assert_eq!(vs.hover_add(PointId(1), &vp), Effects::default());
        assert_eq!(vs.hover_candidates(), &[PointId(1)]);
    }

    #[test]
    fn hover_marks_list_entries() {
        let mut vs = sample();
        let vp = vp();
        vs.hover_add(PointId(1), &vp);
        assert!(vs.list().has("b", Marker::Highlighted));
        assert!(vs.list().has("d", Marker::Highlighted));
        vs.hover_remove(PointId(1), &vp);
        assert!(!vs.list().has("b", Marker::Highlighted));
    }

    #[test]
    fn click_ignores_lower_features() {
        let mut vs = sample();
        assert_eq!(vs.click(PointId(0), 1, &vp()), Effects::default());
        assert!(vs.picked().is_empty());
    }

    #[test]
    fn click_picks_reorders_and_scrolls() {
        let mut vs = sample();
        let fx = vs.click(PointId(1), 0, &vp());
        assert!(fx.redraw);
        assert_eq!(fx.scroll_to, vec!["b", "d"]);
        assert_eq!(vs.picked(), vec![PointId(1)]);
        assert_eq!(vs.render_order().last(), Some(&PointId(1)));
        assert_eq!(vs.point(PointId(1)).unwrap().position, 3);
        let sel = vs.selection().unwrap();
        assert_eq!(sel.title.as_deref(), Some("place b"));
        assert_eq!(sel.count, 2);
        assert!(sel.location);
        assert!(vs.list().has("d", Marker::Picked));
    }

    #[test]
    fn new_click_replaces_previous_pick() {
        let mut vs = sample();
        vs.click(PointId(1), 0, &vp());
        vs.click(PointId(2), 0, &vp());
        assert_eq!(vs.picked(), vec![PointId(2)]);
        assert!(!vs.list().has("b", Marker::Picked));
        assert_eq!(vs.last_picked(), Some(LastPicked::Point(PointId(2))));
    }

    #[test]
    fn click_moves_highlight_to_the_new_topmost_candidate() {
        let mut vs = sample();
        let vp = vp();
        vs.hover_add(PointId(0), &vp);
        vs.hover_add(PointId(1), &vp);
        assert_eq!(vs.highlighted(), vec![PointId(1)]);

        let fx = vs.click(PointId(0), 0, &vp);
        assert!(fx.tooltip_changed);
        assert_eq!(vs.highlighted(), vec![PointId(0)]);
        assert_eq!(vs.tooltip().unwrap().title, vs.point(PointId(0)).unwrap().title());
    }

    #[test]
    fn select_record_rechecks_hover_after_reorder() {
        let mut vs = sample();
        let vp = vp();
        vs.hover_add(PointId(0), &vp);
        vs.hover_add(PointId(2), &vp);
        assert_eq!(vs.highlighted(), vec![PointId(2)]);

        let fx = vs.select_record(0, &vp);
        assert!(fx.tooltip_changed);
        assert_eq!(vs.highlighted(), vec![PointId(0)]);

        let fx = vs.select_record(0, &vp);
        assert!(!fx.tooltip_changed);
        assert_eq!(vs.highlighted(), vec![PointId(0)]);
    }

    #[test]
    fn click_clears_every_point_of_a_selected_alert() {
        let mut vs = sample();
        let vp = vp();
        let fx = vs.select_record(3, &vp);
        assert!(fx.camera.is_some());
        assert_eq!(vs.picked(), vec![PointId(1), PointId(3)]);
        vs.click(PointId(0), 0, &self::vp());
        assert_eq!(vs.picked(), vec![PointId(0)]);
    }

    #[test]
    fn select_record_sets_context_and_frames_points() {
        let mut vs = sample();
        let vp = vp();
        let fx = vs.select_record(3, &vp);
        let sel = vs.selection().unwrap();
        assert_eq!(sel.description, "Alert d");
        assert_eq!(sel.title.as_deref(), Some("2014-03-01 00:00:00: summary d"));
        assert_eq!(sel.count, 2);
        assert!(!sel.location);
        let camera = fx.camera.unwrap();
        assert_eq!(camera.center, [20.0, 20.0]);
        assert!(vs.list().has("d", Marker::Picked));
        assert_eq!(&vs.render_order()[2..], &[PointId(1), PointId(3)]);
    }

    #[test]
    fn reorder_is_idempotent() {
        let mut vs = sample();
        vs.click(PointId(0), 0, &vp());
        let once: Vec<_> = vs.render_order().to_vec();
        let positions: Vec<_> = vs.points().iter().map(|p| p.position).collect();
        vs.reorder();
        assert_eq!(vs.render_order(), once.as_slice());
        let again: Vec<_> = vs.points().iter().map(|p| p.position).collect();
        assert_eq!(positions, again);
    }

    #[test]
    fn record_highlight_clears_hover_set() {
        let mut vs = sample();
        let vp = vp();
        vs.hover_add(PointId(0), &vp);
        let fx = vs.highlight_record(3, &vp);
        assert!(fx.redraw);
        assert!(vs.hover_candidates().is_empty());
        assert_eq!(vs.highlighted(), vec![PointId(1), PointId(3)]);
        assert!(vs.list().entries_with(Marker::Highlighted).is_empty());
        vs.unhighlight_record(3, &vp);
        assert!(vs.highlighted().is_empty());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let generations = SearchGeneration::new();
        let old = generations.begin();
        let new = generations.begin();
        let (records, points) = aggregate(vec![feature("x", Geometry::Point([1.0, 1.0]))]);
        let mut vs = ViewState::new();
        assert!(!vs.load(&generations, old, records.clone(), points.clone()));
        assert!(vs.records().is_empty());
        assert!(vs.load(&generations, new, records, points));
        assert_eq!(vs.generation(), new);
    }

    #[test]
    fn load_resets_selection_and_hover() {
        let mut vs = sample();
        let vp = vp();
        vs.hover_add(PointId(0), &vp);
        vs.click(PointId(0), 0, &self::vp());
        let generations = SearchGeneration::new();
        let tag = generations.begin();
        let (records, points) = aggregate(vec![feature("z", Geometry::Point([3.0, 3.0]))]);
        vs.load(&generations, tag, records, points);
        assert!(vs.selection().is_none());
        assert!(vs.hover_candidates().is_empty());
        assert!(vs.tooltip().is_none());
        assert!(vs.last_picked().is_none());
    }

    #[test]
    fn tooltip_lists_three_alerts_then_summarises() {
        let features: Vec<Feature> = (0..5)
            .map(|i| feature(&format!("p{i}"), Geometry::Point([1.0, 2.0])))
            .collect();
        let mut vs = state(features);
        vs.hover_add(PointId(0), &vp());
        let tt = vs.tooltip().unwrap();
        assert_eq!(tt.alerts.len(), 4);
        assert_eq!(tt.alerts[0].date.as_deref(), Some("2014-03-01"));
        assert_eq!(tt.alerts[0].description, "summary p0");
        assert_eq!(tt.alerts[3].description, "and 2 more ...");
    }
}
