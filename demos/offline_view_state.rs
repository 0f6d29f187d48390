//! Drives the map/list state machine without a server.

use alertmap::aggregate::aggregate;
use alertmap::camera::MercatorViewport;
use alertmap::fetcher::SearchGeneration;
use alertmap::model::{AlertProperties, Feature, Geometry, Place};
use alertmap::output;
use alertmap::render::{FrameRecorder, MapAdapter};
use alertmap::selection::ViewState;

fn alert(id: &str, summary: &str, geometry: Geometry, places: &[&str]) -> Feature {
    Feature {
        geometry,
        properties: AlertProperties {
            id: id.to_string(),
            date: Some("2014-08-08 00:00:00".to_string()),
            summary: Some(summary.to_string()),
            places: places
                .iter()
                .map(|name| Place {
                    place_id: None,
                    place_name: Some(name.to_string()),
                })
                .collect(),
            ..Default::default()
        },
    }
}

fn main() {
    let features = vec![
        alert(
            "11111aaaa",
            "Ebola cases reported",
            Geometry::MultiPoint(vec![[-13.7, 9.5], [-10.8, 6.3]]),
            &["Conakry", "Monrovia"],
        ),
        alert(
            "22222bbbb",
            "Cholera outbreak",
            Geometry::Point([-10.8, 6.3]),
            &["Monrovia"],
        ),
        alert(
            "33333cccc",
            "Measles cluster",
            Geometry::Point([3.4, 6.5]),
            &["Lagos"],
        ),
    ];

    let (records, points) = aggregate(features);
    let generations = SearchGeneration::new();
    let tag = generations.begin();
    let mut state = ViewState::new();
    state.load(&generations, tag, records, points);

    let mut viewport = MercatorViewport::new(960.0, 540.0);
    let mut adapter = MapAdapter::new(FrameRecorder::default());
    adapter.show(state.points());

    let fx = state.select_record(0, &viewport);
    if let Some(camera) = fx.camera.as_ref() {
        viewport.apply(camera);
        println!("camera -> {:?} zoom {}", camera.center, camera.zoom);
    }
    adapter.refresh(state.points(), std::time::Instant::now());

    if let Some(monrovia) = state.point_at([-10.8, 6.3]) {
        state.hover_add(monrovia, &viewport);
        adapter.refresh(state.points(), std::time::Instant::now());
        if let Some(tt) = state.tooltip() {
            println!("tooltip [{}] {}", tt.style(), tt.title);
            for a in &tt.alerts {
                println!("  {}", a.description);
            }
        }
    }
    adapter.flush();

    print!(
        "{}",
        String::from_utf8_lossy(&output::render_text(&state, 0..state.records().len()))
    );
    println!("draws: {}", adapter.widget().draw_count());
}
