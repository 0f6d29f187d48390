use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::camera::MercatorViewport;
use crate::client::{QueryParams, AUTH_PATH, SEARCH_PATH};
use crate::model::PointId;
use crate::runner::{Options, Runner, RunnerError};
use crate::selection::ViewState;

fn feature(id: &str, geometry: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "id": id,
            "date": "2014-03-21 00:00:00",
            "summary": format!("summary {id}"),
            "country": "Guinea",
            "disease": "Ebola",
            "places": [{"place_id": 1, "place_name": "Conakry"}],
        }
    })
}

fn point_features(start: usize, count: usize) -> Value {
    let features: Vec<Value> = (start..start + count)
        .map(|i| {
            feature(
                &format!("alert{i:05}abcd"),
                json!({"type": "Point", "coordinates": [(i % 10) as f64, 1.0]}),
            )
        })
        .collect();
    json!({"type": "FeatureCollection", "features": features})
}

fn runner_for(server: &MockServer, token: Option<&str>) -> Runner {
    Runner::new(Options {
        url: server.uri(),
        token: token.map(str::to_string),
        timeout_seconds: 5,
        proxy: None,
    })
    .unwrap()
}

#[tokio::test]
async fn login_returns_token_from_auth_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AUTH_PATH))
        .and(header("authorization", "Basic dXNlcjpwdw=="))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"authToken": {"token": "abc123"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut runner = runner_for(&server, None);
    let token = runner.login("user", "pw").await.unwrap();
    assert_eq!(token, "abc123");
    assert_eq!(runner.options().token.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn login_rejection_shows_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Login failed."})))
        .mount(&server)
        .await;

    let mut runner = runner_for(&server, None);
    let err = runner.login("user", "bad").await.unwrap_err();
    assert_eq!(err.to_string(), "Login failed.");
}

#[tokio::test]
async fn unlimited_search_pages_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "5000"))
        .and(query_param("token", "tok"))
        .and(query_param("geoJSON", "1"))
        .and(query_param("disease", "Ebola"))
        .respond_with(ResponseTemplate::new(200).set_body_json(point_features(0, 5000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "5000"))
        .and(query_param("limit", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(point_features(5000, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let runner = runner_for(&server, Some("tok"));
    let params = QueryParams {
        disease: Some("Ebola".to_string()),
        limit: Some(0),
        ..Default::default()
    };
    let result = runner.search(&params).await.unwrap();
    assert_eq!(result.pages, 2);
    assert_eq!(result.state.records().len(), 5003);
    assert_eq!(result.state.points().len(), 10);
    let total: usize = result.state.points().iter().map(|p| p.ids.len()).sum();
    assert_eq!(total, 5003);
}

#[tokio::test]
async fn default_search_sends_no_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "0"))
        .and(query_param_is_missing("limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(point_features(0, 50)))
        .expect(1)
        .mount(&server)
        .await;

    let runner = runner_for(&server, Some("tok"));
    let result = runner.search(&QueryParams::default()).await.unwrap();
    assert_eq!(result.pages, 1);
    assert_eq!(result.state.records().len(), 50);
}

#[tokio::test]
async fn failing_page_abandons_the_whole_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(point_features(0, 5000)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "5000"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "database unavailable"})),
        )
        .mount(&server)
        .await;

    let runner = runner_for(&server, Some("tok"));
    let params = QueryParams {
        limit: Some(0),
        ..Default::default()
    };
    match runner.search(&params).await {
        Err(RunnerError::Fetch(e)) => {
            assert_eq!(e.offset, 5000);
            assert!(e.to_string().starts_with("failed to get any results"));
            assert!(e.to_string().contains("database unavailable"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn search_result_drives_selection() {
    let server = MockServer::start().await;
    let body = json!({
        "type": "FeatureCollection",
        "features": [
            feature("first0001", json!({"type": "MultiPoint", "coordinates": [[-13.7, 9.5], [-10.8, 6.3]]})),
            feature("second0002", json!({"type": "Point", "coordinates": [-10.8, 6.3]})),
        ]
    });
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let runner = runner_for(&server, Some("tok"));
    let mut state = runner.search(&QueryParams::default()).await.unwrap().state;
    assert_eq!(state.points().len(), 2);
    assert_eq!(state.records()[0].link, "http://www.healthmap.org/ln.php?first");

    let shared = state.point_at([-10.8, 6.3]).unwrap();
    let fx = state.click(shared, 0, &MercatorViewport::new(960.0, 540.0));
    assert!(fx.redraw);
    assert_eq!(fx.scroll_to, vec!["first0001".to_string(), "second0002".to_string()]);
    assert_eq!(state.picked(), vec![shared]);
    assert_eq!(state.selection().unwrap().count, 2);
    assert!(state.selection().unwrap().location);

    let viewport = MercatorViewport::new(960.0, 540.0);
    let fx = state.select_record(0, &viewport);
    let camera = fx.camera.unwrap();
    assert!((camera.center[0] - -12.25).abs() < 1e-9);
    assert!((camera.center[1] - 7.9).abs() < 1e-9);
    assert_eq!(state.picked().len(), 2);
}

/// Small deterministic generator so interaction sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as usize
    }
}

fn loaded_state(n: usize) -> ViewState {
    use crate::aggregate::aggregate;
    use crate::fetcher::SearchGeneration;
    use crate::model::FeatureCollection;

    let collection: FeatureCollection = serde_json::from_value(point_features(0, n)).unwrap();
    let (records, points) = aggregate(collection.features);
    let generations = SearchGeneration::new();
    let tag = generations.begin();
    let mut state = ViewState::new();
    assert!(state.load(&generations, tag, records, points));
    state
}

#[test]
fn interaction_sequences_keep_selection_invariants() {
    let viewport = MercatorViewport::new(800.0, 600.0);
    for seed in 1..20u64 {
        let mut rng = Lcg(seed);
        let mut state = loaded_state(30);
        let points = state.points().len();
        for _ in 0..200 {
            let id = PointId(rng.next(points));
            match rng.next(6) {
                0 | 1 => {
                    state.hover_add(id, &viewport);
                }
                2 => {
                    state.hover_remove(id, &viewport);
                }
                3 => {
                    state.click(id, 0, &viewport);
                    assert_eq!(state.picked(), vec![id]);
                }
                4 => {
                    let index = rng.next(state.records().len());
                    state.select_record(index, &viewport);
                    let expected = state.records()[index].points.len();
                    assert_eq!(state.picked().len(), expected);
                }
                _ => {
                    state.hover_clear_all(&viewport);
                    assert!(state.highlighted().is_empty());
                }
            }

            let highlighted = state.highlighted();
            let topmost = state
                .hover_candidates()
                .iter()
                .copied()
                .max_by_key(|id| state.point(*id).unwrap().position);
            match topmost {
                Some(top) => assert_eq!(highlighted, vec![top]),
                None => assert!(highlighted.is_empty()),
            }

            let order = state.render_order();
            let first_picked = order
                .iter()
                .position(|id| state.point(*id).unwrap().picked)
                .unwrap_or(order.len());
            assert!(order[first_picked..]
                .iter()
                .all(|id| state.point(*id).unwrap().picked));
            for (position, id) in order.iter().enumerate() {
                assert_eq!(state.point(*id).unwrap().position, position);
            }
        }
    }
}

#[test]
fn clicks_below_the_top_feature_are_ignored() {
    let mut state = loaded_state(5);
    let fx = state.click(PointId(2), 1, &MercatorViewport::new(800.0, 600.0));
    assert!(!fx.redraw);
    assert!(state.picked().is_empty());
    assert!(state.selection().is_none());
}

#[test]
fn hover_sequences_highlight_the_topmost_candidate() {
    let viewport = MercatorViewport::new(800.0, 600.0);
    for seed in 1..20u64 {
        let mut rng = Lcg(seed);
        let mut state = loaded_state(30);
        state.click(PointId(rng.next(10)), 0, &viewport);
        let points = state.points().len();
        for _ in 0..100 {
            let id = PointId(rng.next(points));
            if rng.next(3) == 0 {
                state.hover_remove(id, &viewport);
            } else {
                state.hover_add(id, &viewport);
            }

            let highlighted = state.highlighted();
            let top = state
                .hover_candidates()
                .iter()
                .map(|id| state.point(*id).unwrap().position)
                .max();
            match top {
                Some(top) => {
                    assert_eq!(highlighted.len(), 1);
                    assert_eq!(state.point(highlighted[0]).unwrap().position, top);
                    assert!(state.tooltip().is_some());
                }
                None => assert!(highlighted.is_empty()),
            }
        }
    }
}
