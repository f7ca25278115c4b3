//! End-to-end flow against a mock OpenWeather server using wiremock.

use chrono::FixedOffset;
use nearcast_core::{
    Coordinates, Notice, Notifier, RenderContext, Renderer, Screen, ScreenSink, TriggerOutcome,
    WeatherFlow,
    location::{ConfiguredLocation, StaticPermission},
    preferences::{CURRENT_LOCATION, LOCATION_KEY, MemoryPreferenceStore, PreferenceStore},
    provider::{HttpIconLoader, OpenWeatherSource},
    render::DisplayTemplates,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Notices(Mutex<Vec<Notice>>);

impl Notifier for Notices {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

struct NoSink;

impl ScreenSink for NoSink {
    fn show(&self, _screen: &Screen) {}
}

fn setup(
    server: &MockServer,
    gate: StaticPermission,
    prefs: Arc<MemoryPreferenceStore>,
    notices: Arc<Notices>,
) -> (WeatherFlow, RenderContext) {
    let source = OpenWeatherSource::new("test_key".to_string())
        .with_endpoint(format!("{}/data/2.5/weather", server.uri()));
    let renderer = Renderer::new(DisplayTemplates::default(), format!("{}/img/wn", server.uri()))
        .with_offset(FixedOffset::east_opt(0).unwrap());

    let (ctx, ui) =
        RenderContext::new(renderer, Arc::new(HttpIconLoader::new()), notices, Arc::new(NoSink));
    let flow = WeatherFlow::new(
        Arc::new(gate),
        Arc::new(ConfiguredLocation::new(Some(Coordinates::new(51.5, -0.12)))),
        prefs,
        Arc::new(source),
        ui,
    );

    (flow, ctx)
}

#[tokio::test]
async fn fetches_renders_and_loads_icon() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": 200,
            "name": "london",
            "sys": {"country": "GB"},
            "weather": [{"description": "overcast clouds", "icon": "04d"}],
            "main": {"temp": 15.5, "humidity": 81, "pressure": 1012},
            "dt": 1700000000
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/wn/04d@2x.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let prefs = Arc::new(MemoryPreferenceStore::default());
    let notices = Arc::new(Notices::default());
    let (flow, ctx) = setup(&server, StaticPermission::granted(), prefs.clone(), notices.clone());

    let outcome = flow.trigger().await;
    assert_eq!(outcome, TriggerOutcome::Dispatched(Coordinates::new(51.5, -0.12)));
    drop(flow);

    let screen = ctx.run().await;
    assert_eq!(screen.city.as_deref(), Some("LONDON, GB"));
    assert_eq!(screen.description.as_deref(), Some("overcast clouds"));
    assert_eq!(screen.details.as_deref(), Some("Humidity: 81%  Pressure: 1012 hPa"));
    assert_eq!(screen.temperature.as_deref(), Some("15.50 ℃"));
    assert_eq!(screen.updated.as_deref(), Some("Last updated: Nov 14, 2023 10:13:20 PM"));
    assert_eq!(screen.icon.unwrap().image, Some(b"png".to_vec()));

    assert_eq!(prefs.get(LOCATION_KEY).unwrap().as_deref(), Some(CURRENT_LOCATION));
    assert!(notices.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn error_status_shows_data_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"cod": "404", "message": "nothing"})),
        )
        .mount(&server)
        .await;

    let notices = Arc::new(Notices::default());
    let (flow, ctx) = setup(
        &server,
        StaticPermission::granted(),
        Arc::new(MemoryPreferenceStore::default()),
        notices.clone(),
    );

    flow.trigger().await;
    drop(flow);

    let screen = ctx.run().await;
    assert_eq!(screen, Screen::default());
    assert_eq!(*notices.0.lock().unwrap(), vec![Notice::DataNotFound]);
}

#[tokio::test]
async fn rejected_key_collapses_to_data_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"cod": 401, "message": "Invalid API key"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let notices = Arc::new(Notices::default());
    let (flow, ctx) = setup(
        &server,
        StaticPermission::granted(),
        Arc::new(MemoryPreferenceStore::default()),
        notices.clone(),
    );

    flow.trigger().await;
    drop(flow);

    let screen = ctx.run().await;
    assert_eq!(screen, Screen::default());
    assert_eq!(*notices.0.lock().unwrap(), vec![Notice::DataNotFound]);
}

#[tokio::test]
async fn denied_permission_issues_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notices = Arc::new(Notices::default());
    let (flow, ctx) = setup(
        &server,
        StaticPermission::denied(),
        Arc::new(MemoryPreferenceStore::default()),
        notices.clone(),
    );

    assert_eq!(flow.trigger().await, TriggerOutcome::PermissionDenied);
    drop(flow);

    ctx.run().await;
    assert_eq!(*notices.0.lock().unwrap(), vec![Notice::PermissionRequired]);
}
