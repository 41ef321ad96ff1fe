use std::{collections::HashMap, fmt, net::SocketAddr};

use anyhow::Context;
use axum::{
    body::Body,
    extract::{Path, Query},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use coplanet::{
    config::{AppConfig, DEFAULT_MAPBOX_API_URL},
    db::{init_pool, run_migrations},
    routes::create_router,
    state::AppState,
};
use cucumber::{given, then, when, World as _};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

const FAKE_TOKEN: &str = "pk.bdd-token";

#[derive(Debug, cucumber::World, Default)]
struct ApiWorld {
    state: Option<TestState>,
    response: Option<ApiResponse>,
    remembered: HashMap<String, String>,
}

#[derive(Debug)]
struct ApiResponse {
    status: StatusCode,
    body: Value,
}

impl ApiWorld {
    fn router(&self) -> Router {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .router
            .clone()
    }

    fn response(&self) -> &ApiResponse {
        self.response
            .as_ref()
            .expect("a request must be sent before asserting on the response")
    }

    fn field(&self, pointer: &str) -> &Value {
        let body = &self.response().body;
        body.pointer(pointer)
            .unwrap_or_else(|| panic!("no field at {pointer:?} in {body}"))
    }

    /// Replaces `{name}` placeholders with remembered values.
    fn expand(&self, path: &str) -> String {
        self.remembered
            .iter()
            .fold(path.to_string(), |path, (name, value)| {
                path.replace(&format!("{{{name}}}"), value)
            })
    }

    async fn send(&mut self, method: &str, path: &str, body: Option<String>) {
        let uri = self.expand(path);
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json)),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router().oneshot(request).await.expect("router call");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        self.response = Some(ApiResponse { status, body });
    }
}

struct TestState {
    router: Router,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new(mapbox_token: Option<String>, mapbox_api_url: Url) -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            mapbox_token,
            mapbox_api_url,
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let router = create_router(AppState::new(config, db)?);
        Ok(Self {
            router,
            _root: root,
        })
    }
}

/// Serves a canned Mapbox geocoding response on an ephemeral port.
async fn spawn_fake_mapbox(status: StatusCode) -> anyhow::Result<Url> {
    let app = Router::new().route(
        "/geocoding/v5/mapbox.places/:query",
        get(
            move |Path(query): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                fake_geocoding(status, &query, &params)
            },
        ),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}").parse()?)
}

fn fake_geocoding(status: StatusCode, query: &str, params: &HashMap<String, String>) -> Response {
    if status != StatusCode::OK {
        return (status, "upstream unavailable").into_response();
    }
    if params.get("access_token").map(String::as_str) != Some(FAKE_TOKEN) {
        return (StatusCode::UNAUTHORIZED, "Not Authorized - Invalid Token").into_response();
    }
    let expected = [
        ("autocomplete", "true"),
        ("types", "place,region,locality,neighborhood,postcode"),
        ("limit", "5"),
    ];
    if expected
        .iter()
        .any(|(key, value)| params.get(*key).map(String::as_str) != Some(*value))
    {
        return (StatusCode::UNPROCESSABLE_ENTITY, "unexpected query parameters").into_response();
    }

    let place = query.trim_end_matches(".json");
    Json(json!({
        "type": "FeatureCollection",
        "features": [
            {
                "id": "place.9397217726497330",
                "place_name": format!("{place}, France"),
                "text": place,
                "center": [2.35183, 48.85658],
                "context": [{ "id": "country.8505", "text": "France" }]
            },
            {
                "id": "place.broken",
                "place_name": "Broken",
                "text": "Broken",
                "center": [2.3]
            }
        ]
    }))
    .into_response()
}

fn default_api_url() -> Url {
    DEFAULT_MAPBOX_API_URL.parse().expect("default Mapbox URL")
}

fn json_matches(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < 1e-9,
        _ => actual == expected,
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut ApiWorld) {
    world.state = Some(
        TestState::new(None, default_api_url())
            .await
            .expect("state"),
    );
    world.response = None;
    world.remembered.clear();
}

#[given("a fresh application state with a working Mapbox upstream")]
async fn given_state_with_mapbox(world: &mut ApiWorld) {
    let api_url = spawn_fake_mapbox(StatusCode::OK).await.expect("fake mapbox");
    world.state = Some(
        TestState::new(Some(FAKE_TOKEN.into()), api_url)
            .await
            .expect("state"),
    );
}

#[given(regex = r"^a fresh application state whose Mapbox upstream fails with status (\d+)$")]
async fn given_state_with_failing_mapbox(world: &mut ApiWorld, status: u16) {
    let status = StatusCode::from_u16(status).expect("status code");
    let api_url = spawn_fake_mapbox(status).await.expect("fake mapbox");
    world.state = Some(
        TestState::new(Some(FAKE_TOKEN.into()), api_url)
            .await
            .expect("state"),
    );
}

#[given("a fresh application state with a Mapbox token the upstream rejects")]
async fn given_rejected_token(world: &mut ApiWorld) {
    let api_url = spawn_fake_mapbox(StatusCode::OK).await.expect("fake mapbox");
    world.state = Some(
        TestState::new(Some("pk.wrong".into()), api_url)
            .await
            .expect("state"),
    );
}

#[when(regex = r#"^I (GET|DELETE) "([^"]+)"$"#)]
async fn when_send_without_body(world: &mut ApiWorld, method: String, path: String) {
    world.send(&method, &path, None).await;
}

#[when(regex = r#"^I (POST|PUT) "([^"]+)" with '(.*)'$"#)]
async fn when_send_with_body(world: &mut ApiWorld, method: String, path: String, body: String) {
    world.send(&method, &path, Some(body)).await;
}

#[when(regex = r#"^I remember the response field "([^"]*)" as "([^"]+)"$"#)]
async fn when_remember_field(world: &mut ApiWorld, pointer: String, name: String) {
    let value = match world.field(&pointer) {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    world.remembered.insert(name, value);
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut ApiWorld, expected: u16) {
    let response = world.response();
    assert_eq!(
        response.status.as_u16(),
        expected,
        "unexpected status, body: {}",
        response.body
    );
}

#[then(regex = r#"^the response error is "([^"]+)"$"#)]
async fn then_error_kind(world: &mut ApiWorld, kind: String) {
    assert_eq!(world.field("/error"), &Value::String(kind));
    assert!(
        world.field("/message").is_string(),
        "error responses carry a message"
    );
}

#[then(regex = r#"^the response field "([^"]*)" is (.+)$"#)]
async fn then_field_is(world: &mut ApiWorld, pointer: String, expected: String) {
    let expected: Value = serde_json::from_str(&world.expand(&expected)).expect("expected JSON");
    let actual = world.field(&pointer);
    assert!(
        json_matches(actual, &expected),
        "field {pointer:?} was {actual}, expected {expected}"
    );
}

#[then(regex = r#"^the response field "([^"]*)" has (\d+) items?$"#)]
async fn then_field_has_items(world: &mut ApiWorld, pointer: String, count: usize) {
    let items = world
        .field(&pointer)
        .as_array()
        .unwrap_or_else(|| panic!("field {pointer:?} is not an array"));
    assert_eq!(items.len(), count);
}

#[then(regex = r#"^the response field "([^"]*)" exists$"#)]
async fn then_field_present(world: &mut ApiWorld, pointer: String) {
    assert!(!world.field(&pointer).is_null(), "field {pointer:?} is null");
}

#[then(regex = r#"^the response body does not mention "([^"]+)"$"#)]
async fn then_body_does_not_mention(world: &mut ApiWorld, needle: String) {
    let body = world.response().body.to_string();
    assert!(!body.contains(&needle), "body leaked {needle:?}: {body}");
}

#[tokio::main]
async fn main() {
    ApiWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
