//! Local stand-in for the BGG XML API, served by axum on an ephemeral port.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use gameshelf_core::GameId;

use crate::config::BggClientConfig;

/// Canned BGG data plus knobs for failure modes.
#[derive(Debug, Default)]
pub struct StubData {
    pub collections: HashMap<String, Vec<GameId>>,
    pub names: HashMap<GameId, String>,
    /// Collection requests for these users answer HTTP 500.
    pub failing_users: HashSet<String>,
    /// Every request answers 202 until this many have been queued.
    pub queued_responses: AtomicU32,
    /// `collection:<user>` or `thing:<ids>` per request, in arrival order.
    pub requests: Mutex<Vec<String>>,
    /// `Authorization` header of each request.
    pub auth_headers: Mutex<Vec<Option<String>>>,
    /// `User-Agent` header of each request.
    pub user_agents: Mutex<Vec<Option<String>>>,
}

impl StubData {
    pub fn with_collection(mut self, username: &str, ids: &[GameId]) -> Self {
        self.collections.insert(username.to_string(), ids.to_vec());
        self
    }

    pub fn with_game(mut self, id: GameId, name: &str) -> Self {
        self.names.insert(id, name.to_string());
        self
    }

    pub fn with_failing_user(mut self, username: &str) -> Self {
        self.failing_users.insert(username.to_string());
        self
    }

    pub fn with_queued_responses(self, n: u32) -> Self {
        self.queued_responses.store(n, Ordering::SeqCst);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn user_agents(&self) -> Vec<Option<String>> {
        self.user_agents.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

pub struct StubServer {
    pub addr: SocketAddr,
    pub data: Arc<StubData>,
    _handle: tokio::task::JoinHandle<()>,
}

impl StubServer {
    pub async fn start(data: StubData) -> std::io::Result<Self> {
        let data = Arc::new(data);
        let app = Router::new()
            .route("/xmlapi2/collection", get(collection))
            .route("/xmlapi2/thing", get(thing))
            .with_state(Arc::clone(&data));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "BGG stub server stopped");
            }
        });
        Ok(Self {
            addr,
            data,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/xmlapi2", self.addr)
    }

    /// Client config pointed at this stub, with every delay zeroed.
    pub fn client_config(&self) -> BggClientConfig {
        BggClientConfig {
            base_url: self.base_url(),
            ..BggClientConfig::default()
        }
        .without_delays()
    }
}

type Shared = State<Arc<StubData>>;

fn note(data: &StubData, request: String, headers: &HeaderMap) {
    let header_str = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    if let Ok(mut r) = data.requests.lock() {
        r.push(request);
    }
    if let Ok(mut a) = data.auth_headers.lock() {
        a.push(header_str(header::AUTHORIZATION));
    }
    if let Ok(mut u) = data.user_agents.lock() {
        u.push(header_str(header::USER_AGENT));
    }
}

fn take_queued(data: &StubData) -> bool {
    data.queued_responses
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn xml(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

async fn collection(
    State(data): Shared,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let username = params.get("username").cloned().unwrap_or_default();
    note(&data, format!("collection:{username}"), &headers);

    if take_queued(&data) {
        return StatusCode::ACCEPTED.into_response();
    }
    if data.failing_users.contains(&username) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if params.get("own").map(String::as_str) != Some("1")
        || params.get("subtype").map(String::as_str) != Some("boardgame")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let Some(ids) = data.collections.get(&username) else {
        return xml(
            "<errors><error><message>Invalid username specified</message></error></errors>"
                .to_string(),
        );
    };

    let mut body = format!("<items totalitems=\"{}\">", ids.len());
    for id in ids {
        body.push_str(&format!(
            "<item objecttype=\"thing\" objectid=\"{id}\" subtype=\"boardgame\"><status own=\"1\"/></item>"
        ));
    }
    body.push_str("</items>");
    xml(body)
}

async fn thing(
    State(data): Shared,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let ids = params.get("id").cloned().unwrap_or_default();
    note(&data, format!("thing:{ids}"), &headers);

    if take_queued(&data) {
        return StatusCode::ACCEPTED.into_response();
    }
    if params.get("type").map(String::as_str) != Some("boardgame") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let mut body = String::from("<items>");
    for id in ids.split(',').filter_map(|s| s.parse::<GameId>().ok()) {
        if let Some(name) = data.names.get(&id) {
            body.push_str(&format!(
                "<item type=\"boardgame\" id=\"{id}\"><name type=\"alternate\" sortindex=\"1\" value=\"alt\"/><name type=\"primary\" sortindex=\"1\" value=\"{}\"/></item>",
                escape_attr(name)
            ));
        }
    }
    body.push_str("</items>");
    xml(body)
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
