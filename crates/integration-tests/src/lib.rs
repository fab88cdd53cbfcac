//! Integration tests for Itemdeck.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p itemdeck-integration-tests
//! ```
//!
//! Tests run against a local [`PostsServer`] that mimics the posts API, so
//! no network access is needed.
//!
//! # Test Categories
//!
//! - `session_flow` - login, logout and restore over real storage backends
//! - `catalog_http` - catalog store over HTTP (errors, retries, caching)
//! - `app_state` - end-to-end flow through the wired application state

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use itemdeck_client::config::ClientConfig;

/// Local stand-in for the posts API.
///
/// Serves `GET /posts` and `GET /posts/{id}` for ids `1..=posts`. Failures
/// and latency can be injected at runtime. The server stops when dropped.
pub struct PostsServer {
    addr: SocketAddr,
    control: Arc<Control>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Control {
    posts: i32,
    list_hits: AtomicUsize,
    detail_hits: AtomicUsize,
    failing: AtomicBool,
    fail_remaining: AtomicUsize,
    delay_ms: AtomicU64,
}

impl Control {
    /// Apply injected latency and failures. `Some` short-circuits the handler.
    async fn interrupt(&self) -> Option<Response> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let fail_once = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if fail_once || self.failing.load(Ordering::SeqCst) {
            return Some(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response(),
            );
        }
        None
    }
}

fn post(id: i32) -> Value {
    json!({
        "userId": (id - 1) / 10 + 1,
        "id": id,
        "title": format!("post title {id}"),
        "body": format!("post body {id}"),
    })
}

async fn list_posts(State(control): State<Arc<Control>>) -> Response {
    control.list_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = control.interrupt().await {
        return response;
    }
    Json((1..=control.posts).map(post).collect::<Vec<_>>()).into_response()
}

async fn get_post(State(control): State<Arc<Control>>, UrlPath(id): UrlPath<i32>) -> Response {
    control.detail_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = control.interrupt().await {
        return response;
    }
    if !(1..=control.posts).contains(&id) {
        return (StatusCode::NOT_FOUND, Json(json!({}))).into_response();
    }
    Json(post(id)).into_response()
}

impl PostsServer {
    /// Start a server on an ephemeral localhost port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(posts: i32) -> Self {
        let control = Arc::new(Control {
            posts,
            ..Control::default()
        });

        let app = Router::new()
            .route("/posts", get(list_posts))
            .route("/posts/{id}", get(get_post))
            .with_state(Arc::clone(&control));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind posts server");
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            control,
            handle,
        }
    }

    /// Base URL to point the client at.
    ///
    /// # Panics
    ///
    /// Never in practice: the address always forms a valid URL.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("Server address is a valid URL")
    }

    /// Answer every request with a 500 while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.control.failing.store(failing, Ordering::SeqCst);
    }

    /// Answer the next `count` requests with a 500.
    pub fn fail_next(&self, count: usize) {
        self.control.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Delay every response.
    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.control.delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Requests received on `/posts`.
    #[must_use]
    pub fn list_hits(&self) -> usize {
        self.control.list_hits.load(Ordering::SeqCst)
    }

    /// Requests received on `/posts/{id}`.
    #[must_use]
    pub fn detail_hits(&self) -> usize {
        self.control.detail_hits.load(Ordering::SeqCst)
    }
}

impl Drop for PostsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Client configuration pointed at `server`, storing the session under
/// `storage_dir`. Caching and retries are off.
#[must_use]
pub fn client_config(server: &PostsServer, storage_dir: &Path) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = server.base_url();
    config.api.timeout = Duration::from_secs(2);
    config.api.retries = 0;
    config.api.retry_delay = Duration::from_millis(10);
    config.api.cache_ttl = Duration::ZERO;
    config.storage_path = storage_dir.join("storage.json");
    config
}

/// Wrap a password literal.
#[must_use]
pub fn secret(password: &str) -> SecretString {
    SecretString::from(password.to_string())
}
