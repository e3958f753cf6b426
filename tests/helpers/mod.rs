#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use contentgate::gateway::profile::{ContentClass, TargetProfile, Targets};
use contentgate::state::AppState;
use contentgate::web::create_router;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

pub const PROXY_ORIGIN: &str = "https://proxy.test";

/// Profile for `upstream` rewriting onto [`PROXY_ORIGIN`].
pub fn profile(class: ContentClass, upstream: &str) -> TargetProfile {
    TargetProfile::new(
        Url::parse(upstream).unwrap(),
        class,
        Url::parse(PROXY_ORIGIN).unwrap(),
    )
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// A base URL nothing is listening on.
pub async fn closed_upstream() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// Gateway state with every content class pointed at `upstream`.
pub fn gateway_state(upstream: &Url) -> AppState {
    let upstream = upstream.as_str();
    let targets = Targets::new(upstream, upstream, upstream).unwrap();
    AppState::new(targets, Some(Url::parse(PROXY_ORIGIN).unwrap()), 8080).unwrap()
}

/// Drive one request through the full gateway router.
pub async fn send(state: AppState, request: Request<Body>) -> Response {
    create_router(state).oneshot(request).await.unwrap()
}

pub async fn get(state: AppState, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(state, request).await
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
