//! Router construction and path-prefix dispatch.

use std::borrow::Cow;

use axum::Router;
use axum::extract::{Request, State};
use axum::response::Response;
use tracing::debug;

use crate::gateway::fetch_and_relay;
use crate::gateway::profile::ContentClass;
use crate::state::AppState;
use crate::web::adhoc::adhoc_proxy;
use crate::web::homepage::homepage;
use crate::web::middleware::cors::CorsLayer;
use crate::web::middleware::request_id::RequestIdLayer;

const ADHOC_PREFIX: &str = "/proxy";

/// Where a request path is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Homepage,
    Adhoc,
    /// Relay through a content profile. `pathname` is the upstream path with
    /// the route prefix removed.
    Profile {
        class: ContentClass,
        pathname: Cow<'a, str>,
    },
}

impl<'a> Route<'a> {
    /// Resolve a raw request path. First match wins, prefixes are plain
    /// string prefixes (`/animex` belongs to the anime profile).
    pub fn resolve(path: &'a str) -> Self {
        if path == "/" {
            return Route::Homepage;
        }
        if path.starts_with(ADHOC_PREFIX) {
            return Route::Adhoc;
        }

        for class in [ContentClass::Anime, ContentClass::Movies] {
            if let Some(rest) = path.strip_prefix(class.route_prefix()) {
                let pathname = match rest {
                    "" => Cow::Borrowed("/"),
                    rest if rest.starts_with('/') => Cow::Borrowed(rest),
                    rest => Cow::Owned(format!("/{rest}")),
                };
                return Route::Profile { class, pathname };
            }
        }

        Route::Profile {
            class: ContentClass::Default,
            pathname: Cow::Borrowed(path),
        }
    }
}

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(app_state)
        .layer((
            // Outermost: per-request ID span + severity-proportional response logging.
            RequestIdLayer,
            // Answers preflights before anything else runs.
            CorsLayer,
        ))
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_owned();

    match Route::resolve(&path) {
        Route::Homepage => {
            debug!("serving homepage");
            homepage()
        }
        Route::Adhoc => adhoc_proxy(&state, request).await,
        Route::Profile { class, pathname } => {
            let proxy_origin = state.proxy_origin(request.headers());
            let profile = state.targets.profile(class, proxy_origin);
            debug!(%class, pathname = %pathname, "routing to content profile");
            fetch_and_relay(&state.relay_client, request, &pathname, &profile).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(class: ContentClass, pathname: &str) -> Route<'_> {
        Route::Profile {
            class,
            pathname: Cow::Borrowed(pathname),
        }
    }

    #[test]
    fn root_and_adhoc() {
        assert_eq!(Route::resolve("/"), Route::Homepage);
        assert_eq!(Route::resolve("/proxy"), Route::Adhoc);
        assert_eq!(Route::resolve("/proxyfoo"), Route::Adhoc);
    }

    #[test]
    fn prefixes_are_stripped() {
        assert_eq!(
            Route::resolve("/anime/episode/1"),
            profile(ContentClass::Anime, "/episode/1")
        );
        assert_eq!(Route::resolve("/movies"), profile(ContentClass::Movies, "/"));
        assert_eq!(Route::resolve("/anime/"), profile(ContentClass::Anime, "/"));
        assert_eq!(
            Route::resolve("/moviesabc"),
            profile(ContentClass::Movies, "/abc")
        );
    }

    #[test]
    fn everything_else_goes_to_default() {
        assert_eq!(
            Route::resolve("/about/team"),
            profile(ContentClass::Default, "/about/team")
        );
        assert_eq!(
            Route::resolve("/ani"),
            profile(ContentClass::Default, "/ani")
        );
    }
}
