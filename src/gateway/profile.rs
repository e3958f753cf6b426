//! Per-request target profiles and the configured upstream table.

use std::fmt;

use url::{Origin, Url};

/// Which upstream family a request belongs to.
///
/// Selects the route prefix, the unwanted-element selector set and whether
/// the iframe path script is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentClass {
    Anime,
    Movies,
    Default,
}

impl ContentClass {
    pub const ALL: [ContentClass; 3] = [Self::Anime, Self::Movies, Self::Default];

    /// Path prefix that routes back to this upstream through the gateway.
    pub fn route_prefix(self) -> &'static str {
        match self {
            Self::Anime => "/anime",
            Self::Movies => "/movies",
            Self::Default => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Movies => "movies",
            Self::Default => "default",
        }
    }

    /// Only the movies upstream gets the client-side iframe path fix.
    pub fn injects_iframe_script(self) -> bool {
        matches!(self, Self::Movies)
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while validating configured upstreams.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("{class} target {value:?} is not a valid URL")]
    Parse {
        class: ContentClass,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{class} target {value:?} must be an http(s) URL with a host")]
    Unsupported { class: ContentClass, value: String },
}

/// The three configured upstreams, validated once at startup.
#[derive(Debug, Clone)]
pub struct Targets {
    default: Url,
    anime: Url,
    movies: Url,
}

impl Targets {
    pub fn new(default: &str, anime: &str, movies: &str) -> Result<Self, TargetError> {
        Ok(Self {
            default: parse_target(ContentClass::Default, default)?,
            anime: parse_target(ContentClass::Anime, anime)?,
            movies: parse_target(ContentClass::Movies, movies)?,
        })
    }

    pub fn upstream(&self, class: ContentClass) -> &Url {
        match class {
            ContentClass::Anime => &self.anime,
            ContentClass::Movies => &self.movies,
            ContentClass::Default => &self.default,
        }
    }

    /// Build the immutable profile for one request.
    pub fn profile(&self, class: ContentClass, proxy_origin: Url) -> TargetProfile {
        TargetProfile::new(self.upstream(class).clone(), class, proxy_origin)
    }
}

fn parse_target(class: ContentClass, value: &str) -> Result<Url, TargetError> {
    let url = Url::parse(value).map_err(|source| TargetError::Parse {
        class,
        value: value.to_owned(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(TargetError::Unsupported {
            class,
            value: value.to_owned(),
        });
    }
    Ok(url)
}

/// Everything the rewriting engine needs to know about one request.
///
/// Built by the dispatcher, never mutated, never shared between requests.
#[derive(Debug, Clone)]
pub struct TargetProfile {
    upstream: Url,
    upstream_origin: Origin,
    upstream_hostname: String,
    content_class: ContentClass,
    proxy_origin: Url,
}

impl TargetProfile {
    /// `proxy_origin` is reduced to its origin; any path on it is discarded.
    pub fn new(upstream: Url, content_class: ContentClass, proxy_origin: Url) -> Self {
        let upstream_origin = upstream.origin();
        let upstream_hostname = upstream.host_str().unwrap_or_default().to_owned();
        let mut proxy_origin = proxy_origin;
        proxy_origin.set_path("/");
        proxy_origin.set_query(None);
        proxy_origin.set_fragment(None);
        Self {
            upstream,
            upstream_origin,
            upstream_hostname,
            content_class,
            proxy_origin,
        }
    }

    /// The configured upstream URL, used as the base for resolving markup.
    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    pub fn upstream_origin(&self) -> &Origin {
        &self.upstream_origin
    }

    pub fn upstream_hostname(&self) -> &str {
        &self.upstream_hostname
    }

    pub fn content_class(&self) -> ContentClass {
        self.content_class
    }

    pub fn route_prefix(&self) -> &'static str {
        self.content_class.route_prefix()
    }

    pub fn proxy_origin(&self) -> &Url {
        &self.proxy_origin
    }

    /// The exact upstream URL to fetch for an already prefix-stripped path.
    pub fn fetch_url(&self, pathname: &str, query: Option<&str>) -> Url {
        let mut url = self.upstream.clone();
        url.set_path(pathname);
        url.set_query(query.filter(|q| !q.is_empty()));
        url.set_fragment(None);
        url
    }
}
