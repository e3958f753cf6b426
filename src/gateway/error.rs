//! Error types for the rewriting gateway.

/// A candidate attribute or header value that cannot be turned into a URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandidateError {
    #[error(transparent)]
    Invalid(#[from] url::ParseError),
    /// A relative reference whose first segment contains a colon reads as an
    /// (invalid) scheme, e.g. `::not a url`.
    #[error("relative reference has a colon in its first segment: {0:?}")]
    AmbiguousScheme(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("location header is not valid UTF-8")]
    NonUtf8Location,
    #[error("failed to resolve redirect location {location:?}")]
    Unresolvable {
        location: String,
        #[source]
        source: CandidateError,
    },
    #[error("rewritten location is not a valid header value")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
}

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("markup rewrite failed: {0}")]
    Rewrite(String),
    #[error("invalid attribute: {0}")]
    Attribute(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("upstream request to {url} failed")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read upstream body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
