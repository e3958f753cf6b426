//! Parsing of candidate URL values found in markup and `Location` headers.

use url::{ParseError, Url};

use crate::gateway::error::CandidateError;

/// Resolve `value` against `base` the way a browser would, but refuse
/// relative references that RFC 3986 forbids.
///
/// Absolute values are returned as parsed. A relative reference whose first
/// path segment contains `:` (e.g. `::not a url`) would be misread as a
/// scheme and is rejected rather than resolved.
pub fn parse_candidate(value: &str, base: &Url) -> Result<Url, CandidateError> {
    match Url::parse(value) {
        Ok(url) => return Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(e.into()),
    }

    let first_segment = value.trim_start().split(['/', '?', '#']).next().unwrap_or("");
    if first_segment.contains(':') {
        return Err(CandidateError::AmbiguousScheme(value.to_owned()));
    }

    Ok(base.join(value)?)
}

/// Whether the literal value is an upstream-relative absolute path
/// (`/path`, but not the protocol-relative `//host/path`).
pub fn is_root_relative(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://u.example/ep/1").unwrap()
    }

    #[test]
    fn absolute_value_ignores_base() {
        let url = parse_candidate("https://other.example/x?y=1", &base()).unwrap();
        assert_eq!(url.as_str(), "https://other.example/x?y=1");
    }

    #[test]
    fn relative_value_resolves_against_base() {
        assert_eq!(
            parse_candidate("2", &base()).unwrap().as_str(),
            "https://u.example/ep/2"
        );
        assert_eq!(
            parse_candidate("/login", &base()).unwrap().as_str(),
            "https://u.example/login"
        );
        assert_eq!(
            parse_candidate("//cdn.u.example/a.png", &base())
                .unwrap()
                .as_str(),
            "https://cdn.u.example/a.png"
        );
    }

    #[test]
    fn colon_in_first_segment_is_rejected() {
        assert!(matches!(
            parse_candidate("::not a url", &base()),
            Err(CandidateError::AmbiguousScheme(_))
        ));
    }

    #[test]
    fn colon_after_first_segment_is_allowed() {
        let url = parse_candidate("/watch/a:b", &base()).unwrap();
        assert_eq!(url.path(), "/watch/a:b");
    }

    #[test]
    fn invalid_host_is_rejected() {
        assert!(matches!(
            parse_candidate("http://[::1", &base()),
            Err(CandidateError::Invalid(_))
        ));
    }

    #[test]
    fn root_relative_detection() {
        assert!(is_root_relative("/a"));
        assert!(is_root_relative("/"));
        assert!(!is_root_relative("//a.example/x"));
        assert!(!is_root_relative("a/b"));
        assert!(!is_root_relative(""));
    }
}
