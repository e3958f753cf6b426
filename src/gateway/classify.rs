//! URL classification and rewriting.
//!
//! Decides whether a link found in upstream markup points at the proxied
//! upstream (or one of its subdomains) and, if so, builds the absolute
//! gateway URL that routes back to it under the right prefix.

use tracing::trace;
use url::Url;

use crate::gateway::candidate::{is_root_relative, parse_candidate};
use crate::gateway::profile::TargetProfile;

/// Attributes inspected on every element of a rewritten document.
pub const REWRITABLE_ATTRIBUTES: [&str; 5] = ["href", "src", "data-src", "data-href", "data-url"];

/// Outcome of classifying one candidate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDecision {
    /// Addresses the upstream; carries the gateway URL to write back.
    Upstream(Url),
    /// A `//host/path` value that addresses the upstream once https is assumed.
    ProtocolRelativeUpstream(Url),
    /// Foreign, fragment-only, `mailto:` or empty; left as found.
    Unrelated,
    /// Could not be parsed as a URL; left as found.
    Unparseable,
}

impl RewriteDecision {
    /// The replacement value, when the decision carries one.
    pub fn replacement(&self) -> Option<&Url> {
        match self {
            Self::Upstream(url) | Self::ProtocolRelativeUpstream(url) => Some(url),
            Self::Unrelated | Self::Unparseable => None,
        }
    }
}

/// Classify `value` (taken from `attribute`) and compute its rewrite.
pub fn classify_and_rewrite(value: &str, attribute: &str, profile: &TargetProfile) -> RewriteDecision {
    if value.is_empty() || value.starts_with('#') || value.starts_with("mailto:") {
        return RewriteDecision::Unrelated;
    }

    if value.starts_with("//")
        && let Ok(url) = parse_candidate(&format!("https:{value}"), profile.upstream())
        && is_upstream_host(&url, profile)
    {
        return RewriteDecision::ProtocolRelativeUpstream(proxy_url(&url, profile));
    }

    let resolved = match parse_candidate(value, profile.upstream()) {
        Ok(url) => url,
        Err(e) => {
            trace!(attribute, value, error = %e, "skipping unparseable value");
            return RewriteDecision::Unparseable;
        }
    };

    if addresses_upstream(&resolved, value, profile) {
        return RewriteDecision::Upstream(proxy_url(&resolved, profile));
    }

    RewriteDecision::Unrelated
}

/// Shared upstream test: same origin, an http(s) subdomain, or a literal
/// value that is already upstream-relative.
pub(crate) fn addresses_upstream(resolved: &Url, literal: &str, profile: &TargetProfile) -> bool {
    is_upstream_host(resolved, profile) || is_root_relative(literal)
}

fn is_upstream_host(resolved: &Url, profile: &TargetProfile) -> bool {
    resolved.origin() == *profile.upstream_origin() || is_upstream_subdomain(resolved, profile)
}

fn is_upstream_subdomain(resolved: &Url, profile: &TargetProfile) -> bool {
    let hostname = profile.upstream_hostname();
    if hostname.is_empty() || !matches!(resolved.scheme(), "http" | "https") {
        return false;
    }
    resolved.host_str().is_some_and(|host| {
        host.len() > hostname.len() + 1
            && host.ends_with(hostname)
            && host.as_bytes()[host.len() - hostname.len() - 1] == b'.'
    })
}

/// Prefix `pathname` with the route prefix unless it already carries it.
pub(crate) fn prefixed_path(pathname: &str, route_prefix: &str) -> String {
    let path = if pathname.starts_with('/') {
        pathname.to_owned()
    } else {
        format!("/{pathname}")
    };

    if route_prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(route_prefix) {
        Some(rest) if rest.starts_with('/') => path,
        _ => format!("{route_prefix}{path}"),
    }
}

/// Rebuild `resolved` on the gateway origin, always over https.
pub(crate) fn proxy_url(resolved: &Url, profile: &TargetProfile) -> Url {
    let mut url = profile.proxy_origin().clone();
    url.set_path(&prefixed_path(resolved.path(), profile.route_prefix()));
    url.set_query(resolved.query().filter(|q| !q.is_empty()));
    url.set_fragment(resolved.fragment().filter(|f| !f.is_empty()));
    // Proxy origins are validated http(s), so switching between the two cannot fail.
    let _ = url.set_scheme("https");
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::profile::{ContentClass, Targets};

    fn profile(class: ContentClass) -> TargetProfile {
        Targets::new("https://www.example.com", "https://u.example", "https://u.example")
            .unwrap()
            .profile(class, Url::parse("https://proxy.test").unwrap())
    }

    fn rewritten(value: &str, class: ContentClass) -> Option<String> {
        classify_and_rewrite(value, "href", &profile(class))
            .replacement()
            .map(|u| u.to_string())
    }

    #[test]
    fn absolute_upstream_url_keeps_query_and_fragment() {
        assert_eq!(
            rewritten("https://u.example/ep/1?x=2#frag", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/ep/1?x=2#frag")
        );
    }

    #[test]
    fn root_relative_path_gets_prefix() {
        assert_eq!(
            rewritten("/ep/1", ContentClass::Movies).as_deref(),
            Some("https://proxy.test/movies/ep/1")
        );
        assert_eq!(
            rewritten("/ep/1", ContentClass::Default).as_deref(),
            Some("https://proxy.test/ep/1")
        );
    }

    #[test]
    fn already_prefixed_path_is_not_prefixed_again() {
        assert_eq!(
            rewritten("/anime/ep/1", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/ep/1")
        );
    }

    #[test]
    fn bare_prefix_without_slash_is_still_prefixed() {
        assert_eq!(
            rewritten("/anime", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/anime")
        );
        assert_eq!(
            rewritten("/animex", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/animex")
        );
    }

    #[test]
    fn document_relative_path_resolves_against_upstream() {
        assert_eq!(
            rewritten("img/a.png", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/img/a.png")
        );
    }

    #[test]
    fn protocol_relative_upstream() {
        let decision = classify_and_rewrite("//u.example/img.png", "src", &profile(ContentClass::Anime));
        assert_eq!(
            decision,
            RewriteDecision::ProtocolRelativeUpstream(
                Url::parse("https://proxy.test/anime/img.png").unwrap()
            )
        );
    }

    #[test]
    fn subdomain_is_upstream() {
        assert_eq!(
            rewritten("https://cdn.u.example/a.js", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/a.js")
        );
        assert_eq!(
            rewritten("http://cdn.u.example/a.js", ContentClass::Anime).as_deref(),
            Some("https://proxy.test/anime/a.js")
        );
    }

    #[test]
    fn lookalike_host_is_not_a_subdomain() {
        assert_eq!(rewritten("https://evilu.example/a", ContentClass::Anime), None);
        assert_eq!(rewritten("https://u.example.evil/a", ContentClass::Anime), None);
    }

    #[test]
    fn insecure_upstream_scheme_is_upgraded() {
        let profile = Targets::new("http://plain.example", "https://a.example", "https://b.example")
            .unwrap()
            .profile(
                ContentClass::Default,
                Url::parse("http://localhost:8080").unwrap(),
            );
        let decision = classify_and_rewrite("http://plain.example/p?q=1", "src", &profile);
        assert_eq!(
            decision.replacement().map(Url::as_str),
            Some("https://localhost:8080/p?q=1")
        );
    }

    #[test]
    fn protocol_relative_on_insecure_upstream_falls_back_to_origin_test() {
        let profile = Targets::new("http://plain.example", "https://a.example", "https://b.example")
            .unwrap()
            .profile(ContentClass::Default, Url::parse("https://proxy.test").unwrap());
        assert!(matches!(
            classify_and_rewrite("//plain.example/x", "src", &profile),
            RewriteDecision::Upstream(_)
        ));
    }

    #[test]
    fn fragments_and_mailto_are_unrelated() {
        let profile = profile(ContentClass::Anime);
        for value in ["#top", "#", "mailto:a@u.example", ""] {
            assert_eq!(
                classify_and_rewrite(value, "href", &profile),
                RewriteDecision::Unrelated,
                "{value:?}"
            );
        }
    }

    #[test]
    fn foreign_domains_are_unrelated() {
        let profile = profile(ContentClass::Anime);
        for value in [
            "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css",
            "//cdn.jsdelivr.net/x.js",
            "https://ads.other/track",
            "javascript:void(0)",
        ] {
            assert_eq!(
                classify_and_rewrite(value, "src", &profile),
                RewriteDecision::Unrelated,
                "{value:?}"
            );
        }
    }

    #[test]
    fn malformed_values_are_unparseable() {
        let profile = profile(ContentClass::Anime);
        assert_eq!(
            classify_and_rewrite("::not a url", "href", &profile),
            RewriteDecision::Unparseable
        );
        assert_eq!(
            classify_and_rewrite("http://[::1", "href", &profile),
            RewriteDecision::Unparseable
        );
    }

    #[test]
    fn rewriting_is_idempotent() {
        let profile = profile(ContentClass::Anime);
        let first = classify_and_rewrite("/ep/1?x=2", "href", &profile);
        let url = first.replacement().unwrap().to_string();
        assert_eq!(
            classify_and_rewrite(&url, "href", &profile),
            RewriteDecision::Unrelated
        );
    }

    #[test]
    fn prefixed_path_rules() {
        assert_eq!(prefixed_path("/a", ""), "/a");
        assert_eq!(prefixed_path("a", ""), "/a");
        assert_eq!(prefixed_path("/a", "/anime"), "/anime/a");
        assert_eq!(prefixed_path("/anime/a", "/anime"), "/anime/a");
        assert_eq!(prefixed_path("/", "/movies"), "/movies/");
    }
}
