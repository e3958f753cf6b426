//! Translation of upstream `Location` headers.
//!
//! Redirects back onto the upstream are rebuilt on the gateway origin with
//! the route prefix; redirects that leave the upstream pass through, made
//! absolute and upgraded to https.

use tracing::{debug, info};
use url::Url;

use crate::gateway::candidate::parse_candidate;
use crate::gateway::classify::{addresses_upstream, proxy_url};
use crate::gateway::error::RedirectError;
use crate::gateway::profile::TargetProfile;

/// Compute the outgoing `Location` value for an upstream redirect.
///
/// `fetched` is the exact upstream URL that produced the redirect; relative
/// locations are resolved against it rather than against the bare origin.
pub fn translate_redirect(
    location: &str,
    fetched: &Url,
    profile: &TargetProfile,
) -> Result<String, RedirectError> {
    let resolved =
        parse_candidate(location, fetched).map_err(|source| RedirectError::Unresolvable {
            location: location.to_owned(),
            source,
        })?;

    if addresses_upstream(&resolved, location, profile) {
        let rewritten = proxy_url(&resolved, profile).to_string();
        info!(
            class = %profile.content_class(),
            location,
            rewritten = %rewritten,
            "rewrote upstream redirect onto gateway"
        );
        return Ok(rewritten);
    }

    // Only protocol-relative locations can leave the upstream without being absolute.
    let passthrough = if Url::parse(location).is_ok() {
        location.to_owned()
    } else {
        parse_candidate(location, profile.proxy_origin())
            .map_err(|source| RedirectError::Unresolvable {
                location: location.to_owned(),
                source,
            })?
            .to_string()
    };

    let passthrough = match passthrough.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => passthrough,
    };

    debug!(
        class = %profile.content_class(),
        location = %passthrough,
        "redirect leaves upstream, passing through"
    );
    Ok(passthrough)
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

    fn fetched() -> Url {
        Url::parse("https://u.example/ep/1").unwrap()
    }

    fn translate(location: &str, class: ContentClass) -> String {
        translate_redirect(location, &fetched(), &profile(class)).unwrap()
    }

    #[test]
    fn root_relative_location_gets_prefix() {
        assert_eq!(
            translate("/login", ContentClass::Movies),
            "https://proxy.test/movies/login"
        );
    }

    #[test]
    fn document_relative_location_resolves_against_fetched_url() {
        assert_eq!(
            translate("2?page=3", ContentClass::Anime),
            "https://proxy.test/anime/ep/2?page=3"
        );
    }

    #[test]
    fn absolute_upstream_location_is_rewritten() {
        assert_eq!(
            translate("http://u.example/ep/9#c", ContentClass::Anime),
            "https://proxy.test/anime/ep/9#c"
        );
        assert_eq!(
            translate("https://www.u.example/home", ContentClass::Anime),
            "https://proxy.test/anime/home"
        );
    }

    #[test]
    fn already_prefixed_location_is_not_prefixed_again() {
        assert_eq!(
            translate("/anime/ep/2", ContentClass::Anime),
            "https://proxy.test/anime/ep/2"
        );
    }

    #[test]
    fn foreign_https_location_passes_through_unchanged() {
        assert_eq!(
            translate("https://ads.other/track", ContentClass::Anime),
            "https://ads.other/track"
        );
    }

    #[test]
    fn foreign_http_location_is_upgraded() {
        assert_eq!(
            translate("http://ads.other/track?x=1", ContentClass::Movies),
            "https://ads.other/track?x=1"
        );
    }

    #[test]
    fn protocol_relative_foreign_location_becomes_absolute() {
        assert_eq!(
            translate("//other.example/x", ContentClass::Movies),
            "https://other.example/x"
        );
    }

    #[test]
    fn foreign_location_keeps_original_spelling() {
        // Not re-serialized: the upstream's literal value is kept.
        assert_eq!(
            translate("https://Ads.Other/Track", ContentClass::Anime),
            "https://Ads.Other/Track"
        );
    }

    #[test]
    fn non_http_location_passes_through() {
        assert_eq!(
            translate("magnet:?xt=urn:btih:abc", ContentClass::Anime),
            "magnet:?xt=urn:btih:abc"
        );
    }

    #[test]
    fn unparseable_location_is_an_error() {
        assert!(matches!(
            translate_redirect("::not a url", &fetched(), &profile(ContentClass::Anime)),
            Err(RedirectError::Unresolvable { .. })
        ));
        assert!(translate_redirect("http://[::1", &fetched(), &profile(ContentClass::Anime)).is_err());
    }
}
