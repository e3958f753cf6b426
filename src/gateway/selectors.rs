//! Unwanted-element tables and injected markup, keyed by content class.

use crate::gateway::profile::ContentClass;

/// One kind of element to strip from upstream documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unwanted {
    /// Every element matching a CSS selector (selector lists allowed).
    Selector(&'static str),
    /// Inline `<script>` elements whose text contains the marker.
    ScriptContaining(&'static str),
}

const COMMON: &[Unwanted] = &[
    Unwanted::Selector(
        r#"script[src*="ad"], script[src*="analytics"], script[src*="googletagmanager"], script[src*="doubleclick"]"#,
    ),
    Unwanted::ScriptContaining("adsbygoogle"),
    Unwanted::Selector("div[data-ad-client], div[data-ad-slot]"),
];

const ANIME: &[Unwanted] = &[
    Unwanted::Selector(".ads"),
    Unwanted::Selector(".advertisement"),
    Unwanted::Selector(".banner"),
    Unwanted::Selector(".iklan"),
    Unwanted::Selector("#ad_box"),
    Unwanted::Selector("#ad_bawah"),
    Unwanted::Selector("#judi"),
    Unwanted::Selector("#judi2"),
];

const MOVIES: &[Unwanted] = &[
    Unwanted::Selector(".ads"),
    Unwanted::Selector(".advertisement"),
    Unwanted::Selector(".banner"),
    Unwanted::Selector(".iklan"),
    Unwanted::Selector("#ad_box"),
    Unwanted::Selector("#ad_bawah"),
];

/// The unwanted-element set for a content class: its own entries followed
/// by the entries every class shares.
pub fn unwanted_for(class: ContentClass) -> impl Iterator<Item = Unwanted> {
    let own: &[Unwanted] = match class {
        ContentClass::Anime => ANIME,
        ContentClass::Movies => MOVIES,
        ContentClass::Default => &[],
    };
    own.iter().chain(COMMON).copied()
}

/// Rewrites every iframe `src` to a path relative to the page the browser
/// is on, so embedded players load through the gateway's own prefix.
pub const IFRAME_PATH_SCRIPT: &str = r#"
<script src="https://code.jquery.com/jquery-3.6.0.min.js"></script>
<script>
$(document).ready(function() {
    $('iframe').each(function() {
        var src = $(this).attr('src');
        if (src) {
            try {
                var url = new URL(src, window.location.href);
                var pathnameWithPrefix = url.pathname;
                 $(this).attr('src', pathnameWithPrefix + url.search + url.hash);

            } catch (e) {
                console.error('Error processing iframe src:', src, e);
            }
        }
    });
});
</script>
"#;
