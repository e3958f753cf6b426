//! Whole-document transformation of upstream HTML.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::gateway::classify::{REWRITABLE_ATTRIBUTES, classify_and_rewrite};
use crate::gateway::dom::{ElementHandle, ElementRule, LolHtml, MarkupEngine};
use crate::gateway::error::DomError;
use crate::gateway::profile::TargetProfile;
use crate::gateway::selectors::{IFRAME_PATH_SCRIPT, Unwanted, unwanted_for};

const HTML5_DOCTYPE: &str = "<!DOCTYPE html>\n";

static DOCTYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\x{FEFF}?\s*<!DOCTYPE\s+").unwrap());
static HEAD_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());
static BODY_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</body\s*>").unwrap());

/// What one transformation changed.
///
/// Counts are taken per handler call. Elements nested inside a removed
/// subtree are still visited, so `lazy_loaded` and `rewritten` include
/// attributes that were dropped along with their ancestor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformStats {
    pub removed: usize,
    pub lazy_loaded: usize,
    pub rewritten: usize,
    pub script_injected: bool,
}

#[derive(Default)]
struct Counters {
    removed: Cell<usize>,
    lazy_loaded: Cell<usize>,
    rewritten: Cell<usize>,
    script_injected: Cell<bool>,
}

impl Counters {
    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }

    fn snapshot(&self) -> TransformStats {
        TransformStats {
            removed: self.removed.get(),
            lazy_loaded: self.lazy_loaded.get(),
            rewritten: self.rewritten.get(),
            script_injected: self.script_injected.get(),
        }
    }
}

/// Strip ads, lazy-load media, route links through the gateway and
/// serialize. Returns `html` untouched if the document cannot be processed.
pub fn transform(html: &str, profile: &TargetProfile) -> String {
    transform_with(&LolHtml, html, profile)
}

/// [`transform`] with an explicit markup engine.
pub fn transform_with(engine: &dyn MarkupEngine, html: &str, profile: &TargetProfile) -> String {
    let class = profile.content_class();
    debug!(%class, bytes = html.len(), "starting HTML transformation");

    match rewrite_document(engine, html, profile) {
        Ok((output, stats)) => {
            info!(
                %class,
                removed = stats.removed,
                lazy_loaded = stats.lazy_loaded,
                rewritten = stats.rewritten,
                script_injected = stats.script_injected,
                "HTML transformation finished"
            );
            ensure_doctype(output)
        }
        Err(e) => {
            warn!(%class, error = %e, "HTML transformation failed, relaying original document");
            html.to_owned()
        }
    }
}

fn rewrite_document(
    engine: &dyn MarkupEngine,
    html: &str,
    profile: &TargetProfile,
) -> Result<(String, TransformStats), DomError> {
    let counters = Counters::default();
    let counters = &counters;
    let mut rules: Vec<ElementRule<'_>> = Vec::new();

    let mut script_markers = Vec::new();
    for unwanted in unwanted_for(profile.content_class()) {
        match unwanted {
            Unwanted::Selector(selector) => {
                rules.push(ElementRule::new(selector, move |el: &mut dyn ElementHandle| {
                    el.remove();
                    Counters::bump(&counters.removed);
                    Ok(())
                }));
            }
            Unwanted::ScriptContaining(marker) => script_markers.push(marker),
        }
    }

    if !script_markers.is_empty() {
        let doomed: HashSet<usize> = engine
            .select_text(html, "script")?
            .iter()
            .enumerate()
            .filter(|(_, text)| script_markers.iter().any(|m| text.contains(m)))
            .map(|(index, _)| index)
            .collect();

        if !doomed.is_empty() {
            let mut index = 0usize;
            rules.push(ElementRule::new("script", move |el: &mut dyn ElementHandle| {
                if doomed.contains(&index) {
                    el.remove();
                    Counters::bump(&counters.removed);
                }
                index += 1;
                Ok(())
            }));
        }
    }

    rules.push(ElementRule::new("img, iframe", move |el: &mut dyn ElementHandle| {
        if el.attr("loading").is_none_or(|v| v.is_empty()) {
            el.set_attr("loading", "lazy")?;
            Counters::bump(&counters.lazy_loaded);
        }
        Ok(())
    }));

    rules.push(ElementRule::new("*", move |el: &mut dyn ElementHandle| {
        for attribute in REWRITABLE_ATTRIBUTES {
            let Some(value) = el.attr(attribute) else {
                continue;
            };
            let decision = classify_and_rewrite(&value, attribute, profile);
            if let Some(url) = decision.replacement() {
                el.set_attr(attribute, url.as_str())?;
                Counters::bump(&counters.rewritten);
            }
        }
        Ok(())
    }));

    let injects_script = profile.content_class().injects_iframe_script();
    if injects_script {
        let target = if HEAD_END_RE.is_match(html) {
            Some("head")
        } else if BODY_END_RE.is_match(html) {
            Some("body")
        } else {
            None
        };

        if let Some(selector) = target {
            rules.push(ElementRule::new(selector, move |el: &mut dyn ElementHandle| {
                if !counters.script_injected.get() {
                    el.append_html(IFRAME_PATH_SCRIPT);
                    counters.script_injected.set(true);
                }
                Ok(())
            }));
        }
    }

    let mut output = engine.rewrite(html, rules)?;
    // A `</head>` inside a script or comment matches the regex without a real element.
    if injects_script && !counters.script_injected.get() {
        output.push_str(IFRAME_PATH_SCRIPT);
        counters.script_injected.set(true);
    }

    Ok((output, counters.snapshot()))
}

/// Prepend an HTML5 doctype unless the document already starts with one,
/// ignoring a leading BOM and whitespace.
pub fn ensure_doctype(html: String) -> String {
    if DOCTYPE_RE.is_match(&html) {
        html
    } else {
        debug!("adding missing DOCTYPE");
        format!("{HTML5_DOCTYPE}{html}")
    }
}
