//! Minimal DOM capabilities used by the document transformer.
//!
//! The transformer only ever needs to select elements, read and write
//! attributes, remove elements, append markup and serialize. Those are
//! expressed as [`ElementHandle`] and [`MarkupEngine`] so the concrete HTML
//! engine can change without touching the rewrite decisions.

use std::borrow::Cow;
use std::cell::RefCell;

use lol_html::html_content::{ContentType, Element};
use lol_html::{RewriteStrSettings, Selector, element, rewrite_str, text};

use crate::gateway::error::DomError;

/// Mutable access to one element while a document is being rewritten.
pub trait ElementHandle {
    fn attr(&self, name: &str) -> Option<String>;
    fn set_attr(&mut self, name: &str, value: &str) -> Result<(), DomError>;
    /// Drop the element and everything inside it from the output.
    fn remove(&mut self);
    /// Insert raw markup just before the element's end tag.
    fn append_html(&mut self, html: &str);
}

pub type ElementAction<'a> = Box<dyn FnMut(&mut dyn ElementHandle) -> Result<(), DomError> + 'a>;

/// An action run on every element matching `selector`.
pub struct ElementRule<'a> {
    selector: Cow<'static, str>,
    action: ElementAction<'a>,
}

impl<'a> ElementRule<'a> {
    pub fn new(
        selector: impl Into<Cow<'static, str>>,
        action: impl FnMut(&mut dyn ElementHandle) -> Result<(), DomError> + 'a,
    ) -> Self {
        Self {
            selector: selector.into(),
            action: Box::new(action),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

/// A parser/serializer able to run [`ElementRule`]s over a whole document.
pub trait MarkupEngine {
    /// Text content of each element matching `selector`, in document order.
    fn select_text(&self, html: &str, selector: &str) -> Result<Vec<String>, DomError>;

    /// Run `rules` over the document and serialize the result.
    ///
    /// Rules matching the same element run in the order given.
    fn rewrite(&self, html: &str, rules: Vec<ElementRule<'_>>) -> Result<String, DomError>;
}

/// [`MarkupEngine`] backed by `lol_html` over a fully buffered document.
#[derive(Debug, Clone, Copy, Default)]
pub struct LolHtml;

fn check_selector(selector: &str) -> Result<(), DomError> {
    selector
        .parse::<Selector>()
        .map(drop)
        .map_err(|e| DomError::Rewrite(format!("invalid selector {selector:?}: {e}")))
}

impl MarkupEngine for LolHtml {
    fn select_text(&self, html: &str, selector: &str) -> Result<Vec<String>, DomError> {
        check_selector(selector)?;
        let texts = RefCell::new(Vec::<String>::new());
        {
            let element_content_handlers = vec![
                element!(selector, |_el| {
                    texts.borrow_mut().push(String::new());
                    Ok(())
                }),
                text!(selector, |chunk| {
                    if let Some(current) = texts.borrow_mut().last_mut() {
                        current.push_str(chunk.as_str());
                    }
                    Ok(())
                }),
            ];
            rewrite_str(
                html,
                RewriteStrSettings {
                    element_content_handlers,
                    ..RewriteStrSettings::default()
                },
            )
            .map_err(|e| DomError::Rewrite(e.to_string()))?;
        }
        Ok(texts.into_inner())
    }

    fn rewrite(&self, html: &str, rules: Vec<ElementRule<'_>>) -> Result<String, DomError> {
        let mut element_content_handlers = Vec::with_capacity(rules.len());
        for rule in rules {
            check_selector(rule.selector())?;
            let ElementRule {
                selector,
                mut action,
            } = rule;
            element_content_handlers.push(element!(&*selector, move |el| {
                action(el)?;
                Ok(())
            }));
        }

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers,
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| DomError::Rewrite(e.to_string()))
    }
}

impl ElementHandle for Element<'_, '_> {
    fn attr(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }

    fn set_attr(&mut self, name: &str, value: &str) -> Result<(), DomError> {
        self.set_attribute(name, value)
            .map_err(|e| DomError::Attribute(format!("{name}: {e}")))
    }

    fn remove(&mut self) {
        Element::remove(self)
    }

    fn append_html(&mut self, html: &str) {
        self.append(html, ContentType::Html)
    }
}
