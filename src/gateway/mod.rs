//! The rewriting gateway: URL classification, redirect translation and
//! document transformation for proxied upstream content.

pub mod candidate;
pub mod classify;
pub mod dom;
pub mod error;
pub mod headers;
pub mod profile;
pub mod redirect;
pub mod relay;
pub mod selectors;
pub mod transform;

pub use classify::{RewriteDecision, classify_and_rewrite};
pub use profile::{ContentClass, TargetProfile, Targets};
pub use redirect::translate_redirect;
pub use relay::fetch_and_relay;
pub use transform::transform;
