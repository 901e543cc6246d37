//! text-marker HTML
//!
//! HTML5 markup into `marker-dom` trees, built on html5ever, plus the
//! escaping used when markup is generated from raw text.

mod escape;
mod parser;

pub use escape::{escape_attr, escape_text};
pub use parser::{set_inner_html, HtmlParser};

use marker_dom::DomError;

/// Markup conversion error
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("Parsed markup has no <body> element")]
    MissingBody,

    #[error(transparent)]
    Dom(#[from] DomError),
}
