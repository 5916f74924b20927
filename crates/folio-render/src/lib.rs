//! Document rendering for Folio.
//!
//! A quotation or invoice is laid out once, by [`compose::render`], into a
//! [`PagedDocument`]: absolute positions in millimetres, already split into
//! pages. That model is then encoded as PDF ([`pdf`]) for export. Print
//! output is HTML markup ([`html`]) generated from the same template
//! settings.

pub mod compose;
pub mod error;
pub mod export;
pub mod html;
pub mod layout;
pub mod logo;
pub mod pdf;
pub mod text;

pub use compose::render;
pub use error::{Error, Result};
pub use layout::PagedDocument;
