//! Phrase Engine: category-tagged phrase selection and line rendering for
//! chat bots.
//!
//! Picks a stored line for a conversational event, expands its template
//! groups (random choice, optional text, case regions) and fills in context
//! placeholders such as the user's name or the current channel.

pub mod core;
pub mod schema;
pub mod storage;

pub use crate::core::context::RenderContext;
pub use crate::core::pipeline::{PhraseEngine, ResolveError};
pub use crate::core::substitution::Placeholders;
pub use crate::schema::category::Category;
