//! Tag inference (C1) and allergen/dietary safety filtering (C2). Both are
//! pure functions: no I/O, no shared state, no error kinds — grounded 1:1 in
//! `original_source/backend/internal/agent/{menu_tags.go,concierge.go}`.

mod safety_filter;
mod tag_engine;

pub use safety_filter::apply;
pub use tag_engine::{enrich_all, preference_score, suggest_tags};
