use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed enumeration of allergens the safety filter reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allergen {
    Dairy,
    Egg,
    Fish,
    Peanut,
    Shellfish,
    Soy,
    TreeNut,
    Wheat,
}

impl Allergen {
    /// The tag that contradicts this allergen's presence on a menu item, if any.
    /// `None` for allergens with no "free-of" tag in the keyword table (egg,
    /// fish, shellfish, soy carry no corresponding `*-free` tag rule).
    pub fn contradicting_tag(self) -> Option<&'static str> {
        match self {
            Allergen::Peanut | Allergen::TreeNut => Some("nut-free"),
            Allergen::Dairy => Some("dairy-free"),
            Allergen::Wheat => Some("gluten-free"),
            Allergen::Egg | Allergen::Fish | Allergen::Shellfish | Allergen::Soy => None,
        }
    }
}

/// A single menu entry: identity, description, allergen facts, and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub cross_contamination_risk: BTreeSet<Allergen>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MenuItem {
    /// Normalizes `tags` in place: trim, lowercase, drop empties.
    pub fn normalize_tags(&mut self) {
        self.tags = self
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
    }
}

/// A named, curated pairing of menu item ids. Carried as inert restaurant
/// metadata — no safety semantics, not tagged, filtered, or scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A restaurant's full menu: items plus combos, as persisted wholesale by the
/// menu store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    #[serde(default)]
    pub combos: Vec<Combo>,
}

/// Lifecycle state of a conversational session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Interrupted,
    Completed,
}

/// A conversational session between one user and the generator, scoped to
/// one restaurant and a fixed set of dietary constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub restaurant_id: String,
    #[serde(default)]
    pub hard_allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub preference_tags: Vec<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub last_assistant_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// True when `id` is empty — the store's sentinel for "not found", per
    /// the persistence contract (`loadSession` never returns an error for a
    /// missing key).
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// Deduplicates `preference_tags` (first occurrence wins) while preserving
/// order, mirroring `startSession`'s "duplicates ignored" rule.
pub fn dedup_preserve_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags {
        if seen.insert(tag.clone()) {
            out.push(tag);
        }
    }
    out
}
