use std::collections::BTreeSet;

use concierge_domain::MenuItem;

struct TagRule {
    tag: &'static str,
    keywords: &'static [&'static str],
}

const TAG_RULES: &[TagRule] = &[
    TagRule { tag: "halal", keywords: &["halal"] },
    TagRule { tag: "no-pork", keywords: &["no pork", "without pork", "pork-free"] },
    TagRule { tag: "no-beef", keywords: &["no beef", "without beef", "beef-free"] },
    TagRule { tag: "no-lard", keywords: &["no lard", "without lard", "lard-free"] },
    TagRule { tag: "vegetarian", keywords: &["vegetarian"] },
    TagRule { tag: "vegan", keywords: &["vegan", "plant-based"] },
    TagRule { tag: "gluten-free", keywords: &["gluten free", "gluten-free"] },
    TagRule { tag: "dairy-free", keywords: &["dairy free", "dairy-free"] },
    TagRule { tag: "nut-free", keywords: &["nut free", "nut-free", "peanut-free"] },
];

/// Normalizes `item`'s existing tags, scans name/description/existing-tags
/// for keyword matches, adds any matching rule tag, then drops any tag that
/// contradicts an allergen present on the item.
pub fn suggest_tags(item: &MenuItem) -> BTreeSet<String> {
    let mut tags: BTreeSet<String> = item
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let existing_joined = tags.iter().cloned().collect::<Vec<_>>().join(" ");
    let search_text = format!("{} {} {}", item.name, item.description, existing_joined).to_lowercase();

    for rule in TAG_RULES {
        if rule.keywords.iter().any(|kw| search_text.contains(kw)) {
            tags.insert(rule.tag.to_string());
        }
    }

    for allergen in &item.allergens {
        if let Some(contradicting) = allergen.contradicting_tag() {
            tags.remove(contradicting);
        }
    }

    tags
}

/// Applies `suggest_tags` to each item, replacing its tags, preserving order.
pub fn enrich_all(items: &mut [MenuItem]) {
    for item in items.iter_mut() {
        item.tags = suggest_tags(item);
    }
}

/// Case-insensitive count of matches between `preference_tags` and
/// `item.tags`. Used only as a sort key by the safety filter.
pub fn preference_score(item: &MenuItem, preference_tags: &[String]) -> usize {
    let item_tags: BTreeSet<String> = item.tags.iter().map(|t| t.to_lowercase()).collect();
    preference_tags
        .iter()
        .filter(|p| item_tags.contains(&p.to_lowercase()))
        .count()
}
