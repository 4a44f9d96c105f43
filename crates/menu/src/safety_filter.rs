use std::collections::BTreeSet;

use concierge_domain::{Allergen, MenuItem};

use crate::tag_engine::preference_score;

const CROSS_CONTAMINATION_WARNING: &str = "Some items were excluded due to cross-contamination risk.";
const DIETARY_WARNING: &str = "Some menu items were excluded because they did not satisfy required dietary tags.";
const HARD_ALLERGEN_WARNING: &str = "Some menu items were removed by hard allergen filters.";

/// Filters `items` against `hard_allergens` and `preference_tags`, returning
/// the allowed subset plus an advisory warning (empty if none applies).
///
/// Pure: no I/O, no state, no error kinds.
pub fn apply(
    items: &[MenuItem],
    hard_allergens: &BTreeSet<Allergen>,
    preference_tags: &[String],
) -> (Vec<MenuItem>, String) {
    let direct: Vec<MenuItem> = items
        .iter()
        .filter(|item| item.allergens.is_disjoint(hard_allergens))
        .cloned()
        .collect();

    let mut cross_contamination_excluded = false;
    let after_hard_pass: Vec<MenuItem> = direct
        .into_iter()
        .filter(|item| {
            let clear = item.cross_contamination_risk.is_disjoint(hard_allergens);
            if !clear {
                cross_contamination_excluded = true;
            }
            clear
        })
        .collect();

    let hard_allergen_shrink = after_hard_pass.len() < items.len();

    let mut dietary_excluded = false;
    let allowed = if preference_tags.is_empty() {
        after_hard_pass
    } else {
        let required: Vec<String> = preference_tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let before_len = after_hard_pass.len();
        let mut dietary_filtered: Vec<MenuItem> = after_hard_pass
            .into_iter()
            .filter(|item| {
                let item_tags: BTreeSet<String> = item.tags.iter().map(|t| t.to_lowercase()).collect();
                required.iter().all(|p| item_tags.contains(p))
            })
            .collect();
        dietary_excluded = dietary_filtered.len() < before_len;

        dietary_filtered.sort_by(|a, b| {
            preference_score(b, preference_tags).cmp(&preference_score(a, preference_tags))
        });
        dietary_filtered
    };

    let warning = if cross_contamination_excluded {
        CROSS_CONTAMINATION_WARNING
    } else if dietary_excluded {
        DIETARY_WARNING
    } else if hard_allergen_shrink {
        HARD_ALLERGEN_WARNING
    } else {
        ""
    };

    (allowed, warning.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, allergens: &[Allergen], cross_contam: &[Allergen], tags: &[&str]) -> MenuItem {
        MenuItem {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: String::new(),
            allergens: allergens.iter().copied().collect(),
            cross_contamination_risk: cross_contam.iter().copied().collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image_url: None,
        }
    }

    #[test]
    fn s1_allergen_filter_and_cross_contamination_warning() {
        let menu = vec![
            item("Peanut Curry", &[Allergen::Peanut], &[], &[]),
            item("House Salad", &[], &[], &["vegan"]),
            item("Fries", &[], &[Allergen::Peanut], &["vegan"]),
        ];
        let hard_allergens = BTreeSet::from([Allergen::Peanut]);
        let (allowed, warning) = apply(&menu, &hard_allergens, &["vegan".to_string()]);
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].name, "House Salad");
        assert_eq!(warning, CROSS_CONTAMINATION_WARNING);
    }

    #[test]
    fn s2_dietary_hardness() {
        let menu = vec![
            item("Halal Salad", &[], &[], &["halal", "no-pork", "no-lard"]),
            item("Pork Ramen", &[], &[], &["spicy"]),
        ];
        let (allowed, warning) = apply(
            &menu,
            &BTreeSet::new(),
            &["halal".to_string(), "no-pork".to_string()],
        );
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].name, "Halal Salad");
        assert!(!warning.is_empty());
    }

    #[test]
    fn s7_empty_allowed_when_only_item_excluded() {
        let menu = vec![item("Peanut Dish", &[Allergen::Peanut], &[], &[])];
        let hard_allergens = BTreeSet::from([Allergen::Peanut]);
        let (allowed, warning) = apply(&menu, &hard_allergens, &[]);
        assert!(allowed.is_empty());
        assert_eq!(warning, HARD_ALLERGEN_WARNING);
    }

    #[test]
    fn preference_ordering_is_stable_among_equal_scores() {
        let menu = vec![
            item("A", &[], &[], &["vegan"]),
            item("B", &[], &[], &["vegan"]),
            item("C", &[], &[], &["vegan", "halal"]),
        ];
        let (allowed, _) = apply(&menu, &BTreeSet::new(), &["vegan".to_string()]);
        assert_eq!(allowed[0].name, "C");
        assert_eq!(allowed[1].name, "A");
        assert_eq!(allowed[2].name, "B");
    }

    #[test]
    fn safety_completeness_invariant_holds_over_allergen_combinations() {
        let menu = vec![
            item("Shellfish Bisque", &[Allergen::Shellfish], &[], &[]),
            item("Egg Tart", &[Allergen::Egg], &[Allergen::Wheat], &[]),
            item("Clear Broth", &[], &[], &[]),
        ];
        let hard_allergens = BTreeSet::from([Allergen::Shellfish, Allergen::Wheat]);
        let (allowed, _) = apply(&menu, &hard_allergens, &[]);
        for allowed_item in &allowed {
            assert!(allowed_item.allergens.is_disjoint(&hard_allergens));
            assert!(allowed_item.cross_contamination_risk.is_disjoint(&hard_allergens));
        }
    }
}
