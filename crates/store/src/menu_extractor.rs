use async_trait::async_trait;
use concierge_domain::{MenuItem, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Heuristic OCR stand-in, invoked only for onboarding. Grounded 1:1 in
/// `original_source/backend/internal/agent/menu_extraction.go`.
#[async_trait]
pub trait MenuExtractor: Send + Sync {
    async fn extract_menu_items(&self, content: &[u8]) -> Result<Vec<MenuItem>>;
}

fn menu_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)[a-z][a-z0-9\s,&'/-]{2,}").unwrap())
}

/// Lightweight local fallback: treats each line of the uploaded content as a
/// candidate menu item name if it matches a loose "looks like a dish name"
/// pattern, truncates to 80 bytes, dedupes case-insensitively, and caps
/// output at 12 items.
#[derive(Default)]
pub struct HeuristicMenuExtractor;

impl HeuristicMenuExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MenuExtractor for HeuristicMenuExtractor {
    async fn extract_menu_items(&self, content: &[u8]) -> Result<Vec<MenuItem>> {
        let text = String::from_utf8_lossy(content);
        let pattern = menu_line_pattern();
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for line in text.split('\n') {
            let candidate = line.trim();
            if !pattern.is_match(candidate) {
                continue;
            }
            let collapsed = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
            let truncated = truncate_bytes(&collapsed, 80);
            let key = truncated.to_lowercase();
            if !seen.insert(key) {
                continue;
            }
            items.push(MenuItem {
                id: slugify(&truncated),
                name: truncated,
                description: "Auto-extracted from uploaded menu image. Review before publishing.".to_string(),
                allergens: Default::default(),
                cross_contamination_risk: Default::default(),
                tags: Default::default(),
                image_url: None,
            });
            if items.len() == 12 {
                break;
            }
        }

        Ok(items)
    }
}

fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn slugify(v: &str) -> String {
    let lower = v.trim().to_lowercase().replace(' ', "-");
    lower
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
