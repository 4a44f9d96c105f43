//! The turn pipeline (C3): validate, assemble bounded model input, consult
//! the reply cache, invoke the generator, persist. Grounded in
//! `original_source/backend/internal/agent/runtime.go`'s `Runtime.Respond`.

use std::collections::HashMap;
use std::sync::Arc;

use concierge_domain::{Error, Result};
use concierge_generator::TextGenerator;
use concierge_store::SessionStore;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

const MAX_MENU_ITEMS: usize = 8;
const MAX_ITEM_LENGTH: usize = 80;

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Owns the per-instance, process-local reply cache and the generator/store
/// collaborators. Never a singleton — each `SessionManager` constructs its
/// own, so independent instances in tests never share a cache.
pub struct TurnPipeline {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn SessionStore>,
    model_name: String,
    cache: RwLock<HashMap<String, String>>,
}

impl TurnPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, store: Arc<dyn SessionStore>, model_name: impl Into<String>) -> Self {
        Self {
            generator,
            store,
            model_name: model_name.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Selects at most the first 8 non-empty-after-trim entries from
    /// `menu_names`, each truncated to 80 bytes, and assembles the model
    /// input around `prompt`.
    fn assemble_model_input(prompt: &str, menu_names: &[String]) -> String {
        let relevant: Vec<&str> = menu_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| truncate_bytes(n, MAX_ITEM_LENGTH))
            .take(MAX_MENU_ITEMS)
            .collect();

        if relevant.is_empty() {
            return prompt.to_string();
        }

        format!(
            "{prompt}\n\nOnly use these relevant menu options for reasoning:\n- {}",
            relevant.join("\n- ")
        )
    }

    /// `respond(cancellationToken, sessionId, prompt, menuNames) -> reply`.
    pub async fn respond(
        &self,
        cancellation: CancellationToken,
        session_id: &str,
        prompt: &str,
        menu_names: &[String],
    ) -> Result<String> {
        let trimmed_prompt = prompt.trim();
        if trimmed_prompt.is_empty() {
            return Err(Error::InvalidInput("prompt must not be empty".to_string()));
        }

        let model_input = Self::assemble_model_input(trimmed_prompt, menu_names);

        if let Some(cached) = self.cache.read().get(&model_input).cloned() {
            tracing::debug!(session_id, cache_hit = true, "turn cache hit, skipping generator call");
            self.store.save_prompt(session_id, trimmed_prompt).await?;
            return Ok(cached);
        }

        tracing::info!(session_id, model = %self.model_name, cache_hit = false, "invoking text generator");
        let reply = self
            .generator
            .generate(cancellation, &self.model_name, &model_input)
            .await?;

        self.cache.write().insert(model_input, reply.clone());
        self.store.save_prompt(session_id, trimmed_prompt).await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_store::InMemorySessionStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, _cancellation: CancellationToken, _model_name: &str, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("reply to: {prompt}"))
        }
    }

    #[tokio::test]
    async fn s6_cache_avoids_second_generator_call() {
        let generator = Arc::new(CountingGenerator { calls: AtomicUsize::new(0) });
        let store = Arc::new(InMemorySessionStore::new());
        let pipeline = TurnPipeline::new(generator.clone(), store, "test-model");

        let menu_names = vec!["House Salad".to_string()];
        let first = pipeline
            .respond(CancellationToken::new(), "s1", "what's vegan?", &menu_names)
            .await
            .unwrap();
        let second = pipeline
            .respond(CancellationToken::new(), "s1", "what's vegan?", &menu_names)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_prompt_fails_validation() {
        let generator = Arc::new(CountingGenerator { calls: AtomicUsize::new(0) });
        let store = Arc::new(InMemorySessionStore::new());
        let pipeline = TurnPipeline::new(generator, store, "test-model");
        let err = pipeline
            .respond(CancellationToken::new(), "s1", "   ", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn assembles_bounded_menu_context() {
        let names: Vec<String> = (0..20).map(|i| format!("Item {i}")).collect();
        let input = TurnPipeline::assemble_model_input("hi", &names);
        assert!(input.contains("Item 0"));
        assert!(!input.contains("Item 8"));
    }

    #[tokio::test]
    async fn empty_menu_names_leaves_prompt_untouched() {
        let input = TurnPipeline::assemble_model_input("hi there", &[]);
        assert_eq!(input, "hi there");
    }

    #[tokio::test]
    async fn cache_hit_still_persists_prompt() {
        let generator = Arc::new(CountingGenerator { calls: AtomicUsize::new(0) });
        let store = Arc::new(InMemorySessionStore::new());
        let pipeline = TurnPipeline::new(generator, store.clone(), "test-model");
        pipeline
            .respond(CancellationToken::new(), "s1", "hello", &[])
            .await
            .unwrap();
        pipeline
            .respond(CancellationToken::new(), "s1", "hello", &[])
            .await
            .unwrap();
        let session = store.load_session("s1").await.unwrap();
        assert_eq!(session.last_assistant_message, "hello");
    }
}
