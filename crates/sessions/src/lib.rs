//! The session manager (C4): owns session lifecycle and the `TurnRegistry`,
//! serializing at-most-one in-flight turn per session with
//! replace-on-new-send cancellation. Grounded in
//! `original_source/backend/internal/agent/concierge.go`'s
//! `ConciergeService`.

mod registry;

pub use registry::TurnRegistry;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use concierge_domain::{Allergen, Error, Result, Session, SessionStatus};
use concierge_generator::TextGenerator;
use concierge_store::SessionStore;
use concierge_turn::TurnPipeline;
use tokio_util::sync::CancellationToken;

const DISCLAIMER: &str = "I cannot confidently guarantee safety for that request. Please confirm ingredients and cross-contamination policy with restaurant staff before ordering.";
const INTERRUPTED_REPLY: &str = "response interrupted, ready for your next request";

fn generate_session_id() -> String {
    // 8 random bytes, hex-encoded (16 hex chars) — drawn from a v4 UUID
    // rather than adding a standalone `rand` dependency, since `uuid` (with
    // its own CSPRNG-backed v4 generation) is already a workspace crate.
    let uuid = uuid::Uuid::new_v4();
    hex::encode(&uuid.as_bytes()[..8])
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    turn_pipeline: TurnPipeline,
    registry: TurnRegistry,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, generator: Arc<dyn TextGenerator>, model_name: impl Into<String>) -> Self {
        let turn_pipeline = TurnPipeline::new(generator, store.clone(), model_name);
        Self {
            store,
            turn_pipeline,
            registry: TurnRegistry::new(),
        }
    }

    pub async fn start_session(
        &self,
        restaurant_id: &str,
        hard_allergens: BTreeSet<Allergen>,
        preference_tags: Vec<String>,
    ) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: generate_session_id(),
            restaurant_id: restaurant_id.to_string(),
            hard_allergens,
            preference_tags: concierge_domain::dedup_preserve_order(preference_tags),
            status: SessionStatus::Active,
            last_assistant_message: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.save_session(session.clone()).await?;
        tracing::info!(session_id = %session.id, restaurant_id, "session started");
        Ok(session)
    }

    /// `sendMessage(cancellationToken, sessionId, prompt) -> reply`.
    ///
    /// Sending against a `completed` session is accepted, not rejected: the
    /// turn runs normally and the session is left `active` afterward,
    /// mirroring the original `ConciergeService`, which never gates on
    /// `status` before running a turn.
    pub async fn send_message(&self, caller_token: CancellationToken, session_id: &str, prompt: &str) -> Result<String> {
        let mut session = self.store.load_session(session_id).await?;
        if session.is_empty() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }

        // A missing restaurant menu conflates with a seeded-but-empty one —
        // the in-memory store returns an empty vec for both, and that is
        // intentional here (spec.md §9's "menu missing vs empty").
        let menu = self.store.load_menu_safety_metadata(&session.restaurant_id).await?;
        let (allowed, warning) = concierge_menu::apply(&menu, &session.hard_allergens, &session.preference_tags);

        if allowed.is_empty() {
            return Ok(DISCLAIMER.to_string());
        }
        let menu_names: Vec<String> = allowed.into_iter().map(|item| item.name).collect();

        let turn_token = CancellationToken::new();
        let generation = self.registry.register(session_id, turn_token.clone());

        // The per-turn token must be cancellable by either source: the
        // caller's own deadline/disconnect, or a concurrent `interrupt`
        // acting on the registry entry directly. A watcher task folds the
        // caller token's cancellation into the registry-held token; it exits
        // as soon as either fires.
        let watcher_token = turn_token.clone();
        let watcher_caller = caller_token.clone();
        let watcher = tokio::spawn(async move {
            tokio::select! {
                _ = watcher_caller.cancelled() => watcher_token.cancel(),
                _ = watcher_token.cancelled() => {}
            }
        });

        let result = self
            .turn_pipeline
            .respond(turn_token.clone(), session_id, prompt, &menu_names)
            .await;

        turn_token.cancel();
        let _ = watcher.await;
        self.registry.deregister(session_id, generation);

        match result {
            Ok(mut reply) => {
                if !warning.is_empty() {
                    reply.push_str(&format!("\n\nSafety note: {warning}"));
                }
                session.status = SessionStatus::Active;
                session.last_assistant_message = reply.clone();
                session.updated_at = Utc::now();
                self.store.save_session(session).await?;
                Ok(reply)
            }
            Err(err) if err.is_cancelled() => Ok(INTERRUPTED_REPLY.to_string()),
            Err(err) => Err(err),
        }
    }

    /// `interrupt(sessionId)`: idempotent from `interrupted` — cancels any
    /// in-flight turn (already absent in that case) and sets `status =
    /// interrupted` regardless.
    pub async fn interrupt(&self, session_id: &str) -> Result<()> {
        self.registry.cancel(session_id);

        let mut session = self.store.load_session(session_id).await?;
        if session.is_empty() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        session.status = SessionStatus::Interrupted;
        session.updated_at = Utc::now();
        self.store.save_session(session).await?;
        Ok(())
    }

    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        let mut session = self.store.load_session(session_id).await?;
        if session.is_empty() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        session.status = SessionStatus::Completed;
        session.updated_at = Utc::now();
        self.store.save_session(session).await?;
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let session = self.store.load_session(session_id).await?;
        if session.is_empty() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_domain::MenuItem;
    use concierge_store::InMemorySessionStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Blocks on its cancellation token the first time it's called, then
    /// returns the cancellation error; every later call returns normally —
    /// mirrors the Go test suite's `blockingClient`
    /// (`concierge_resiliency_test.go`) used to exercise the interrupt and
    /// registry-replace paths without hanging a second, unrelated turn.
    struct BlockingGenerator {
        started: Arc<Notify>,
        blocked_once: AtomicBool,
    }

    impl BlockingGenerator {
        fn new(started: Arc<Notify>) -> Self {
            Self { started, blocked_once: AtomicBool::new(false) }
        }
    }

    #[async_trait]
    impl TextGenerator for BlockingGenerator {
        async fn generate(&self, cancellation: CancellationToken, _model_name: &str, prompt: &str) -> Result<String> {
            if !self.blocked_once.swap(true, Ordering::SeqCst) {
                self.started.notify_one();
                cancellation.cancelled().await;
                Err(Error::Cancelled)
            } else {
                Ok(format!("reply to: {prompt}"))
            }
        }
    }

    fn allergen_free_menu_item(name: &str) -> MenuItem {
        MenuItem {
            id: name.to_lowercase(),
            name: name.to_string(),
            description: String::new(),
            allergens: BTreeSet::new(),
            cross_contamination_risk: BTreeSet::new(),
            tags: BTreeSet::new(),
            image_url: None,
        }
    }

    async fn seeded_manager(generator: Arc<dyn TextGenerator>) -> (SessionManager, Arc<InMemorySessionStore>, Session) {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .save_menu_safety_metadata("r1", vec![allergen_free_menu_item("House Salad")])
            .await
            .unwrap();
        let manager = SessionManager::new(store.clone(), generator, "test-model");
        let session = manager.start_session("r1", BTreeSet::new(), vec![]).await.unwrap();
        (manager, store, session)
    }

    #[tokio::test]
    async fn start_session_creates_active_session_with_matching_timestamps() {
        let (_manager, _store, session) = seeded_manager(Arc::new(concierge_generator::EchoGenerator::new())).await;
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.created_at, session.updated_at);
        assert_eq!(session.id.len(), 16);
    }

    #[tokio::test]
    async fn s7_empty_allowed_returns_fixed_disclaimer_without_generating() {
        let store = Arc::new(InMemorySessionStore::new());
        // no menu seeded for "r1": empty menu -> empty allowed set
        let generator = Arc::new(concierge_generator::EchoGenerator::new());
        let manager = SessionManager::new(store, generator, "test-model");
        let session = manager.start_session("r1", BTreeSet::new(), vec![]).await.unwrap();

        let reply = manager
            .send_message(CancellationToken::new(), &session.id, "what's safe?")
            .await
            .unwrap();
        assert_eq!(reply, DISCLAIMER);
    }

    #[tokio::test]
    async fn send_message_appends_safety_note_when_warning_non_empty() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut risky = allergen_free_menu_item("Fries");
        risky.cross_contamination_risk = BTreeSet::from([Allergen::Peanut]);
        store.save_menu_safety_metadata("r1", vec![allergen_free_menu_item("Salad"), risky]).await.unwrap();
        let generator = Arc::new(concierge_generator::EchoGenerator::new());
        let manager = SessionManager::new(store, generator, "test-model");
        let session = manager
            .start_session("r1", BTreeSet::from([Allergen::Peanut]), vec![])
            .await
            .unwrap();

        let reply = manager.send_message(CancellationToken::new(), &session.id, "hi").await.unwrap();
        assert!(reply.contains("Safety note:"));
    }

    #[tokio::test]
    async fn s5_interrupt_path_returns_interrupted_reply_and_session_is_interrupted() {
        let started = Arc::new(Notify::new());
        let generator = Arc::new(BlockingGenerator::new(started.clone()));
        let (manager, _store, session) = seeded_manager(generator).await;

        let manager = Arc::new(manager);
        let send_manager = manager.clone();
        let session_id = session.id.clone();
        let send_task = tokio::spawn(async move {
            send_manager
                .send_message(CancellationToken::new(), &session_id, "hello")
                .await
        });

        started.notified().await;
        manager.interrupt(&session.id).await.unwrap();

        let reply = send_task.await.unwrap().unwrap();
        assert_eq!(reply, INTERRUPTED_REPLY);

        let refreshed = manager.get_session(&session.id).await.unwrap();
        assert_eq!(refreshed.status, SessionStatus::Interrupted);
    }

    #[tokio::test]
    async fn p_registry_replace_cancels_the_displaced_turn() {
        let started = Arc::new(Notify::new());
        let generator = Arc::new(BlockingGenerator::new(started.clone()));
        let (manager, _store, session) = seeded_manager(generator).await;
        let manager = Arc::new(manager);

        let first_manager = manager.clone();
        let first_session = session.id.clone();
        let first = tokio::spawn(async move {
            first_manager
                .send_message(CancellationToken::new(), &first_session, "first")
                .await
        });

        started.notified().await;

        let second_reply = manager
            .send_message(CancellationToken::new(), &session.id, "second")
            .await
            .unwrap();

        let first_reply = first.await.unwrap().unwrap();
        assert_eq!(first_reply, INTERRUPTED_REPLY);
        assert!(second_reply.contains("reply to: second"));
    }

    #[tokio::test]
    async fn p_end_send_after_completed_session_succeeds_and_reactivates() {
        let (manager, _store, session) = seeded_manager(Arc::new(concierge_generator::EchoGenerator::new())).await;
        manager.end_session(&session.id).await.unwrap();

        let reply = manager.send_message(CancellationToken::new(), &session.id, "hi again").await.unwrap();
        assert!(reply.contains("received and processed"));

        let refreshed = manager.get_session(&session.id).await.unwrap();
        assert_eq!(refreshed.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn interrupt_is_idempotent_from_interrupted() {
        let (manager, _store, session) = seeded_manager(Arc::new(concierge_generator::EchoGenerator::new())).await;
        manager.interrupt(&session.id).await.unwrap();
        manager.interrupt(&session.id).await.unwrap();
        let refreshed = manager.get_session(&session.id).await.unwrap();
        assert_eq!(refreshed.status, SessionStatus::Interrupted);
    }

    #[tokio::test]
    async fn get_session_on_unknown_id_fails_not_found() {
        let (manager, _store, _session) = seeded_manager(Arc::new(concierge_generator::EchoGenerator::new())).await;
        let err = manager.get_session("does-not-exist").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn send_message_times_out_via_caller_token_without_hanging_forever() {
        let started = Arc::new(Notify::new());
        let generator = Arc::new(BlockingGenerator::new(started.clone()));
        let (manager, _store, session) = seeded_manager(generator).await;

        let caller_token = CancellationToken::new();
        let caller_token_clone = caller_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            caller_token_clone.cancel();
        });

        let reply = manager.send_message(caller_token, &session.id, "hi").await.unwrap();
        assert_eq!(reply, INTERRUPTED_REPLY);
    }
}
