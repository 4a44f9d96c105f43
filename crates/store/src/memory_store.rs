use std::collections::HashMap;

use async_trait::async_trait;
use concierge_domain::{MenuItem, Result, Session};
use parking_lot::RwLock;

use crate::SessionStore;

/// Local, process-local default implementation of [`SessionStore`]. Hands
/// out copies of everything it stores; writers copy inputs before storing —
/// the shared-resource policy from the concurrency model.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    menu_by_restaurant: RwLock<HashMap<String, Vec<MenuItem>>>,
    images: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_prompt(&self, session_id: &str, prompt: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| Session {
            id: String::new(),
            restaurant_id: String::new(),
            hard_allergens: Default::default(),
            preference_tags: Vec::new(),
            status: concierge_domain::SessionStatus::Active,
            last_assistant_message: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });
        entry.last_assistant_message = prompt.to_string();
        Ok(())
    }

    async fn save_session(&self, session: Session) -> Result<()> {
        self.sessions.write().insert(session.id.clone(), session);
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<Session> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| Session {
                id: String::new(),
                restaurant_id: String::new(),
                hard_allergens: Default::default(),
                preference_tags: Vec::new(),
                status: concierge_domain::SessionStatus::Active,
                last_assistant_message: String::new(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            }))
    }

    async fn save_menu_safety_metadata(&self, restaurant_id: &str, items: Vec<MenuItem>) -> Result<()> {
        self.menu_by_restaurant
            .write()
            .insert(restaurant_id.to_string(), items);
        Ok(())
    }

    async fn load_menu_safety_metadata(&self, restaurant_id: &str) -> Result<Vec<MenuItem>> {
        Ok(self
            .menu_by_restaurant
            .read()
            .get(restaurant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_image_reference(&self, session_id: &str, image_path: &str) -> Result<()> {
        self.images
            .write()
            .entry(session_id.to_string())
            .or_default()
            .push(image_path.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_domain::SessionStatus;

    #[tokio::test]
    async fn load_session_on_missing_key_returns_empty_id() {
        let store = InMemorySessionStore::new();
        let session = store.load_session("nope").await.unwrap();
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemorySessionStore::new();
        let session = Session {
            id: "abc123".to_string(),
            restaurant_id: "r1".to_string(),
            hard_allergens: Default::default(),
            preference_tags: vec!["vegan".to_string()],
            status: SessionStatus::Active,
            last_assistant_message: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        store.save_session(session.clone()).await.unwrap();
        let loaded = store.load_session("abc123").await.unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn menu_metadata_round_trips_and_missing_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.load_menu_safety_metadata("r1").await.unwrap().is_empty());
        let items = vec![];
        store.save_menu_safety_metadata("r1", items.clone()).await.unwrap();
        assert_eq!(store.load_menu_safety_metadata("r1").await.unwrap(), items);
    }

    #[tokio::test]
    async fn save_image_reference_appends_per_session() {
        let store = InMemorySessionStore::new();
        store.save_image_reference("s1", "memory://s1/a.png").await.unwrap();
        store.save_image_reference("s1", "memory://s1/b.png").await.unwrap();
        assert_eq!(store.images.read().get("s1").unwrap().len(), 2);
    }
}
