//! External collaborator contracts the core consumes through narrow traits:
//! the session/menu persistence store, the image object store, and the
//! heuristic menu OCR — plus in-memory default implementations of each.
//! Grounded in `original_source/backend/internal/gcp/{store.go,storage.go}`
//! and the teacher's `crates/sessions/src/store.rs` `RwLock<HashMap>` shape.

mod image_store;
mod memory_store;
mod menu_extractor;

pub use image_store::{ImageStore, InMemoryImageStore};
pub use memory_store::InMemorySessionStore;
pub use menu_extractor::{HeuristicMenuExtractor, MenuExtractor};

use async_trait::async_trait;
use concierge_domain::{MenuItem, Result, Session};

/// Persistence contract any backing store must implement. Missing keys never
/// error — `load_session` returns a zero-valued session with an empty `id`
/// (callers treat that as not-found); `load_menu_safety_metadata` returns an
/// empty vec.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_prompt(&self, session_id: &str, prompt: &str) -> Result<()>;
    async fn save_session(&self, session: Session) -> Result<()>;
    async fn load_session(&self, session_id: &str) -> Result<Session>;
    async fn save_menu_safety_metadata(&self, restaurant_id: &str, items: Vec<MenuItem>) -> Result<()>;
    async fn load_menu_safety_metadata(&self, restaurant_id: &str) -> Result<Vec<MenuItem>>;
    async fn save_image_reference(&self, session_id: &str, image_path: &str) -> Result<()>;
    async fn close(&self) -> Result<()>;
}
