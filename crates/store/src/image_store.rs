use std::collections::HashMap;

use async_trait::async_trait;
use concierge_domain::Result;
use parking_lot::RwLock;

/// Image object store contract: blob put with URI return. Grounded in
/// `original_source/backend/internal/gcp/storage.go`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save_session_image(&self, session_id: &str, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// Local default: keeps bytes in memory, returns a `memory://` URI mirroring
/// the original's `MemoryImageStore`.
#[derive(Default)]
pub struct InMemoryImageStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn save_session_image(&self, session_id: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
        let uri = format!("memory://{session_id}/{file_name}");
        self.blobs.write().insert(uri.clone(), bytes.to_vec());
        Ok(uri)
    }
}
