//! Persistence collaborator for saved drafts

use crate::error::StorageError;
use crate::node::ExportInput;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Where saved content goes. The editor only needs `save`; reads are for callers and tests.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist `content` under `id`, returning the id actually stored
    async fn save(&self, id: &str, content: &ExportInput) -> Result<String, StorageError>;
    async fn load(&self, id: &str) -> Result<Option<ExportInput>, StorageError>;
}

/// In-memory store, cloned handles share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: Arc<Mutex<HashMap<String, ExportInput>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().map(|nodes| nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn save(&self, id: &str, content: &ExportInput) -> Result<String, StorageError> {
        let mut nodes = self
            .nodes
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        let mut stored = content.clone();
        stored.id = Some(id.to_string());
        nodes.insert(id.to_string(), stored);
        Ok(id.to_string())
    }

    async fn load(&self, id: &str) -> Result<Option<ExportInput>, StorageError> {
        let nodes = self
            .nodes
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        Ok(nodes.get(id).cloned())
    }
}
