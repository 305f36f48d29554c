use crate::document::Document;
use crate::error::ModelResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// The underlying document collection, consumed at its interface boundary.
///
/// Owns raw document persistence by identifier; the index layer never writes
/// documents itself. `load_many` returns documents in the requested id order,
/// skipping any that are missing.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn save(&self, doc: &Document) -> ModelResult<()>;

    async fn load(&self, id: &str) -> ModelResult<Option<Document>>;

    /// Remove a document, returning its last persisted state if it existed.
    async fn destroy(&self, id: &str) -> ModelResult<Option<Document>>;

    async fn load_many(&self, ids: &[String]) -> ModelResult<Vec<Document>>;

    /// All document ids, in id order.
    async fn list_ids(&self) -> ModelResult<Vec<String>>;
}

/// In-process backend persisting documents as JSON, keyed by id.
///
/// UUID v7 ids are time-ordered, so id order doubles as insertion order for
/// generated documents.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    docs: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn save(&self, doc: &Document) -> ModelResult<()> {
        let raw = serde_json::to_string(doc)?;
        self.lock().insert(doc.id().to_owned(), raw);
        Ok(())
    }

    async fn load(&self, id: &str) -> ModelResult<Option<Document>> {
        let raw = self.lock().get(id).cloned();
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn destroy(&self, id: &str) -> ModelResult<Option<Document>> {
        let raw = self.lock().remove(id);
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn load_many(&self, ids: &[String]) -> ModelResult<Vec<Document>> {
        let docs = self.lock();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(raw) = docs.get(id) {
                out.push(serde_json::from_str(raw)?);
            }
        }
        Ok(out)
    }

    async fn list_ids(&self) -> ModelResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[tokio::test]
    async fn save_load_destroy() {
        let backend = MemoryBackend::new();
        let doc = Document::new("d1", attrs! { "name" => "Alice" });
        backend.save(&doc).await.unwrap();

        let loaded = backend.load("d1").await.unwrap().unwrap();
        assert_eq!(loaded, doc);

        let removed = backend.destroy("d1").await.unwrap().unwrap();
        assert_eq!(removed, doc);
        assert_eq!(backend.load("d1").await.unwrap(), None);
        assert_eq!(backend.destroy("d1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_many_preserves_order_and_skips_missing() {
        let backend = MemoryBackend::new();
        for id in ["a", "b", "c"] {
            backend
                .save(&Document::new(id, attrs! { "tag" => id }))
                .await
                .unwrap();
        }

        let ids = vec!["c".to_string(), "ghost".to_string(), "a".to_string()];
        let docs = backend.load_many(&ids).await.unwrap();
        let got: Vec<&str> = docs.iter().map(Document::id).collect();
        assert_eq!(got, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn list_ids_in_id_order() {
        let backend = MemoryBackend::new();
        for id in ["b", "a", "c"] {
            backend.save(&Document::new(id, attrs! {})).await.unwrap();
        }
        assert_eq!(backend.list_ids().await.unwrap(), vec!["a", "b", "c"]);
    }
}
