use crate::backend::DocumentBackend;
use crate::document::Document;
use crate::error::{ModelError, ModelResult};
use crate::hooks::LifecycleHooks;
use crate::index::{IndexKind, IndexRegistry};
use crate::kv::KvClient;
use crate::query::{ListOptions, Query, QueryEngine};
use crate::sync::IndexSynchronizer;
use crate::values::FieldValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A document collection augmented with secondary indexes.
///
/// Composes the external document backend, the index synchronizer (installed
/// as the first lifecycle hook), and the query engine. Index declarations are
/// fixed at construction; the registry is immutable afterwards.
///
/// Lifecycle ordering per save: before_save hooks (uniqueness validation) run
/// strictly before the persistence write, after_save hooks (index mutation)
/// strictly after it, and the caller is notified last. An after_save error
/// therefore means the document is persisted but one or more indexes may be
/// stale until a corrective re-save.
pub struct Collection {
    name: String,
    registry: Arc<IndexRegistry>,
    kv: Arc<dyn KvClient>,
    backend: Arc<dyn DocumentBackend>,
    hooks: Vec<Arc<dyn LifecycleHooks>>,
    query: QueryEngine,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        registry: IndexRegistry,
        kv: Arc<dyn KvClient>,
        backend: Arc<dyn DocumentBackend>,
    ) -> Self {
        let name = name.into();
        let registry = Arc::new(registry);
        let synchronizer = Arc::new(IndexSynchronizer::new(
            name.clone(),
            registry.clone(),
            kv.clone(),
        ));
        let query = QueryEngine::new(name.clone(), registry.clone(), kv.clone());
        Self {
            name,
            registry,
            kv,
            backend,
            hooks: vec![synchronizer],
            query,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// Register an additional lifecycle hook. Hooks run in registration
    /// order at each stage, after the index synchronizer.
    pub fn add_hook(&mut self, hook: Arc<dyn LifecycleHooks>) {
        self.hooks.push(hook);
    }

    /// Create and persist a new document from raw attributes.
    ///
    /// The collection assigns the identifier; the returned document has
    /// rev 1 (first successful save).
    pub async fn create(&self, attrs: BTreeMap<String, FieldValue>) -> ModelResult<Document> {
        self.save(Document::generate(attrs)).await
    }

    /// Save a document, running the full lifecycle.
    pub async fn save(&self, mut doc: Document) -> ModelResult<Document> {
        let previous = self.backend.load(doc.id()).await?;
        for hook in &self.hooks {
            hook.before_save(&doc, previous.as_ref()).await?;
        }
        doc.bump_rev();
        self.backend.save(&doc).await?;
        for hook in &self.hooks {
            hook.after_save(&doc, previous.as_ref()).await?;
        }
        Ok(doc)
    }

    /// Load a document by id.
    pub async fn load(&self, id: &str) -> ModelResult<Option<Document>> {
        self.backend.load(id).await
    }

    /// Point lookup through a single unique-indexed field (or `id`, which
    /// delegates to a plain load).
    ///
    /// The query must hold exactly one entry. An absent unique entry is a
    /// successful None, not an error.
    pub async fn load_by(&self, query: &Query) -> ModelResult<Option<Document>> {
        let mut entries = query.iter();
        let (field, value) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(ModelError::InvalidQueryShape(
                    "load query must use a single indexed property".into(),
                ))
            }
        };
        if field == "id" {
            let id = value.as_str().ok_or_else(|| {
                ModelError::InvalidQueryShape(format!(
                    "non-string {} value for id",
                    value.type_name()
                ))
            })?;
            return self.load(id).await;
        }
        let desc = self
            .registry
            .descriptor_for(field)
            .filter(|d| d.kind() == IndexKind::Unique)
            .ok_or_else(|| ModelError::NonIndexedProperty(field.clone()))?;
        let segment = value.key_segment().ok_or_else(|| {
            ModelError::InvalidQueryShape(format!(
                "unindexable {} value for field {field}",
                value.type_name()
            ))
        })?;
        let key = desc.entry_key(&self.name, &segment)?;
        let holder = self
            .kv
            .get(&key)
            .await
            .map_err(|e| ModelError::store(format!("unique lookup on {field}"), e))?;
        match holder {
            Some(id) => self.backend.load(&id).await,
            None => Ok(None),
        }
    }

    /// Destroy a document. Index entries are removed after the document
    /// itself, from its last persisted field values.
    pub async fn destroy(&self, id: &str) -> ModelResult<()> {
        let doc = self
            .backend
            .destroy(id)
            .await?
            .ok_or_else(|| ModelError::DocumentNotFound(id.to_owned()))?;
        for hook in &self.hooks {
            hook.after_destroy(&doc).await?;
        }
        Ok(())
    }

    /// Resolve a query to bare document ids.
    ///
    /// Without a query and sort this passes through to the backend's id
    /// listing; otherwise the query engine intersects the index reads.
    pub async fn list_ids(
        &self,
        query: Option<&Query>,
        options: &ListOptions,
    ) -> ModelResult<Vec<String>> {
        let query = query.filter(|q| !q.is_empty());
        match query {
            None if options.sort.is_none() => {
                let ids = self.backend.list_ids().await?;
                let iter = ids.into_iter().skip(options.offset);
                Ok(match options.limit {
                    Some(n) => iter.take(n).collect(),
                    None => iter.collect(),
                })
            }
            Some(query) => self.query.resolve_ids(query, options).await,
            None => self.query.resolve_ids(&Query::new(), options).await,
        }
    }

    /// Resolve a query and hydrate the surviving ids in order.
    pub async fn list(
        &self,
        query: Option<&Query>,
        options: &ListOptions,
    ) -> ModelResult<Vec<Document>> {
        let ids = self.list_ids(query, options).await?;
        self.backend.load_many(&ids).await
    }
}
