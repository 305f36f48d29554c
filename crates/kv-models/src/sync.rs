use crate::document::Document;
use crate::error::{ModelError, ModelResult};
use crate::hooks::LifecycleHooks;
use crate::index::{IndexDescriptor, IndexKind, IndexRegistry};
use crate::kv::KvClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Keeps a collection's index structures consistent with document writes.
///
/// Runs as a lifecycle hook: the uniqueness check happens before the document
/// is persisted, all index mutation strictly after. Post-save mutation
/// failures surface to the save's caller while the document write stands, so
/// an index can be left stale until a corrective re-save; callers are told.
///
/// Uniqueness guarantee: the pre-save GET check plus a SETNX claim on the
/// post-save write. Two saves racing for one value can still both pass the
/// check, but at most one wins the claim; the loser's save returns
/// `DuplicateKey` after its document write. The window between check and
/// claim is narrowed, not eliminated.
pub struct IndexSynchronizer {
    collection: String,
    registry: Arc<IndexRegistry>,
    kv: Arc<dyn KvClient>,
}

impl IndexSynchronizer {
    pub fn new(
        collection: impl Into<String>,
        registry: Arc<IndexRegistry>,
        kv: Arc<dyn KvClient>,
    ) -> Self {
        Self {
            collection: collection.into(),
            registry,
            kv,
        }
    }

    /// Scalar key segment for a unique field, which must be present.
    fn unique_segment(&self, desc: &IndexDescriptor, doc: &Document) -> ModelResult<String> {
        desc.value_segment(doc.get(desc.field()))
            .ok_or_else(|| ModelError::MissingIndexedProperty(desc.field().to_owned()))
    }

    async fn claim_unique(&self, desc: &IndexDescriptor, doc: &Document) -> ModelResult<()> {
        let field = desc.field();
        let segment = self.unique_segment(desc, doc)?;
        let key = desc.entry_key(&self.collection, &segment)?;
        let claimed = self
            .kv
            .set_nx(&key, doc.id())
            .await
            .map_err(|e| ModelError::store(format!("unique claim on {field}"), e))?;
        if claimed {
            debug!(collection = %self.collection, field, id = %doc.id(), "claimed unique entry");
            return Ok(());
        }
        // Lost the claim; fine if the holder is this document (re-save).
        let holder = self
            .kv
            .get(&key)
            .await
            .map_err(|e| ModelError::store(format!("unique claim on {field}"), e))?;
        match holder {
            Some(id) if id == doc.id() => Ok(()),
            _ => Err(ModelError::DuplicateKey(field.to_owned())),
        }
    }

    async fn sync_set(
        &self,
        desc: &IndexDescriptor,
        doc: &Document,
        previous: Option<&Document>,
    ) -> ModelResult<()> {
        let field = desc.field();
        let new_segment = desc.value_segment(doc.get(field));
        let old_segment = previous.and_then(|prev| desc.value_segment(prev.get(field)));

        if let Some(old) = &old_segment {
            if new_segment.as_deref() != Some(old.as_str()) {
                let old_key = desc.entry_key(&self.collection, old)?;
                self.kv
                    .srem(&old_key, doc.id())
                    .await
                    .map_err(|e| ModelError::store(format!("set removal on {field}"), e))?;
                debug!(collection = %self.collection, field, id = %doc.id(), "moved set membership");
            }
        }
        if let Some(segment) = new_segment {
            let key = desc.entry_key(&self.collection, &segment)?;
            self.kv
                .sadd(&key, doc.id())
                .await
                .map_err(|e| ModelError::store(format!("set addition on {field}"), e))?;
        }
        Ok(())
    }

    async fn rescore_sorted(&self, desc: &IndexDescriptor, doc: &Document) -> ModelResult<()> {
        let field = desc.field();
        let key = desc.view_key(&self.collection)?;
        let score = doc.get(field).map(|v| v.score()).unwrap_or(0.0);
        // Remove then re-add, so a changed score never leaves a stale entry.
        self.kv
            .zrem(&key, doc.id())
            .await
            .map_err(|e| ModelError::store(format!("sorted removal on {field}"), e))?;
        self.kv
            .zadd(&key, doc.id(), score)
            .await
            .map_err(|e| ModelError::store(format!("sorted addition on {field}"), e))?;
        Ok(())
    }
}

#[async_trait]
impl LifecycleHooks for IndexSynchronizer {
    /// Unique-constraint check. Runs before the document is persisted and
    /// aborts the save on a collision, so a colliding document is never
    /// committed.
    async fn before_save(&self, doc: &Document, _previous: Option<&Document>) -> ModelResult<()> {
        for desc in self.registry.of_kind(IndexKind::Unique) {
            let field = desc.field();
            let segment = self.unique_segment(desc, doc)?;
            let key = desc.entry_key(&self.collection, &segment)?;
            let existing = self
                .kv
                .get(&key)
                .await
                .map_err(|e| ModelError::store(format!("unique check on {field}"), e))?;
            if let Some(holder) = existing {
                if holder != doc.id() {
                    return Err(ModelError::DuplicateKey(field.to_owned()));
                }
            }
        }
        Ok(())
    }

    async fn after_save(&self, doc: &Document, previous: Option<&Document>) -> ModelResult<()> {
        for desc in self.registry.of_kind(IndexKind::Unique) {
            let new_segment = self.unique_segment(desc, doc)?;
            // An update that changed the value migrates the entry: drop the
            // old claim before taking the new one.
            if let Some(prev) = previous {
                if let Some(old_segment) = desc.value_segment(prev.get(desc.field())) {
                    if old_segment != new_segment {
                        let old_key = desc.entry_key(&self.collection, &old_segment)?;
                        self.kv.del(&old_key).await.map_err(|e| {
                            ModelError::store(format!("unique removal on {}", desc.field()), e)
                        })?;
                    }
                }
            }
            self.claim_unique(desc, doc).await?;
        }
        for desc in self.registry.of_kind(IndexKind::Set) {
            self.sync_set(desc, doc, previous).await?;
        }
        for desc in self.registry.of_kind(IndexKind::Sorted) {
            self.rescore_sorted(desc, doc).await?;
        }
        Ok(())
    }

    async fn after_destroy(&self, doc: &Document) -> ModelResult<()> {
        for desc in self.registry.of_kind(IndexKind::Unique) {
            if let Some(segment) = desc.value_segment(doc.get(desc.field())) {
                let key = desc.entry_key(&self.collection, &segment)?;
                self.kv.del(&key).await.map_err(|e| {
                    ModelError::store(format!("unique removal on {}", desc.field()), e)
                })?;
            }
        }
        for desc in self.registry.of_kind(IndexKind::Set) {
            if let Some(segment) = desc.value_segment(doc.get(desc.field())) {
                let key = desc.entry_key(&self.collection, &segment)?;
                self.kv.srem(&key, doc.id()).await.map_err(|e| {
                    ModelError::store(format!("set removal on {}", desc.field()), e)
                })?;
            }
        }
        for desc in self.registry.of_kind(IndexKind::Sorted) {
            let key = desc.view_key(&self.collection)?;
            self.kv.zrem(&key, doc.id()).await.map_err(|e| {
                ModelError::store(format!("sorted removal on {}", desc.field()), e)
            })?;
        }
        debug!(collection = %self.collection, id = %doc.id(), "removed index entries");
        Ok(())
    }
}
