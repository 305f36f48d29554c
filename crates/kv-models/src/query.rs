use crate::error::{ModelError, ModelResult};
use crate::index::{IndexKind, IndexRegistry};
use crate::kv::KvClient;
use crate::values::FieldValue;
use futures::future::{try_join_all, BoxFuture};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Equality query: indexed field name to expected value. Multiple entries are
/// ANDed together.
pub type Query = BTreeMap<String, FieldValue>;

/// Directives shaping a list call.
///
/// `sort` names a Sorted-indexed field; `offset`/`limit`/`reverse` apply to
/// the sorted range read when a sort is present, and to the final id list
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub sort: Option<String>,
    pub reverse: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Resolves a query into an ordered list of document ids.
///
/// Each indexed field becomes one store read; reads are dispatched
/// concurrently and joined before intersecting (fail-fast: the first branch
/// error aborts the call). When a sort is present its range read is the only
/// ordering signal, so the intersection preserves the sorted collection's
/// relative order.
pub struct QueryEngine {
    collection: String,
    registry: Arc<IndexRegistry>,
    kv: Arc<dyn KvClient>,
}

impl QueryEngine {
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

    pub async fn resolve_ids(
        &self,
        query: &Query,
        options: &ListOptions,
    ) -> ModelResult<Vec<String>> {
        // Validate the whole query up front; no reads are issued for a query
        // that names an undeclared field.
        let mut branches: Vec<BoxFuture<'_, ModelResult<Vec<String>>>> = Vec::new();
        for (field, value) in query {
            let desc = self
                .registry
                .descriptor_for(field)
                .filter(|d| matches!(d.kind(), IndexKind::Unique | IndexKind::Set))
                .ok_or_else(|| ModelError::NonIndexedProperty(field.clone()))?;
            let segment = value.key_segment().ok_or_else(|| {
                ModelError::InvalidQueryShape(format!(
                    "unindexable {} value for field {field}",
                    value.type_name()
                ))
            })?;
            let key = desc.entry_key(&self.collection, &segment)?;
            let field = field.clone();
            if desc.kind() == IndexKind::Unique {
                branches.push(Box::pin(self.unique_branch(key, field)));
            } else {
                branches.push(Box::pin(self.set_branch(key, field)));
            }
        }

        let sort_plan = match &options.sort {
            Some(field) => {
                let desc = self
                    .registry
                    .descriptor_for(field)
                    .filter(|d| d.kind() == IndexKind::Sorted)
                    .ok_or_else(|| ModelError::NonSortableProperty(field.clone()))?;
                Some((desc.view_key(&self.collection)?, field.clone()))
            }
            None => None,
        };
        let sort_read = async {
            match &sort_plan {
                Some((key, field)) => self
                    .kv
                    .zrange(key, options.offset, options.limit, options.reverse)
                    .await
                    .map(Some)
                    .map_err(|e| ModelError::store(format!("sorted range on {field}"), e)),
                None => Ok(None),
            }
        };

        // Fan out all reads, fail-fast on the first branch error.
        let (sorted, equality) = futures::try_join!(sort_read, try_join_all(branches))?;

        let ids = match sorted {
            Some(base) => intersect(base, &equality),
            None => {
                let mut collections = equality.into_iter();
                let base = collections.next().unwrap_or_default();
                let rest: Vec<Vec<String>> = collections.collect();
                paginate(intersect(base, &rest), options.offset, options.limit)
            }
        };
        debug!(
            collection = %self.collection,
            fields = query.len(),
            sorted = options.sort.is_some(),
            results = ids.len(),
            "resolved list query"
        );
        Ok(ids)
    }

    /// Point lookup through a unique entry: zero or one id.
    async fn unique_branch(&self, key: String, field: String) -> ModelResult<Vec<String>> {
        let holder = self
            .kv
            .get(&key)
            .await
            .map_err(|e| ModelError::store(format!("unique lookup on {field}"), e))?;
        Ok(holder.into_iter().collect())
    }

    async fn set_branch(&self, key: String, field: String) -> ModelResult<Vec<String>> {
        self.kv
            .smembers(&key)
            .await
            .map_err(|e| ModelError::store(format!("set read on {field}"), e))
    }
}

/// Order-preserving AND: ids from `base`, in `base` order and deduplicated,
/// that appear in every other collection.
fn intersect(base: Vec<String>, others: &[Vec<String>]) -> Vec<String> {
    let sets: Vec<HashSet<&str>> = others
        .iter()
        .map(|ids| ids.iter().map(String::as_str).collect())
        .collect();
    let mut seen: HashSet<String> = HashSet::new();
    base.into_iter()
        .filter(|id| {
            sets.iter().all(|set| set.contains(id.as_str())) && seen.insert(id.clone())
        })
        .collect()
}

fn paginate(ids: Vec<String>, offset: usize, limit: Option<usize>) -> Vec<String> {
    let iter = ids.into_iter().skip(offset);
    match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}
