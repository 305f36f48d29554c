use super::{KvClient, KvError, KvResult};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
    offline: bool,
}

/// In-process key-value client covering the command set the index layer uses.
///
/// Each command takes the lock once and releases it before returning, matching
/// the per-command atomicity of a real store. `set_offline` makes every
/// subsequent command fail, for exercising transport-error propagation.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: Mutex<Inner>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated transport failure.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning cannot occur: no code path panics while holding it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(inner: &Inner) -> KvResult<()> {
        if inner.offline {
            return Err(KvError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvClient for MemoryKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let inner = self.lock();
        Self::check_online(&inner)?;
        Ok(inner.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        inner.strings.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> KvResult<bool> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        if inner.strings.contains_key(key) {
            return Ok(false);
        }
        inner.strings.insert(key.to_owned(), value.to_owned());
        Ok(true)
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        inner.strings.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> KvResult<()> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        inner
            .sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> KvResult<()> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        let drained = match inner.sets.get_mut(key) {
            Some(members) => {
                members.remove(member);
                members.is_empty()
            }
            None => false,
        };
        if drained {
            inner.sets.remove(key);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> KvResult<Vec<String>> {
        let inner = self.lock();
        Self::check_online(&inner)?;
        Ok(inner
            .sets
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> KvResult<()> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        inner
            .zsets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned(), score);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> KvResult<()> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        let drained = match inner.zsets.get_mut(key) {
            Some(members) => {
                members.remove(member);
                members.is_empty()
            }
            None => false,
        };
        if drained {
            inner.zsets.remove(key);
        }
        Ok(())
    }

    async fn zrange(
        &self,
        key: &str,
        offset: usize,
        limit: Option<usize>,
        reverse: bool,
    ) -> KvResult<Vec<String>> {
        let inner = self.lock();
        Self::check_online(&inner)?;
        let mut entries: Vec<(String, f64)> = inner
            .zsets
            .get(key)
            .map(|members| members.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        // Score order, member-lexicographic on ties.
        entries.sort_by(|(ma, sa), (mb, sb)| sa.total_cmp(sb).then_with(|| ma.cmp(mb)));
        if reverse {
            entries.reverse();
        }
        let iter = entries.into_iter().skip(offset).map(|(m, _)| m);
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }
}
