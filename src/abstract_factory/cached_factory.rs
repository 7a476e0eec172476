use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::factory_interface::{Factory, LabelSelector, Result};
use crate::kinds::Kind;

/// Warm cache in front of another factory.
///
/// Entries are stored unfiltered (including negative lookups) and the
/// caller's selector is applied on the way out, so one cached answer serves
/// every selector.  The lock is never held while the inner factory is being
/// queried; two concurrent misses for the same object may both go to the
/// inner factory and the later answer wins.
pub struct CachedFactory<F> {
    inner: F,
    cache: RwLock<HashMap<(Kind, String), Option<Value>>>,
}

impl<F> CachedFactory<F> {
    pub fn new(inner: F) -> Self {
        CachedFactory {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Forget everything, e.g. when a refresh starts a new tree.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

#[async_trait]
impl<F> Factory for CachedFactory<F>
where
    F: Factory + Send + Sync,
{
    async fn get(
        &self,
        kind: Kind,
        id: &str,
        skip_cache: bool,
        selector: &LabelSelector,
    ) -> Result<Option<Value>> {
        let key = (kind, id.to_string());

        if !skip_cache {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&key) {
                trace!(kind = %kind, id, "factory cache hit");
                return Ok(cached.clone().filter(|o| selector.matches(o)));
            }
        }

        let fresh = self
            .inner
            .get(kind, id, skip_cache, &LabelSelector::Everything)
            .await?;
        self.cache.write().await.insert(key, fresh.clone());

        Ok(fresh.filter(|o| selector.matches(o)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::abstract_factory::SnapshotStore;

    /// Counts how often the wrapped store is actually consulted.
    struct Counting {
        store: SnapshotStore,
        hits: AtomicUsize,
    }

    #[async_trait]
    impl Factory for Counting {
        async fn get(
            &self,
            kind: Kind,
            id: &str,
            skip_cache: bool,
            selector: &LabelSelector,
        ) -> Result<Option<Value>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.store.get(kind, id, skip_cache, selector).await
        }
    }

    fn counting() -> Counting {
        let store = SnapshotStore::new()
            .with(
                Kind::config_maps(),
                json!({ "metadata": {
                    "name": "app-cfg",
                    "namespace": "default",
                    "labels": { "app": "web" }
                } }),
            )
            .unwrap();
        Counting {
            store,
            hits: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn serves_warm_lookups_from_cache() {
        let f = CachedFactory::new(counting());
        let all = LabelSelector::everything();

        assert!(f.get(Kind::config_maps(), "default/app-cfg", false, &all).await.unwrap().is_some());
        assert!(f.get(Kind::config_maps(), "default/app-cfg", false, &all).await.unwrap().is_some());
        assert_eq!(f.inner().hits.load(Ordering::SeqCst), 1);

        // Misses are cached too.
        assert!(f.get(Kind::config_maps(), "default/nope", false, &all).await.unwrap().is_none());
        assert!(f.get(Kind::config_maps(), "default/nope", false, &all).await.unwrap().is_none());
        assert_eq!(f.inner().hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn skip_cache_always_refreshes() {
        let f = CachedFactory::new(counting());
        let all = LabelSelector::everything();

        for _ in 0..3 {
            f.get(Kind::config_maps(), "default/app-cfg", true, &all).await.unwrap();
        }
        assert_eq!(f.inner().hits.load(Ordering::SeqCst), 3);

        f.clear().await;
        f.get(Kind::config_maps(), "default/app-cfg", false, &all).await.unwrap();
        assert_eq!(f.inner().hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn applies_selector_to_cached_entries() {
        let f = CachedFactory::new(counting());
        let web = LabelSelector::parse("app=web").unwrap();
        let db = LabelSelector::parse("app=db").unwrap();

        assert!(f.get(Kind::config_maps(), "default/app-cfg", false, &web).await.unwrap().is_some());
        assert!(f.get(Kind::config_maps(), "default/app-cfg", false, &db).await.unwrap().is_none());
        assert_eq!(f.inner().hits.load(Ordering::SeqCst), 1);
    }
}
