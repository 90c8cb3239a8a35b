//! Consulta cacheada com deduplicação de requisições em andamento.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};

use super::ttl_lru::{CacheStats, TtlLruCache};
use crate::types::errors::LookupError;

type LookupFuture<V> = BoxFuture<'static, Result<V, LookupError>>;

struct InFlight<V> {
    id: u64,
    handle: WeakShared<LookupFuture<V>>,
}

struct Inner<V> {
    name: &'static str,
    cache: Mutex<TtlLruCache<V>>,
    in_flight: Mutex<HashMap<String, InFlight<V>>>,
    next_id: AtomicU64,
    computations: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Remove a entrada do registro quando a computação termina ou é abandonada.
struct InFlightGuard<V> {
    inner: Arc<Inner<V>>,
    key: String,
    id: u64,
}

impl<V> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.inner.in_flight);
        if in_flight.get(&self.key).map(|f| f.id) == Some(self.id) {
            in_flight.remove(&self.key);
        }
    }
}

/// Cache + registro de consultas em andamento para uma chave normalizada.
///
/// Garante no máximo uma computação pendente por chave: chamadores
/// concorrentes aguardam o mesmo futuro compartilhado e recebem o mesmo
/// resultado. Somente sucessos são armazenados.
pub struct CachedLookup<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for CachedLookup<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> CachedLookup<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Cria uma consulta cacheada.
    pub fn new(name: &'static str, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                cache: Mutex::new(TtlLruCache::new(capacity, ttl)),
                in_flight: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                computations: AtomicU64::new(0),
            }),
        }
    }

    /// Resolve `key`: cache, depois computação em andamento, depois `compute`.
    ///
    /// `key` já deve estar normalizada.
    pub async fn resolve<F, Fut>(&self, key: String, compute: F) -> Result<V, LookupError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, LookupError>> + Send + 'static,
    {
        if let Some(value) = lock(&self.inner.cache).get(&key) {
            tracing::trace!(cache = self.inner.name, key = %key, "cache hit");
            return Ok(value);
        }

        let shared = {
            let mut in_flight = lock(&self.inner.in_flight);
            // A computação grava no cache antes de sair do registro
            if let Some(value) = lock(&self.inner.cache).get(&key) {
                return Ok(value);
            }
            match in_flight.get(&key).and_then(|f| f.handle.upgrade()) {
                Some(existing) => {
                    tracing::debug!(cache = self.inner.name, key = %key, "joining in-flight lookup");
                    existing
                }
                None => {
                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                    self.inner.computations.fetch_add(1, Ordering::Relaxed);
                    let task = self.spawn_computation(key.clone(), id, compute());
                    if let Some(handle) = task.downgrade() {
                        in_flight.insert(key, InFlight { id, handle });
                    }
                    task
                }
            }
        };

        shared.await
    }

    fn spawn_computation<Fut>(&self, key: String, id: u64, fut: Fut) -> Shared<LookupFuture<V>>
    where
        Fut: Future<Output = Result<V, LookupError>> + Send + 'static,
    {
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            key,
            id,
        };

        async move {
            let result = fut.await;
            if let Ok(value) = &result {
                let evicted = lock(&guard.inner.cache).insert(guard.key.clone(), value.clone());
                if evicted > 0 {
                    tracing::debug!(cache = guard.inner.name, evicted, "cache capacity enforced");
                }
            }
            // guard sai de escopo aqui: remove a entrada do registro
            drop(guard);
            result
        }
        .boxed()
        .shared()
    }

    /// Valor em cache, sem disparar computação.
    pub fn cached(&self, key: &str) -> Option<V> {
        lock(&self.inner.cache).get(key)
    }

    /// Número de computações iniciadas (chamadas reais a `compute`).
    pub fn computations(&self) -> u64 {
        self.inner.computations.load(Ordering::Relaxed)
    }

    /// Número de chaves com computação pendente.
    pub fn in_flight_len(&self) -> usize {
        lock(&self.inner.in_flight).len()
    }

    /// Chaves em cache, da mais recente para a menos recente.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.inner.cache).keys()
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.inner.cache).stats()
    }

    pub fn clear(&self) {
        lock(&self.inner.cache).clear();
    }
}
