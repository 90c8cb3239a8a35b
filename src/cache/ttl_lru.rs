//! Cache com TTL e despejo LRU estrito.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

/// Entrada do cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Valor armazenado.
    pub value: V,

    /// Momento em que a entrada expira.
    pub expires_at: Instant,

    /// Último acesso (leitura ou escrita).
    pub last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: now + ttl,
            last_accessed_at: now,
        }
    }

    /// Verifica se a entrada expirou.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Estatísticas do cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Número atual de entradas.
    pub size: usize,

    /// Capacidade máxima.
    pub capacity: usize,

    /// Número de acertos (cache hits).
    pub hits: u64,

    /// Número de erros (cache misses).
    pub misses: u64,

    /// Entradas removidas por capacidade.
    pub evictions: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache de chave normalizada para valor, com TTL por entrada.
///
/// O `LruCache` interno é ilimitado; a capacidade é aplicada depois de
/// cada inserção removendo as entradas acessadas há mais tempo até o
/// tamanho voltar ao limite.
pub struct TtlLruCache<V> {
    entries: LruCache<String, CacheEntry<V>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> TtlLruCache<V> {
    /// Cria um novo cache.
    ///
    /// # Argumentos
    /// - `capacity`: Número máximo de entradas (mínimo 1)
    /// - `ttl`: Tempo de vida das entradas
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity: capacity.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Busca no cache.
    ///
    /// Entradas expiradas são removidas e contam como miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let is_expired = self.entries.peek(key).map(|e| e.is_expired(now));

        match is_expired {
            Some(true) => {
                self.entries.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(false) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                // get_mut promove a entrada para o fim mais recente
                self.entries.get_mut(key).map(|entry| {
                    entry.last_accessed_at = now;
                    entry.value.clone()
                })
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Lê sem alterar a ordem LRU nem as estatísticas.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.peek(key)
    }

    /// Insere e aplica o limite de capacidade. Retorna quantas entradas foram despejadas.
    pub fn insert(&mut self, key: String, value: V) -> usize {
        self.entries.put(key, CacheEntry::new(value, self.ttl));
        self.enforce_capacity()
    }

    /// Remove as entradas menos recentemente acessadas até `len <= capacity`.
    pub fn enforce_capacity(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.capacity);
        for _ in 0..excess {
            self.entries.pop_lru();
        }
        if excess > 0 {
            self.evictions.fetch_add(excess as u64, Ordering::Relaxed);
        }
        excess
    }

    /// Limpa todo o cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove entradas expiradas.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    /// Chaves da mais recente para a menos recente.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
