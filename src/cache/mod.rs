//! Caches em memória para geocodificação e rotas.
//!
//! - [`TtlLruCache`]: entradas com TTL e despejo LRU estrito após cada inserção
//! - [`CachedLookup`]: cache + deduplicação de consultas em andamento por chave

mod lookup;
mod ttl_lru;

pub use lookup::CachedLookup;
pub use ttl_lru::{CacheEntry, CacheStats, TtlLruCache};
