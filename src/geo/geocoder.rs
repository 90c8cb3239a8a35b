//! Geocodificador cacheado com fallback para coordenadas estimadas.

use std::sync::Arc;
use std::time::Duration;

use super::normalize::{geocode_key, route_key};
use super::ors::MapsBackend;
use super::tables::estimated_coordinates;
use crate::cache::{CacheStats, CachedLookup};
use crate::types::errors::LookupError;
use crate::types::shipment::{GeoPoint, GeoSource, GeocodeHit, Place, RouteSummary};

/// Resolve cidade/UF para coordenadas.
///
/// Sucessos de rede ficam em cache por `ttl`. Em falha, usa a tabela
/// estática de coordenadas estimadas; sem entrada na tabela, o erro sobe.
#[derive(Clone)]
pub struct Geocoder {
    backend: Arc<dyn MapsBackend>,
    lookup: CachedLookup<GeocodeHit>,
}

impl Geocoder {
    pub fn new(backend: Arc<dyn MapsBackend>, capacity: usize, ttl: Duration) -> Self {
        Self {
            backend,
            lookup: CachedLookup::new("geocode", capacity, ttl),
        }
    }

    /// Resolve um local.
    pub async fn resolve(&self, place: &Place) -> Result<GeocodeHit, LookupError> {
        let key = geocode_key(place);
        let backend = Arc::clone(&self.backend);
        let target = place.clone();

        let outcome = self
            .lookup
            .resolve(key.clone(), move || async move { backend.geocode(&target).await })
            .await;

        match outcome {
            Ok(hit) => Ok(hit),
            Err(e) => match estimated_coordinates(place) {
                Some((point, label)) => {
                    tracing::warn!(key = %key, error = %e, "geocode failed, using estimated coordinates");
                    Ok(GeocodeHit {
                        point,
                        label,
                        source: GeoSource::Estimated,
                    })
                }
                None => Err(e),
            },
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.lookup.stats()
    }

    /// Consulta cacheada subjacente.
    pub fn lookup(&self) -> &CachedLookup<GeocodeHit> {
        &self.lookup
    }
}

/// Resolve rotas rodoviárias entre coordenadas, com cache.
#[derive(Clone)]
pub struct Router {
    backend: Arc<dyn MapsBackend>,
    lookup: CachedLookup<RouteSummary>,
}

impl Router {
    pub fn new(backend: Arc<dyn MapsBackend>, capacity: usize, ttl: Duration) -> Self {
        Self {
            backend,
            lookup: CachedLookup::new("route", capacity, ttl),
        }
    }

    /// Resolve a rota entre dois pontos. Falhas sobem sem fallback.
    pub async fn resolve(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteSummary, LookupError> {
        let backend = Arc::clone(&self.backend);
        self.lookup
            .resolve(route_key(from, to), move || async move {
                backend.route(from, to).await
            })
            .await
    }

    pub fn stats(&self) -> CacheStats {
        self.lookup.stats()
    }

    pub fn lookup(&self) -> &CachedLookup<RouteSummary> {
        &self.lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::testing::FakeMaps;

    #[tokio::test(start_paused = true)]
    async fn test_geocode_cached_within_ttl() {
        let maps = FakeMaps::new();
        let geocoder = Geocoder::new(maps.clone(), 100, Duration::from_secs(60));

        let a = geocoder.resolve(&Place::new("Campinas", "SP")).await.unwrap();
        let b = geocoder.resolve(&Place::new("  campinas ", "sp")).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(maps.geocode_calls(), 1);
        assert_eq!(geocoder.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocode_concurrent_dedup() {
        let maps = FakeMaps::new().with_latency(Duration::from_millis(200));
        let geocoder = Geocoder::new(maps.clone(), 100, Duration::from_secs(60));
        let place = Place::new("Curitiba", "PR");

        let calls = (0..5).map(|_| geocoder.resolve(&place));
        let results = futures::future::join_all(calls).await;

        assert_eq!(maps.geocode_calls(), 1);
        let first = results[0].clone().unwrap();
        assert!(results.iter().all(|r| r.as_ref() == Ok(&first)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocode_falls_back_to_estimated_table() {
        let maps = FakeMaps::new().failing_geocode();
        let geocoder = Geocoder::new(maps.clone(), 100, Duration::from_secs(60));

        let hit = geocoder.resolve(&Place::new("Joinville", "SC")).await.unwrap();
        assert_eq!(hit.source, GeoSource::Estimated);

        // Sem entrada estática, a falha sobe
        let err = geocoder.resolve(&Place::new("Xique-Xique", "BA")).await;
        assert!(err.is_err());

        // Estimativas não ficam em cache
        assert_eq!(geocoder.stats().size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_caches_by_rounded_coordinates() {
        let maps = FakeMaps::new();
        let router = Router::new(maps.clone(), 100, Duration::from_secs(60));

        let a = GeoPoint::new(-23.55052, -46.63331);
        let b = GeoPoint::new(-22.90990, -47.06260);
        router.resolve(a, b).await.unwrap();
        router
            .resolve(GeoPoint::new(-23.55051, -46.63332), b)
            .await
            .unwrap();

        assert_eq!(maps.route_calls(), 1);
    }
}
