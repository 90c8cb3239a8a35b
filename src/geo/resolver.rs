//! Resolvedor de distâncias com cascata de fallback.
//!
//! Ordem das camadas:
//!
//! 1. Mesma cidade: 0 km, sem rede
//! 2. Rota rodoviária (geocodifica as duas pontas em paralelo, depois roteia)
//! 3. Círculo máximo com fator de correção, se as duas pontas têm coordenadas
//! 4. Média estática por UF de destino (sempre produz um valor)

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geocoder::{Geocoder, Router};
use super::great_circle::{duration_for, estimate_road};
use super::normalize::same_place;
use super::ors::MapsBackend;
use super::tables::{state_average_distance, DEFAULT_REGION_DISTANCE_KM};
use crate::types::config::CacheConfig;
use crate::types::errors::LookupError;
use crate::types::shipment::{DistanceMethod, GeocodeHit, Place};

/// Distância resolvida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDistance {
    pub distance_km: f64,
    pub duration_min: f64,
    pub method: DistanceMethod,

    /// Coordenadas da origem, quando obtidas.
    pub origin: Option<GeocodeHit>,

    /// Coordenadas do destino, quando obtidas.
    pub destination: Option<GeocodeHit>,

    /// Falhas das camadas anteriores.
    pub warnings: Vec<String>,
}

/// Falha de uma camada, com o que já foi obtido até ali.
#[derive(Debug, Clone)]
struct TierFailure {
    reason: LookupError,
    origin: Option<GeocodeHit>,
    destination: Option<GeocodeHit>,
    warnings: Vec<String>,
}

/// Orquestra geocodificador e roteador.
#[derive(Clone)]
pub struct DistanceResolver {
    geocoder: Geocoder,
    router: Router,
}

impl DistanceResolver {
    pub fn new(geocoder: Geocoder, router: Router) -> Self {
        Self { geocoder, router }
    }

    /// Monta geocodificador e roteador sobre o mesmo serviço de mapas.
    pub fn from_backend(backend: Arc<dyn MapsBackend>, cache: &CacheConfig) -> Self {
        let geocoder = Geocoder::new(
            Arc::clone(&backend),
            cache.geocode_capacity,
            std::time::Duration::from_secs(cache.geocode_ttl_secs),
        );
        let router = Router::new(
            backend,
            cache.route_capacity,
            std::time::Duration::from_secs(cache.route_ttl_secs),
        );
        Self::new(geocoder, router)
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolve a distância entre origem e destino. Nunca falha.
    pub async fn resolve(&self, origin: &Place, destination: &Place) -> ResolvedDistance {
        if same_place(origin, destination) {
            return ResolvedDistance {
                distance_km: 0.0,
                duration_min: 0.0,
                method: DistanceMethod::SameCity,
                origin: None,
                destination: None,
                warnings: Vec::new(),
            };
        }

        let resolved = match self.routed(origin, destination).await {
            Ok(resolved) => resolved,
            Err(failure) => {
                tracing::warn!(
                    origin = %origin,
                    destination = %destination,
                    error = %failure.reason,
                    "routed distance unavailable, falling back"
                );
                Self::great_circle(failure)
                    .unwrap_or_else(|failure| Self::region_estimate(destination, failure))
            }
        };

        tracing::debug!(
            origin = %origin,
            destination = %destination,
            method = %resolved.method,
            distance_km = resolved.distance_km,
            "distance resolved"
        );
        resolved
    }

    async fn routed(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<ResolvedDistance, TierFailure> {
        let (from, to) = tokio::join!(
            self.geocoder.resolve(origin),
            self.geocoder.resolve(destination)
        );

        let mut warnings = Vec::new();
        let (from, to) = match (from, to) {
            (Ok(from), Ok(to)) => (from, to),
            (from, to) => {
                let mut reason = None;
                if let Err(e) = &from {
                    warnings.push(format!("geocodificação da origem {} falhou: {}", origin, e));
                    reason = Some(e.clone());
                }
                if let Err(e) = &to {
                    warnings.push(format!("geocodificação do destino {} falhou: {}", destination, e));
                    reason = Some(e.clone());
                }
                return Err(TierFailure {
                    reason: reason.unwrap_or_else(|| LookupError::NotFound(destination.to_string())),
                    origin: from.ok(),
                    destination: to.ok(),
                    warnings,
                });
            }
        };

        match self.router.resolve(from.point, to.point).await {
            Ok(route) => Ok(ResolvedDistance {
                distance_km: route.distance_km,
                duration_min: route.duration_min,
                method: DistanceMethod::Routed,
                origin: Some(from),
                destination: Some(to),
                warnings,
            }),
            Err(e) => {
                warnings.push(format!("rota {} → {} falhou: {}", origin, destination, e));
                Err(TierFailure {
                    reason: e,
                    origin: Some(from),
                    destination: Some(to),
                    warnings,
                })
            }
        }
    }

    fn great_circle(failure: TierFailure) -> Result<ResolvedDistance, TierFailure> {
        match (&failure.origin, &failure.destination) {
            (Some(from), Some(to)) => {
                let (distance_km, duration_min) = estimate_road(from.point, to.point);
                let mut warnings = failure.warnings;
                warnings.push("distância estimada por linha reta com fator de correção".to_string());
                Ok(ResolvedDistance {
                    distance_km,
                    duration_min,
                    method: DistanceMethod::GreatCircle,
                    origin: failure.origin,
                    destination: failure.destination,
                    warnings,
                })
            }
            _ => Err(failure),
        }
    }

    fn region_estimate(destination: &Place, failure: TierFailure) -> ResolvedDistance {
        let mut warnings = failure.warnings;
        let distance_km = match state_average_distance(&destination.state) {
            Some(km) => {
                warnings.push(format!("distância média da UF {} usada", destination.state));
                km
            }
            None => {
                warnings.push(format!(
                    "UF '{}' desconhecida, distância padrão de {} km usada",
                    destination.state, DEFAULT_REGION_DISTANCE_KM
                ));
                DEFAULT_REGION_DISTANCE_KM
            }
        };

        ResolvedDistance {
            distance_km,
            duration_min: duration_for(distance_km),
            method: DistanceMethod::RegionEstimate,
            origin: failure.origin,
            destination: failure.destination,
            warnings,
        }
    }
}
