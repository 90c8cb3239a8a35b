//! Serviço de mapas falso para testes unitários.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::great_circle::haversine_km;
use super::ors::MapsBackend;
use super::tables::estimated_coordinates;
use crate::types::errors::LookupError;
use crate::types::shipment::{GeoPoint, GeoSource, GeocodeHit, Place, RouteSummary};

/// Responde com a tabela estática e conta chamadas.
pub struct FakeMaps {
    geocode_calls: AtomicUsize,
    route_calls: AtomicUsize,
    fail_geocode: AtomicBool,
    fail_route: AtomicBool,
    latency: Mutex<Duration>,
}

impl FakeMaps {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            geocode_calls: AtomicUsize::new(0),
            route_calls: AtomicUsize::new(0),
            fail_geocode: AtomicBool::new(false),
            fail_route: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
        })
    }

    pub fn with_latency(self: Arc<Self>, latency: Duration) -> Arc<Self> {
        *self.latency.lock().unwrap() = latency;
        self
    }

    pub fn failing_geocode(self: Arc<Self>) -> Arc<Self> {
        self.fail_geocode.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_route(self: Arc<Self>) -> Arc<Self> {
        self.fail_route.store(true, Ordering::SeqCst);
        self
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MapsBackend for FakeMaps {
    async fn geocode(&self, place: &Place) -> Result<GeocodeHit, LookupError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_geocode.load(Ordering::SeqCst) {
            return Err(LookupError::Status(503));
        }
        estimated_coordinates(place)
            .map(|(point, label)| GeocodeHit {
                point,
                label,
                source: GeoSource::Network,
            })
            .ok_or_else(|| LookupError::NotFound(place.to_string()))
    }

    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteSummary, LookupError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_route.load(Ordering::SeqCst) {
            return Err(LookupError::NotFound("rota sem resumo".to_string()));
        }
        let distance_km = (haversine_km(from, to) * 1.1 * 10.0).round() / 10.0;
        Ok(RouteSummary {
            distance_km,
            duration_min: distance_km / 70.0 * 60.0,
        })
    }
}
