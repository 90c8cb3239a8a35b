//! Cliente do OpenRouteService.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::dispatch::{Dispatcher, DispatcherConfig, HttpTransport, OutboundRequest};
use crate::types::config::MapsConfig;
use crate::types::errors::LookupError;
use crate::types::shipment::{GeoPoint, GeoSource, GeocodeHit, Place, RouteSummary};
use crate::{FreteError, FreteResult};

/// Serviço de mapas: geocodificação e rota rodoviária.
#[async_trait]
pub trait MapsBackend: Send + Sync {
    /// Resolve cidade/UF para coordenadas.
    async fn geocode(&self, place: &Place) -> Result<GeocodeHit, LookupError>;

    /// Resolve distância e duração rodoviárias entre dois pontos.
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteSummary, LookupError>;
}

/// Cliente OpenRouteService sobre o [`Dispatcher`].
pub struct OrsClient {
    dispatcher: Arc<Dispatcher>,
    geocode_url: Url,
    route_url: Url,
    api_key: Option<String>,
}

impl OrsClient {
    /// Cria o cliente a partir da configuração de mapas.
    pub fn new(dispatcher: Arc<Dispatcher>, config: &MapsConfig) -> FreteResult<Self> {
        let base = config.base_url.trim_end_matches('/');
        let parse = |path: &str| {
            Url::parse(&format!("{}{}", base, path))
                .map_err(|e| FreteError::config(format!("maps.base_url inválida: {}", e)))
        };

        if config.api_key.is_none() {
            tracing::warn!("no mapping API key configured; distances will be estimated");
        }

        Ok(Self {
            dispatcher,
            geocode_url: parse("/geocode/search")?,
            route_url: parse("/v2/directions/driving-hgv")?,
            api_key: config.api_key.clone(),
        })
    }

    /// Monta transporte HTTP + dispatcher + cliente a partir da configuração.
    pub fn from_config(config: &MapsConfig) -> FreteResult<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        let dispatcher = Arc::new(Dispatcher::new(transport, DispatcherConfig::from(config)));
        Self::new(dispatcher, config)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn api_key(&self) -> Result<&str, LookupError> {
        self.api_key.as_deref().ok_or(LookupError::MissingApiKey)
    }
}

#[async_trait]
impl MapsBackend for OrsClient {
    async fn geocode(&self, place: &Place) -> Result<GeocodeHit, LookupError> {
        let key = self.api_key()?;

        let text = if place.state.is_empty() {
            format!("{}, Brasil", place.city)
        } else {
            format!("{}, {}, Brasil", place.city, place.state)
        };

        let mut url = self.geocode_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", key)
            .append_pair("text", &text)
            .append_pair("boundary.country", "BR")
            .append_pair("layers", "locality,county,localadmin")
            .append_pair("size", "1");

        let body = self.dispatcher.dispatch(OutboundRequest::get(url)).await?;
        parse_geocode(&body, place)
    }

    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteSummary, LookupError> {
        let key = self.api_key()?;

        let mut url = self.route_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", key)
            .append_pair("start", &format!("{},{}", from.lon, from.lat))
            .append_pair("end", &format!("{},{}", to.lon, to.lat));

        let body = self.dispatcher.dispatch(OutboundRequest::get(url)).await?;
        parse_route(&body)
    }
}

/// Extrai a primeira feature de uma resposta GeoJSON de geocodificação.
pub fn parse_geocode(body: &Value, place: &Place) -> Result<GeocodeHit, LookupError> {
    let feature = body
        .get("features")
        .and_then(Value::as_array)
        .and_then(|features| features.first())
        .ok_or_else(|| LookupError::NotFound(place.to_string()))?;

    let coords = feature
        .pointer("/geometry/coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::Payload("feature sem coordenadas".to_string()))?;

    // GeoJSON: [lon, lat]
    let (lon, lat) = match (
        coords.first().and_then(Value::as_f64),
        coords.get(1).and_then(Value::as_f64),
    ) {
        (Some(lon), Some(lat)) => (lon, lat),
        _ => return Err(LookupError::Payload("coordenadas inválidas".to_string())),
    };

    let label = feature
        .pointer("/properties/label")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| place.to_string());

    Ok(GeocodeHit {
        point: GeoPoint::new(lat, lon),
        label,
        source: GeoSource::Network,
    })
}

/// Extrai o resumo da primeira rota.
///
/// Sem `summary` ou sem `distance` é tratado como "não encontrado", igual a
/// um 404.
pub fn parse_route(body: &Value) -> Result<RouteSummary, LookupError> {
    let summary = body
        .pointer("/features/0/properties/summary")
        .or_else(|| body.pointer("/routes/0/summary"))
        .and_then(Value::as_object)
        .ok_or_else(|| LookupError::NotFound("rota sem resumo".to_string()))?;

    let meters = summary
        .get("distance")
        .and_then(Value::as_f64)
        .filter(|m| m.is_finite())
        .ok_or_else(|| LookupError::NotFound("rota sem distância".to_string()))?;
    // O serviço omite a duração quando vale zero
    let seconds = summary.get("duration").and_then(Value::as_f64).unwrap_or(0.0);

    Ok(RouteSummary {
        distance_km: meters / 1000.0,
        duration_min: seconds / 60.0,
    })
}
