//! Transporte HTTP das chamadas ao serviço de mapas.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use url::Url;

use crate::types::errors::LookupError;
use crate::FreteResult;

const USER_AGENT: &str = concat!("pisofrete/", env!("CARGO_PKG_VERSION"));

/// Classe de chamada, limitada de forma independente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallClass {
    Geocode,
    Route,
}

impl CallClass {
    /// Classifica pelo caminho da URL.
    pub fn of(url: &Url) -> Self {
        if url.path().contains("/geocode") {
            CallClass::Geocode
        } else {
            CallClass::Route
        }
    }
}

impl std::fmt::Display for CallClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallClass::Geocode => write!(f, "geocode"),
            CallClass::Route => write!(f, "route"),
        }
    }
}

/// Requisição GET de saída.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
}

impl OutboundRequest {
    pub fn get(url: Url) -> Self {
        Self { url }
    }

    pub fn class(&self) -> CallClass {
        CallClass::of(&self.url)
    }
}

/// Executa uma requisição e devolve o corpo JSON.
///
/// Não faz retry: falhas voltam tipadas para quem chamou.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<serde_json::Value, LookupError>;
}

/// Transporte reqwest com pool de conexões persistentes.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Cria o transporte com um único `Client` reutilizado entre chamadas.
    pub fn new() -> FreteResult<Self> {
        let client = ClientBuilder::new()
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(LookupError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<serde_json::Value, LookupError> {
        let response = self
            .client
            .get(request.url.clone())
            .header("Accept", "application/json, application/geo+json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| LookupError::Payload(e.without_url().to_string())),
            StatusCode::NOT_FOUND => Err(LookupError::NotFound(request.url.path().to_string())),
            status => Err(LookupError::Status(status.as_u16())),
        }
    }
}
