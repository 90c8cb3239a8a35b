//! Resolução de distâncias rodoviárias entre cidades brasileiras.
//!
//! ## Cascata
//!
//! - **SameCity**: origem e destino normalizados iguais, 0 km
//! - **Routed**: geocodificação + rota pelo serviço de mapas
//! - **GreatCircle**: haversine com fator de correção por faixa
//! - **RegionEstimate**: média estática por UF de destino
//!
//! ## Exemplo
//!
//! ```rust,ignore
//! use pisofrete::geo::DistanceResolver;
//! use pisofrete::types::shipment::Place;
//!
//! let resolver = DistanceResolver::from_backend(backend, &config.cache);
//! let d = resolver
//!     .resolve(&Place::new("São Paulo", "SP"), &Place::new("Campinas", "SP"))
//!     .await;
//! println!("{} km via {}", d.distance_km, d.method);
//! ```

pub mod great_circle;
pub mod normalize;
pub mod tables;

mod geocoder;
mod ors;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use geocoder::{Geocoder, Router};
pub use ors::{parse_geocode, parse_route, MapsBackend, OrsClient};
pub use resolver::{DistanceResolver, ResolvedDistance};
