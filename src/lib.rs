//! # Pisofrete
//!
//! Conciliação de fretes rodoviários contra o piso mínimo da ANTT.
//!
//! Resolve distâncias entre cidades brasileiras com cache, deduplicação de
//! consultas e limitação de taxa, calcula o piso mínimo e classifica cada
//! linha de uma planilha de embarques.
//!
//! ## Módulos
//!
//! - [`cli`] - Interface de linha de comando
//! - [`dispatch`] - Portão único das chamadas ao serviço de mapas
//! - [`cache`] - Cache TTL + LRU com deduplicação de consultas
//! - [`geo`] - Geocodificação, rotas e cascata de fallback de distância
//! - [`tariff`] - Cálculo do piso mínimo
//! - [`reconcile`] - Conciliação de planilhas em lote
//! - [`types`] - Tipos compartilhados

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod dispatch;
pub mod geo;
pub mod reconcile;
pub mod tariff;
pub mod types;

pub use types::config::Config;
pub use types::errors::{FreteError, FreteResult, LookupError};
