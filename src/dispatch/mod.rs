//! Despacho de chamadas de rede ao serviço de mapas.
//!
//! Toda chamada de saída passa pelo [`Dispatcher`], que aplica:
//!
//! - teto global de chamadas simultâneas
//! - intervalo mínimo por classe ([`CallClass::Geocode`], [`CallClass::Route`])
//! - prazo por chamada
//!
//! Não há retry aqui; a política de fallback fica no resolvedor de distâncias.

mod throttle;
mod transport;

pub use throttle::{DispatchStats, Dispatcher, DispatcherConfig};
pub use transport::{CallClass, HttpTransport, OutboundRequest, Transport};
