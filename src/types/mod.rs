//! Tipos compartilhados do Pisofrete.

pub mod config;
pub mod errors;
pub mod report;
pub mod shipment;
