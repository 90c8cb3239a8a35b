//! Cálculo do piso mínimo de frete.
//!
//! O cálculo é uma função pura atrás do trait [`FloorCalculator`]. A tabela
//! padrão ([`AnttTable`]) segue o formato da resolução da ANTT (coeficiente de
//! deslocamento por km e coeficiente de carga e descarga por número de eixos),
//! mas os números são ilustrativos e podem ser substituídos.
//!
//! ## Exemplo
//!
//! ```rust,ignore
//! use pisofrete::tariff::{AnttTable, FloorCalculator, FloorInput};
//!
//! let table = AnttTable::default();
//! let floor = table.compute_floor(&FloorInput::new(350.0, 5))?;
//! println!("piso: R$ {:.2}", floor.total);
//! ```

mod table;

use serde::{Deserialize, Serialize};

use crate::types::errors::FreteResult;
use crate::types::shipment::CargoType;

pub use table::{AnttTable, Coefficients, RETURN_EMPTY_FACTOR};

/// Entrada do cálculo do piso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorInput {
    pub distance_km: f64,
    pub axle_count: u8,
    pub cargo_type: CargoType,
    /// Soma dos pedágios (R$).
    pub toll_total: f64,
    /// Quilometragem de retorno vazio.
    pub empty_return_km: f64,
}

impl FloorInput {
    pub fn new(distance_km: f64, axle_count: u8) -> Self {
        Self {
            distance_km,
            axle_count,
            cargo_type: CargoType::default(),
            toll_total: 0.0,
            empty_return_km: 0.0,
        }
    }

    pub fn with_cargo(mut self, cargo_type: CargoType) -> Self {
        self.cargo_type = cargo_type;
        self
    }

    pub fn with_toll(mut self, toll_total: f64) -> Self {
        self.toll_total = toll_total;
        self
    }

    pub fn with_empty_return(mut self, empty_return_km: f64) -> Self {
        self.empty_return_km = empty_return_km;
        self
    }
}

/// Piso calculado. Valores em R$ com 2 casas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorBreakdown {
    /// Deslocamento + carga e descarga.
    pub base: f64,
    pub empty_return_value: f64,
    /// base + retorno vazio + pedágio.
    pub total: f64,
    /// Número de eixos efetivamente usado na tabela.
    pub resolved_axle_count: u8,
}

/// Calculadora do piso mínimo.
pub trait FloorCalculator: Send + Sync {
    /// Nome da tabela (para logs e relatórios).
    fn name(&self) -> &str;

    /// Calcula o piso para a entrada.
    fn compute_floor(&self, input: &FloorInput) -> FreteResult<FloorBreakdown>;
}

/// Arredonda para centavos, meio para longe do zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
