//! Tabela de coeficientes por tipo de carga e número de eixos.

use std::collections::{BTreeMap, HashMap};

use super::{round2, FloorBreakdown, FloorCalculator, FloorInput};
use crate::types::errors::{FreteError, FreteResult};
use crate::types::shipment::CargoType;

/// Fator aplicado ao CCD no retorno vazio.
pub const RETURN_EMPTY_FACTOR: f64 = 0.92;

/// Coeficientes de uma linha da tabela.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Custo de deslocamento (R$/km).
    pub ccd: f64,
    /// Custo de carga e descarga (R$).
    pub cc: f64,
}

/// Linha base (carga geral): eixos, CCD, CC.
const GENERAL_CARGO_ROWS: [(u8, f64, f64); 7] = [
    (2, 3.6735, 422.51),
    (3, 4.6502, 501.85),
    (4, 5.2733, 548.02),
    (5, 6.0036, 613.54),
    (6, 6.8543, 660.17),
    (7, 7.4324, 804.17),
    (9, 8.4597, 858.37),
];

fn cargo_factor(cargo: CargoType) -> f64 {
    match cargo {
        CargoType::GranelSolido => 0.97,
        CargoType::GranelLiquido => 1.03,
        CargoType::Frigorificada => 1.18,
        CargoType::Conteinerizada => 0.99,
        CargoType::CargaGeral => 1.0,
        CargoType::Neogranel => 0.98,
        CargoType::Perigosa => 1.14,
    }
}

/// Tabela padrão de coeficientes.
#[derive(Debug, Clone)]
pub struct AnttTable {
    rows: HashMap<CargoType, BTreeMap<u8, Coefficients>>,
}

impl Default for AnttTable {
    fn default() -> Self {
        let rows = CargoType::ALL
            .iter()
            .map(|&cargo| {
                let factor = cargo_factor(cargo);
                let by_axle = GENERAL_CARGO_ROWS
                    .iter()
                    .map(|&(axles, ccd, cc)| {
                        let coef = Coefficients {
                            ccd: (ccd * factor * 10_000.0).round() / 10_000.0,
                            cc: round2(cc * factor),
                        };
                        (axles, coef)
                    })
                    .collect();
                (cargo, by_axle)
            })
            .collect();
        Self { rows }
    }
}

impl AnttTable {
    /// Tabela vazia, para montar coeficientes próprios.
    pub fn empty() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    /// Define (ou substitui) uma linha.
    pub fn with_row(mut self, cargo: CargoType, axles: u8, coefficients: Coefficients) -> Self {
        self.rows.entry(cargo).or_default().insert(axles, coefficients);
        self
    }

    /// Encaixa o número de eixos na menor chave >= pedida, ou na maior chave.
    pub fn resolve_axles(&self, cargo: CargoType, axle_count: u8) -> Option<(u8, Coefficients)> {
        let by_axle = self.rows.get(&cargo)?;
        by_axle
            .range(axle_count..)
            .next()
            .or_else(|| by_axle.iter().next_back())
            .map(|(&axles, &coef)| (axles, coef))
    }
}

impl FloorCalculator for AnttTable {
    fn name(&self) -> &str {
        "antt"
    }

    fn compute_floor(&self, input: &FloorInput) -> FreteResult<FloorBreakdown> {
        if !input.distance_km.is_finite() || input.distance_km < 0.0 {
            return Err(FreteError::Tariff(format!(
                "distância inválida: {}",
                input.distance_km
            )));
        }
        if !input.empty_return_km.is_finite() || input.empty_return_km < 0.0 {
            return Err(FreteError::Tariff(format!(
                "retorno vazio inválido: {}",
                input.empty_return_km
            )));
        }
        if !input.toll_total.is_finite() || input.toll_total < 0.0 {
            return Err(FreteError::Tariff(format!(
                "pedágio inválido: {}",
                input.toll_total
            )));
        }
        if input.axle_count == 0 {
            return Err(FreteError::Tariff("número de eixos deve ser maior que zero".to_string()));
        }

        let (resolved_axle_count, coef) = self
            .resolve_axles(input.cargo_type, input.axle_count)
            .ok_or_else(|| {
                FreteError::Tariff(format!("sem coeficientes para carga {}", input.cargo_type))
            })?;

        let base = round2(input.distance_km * coef.ccd + coef.cc);
        let empty_return_value = round2(input.empty_return_km * coef.ccd * RETURN_EMPTY_FACTOR);
        let total = round2(base + empty_return_value + input.toll_total);

        Ok(FloorBreakdown {
            base,
            empty_return_value,
            total,
            resolved_axle_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_cargo_five_axles() {
        let table = AnttTable::default();
        let floor = table.compute_floor(&FloorInput::new(100.0, 5)).unwrap();

        // 100 × 6.0036 + 613.54
        assert_eq!(floor.base, 1213.9);
        assert_eq!(floor.empty_return_value, 0.0);
        assert_eq!(floor.total, 1213.9);
        assert_eq!(floor.resolved_axle_count, 5);
    }

    #[test]
    fn test_axles_snap_up() {
        let table = AnttTable::default();
        assert_eq!(table.resolve_axles(CargoType::CargaGeral, 8).unwrap().0, 9);
        assert_eq!(table.resolve_axles(CargoType::CargaGeral, 1).unwrap().0, 2);
        assert_eq!(table.resolve_axles(CargoType::CargaGeral, 12).unwrap().0, 9);
    }

    #[test]
    fn test_empty_return_and_toll() {
        let table = AnttTable::empty().with_row(
            CargoType::CargaGeral,
            3,
            Coefficients { ccd: 4.0, cc: 500.0 },
        );
        let input = FloorInput::new(200.0, 3)
            .with_toll(87.35)
            .with_empty_return(200.0);
        let floor = table.compute_floor(&input).unwrap();

        assert_eq!(floor.base, 1300.0);
        assert_eq!(floor.empty_return_value, 736.0);
        assert_eq!(floor.total, 2123.35);
    }

    #[test]
    fn test_zero_distance_is_loading_cost_only() {
        let table = AnttTable::default();
        let floor = table.compute_floor(&FloorInput::new(0.0, 2)).unwrap();
        assert_eq!(floor.total, 422.51);
    }

    #[test]
    fn test_cargo_type_changes_floor() {
        let table = AnttTable::default();
        let general = table.compute_floor(&FloorInput::new(300.0, 5)).unwrap();
        let reefer = table
            .compute_floor(&FloorInput::new(300.0, 5).with_cargo(CargoType::Frigorificada))
            .unwrap();
        assert!(reefer.total > general.total);
    }

    #[test]
    fn test_invalid_inputs() {
        let table = AnttTable::default();
        assert!(matches!(
            table.compute_floor(&FloorInput::new(-1.0, 5)),
            Err(FreteError::Tariff(_))
        ));
        assert!(table.compute_floor(&FloorInput::new(f64::NAN, 5)).is_err());
        assert!(table.compute_floor(&FloorInput::new(10.0, 0)).is_err());
        assert!(AnttTable::empty().compute_floor(&FloorInput::new(10.0, 5)).is_err());
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(10.0), 10.0);
    }
}
