//! Classificação do valor cobrado contra o piso.
//!
//! ## Regras (na ordem em que são avaliadas)
//!
//! - cobrado < piso: **ERRO_CALCULO / ABAIXO_PISO**, mesmo que a diferença
//!   arredondada seja 0,00%
//! - |diferença| <= 5%: **CONFORME / DENTRO_TOLERANCIA**
//! - 5% < |diferença| <= 15%: **DIVERGENTE / VARIACAO_MEDIA**
//! - diferença > 15%: **ERRO_CALCULO / SOBREPRECO**
//!
//! A diferença percentual é arredondada para 2 casas antes da comparação.

use crate::tariff::round2;
use crate::types::report::{ReasonCode, Status};

/// Tolerância para conformidade (%).
pub const TOLERANCE_PCT: f64 = 5.0;

/// Limite da variação média (%).
pub const MEDIUM_VARIATION_PCT: f64 = 15.0;

/// Acréscimo usado quando a planilha não traz o valor cobrado.
pub const ESTIMATED_CHARGE_FACTOR: f64 = 1.05;

/// Resultado da classificação.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Status,
    pub reason: ReasonCode,
    pub percent_diff: f64,
    pub notes: Vec<String>,
}

/// Diferença percentual do cobrado em relação ao piso, com 2 casas.
pub fn percent_diff(charged: f64, floor: f64) -> f64 {
    if floor <= 0.0 {
        return 0.0;
    }
    round2((charged - floor) / floor * 100.0)
}

/// Valor cobrado presumido: piso + 5%.
pub fn estimated_charge(floor: f64) -> f64 {
    round2(floor * ESTIMATED_CHARGE_FACTOR)
}

/// Classifica o valor cobrado.
pub fn classify(charged: f64, floor: f64) -> Classification {
    let diff = percent_diff(charged, floor);
    let mut notes = Vec::new();

    let (status, reason) = if charged < floor {
        if diff < -MEDIUM_VARIATION_PCT {
            notes.push(format!(
                "{}: {:.2}% abaixo do piso",
                ReasonCode::VariacaoExcessivaNegativa,
                diff.abs()
            ));
        }
        (Status::ErroCalculo, ReasonCode::AbaixoPiso)
    } else if diff.abs() <= TOLERANCE_PCT {
        (Status::Conforme, ReasonCode::DentroTolerancia)
    } else if diff.abs() <= MEDIUM_VARIATION_PCT {
        (Status::Divergente, ReasonCode::VariacaoMedia)
    } else if diff > MEDIUM_VARIATION_PCT {
        (Status::ErroCalculo, ReasonCode::Sobrepreco)
    } else {
        (Status::ErroCalculo, ReasonCode::VariacaoExcessivaNegativa)
    };

    Classification {
        status,
        reason,
        percent_diff: diff,
        notes,
    }
}
