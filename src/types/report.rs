//! Tipos de saída da conciliação.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tariff::FloorBreakdown;
use crate::types::shipment::{Cell, DistanceMethod, Shipment};

/// Situação de conformidade de uma linha.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Valor cobrado dentro da tolerância.
    Conforme,
    /// Variação média em relação ao piso.
    Divergente,
    /// Abaixo do piso ou sobrepreço.
    ErroCalculo,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Conforme => write!(f, "CONFORME"),
            Status::Divergente => write!(f, "DIVERGENTE"),
            Status::ErroCalculo => write!(f, "ERRO_CALCULO"),
        }
    }
}

/// Motivo da classificação.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    DentroTolerancia,
    VariacaoMedia,
    Sobrepreco,
    AbaixoPiso,
    VariacaoExcessivaNegativa,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonCode::DentroTolerancia => write!(f, "DENTRO_TOLERANCIA"),
            ReasonCode::VariacaoMedia => write!(f, "VARIACAO_MEDIA"),
            ReasonCode::Sobrepreco => write!(f, "SOBREPRECO"),
            ReasonCode::AbaixoPiso => write!(f, "ABAIXO_PISO"),
            ReasonCode::VariacaoExcessivaNegativa => write!(f, "VARIACAO_EXCESSIVA_NEGATIVA"),
        }
    }
}

/// Distância resolvida para a linha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceInfo {
    pub distance_km: f64,
    pub duration_min: f64,
    pub method: DistanceMethod,
}

/// Resultado conciliado de uma linha. Imutável após a criação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Índice da linha de dados (0 = primeira linha após o cabeçalho).
    pub row_index: usize,

    /// Campos do embarque.
    pub shipment: Shipment,

    /// Distância usada no cálculo.
    pub distance: DistanceInfo,

    /// Piso calculado.
    pub floor: FloorBreakdown,

    /// Valor cobrado (da planilha ou estimado).
    pub charged_value: f64,

    /// Se o valor cobrado veio da planilha.
    pub charged_from_sheet: bool,

    /// Diferença percentual em relação ao piso.
    pub percent_diff: f64,

    pub status: Status,
    pub reason: ReasonCode,

    /// Observações (avisos de fallback, estimativas).
    pub notes: Vec<String>,
}

/// Erro de linha: não interrompe o lote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: usize,
    pub message: String,
    /// Conteúdo original da linha.
    pub row: Vec<Cell>,
}

/// Aviso de truncamento da planilha.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationInfo {
    pub original_count: usize,
    pub processed_count: usize,
    pub message: String,
}

/// Contagem por status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub conforme: usize,
    pub divergente: usize,
    pub erro_calculo: usize,
}

impl BatchStats {
    /// Registra um status.
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Conforme => self.conforme += 1,
            Status::Divergente => self.divergente += 1,
            Status::ErroCalculo => self.erro_calculo += 1,
        }
    }

    /// Taxa de conformidade sobre as linhas calculadas.
    pub fn compliance_rate(&self) -> f64 {
        let classified = self.conforme + self.divergente + self.erro_calculo;
        if classified == 0 {
            0.0
        } else {
            self.conforme as f64 / classified as f64
        }
    }
}

/// Conformidade por método de distância.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodBreakdown {
    pub rows: usize,
    pub conforme: usize,
    pub divergente: usize,
    pub erro_calculo: usize,
    pub compliance_rate: f64,
}

impl MethodBreakdown {
    pub fn record(&mut self, status: Status) {
        self.rows += 1;
        match status {
            Status::Conforme => self.conforme += 1,
            Status::Divergente => self.divergente += 1,
            Status::ErroCalculo => self.erro_calculo += 1,
        }
        self.compliance_rate = self.conforme as f64 / self.rows as f64;
    }
}

/// Relatório final de um lote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// ID do processamento.
    pub job_id: String,

    /// Resultados ordenados por índice de linha.
    pub results: Vec<ReconciliationResult>,

    /// Erros de linha ordenados por índice.
    pub errors: Vec<RowError>,

    /// Presente quando a planilha foi truncada.
    pub truncation: Option<TruncationInfo>,

    pub stats: BatchStats,

    /// Conformidade agrupada por método de distância.
    pub by_method: BTreeMap<DistanceMethod, MethodBreakdown>,

    /// Linhas processadas (resultados + erros).
    pub processed: usize,

    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl BatchReport {
    /// Monta o relatório, ordenando por linha e calculando estatísticas.
    pub fn build(
        job_id: impl Into<String>,
        mut results: Vec<ReconciliationResult>,
        mut errors: Vec<RowError>,
        truncation: Option<TruncationInfo>,
    ) -> Self {
        results.sort_by_key(|r| r.row_index);
        errors.sort_by_key(|e| e.row_index);

        let mut stats = BatchStats {
            total: results.len() + errors.len(),
            ..BatchStats::default()
        };
        let mut by_method: BTreeMap<DistanceMethod, MethodBreakdown> = BTreeMap::new();
        for result in &results {
            stats.record(result.status);
            by_method
                .entry(result.distance.method)
                .or_default()
                .record(result.status);
        }

        Self {
            job_id: job_id.into(),
            processed: results.len() + errors.len(),
            results,
            errors,
            truncation,
            stats,
            by_method,
            generated_at: chrono::Utc::now(),
        }
    }

    /// Taxa de conformidade das linhas com distância roteada (ou mesma cidade).
    pub fn routed_compliance_rate(&self) -> Option<f64> {
        self.compliance_rate_where(|m| !m.is_estimated())
    }

    /// Taxa de conformidade das linhas com distância estimada.
    pub fn estimated_compliance_rate(&self) -> Option<f64> {
        self.compliance_rate_where(|m| m.is_estimated())
    }

    fn compliance_rate_where<F: Fn(&DistanceMethod) -> bool>(&self, pred: F) -> Option<f64> {
        let (rows, conforme) = self
            .by_method
            .iter()
            .filter(|(method, _)| pred(method))
            .fold((0usize, 0usize), |(rows, ok), (_, b)| (rows + b.rows, ok + b.conforme));
        if rows == 0 {
            None
        } else {
            Some(conforme as f64 / rows as f64)
        }
    }
}
