//! Motor de conciliação em lote.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::branches::BranchDirectory;
use super::classify::{classify, estimated_charge};
use super::columns::ColumnMap;
use super::extract::{extract_shipment, ExtractContext};
use crate::geo::{DistanceResolver, MapsBackend};
use crate::tariff::{AnttTable, FloorCalculator, FloorInput};
use crate::types::config::{BatchConfig, Config};
use crate::types::errors::{FreteError, FreteResult};
use crate::types::report::{BatchReport, DistanceInfo, ReconciliationResult, RowError, TruncationInfo};
use crate::types::shipment::{CargoType, Cell};

/// Opções de um lote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub concurrency_limit: usize,
    pub progress_every_n_rows: usize,
    pub row_cap: usize,
    pub include_empty_return: bool,
    pub default_cargo_type: CargoType,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            progress_every_n_rows: config.progress_every_n_rows,
            row_cap: config.row_cap,
            include_empty_return: config.include_empty_return,
            default_cargo_type: config.default_cargo_type,
        }
    }
}

/// Eventos emitidos durante o lote.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Progresso. `processed` nunca diminui.
    Progress {
        processed: usize,
        total: usize,
        percentage: u8,
        message: String,
    },
    /// Lote concluído.
    Completed(BatchReport),
    /// Falha fatal (coluna obrigatória ausente, planilha vazia, cancelamento).
    Failed(String),
}

/// Concilia planilhas de embarques contra o piso mínimo.
pub struct BatchReconciler {
    resolver: DistanceResolver,
    calculator: Arc<dyn FloorCalculator>,
    branches: BranchDirectory,
    options: BatchOptions,
}

impl BatchReconciler {
    pub fn new(
        resolver: DistanceResolver,
        calculator: Arc<dyn FloorCalculator>,
        branches: BranchDirectory,
        options: BatchOptions,
    ) -> Self {
        Self {
            resolver,
            calculator,
            branches,
            options,
        }
    }

    /// Monta o conciliador com a tabela padrão sobre o serviço de mapas dado.
    pub fn from_config(config: &Config, backend: Arc<dyn MapsBackend>) -> Self {
        Self::new(
            DistanceResolver::from_backend(backend, &config.cache),
            Arc::new(AnttTable::default()),
            BranchDirectory::from_config(&config.origin),
            BatchOptions::from(&config.batch),
        )
    }

    pub fn options_mut(&mut self) -> &mut BatchOptions {
        &mut self.options
    }

    /// Executa o lote, emitindo eventos no canal.
    ///
    /// Termina sempre com exatamente um `Completed` ou um `Failed`.
    pub async fn run(
        &self,
        rows: Vec<Vec<Cell>>,
        events: mpsc::Sender<BatchEvent>,
        cancel: CancellationToken,
    ) -> FreteResult<BatchReport> {
        match self.reconcile(rows, &events, &cancel).await {
            Ok(report) => {
                let _ = events.send(BatchEvent::Completed(report.clone())).await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "batch failed");
                let _ = events.send(BatchEvent::Failed(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Executa o lote sem canal de eventos.
    pub async fn reconcile_rows(&self, rows: Vec<Vec<Cell>>) -> FreteResult<BatchReport> {
        let (tx, mut rx) = mpsc::channel(64);
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let report = self.reconcile(rows, &tx, &CancellationToken::new()).await;
        drop(tx);
        let _ = drain.await;
        report
    }

    async fn reconcile(
        &self,
        mut rows: Vec<Vec<Cell>>,
        events: &mpsc::Sender<BatchEvent>,
        cancel: &CancellationToken,
    ) -> FreteResult<BatchReport> {
        if rows.len() < 2 {
            return Err(FreteError::EmptyDataset);
        }
        let headers = rows.remove(0);

        // Índices originais das linhas de dados, sem as linhas em branco
        let data_rows = rows.len();
        let mut rows: Vec<(usize, Vec<Cell>)> = rows
            .into_iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().all(Cell::is_blank))
            .collect();
        if rows.is_empty() {
            return Err(FreteError::EmptyDataset);
        }
        if rows.len() < data_rows {
            tracing::debug!(skipped = data_rows - rows.len(), "blank rows skipped");
        }

        let columns = ColumnMap::resolve(&headers)?;

        let truncation = self.truncate(&mut rows);
        let total = rows.len();
        let job_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            job_id = %job_id,
            rows = total,
            calculator = self.calculator.name(),
            "batch started"
        );

        let ctx = ExtractContext {
            columns: &columns,
            branches: &self.branches,
            default_cargo_type: self.options.default_cargo_type,
        };
        let ctx = &ctx;

        let mut outcomes = stream::iter(rows)
            .map(|(row_index, row)| async move {
                match self.process_row(row_index, &row, ctx).await {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        tracing::warn!(row = row_index, error = %e, "row failed");
                        Err(RowError {
                            row_index,
                            message: row_message(e),
                            row,
                        })
                    }
                }
            })
            .buffer_unordered(self.options.concurrency_limit.max(1));

        let every = self.options.progress_every_n_rows.max(1);
        let mut results = Vec::with_capacity(total);
        let mut errors = Vec::new();
        let mut processed = 0usize;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(job_id = %job_id, processed, total, "batch cancelled");
                    return Err(FreteError::Cancelled);
                }
                next = outcomes.next() => match next {
                    Some(outcome) => outcome,
                    None => break,
                },
            };

            match outcome {
                Ok(result) => results.push(result),
                Err(error) => errors.push(error),
            }
            processed += 1;

            if processed % every == 0 || processed == total {
                let percentage = (processed * 100 / total) as u8;
                let _ = events
                    .send(BatchEvent::Progress {
                        processed,
                        total,
                        percentage,
                        message: format!("Processando linha {} de {}", processed, total),
                    })
                    .await;
            }
        }

        let report = BatchReport::build(job_id, results, errors, truncation);
        log_summary(&report, self.calculator.name());
        Ok(report)
    }

    fn truncate(&self, rows: &mut Vec<(usize, Vec<Cell>)>) -> Option<TruncationInfo> {
        let cap = self.options.row_cap.max(1);
        if rows.len() <= cap {
            return None;
        }
        let original_count = rows.len();
        rows.truncate(cap);
        tracing::warn!(original = original_count, processed = cap, "dataset truncated");
        Some(TruncationInfo {
            original_count,
            processed_count: cap,
            message: format!(
                "Planilha com {} linhas; apenas as primeiras {} foram processadas",
                original_count, cap
            ),
        })
    }

    async fn process_row(
        &self,
        row_index: usize,
        row: &[Cell],
        ctx: &ExtractContext<'_>,
    ) -> FreteResult<ReconciliationResult> {
        let shipment = extract_shipment(row_index, row, ctx)?;
        let resolved = self
            .resolver
            .resolve(&shipment.origin, &shipment.destination)
            .await;

        let empty_return_km = if self.options.include_empty_return {
            resolved.distance_km
        } else {
            0.0
        };
        let input = FloorInput {
            distance_km: resolved.distance_km,
            axle_count: shipment.axle_count,
            cargo_type: shipment.cargo_type,
            toll_total: shipment.toll,
            empty_return_km,
        };
        let floor = self
            .calculator
            .compute_floor(&input)
            .map_err(|e| FreteError::row(row_index, e.to_string()))?;

        let mut notes = resolved.warnings.clone();
        let (charged_value, charged_from_sheet) = match shipment.charged_value {
            Some(value) => (value, true),
            None => {
                notes.push("valor cobrado ausente; estimado em piso + 5%".to_string());
                (estimated_charge(floor.total), false)
            }
        };
        if floor.resolved_axle_count != shipment.axle_count {
            notes.push(format!(
                "{} eixos tarifados como {}",
                shipment.axle_count, floor.resolved_axle_count
            ));
        }

        let classification = classify(charged_value, floor.total);
        notes.extend(classification.notes);

        tracing::debug!(
            row = row_index,
            method = %resolved.method,
            km = resolved.distance_km,
            floor = floor.total,
            status = %classification.status,
            "row reconciled"
        );

        Ok(ReconciliationResult {
            row_index,
            shipment,
            distance: DistanceInfo {
                distance_km: resolved.distance_km,
                duration_min: resolved.duration_min,
                method: resolved.method,
            },
            floor,
            charged_value,
            charged_from_sheet,
            percent_diff: classification.percent_diff,
            status: classification.status,
            reason: classification.reason,
            notes,
        })
    }
}

fn row_message(error: FreteError) -> String {
    match error {
        FreteError::Row { message, .. } => message,
        other => other.to_string(),
    }
}

fn log_summary(report: &BatchReport, calculator: &str) {
    let pct = |rate: Option<f64>| rate.map(|r| format!("{:.1}%", r * 100.0));
    tracing::info!(
        job_id = %report.job_id,
        calculator,
        total = report.stats.total,
        conforme = report.stats.conforme,
        divergente = report.stats.divergente,
        erro_calculo = report.stats.erro_calculo,
        errors = report.errors.len(),
        routed_compliance = ?pct(report.routed_compliance_rate()),
        estimated_compliance = ?pct(report.estimated_compliance_rate()),
        "batch completed"
    );
    for (method, breakdown) in &report.by_method {
        tracing::debug!(
            method = %method,
            rows = breakdown.rows,
            compliance = breakdown.compliance_rate,
            "compliance by distance method"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::testing::FakeMaps;
    use crate::geo::{Geocoder, Router};
    use crate::types::config::OriginConfig;
    use crate::types::report::{ReasonCode, Status};
    use crate::types::shipment::DistanceMethod;
    use std::time::Duration;

    fn reconciler(maps: Arc<FakeMaps>, options: BatchOptions) -> BatchReconciler {
        let resolver = DistanceResolver::new(
            Geocoder::new(maps.clone(), 100, Duration::from_secs(3600)),
            Router::new(maps, 100, Duration::from_secs(3600)),
        );
        BatchReconciler::new(
            resolver,
            Arc::new(AnttTable::default()),
            BranchDirectory::from_config(&OriginConfig::default()),
            options,
        )
    }

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<Cell>> {
        rows.iter()
            .map(|r| r.iter().map(|&c| if c.is_empty() { Cell::Empty } else { Cell::from(c) }).collect())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifies_rows() {
        let rec = reconciler(FakeMaps::new(), BatchOptions::default());
        let rows = sheet(&[
            &["Destino", "UF", "Eixos", "Valor Frete"],
            &["São Paulo", "SP", "5", "613,54"],
            &["São Paulo", "SP", "5", "600,00"],
            &["São Paulo", "SP", "5", "800,00"],
            &["São Paulo", "SP", "5", ""],
        ]);

        let report = rec.reconcile_rows(rows).await.unwrap();
        assert_eq!(report.results.len(), 4);
        assert!(report.errors.is_empty());

        let r = &report.results;
        assert_eq!(r[0].distance.method, DistanceMethod::SameCity);
        assert_eq!(r[0].floor.total, 613.54);
        assert_eq!(r[0].status, Status::Conforme);
        assert_eq!(r[1].reason, ReasonCode::AbaixoPiso);
        assert_eq!(r[2].reason, ReasonCode::Sobrepreco);
        assert_eq!(r[3].status, Status::Conforme);
        assert!(!r[3].charged_from_sheet);
        assert_eq!(r[3].charged_value, 644.22);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thousands_separated_charge() {
        let rec = reconciler(FakeMaps::new(), BatchOptions::default());
        let rows = sheet(&[
            &["Destino", "UF", "Eixos", "Valor Frete"],
            &["São Paulo", "SP", "5", "R$ 2.500"],
        ]);

        let report = rec.reconcile_rows(rows).await.unwrap();
        let r = &report.results[0];
        assert_eq!(r.charged_value, 2500.0);
        assert_eq!(r.reason, ReasonCode::Sobrepreco);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_rows_are_skipped() {
        let options = BatchOptions {
            row_cap: 2,
            ..BatchOptions::default()
        };
        let rec = reconciler(FakeMaps::new(), options);
        let rows = sheet(&[
            &["Destino", "UF", "Eixos"],
            &["", "", ""],
            &["Campinas", "SP", "5"],
            &["", " ", ""],
            &["Santos", "SP", "5"],
            &["", "", ""],
        ]);

        let report = rec.reconcile_rows(rows).await.unwrap();
        assert!(report.errors.is_empty());
        assert!(report.truncation.is_none());
        let indices: Vec<usize> = report.results.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_blank_rows_is_empty_dataset() {
        let rec = reconciler(FakeMaps::new(), BatchOptions::default());
        let err = rec
            .reconcile_rows(sheet(&[&["Destino", "Eixos"], &["", ""]]))
            .await
            .unwrap_err();
        assert!(matches!(err, FreteError::EmptyDataset));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_axle_column_fails_batch() {
        let rec = reconciler(FakeMaps::new(), BatchOptions::default());
        let rows = sheet(&[&["Destino", "UF"], &["Campinas", "SP"]]);

        let (tx, mut rx) = mpsc::channel(16);
        let err = rec.run(rows, tx, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FreteError::MissingColumn { field: "eixos", .. }));
        assert!(matches!(rx.recv().await, Some(BatchEvent::Failed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_only_is_empty_dataset() {
        let rec = reconciler(FakeMaps::new(), BatchOptions::default());
        let err = rec
            .reconcile_rows(sheet(&[&["Destino", "Eixos"]]))
            .await
            .unwrap_err();
        assert!(matches!(err, FreteError::EmptyDataset));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tariff_failure_is_row_error() {
        let rec = reconciler(FakeMaps::new(), BatchOptions::default());
        let rows = sheet(&[
            &["Destino", "UF", "Eixos", "Pedágio"],
            &["Campinas", "SP", "5", "-10"],
            &["Campinas", "SP", "5", "10"],
        ]);

        let report = rec.reconcile_rows(rows).await.unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_index, 0);
        assert_eq!(report.processed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_every_n_rows() {
        let options = BatchOptions {
            progress_every_n_rows: 2,
            ..BatchOptions::default()
        };
        let rec = reconciler(FakeMaps::new(), options);
        let mut rows = sheet(&[&["Destino", "UF", "Eixos"]]);
        for _ in 0..5 {
            rows.extend(sheet(&[&["Campinas", "SP", "3"]]));
        }

        let (tx, mut rx) = mpsc::channel(64);
        rec.run(rows, tx, CancellationToken::new()).await.unwrap();

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if let BatchEvent::Progress { processed, .. } = event {
                seen.push(processed);
            }
        }
        assert_eq!(seen, vec![2, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_return_included_when_configured() {
        let options = BatchOptions {
            include_empty_return: true,
            ..BatchOptions::default()
        };
        let rec = reconciler(FakeMaps::new(), options);
        let rows = sheet(&[&["Destino", "UF", "Eixos"], &["Campinas", "SP", "5"]]);

        let report = rec.reconcile_rows(rows).await.unwrap();
        assert!(report.results[0].floor.empty_return_value > 0.0);
    }
}
