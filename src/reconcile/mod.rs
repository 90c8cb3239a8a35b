//! Conciliação de planilhas de embarques contra o piso mínimo de frete.
//!
//! Fluxo de um lote:
//!
//! 1. Truncamento no limite de linhas
//! 2. Resolução única das colunas ([`ColumnMap`])
//! 3. Processamento concorrente das linhas com janela deslizante
//! 4. Classificação de cada linha e agregação no [`BatchReport`](crate::types::report::BatchReport)
//!
//! Erros de linha são acumulados e nunca interrompem o lote; coluna
//! obrigatória ausente, planilha vazia e cancelamento encerram o lote com
//! um único [`BatchEvent::Failed`].
//!
//! ## Exemplo
//!
//! ```rust,ignore
//! use pisofrete::reconcile::{BatchEvent, BatchReconciler};
//!
//! let reconciler = BatchReconciler::from_config(&config, backend);
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(async move { reconciler.run(rows, tx, token).await });
//! while let Some(event) = rx.recv().await {
//!     if let BatchEvent::Progress { percentage, .. } = event {
//!         println!("{}%", percentage);
//!     }
//! }
//! ```

mod branches;
mod classify;
mod columns;
mod engine;
mod extract;

pub use branches::BranchDirectory;
pub use classify::{
    classify, estimated_charge, percent_diff, Classification, MEDIUM_VARIATION_PCT, TOLERANCE_PCT,
};
pub use columns::{ColumnField, ColumnMap};
pub use engine::{BatchEvent, BatchOptions, BatchReconciler};
pub use extract::{extract_shipment, infer_axles_from_vehicle, parse_axles, parse_money, ExtractContext};
