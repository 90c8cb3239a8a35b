//! Implementação dos comandos CLI do Pisofrete.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::geo::{DistanceResolver, MapsBackend, OrsClient};
use crate::reconcile::{BatchEvent, BatchReconciler};
use crate::tariff::{AnttTable, FloorCalculator, FloorInput};
use crate::types::config::Config;
use crate::types::report::BatchReport;
use crate::types::shipment::{CargoType, Cell, Place};
use crate::{FreteError, FreteResult};

/// Cria a configuração padrão no diretório indicado.
pub async fn init(path: Option<PathBuf>) -> FreteResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Diretório criado: {}", target_dir.display());
    }

    let config_path = target_dir.join("pisofrete.toml");

    if config_path.exists() {
        println!("Configuração já existe em: {}", config_path.display());
        return Ok(());
    }

    Config::default_config().save(&config_path)?;

    println!("Configuração criada em: {}", config_path.display());
    println!();
    println!("Próximos passos:");
    println!("  1. Defina a chave do OpenRouteService: export ORS_API_KEY=...");
    println!("  2. Concilie uma planilha: pisofrete reconcile planilha.json");

    Ok(())
}

fn maps_backend(config: &Config) -> FreteResult<Arc<dyn MapsBackend>> {
    Ok(Arc::new(OrsClient::from_config(&config.maps)?))
}

/// Concilia uma planilha JSON.
pub async fn reconcile(
    input: &Path,
    output: Option<&Path>,
    row_cap: Option<usize>,
    concurrency: Option<usize>,
    quiet: bool,
    config: &Config,
) -> FreteResult<()> {
    let content = std::fs::read_to_string(input)?;
    let rows: Vec<Vec<Cell>> = serde_json::from_str(&content)?;
    tracing::debug!(input = %input.display(), rows = rows.len(), "dataset loaded");

    let mut reconciler = BatchReconciler::from_config(config, maps_backend(config)?);
    if let Some(cap) = row_cap {
        if cap == 0 {
            return Err(FreteError::config("--row-cap deve ser maior que zero"));
        }
        reconciler.options_mut().row_cap = cap;
    }
    if let Some(limit) = concurrency {
        if limit == 0 {
            return Err(FreteError::config("--concurrency deve ser maior que zero"));
        }
        reconciler.options_mut().concurrency_limit = limit;
    }

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupção recebida, cancelando lote");
            ctrl_c.cancel();
        }
    });

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .map_err(|e| FreteError::other(e.to_string()))?
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    };

    let (tx, mut rx) = mpsc::channel(64);
    let progress = async {
        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::Progress {
                    processed,
                    total,
                    message,
                    ..
                } => {
                    bar.set_length(total as u64);
                    bar.set_position(processed as u64);
                    bar.set_message(message);
                }
                BatchEvent::Completed(_) => bar.finish_with_message("concluído"),
                BatchEvent::Failed(reason) => bar.abandon_with_message(reason),
            }
        }
    };

    let (report, ()) = tokio::join!(reconciler.run(rows, tx, token), progress);
    let report = report?;

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("Relatório salvo em: {}", path.display());
        }
        None => println!("{}", json),
    }

    if !quiet {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    let stats = &report.stats;
    eprintln!();
    eprintln!("Linhas processadas: {}", report.processed);
    eprintln!("  ✓ CONFORME:     {}", stats.conforme);
    eprintln!("  ~ DIVERGENTE:   {}", stats.divergente);
    eprintln!("  ✗ ERRO_CALCULO: {}", stats.erro_calculo);
    eprintln!("  ! erros:        {}", report.errors.len());
    eprintln!("Conformidade: {:.1}%", stats.compliance_rate() * 100.0);

    for (method, breakdown) in &report.by_method {
        eprintln!(
            "  {:<16} {:>4} linhas, {:.1}% conformes",
            method.to_string(),
            breakdown.rows,
            breakdown.compliance_rate * 100.0
        );
    }

    if let Some(truncation) = &report.truncation {
        eprintln!();
        eprintln!("⚠ {}", truncation.message);
    }
}

/// Resolve e mostra a distância entre duas cidades.
pub async fn distance(origin: &str, destination: &str, config: &Config) -> FreteResult<()> {
    let (origin, destination) = (Place::parse(origin), Place::parse(destination));
    let resolver = DistanceResolver::from_backend(maps_backend(config)?, &config.cache);

    let resolved = resolver.resolve(&origin, &destination).await;

    println!("{} → {}", origin, destination);
    println!("  distância: {:.1} km", resolved.distance_km);
    println!("  duração:   {:.0} min", resolved.duration_min);
    println!("  método:    {}", resolved.method);
    for warning in &resolved.warnings {
        println!("  ⚠ {}", warning);
    }

    Ok(())
}

/// Calcula e mostra o piso mínimo.
pub fn floor(
    km: f64,
    axles: u8,
    cargo: CargoType,
    toll: f64,
    empty_return_km: f64,
) -> FreteResult<()> {
    let table = AnttTable::default();
    let input = FloorInput::new(km, axles)
        .with_cargo(cargo)
        .with_toll(toll)
        .with_empty_return(empty_return_km);
    let floor = table.compute_floor(&input)?;

    println!("Piso mínimo ({}, {} eixos, {} km)", cargo, floor.resolved_axle_count, km);
    println!("  base:          R$ {:.2}", floor.base);
    println!("  retorno vazio: R$ {:.2}", floor.empty_return_value);
    println!("  pedágio:       R$ {:.2}", toll);
    println!("  total:         R$ {:.2}", floor.total);

    Ok(())
}

/// Mostra versão.
pub fn version() {
    println!("pisofrete {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Conciliação de fretes contra o piso mínimo da ANTT");
}
