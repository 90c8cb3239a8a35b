//! Interface de linha de comando do Pisofrete.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::shipment::CargoType;

/// Pisofrete - conciliação de fretes contra o piso mínimo da ANTT.
#[derive(Parser, Debug)]
#[command(name = "pisofrete")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "pisofrete.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cria pisofrete.toml com os valores padrão.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Concilia uma planilha (JSON 2-D, primeira linha = cabeçalho).
    Reconcile {
        /// Arquivo de entrada.
        input: PathBuf,

        /// Arquivo do relatório (padrão: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Limite de linhas de dados.
        #[arg(long)]
        row_cap: Option<usize>,

        /// Linhas processadas simultaneamente.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Resolve a distância entre duas cidades ("CIDADE/UF").
    Distance {
        origin: String,
        destination: String,
    },

    /// Calcula o piso mínimo.
    Floor {
        /// Distância em km.
        #[arg(long)]
        km: f64,

        /// Número de eixos.
        #[arg(long)]
        axles: u8,

        /// Tipo de carga (carga_geral, frigorificada, ...).
        #[arg(long, default_value = "carga_geral")]
        cargo: CargoType,

        /// Total de pedágios (R$).
        #[arg(long, default_value_t = 0.0)]
        toll: f64,

        /// Quilometragem de retorno vazio.
        #[arg(long, default_value_t = 0.0)]
        empty_return_km: f64,
    },

    /// Mostra versão.
    Version,
}
