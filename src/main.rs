use clap::Parser;
use pisofrete::cli::{Cli, Commands};
use pisofrete::types::config::Config;
use pisofrete::FreteResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> FreteResult<()> {
    let cli = Cli::parse();

    // Configuração antes do logging
    let mut config = if cli.config.exists() {
        Config::load(&cli.config).unwrap_or_else(|e| {
            eprintln!("Aviso: {} ignorado ({}); usando padrão", cli.config.display(), e);
            Config::default_config()
        })
    } else {
        Config::default_config()
    };
    config.apply_env()?;
    config.validate()?;

    // Flags da CLI têm precedência sobre o arquivo
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("pisofrete={}", log_level)
            .parse()
            .unwrap_or_else(|_| "pisofrete=info".parse().expect("fallback directive is valid")),
    );

    let json = config.general.log_format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(filter)
        .init();

    tracing::debug!("Configuração carregada de: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            pisofrete::cli::commands::init(path).await?;
        }
        Commands::Reconcile {
            input,
            output,
            row_cap,
            concurrency,
        } => {
            pisofrete::cli::commands::reconcile(
                &input,
                output.as_deref(),
                row_cap,
                concurrency,
                cli.quiet,
                &config,
            )
            .await?;
        }
        Commands::Distance {
            origin,
            destination,
        } => {
            pisofrete::cli::commands::distance(&origin, &destination, &config).await?;
        }
        Commands::Floor {
            km,
            axles,
            cargo,
            toll,
            empty_return_km,
        } => {
            pisofrete::cli::commands::floor(km, axles, cargo, toll, empty_return_km)?;
        }
        Commands::Version => {
            pisofrete::cli::commands::version();
        }
    }

    Ok(())
}
