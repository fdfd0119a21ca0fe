use anyhow::{Context, Result};
use prefetch::cli::commands::{DockerfileImagesCommand, RunCommand};
use prefetch::cli::output::{format_failure, format_image_list, format_report};
use prefetch::cli::{Cli, Command, LogFormat};
use prefetch::core::{DockerfileScanner, PrefetchInputs};
use prefetch::execution::{PrefetchEngine, ProcessRunner};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format)?;

    // Execute command
    match &cli.command {
        Some(Command::DockerfileImages(cmd)) => list_dockerfile_images(cmd)?,
        None => run_prefetch(&cli.run).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Plaintext => builder.with_ansi(false).try_init(),
        LogFormat::Console => builder.with_ansi(true).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))
}

async fn run_prefetch(cmd: &RunCommand) -> Result<()> {
    info!("Starting prefetch version {}...", env!("CARGO_PKG_VERSION"));

    // Cancel in-flight commands on SIGINT/SIGTERM
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let inputs = PrefetchInputs::from_json(&cmd.stages, cmd.credentials.as_deref())
        .context("Failed to decode injected inputs")?;

    let engine = PrefetchEngine::new(ProcessRunner::new(&cmd.work_dir), &cmd.docker_binary);

    match engine.run(&cancel, &inputs, &cmd.run_context()).await {
        Ok(report) => {
            println!("{}", format_report(&report));
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Prefetch failed");
            println!("{}", format_failure(&e));
            std::process::exit(1);
        }
    }
}

fn list_dockerfile_images(cmd: &DockerfileImagesCommand) -> Result<()> {
    let scanner = DockerfileScanner::new().context("Failed to compile FROM pattern")?;
    let images = scanner.images_in_file(&cmd.file)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&images)?);
    } else {
        println!("{}", format_image_list(&cmd.file, &images));
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT, cancelling running commands");
        }
        _ = terminate => {
            info!("received SIGTERM, cancelling running commands");
        }
    }
}
