use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use windup_cli::app::{self, App};
use windup_cli::commands::cli::{self, Commands, ConfigCommands};
use windup_core::error;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let mut cfg =
        windup_core::config::load_default().map_err(|e| error::CliError::Config(e.to_string()))?;
    if let Some(home) = args.kantra_home.as_deref() {
        cfg.runner.kantra_home = windup_core::config::expand_path(home)
            .to_string_lossy()
            .to_string();
    }
    if args.quiet {
        cfg.console.echo = false;
    }
    init_tracing(&cfg.logging).map_err(error::CliError::Command)?;
    tracing::debug!(kantra = %cfg.runner.executable(), "configuration loaded");

    if let Commands::Options = args.command {
        app::print_options();
        return Ok(0);
    }

    let app = App::new(cfg)?;
    match args.command {
        Commands::Config(ConfigCommands::Create(create)) => app.create_configuration(create).await,
        Commands::Config(ConfigCommands::List) => app.list_configurations().await,
        Commands::Config(ConfigCommands::Show { name }) => app.show_configuration(&name).await,
        Commands::Launch(launch) => app.launch(launch).await,
        Commands::Results(results) => app.results(results).await,
        Commands::Options => Ok(0),
    }
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: runner start / IO error
    // 30: launch rejected
    // 40: analysis failed or results unusable
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Runner(re) => match re {
            error::RunnerError::Config(_) => 11,
            error::RunnerError::Spawn(_) => 20,
            error::RunnerError::StreamIo { .. } => 20,
            error::RunnerError::Plugin(_) => 50,
        },
        error::CliError::Launch(le) => match le {
            error::LaunchError::HostFailure(_) => 20,
            _ => app::EXIT_REJECTED,
        },
        error::CliError::Ingest(_) => app::EXIT_FAILED,
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &windup_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("windup"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("windup.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
