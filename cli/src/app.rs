//! CLI wiring: builds services from config and runs one command against them.
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use windup_core::api::{
    AppConfig, CliError, Configuration, LaunchCoordinator, LaunchEvent,
    LaunchServices, LauncherSettings, OptionPair, RunPhase,
};
use windup_core::launch::RunTransition;
use windup_core::catalog;
use windup_plugins::factory;
use windup_plugins::report::TextReportRenderer;

use crate::commands::cli::{CreateArgs, LaunchArgs, ResultsArgs};
use crate::notifier::StderrNotifier;

pub const EXIT_REJECTED: i32 = 30;
pub const EXIT_FAILED: i32 = 40;
pub const EXIT_CANCELLED: i32 = 130;

pub fn exit_code_for_phase(phase: RunPhase) -> i32 {
    match phase {
        RunPhase::Completed => 0,
        RunPhase::Rejected => EXIT_REJECTED,
        RunPhase::Cancelled => EXIT_CANCELLED,
        _ => EXIT_FAILED,
    }
}

pub struct App {
    cfg: AppConfig,
    services: LaunchServices,
}

impl App {
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: AppConfig) -> Result<Self, CliError> {
        let services = factory::build_services(&cfg, Arc::new(StderrNotifier))?;
        Ok(Self { cfg, services })
    }

    async fn find(&self, name: &str) -> Result<Configuration, CliError> {
        self.services
            .configurations
            .find(name)
            .await?
            .ok_or_else(|| CliError::Command(format!("no configuration named '{name}'")))
    }

    pub async fn create_configuration(&self, args: CreateArgs) -> Result<i32, CliError> {
        let mut configuration = Configuration::new(args.name, args.output);
        for input in args.inputs {
            configuration = configuration.with_input(input);
        }
        for raw in &args.options {
            let pair = OptionPair::parse(raw)
                .ok_or_else(|| CliError::Command(format!("invalid option '{raw}'")))?;
            configuration.options.push(pair);
        }
        for issue in catalog::validate(&configuration) {
            eprintln!("warning: {}={}: {}", issue.key, issue.value, issue.reason);
        }
        self.services.configurations.save(&configuration).await?;
        tracing::info!(configuration = %configuration.name, "configuration saved");
        Ok(0)
    }

    pub async fn list_configurations(&self) -> Result<i32, CliError> {
        for c in self.services.configurations.list().await? {
            let last = c
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!("{}\t{}\tlast run: {}", c.name, c.output_location.display(), last);
        }
        Ok(0)
    }

    pub async fn show_configuration(&self, name: &str) -> Result<i32, CliError> {
        let configuration = self.find(name).await?;
        let json = serde_json::to_string_pretty(&configuration)
            .map_err(|e| CliError::Command(e.to_string()))?;
        println!("{json}");
        Ok(0)
    }

    pub async fn launch(&self, args: LaunchArgs) -> Result<i32, CliError> {
        let configuration = self.find(&args.name).await?;
        let coordinator = LaunchCoordinator::new(
            factory::build_runner(&self.cfg),
            self.services.clone(),
            LauncherSettings {
                executable: self.cfg.runner.executable(),
            },
        );
        let mut events = coordinator.subscribe();

        let phase = match factory::build_server_launcher(&self.cfg, &self.services) {
            Some(launcher) => {
                let started = launcher
                    .launch(configuration, |c| {
                        let coordinator = coordinator.clone();
                        async move { coordinator.launch(c).await }
                    })
                    .await;
                match started {
                    Ok(phase) => phase,
                    // Already reported through the notifier.
                    Err(_) => return Ok(EXIT_REJECTED),
                }
            }
            None => coordinator.launch(configuration).await,
        };
        if phase == RunPhase::Rejected {
            return Ok(EXIT_REJECTED);
        }

        let interrupt = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, cancelling analysis");
                    coordinator.cancel().await;
                }
            })
        };

        let mut outcome = (RunPhase::Failed, None);
        loop {
            match events.recv().await {
                Ok(event) => {
                    if args.events {
                        if let Ok(line) = event.to_json() {
                            eprintln!("{line}");
                        }
                    }
                    if let LaunchEvent::RunFinished {
                        phase, findings, ..
                    } = event
                    {
                        outcome = (phase, findings);
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            }
        }
        coordinator.wait_idle().await;
        interrupt.abort();

        let (phase, findings) = outcome;
        match (phase, findings) {
            (RunPhase::Completed, Some(n)) => eprintln!("analysis completed: {n} findings"),
            (RunPhase::Completed, None) => eprintln!("analysis completed, results unavailable"),
            (other, _) => eprintln!("analysis {}", RunTransition::phase_description(other)),
        }
        Ok(exit_code_for_phase(phase))
    }

    pub async fn results(&self, args: ResultsArgs) -> Result<i32, CliError> {
        let Some(findings) = self.services.ingestion.load(&args.name).await? else {
            return Err(CliError::Command(format!(
                "no results stored for '{}'",
                args.name
            )));
        };
        if args.json {
            let json = serde_json::to_string_pretty(&findings)
                .map_err(|e| CliError::Command(e.to_string()))?;
            println!("{json}");
            return Ok(0);
        }
        let configuration = match self.services.configurations.find(&args.name).await? {
            Some(c) => c,
            None => Configuration::new(args.name.clone(), ""),
        };
        print!("{}", TextReportRenderer::render_text(&configuration, &findings));
        Ok(0)
    }
}

pub fn print_options() {
    for desc in catalog::catalog() {
        let required = if desc.required { ", required" } else { "" };
        println!("{} ({:?}{})", desc.name, desc.value_type, required);
        println!("    {}", desc.description);
        if !desc.available_options.is_empty() {
            println!("    choices: {}", desc.available_options.join(", "));
        }
    }
}
