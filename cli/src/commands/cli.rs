use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "windup", version, about = "Launch kantra analyses and browse their findings")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the kantra executable. Overrides `runner.kantra_home`.
    #[arg(long, global = true)]
    pub kantra_home: Option<String>,

    /// Do not echo analysis output.
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage stored launch configurations.
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Run the analysis of a stored configuration and wait for it.
    Launch(LaunchArgs),
    /// Print the options kantra understands.
    Options,
    /// Print the findings of the last successful run.
    Results(ResultsArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create or replace a configuration.
    Create(CreateArgs),
    List,
    Show { name: String },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CreateArgs {
    pub name: String,

    #[arg(long, short)]
    pub output: PathBuf,

    /// File or directory to analyze. Repeatable.
    #[arg(long = "input", short, action = clap::ArgAction::Append)]
    pub inputs: Vec<String>,

    /// Analyzer option as KEY=VALUE, or KEY for a flag. Repeatable.
    /// e.g. --option target=quarkus --option overwrite
    #[arg(long = "option", short = 'O', action = clap::ArgAction::Append)]
    pub options: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LaunchArgs {
    pub name: String,

    /// Print lifecycle events as JSON lines on stderr.
    #[arg(long)]
    pub events: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResultsArgs {
    pub name: String,

    #[arg(long)]
    pub json: bool,
}
