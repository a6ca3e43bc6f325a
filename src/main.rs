use std::path::PathBuf;

use clap::{Parser, Subcommand};
use iam_audit_tools::iam::{IamClient, WaitPolicy};
use iam_audit_tools::{Result, ToolError, apply, export};
use tracing_subscriber::EnvFilter;

/// Fixed workbook name shared by the exporter and the applier.
const DEFAULT_WORKBOOK: &str = "iam_user_roles_with_activity.xlsx";

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    let client = IamClient::from_env()?;
    match cli.command {
        Command::Export(args) => {
            export::export_users(&client, &args.output, &WaitPolicy::default())
        }
        Command::Apply(args) => apply::apply_changes(&client, &args.input),
    }
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Audit IAM users into a workbook and apply operator-edited changes."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export every IAM user with credential activity to a workbook.
    Export(ExportArgs),
    /// Apply the action rows of an operator-edited workbook.
    Apply(ApplyArgs),
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Output workbook path.
    #[arg(long, default_value = DEFAULT_WORKBOOK)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct ApplyArgs {
    /// Input workbook path.
    #[arg(long, default_value = DEFAULT_WORKBOOK)]
    input: PathBuf,
}
