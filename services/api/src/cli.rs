use crate::demo::{run_once, RunOnceArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use remit_compliance::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Remittance Compliance Engine",
    about = "Serve or run the conveyancing fee remittance compliance engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service exposing the scheduled run trigger (default command)
    Serve(ServeArgs),
    /// Execute a single compliance run against seeded in-memory data and print the report
    RunOnce(RunOnceArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Populate the in-memory backends with demo lawyers and obligations
    #[arg(long)]
    pub(crate) seed_demo: bool,
    /// Claim each reminder slot before dispatch
    #[arg(long)]
    pub(crate) exactly_once: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::RunOnce(args) => run_once(args),
    }
}
