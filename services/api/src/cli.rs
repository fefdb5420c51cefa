use crate::demo::{run_demo, run_quote, DemoArgs, QuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use marketplace::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Estate Marketplace",
    about = "Run the marketplace workflow service or exercise it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Price a shortlet stay without creating a booking
    Quote(QuoteArgs),
    /// Walk an inspection, a booking, a document check and a subscription through payment
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Property catalog CSV loaded into the directory at startup
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Deal site CSV loaded into the directory at startup
    #[arg(long)]
    pub(crate) deal_sites: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Quote(args) => run_quote(args),
        Command::Demo(args) => run_demo(args),
    }
}
