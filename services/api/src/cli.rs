use crate::demo::{run_demo, run_keys, DemoArgs, KeysArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use growth_score::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Growth Score",
    about = "Run and demonstrate the credential scoring service from the command line",
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
    /// Walk one applicant from registration to a published credential level
    Demo(DemoArgs),
    /// Derive organization and score record keys without contacting the service
    Keys(KeysArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Keys(args) => run_keys(args),
    }
}
