use clap::Parser;
use miette::Report;
use tracing_subscriber::EnvFilter;

mod cli;

/// Root CLI struct
#[derive(Parser, Debug)]
#[command(
    name = "apb-script",
    about = "Scripted APB transaction engine",
    version,
    rename_all = "kebab-case"
)]
pub struct Cli {
    #[command(subcommand)]
    action: Actions,
}

/// CLI actions
#[derive(Debug, clap::Subcommand)]
pub enum Actions {
    Run(cli::RunCmd),
    Assemble(cli::AssembleCmd),
}

/// CLI entry point
impl Cli {
    pub fn execute(&self) -> Result<(), Report> {
        match &self.action {
            Actions::Run(run) => run.execute(),
            Actions::Assemble(assemble) => assemble.execute(),
        }
    }
}

/// Executable entry point
pub fn main() -> Result<(), Report> {
    // read command-line args
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli.execute()
}
