pub mod channels;
pub mod claim;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod messages;
pub mod parser;
pub mod server;
pub mod session;
pub mod settings;
pub mod utils;

use clap::{Parser, Subcommand};

use error::DealdropError;

/// The Dealdrop server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the bot and the operations API
    Serve(server::ServeArgs),
    /// Apply database migrations and exit
    Migrate(server::MigrateArgs),
}

////////////////////////////////////////////////////////////////////////////////
// PUBLIC FUNCTION
////////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> Result<(), DealdropError> {
    let args = Cli::parse();
    match args.command {
        Commands::Serve(serve) => server::init_server(serve).await,
        Commands::Migrate(migrate) => server::init_migrate(migrate).await,
    }
}
