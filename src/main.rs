use clap::{Parser, Subcommand};
use dotenv::dotenv;
use daedalus_rs::daedalus::server;
use daedalus_rs::daedalus::workflow::builder::Builder;

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the agent-building workflow over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Optional YAML configuration file; environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Serve { port, config } => {
            let graph = Builder::new().build_from_file(config.as_deref())?;
            server::serve(Arc::new(graph), port).await?;
        }
    }

    Ok(())
}
