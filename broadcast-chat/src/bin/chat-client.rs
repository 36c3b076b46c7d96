use anyhow::Result;
use clap::Parser;

use broadcast_chat::{cli::ClientArgs, client, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // The console is the chat display; diagnostics go to stderr.
    telemetry::init_tracing("warn", std::io::stderr);

    let args = ClientArgs::parse();
    client::run(args).await
}
