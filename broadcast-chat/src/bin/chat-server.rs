use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use broadcast_chat::{cli::ServerArgs, console, operator, server::Server, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing("info", std::io::stdout);

    let args = ServerArgs::parse();
    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let server = Server::new(listener);
    let addr = server.local_addr()?;
    info!("server listening on ws://{}", addr);
    info!("waiting for client connections...");

    let operator = tokio::spawn(operator::run_operator_loop(
        server.registry(),
        console::spawn_stdin_reader(),
    ));

    let result = server.run_until_ctrl_c().await;
    operator.abort();

    if let Err(err) = result {
        warn!("server exited with error: {err:?}");
        return Err(err);
    }

    Ok(())
}
