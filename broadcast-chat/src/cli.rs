use clap::Parser;

pub const DEFAULT_LISTEN: &str = "localhost:8765";
pub const DEFAULT_URL: &str = "ws://localhost:8765";

/// Run the chat server: echo each message to its sender, relay it to everyone
/// else, and broadcast lines typed on stdin.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address the server should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: String,
}

/// Connect to the chat server and exchange lines with everyone else.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ClientArgs {
    /// WebSocket URL of the server.
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,
}
