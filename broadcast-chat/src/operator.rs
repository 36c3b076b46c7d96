use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    fanout::{FanOut, fan_out},
    message::ServerMessage,
    registry::ConnectionRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorBroadcast {
    NoRecipients,
    Sent(FanOut),
}

/// Broadcasts every operator line to all connected clients until operator
/// input ends.
pub async fn run_operator_loop(registry: Arc<ConnectionRegistry>, mut lines: mpsc::Receiver<String>) {
    info!("type a message and press enter to broadcast it to every client");

    while let Some(line) = lines.recv().await {
        broadcast_operator_line(&registry, &line).await;
    }

    info!("operator input closed; server broadcasts are no longer available");
}

pub async fn broadcast_operator_line(registry: &ConnectionRegistry, line: &str) -> OperatorBroadcast {
    if registry.is_empty().await {
        warn!("no clients connected to receive message");
        return OperatorBroadcast::NoRecipients;
    }

    let report = fan_out(registry, &ServerMessage::operator(line), None).await;
    info!(
        %line,
        delivered = report.delivered,
        failed = report.failed,
        "server broadcast"
    );
    OperatorBroadcast::Sent(report)
}
