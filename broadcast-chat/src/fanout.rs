use tracing::warn;

use crate::{
    message::ServerMessage,
    registry::{ConnectionId, ConnectionRegistry},
};

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub failed: usize,
}

impl FanOut {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Delivers `message` to every registered connection except `exclude`.
///
/// Each recipient is tried on its own: a failed delivery is logged and the
/// loop moves on. Nothing is retried.
pub async fn fan_out(
    registry: &ConnectionRegistry,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) -> FanOut {
    let mut report = FanOut::default();

    for recipient in registry.snapshot().await {
        if Some(recipient.id) == exclude {
            continue;
        }

        match recipient.outbox.deliver(message) {
            Ok(()) => report.delivered += 1,
            Err(error) => {
                warn!(connection = recipient.id, ?error, "failed to deliver broadcast");
                report.failed += 1;
            }
        }
    }

    report
}
