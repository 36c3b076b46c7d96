use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{self, Message},
};
use tracing::{debug, info, warn};

use crate::{
    fanout::fan_out,
    message::ServerMessage,
    registry::{ConnectionId, ConnectionRegistry, Outbox},
};

/// Serves one client from handshake to disconnect.
///
/// The connection is registered once the handshake completes and is
/// unregistered on every exit path, including read errors.
pub async fn handle_connection<S>(
    stream: S,
    peer: Option<SocketAddr>,
    registry: Arc<ConnectionRegistry>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let socket = accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let (sink, inbound) = socket.split();

    let id = registry.next_id();
    let (outbox, queue) = Outbox::channel();
    registry.register(id, outbox.clone()).await?;
    info!(connection = id, ?peer, "client connected");

    let writer = tokio::spawn(forward_outbound(id, sink, queue));
    let result = run_client_session(&registry, id, &outbox, inbound).await;

    cleanup_client_disconnect(&registry, id, peer).await;

    // The writer drains whatever is still queued and closes the socket once
    // the last outbox handle is gone.
    drop(outbox);
    if let Err(error) = writer.await {
        warn!(connection = id, ?error, "client writer task failed");
    }

    result
}

async fn run_client_session<R>(
    registry: &ConnectionRegistry,
    id: ConnectionId,
    outbox: &Outbox,
    mut inbound: R,
) -> Result<()>
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        match frame.context("failed to read from client")? {
            Message::Text(text) => handle_client_text(registry, id, outbox, text).await,
            Message::Close(frame) => {
                debug!(connection = id, ?frame, "client sent close frame");
                break;
            }
            Message::Binary(bytes) => {
                debug!(connection = id, len = bytes.len(), "ignoring binary frame");
            }
            // Pings are answered by the transport.
            _ => {}
        }
    }

    Ok(())
}

async fn handle_client_text(
    registry: &ConnectionRegistry,
    id: ConnectionId,
    outbox: &Outbox,
    text: String,
) {
    info!(connection = id, %text, "received message from client");

    if let Err(error) = outbox.deliver(&ServerMessage::echo(text.as_str())) {
        warn!(connection = id, ?error, "failed to echo message");
    }

    let report = fan_out(registry, &ServerMessage::relay(text), Some(id)).await;
    debug!(
        connection = id,
        delivered = report.delivered,
        failed = report.failed,
        "relayed message"
    );
}

async fn forward_outbound<W>(id: ConnectionId, mut sink: W, mut queue: mpsc::UnboundedReceiver<Message>)
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(frame) = queue.recv().await {
        if let Err(error) = sink.send(frame).await {
            debug!(connection = id, ?error, "failed to deliver message to client");
            return;
        }
    }

    if let Err(error) = sink.close().await {
        debug!(connection = id, ?error, "failed to close client socket cleanly");
    }
}

async fn cleanup_client_disconnect(
    registry: &ConnectionRegistry,
    id: ConnectionId,
    peer: Option<SocketAddr>,
) {
    if registry.unregister(id).await {
        info!(connection = id, ?peer, "client disconnected");
    }
}
