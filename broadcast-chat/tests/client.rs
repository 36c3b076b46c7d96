use std::time::Duration;

use anyhow::{Context, Result};
use broadcast_chat::{
    client::{SessionEnd, chat, connect, run_session},
    server::Server,
};
use futures::{SinkExt, StreamExt};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message};

const READ_TIMEOUT: Duration = Duration::from_secs(2);

async fn start_server() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let server = Server::new(listener);
    let addr = server.local_addr()?;
    tokio::spawn(server.run_until(std::future::pending()));
    Ok(format!("ws://{addr}"))
}

#[tokio::test]
async fn exit_ends_the_session_without_sending_the_command() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let server = Server::new(listener);
    let url = format!("ws://{}", server.local_addr()?);
    let registry = server.registry();
    tokio::spawn(server.run_until(std::future::pending()));

    let (mut observer, _) = connect_async(url.as_str()).await?;

    let mut banner = Vec::new();
    let socket = connect(&url, &mut banner)
        .await?
        .context("client should connect")?;
    let (tx, lines) = mpsc::channel(4);
    let session = tokio::spawn(async move {
        let mut console = Vec::new();
        let end = run_session(socket, lines, &mut console).await;
        (end, console)
    });

    let deadline = tokio::time::Instant::now() + READ_TIMEOUT;
    while registry.len().await < 2 {
        assert!(tokio::time::Instant::now() < deadline, "client never registered");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tx.send("hello".to_string()).await?;
    let relay = timeout(READ_TIMEOUT, observer.next())
        .await?
        .context("observer connection ended")??;
    assert_eq!(relay, Message::Text("Someone says: hello".into()));

    tx.send("Exit".to_string()).await?;
    let (end, console) = timeout(READ_TIMEOUT, session).await??;
    assert!(matches!(end?, SessionEnd::ExitRequested));

    let printed = String::from_utf8(console)?;
    assert!(printed.ends_with("Exiting chat...\n"), "unexpected output: {printed}");

    let banner = String::from_utf8(banner)?;
    assert!(banner.contains("✅ Connected to server!"));

    // The client closed gracefully, so the server drops it; the observer never
    // hears about the exit command.
    let deadline = tokio::time::Instant::now() + READ_TIMEOUT;
    while registry.len().await > 1 {
        assert!(tokio::time::Instant::now() < deadline, "client never unregistered");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    observer.send(Message::text("ping")).await?;
    let next = timeout(READ_TIMEOUT, observer.next())
        .await?
        .context("observer connection ended")??;
    assert_eq!(next, Message::Text("You said: ping".into()));

    Ok(())
}

#[tokio::test]
async fn end_of_input_ends_the_session() -> Result<()> {
    let url = start_server().await?;
    let mut console = Vec::new();
    let (tx, lines) = mpsc::channel::<String>(1);
    drop(tx);

    let end = timeout(READ_TIMEOUT, chat(&url, lines, &mut console)).await??;

    assert!(matches!(end, SessionEnd::InputClosed));
    assert!(String::from_utf8(console)?.ends_with("Exiting chat...\n"));
    Ok(())
}

#[tokio::test]
async fn server_close_is_reported_and_ends_the_session() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut socket = accept_async(stream).await?;
        socket.send(Message::text("welcome")).await?;
        SinkExt::close(&mut socket).await?;
        // Read until the client answers the close handshake.
        while let Some(Ok(_)) = socket.next().await {}
        anyhow::Ok(())
    });

    let (socket, _) = connect_async(format!("ws://{addr}")).await?;
    let (_tx, lines) = mpsc::channel::<String>(1);
    let mut console = Vec::new();

    let end = timeout(READ_TIMEOUT, run_session(socket, lines, &mut console)).await??;

    assert!(matches!(end, SessionEnd::ConnectionLost));
    assert_eq!(
        String::from_utf8(console)?,
        "📩 welcome\n\n❌ Connection to server closed\n"
    );
    let _ = server.await;
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_reported_once() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let (_tx, lines) = mpsc::channel::<String>(1);
    let mut console = Vec::new();
    let url = format!("ws://{addr}");

    let end = chat(&url, lines, &mut console).await?;

    assert!(matches!(end, SessionEnd::ConnectFailed));
    assert_eq!(
        String::from_utf8(console)?,
        format!(
            "Connecting to server at {url}...\n❌ Could not connect to server. Is the server running?\n"
        )
    );
    Ok(())
}
