use anyhow::Result;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    io::{self, AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    select,
    sync::mpsc,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, error::ProtocolError},
};
use tracing::{debug, info, warn};

use crate::{cli::ClientArgs, console};

pub const EXIT_COMMAND: &str = "exit";

pub type ServerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a client session stopped.
#[derive(Debug)]
pub enum SessionEnd {
    /// The user typed the exit command.
    ExitRequested,
    /// Local input reached end of file.
    InputClosed,
    /// The server closed the connection or reading from it failed.
    ConnectionLost,
    /// Writing a line to the server failed.
    SendFailed(tungstenite::Error),
    /// The initial connection could not be established.
    ConnectFailed,
}

pub async fn run(args: ClientArgs) -> Result<()> {
    let lines = console::spawn_stdin_reader();
    let mut stdout = io::stdout();

    select! {
        end = chat(&args.url, lines, &mut stdout) => {
            let end = end?;
            debug!(?end, "chat session finished");
        }
        ctrl_c = tokio::signal::ctrl_c() => {
            handle_ctrl_c(ctrl_c);
            write_line(&mut io::stdout(), "\nExiting chat client...").await?;
        }
    }

    Ok(())
}

/// Connects to `url` and runs a session. Connection failures are reported on
/// `console` rather than returned as errors.
pub async fn chat<W>(url: &str, lines: mpsc::Receiver<String>, console: &mut W) -> io::Result<SessionEnd>
where
    W: AsyncWrite + Unpin,
{
    match connect(url, console).await? {
        Some(socket) => run_session(socket, lines, console).await,
        None => Ok(SessionEnd::ConnectFailed),
    }
}

pub async fn connect<W>(url: &str, console: &mut W) -> io::Result<Option<ServerSocket>>
where
    W: AsyncWrite + Unpin,
{
    write_line(console, &format!("Connecting to server at {url}...")).await?;

    match connect_async(url).await {
        Ok((socket, _response)) => {
            info!(%url, "connected to server");
            write_line(console, "✅ Connected to server!").await?;
            write_line(console, "Start chatting (type messages and press Enter)").await?;
            Ok(Some(socket))
        }
        Err(error) => {
            warn!(%url, ?error, "failed to connect to server");
            write_line(console, &describe_connect_error(&error)).await?;
            Ok(None)
        }
    }
}

/// Runs the receive and send activities over one connection until either
/// finishes.
pub async fn run_session<S, W>(
    socket: WebSocketStream<S>,
    mut lines: mpsc::Receiver<String>,
    console: &mut W,
) -> io::Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut sink, mut inbound) = socket.split();

    let end = select! {
        end = receive_messages(&mut inbound, console) => end?,
        end = send_lines(&mut sink, &mut lines) => end,
    };

    match &end {
        SessionEnd::ExitRequested | SessionEnd::InputClosed => {
            write_line(console, "Exiting chat...").await?;
            close_connection(&mut sink).await;
        }
        SessionEnd::SendFailed(error) if is_connection_closed(error) => {
            write_line(console, "\n❌ Connection to server closed").await?;
        }
        SessionEnd::SendFailed(error) => {
            write_line(console, &format!("\n❌ Error sending message: {error}")).await?;
        }
        SessionEnd::ConnectionLost | SessionEnd::ConnectFailed => {}
    }

    Ok(end)
}

pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_COMMAND)
}

async fn receive_messages<R, W>(inbound: &mut R, console: &mut W) -> io::Result<SessionEnd>
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => write_line(console, &format!("📩 {text}")).await?,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) if is_connection_closed(&error) => break,
            Err(error) => {
                write_line(console, &format!("\n❌ Error receiving message: {error}")).await?;
                return Ok(SessionEnd::ConnectionLost);
            }
        }
    }

    write_line(console, "\n❌ Connection to server closed").await?;
    Ok(SessionEnd::ConnectionLost)
}

async fn send_lines<S>(sink: &mut S, lines: &mut mpsc::Receiver<String>) -> SessionEnd
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(line) = lines.recv().await {
        if is_exit_command(&line) {
            return SessionEnd::ExitRequested;
        }

        if let Err(error) = sink.send(Message::text(line)).await {
            return SessionEnd::SendFailed(error);
        }
    }

    SessionEnd::InputClosed
}

async fn close_connection<S>(sink: &mut S)
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    if let Err(error) = sink.close().await {
        debug!(?error, "failed to close connection cleanly");
    }
}

fn is_connection_closed(error: &tungstenite::Error) -> bool {
    matches!(
        error,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

fn describe_connect_error(error: &tungstenite::Error) -> String {
    match error {
        tungstenite::Error::Io(io_error) if io_error.kind() == io::ErrorKind::ConnectionRefused => {
            "❌ Could not connect to server. Is the server running?".to_string()
        }
        other => format!("❌ Error: {other}"),
    }
}

fn handle_ctrl_c(result: io::Result<()>) {
    if let Err(error) = result {
        warn!(?error, "ctrl-c handler failed");
    }
}

async fn write_line<W>(console: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    console.write_all(line.as_bytes()).await?;
    console.write_all(b"\n").await?;
    console.flush().await
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    #[test]
    fn exit_command_ignores_case_only() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("Exit"));
        assert!(is_exit_command("EXIT"));
        assert!(!is_exit_command(" exit"));
        assert!(!is_exit_command("exit now"));
    }

    #[test]
    fn refused_connections_get_a_friendly_message() {
        let refused = tungstenite::Error::Io(std::io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(
            describe_connect_error(&refused),
            "❌ Could not connect to server. Is the server running?"
        );
        assert!(describe_connect_error(&tungstenite::Error::ConnectionClosed).starts_with("❌ Error: "));
    }

    #[tokio::test]
    async fn receive_renders_text_until_close() {
        let mut inbound = stream::iter(vec![
            Ok(Message::Text("You said: hi".into())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Text("Someone says: yo".into())),
            Ok(Message::Close(None)),
        ]);
        let mut console = Vec::new();

        let end = receive_messages(&mut inbound, &mut console)
            .await
            .expect("console write");

        assert!(matches!(end, SessionEnd::ConnectionLost));
        let printed = String::from_utf8(console).expect("utf8 output");
        assert_eq!(
            printed,
            "📩 You said: hi\n📩 Someone says: yo\n\n❌ Connection to server closed\n"
        );
    }

    #[tokio::test]
    async fn send_stops_at_exit_without_sending_it() {
        let (mut sender, mut sent) = futures::channel::mpsc::unbounded::<Message>();
        let mut sink = (&mut sender).sink_map_err(|_| tungstenite::Error::ConnectionClosed);
        let (tx, mut lines) = mpsc::channel(4);
        tx.send("hello".to_string()).await.expect("queue");
        tx.send("EXIT".to_string()).await.expect("queue");
        tx.send("after".to_string()).await.expect("queue");

        let end = send_lines(&mut sink, &mut lines).await;

        assert!(matches!(end, SessionEnd::ExitRequested));
        drop(sink);
        assert_eq!(sent.try_next().ok().flatten(), Some(Message::Text("hello".into())));
        assert!(sent.try_next().is_err());
    }
}
