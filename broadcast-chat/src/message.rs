use std::fmt;

use tokio_tungstenite::tungstenite::Message;

/// Text the server pushes to clients. The wire format is the rendered string
/// with no envelope around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Reply to the connection that sent `text`.
    Echo { text: String },
    /// Copy of another client's `text`.
    Relay { text: String },
    /// Line typed by the server operator.
    Operator { text: String },
}

impl ServerMessage {
    pub fn echo(text: impl Into<String>) -> Self {
        Self::Echo { text: text.into() }
    }

    pub fn relay(text: impl Into<String>) -> Self {
        Self::Relay { text: text.into() }
    }

    pub fn operator(text: impl Into<String>) -> Self {
        Self::Operator { text: text.into() }
    }

    pub fn to_frame(&self) -> Message {
        Message::text(self.to_string())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Echo { text } => write!(f, "You said: {text}"),
            ServerMessage::Relay { text } => write!(f, "Someone says: {text}"),
            ServerMessage::Operator { text } => write!(f, "🟢 Server: {text}"),
        }
    }
}

/// Strips the line terminator left behind by line-oriented readers, keeping
/// every other character the user typed.
pub fn trim_line_ending(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => line,
    }
}
