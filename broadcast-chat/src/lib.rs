//! Broadcast chat over WebSockets.
//!
//! One server echoes every message back to its sender, relays it to every
//! other connected client, and lets the operator broadcast lines typed on its
//! own stdin. Frames are plain UTF-8 text with a human-readable prefix:
//! `You said: …`, `Someone says: …` and `🟢 Server: …`.
//!
//! - [`registry`] tracks live connections and their outbound queues.
//! - [`fanout`] delivers one message to every registered connection but one.
//! - [`session`] serves a single client from handshake to disconnect.
//! - [`operator`] turns operator lines into server-wide broadcasts.
//! - [`server`] accepts TCP connections and spawns sessions.
//! - [`client`] is the terminal client: a receive activity and a send
//!   activity sharing one connection.
//! - [`console`] reads terminal lines on a dedicated thread.
//! - [`message`] renders the tagged outbound text.
//! - [`cli`] and [`telemetry`] hold argument parsing and tracing setup for the
//!   `chat-server` and `chat-client` binaries.

pub mod cli;
pub mod client;
pub mod console;
pub mod fanout;
pub mod message;
pub mod operator;
pub mod registry;
pub mod server;
pub mod session;
pub mod telemetry;
