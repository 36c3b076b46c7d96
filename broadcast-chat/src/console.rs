//! Line input from the terminal.
//!
//! Reading stdin blocks, so a dedicated OS thread does it and hands each line
//! to the async side over a channel. Awaiting the receiver is then an ordinary
//! suspension point. The thread is detached: it exits when input ends or the
//! receiver is dropped, and process exit does not wait on it.

use std::{
    io::{self, BufRead, BufReader},
    thread,
};

use tokio::sync::mpsc;
use tracing::warn;

use crate::message::trim_line_ending;

const LINE_BUFFER: usize = 16;

/// Spawns the reader thread for the process's stdin.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    spawn_line_reader(BufReader::new(io::stdin()))
}

/// Spawns a thread that forwards each line of `input`, without its line
/// terminator, until end of input.
pub fn spawn_line_reader<R>(mut input: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);

    let spawned = thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let mut line = String::new();
            loop {
                line.clear();
                match input.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(trim_line_ending(&line).to_string()).is_err() {
                            break;
                        }
                    }
                    // The offending line has already been consumed.
                    Err(error) if error.kind() == io::ErrorKind::InvalidData => {
                        warn!(?error, "skipping console line that is not valid UTF-8");
                    }
                    Err(error) => {
                        warn!(?error, "failed to read console input");
                        break;
                    }
                }
            }
        });

    if let Err(error) = spawned {
        // The sender went down with the closure, so callers see input as closed.
        warn!(?error, "failed to spawn console input thread");
    }

    rx
}
