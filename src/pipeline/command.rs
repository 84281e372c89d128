//! # Command Channel
//!
//! Fire-and-forget outbound path from the control surface to the board.

use tracing::{info, warn};

use crate::protocol::encoder::{encode_command, Command};
use crate::serial::port_trait::LineSink;

/// Writes command tokens to the link, one per line
///
/// Nothing is acknowledged by the board; a failed write is logged and dropped.
pub struct CommandChannel {
    sink: Box<dyn LineSink>,
}

impl std::fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel").finish_non_exhaustive()
    }
}

impl CommandChannel {
    /// Wrap the write half of the link
    pub fn new<K>(sink: K) -> Self
    where
        K: LineSink + 'static,
    {
        Self { sink: Box::new(sink) }
    }

    /// Send one command from the fixed vocabulary
    pub async fn send(&mut self, command: Command) {
        self.send_token(command.token()).await;
    }

    /// Send a token as `token\n`; no validation is performed
    pub async fn send_token(&mut self, token: &str) {
        let frame = encode_command(token);

        let result = match self.sink.write_all(&frame).await {
            Ok(()) => self.sink.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => info!("TX: {}", token),
            Err(e) => warn!("TX failed for {}: {}", token, e),
        }
    }
}
