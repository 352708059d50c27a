//! Command intake between transports and the tick.
//!
//! Transports hold a cloneable [`CommandSender`]; the tick owns the single
//! [`CommandReceiver`] and drains it without blocking at the start of each
//! cycle. Datagram commands are fire-and-forget: a full queue drops them.
//! Request/response commands carry a oneshot reply channel that the tick
//! answers after dispatch.

use slider_common::control_unit::command::{Command, CommandOutcome, TransportClass};
use slider_common::control_unit::error::CommandError;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

pub type CommandResult = Result<CommandOutcome, CommandError>;

/// A queued command with its transport class and optional reply path.
#[derive(Debug)]
pub struct CommandEnvelope {
    pub command: Command,
    pub transport: TransportClass,
    pub reply: Option<oneshot::Sender<CommandResult>>,
}

impl CommandEnvelope {
    /// Fire-and-forget envelope.
    pub fn datagram(command: Command) -> Self {
        Self { command, transport: TransportClass::Datagram, reply: None }
    }

    /// Request envelope and the receiver its result arrives on.
    pub fn request(command: Command) -> (Self, oneshot::Receiver<CommandResult>) {
        let (tx, rx) = oneshot::channel();
        let env = Self { command, transport: TransportClass::RequestResponse, reply: Some(tx) };
        (env, rx)
    }

    /// Deliver the result. A caller that went away is ignored.
    pub fn respond(self, result: CommandResult) {
        if let Some(reply) = self.reply {
            let _ = reply.send(result);
        }
    }
}

/// Producer side, one clone per transport.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<CommandEnvelope>,
}

impl CommandSender {
    /// Queue a datagram command without waiting.
    ///
    /// # Errors
    /// `QueueFull` when the tick is behind, `Disconnected` after shutdown.
    pub fn send_datagram(&self, command: Command) -> Result<(), CommandError> {
        self.tx
            .try_send(CommandEnvelope::datagram(command))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(env) => {
                    trace!("queue full, dropping {}", env.command.name());
                    CommandError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => CommandError::Disconnected,
            })
    }

    /// Queue a request and wait for its result.
    pub async fn request(&self, command: Command) -> CommandResult {
        let (env, rx) = CommandEnvelope::request(command);
        self.tx.send(env).await.map_err(|_| CommandError::Disconnected)?;
        rx.await.map_err(|_| CommandError::Disconnected)?
    }

    /// Blocking form of [`request`](Self::request) for non-async callers.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn request_blocking(&self, command: Command) -> CommandResult {
        let (env, rx) = CommandEnvelope::request(command);
        self.tx.blocking_send(env).map_err(|_| CommandError::Disconnected)?;
        rx.blocking_recv().map_err(|_| CommandError::Disconnected)?
    }

    /// Queue a request without waiting for the result.
    ///
    /// # Errors
    /// Same as [`send_datagram`](Self::send_datagram).
    pub fn try_request(&self, command: Command) -> Result<oneshot::Receiver<CommandResult>, CommandError> {
        let (env, rx) = CommandEnvelope::request(command);
        self.tx.try_send(env).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CommandError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CommandError::Disconnected,
        })?;
        Ok(rx)
    }
}

/// Consumer side, owned by the tick.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<CommandEnvelope>,
}

impl CommandReceiver {
    /// Next queued command, if any. Never blocks.
    #[inline]
    pub fn try_next(&mut self) -> Option<CommandEnvelope> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> impl Iterator<Item = CommandEnvelope> + '_ {
        std::iter::from_fn(move || self.try_next())
    }
}

/// Bounded command channel.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx }, CommandReceiver { rx })
}
