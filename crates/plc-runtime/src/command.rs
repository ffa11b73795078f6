//! Command subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::Engine;
use crate::messages::{Command, ParameterCommand};
use crate::runner::lock_engine;

/// How long the command thread waits for a message before re-checking the
/// running flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of waiting for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Message(String),
    /// Nothing arrived within the timeout.
    Idle,
    /// The source is exhausted; the command thread exits.
    Closed,
}

/// A subscription delivering raw JSON messages.
pub trait CommandSource: Send {
    fn recv_timeout(&mut self, timeout: Duration) -> Incoming;
}

/// [`CommandSource`] backed by an in-process channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<String>,
}

impl ChannelSource {
    /// A source and the sender feeding it.
    pub fn channel() -> (Sender<String>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl CommandSource for ChannelSource {
    fn recv_timeout(&mut self, timeout: Duration) -> Incoming {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Incoming::Message(message),
            Err(RecvTimeoutError::Timeout) => Incoming::Idle,
            Err(RecvTimeoutError::Disconnected) => Incoming::Closed,
        }
    }
}

/// Parse and dispatch one message.
///
/// Parameter writes are applied immediately under the engine lock;
/// reconfigurations are only staged. Malformed messages are logged and
/// dropped, leaving the running configuration untouched.
pub fn handle_message(engine: &Mutex<Engine>, text: &str) {
    let command = match Command::parse(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed command message");
            return;
        }
    };
    match command {
        Command::Parameter(ParameterCommand::Write { param_name, value }) => {
            // Errors are logged by the engine.
            let _ = lock_engine(engine).set_parameter(&param_name, &value);
        }
        Command::Reconfigure(update) => {
            tracing::info!(kind = update.kind(), "reconfiguration received");
            lock_engine(engine).stage_update(update);
        }
    }
}

/// Command thread body: dispatch messages until the source closes or
/// `running` is cleared.
pub fn command_loop(
    mut source: Box<dyn CommandSource>,
    engine: Arc<Mutex<Engine>>,
    running: Arc<AtomicBool>,
) {
    tracing::info!("command subscriber started");
    while running.load(Ordering::SeqCst) {
        match source.recv_timeout(POLL_INTERVAL) {
            Incoming::Message(text) => handle_message(&engine, &text),
            Incoming::Idle => {}
            Incoming::Closed => {
                tracing::info!("command source closed");
                break;
            }
        }
    }
    tracing::info!("command subscriber stopped");
}
