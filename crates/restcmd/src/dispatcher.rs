//! Sends one command at a time and pairs it with the reply that answers it.

use crate::command::CommandDescriptor;
use crate::correlator::Correlator;
use crate::error::{CorrelationMismatch, TransportError};
use crate::reply::ReplyMessage;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;

/// Where the commanded application should send its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAddress {
    pub port: u16,
    pub host: Option<String>,
}

impl ReplyAddress {
    pub fn new(port: u16, host: Option<String>) -> Self {
        Self { port, host }
    }
}

/// Immediate acknowledgment returned by the target for a sent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportAck {
    pub status: u16,
    pub body: String,
}

impl fmt::Display for TransportAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response code: {} with content: {}", self.status, self.body.trim())
    }
}

/// Outbound send path to the commanded application.
///
/// Implementations return `Err` for anything other than a successful
/// acknowledgment, including non-2xx statuses.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send(
        &self,
        command: &CommandDescriptor,
        reply_to: &ReplyAddress,
    ) -> Result<TransportAck, TransportError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    /// The send failed, so no reply was awaited.
    NotAttempted,
    /// Sent in send-only mode; replies are not collected.
    NotAwaited,
    Matched(ReplyMessage),
    Mismatched {
        mismatch: CorrelationMismatch,
        reply: ReplyMessage,
    },
    TimedOut {
        after: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Answered,
    AnsweredFailure,
    Mismatched,
    TimedOut,
    Sent,
    TransportFailed,
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Answered => "answered",
            OutcomeStatus::AnsweredFailure => "answered-failure",
            OutcomeStatus::Mismatched => "mismatch",
            OutcomeStatus::TimedOut => "timed-out",
            OutcomeStatus::Sent => "sent",
            OutcomeStatus::TransportFailed => "transport-failed",
        }
    }
}

/// Result of dispatching a single command.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub command: CommandDescriptor,
    pub ack: Result<TransportAck, TransportError>,
    pub correlation: Correlation,
}

impl DispatchOutcome {
    pub fn command_id(&self) -> &str {
        self.command.id()
    }

    pub fn is_sent(&self) -> bool {
        self.ack.is_ok()
    }

    pub fn reply(&self) -> Option<&ReplyMessage> {
        match &self.correlation {
            Correlation::Matched(reply) | Correlation::Mismatched { reply, .. } => Some(reply),
            Correlation::NotAttempted
            | Correlation::NotAwaited
            | Correlation::TimedOut { .. } => None,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match &self.correlation {
            Correlation::NotAttempted => OutcomeStatus::TransportFailed,
            Correlation::NotAwaited => OutcomeStatus::Sent,
            Correlation::Matched(reply) if reply.success => OutcomeStatus::Answered,
            Correlation::Matched(_) => OutcomeStatus::AnsweredFailure,
            Correlation::Mismatched { .. } => OutcomeStatus::Mismatched,
            Correlation::TimedOut { .. } => OutcomeStatus::TimedOut,
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ack {
            Ok(ack) => writeln!(f, "{ack}")?,
            Err(err) => return write!(f, "Failed to send '{}': {err}", self.command_id()),
        }
        match &self.correlation {
            Correlation::NotAttempted | Correlation::NotAwaited => write!(f, "No reply awaited"),
            Correlation::Matched(reply) => write!(f, "{reply}"),
            Correlation::Mismatched { mismatch, reply } => {
                writeln!(f, "WARNING: {mismatch}")?;
                write!(f, "{reply}")
            }
            Correlation::TimedOut { after } => {
                write!(f, "No reply within {}s", after.as_secs_f64())
            }
        }
    }
}

/// Single-command-in-flight dispatcher.
pub struct Dispatcher<T> {
    transport: T,
    correlator: Correlator,
    reply_to: ReplyAddress,
    reply_timeout: Option<Duration>,
    await_replies: bool,
}

impl<T: CommandTransport> Dispatcher<T> {
    pub fn new(transport: T, correlator: Correlator, reply_to: ReplyAddress) -> Self {
        Self {
            transport,
            correlator,
            reply_to,
            reply_timeout: None,
            await_replies: true,
        }
    }

    /// Bound the wait for each reply. `None` waits until a reply arrives.
    pub fn with_reply_timeout(mut self, reply_timeout: Option<Duration>) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    /// Send-only mode: acknowledged commands are recorded as sent and the
    /// correlator is never consulted.
    pub fn without_replies(mut self) -> Self {
        self.await_replies = false;
        self
    }

    #[tracing::instrument(level = "debug", skip(self, command), fields(command_id = %command.id()))]
    pub async fn dispatch(&self, command: &CommandDescriptor) -> DispatchOutcome {
        // Nothing queued now can answer a command that has not been sent yet.
        if self.await_replies {
            for stale in self.correlator.drain() {
                warn!(
                    "Discarding stale reply for command '{}' before sending '{}'",
                    stale.cmdid,
                    command.id()
                );
            }
        }

        let ack = self.transport.send(command, &self.reply_to).await;
        let correlation = match &ack {
            Ok(ack) => {
                debug!("Command '{}' acknowledged with status {}", command.id(), ack.status);
                if self.await_replies {
                    self.await_reply(command).await
                } else {
                    Correlation::NotAwaited
                }
            }
            Err(err) => {
                warn!("Failed to send command '{}': {err}", command.id());
                Correlation::NotAttempted
            }
        };

        DispatchOutcome {
            command: command.clone(),
            ack,
            correlation,
        }
    }

    async fn await_reply(&self, command: &CommandDescriptor) -> Correlation {
        let reply = match self.reply_timeout {
            Some(timeout) => match self.correlator.take_timeout(timeout).await {
                Some(reply) => reply,
                None => {
                    warn!(
                        "No reply for command '{}' within {}s",
                        command.id(),
                        timeout.as_secs_f64()
                    );
                    return Correlation::TimedOut { after: timeout };
                }
            },
            None => self.correlator.take().await,
        };

        if reply.cmdid == command.id() {
            info!("Reply for command '{}' (success: {})", reply.cmdid, reply.success);
            Correlation::Matched(reply)
        } else {
            let mismatch = CorrelationMismatch {
                expected: command.id().to_string(),
                received: reply.cmdid.clone(),
            };
            warn!("{mismatch}");
            Correlation::Mismatched { mismatch, reply }
        }
    }
}
