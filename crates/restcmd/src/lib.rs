//! Command dispatch with asynchronous reply correlation.
//!
//! Commands loaded from a file are posted one at a time to a commanded
//! application, which answers out of band on a separate reply listener.
//! The [`Correlator`] hands those replies to the [`Dispatcher`] in arrival
//! order, and the [`SessionController`] drives dispatch either as an
//! unattended stream or interactively.

pub mod command;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod reply;
pub mod session;
pub mod telemetry;

pub use command::{CommandDescriptor, CommandLayout, CommandSet, CommandSetLoader};
pub use correlator::Correlator;
pub use dispatcher::{
    CommandTransport, Correlation, DispatchOutcome, Dispatcher, OutcomeStatus, ReplyAddress,
    TransportAck,
};
pub use error::{
    ConfigError, CorrelationMismatch, ListenerError, LoadError, MalformedReply, RestCmdError,
    TransportError,
};
pub use reply::ReplyMessage;
pub use session::{
    Pacing, Prompt, SessionConfig, SessionController, SessionMode, SessionState, SessionSummary,
    StdinPrompt,
};

// Re-export logging macros for consistent usage across the crate
pub use log::{debug, error, info, trace, warn};
