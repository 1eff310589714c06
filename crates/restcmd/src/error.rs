use std::fmt;

/// Top-level error for failures that end a run before or outside of dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum RestCmdError {
    Load(LoadError),
    Config(ConfigError),
    Listener(ListenerError),
    Transport(TransportError),
}

/// The command source could not be read or does not describe commands.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    SourceUnreadable { path: String, reason: String },
    Malformed { context: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    CommandNotFound { command_id: String },
    InvalidOption { option: String, reason: String },
}

/// Failure on the outbound send path. Recovered per command.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    Connection { url: String, reason: String },
    Rejected { status: u16, body: String },
    Setup { reason: String },
}

/// A reply arrived for a different command than the one in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMismatch {
    pub expected: String,
    pub received: String,
}

/// Inbound reply body rejected at the reply listener boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedReply {
    InvalidJson { reason: String },
    MissingField { field: String },
    InvalidField { field: String, expected: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerError {
    Bind { address: String, reason: String },
    Serve { reason: String },
}

impl fmt::Display for RestCmdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestCmdError::Load(err) => write!(f, "{err}"),
            RestCmdError::Config(err) => write!(f, "{err}"),
            RestCmdError::Listener(err) => write!(f, "{err}"),
            RestCmdError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::SourceUnreadable { path, reason } => {
                write!(f, "Failed to open command file '{path}': {reason}")
            }
            LoadError::Malformed { context, reason } => {
                write!(f, "Malformed command source in {context}: {reason}")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::CommandNotFound { command_id } => {
                write!(f, "No command '{command_id}' found in command set")
            }
            ConfigError::InvalidOption { option, reason } => {
                write!(f, "Invalid option '{option}': {reason}")
            }
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connection { url, reason } => {
                write!(f, "Failed to send to {url}: {reason}")
            }
            TransportError::Rejected { status, body } => {
                if body.is_empty() {
                    write!(f, "Target rejected command with status {status}")
                } else {
                    write!(f, "Target rejected command with status {status}: {body}")
                }
            }
            TransportError::Setup { reason } => write!(f, "Transport setup failed: {reason}"),
        }
    }
}

impl fmt::Display for CorrelationMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reply for command '{}' received while waiting for '{}'",
            self.received, self.expected
        )
    }
}

impl fmt::Display for MalformedReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReply::InvalidJson { reason } => write!(f, "Reply is not valid JSON: {reason}"),
            MalformedReply::MissingField { field } => {
                write!(f, "Reply is missing required field '{field}'")
            }
            MalformedReply::InvalidField { field, expected } => {
                write!(f, "Reply field '{field}' must be {expected}")
            }
        }
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Bind { address, reason } => {
                write!(f, "Failed to bind reply listener to {address}: {reason}")
            }
            ListenerError::Serve { reason } => write!(f, "Reply listener failed: {reason}"),
        }
    }
}

impl std::error::Error for RestCmdError {}
impl std::error::Error for LoadError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for TransportError {}
impl std::error::Error for CorrelationMismatch {}
impl std::error::Error for MalformedReply {}
impl std::error::Error for ListenerError {}

impl From<LoadError> for RestCmdError {
    fn from(err: LoadError) -> Self {
        RestCmdError::Load(err)
    }
}

impl From<ConfigError> for RestCmdError {
    fn from(err: ConfigError) -> Self {
        RestCmdError::Config(err)
    }
}

impl From<ListenerError> for RestCmdError {
    fn from(err: ListenerError) -> Self {
        RestCmdError::Listener(err)
    }
}

impl From<TransportError> for RestCmdError {
    fn from(err: TransportError) -> Self {
        RestCmdError::Transport(err)
    }
}

impl RestCmdError {
    /// Whether the run was refused before any command could be dispatched:
    /// the command source, the configuration or the reply listener.
    pub fn is_fatal(&self) -> bool {
        match self {
            RestCmdError::Load(_) | RestCmdError::Config(_) | RestCmdError::Listener(_) => true,
            RestCmdError::Transport(_) => false,
        }
    }
}

impl LoadError {
    pub fn from_io_error(e: std::io::Error, path: &str) -> Self {
        LoadError::SourceUnreadable {
            path: path.to_string(),
            reason: e.to_string(),
        }
    }

    pub fn from_parse_error(e: impl fmt::Display, context: &str) -> Self {
        LoadError::Malformed {
            context: context.to_string(),
            reason: e.to_string(),
        }
    }
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::CommandNotFound { .. })
    }
}

impl TransportError {
    /// Status code reported by the target, if the request reached it.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl MalformedReply {
    pub fn missing(field: &str) -> Self {
        MalformedReply::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, expected: &str) -> Self {
        MalformedReply::InvalidField {
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl ListenerError {
    pub fn from_io_error(e: std::io::Error, address: &str) -> Self {
        ListenerError::Bind {
            address: address.to_string(),
            reason: e.to_string(),
        }
    }
}
