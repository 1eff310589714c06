//! Command line interface for the send-and-receive and listen-only tools

use super::listener::ReplyListener;
use super::transport::{HttpTransport, TargetConfig};
use clap::Parser;
use log::{error, info, warn};
use restcmd::{
    CommandLayout, CommandSetLoader, ConfigError, Correlator, Dispatcher, Pacing, Prompt,
    ReplyAddress, RestCmdError, SessionConfig, SessionController, SessionMode, SessionSummary,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "restcmd",
    version,
    about = "POST command objects from a file to a commanded endpoint and collect their replies"
)]
pub struct Cli {
    /// Target host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Target port
    #[arg(short, long, default_value_t = 12345)]
    pub port: u16,

    /// Port the reply listener binds and advertises
    #[arg(short, long, default_value_t = 12333)]
    pub answer_port: u16,

    /// Host advertised for replies
    #[arg(short = 'o', long)]
    pub answer_host: Option<String>,

    /// Local address the reply listener binds
    #[arg(long, default_value = "127.0.0.1")]
    pub listen_addr: String,

    /// Route commands through a SOCKS5 proxy (host:port)
    #[arg(short = 'x', long)]
    pub proxy: Option<String>,

    /// Target route on the endpoint
    #[arg(short, long, default_value = "command")]
    pub route: String,

    /// File containing the command or list of commands
    #[arg(short, long)]
    pub file: PathBuf,

    /// Only send this command, not every command in the file
    #[arg(short, long, conflicts_with = "interactive")]
    pub command: Option<String>,

    /// Seconds to wait between streamed commands
    #[arg(short, long, default_value_t = 2)]
    pub wait: u64,

    /// Pick each command to send by id
    #[arg(short, long, overrides_with = "non_interactive")]
    pub interactive: bool,

    #[arg(long, overrides_with = "interactive")]
    pub non_interactive: bool,

    /// Stream in file order, asking before each next command instead of waiting
    #[arg(long, conflicts_with = "interactive")]
    pub confirm: bool,

    /// Seconds to wait for each reply (waits indefinitely when unset)
    #[arg(long)]
    pub reply_timeout: Option<u64>,

    /// Only send commands and print acknowledgments; no reply listener is started
    #[arg(long, conflicts_with = "reply_timeout")]
    pub no_reply: bool,
}

impl Cli {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy.as_deref().is_some_and(|p| p.contains("://")) {
            return Err(ConfigError::InvalidOption {
                option: "proxy".to_string(),
                reason: "expected host:port without a scheme".to_string(),
            });
        }
        if self.answer_host.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidOption {
                option: "answer-host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.reply_timeout == Some(0) {
            return Err(ConfigError::InvalidOption {
                option: "reply-timeout".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn target_config(&self) -> TargetConfig {
        TargetConfig {
            host: self.host.clone(),
            port: self.port,
            route: self.route.clone(),
            proxy: self.proxy.clone(),
        }
    }

    /// Reply address advertised to the target, using the port actually bound.
    pub fn reply_address(&self, bound_port: u16) -> ReplyAddress {
        ReplyAddress::new(bound_port, self.answer_host.clone())
    }

    pub fn session_config(&self) -> SessionConfig {
        if self.interactive {
            SessionConfig::interactive()
        } else if self.confirm {
            SessionConfig {
                mode: SessionMode::Stream,
                pacing: Pacing::Confirm,
            }
        } else {
            SessionConfig::stream(Duration::from_secs(self.wait))
        }
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout.map(Duration::from_secs)
    }
}

/// Run one session: load, filter, start the reply listener, dispatch, stop.
///
/// Load and configuration errors are returned before any network activity.
/// Completing `interrupt` ends the session early; the listener is stopped
/// and the summary produced either way. With `--no-reply` no listener is
/// started and `--answer-port` is advertised as given.
pub async fn run_session<P, F>(
    cli: &Cli,
    prompt: &mut P,
    interrupt: F,
) -> Result<SessionSummary, RestCmdError>
where
    P: Prompt + ?Sized,
    F: Future<Output = ()>,
{
    cli.validate()?;

    let commands = CommandSetLoader::from_path(&cli.file)?;
    match commands.layout() {
        CommandLayout::Single => info!("Found single command in {}", cli.file.display()),
        CommandLayout::List => info!(
            "Found a list of {} commands in {}",
            commands.len(),
            cli.file.display()
        ),
    }
    let commands = match &cli.command {
        Some(id) => commands.restrict_to(id)?,
        None => commands,
    };

    let transport = HttpTransport::new(&cli.target_config())?;
    info!("Target url: {}", transport.url());

    let correlator = Correlator::new();
    let listener = if cli.no_reply {
        info!("Send-only mode, replies are not collected");
        None
    } else {
        Some(ReplyListener::start(&cli.listen_addr, cli.answer_port, correlator.clone()).await?)
    };
    let answer_port = listener
        .as_ref()
        .map_or(cli.answer_port, ReplyListener::port);

    let mut dispatcher = Dispatcher::new(transport, correlator, cli.reply_address(answer_port))
        .with_reply_timeout(cli.reply_timeout());
    if cli.no_reply {
        dispatcher = dispatcher.without_replies();
    }
    let mut session = SessionController::new(commands, dispatcher, cli.session_config());

    tokio::select! {
        _ = session.run(prompt) => {}
        _ = interrupt => warn!("Interrupted, ending session"),
    }

    let summary = session.finish();
    if let Some(listener) = listener {
        if let Err(e) = listener.stop().await {
            error!("{e}");
        }
    }
    Ok(summary)
}

#[derive(Parser, Debug)]
#[command(
    name = "restcmd-recv",
    version,
    about = "Print command replies sent to the reply listener"
)]
pub struct RecvCli {
    /// Port to listen on for replies
    #[arg(short, long, default_value_t = 12333)]
    pub answer_port: u16,

    /// Local address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub listen_addr: String,
}

/// Print every reply as it arrives until `interrupt` completes.
/// Returns the number of replies printed.
pub async fn run_receiver<F>(cli: &RecvCli, interrupt: F) -> Result<usize, RestCmdError>
where
    F: Future<Output = ()>,
{
    let correlator = Correlator::new();
    let listener = ReplyListener::start(&cli.listen_addr, cli.answer_port, correlator.clone()).await?;

    let mut received = 0;
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            reply = correlator.take() => {
                println!("{reply}");
                received += 1;
            }
            _ = &mut interrupt => break,
        }
    }

    if let Err(e) = listener.stop().await {
        error!("{e}");
    }
    Ok(received)
}
