//! Session controller: drives the dispatcher over a command set, either
//! streaming every command in order or letting an operator pick them.

use crate::command::{CommandDescriptor, CommandSet};
use crate::dispatcher::{CommandTransport, DispatchOutcome, Dispatcher, OutcomeStatus};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt;
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc;

/// Keyword that ends an interactive session.
pub const END_KEYWORD: &str = "end";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Stream,
    Interactive,
}

/// What separates consecutive commands in streaming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Delay(Duration),
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: SessionMode,
    pub pacing: Pacing,
}

impl SessionConfig {
    pub fn stream(wait: Duration) -> Self {
        Self {
            mode: SessionMode::Stream,
            pacing: Pacing::Delay(wait),
        }
    }

    pub fn interactive() -> Self {
        Self {
            mode: SessionMode::Interactive,
            pacing: Pacing::Confirm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Sending,
    WaitingPause,
    AwaitSelection,
    Done,
}

/// Source of operator decisions.
#[async_trait]
pub trait Prompt: Send {
    /// Next line typed by the operator. `None` on end of input.
    async fn select(&mut self, available: &[&str]) -> Option<String>;

    /// Whether to go ahead with `next`. `false` ends the session.
    async fn confirm(&mut self, next: &str) -> bool;
}

/// Prompt reading operator input from stdin.
///
/// Lines are read on a dedicated thread and handed over through a channel,
/// so an abandoned prompt never holds the runtime open at shutdown.
pub struct StdinPrompt {
    lines: mpsc::Receiver<String>,
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Prompt fed from any line source; end of the source ends input.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let spawned = std::thread::Builder::new()
            .name("operator-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if tx.blocking_send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Failed to read operator input: {e}");
                            break;
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("Failed to start operator input reader: {e}");
        }
        Self { lines: rx }
    }

    async fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        if let Err(e) = std::io::stdout().flush() {
            debug!("Failed to flush prompt: {e}");
        }
        self.lines.recv().await
    }
}

#[async_trait]
impl Prompt for StdinPrompt {
    async fn select(&mut self, available: &[&str]) -> Option<String> {
        println!("\nAvailable commands: {}", available.join(", "));
        self.read_line("command >> ").await
    }

    async fn confirm(&mut self, next: &str) -> bool {
        let prompt = format!("\nPress enter to send '{next}' (or type '{END_KEYWORD}' to finish): ");
        match self.read_line(&prompt).await {
            Some(line) => line.trim() != END_KEYWORD,
            None => false,
        }
    }
}

pub struct SessionController<T> {
    commands: CommandSet,
    dispatcher: Dispatcher<T>,
    config: SessionConfig,
    state: SessionState,
    in_flight: Option<String>,
    outcomes: Vec<DispatchOutcome>,
    /// Streaming position: commands before it have been taken up.
    cursor: usize,
}

impl<T: CommandTransport> SessionController<T> {
    pub fn new(commands: CommandSet, dispatcher: Dispatcher<T>, config: SessionConfig) -> Self {
        Self {
            commands,
            dispatcher,
            config,
            state: SessionState::Pending,
            in_flight: None,
            outcomes: Vec::new(),
            cursor: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn outcomes(&self) -> &[DispatchOutcome] {
        &self.outcomes
    }

    /// Run the session to completion in the configured mode.
    ///
    /// Dropping the returned future (for example on an operator interrupt)
    /// leaves every completed outcome in place; [`SessionController::finish`]
    /// still produces the summary.
    pub async fn run<P: Prompt + ?Sized>(&mut self, prompt: &mut P) {
        match self.config.mode {
            SessionMode::Stream => self.run_stream(prompt).await,
            SessionMode::Interactive => self.run_interactive(prompt).await,
        }
        self.transition(SessionState::Done);
    }

    async fn run_stream<P: Prompt + ?Sized>(&mut self, prompt: &mut P) {
        info!("Streaming {} command(s)", self.commands.len());
        let total = self.commands.len();
        for index in 0..total {
            let command = self.commands.all()[index].clone();
            if index > 0 && self.config.pacing == Pacing::Confirm && !prompt.confirm(command.id()).await
            {
                info!("Operator ended the session before '{}'", command.id());
                return;
            }

            self.cursor = index + 1;
            let sent = self.send(&command).await;

            if let Pacing::Delay(wait) = self.config.pacing {
                if sent && index + 1 < total && !wait.is_zero() {
                    self.transition(SessionState::WaitingPause);
                    tokio::time::sleep(wait).await;
                }
            }
            self.transition(SessionState::Pending);
        }
    }

    async fn run_interactive<P: Prompt + ?Sized>(&mut self, prompt: &mut P) {
        println!(
            "\nInteractive mode. Type the ID of the next command to send, or type '{END_KEYWORD}' to finish."
        );
        loop {
            self.transition(SessionState::AwaitSelection);
            let ids = self.commands.ids();
            let Some(line) = prompt.select(&ids).await else {
                info!("End of operator input");
                return;
            };

            let selection = line.trim();
            if selection == END_KEYWORD {
                return;
            }

            let command = match self.commands.find_by_id(selection) {
                Ok(command) => command.clone(),
                Err(e) => {
                    debug!("{e}");
                    println!("Unrecognized command {selection}. (Not present in the command list?)");
                    continue;
                }
            };

            self.send(&command).await;
            self.transition(SessionState::Pending);
        }
    }

    /// Dispatch one command and render the outcome. Returns whether the send succeeded.
    async fn send(&mut self, command: &CommandDescriptor) -> bool {
        self.transition(SessionState::Sending);
        println!("\nSending {} command.", command.id());

        self.in_flight = Some(command.id().to_string());
        let outcome = self.dispatcher.dispatch(command).await;
        self.in_flight = None;

        println!("{outcome}");
        let sent = outcome.is_sent();
        self.outcomes.push(outcome);
        sent
    }

    /// Mark the session done and summarize what was dispatched. In streaming
    /// mode, commands never reached are listed as not sent.
    pub fn finish(&mut self) -> SessionSummary {
        self.transition(SessionState::Done);
        let not_sent = match self.config.mode {
            SessionMode::Stream => self.commands.all()[self.cursor.min(self.commands.len())..]
                .iter()
                .map(|command| command.id().to_string())
                .collect(),
            SessionMode::Interactive => Vec::new(),
        };
        SessionSummary {
            entries: self
                .outcomes
                .iter()
                .map(|outcome| (outcome.command_id().to_string(), outcome.status()))
                .collect(),
            interrupted: self.in_flight.take(),
            not_sent,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Per-command outcome list printed at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub entries: Vec<(String, OutcomeStatus)>,
    /// Command whose reply was still awaited when the session stopped.
    pub interrupted: Option<String>,
    /// Streamed commands the session ended before reaching.
    pub not_sent: Vec<String>,
}

impl SessionSummary {
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.entries.iter().filter(|(_, s)| *s == status).count()
    }

    pub fn dispatched(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        let width = self
            .entries
            .iter()
            .map(|(id, _)| id)
            .chain(&self.interrupted)
            .chain(&self.not_sent)
            .map(String::len)
            .max()
            .unwrap_or(0);
        for (id, status) in &self.entries {
            writeln!(f, "  {id:<width$}  {}", status.label())?;
        }
        if let Some(id) = &self.interrupted {
            writeln!(f, "  {id:<width$}  interrupted")?;
        }
        for id in &self.not_sent {
            writeln!(f, "  {id:<width$}  not-sent")?;
        }
        write!(
            f,
            "{} dispatched, {} answered, {} answered with failure, {} mismatched, {} timed out, {} sent without reply, {} failed to send, {} not sent",
            self.dispatched(),
            self.count(OutcomeStatus::Answered),
            self.count(OutcomeStatus::AnsweredFailure),
            self.count(OutcomeStatus::Mismatched),
            self.count(OutcomeStatus::TimedOut),
            self.count(OutcomeStatus::Sent),
            self.count(OutcomeStatus::TransportFailed),
            self.not_sent.len(),
        )
    }
}
