//! Shutdown coordination
//!
//! ## Overview
//!
//! The serial port must not be left half-open when the process goes away.
//! Every termination cause the bridge can observe (an OS signal, an explicit
//! exit request, a fatal error) is delivered as a `TerminationEvent` to the
//! `ShutdownCoordinator`, which closes the channel and then ends the process.
//!
//! ## State Machine
//!
//! ```text
//!            first event            close settled / timed out
//! Running ──────────────▶ Closing ────────────────────────────▶ Exited(code)
//! ```
//!
//! - Exit is invoked exactly once, after the close attempt resolves. A close
//!   error or timeout is logged and does not prevent the exit.
//! - An already closed channel is not closed again; exit happens at once.
//! - Events arriving while `Closing` or after `Exited` are logged and
//!   ignored: the first event decides the exit code.
//!
//! ## Exit Codes
//!
//! | Event                 | Exit code |
//! |-----------------------|-----------|
//! | `Signal("SIGTERM")`   | 1         |
//! | `ExitCode(n)`         | n         |
//! | `Error(..)`           | 1         |

use std::fmt;
use std::time::Duration;

use log::{debug, error};
use tokio::sync::mpsc;

use crate::{ConnectorError, SerialChannel};

/// Default bound on how long a close may take before exiting anyway
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Exit code for events without a numeric payload
pub const FALLBACK_EXIT_CODE: i32 = 1;

/// Signal names understood by `TerminationEvent::from_payload`
pub const SIGNAL_NAMES: [&str; 12] = [
    "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGABRT",
    "SIGBUS", "SIGFPE", "SIGUSR1", "SIGSEGV", "SIGUSR2", "SIGTERM",
];

/// Signals the bridge installs handlers for
///
/// SIGILL, SIGFPE and SIGSEGV are raised synchronously by faulting code and
/// cannot be handled from async code, so they are left out.
#[cfg(unix)]
const HANDLED_SIGNALS: [(&str, libc::c_int); 9] = [
    ("SIGHUP", libc::SIGHUP),
    ("SIGINT", libc::SIGINT),
    ("SIGQUIT", libc::SIGQUIT),
    ("SIGTRAP", libc::SIGTRAP),
    ("SIGABRT", libc::SIGABRT),
    ("SIGBUS", libc::SIGBUS),
    ("SIGUSR1", libc::SIGUSR1),
    ("SIGUSR2", libc::SIGUSR2),
    ("SIGTERM", libc::SIGTERM),
];

/// Why the process is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationEvent {
    /// A named OS signal
    Signal(&'static str),
    /// An explicit exit request with a code
    ExitCode(i32),
    /// A fatal error
    Error(String),
}

impl TerminationEvent {
    /// Exit code the process ends with
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExitCode(code) => *code,
            Self::Signal(_) | Self::Error(_) => FALLBACK_EXIT_CODE,
        }
    }

    /// Classify a textual payload
    ///
    /// An integer becomes `ExitCode`, a known signal name becomes `Signal`,
    /// anything else becomes `Error` and so exits with 1. That includes the
    /// empty string and non-integer numbers such as `3.5`; neither is
    /// rounded or defaulted into an exit code.
    pub fn from_payload(payload: &str) -> Self {
        let payload = payload.trim();

        if let Ok(code) = payload.parse::<i32>() {
            return Self::ExitCode(code);
        }

        match SIGNAL_NAMES.iter().find(|name| **name == payload) {
            Some(&name) => Self::Signal(name),
            None => Self::Error(payload.to_owned()),
        }
    }
}

impl fmt::Display for TerminationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "{}", name),
            Self::ExitCode(code) => write!(f, "{}", code),
            Self::Error(message) => write!(f, "{}", message),
        }
    }
}

/// Source of termination events
#[async_trait::async_trait]
pub trait TerminationSource: Send {
    /// Wait for the next event
    ///
    /// `None` means the source has ended and no event will ever arrive.
    /// Must be cancel safe.
    async fn next_event(&mut self) -> Option<TerminationEvent>;
}

/// Termination events from OS signals and in-process requests
#[derive(Debug)]
pub struct TerminationEvents {
    sender: TerminationSender,
    receiver: mpsc::UnboundedReceiver<TerminationEvent>,
}

impl TerminationEvents {
    /// Create a source with no signal handlers installed yet
    pub fn new() -> Self {
        let (tx, receiver) = mpsc::unbounded_channel();
        Self {
            sender: TerminationSender { tx },
            receiver,
        }
    }

    /// Handle for injecting events from elsewhere in the process
    pub fn sender(&self) -> TerminationSender {
        self.sender.clone()
    }

    /// Install handlers for every catchable termination signal
    ///
    /// Must be called from inside a tokio runtime. Each delivered signal
    /// becomes one `TerminationEvent::Signal`.
    #[cfg(unix)]
    pub fn listen_for_signals(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        for (name, number) in HANDLED_SIGNALS {
            let mut stream = signal(SignalKind::from_raw(number))?;
            let sender = self.sender();

            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if !sender.send(TerminationEvent::Signal(name)) {
                        break;
                    }
                }
            });
        }

        debug!("Listening for {} termination signals", HANDLED_SIGNALS.len());
        Ok(())
    }

    /// Install a Ctrl-C handler
    #[cfg(not(unix))]
    pub fn listen_for_signals(&self) -> std::io::Result<()> {
        let sender = self.sender();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !sender.send(TerminationEvent::Signal("SIGINT")) {
                    break;
                }
            }
        });

        debug!("Listening for Ctrl-C");
        Ok(())
    }
}

impl Default for TerminationEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TerminationSource for TerminationEvents {
    async fn next_event(&mut self) -> Option<TerminationEvent> {
        self.receiver.recv().await
    }
}

/// Cloneable handle that injects termination events
#[derive(Debug, Clone)]
pub struct TerminationSender {
    tx: mpsc::UnboundedSender<TerminationEvent>,
}

impl TerminationSender {
    /// Deliver an event; `false` if the source is gone
    pub fn send(&self, event: TerminationEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Ask the bridge to exit with `code`
    pub fn request_exit(&self, code: i32) -> bool {
        self.send(TerminationEvent::ExitCode(code))
    }

    /// Report a fatal error, exiting with code 1
    pub fn report_error(&self, message: impl Into<String>) -> bool {
        self.send(TerminationEvent::Error(message.into()))
    }
}

/// How the process ends
pub trait ProcessExit: Send {
    /// End the process with `code`
    fn exit(&mut self, code: i32);
}

/// Ends the process with `std::process::exit`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdProcessExit;

impl ProcessExit for StdProcessExit {
    fn exit(&mut self, code: i32) {
        log::logger().flush();
        std::process::exit(code);
    }
}

impl<F: FnMut(i32) + Send> ProcessExit for F {
    fn exit(&mut self, code: i32) {
        self(code)
    }
}

/// Shutdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// No termination event seen yet
    Running,
    /// Closing the serial channel
    Closing,
    /// Exit has been invoked with this code
    Exited(i32),
}

/// Closes the serial channel and exits, once
pub struct ShutdownCoordinator<X> {
    state: ShutdownState,
    exit: X,
    close_timeout: Duration,
}

impl<X: ProcessExit> ShutdownCoordinator<X> {
    /// Create a coordinator in the `Running` state
    pub fn new(exit: X) -> Self {
        Self {
            state: ShutdownState::Running,
            exit,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Set how long a close may take before exiting anyway
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Current state
    pub fn state(&self) -> ShutdownState {
        self.state
    }

    /// Run the shutdown sequence for `event`
    ///
    /// Returns the exit code if this call performed the shutdown, or `None`
    /// if a shutdown had already started.
    pub async fn shutdown<C>(&mut self, event: &TerminationEvent, channel: &mut C) -> Option<i32>
    where
        C: SerialChannel + ?Sized,
    {
        if self.state != ShutdownState::Running {
            debug!("Ignoring termination event {}: shutdown already {:?}", event, self.state);
            return None;
        }

        debug!("Received termination event: {}", event);
        self.state = ShutdownState::Closing;
        let code = event.exit_code();

        if channel.is_open() {
            match close_within(channel, self.close_timeout).await {
                Ok(()) => debug!("Closed serial port {}", channel.path()),
                Err(e) => error!("Error closing serial port {}: {}", channel.path(), e),
            }
        }

        self.state = ShutdownState::Exited(code);
        self.exit.exit(code);
        Some(code)
    }
}

/// Close `channel`, giving up after `limit`
async fn close_within<C>(channel: &mut C, limit: Duration) -> Result<(), ConnectorError>
where
    C: SerialChannel + ?Sized,
{
    tokio::time::timeout(limit, channel.close())
        .await
        .unwrap_or(Err(ConnectorError::Timeout(limit)))
}
