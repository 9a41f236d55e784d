//! Interactive guarded shell
//!
//! Simulates the dashboard: the operator navigates between sections and
//! the guard decides whether each section's content is shown.

use anyhow::Result;
use tillguard_core::auth::format_countdown;
use tillguard_core::{
    validate_pin_input, GuardConfig, GuardHandle, GuardState, PinFormatError, RouteProvider,
    SharedRoute, SubmitOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use zeroize::Zeroizing;

const HELP: &str = "\
Commands:
  goto <path>   navigate to a dashboard section (e.g. /accounts)
  pin <digits>  submit the manager PIN
  temporal      unlock every section for one hour with the next PIN
  logout        end the current session or temporary unlock
  view          show the current section
  status        show guard state
  help          show this help
  quit          leave the shell";

/// Parsed shell input
#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Goto(String),
    Pin(Zeroizing<String>),
    Temporal,
    Logout,
    View,
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShellError {
    #[error("Unknown command: {0} (type 'help')")]
    UnknownCommand(String),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("Routes start with '/'")]
    InvalidRoute,

    #[error(transparent)]
    InvalidPin(#[from] PinFormatError),
}

/// Parse one input line; blank lines yield None
pub fn parse_line(line: &str, pin_length: usize) -> Result<Option<ShellCommand>, ShellError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let command = match verb {
        "goto" | "cd" => {
            let path = arg.ok_or(ShellError::MissingArgument("goto"))?;
            if !path.starts_with('/') {
                return Err(ShellError::InvalidRoute);
            }
            ShellCommand::Goto(path.to_string())
        }
        "pin" => {
            let pin = Zeroizing::new(arg.ok_or(ShellError::MissingArgument("pin"))?.to_string());
            validate_pin_input(&pin, pin_length)?;
            ShellCommand::Pin(pin)
        }
        "temporal" => ShellCommand::Temporal,
        "logout" => ShellCommand::Logout,
        "view" => ShellCommand::View,
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(ShellError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

/// Describe guard state in one line
pub fn describe_state(state: &GuardState) -> String {
    if state.is_locked {
        format!(
            "locked ({} remaining)",
            format_countdown(state.lockout_remaining_seconds)
        )
    } else if state.temporary_unlock_active {
        format!(
            "temporarily unlocked ({} remaining)",
            format_countdown(state.temporary_unlock_remaining_seconds)
        )
    } else if let Some(route) = &state.session_route {
        format!("authorized for {}", route)
    } else if state.pending_temporal_request {
        format!(
            "awaiting PIN for temporary unlock ({} failed attempts)",
            state.failed_attempts
        )
    } else {
        format!("awaiting PIN ({} failed attempts)", state.failed_attempts)
    }
}

/// Run the shell until `quit` or end of input
pub async fn run(handle: GuardHandle, route: SharedRoute, config: &GuardConfig) -> Result<()> {
    let mut notifications = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => println!(">> {}", notification),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} notifications", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}\n{}\n", config.title, config.description);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line, config.pin_length) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            ShellCommand::Goto(path) => {
                route.set(path);
                handle.route_changed().await?;
            }
            ShellCommand::Pin(pin) => {
                if handle.submit_pin(pin.as_str()).await? == SubmitOutcome::Ignored {
                    println!("PIN entry is not available right now");
                }
            }
            ShellCommand::Temporal => {
                if !handle.request_temporary_unlock().await? {
                    println!("Temporary unlock can only be requested from the PIN form");
                }
            }
            ShellCommand::Logout => {
                if !handle.logout().await? {
                    println!("Nothing to log out of");
                }
            }
            ShellCommand::View => {
                let path = route.current_path();
                if handle.is_content_visible().await? {
                    println!("[{} content]", path);
                } else {
                    let state = handle.state().await?;
                    println!("{} - {}: {}", path, config.title, describe_state(&state));
                }
            }
            ShellCommand::Status => {
                let state = handle.state().await?;
                println!("{}", describe_state(&state));
            }
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => break,
        }
    }

    handle.shutdown().await?;
    printer.abort();
    Ok(())
}
