//! Deadline-bounded execution of vetted bots.
//!
//! Every bot seat runs in its own interpreter process speaking a one-line
//! JSON protocol with an embedded driver script: the parent writes a board
//! request, the driver answers with a move or an error object. The process
//! boundary is what makes the deadlines hard - when a call overruns, the
//! child is killed and abandoned rather than awaited, and no state leaks
//! between seats or matches because nothing outlives the process.
//!
//! No failure mode crosses this module as a panic or error type of its
//! own; everything a bot can do wrong becomes a [`BotFault`].

use crate::BotDescriptor;
use othello_core::{Color, Coord};
use serde::Deserialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

/// Seat harness handed to every spawned interpreter.
static DRIVER: &str = include_str!("driver.py");

/// Everything a bot can do wrong, as seen by the match coordinator.
///
/// All three kinds are fatal to the match for the offending seat; the
/// kind is only surfaced for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotFault {
    /// The process could not be spawned, the bot failed to construct,
    /// or construction blew the initialization deadline.
    #[error("bot failed to initialize: {0}")]
    InitFailed(String),
    /// The move call exceeded its wall-clock deadline; the process has
    /// been killed and abandoned.
    #[error("bot exceeded its {}ms move deadline", .0.as_millis())]
    Timeout(Duration),
    /// The bot raised, returned garbage, or returned an illegal move.
    #[error("bot produced an invalid move: {0}")]
    InvalidMove(String),
}

impl BotFault {
    /// Stable identifier for logs and the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            BotFault::InitFailed(_) => "init_failed",
            BotFault::Timeout(_) => "timeout",
            BotFault::InvalidMove(_) => "invalid_move",
        }
    }
}

/// One line of driver output.
#[derive(Debug, Deserialize)]
struct DriverReply {
    row: Option<i64>,
    col: Option<i64>,
    error: Option<String>,
}

/// Validates a driver reply against the caller's legal-move set.
fn parse_reply(line: &str, legal: &[Coord]) -> Result<Coord, BotFault> {
    let reply: DriverReply = serde_json::from_str(line)
        .map_err(|_| BotFault::InvalidMove(format!("unparseable reply: {}", line.trim())))?;

    if let Some(error) = reply.error {
        return Err(BotFault::InvalidMove(error));
    }

    let (Some(row), Some(col)) = (reply.row, reply.col) else {
        return Err(BotFault::InvalidMove(format!(
            "reply is not a coordinate pair: {}",
            line.trim()
        )));
    };

    let coord = match (u8::try_from(row), u8::try_from(col)) {
        (Ok(row), Ok(col)) => Coord::new(row, col),
        _ => {
            return Err(BotFault::InvalidMove(format!(
                "coordinates ({}, {}) are off the board",
                row, col
            )))
        }
    };

    if !legal.contains(&coord) {
        return Err(BotFault::InvalidMove(format!(
            "move {} is not legal in this position",
            coord
        )));
    }
    Ok(coord)
}

/// A live bot seat: one interpreter process bound to one match seat.
pub struct BotProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    name: String,
}

impl std::fmt::Debug for BotProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotProcess")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BotProcess {
    /// Spawns and initializes a bot seat.
    ///
    /// The interpreter is started with the embedded driver, which loads
    /// the vetted source, constructs the player with
    /// `(my_color, opp_color)`, and reports `ready`. The whole sequence
    /// is bounded by `init_deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`BotFault::InitFailed`] for spawn failures, construction
    /// errors reported by the driver, and deadline expiry.
    pub async fn spawn(
        python: &str,
        descriptor: &BotDescriptor,
        my_color: Color,
        opp_color: Color,
        init_deadline: Duration,
    ) -> Result<Self, BotFault> {
        let mut child = Command::new(python)
            .arg("-c")
            .arg(DRIVER)
            .arg(&descriptor.path)
            .arg(my_color.index().to_string())
            .arg(opp_color.index().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BotFault::InitFailed(format!("failed to spawn interpreter: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BotFault::InitFailed("interpreter stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BotFault::InitFailed("interpreter stdout unavailable".to_string()))?;

        let mut process = BotProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            name: descriptor.name.clone(),
        };

        match timeout(init_deadline, process.read_line()).await {
            Err(_) => {
                process.abandon();
                Err(BotFault::InitFailed(format!(
                    "initialization exceeded the {}ms deadline",
                    init_deadline.as_millis()
                )))
            }
            Ok(Err(e)) => Err(BotFault::InitFailed(format!(
                "bot exited during initialization: {}",
                e
            ))),
            Ok(Ok(line)) if line.trim() == "ready" => Ok(process),
            Ok(Ok(line)) => {
                // the driver reports construction failures as an error object
                let detail = serde_json::from_str::<DriverReply>(&line)
                    .ok()
                    .and_then(|reply| reply.error)
                    .unwrap_or(line);
                Err(BotFault::InitFailed(detail))
            }
        }
    }

    /// The bot's catalog name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the bot for a move, bounded by `deadline`.
    ///
    /// Returns the chosen move and the bot's thinking time. On deadline
    /// expiry the process is killed and [`BotFault::Timeout`] returned;
    /// the caller is never blocked longer than the deadline.
    ///
    /// `legal` is the legal-move set for the current position; replies
    /// outside it are [`BotFault::InvalidMove`].
    pub async fn select_move(
        &mut self,
        board: &[Vec<i8>],
        legal: &[Coord],
        deadline: Duration,
    ) -> Result<(Coord, Duration), BotFault> {
        let request = serde_json::json!({ "board": board }).to_string();
        let started = Instant::now();

        let exchange = async {
            self.stdin.write_all(request.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await?;
            self.read_line().await
        };

        let line = match timeout(deadline, exchange).await {
            Err(_) => {
                self.abandon();
                return Err(BotFault::Timeout(deadline));
            }
            Ok(Err(e)) => {
                return Err(BotFault::InvalidMove(format!("bot process died: {}", e)));
            }
            Ok(Ok(line)) => line,
        };

        let thinking = started.elapsed();
        let coord = parse_reply(&line, legal)?;
        Ok((coord, thinking))
    }

    async fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "bot process closed its output",
            ));
        }
        Ok(line)
    }

    /// Kills the child without waiting for it. Used on deadline expiry;
    /// whatever the bot eventually produces is discarded.
    fn abandon(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(bot = %self.name, error = %e, "failed to kill abandoned bot");
        }
    }
}

impl Drop for BotProcess {
    fn drop(&mut self) {
        // kill_on_drop is set; make the intent explicit for readers
        let _ = self.child.start_kill();
    }
}
