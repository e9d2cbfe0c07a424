//! Per-match state machine.
//!
//! A [`MatchCoordinator`] exclusively owns one match: the game state, the
//! pause flag, and the two seats (human, or a live bot process). Every
//! mutation goes through the coordinator's async mutex, so concurrent
//! human moves and bot advancement can never interleave destructively -
//! state updates within one match are totally ordered. Callers only ever
//! receive cloned [`MatchState`] snapshots.
//!
//! Bot faults are terminal: whatever kind the runtime reports, the
//! offending seat forfeits on the spot and the fault is surfaced in the
//! outcome message. Faulted bots are never retried.

use crate::config::ServerConfig;
use crate::protocol::{winner_wire, MatchConfig, MatchState, PlayerKind};
use bot_sandbox::{BotCatalog, BotProcess};
use othello_core::{Color, Coord, Outcome};
use othello_engine::{BoardError, Game, GameError, IllegalMoveError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Errors validating or setting up a new match.
#[derive(Debug, Error)]
pub enum CreateError {
    /// Board size out of range or odd.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// A seat is configured as a bot without a bot name.
    #[error("{0} seat is a bot but no bot name was given")]
    MissingBotName(Color),
    /// The named bot is not in the catalog.
    #[error("unknown bot '{0}'")]
    UnknownBot(String),
    /// A timeout value is not a positive number of seconds.
    #[error("timeouts must be positive numbers of seconds")]
    InvalidTimeout,
}

/// Errors rejecting a human move. None of these mutate match state, and
/// they are surfaced only to the submitting connection.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error("match is paused")]
    Paused,
    #[error("game is already over")]
    GameOver,
    #[error("it is not a human seat's turn")]
    NotHumanTurn,
    #[error(transparent)]
    Illegal(#[from] IllegalMoveError),
}

/// Outcome of one bot-advance step.
#[derive(Debug)]
pub enum BotTurn {
    /// Nothing to advance: paused, game over, or a human's turn.
    Idle,
    /// The bot moved; broadcast the new state.
    Played(MatchState),
    /// The bot faulted and its seat forfeited; the match is over.
    Fault { state: MatchState, message: String },
}

/// A seat is either driven by inbound human moves or by a bot process
/// owned for the lifetime of this match.
enum Seat {
    Human,
    Bot(BotProcess),
}

/// Mutable match state; only reachable through the coordinator's mutex.
struct MatchInner {
    game: Game,
    paused: bool,
    seats: [Seat; 2],
    bot_thinking_ms: Option<u64>,
    message: Option<String>,
}

impl MatchInner {
    /// Clones out the wire snapshot of the current state.
    fn snapshot(&self) -> MatchState {
        let game = &self.game;
        let (black, white) = game.counts();
        let mut stable_pieces: Vec<(u8, u8)> = game
            .stable_pieces()
            .into_iter()
            .map(|c| (c.row, c.col))
            .collect();
        stable_pieces.sort_unstable();

        MatchState {
            board: game.board().to_grid(),
            current_player: game.side_to_move().index() as i8,
            black_count: black as u32,
            white_count: white as u32,
            valid_moves: game.legal_moves().iter().map(|c| (c.row, c.col)).collect(),
            game_over: game.is_over(),
            winner: winner_wire(game.result()),
            paused: self.paused,
            last_move: game.last_move().map(|c| (c.row, c.col)),
            last_flipped: game.last_flipped().iter().map(|c| (c.row, c.col)).collect(),
            stable_pieces,
            bot_thinking_time_ms: self.bot_thinking_ms,
            message: self.message.clone(),
        }
    }

    /// Recomputes the display message after a regular (non-forfeit) move.
    fn refresh_message(&mut self) {
        self.message = match self.game.result() {
            Some(Outcome::BlackWins) => Some("Black wins!".to_string()),
            Some(Outcome::WhiteWins) => Some("White wins!".to_string()),
            Some(Outcome::Draw) => Some("Game ended in a draw".to_string()),
            None => self
                .game
                .skipped_turn()
                .map(|color| format!("{} has no legal moves - turn passes", color)),
        };
    }
}

/// Owns and serializes all mutation of one match.
pub struct MatchCoordinator {
    id: String,
    move_deadline: Duration,
    inner: Mutex<MatchInner>,
}

impl std::fmt::Debug for MatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCoordinator")
            .field("id", &self.id)
            .field("move_deadline", &self.move_deadline)
            .finish_non_exhaustive()
    }
}

fn resolve_timeout(configured: Option<f64>, default: Duration) -> Result<Duration, CreateError> {
    match configured {
        None => Ok(default),
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        Some(_) => Err(CreateError::InvalidTimeout),
    }
}

impl MatchCoordinator {
    /// Validates the config, seeds the board, and initializes bot seats.
    ///
    /// Bot initialization is bounded by the init deadline; a seat that
    /// fails to come up forfeits immediately, so the returned match may
    /// already be over (with the fault recorded in its message).
    ///
    /// # Errors
    ///
    /// Returns [`CreateError`] for structural problems: bad board size,
    /// bad timeouts, missing or unknown bot names.
    pub async fn create(
        config: MatchConfig,
        catalog: &BotCatalog,
        defaults: &ServerConfig,
    ) -> Result<Self, CreateError> {
        let init_deadline = resolve_timeout(config.init_timeout, defaults.init_timeout())?;
        let move_deadline = resolve_timeout(config.move_timeout, defaults.move_timeout())?;
        let game = Game::new(config.board_size)?;

        // resolve every descriptor before spawning anything, so config
        // errors come back without side effects
        let mut descriptors = [None, None];
        for color in [Color::Black, Color::White] {
            if config.player_kind(color) == PlayerKind::Bot {
                let name = config
                    .bot_name(color)
                    .ok_or(CreateError::MissingBotName(color))?;
                let descriptor = catalog
                    .get(name)
                    .ok_or_else(|| CreateError::UnknownBot(name.to_string()))?;
                descriptors[color.index()] = Some(descriptor);
            }
        }

        let id = Uuid::new_v4().to_string();
        let mut inner = MatchInner {
            game,
            paused: false,
            seats: [Seat::Human, Seat::Human],
            bot_thinking_ms: None,
            message: None,
        };

        for color in [Color::Black, Color::White] {
            let Some(descriptor) = descriptors[color.index()].take() else {
                continue;
            };
            if inner.game.is_over() {
                break; // the other seat already failed to initialize
            }
            match BotProcess::spawn(
                &defaults.python,
                &descriptor,
                color,
                color.opposite(),
                init_deadline,
            )
            .await
            {
                Ok(process) => inner.seats[color.index()] = Seat::Bot(process),
                Err(fault) => {
                    tracing::warn!(
                        match_id = %id,
                        bot = %descriptor.name,
                        fault = fault.kind(),
                        "bot seat failed to initialize"
                    );
                    let _ = inner.game.forfeit(color);
                    inner.message = Some(format!("Bot '{}' forfeits: {}", descriptor.name, fault));
                }
            }
        }

        tracing::info!(match_id = %id, size = config.board_size, "match created");
        Ok(MatchCoordinator {
            id,
            move_deadline,
            inner: Mutex::new(inner),
        })
    }

    /// The match identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// A snapshot of the current state.
    pub async fn snapshot(&self) -> MatchState {
        self.inner.lock().await.snapshot()
    }

    /// Plays a human move for the side to move.
    ///
    /// Returns the new snapshot and the color that moved.
    ///
    /// # Errors
    ///
    /// Returns [`PlayError`] when the match is paused or over, when the
    /// side to move is a bot seat, or when the move is illegal. State is
    /// unchanged on every error path.
    pub async fn play_move(&self, row: u8, col: u8) -> Result<(MatchState, Color), PlayError> {
        let mut inner = self.inner.lock().await;
        if inner.game.is_over() {
            return Err(PlayError::GameOver);
        }
        if inner.paused {
            return Err(PlayError::Paused);
        }

        let mover = inner.game.side_to_move();
        if !matches!(inner.seats[mover.index()], Seat::Human) {
            return Err(PlayError::NotHumanTurn);
        }

        inner
            .game
            .make_move(Coord::new(row, col))
            .map_err(|e| match e {
                GameError::IllegalMove(err) => PlayError::Illegal(err),
                GameError::GameAlreadyOver => PlayError::GameOver,
            })?;
        inner.refresh_message();
        Ok((inner.snapshot(), mover))
    }

    /// Advances one bot turn if the side to move is a bot.
    ///
    /// The bot call runs under the match's move deadline while the match
    /// lock is held - that is the single-writer boundary that keeps a
    /// human move from racing the bot's board. On any fault the bot's
    /// seat forfeits immediately.
    pub async fn advance_bot_turn(&self) -> BotTurn {
        let mut inner = self.inner.lock().await;
        if inner.game.is_over() || inner.paused {
            return BotTurn::Idle;
        }

        let mover = inner.game.side_to_move();
        let legal = inner.game.legal_moves();
        let grid = inner.game.board().to_grid();

        let Seat::Bot(ref mut process) = inner.seats[mover.index()] else {
            return BotTurn::Idle;
        };
        let bot_name = process.name().to_string();
        let result = process.select_move(&grid, &legal, self.move_deadline).await;

        match result {
            Ok((coord, thinking)) => {
                inner.bot_thinking_ms = Some(thinking.as_millis() as u64);
                match inner.game.make_move(coord) {
                    Ok(()) => {
                        inner.refresh_message();
                        BotTurn::Played(inner.snapshot())
                    }
                    Err(err) => {
                        // the runtime already checked legality; treat a
                        // disagreement as a bot fault, not a crash
                        let _ = inner.game.forfeit(mover);
                        let message =
                            format!("Bot '{}' forfeits: invalid move ({})", bot_name, err);
                        inner.message = Some(message.clone());
                        BotTurn::Fault {
                            state: inner.snapshot(),
                            message,
                        }
                    }
                }
            }
            Err(fault) => {
                tracing::warn!(
                    match_id = %self.id,
                    bot = %bot_name,
                    fault = fault.kind(),
                    "bot fault ends match"
                );
                let _ = inner.game.forfeit(mover);
                let message = format!("Bot '{}' forfeits: {}", bot_name, fault);
                inner.message = Some(message.clone());
                BotTurn::Fault {
                    state: inner.snapshot(),
                    message,
                }
            }
        }
    }

    /// Toggles `InProgress <-> Paused`; a no-op once the game is over.
    ///
    /// Pausing does not cancel a bot call already in flight (the toggle
    /// waits its turn on the match lock); it prevents new ones from
    /// starting.
    pub async fn toggle_pause(&self) -> MatchState {
        let mut inner = self.inner.lock().await;
        if !inner.game.is_over() {
            inner.paused = !inner.paused;
            tracing::info!(match_id = %self.id, paused = inner.paused, "pause toggled");
        }
        inner.snapshot()
    }

    /// True when the next `advance_bot_turn` would actually move a bot.
    pub async fn needs_bot_turn(&self) -> bool {
        let inner = self.inner.lock().await;
        !inner.game.is_over()
            && !inner.paused
            && matches!(
                inner.seats[inner.game.side_to_move().index()],
                Seat::Bot(_)
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn human_config(size: u8) -> MatchConfig {
        MatchConfig {
            board_size: size,
            black_player_type: PlayerKind::Human,
            black_bot_name: None,
            white_player_type: PlayerKind::Human,
            white_bot_name: None,
            init_timeout: None,
            move_timeout: None,
        }
    }

    fn test_catalog(dir: &std::path::Path) -> BotCatalog {
        BotCatalog::open(
            &dir.join("builtin"),
            &dir.join("uploads"),
            &dir.join("quarantine"),
        )
        .unwrap()
    }

    async fn human_match(size: u8) -> MatchCoordinator {
        let dir = tempfile::tempdir().unwrap();
        let catalog = test_catalog(dir.path());
        MatchCoordinator::create(human_config(size), &catalog, &ServerConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_seeds_the_board() {
        let coordinator = human_match(8).await;
        let state = coordinator.snapshot().await;
        assert_eq!(state.black_count, 2);
        assert_eq!(state.white_count, 2);
        assert_eq!(state.current_player, 0);
        assert_eq!(state.valid_moves.len(), 4);
        assert!(!state.game_over);
        assert!(!state.paused);
        assert!(state.message.is_none());
    }

    #[tokio::test]
    async fn create_rejects_bad_sizes_and_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = test_catalog(dir.path());
        let defaults = ServerConfig::default();

        let err = MatchCoordinator::create(human_config(7), &catalog, &defaults)
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::Board(_)));

        let mut config = human_config(8);
        config.move_timeout = Some(-1.0);
        let err = MatchCoordinator::create(config, &catalog, &defaults)
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::InvalidTimeout));
    }

    #[tokio::test]
    async fn create_rejects_bad_bot_configs() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = test_catalog(dir.path());
        let defaults = ServerConfig::default();

        let mut config = human_config(8);
        config.white_player_type = PlayerKind::Bot;
        let err = MatchCoordinator::create(config.clone(), &catalog, &defaults)
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::MissingBotName(Color::White)));

        config.white_bot_name = Some("ghost".to_string());
        let err = MatchCoordinator::create(config, &catalog, &defaults)
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::UnknownBot(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn play_move_applies_and_reports_the_mover() {
        let coordinator = human_match(8).await;
        let (state, mover) = coordinator.play_move(2, 3).await.unwrap();
        assert_eq!(mover, Color::Black);
        assert_eq!(state.current_player, 1);
        assert_eq!(state.last_move, Some((2, 3)));
        assert_eq!(state.last_flipped, vec![(3, 3)]);
        assert_eq!(state.black_count, 4);
        assert_eq!(state.white_count, 1);
    }

    #[tokio::test]
    async fn illegal_move_is_rejected_without_state_change() {
        let coordinator = human_match(8).await;
        let before = coordinator.snapshot().await;
        let err = coordinator.play_move(0, 0).await.unwrap_err();
        assert!(matches!(err, PlayError::Illegal(_)));
        let after = coordinator.snapshot().await;
        assert_eq!(before.board, after.board);
        assert_eq!(before.current_player, after.current_player);
    }

    #[tokio::test]
    async fn pause_blocks_human_moves_until_resumed() {
        let coordinator = human_match(8).await;

        let state = coordinator.toggle_pause().await;
        assert!(state.paused);
        assert!(matches!(
            coordinator.play_move(2, 3).await.unwrap_err(),
            PlayError::Paused
        ));

        let state = coordinator.toggle_pause().await;
        assert!(!state.paused);
        coordinator.play_move(2, 3).await.unwrap();
    }

    #[tokio::test]
    async fn advance_bot_turn_is_idle_for_human_seats() {
        let coordinator = human_match(8).await;
        assert!(matches!(
            coordinator.advance_bot_turn().await,
            BotTurn::Idle
        ));
        assert!(!coordinator.needs_bot_turn().await);
    }

    #[tokio::test]
    async fn concurrent_moves_serialize_to_one_winner() {
        let coordinator = Arc::new(human_match(8).await);

        let a = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.play_move(2, 3).await })
        };
        let b = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.play_move(2, 3).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let oks = results.iter().filter(|r| r.is_ok()).count();
        // the same cell cannot be played twice; exactly one attempt wins
        assert_eq!(oks, 1);

        let state = coordinator.snapshot().await;
        assert_eq!(state.black_count + state.white_count, 5);
    }

    #[tokio::test]
    async fn finished_match_cannot_be_paused_or_played() {
        let coordinator = human_match(8).await;
        // drive the game to completion with first-legal-move play
        loop {
            let state = coordinator.snapshot().await;
            if state.game_over {
                break;
            }
            let (row, col) = state.valid_moves[0];
            coordinator.play_move(row, col).await.unwrap();
        }

        let state = coordinator.toggle_pause().await;
        assert!(!state.paused);
        assert!(state.game_over);
        assert!(state.winner.is_some());
        assert!(state.message.is_some());
        assert!(matches!(
            coordinator.play_move(0, 0).await.unwrap_err(),
            PlayError::GameOver
        ));
    }

    mod with_python {
        //! Bot-seat tests; `#[ignore]`d because they exec `python3`.

        use super::*;
        use bot_sandbox::BotFault;

        const SLEEPER_BOT: &str = r#"
import time


class Player:
    def __init__(self, my_color, opp_color):
        pass

    def select_move(self, board):
        time.sleep(30)
        return (0, 0)
"#;

        const FIRST_MOVE_BOT: &str = r#"
class Player:
    def __init__(self, my_color, opp_color):
        self.my_color = my_color
        self.opp_color = opp_color

    def select_move(self, board):
        n = len(board)
        directions = [(-1, 0), (-1, 1), (0, 1), (1, 1),
                      (1, 0), (1, -1), (0, -1), (-1, -1)]
        for row in range(n):
            for col in range(n):
                if board[row][col] != -1:
                    continue
                for dr, dc in directions:
                    r, c = row + dr, col + dc
                    seen = False
                    while 0 <= r < n and 0 <= c < n:
                        if board[r][c] == self.opp_color:
                            seen = True
                        elif board[r][c] == self.my_color:
                            if seen:
                                return (row, col)
                            break
                        else:
                            break
                        r += dr
                        c += dc
        return (0, 0)
"#;

        fn catalog_with_bots(dir: &std::path::Path) -> BotCatalog {
            let builtin = dir.join("builtin");
            std::fs::create_dir_all(&builtin).unwrap();
            std::fs::write(builtin.join("first_move.py"), FIRST_MOVE_BOT).unwrap();
            std::fs::write(builtin.join("sleeper.py"), SLEEPER_BOT).unwrap();
            test_catalog(dir)
        }

        fn bot_vs_bot(black: &str, white: &str, move_timeout: f64) -> MatchConfig {
            MatchConfig {
                board_size: 4,
                black_player_type: PlayerKind::Bot,
                black_bot_name: Some(black.to_string()),
                white_player_type: PlayerKind::Bot,
                white_bot_name: Some(white.to_string()),
                init_timeout: Some(10.0),
                move_timeout: Some(move_timeout),
            }
        }

        #[tokio::test]
        #[ignore = "requires a python3 interpreter on PATH"]
        async fn bot_vs_bot_match_runs_to_completion() {
            let dir = tempfile::tempdir().unwrap();
            let catalog = catalog_with_bots(dir.path());
            let coordinator = MatchCoordinator::create(
                bot_vs_bot("first_move", "first_move", 5.0),
                &catalog,
                &ServerConfig::default(),
            )
            .await
            .unwrap();

            let mut steps = 0;
            loop {
                match coordinator.advance_bot_turn().await {
                    BotTurn::Played(state) => {
                        if state.game_over {
                            assert!(state.winner.is_some());
                            break;
                        }
                    }
                    BotTurn::Fault { message, .. } => panic!("unexpected fault: {}", message),
                    BotTurn::Idle => panic!("bot match went idle before ending"),
                }
                steps += 1;
                assert!(steps <= 16, "match did not terminate");
            }
        }

        #[tokio::test]
        #[ignore = "requires a python3 interpreter on PATH"]
        async fn timed_out_bot_forfeits_within_one_cycle() {
            let dir = tempfile::tempdir().unwrap();
            let catalog = catalog_with_bots(dir.path());
            let coordinator = MatchCoordinator::create(
                bot_vs_bot("sleeper", "first_move", 0.3),
                &catalog,
                &ServerConfig::default(),
            )
            .await
            .unwrap();

            let BotTurn::Fault { state, message } = coordinator.advance_bot_turn().await else {
                panic!("expected a fault");
            };
            assert!(state.game_over);
            // black (the sleeper) loses, white wins
            assert_eq!(state.winner, Some(1));
            let expected = BotFault::Timeout(Duration::from_millis(300));
            assert!(message.contains(&expected.to_string()));
        }

        #[tokio::test]
        #[ignore = "requires a python3 interpreter on PATH"]
        async fn human_cannot_move_for_a_bot_seat() {
            let dir = tempfile::tempdir().unwrap();
            let catalog = catalog_with_bots(dir.path());
            let mut config = bot_vs_bot("first_move", "first_move", 5.0);
            config.white_player_type = PlayerKind::Human;
            config.white_bot_name = None;

            let coordinator =
                MatchCoordinator::create(config, &catalog, &ServerConfig::default())
                    .await
                    .unwrap();
            // black is a bot and moves first
            assert!(matches!(
                coordinator.play_move(0, 1).await.unwrap_err(),
                PlayError::NotHumanTurn
            ));
            assert!(coordinator.needs_bot_turn().await);
        }

        #[tokio::test]
        #[ignore = "requires a python3 interpreter on PATH"]
        async fn paused_match_does_not_advance_bots() {
            let dir = tempfile::tempdir().unwrap();
            let catalog = catalog_with_bots(dir.path());
            let coordinator = MatchCoordinator::create(
                bot_vs_bot("first_move", "first_move", 5.0),
                &catalog,
                &ServerConfig::default(),
            )
            .await
            .unwrap();

            coordinator.toggle_pause().await;
            assert!(matches!(
                coordinator.advance_bot_turn().await,
                BotTurn::Idle
            ));
            assert!(!coordinator.needs_bot_turn().await);

            coordinator.toggle_pause().await;
            assert!(coordinator.needs_bot_turn().await);
            assert!(matches!(
                coordinator.advance_bot_turn().await,
                BotTurn::Played(_)
            ));
        }
    }
}
