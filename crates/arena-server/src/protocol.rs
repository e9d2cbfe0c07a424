//! Wire protocol for the realtime gateway.
//!
//! All messages use snake_case tag names for JSON serialization. Board
//! cells and players travel as the numeric encoding the frontend expects:
//! -1 empty, 0 black, 1 white; the winner adds -1 for a draw.

use othello_core::{Color, Outcome};
use serde::{Deserialize, Serialize};

/// Who controls a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Bot,
}

/// Configuration for a new match, as sent by the client.
///
/// Immutable once the match starts. Deadlines are optional and fall back
/// to the server defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Board dimension, even, 4-100.
    pub board_size: u8,
    pub black_player_type: PlayerKind,
    #[serde(default)]
    pub black_bot_name: Option<String>,
    pub white_player_type: PlayerKind,
    #[serde(default)]
    pub white_bot_name: Option<String>,
    /// Bot initialization deadline in seconds.
    #[serde(default)]
    pub init_timeout: Option<f64>,
    /// Per-move bot deadline in seconds.
    #[serde(default)]
    pub move_timeout: Option<f64>,
}

impl MatchConfig {
    /// The controller of `color`'s seat.
    pub fn player_kind(&self, color: Color) -> PlayerKind {
        match color {
            Color::Black => self.black_player_type,
            Color::White => self.white_player_type,
        }
    }

    /// The configured bot name for `color`'s seat, if any.
    pub fn bot_name(&self, color: Color) -> Option<&str> {
        match color {
            Color::Black => self.black_bot_name.as_deref(),
            Color::White => self.white_bot_name.as_deref(),
        }
    }
}

/// Authoritative snapshot of one match, broadcast after every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    /// Full board grid: -1 empty, 0 black, 1 white.
    pub board: Vec<Vec<i8>>,
    /// Side to move: 0 black, 1 white.
    pub current_player: i8,
    pub black_count: u32,
    pub white_count: u32,
    /// Legal moves for the side to move; empty once the game is over.
    pub valid_moves: Vec<(u8, u8)>,
    pub game_over: bool,
    /// 0 black, 1 white, -1 draw; absent while in progress.
    pub winner: Option<i8>,
    pub paused: bool,
    pub last_move: Option<(u8, u8)>,
    pub last_flipped: Vec<(u8, u8)>,
    /// Cells that can no longer be flipped (conservative).
    pub stable_pieces: Vec<(u8, u8)>,
    /// Thinking time of the most recent bot move.
    pub bot_thinking_time_ms: Option<u64>,
    /// Human-readable note: skipped turns, forfeits, final result.
    pub message: Option<String>,
}

/// Messages from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new match and attach this connection to it.
    CreateMatch { config: MatchConfig },
    /// Play a human move in a match.
    PlayMove { match_id: String, row: u8, col: u8 },
    /// Toggle the pause flag of a match.
    TogglePause { match_id: String },
    /// Re-read a match's current state (reconnect support).
    GetState { match_id: String },
}

/// Messages from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A match was created for this connection.
    MatchCreated { match_id: String },
    /// New authoritative state for the attached match.
    GameState { state: MatchState },
    /// Echo of an accepted human move. `player` is the side that moved.
    MovePlayed { row: u8, col: u8, player: i8 },
    /// The match ended.
    MatchEnd {
        winner: Option<i8>,
        message: String,
    },
    /// Request-scoped error; no match state changed.
    Error { message: String },
    /// A bot fault that decided a match.
    BotError { message: String },
}

/// Wire encoding of a winner: 0 black, 1 white, -1 draw.
pub fn winner_wire(outcome: Option<Outcome>) -> Option<i8> {
    outcome.map(|outcome| match outcome.winner() {
        Some(color) => color.index() as i8,
        None => -1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_match_deserialization() {
        let json = r#"{
            "type": "create_match",
            "config": {
                "board_size": 8,
                "black_player_type": "human",
                "white_player_type": "bot",
                "white_bot_name": "random_player",
                "move_timeout": 1.5
            }
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        let ClientMessage::CreateMatch { config } = msg else {
            panic!("expected CreateMatch");
        };
        assert_eq!(config.board_size, 8);
        assert_eq!(config.black_player_type, PlayerKind::Human);
        assert_eq!(config.bot_name(Color::White), Some("random_player"));
        assert_eq!(config.bot_name(Color::Black), None);
        assert_eq!(config.move_timeout, Some(1.5));
        assert_eq!(config.init_timeout, None);
    }

    #[test]
    fn play_move_deserialization() {
        let json = r#"{"type":"play_move","match_id":"m1","row":2,"col":3}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::PlayMove { row: 2, col: 3, .. }
        ));
    }

    #[test]
    fn toggle_pause_and_get_state_deserialization() {
        let toggle: ClientMessage =
            serde_json::from_str(r#"{"type":"toggle_pause","match_id":"m1"}"#).unwrap();
        assert!(matches!(toggle, ClientMessage::TogglePause { .. }));

        let get: ClientMessage =
            serde_json::from_str(r#"{"type":"get_state","match_id":"m1"}"#).unwrap();
        assert!(matches!(get, ClientMessage::GetState { .. }));
    }

    #[test]
    fn match_created_serialization() {
        let msg = ServerMessage::MatchCreated {
            match_id: "abc".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"match_created\""));
        assert!(json.contains("\"match_id\":\"abc\""));
    }

    #[test]
    fn game_state_serialization_uses_numeric_encoding() {
        let msg = ServerMessage::GameState {
            state: MatchState {
                board: vec![vec![-1, 0], vec![1, -1]],
                current_player: 0,
                black_count: 1,
                white_count: 1,
                valid_moves: vec![(0, 0)],
                game_over: false,
                winner: None,
                paused: false,
                last_move: Some((1, 0)),
                last_flipped: vec![],
                stable_pieces: vec![],
                bot_thinking_time_ms: Some(12),
                message: None,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"game_state\""));
        assert!(json.contains("\"board\":[[-1,0],[1,-1]]"));
        assert!(json.contains("\"valid_moves\":[[0,0]]"));
        assert!(json.contains("\"last_move\":[1,0]"));
        assert!(json.contains("\"winner\":null"));
        assert!(json.contains("\"bot_thinking_time_ms\":12"));
    }

    #[test]
    fn move_played_serialization() {
        let msg = ServerMessage::MovePlayed {
            row: 2,
            col: 3,
            player: 0,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"move_played\""));
        assert!(json.contains("\"row\":2"));
        assert!(json.contains("\"col\":3"));
        assert!(json.contains("\"player\":0"));
    }

    #[test]
    fn match_end_serialization() {
        let msg = ServerMessage::MatchEnd {
            winner: Some(-1),
            message: "Game ended in a draw".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"match_end\""));
        assert!(json.contains("\"winner\":-1"));
    }

    #[test]
    fn error_messages_serialization() {
        let json = serde_json::to_string(&ServerMessage::Error {
            message: "Match not found".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"error\""));

        let json = serde_json::to_string(&ServerMessage::BotError {
            message: "boom".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"bot_error\""));
    }

    #[test]
    fn winner_wire_encoding() {
        assert_eq!(winner_wire(None), None);
        assert_eq!(winner_wire(Some(Outcome::BlackWins)), Some(0));
        assert_eq!(winner_wire(Some(Outcome::WhiteWins)), Some(1));
        assert_eq!(winner_wire(Some(Outcome::Draw)), Some(-1));
    }
}
