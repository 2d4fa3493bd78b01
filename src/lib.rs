//! Gomoku game-state engine and move search.
//!
//! The crate owns the board model, win detection, and a deadline-bounded
//! minimax engine; presentation and session bookkeeping live with the
//! embedding application. Engine moves come through the [`MoveSource`]
//! contract, satisfied by the local search ([`SearchSource`]) or a remote
//! chat-completions backend ([`LlmSource`]).

pub mod ai;
pub mod engine;
pub mod llm;
pub mod rules;
pub mod source;
pub mod types;

pub use engine::{Board, GameState, DEFAULT_BOARD_SIZE};
pub use source::{LlmSource, MoveSource, SearchSource};
pub use types::{
  Coord, GameResult, GameSnapshot, LlmConfig, Move, Player, RuleSetKind, SearchConfig, WinningLine,
};
