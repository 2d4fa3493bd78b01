use crate::ai;
use crate::engine::Board;
use crate::llm;
use crate::types::{Coord, LlmConfig, Player, RuleSetKind, SearchConfig};

/// A provider of engine moves. The local search and the remote inference
/// backend both satisfy this contract, so the turn state machine's caller
/// can swap one for the other transparently.
///
/// `Ok(None)` means "no move"; the caller falls back to
/// `ai::random_legal_move`. An `Err` must leave the board untouched.
pub trait MoveSource {
  fn propose(
    &self,
    board: &Board,
    player: Player,
    last_move: Option<Coord>,
  ) -> Result<Option<Coord>, String>;
}

/// Local deadline-bounded minimax search.
pub struct SearchSource {
  pub config: SearchConfig,
}

impl MoveSource for SearchSource {
  fn propose(
    &self,
    board: &Board,
    player: Player,
    last_move: Option<Coord>,
  ) -> Result<Option<Coord>, String> {
    Ok(ai::choose_move(board, player, self.config, last_move))
  }
}

/// Remote chat-completions backend. Forced tactical lines are resolved
/// locally first so network latency never drops an immediate win or block.
pub struct LlmSource {
  pub rule_set: RuleSetKind,
  pub config: LlmConfig,
  pub api_key: String,
}

impl MoveSource for LlmSource {
  fn propose(
    &self,
    board: &Board,
    player: Player,
    last_move: Option<Coord>,
  ) -> Result<Option<Coord>, String> {
    if let Some(coord) = ai::tactical_move(board, self.rule_set, player) {
      return Ok(Some(coord));
    }
    llm::choose_move(board, player, &self.config, &self.api_key, last_move)
  }
}
