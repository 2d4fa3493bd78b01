use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Player {
  B,
  W,
}

impl Player {
  pub fn other(self) -> Self {
    match self {
      Player::B => Player::W,
      Player::W => Player::B,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetKind {
  Standard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameResult {
  BWin,
  WWin,
  Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coord {
  pub x: usize,
  pub y: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
  pub x: usize,
  pub y: usize,
  pub player: Player,
}

/// Winning run reported by the win detector: the result plus the exact
/// cells forming the five-or-longer line, for highlighting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinningLine {
  pub result: GameResult,
  pub line: Vec<Coord>,
}

/// Board state handed to the presentation layer after every turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
  pub board_size: usize,
  pub board: Vec<Option<Player>>,
  pub to_move: Player,
  pub result: Option<GameResult>,
  pub last_move: Option<Coord>,
  pub winning_line: Vec<Coord>,
  pub can_human_move: bool,
}

/// Knobs for the local search engine. Depth is chosen per move from the
/// candidate count at the root: wide frontiers search shallow, narrow
/// frontiers search deep, under the same wall-clock budget.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
  #[serde(default = "default_budget_ms")]
  pub budget_ms: u64,
  #[serde(default = "default_deep_depth")]
  pub deep_depth: u8,
  #[serde(default = "default_shallow_depth")]
  pub shallow_depth: u8,
  #[serde(default = "default_breadth_cutoff")]
  pub breadth_cutoff: usize,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      budget_ms: default_budget_ms(),
      deep_depth: default_deep_depth(),
      shallow_depth: default_shallow_depth(),
      breadth_cutoff: default_breadth_cutoff(),
    }
  }
}

fn default_budget_ms() -> u64 {
  2200
}

fn default_deep_depth() -> u8 {
  4
}

fn default_shallow_depth() -> u8 {
  2
}

fn default_breadth_cutoff() -> usize {
  20
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
  #[serde(default)]
  pub base_url: String,
  pub model: String,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
  #[serde(default = "default_top_p")]
  pub top_p: f32,
  #[serde(default = "default_max_tokens")]
  pub max_tokens: u32,
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  #[serde(default = "default_candidate_limit")]
  pub candidate_limit: usize,
}

fn default_temperature() -> f32 {
  0.4
}

fn default_top_p() -> f32 {
  1.0
}

fn default_max_tokens() -> u32 {
  128
}

fn default_timeout_ms() -> u64 {
  20000
}

fn default_candidate_limit() -> usize {
  12
}
