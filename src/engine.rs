use crate::rules::rules_for;
use crate::types::{Coord, GameResult, GameSnapshot, Move, Player, RuleSetKind};

pub const DEFAULT_BOARD_SIZE: usize = 15;

/// Fixed-size grid of cell states. `None` is an empty cell. The only public
/// mutation is `place`; speculative place/undo during search goes through
/// the crate-private `set`/`clear` pair on a working clone.
#[derive(Clone, Debug, PartialEq)]
pub struct Board {
  size: usize,
  cells: Vec<Option<Player>>,
}

impl Board {
  pub fn new(size: usize) -> Self {
    Self {
      size,
      cells: vec![None; size * size],
    }
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn in_bounds(&self, x: usize, y: usize) -> bool {
    x < self.size && y < self.size
  }

  fn index(&self, x: usize, y: usize) -> usize {
    y * self.size + x
  }

  pub fn get(&self, x: usize, y: usize) -> Option<Player> {
    if !self.in_bounds(x, y) {
      return None;
    }
    self.cells[self.index(x, y)]
  }

  pub fn place(&mut self, x: usize, y: usize, player: Player) -> Result<(), String> {
    if !self.in_bounds(x, y) {
      return Err("Move out of range".to_string());
    }
    if self.get(x, y).is_some() {
      return Err("Cell is occupied".to_string());
    }
    let idx = self.index(x, y);
    self.cells[idx] = Some(player);
    Ok(())
  }

  pub(crate) fn set(&mut self, x: usize, y: usize, player: Player) {
    let idx = self.index(x, y);
    self.cells[idx] = Some(player);
  }

  pub(crate) fn clear(&mut self, x: usize, y: usize) {
    let idx = self.index(x, y);
    self.cells[idx] = None;
  }

  pub fn is_empty(&self, x: usize, y: usize) -> bool {
    self.in_bounds(x, y) && self.get(x, y).is_none()
  }

  pub fn is_blank(&self) -> bool {
    self.cells.iter().all(|cell| cell.is_none())
  }

  pub fn is_full(&self) -> bool {
    self.cells.iter().all(|cell| cell.is_some())
  }

  pub fn center(&self) -> Coord {
    Coord {
      x: self.size / 2,
      y: self.size / 2,
    }
  }

  pub fn empty_coords(&self) -> Vec<Coord> {
    let mut coords = Vec::with_capacity(self.size * self.size);
    for y in 0..self.size {
      for x in 0..self.size {
        if self.get(x, y).is_none() {
          coords.push(Coord { x, y });
        }
      }
    }
    coords
  }

  pub fn cells(&self) -> Vec<Option<Player>> {
    self.cells.clone()
  }
}

/// Turn state machine. Owns the live board, gates whose ply is active, and
/// applies exactly one move per completed turn. Black opens.
///
/// `generation` increments on every applied move and on reset; an engine
/// move computed against an older generation is rejected, so an abandoned
/// search can never land a stale move on a reset board.
#[derive(Clone, Debug)]
pub struct GameState {
  pub board: Board,
  pub rule_set: RuleSetKind,
  pub to_move: Player,
  pub moves: Vec<Move>,
  pub result: Option<GameResult>,
  pub winning_line: Vec<Coord>,
  pub human_color: Player,
  generation: u64,
}

impl GameState {
  pub fn new(board_size: usize, rule_set: RuleSetKind, human_color: Player) -> Self {
    Self {
      board: Board::new(board_size),
      rule_set,
      to_move: Player::B,
      moves: Vec::new(),
      result: None,
      winning_line: Vec::new(),
      human_color,
      generation: 0,
    }
  }

  pub fn reset(&mut self) {
    self.board = Board::new(self.board.size());
    self.to_move = Player::B;
    self.moves.clear();
    self.result = None;
    self.winning_line.clear();
    self.generation += 1;
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn last_move(&self) -> Option<Coord> {
    self.moves.last().map(|mv| Coord { x: mv.x, y: mv.y })
  }

  pub fn can_human_move(&self) -> bool {
    self.result.is_none() && self.to_move == self.human_color
  }

  pub fn is_engine_turn(&self) -> bool {
    self.result.is_none() && self.to_move != self.human_color
  }

  pub fn apply_move(&mut self, x: usize, y: usize) -> Result<(), String> {
    if self.result.is_some() {
      return Err("Game is already finished".to_string());
    }
    if self.to_move != self.human_color {
      return Err("It's not your turn".to_string());
    }
    self.apply(Move {
      x,
      y,
      player: self.human_color,
    })
  }

  /// Apply a move proposed by a move source. `generation` must match the
  /// value read when the search was started.
  pub fn apply_engine_move(&mut self, coord: Coord, generation: u64) -> Result<(), String> {
    if generation != self.generation {
      return Err("Stale engine move".to_string());
    }
    if !self.is_engine_turn() {
      return Err("It's not the engine's turn".to_string());
    }
    self.apply(Move {
      x: coord.x,
      y: coord.y,
      player: self.to_move,
    })
  }

  fn apply(&mut self, mv: Move) -> Result<(), String> {
    let rules = rules_for(self.rule_set);
    if !rules.is_legal(&self.board, &mv) {
      return Err("Illegal move".to_string());
    }

    self.board.place(mv.x, mv.y, mv.player)?;
    self.moves.push(mv);
    self.generation += 1;

    if let Some(win) = rules.check_win(&self.board, &mv) {
      self.result = Some(win.result);
      self.winning_line = win.line;
      return Ok(());
    }

    if self.board.is_full() {
      self.result = Some(GameResult::Draw);
      return Ok(());
    }

    self.to_move = self.to_move.other();
    Ok(())
  }

  pub fn snapshot(&self) -> GameSnapshot {
    GameSnapshot {
      board_size: self.board.size(),
      board: self.board.cells(),
      to_move: self.to_move,
      result: self.result,
      last_move: self.last_move(),
      winning_line: self.winning_line.clone(),
      can_human_move: self.can_human_move(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn place_rejects_occupied_and_out_of_range() {
    let mut board = Board::new(DEFAULT_BOARD_SIZE);
    assert!(board.place(7, 7, Player::B).is_ok());
    assert!(board.place(7, 7, Player::W).is_err());
    assert!(board.place(15, 0, Player::W).is_err());
    assert_eq!(board.get(7, 7), Some(Player::B));
  }

  #[test]
  fn human_move_rejected_off_turn() {
    let mut game = GameState::new(DEFAULT_BOARD_SIZE, RuleSetKind::Standard, Player::B);
    game.apply_move(7, 7).unwrap();
    // White (engine side) to move now.
    let err = game.apply_move(8, 8);
    assert!(err.is_err());
    assert_eq!(game.to_move, Player::W);
    assert_eq!(game.moves.len(), 1);
  }

  #[test]
  fn illegal_move_leaves_state_unchanged() {
    let mut game = GameState::new(DEFAULT_BOARD_SIZE, RuleSetKind::Standard, Player::B);
    game.apply_move(7, 7).unwrap();
    let gen = game.generation();
    assert!(game
      .apply_engine_move(Coord { x: 7, y: 7 }, gen)
      .is_err());
    assert!(game
      .apply_engine_move(Coord { x: 99, y: 0 }, gen)
      .is_err());
    assert_eq!(game.generation(), gen);
    assert_eq!(game.moves.len(), 1);
  }

  #[test]
  fn stale_generation_rejected() {
    let mut game = GameState::new(DEFAULT_BOARD_SIZE, RuleSetKind::Standard, Player::B);
    game.apply_move(7, 7).unwrap();
    let gen = game.generation();
    game.reset();
    let err = game.apply_engine_move(Coord { x: 0, y: 0 }, gen);
    assert!(err.is_err());
    assert!(game.board.is_blank());
  }

  #[test]
  fn win_is_terminal_until_reset() {
    let mut game = GameState::new(DEFAULT_BOARD_SIZE, RuleSetKind::Standard, Player::B);
    // Black builds five in a row on y=0 while White wanders on y=14.
    for i in 0..4 {
      game.apply_move(i, 0).unwrap();
      let gen = game.generation();
      game.apply_engine_move(Coord { x: i, y: 14 }, gen).unwrap();
    }
    game.apply_move(4, 0).unwrap();
    assert_eq!(game.result, Some(GameResult::BWin));
    assert_eq!(game.winning_line.len(), 5);
    assert!(game.apply_move(10, 10).is_err());

    game.reset();
    assert_eq!(game.result, None);
    assert!(game.winning_line.is_empty());
    assert_eq!(game.to_move, Player::B);
    assert!(game.board.is_blank());
  }

  #[test]
  fn full_board_without_five_is_a_draw() {
    // 3x3 board cannot hold a five, so filling it must end in a draw.
    let mut game = GameState::new(3, RuleSetKind::Standard, Player::B);
    for y in 0..3 {
      for x in 0..3 {
        if game.result.is_some() {
          break;
        }
        if game.can_human_move() {
          game.apply_move(x, y).unwrap();
        } else {
          let gen = game.generation();
          game.apply_engine_move(Coord { x, y }, gen).unwrap();
        }
      }
    }
    assert_eq!(game.result, Some(GameResult::Draw));
    assert!(game.winning_line.is_empty());
  }

  #[test]
  fn snapshot_reflects_state() {
    let mut game = GameState::new(DEFAULT_BOARD_SIZE, RuleSetKind::Standard, Player::B);
    game.apply_move(7, 7).unwrap();
    let snap = game.snapshot();
    assert_eq!(snap.board_size, DEFAULT_BOARD_SIZE);
    assert_eq!(snap.board[7 * DEFAULT_BOARD_SIZE + 7], Some(Player::B));
    assert_eq!(snap.last_move, Some(Coord { x: 7, y: 7 }));
    assert_eq!(snap.to_move, Player::W);
    assert!(!snap.can_human_move);
    assert!(snap.winning_line.is_empty());
  }
}
