use crate::engine::Board;
use crate::types::{Coord, GameResult, Move, Player, RuleSetKind, WinningLine};

pub const WIN_LENGTH: usize = 5;

const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

pub trait RuleSet {
  fn is_legal(&self, board: &Board, mv: &Move) -> bool;
  fn check_win(&self, board: &Board, mv: &Move) -> Option<WinningLine>;
}

pub struct StandardRuleSet;

impl RuleSet for StandardRuleSet {
  fn is_legal(&self, board: &Board, mv: &Move) -> bool {
    board.in_bounds(mv.x, mv.y) && board.is_empty(mv.x, mv.y)
  }

  /// Anchored at the just-played move: walk each axis in both senses and
  /// collect contiguous own stones. First axis reaching `WIN_LENGTH` wins;
  /// the full contiguous run is returned for highlighting.
  fn check_win(&self, board: &Board, mv: &Move) -> Option<WinningLine> {
    let player = mv.player;

    for (dx, dy) in DIRECTIONS {
      let mut line = vec![Coord { x: mv.x, y: mv.y }];
      collect_dir(board, mv.x, mv.y, dx, dy, player, &mut line);
      collect_dir(board, mv.x, mv.y, -dx, -dy, player, &mut line);

      if line.len() >= WIN_LENGTH {
        line.sort_by_key(|c| (c.y, c.x));
        return Some(WinningLine {
          result: match player {
            Player::B => GameResult::BWin,
            Player::W => GameResult::WWin,
          },
          line,
        });
      }
    }

    None
  }
}

pub fn rules_for(kind: RuleSetKind) -> Box<dyn RuleSet> {
  match kind {
    RuleSetKind::Standard => Box::new(StandardRuleSet),
  }
}

fn collect_dir(
  board: &Board,
  x: usize,
  y: usize,
  dx: i32,
  dy: i32,
  player: Player,
  line: &mut Vec<Coord>,
) {
  let mut cx = x as i32 + dx;
  let mut cy = y as i32 + dy;

  while cx >= 0 && cy >= 0 {
    let ux = cx as usize;
    let uy = cy as usize;
    if !board.in_bounds(ux, uy) {
      break;
    }
    if board.get(ux, uy) != Some(player) {
      break;
    }
    line.push(Coord { x: ux, y: uy });
    cx += dx;
    cy += dy;
  }
}
