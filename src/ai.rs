use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::seq::SliceRandom;

use crate::engine::Board;
use crate::rules::{rules_for, WIN_LENGTH};
use crate::types::{Coord, Move, Player, RuleSetKind, SearchConfig};

const SCORE_FIVE: i32 = 200_000;
const SCORE_OPEN_FOUR: i32 = 50_000;
const SCORE_SEMI_FOUR: i32 = 10_000;
const SCORE_OPEN_THREE: i32 = 3_000;
const SCORE_SEMI_THREE: i32 = 400;
const SCORE_OPEN_TWO: i32 = 300;
const SCORE_SEMI_TWO: i32 = 80;

// Positions past this margin are already decided; the search stops
// deepening and prefers the faster win / slower loss.
const DECIDED_MARGIN: i32 = SCORE_FIVE / 2;
const DEPTH_REWARD: i32 = 100;

const CANDIDATE_RADIUS: i32 = 2;

/// Pick a move for `player`. Total for any board with at least one empty
/// cell near a stone; returns `None` only when no candidate exists.
///
/// The board is cloned once at entry; the caller's board is never touched.
pub fn choose_move(
  board: &Board,
  player: Player,
  config: SearchConfig,
  last_move: Option<Coord>,
) -> Option<Coord> {
  if board.is_blank() {
    return Some(board.center());
  }

  let mut work = board.clone();
  let candidates = candidate_moves(&work, last_move);
  if candidates.is_empty() {
    return None;
  }

  // Wide frontier: trade depth for breadth under the same budget.
  let depth = if candidates.len() > config.breadth_cutoff {
    config.shallow_depth
  } else {
    config.deep_depth
  };
  let start = Instant::now();
  let deadline = start + Duration::from_millis(config.budget_ms);

  let mut nodes: u64 = 0;
  let mut alpha = i32::MIN;
  let beta = i32::MAX;
  let mut best: Option<(i32, Coord)> = None;

  for &coord in &candidates {
    work.set(coord.x, coord.y, player);
    let score = minimax(
      &mut work,
      player.other(),
      player,
      depth.saturating_sub(1),
      alpha,
      beta,
      coord,
      deadline,
      &mut nodes,
    );
    work.clear(coord.x, coord.y);

    if best.map_or(true, |(s, _)| score > s) {
      best = Some((score, coord));
    }
    alpha = alpha.max(score);
  }

  match best {
    Some((score, coord)) => {
      debug!(
        "search: depth {} over {} candidates, {} nodes in {:?}, chose ({}, {}) score {}",
        depth,
        candidates.len(),
        nodes,
        start.elapsed(),
        coord.x,
        coord.y,
        score
      );
      Some(coord)
    }
    None => {
      warn!("search scored no candidate, picking at random");
      let mut rng = rand::thread_rng();
      candidates.choose(&mut rng).copied()
    }
  }
}

/// One-ply tactical scan: play an immediate five if one exists, otherwise
/// block the opponent's immediate five. Used ahead of slower move sources.
pub fn tactical_move(board: &Board, rule_set: RuleSetKind, player: Player) -> Option<Coord> {
  let rules = rules_for(rule_set);
  let mut work = board.clone();
  let candidates = candidate_moves(&work, None);

  for side in [player, player.other()] {
    for &coord in &candidates {
      work.set(coord.x, coord.y, side);
      let mv = Move {
        x: coord.x,
        y: coord.y,
        player: side,
      };
      let wins = rules.check_win(&work, &mv).is_some();
      work.clear(coord.x, coord.y);
      if wins {
        return Some(coord);
      }
    }
  }

  None
}

/// Uniform random empty cell, the last-resort fallback when a move source
/// reports no move.
pub fn random_legal_move(board: &Board) -> Option<Coord> {
  let mut rng = rand::thread_rng();
  board.empty_coords().choose(&mut rng).copied()
}

/// Empty cells within Chebyshev distance 2 of any stone, ordered by
/// Manhattan distance to the most recent move. The `(y, x)` tie-break keeps
/// the ordering independent of hash-set iteration order.
pub fn candidate_moves(board: &Board, last_move: Option<Coord>) -> Vec<Coord> {
  let size = board.size();

  if board.is_blank() {
    return vec![board.center()];
  }

  let mut seen: HashSet<(usize, usize)> = HashSet::new();
  for y in 0..size {
    for x in 0..size {
      if board.get(x, y).is_none() {
        continue;
      }
      for dy in -CANDIDATE_RADIUS..=CANDIDATE_RADIUS {
        for dx in -CANDIDATE_RADIUS..=CANDIDATE_RADIUS {
          let nx = x as i32 + dx;
          let ny = y as i32 + dy;
          if nx < 0 || ny < 0 {
            continue;
          }
          let (ux, uy) = (nx as usize, ny as usize);
          if board.in_bounds(ux, uy) && board.get(ux, uy).is_none() {
            seen.insert((ux, uy));
          }
        }
      }
    }
  }

  let anchor = last_move.unwrap_or_else(|| board.center());
  let mut candidates: Vec<Coord> = seen.iter().map(|&(x, y)| Coord { x, y }).collect();
  candidates.sort_by_key(|c| (manhattan(*c, anchor), c.y, c.x));
  candidates
}

/// Candidates ranked by one-ply static evaluation for `player`, strongest
/// first, truncated to `limit`. Feeds the remote move source's prompt.
pub fn ranked_candidates(board: &Board, player: Player, limit: usize) -> Vec<Coord> {
  let mut work = board.clone();
  let candidates = candidate_moves(&work, None);

  let mut scored: Vec<(i32, Coord)> = Vec::with_capacity(candidates.len());
  for coord in candidates {
    work.set(coord.x, coord.y, player);
    let score = evaluate(&work, player);
    work.clear(coord.x, coord.y);
    scored.push((score, coord));
  }

  scored.sort_by_key(|&(score, c)| (std::cmp::Reverse(score), c.y, c.x));
  scored.truncate(limit);
  scored.into_iter().map(|(_, coord)| coord).collect()
}

fn manhattan(a: Coord, b: Coord) -> usize {
  a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

#[allow(clippy::too_many_arguments)]
fn minimax(
  board: &mut Board,
  to_move: Player,
  searcher: Player,
  depth: u8,
  mut alpha: i32,
  mut beta: i32,
  last: Coord,
  deadline: Instant,
  nodes: &mut u64,
) -> i32 {
  *nodes += 1;

  let net = evaluate(board, searcher);
  // Decided positions return immediately, damped so a shallower win (more
  // depth remaining) outranks a deeper one and a shallower loss ranks
  // below a deeper one.
  if net > DECIDED_MARGIN {
    return net + DEPTH_REWARD * depth as i32;
  }
  if net < -DECIDED_MARGIN {
    return net - DEPTH_REWARD * depth as i32;
  }

  if depth == 0 || Instant::now() >= deadline {
    return net;
  }

  let candidates = candidate_moves(board, Some(last));
  if candidates.is_empty() {
    return net;
  }

  if to_move == searcher {
    let mut best = i32::MIN;
    for coord in candidates {
      board.set(coord.x, coord.y, to_move);
      let score = minimax(
        board,
        to_move.other(),
        searcher,
        depth - 1,
        alpha,
        beta,
        coord,
        deadline,
        nodes,
      );
      board.clear(coord.x, coord.y);
      best = best.max(score);
      alpha = alpha.max(score);
      if beta <= alpha {
        break;
      }
    }
    best
  } else {
    let mut best = i32::MAX;
    for coord in candidates {
      board.set(coord.x, coord.y, to_move);
      let score = minimax(
        board,
        to_move.other(),
        searcher,
        depth - 1,
        alpha,
        beta,
        coord,
        deadline,
        nodes,
      );
      board.clear(coord.x, coord.y);
      best = best.min(score);
      beta = beta.min(score);
      if beta <= alpha {
        break;
      }
    }
    best
  }
}

/// Net static score for `player`: own pattern sum minus the opponent's.
pub fn evaluate(board: &Board, player: Player) -> i32 {
  score_for_player(board, player) - score_for_player(board, player.other())
}

fn score_for_player(board: &Board, player: Player) -> i32 {
  let size = board.size();
  let mut total = 0;

  for y in 0..size {
    total += score_line(board, player, 0, y, 1, 0, size);
  }
  for x in 0..size {
    total += score_line(board, player, x, 0, 0, 1, size);
  }

  // Diagonals shorter than a five cannot score.
  for start_x in 0..size {
    let len = size - start_x;
    if len >= WIN_LENGTH {
      total += score_line(board, player, start_x, 0, 1, 1, len);
    }
  }
  for start_y in 1..size {
    let len = size - start_y;
    if len >= WIN_LENGTH {
      total += score_line(board, player, 0, start_y, 1, 1, len);
    }
  }
  for start_x in 0..size {
    let len = start_x + 1;
    if len >= WIN_LENGTH {
      total += score_line(board, player, start_x, 0, -1, 1, len);
    }
  }
  for start_y in 1..size {
    let len = size - start_y;
    if len >= WIN_LENGTH {
      total += score_line(board, player, size - 1, start_y, -1, 1, len);
    }
  }

  total
}

/// Walk one full line and score each maximal same-player run by length and
/// open ends. A board edge counts as a blocked end.
fn score_line(
  board: &Board,
  player: Player,
  start_x: usize,
  start_y: usize,
  dx: i32,
  dy: i32,
  len: usize,
) -> i32 {
  let mut total = 0;
  let mut run = 0usize;
  let mut left_open = false;

  let mut x = start_x as i32;
  let mut y = start_y as i32;

  for _ in 0..len {
    let cell = board.get(x as usize, y as usize);
    if cell == Some(player) {
      run += 1;
    } else {
      if run > 0 {
        let open_ends = left_open as usize + cell.is_none() as usize;
        total += run_score(run, open_ends);
      }
      run = 0;
      left_open = cell.is_none();
    }
    x += dx;
    y += dy;
  }

  if run > 0 {
    // Run touches the line's far edge: that side is blocked.
    total += run_score(run, left_open as usize);
  }

  total
}

fn run_score(len: usize, open_ends: usize) -> i32 {
  match (len, open_ends) {
    (5.., _) => SCORE_FIVE,
    (4, 2) => SCORE_OPEN_FOUR,
    (4, 1) => SCORE_SEMI_FOUR,
    (3, 2) => SCORE_OPEN_THREE,
    (3, 1) => SCORE_SEMI_THREE,
    (2, 2) => SCORE_OPEN_TWO,
    (2, 1) => SCORE_SEMI_TWO,
    _ => 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::DEFAULT_BOARD_SIZE;

  fn board_with(stones: &[(usize, usize, Player)]) -> Board {
    let mut board = Board::new(DEFAULT_BOARD_SIZE);
    for &(x, y, player) in stones {
      board.place(x, y, player).unwrap();
    }
    board
  }

  // Depth 2 bounds the work; the generous budget just keeps the deadline
  // cutoff from firing on a slow machine and skewing scenario results.
  fn fast_config() -> SearchConfig {
    SearchConfig {
      budget_ms: 30_000,
      deep_depth: 2,
      shallow_depth: 2,
      breadth_cutoff: 20,
    }
  }

  #[test]
  fn opening_move_is_center() {
    let board = Board::new(DEFAULT_BOARD_SIZE);
    let coord = choose_move(&board, Player::B, SearchConfig::default(), None).unwrap();
    assert_eq!(coord, Coord { x: 7, y: 7 });
  }

  #[test]
  fn candidates_stay_near_stones_and_are_empty_cells() {
    let board = board_with(&[(7, 7, Player::B), (8, 8, Player::W)]);
    let candidates = candidate_moves(&board, Some(Coord { x: 8, y: 8 }));
    assert!(!candidates.is_empty());
    for c in &candidates {
      assert!(board.get(c.x, c.y).is_none());
      let near = (5..=10).contains(&c.x) && (5..=10).contains(&c.y);
      assert!(near, "candidate {:?} outside radius 2 frontier", c);
    }
  }

  #[test]
  fn candidates_sorted_by_distance_to_last_move() {
    let board = board_with(&[(3, 3, Player::B), (11, 11, Player::W)]);
    let last = Coord { x: 11, y: 11 };
    let candidates = candidate_moves(&board, Some(last));
    let dists: Vec<usize> = candidates.iter().map(|c| manhattan(*c, last)).collect();
    let mut sorted = dists.clone();
    sorted.sort();
    assert_eq!(dists, sorted);
  }

  #[test]
  fn candidate_ordering_is_deterministic() {
    let board = board_with(&[(7, 7, Player::B), (6, 8, Player::W), (9, 9, Player::B)]);
    let first = candidate_moves(&board, Some(Coord { x: 9, y: 9 }));
    for _ in 0..10 {
      assert_eq!(candidate_moves(&board, Some(Coord { x: 9, y: 9 })), first);
    }
  }

  #[test]
  fn run_score_ordering_matches_tactics() {
    assert!(run_score(5, 0) > run_score(4, 2));
    assert!(run_score(4, 2) > run_score(4, 1));
    assert!(run_score(4, 2) > run_score(3, 2));
    assert!(run_score(3, 2) > run_score(3, 1));
    assert!(run_score(3, 1) > run_score(2, 2));
    assert!(run_score(2, 2) > run_score(2, 1));
    assert!(run_score(2, 1) > 0);
    assert_eq!(run_score(4, 0), 0);
    assert_eq!(run_score(3, 0), 0);
    assert_eq!(run_score(1, 2), 0);
  }

  #[test]
  fn blocked_runs_score_less_than_open_runs() {
    // Open three in the middle of an empty row.
    let open = board_with(&[(6, 7, Player::B), (7, 7, Player::B), (8, 7, Player::B)]);
    // Same three with one end taken by White.
    let blocked = board_with(&[
      (6, 7, Player::B),
      (7, 7, Player::B),
      (8, 7, Player::B),
      (9, 7, Player::W),
    ]);
    assert!(evaluate(&open, Player::B) > evaluate(&blocked, Player::B));
  }

  #[test]
  fn edge_run_counts_as_blocked() {
    // Three starting at the left edge: one open end only.
    let edge = board_with(&[(0, 7, Player::B), (1, 7, Player::B), (2, 7, Player::B)]);
    let mid = board_with(&[(6, 7, Player::B), (7, 7, Player::B), (8, 7, Player::B)]);
    assert!(evaluate(&mid, Player::B) > evaluate(&edge, Player::B));
  }

  #[test]
  fn search_completes_an_open_four() {
    // Four in a row with both ends open; either end wins at depth 1+.
    let board = board_with(&[
      (5, 7, Player::B),
      (6, 7, Player::B),
      (7, 7, Player::B),
      (8, 7, Player::B),
      (5, 8, Player::W),
      (6, 8, Player::W),
      (7, 8, Player::W),
    ]);
    let coord = choose_move(&board, Player::B, fast_config(), Some(Coord { x: 7, y: 8 })).unwrap();
    assert!(
      coord == Coord { x: 4, y: 7 } || coord == Coord { x: 9, y: 7 },
      "expected a completing move, got {:?}",
      coord
    );
  }

  #[test]
  fn search_blocks_an_open_three() {
    // Black threatens an open four; White must take one of the two ends.
    let board = board_with(&[
      (5, 5, Player::B),
      (6, 5, Player::B),
      (7, 5, Player::B),
      (5, 6, Player::W),
      (6, 6, Player::W),
    ]);
    let coord = choose_move(&board, Player::W, fast_config(), Some(Coord { x: 7, y: 5 })).unwrap();
    assert!(
      coord == Coord { x: 4, y: 5 } || coord == Coord { x: 8, y: 5 },
      "expected a blocking move, got {:?}",
      coord
    );
  }

  #[test]
  fn search_result_is_a_legal_cell() {
    let board = board_with(&[(7, 7, Player::B), (8, 8, Player::W), (6, 6, Player::B)]);
    let coord = choose_move(&board, Player::W, fast_config(), Some(Coord { x: 6, y: 6 })).unwrap();
    assert!(board.get(coord.x, coord.y).is_none());
  }

  #[test]
  fn search_is_deterministic_at_fixed_depth() {
    let board = board_with(&[
      (7, 7, Player::B),
      (8, 8, Player::W),
      (6, 6, Player::B),
      (9, 7, Player::W),
    ]);
    // Budget far above what depth 2 needs, so the deadline cutoff cannot
    // introduce timing-dependent results.
    let config = SearchConfig {
      budget_ms: 60_000,
      ..fast_config()
    };
    let last = Some(Coord { x: 9, y: 7 });
    let first = choose_move(&board, Player::B, config, last);
    for _ in 0..5 {
      assert_eq!(choose_move(&board, Player::B, config, last), first);
    }
  }

  #[test]
  fn search_leaves_caller_board_untouched() {
    let board = board_with(&[(7, 7, Player::B), (8, 8, Player::W)]);
    let before = board.clone();
    let _ = choose_move(&board, Player::B, fast_config(), Some(Coord { x: 8, y: 8 }));
    assert_eq!(board, before);
  }

  #[test]
  fn tiny_budget_still_yields_a_legal_move() {
    let board = board_with(&[(7, 7, Player::B), (8, 8, Player::W)]);
    let config = SearchConfig {
      budget_ms: 0,
      ..SearchConfig::default()
    };
    let start = Instant::now();
    let coord = choose_move(&board, Player::B, config, Some(Coord { x: 8, y: 8 })).unwrap();
    assert!(board.get(coord.x, coord.y).is_none());
    assert!(start.elapsed() < Duration::from_millis(500), "overran the exhausted budget");
  }

  #[test]
  fn tactical_move_takes_the_win_before_blocking() {
    // Both sides have four in a row; the winning move outranks the block.
    let board = board_with(&[
      (2, 2, Player::B),
      (3, 2, Player::B),
      (4, 2, Player::B),
      (5, 2, Player::B),
      (2, 4, Player::W),
      (3, 4, Player::W),
      (4, 4, Player::W),
      (5, 4, Player::W),
    ]);
    let coord = tactical_move(&board, RuleSetKind::Standard, Player::B).unwrap();
    assert!(coord == Coord { x: 1, y: 2 } || coord == Coord { x: 6, y: 2 });
  }

  #[test]
  fn tactical_move_blocks_when_it_cannot_win() {
    let board = board_with(&[
      (2, 4, Player::W),
      (3, 4, Player::W),
      (4, 4, Player::W),
      (5, 4, Player::W),
      (9, 9, Player::B),
    ]);
    let coord = tactical_move(&board, RuleSetKind::Standard, Player::B).unwrap();
    assert!(coord == Coord { x: 1, y: 4 } || coord == Coord { x: 6, y: 4 });
  }

  #[test]
  fn ranked_candidates_respect_limit_and_legality() {
    let board = board_with(&[(7, 7, Player::B), (8, 7, Player::W)]);
    let ranked = ranked_candidates(&board, Player::B, 5);
    assert!(ranked.len() <= 5);
    for c in &ranked {
      assert!(board.get(c.x, c.y).is_none());
    }
  }

  #[test]
  fn random_fallback_returns_empty_cell() {
    let board = board_with(&[(0, 0, Player::B)]);
    let coord = random_legal_move(&board).unwrap();
    assert!(board.get(coord.x, coord.y).is_none());
  }
}
