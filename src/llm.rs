use std::collections::HashSet;
use std::time::Duration;

use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::ai;
use crate::engine::Board;
use crate::types::{Coord, LlmConfig, Player};

const COLS: &str = "ABCDEFGHIJKLMNO";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct ChatMessage {
  role: String,
  content: String,
}

#[derive(Serialize)]
struct ChatRequest {
  model: String,
  messages: Vec<ChatMessage>,
  temperature: f64,
  top_p: f64,
  max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
  content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ErrorDetail {
  message: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
  error: ErrorDetail,
}

lazy_static::lazy_static! {
  static ref HTTP_CLIENT: Client = Client::builder()
    .timeout(Duration::from_secs(60))
    .build()
    .expect("Failed to create HTTP client");
}

/// Ask the remote model for a move. `Ok(None)` is an explicit pass; the
/// caller substitutes its own fallback. Only moves from the offered
/// candidate list are accepted, so the board can never receive an illegal
/// coordinate from the network.
pub fn choose_move(
  board: &Board,
  player: Player,
  config: &LlmConfig,
  api_key: &str,
  last_move: Option<Coord>,
) -> Result<Option<Coord>, String> {
  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .map_err(|e| format!("Failed to create async runtime: {e}"))?;

  rt.block_on(choose_move_async(board, player, config, api_key, last_move))
}

pub async fn choose_move_async(
  board: &Board,
  player: Player,
  config: &LlmConfig,
  api_key: &str,
  last_move: Option<Coord>,
) -> Result<Option<Coord>, String> {
  if api_key.trim().is_empty() {
    return Err("Missing API key for remote move source".to_string());
  }

  let candidates = ai::ranked_candidates(board, player, config.candidate_limit);
  if candidates.is_empty() {
    return Err("No valid moves".to_string());
  }

  let labels: Vec<String> = candidates.iter().map(|&c| coord_to_label(c)).collect();
  let allowed: HashSet<String> = labels.iter().cloned().collect();
  let (system, user) = build_prompt(board, player, last_move, &labels);

  let mut last_error = String::new();

  for attempt in 1..=MAX_ATTEMPTS {
    match attempt_move(config, api_key, &system, &user, &allowed).await {
      Ok(choice) => return Ok(choice),
      Err(e) => {
        warn!("remote move source attempt {attempt} failed: {e}");
        last_error = e;
        if attempt < MAX_ATTEMPTS {
          tokio::time::sleep(RETRY_DELAY).await;
        }
      }
    }
  }

  Err(format!(
    "Remote move source failed after {MAX_ATTEMPTS} attempts: {last_error}"
  ))
}

async fn attempt_move(
  config: &LlmConfig,
  api_key: &str,
  system: &str,
  user: &str,
  allowed: &HashSet<String>,
) -> Result<Option<Coord>, String> {
  let content = call_chat_api(config, api_key, system, user).await?;
  let coord = match parse_response(&content)? {
    Some(coord) => coord,
    None => return Ok(None),
  };
  let label = coord_to_label(coord);
  if !allowed.contains(&label) {
    return Err(format!("Model returned move {label} outside candidate list"));
  }
  Ok(Some(coord))
}

async fn call_chat_api(
  config: &LlmConfig,
  api_key: &str,
  system: &str,
  user: &str,
) -> Result<String, String> {
  let url = endpoint_url(&config.base_url);

  let request_body = ChatRequest {
    model: config.model.clone(),
    messages: vec![
      ChatMessage {
        role: "system".to_string(),
        content: system.to_string(),
      },
      ChatMessage {
        role: "user".to_string(),
        content: user.to_string(),
      },
    ],
    temperature: config.temperature as f64,
    top_p: config.top_p as f64,
    max_tokens: config.max_tokens,
  };

  let response = timeout(
    Duration::from_millis(config.timeout_ms),
    HTTP_CLIENT
      .post(&url)
      .header("Authorization", format!("Bearer {api_key}"))
      .header("Content-Type", "application/json")
      .json(&request_body)
      .send(),
  )
  .await
  .map_err(|_| "Request timed out".to_string())?
  .map_err(|e| format!("Request failed: {e}"))?;

  let status = response.status();
  let body = response
    .text()
    .await
    .map_err(|e| format!("Failed to read response: {e}"))?;

  if !status.is_success() {
    if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
      return Err(format!("API error ({status}): {}", error_resp.error.message));
    }
    return Err(format!("API error ({status}): {}", truncate_for_error(&body)));
  }

  let chat_response: ChatResponse =
    serde_json::from_str(&body).map_err(|e| format!("Failed to parse response: {e}"))?;

  chat_response
    .choices
    .first()
    .map(|c| c.message.content.clone())
    .ok_or_else(|| "Empty response from model".to_string())
}

fn endpoint_url(base_url: &str) -> String {
  let trimmed = base_url.trim();
  if trimmed.is_empty() {
    return DEFAULT_BASE_URL.to_string();
  }
  let url = trimmed.trim_end_matches('/');
  if url.ends_with("/chat/completions") {
    url.to_string()
  } else if url.ends_with("/v1") {
    format!("{url}/chat/completions")
  } else {
    format!("{url}/v1/chat/completions")
  }
}

fn build_prompt(
  board: &Board,
  player: Player,
  last_move: Option<Coord>,
  candidates: &[String],
) -> (String, String) {
  let size = board.size();
  let system = format!(
    "You are a Gomoku player. Board size {size}x{size}.\n\
Use coordinates A\u{2013}O (columns) and 1\u{2013}{size} (rows).\n\
You must choose a move from the provided candidates list.\n\
Priority: (1) if you can win immediately, choose that move; (2) if the opponent can win immediately, block it; (3) otherwise choose the strongest candidate.\n\
Respond only with JSON: {{\"move\":\"H8\"}} where move is in candidates.\n\
If no move possible, respond {{\"move\":\"pass\"}}."
  );

  let to_move = match player {
    Player::B => "Black",
    Player::W => "White",
  };
  let (black_stones, white_stones) = list_stones(board);
  let last = last_move
    .map(coord_to_label)
    .unwrap_or_else(|| "none (opening)".to_string());
  let board_str = render_board(board);
  let user = format!(
    "To move: {to_move}\nBlack stones: {black_stones}\nWhite stones: {white_stones}\nLast move: {last}\nCandidates: {candidates}\nBoard (row {size} at top):\n{board_str}",
    candidates = candidates.join(", ")
  );
  (system, user)
}

fn render_board(board: &Board) -> String {
  let size = board.size();
  let mut out = String::new();
  out.push_str("   ");
  for c in COLS.chars().take(size) {
    out.push(c);
    out.push(' ');
  }
  out.push('\n');

  for row in (0..size).rev() {
    out.push_str(&format!("{:>2} ", row + 1));
    for col in 0..size {
      let ch = match board.get(col, row) {
        None => '.',
        Some(Player::B) => 'B',
        Some(Player::W) => 'W',
      };
      out.push(ch);
      out.push(' ');
    }
    out.push('\n');
  }
  out
}

fn list_stones(board: &Board) -> (String, String) {
  let size = board.size();
  let mut black = Vec::new();
  let mut white = Vec::new();
  for y in 0..size {
    for x in 0..size {
      match board.get(x, y) {
        Some(Player::B) => black.push(coord_to_label(Coord { x, y })),
        Some(Player::W) => white.push(coord_to_label(Coord { x, y })),
        None => {}
      }
    }
  }
  let join = |stones: Vec<String>| {
    if stones.is_empty() {
      "none".to_string()
    } else {
      stones.join(", ")
    }
  };
  (join(black), join(white))
}

fn coord_to_label(coord: Coord) -> String {
  let col = COLS.chars().nth(coord.x).unwrap_or('A');
  format!("{}{}", col, coord.y + 1)
}

fn parse_label(label: &str) -> Option<Coord> {
  if label.len() < 2 {
    return None;
  }
  let mut chars = label.chars();
  let col = chars.next()?.to_ascii_uppercase();
  let col_idx = COLS.find(col)?;
  let row_str: String = chars.collect();
  let row: usize = row_str.parse().ok()?;
  if row == 0 {
    return None;
  }
  Some(Coord {
    x: col_idx,
    y: row - 1,
  })
}

/// Parse the model's reply. `Ok(None)` is an explicit pass. Tries strict
/// JSON first, then JSON embedded in text or a code fence, then a bare
/// coordinate label.
fn parse_response(raw: &str) -> Result<Option<Coord>, String> {
  if let Some(value) = read_json(raw).or_else(|| read_embedded_json(raw)) {
    return extract_move(&value)
      .ok_or_else(|| format!("Unusable move in response: {}", truncate_for_error(raw)));
  }
  if let Some(coord) = read_bare_label(raw) {
    return Ok(Some(coord));
  }
  Err(format!(
    "Failed to parse model response: {}",
    truncate_for_error(raw)
  ))
}

fn read_json(raw: &str) -> Option<serde_json::Value> {
  serde_json::from_str(raw).ok()
}

fn read_embedded_json(raw: &str) -> Option<serde_json::Value> {
  let trimmed = raw.trim();
  let unfenced = trimmed
    .strip_prefix("```json")
    .or_else(|| trimmed.strip_prefix("```"))
    .and_then(|s| s.strip_suffix("```"))
    .map(str::trim);
  if let Some(inner) = unfenced {
    if let Some(value) = read_json(inner) {
      return Some(value);
    }
  }

  let start = raw.find('{')?;
  let end = raw.rfind('}')?;
  if end <= start {
    return None;
  }
  read_json(&raw[start..=end])
}

fn read_bare_label(raw: &str) -> Option<Coord> {
  let upper = raw.to_uppercase();
  for word in upper.split(|c: char| !c.is_alphanumeric()) {
    if (2..=3).contains(&word.len()) && word.starts_with(|c: char| ('A'..='O').contains(&c)) {
      if let Some(coord) = parse_label(word) {
        if coord.y < 15 {
          return Some(coord);
        }
      }
    }
  }
  None
}

/// `None` means pass.
fn extract_move(value: &serde_json::Value) -> Option<Option<Coord>> {
  let move_str = value.get("move").and_then(|v| v.as_str())?;
  if move_str.eq_ignore_ascii_case("pass") {
    return Some(None);
  }
  parse_label(move_str).map(Some)
}

fn truncate_for_error(s: &str) -> String {
  if s.len() > 100 {
    format!("{}...", &s[..100])
  } else {
    s.to_string()
  }
}
