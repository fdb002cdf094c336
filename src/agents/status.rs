//! Agent status classification.
//!
//! Once per poll tick, each active pane is reduced to a display status from
//! three sources, in priority order: process liveness, on-disk status files
//! written by agent hooks, and heuristics over the recent screen contents.
//! Results are memoised per session for a short window so the read path and
//! the poll path agree between ticks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::tickets::AgentStatus;

/// How long a cached classification stays fresh.
const CACHE_EXPIRY: Duration = Duration::from_millis(500);

/// How many screen rows the heuristics look at.
const TAIL_ROWS: usize = 10;

/// Spinner and progress glyphs that indicate an agent mid-task.
const WORKING_GLYPHS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏', '…'];

/// Phrase tokens that indicate an agent mid-task.
const WORKING_TOKENS: &[&str] = &[
    "Thinking",
    "Writing",
    "Reading",
    "Analyzing",
    "Processing",
    "Working",
    "Loading",
    "Searching",
    "Generating",
    "Executing",
    "Running",
    "...",
];

/// Substrings (matched case-insensitively) that indicate a confirmation
/// prompt awaiting the user.
const WAITING_TOKENS: &[&str] = &[
    "[y/n]",
    "(y/n)",
    "allow?",
    "approve?",
    "confirm?",
    "press",
    "enter to",
    "permission",
];

/// Shell-style prompt suffix on the last non-empty line.
static IDLE_PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(>>|>|\$|❯|→|%)\s*$").expect("prompt suffix regex"));

/// Product-specific idle prompts.
const IDLE_PROMPTS: &[&str] = &["claude>", "opencode>", "aider>"];

/// Greeting phrases some agents print when ready for input.
const IDLE_PHRASES: &[&str] = &["how can i help", "what would you like", "ready when you are"];

/// Parse a status-file token. Unrecognised content is a parse failure and
/// falls through to the screen heuristics.
pub fn parse_status_token(contents: &str) -> Option<AgentStatus> {
    match contents.trim() {
        "working" => Some(AgentStatus::Working),
        "done" | "idle" => Some(AgentStatus::Idle),
        "waiting" | "permission" => Some(AgentStatus::Waiting),
        "error" => Some(AgentStatus::Error),
        "completed" => Some(AgentStatus::Completed),
        _ => None,
    }
}

/// Heuristic classification from the last screen rows.
///
/// The fall-through default is Working: an unrecognised busy screen is more
/// common than an unrecognised prompt, and a wrong Working corrects itself
/// on the next poll once a known prompt appears.
pub fn classify_screen(tail: &str) -> AgentStatus {
    // "Session ended" is the one terminal-screen rule that yields Completed;
    // status files are otherwise the only source for that state.
    if tail.contains("Session ended") {
        return AgentStatus::Completed;
    }

    if tail.chars().any(|c| WORKING_GLYPHS.contains(&c))
        || WORKING_TOKENS.iter().any(|t| tail.contains(t))
    {
        return AgentStatus::Working;
    }

    let lower = tail.to_lowercase();
    if WAITING_TOKENS.iter().any(|t| lower.contains(t)) {
        return AgentStatus::Waiting;
    }

    let last_line = tail
        .lines()
        .rev()
        .map(str::trim_end)
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");
    let last_lower = last_line.to_lowercase();
    if IDLE_PROMPT_RE.is_match(last_line)
        || IDLE_PROMPTS.iter().any(|p| last_lower.ends_with(p))
        || IDLE_PHRASES.iter().any(|p| last_lower.contains(p))
    {
        return AgentStatus::Idle;
    }

    AgentStatus::Working
}

/// Full decision procedure for one pane.
pub fn classify(running: bool, file_status: Option<AgentStatus>, tail: &str) -> AgentStatus {
    if !running {
        return AgentStatus::None;
    }
    if let Some(status) = file_status {
        return status;
    }
    classify_screen(tail)
}

/// Status-file reader/writer rooted at the cache directory.
///
/// Layout is fixed: `{root}/openkanban-status/{session}.status` is ours
/// (read+write), `{root}/claude-status/{session}.status` is foreign
/// (read-only). Content is one token followed by a newline.
#[derive(Debug, Clone)]
pub struct StatusFiles {
    root: PathBuf,
}

const OWN_DIR: &str = "openkanban-status";
const FOREIGN_DIR: &str = "claude-status";

impl StatusFiles {
    /// Rooted at `~/.cache`.
    pub fn new() -> Self {
        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cache");
        Self { root }
    }

    /// Rooted at an explicit directory (tests).
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Read the first recognised token across the known status files.
    /// `agent_relpath` is an optional agent-specific file relative to the
    /// root, checked first.
    pub fn read(&self, session_id: &str, agent_relpath: Option<&str>) -> Option<AgentStatus> {
        let file_name = format!("{session_id}.status");
        let mut candidates = Vec::with_capacity(3);
        if let Some(rel) = agent_relpath {
            candidates.push(self.root.join(rel).join(&file_name));
        }
        candidates.push(self.root.join(FOREIGN_DIR).join(&file_name));
        candidates.push(self.root.join(OWN_DIR).join(&file_name));

        for path in candidates {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                if let Some(status) = parse_status_token(&contents) {
                    trace!(path = %path.display(), ?status, "Status file hit");
                    return Some(status);
                }
                // Unrecognised contents fall through silently
            }
        }
        None
    }

    /// Best-effort side-channel write so external dashboards can observe
    /// the last classification. Failures are ignored.
    pub fn write(&self, session_id: &str, status: AgentStatus) {
        let dir = self.root.join(OWN_DIR);
        if std::fs::create_dir_all(&dir).is_err() {
            return;
        }
        let path = dir.join(format!("{session_id}.status"));
        let _ = std::fs::write(&path, format!("{}\n", status.as_token()));
    }
}

impl Default for StatusFiles {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    status: AgentStatus,
    captured_at: Instant,
}

/// Memoised classifications keyed by session id. Reads take the shared
/// lock; writes and invalidation take the exclusive lock.
#[derive(Debug)]
pub struct StatusCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    expiry: Duration,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::with_expiry(CACHE_EXPIRY)
    }

    pub fn with_expiry(expiry: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            expiry,
        }
    }

    /// Fresh cached status, if any. An entry exactly at the expiry boundary
    /// counts as expired.
    pub fn get(&self, session_id: &str) -> Option<AgentStatus> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(session_id)?;
        if entry.captured_at.elapsed() >= self.expiry {
            return None;
        }
        Some(entry.status)
    }

    pub fn put(&self, session_id: &str, status: AgentStatus) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                session_id.to_string(),
                CacheEntry {
                    status,
                    captured_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate(&self, session_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(session_id);
        }
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the poll pass captures about one pane on the update thread.
#[derive(Debug, Clone)]
pub struct ClassifierInput {
    pub ticket_id: String,
    pub session_id: String,
    pub running: bool,
    pub tail: String,
    /// Agent-specific status file relative to the cache root, if configured
    pub agent_relpath: Option<String>,
}

/// Classify a batch of panes. Runs inside a poll command, off the update
/// thread; results are applied back to tickets by the update step.
pub fn classify_all(
    cache: &StatusCache,
    files: &StatusFiles,
    inputs: &[ClassifierInput],
) -> Vec<(String, AgentStatus)> {
    inputs
        .iter()
        .map(|input| {
            let status = classify_one(cache, files, input);
            (input.ticket_id.clone(), status)
        })
        .collect()
}

fn classify_one(cache: &StatusCache, files: &StatusFiles, input: &ClassifierInput) -> AgentStatus {
    // Liveness wins over everything, including a stale cache entry
    if !input.running {
        cache.put(&input.session_id, AgentStatus::None);
        return AgentStatus::None;
    }

    if let Some(cached) = cache.get(&input.session_id) {
        return cached;
    }

    let file_status = files.read(&input.session_id, input.agent_relpath.as_deref());
    let status = classify(true, file_status, &input.tail);
    debug!(session = %input.session_id, ?status, "Classified agent");

    cache.put(&input.session_id, status);
    files.write(&input.session_id, status);
    status
}

/// Take the last `TAIL_ROWS` worth of snapshot text.
pub fn snapshot_tail(snapshot: &str) -> String {
    let lines: Vec<&str> = snapshot.lines().collect();
    let start = lines.len().saturating_sub(TAIL_ROWS);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_not_running_is_none_despite_file() {
        let status = classify(false, Some(AgentStatus::Working), "Thinking...");
        assert_eq!(status, AgentStatus::None);
    }

    #[test]
    fn test_status_file_wins_over_screen() {
        // Screen says working, file says waiting
        let status = classify(true, Some(AgentStatus::Waiting), "Thinking hard...");
        assert_eq!(status, AgentStatus::Waiting);
    }

    #[test]
    fn test_working_indicator() {
        assert_eq!(classify_screen("Thinking about the task"), AgentStatus::Working);
        assert_eq!(classify_screen("⠋ compiling"), AgentStatus::Working);
        assert_eq!(classify_screen("step one\nGenerating tests"), AgentStatus::Working);
    }

    #[test]
    fn test_waiting_indicator() {
        assert_eq!(classify_screen("Overwrite file? [y/N]"), AgentStatus::Waiting);
        assert_eq!(classify_screen("ALLOW? "), AgentStatus::Waiting);
        assert_eq!(
            classify_screen("tool needs permission to run"),
            AgentStatus::Waiting
        );
    }

    #[test]
    fn test_idle_prompt_suffixes() {
        assert_eq!(classify_screen("all done\nclaude> "), AgentStatus::Idle);
        assert_eq!(classify_screen("output\n$ "), AgentStatus::Idle);
        assert_eq!(classify_screen("output\n❯ "), AgentStatus::Idle);
        assert_eq!(classify_screen("How can I help you today?"), AgentStatus::Idle);
    }

    #[test]
    fn test_last_nonempty_line_is_used() {
        // Prompt followed by blank padding rows still reads as idle
        assert_eq!(classify_screen("done\nclaude> \n\n  "), AgentStatus::Idle);
    }

    #[test]
    fn test_unrecognised_screen_defaults_to_working() {
        assert_eq!(classify_screen("some ordinary output"), AgentStatus::Working);
    }

    #[test]
    fn test_session_ended_is_completed() {
        assert_eq!(classify_screen("Session ended."), AgentStatus::Completed);
    }

    #[test]
    fn test_parse_status_tokens() {
        assert_eq!(parse_status_token("working\n"), Some(AgentStatus::Working));
        assert_eq!(parse_status_token("done"), Some(AgentStatus::Idle));
        assert_eq!(parse_status_token("idle"), Some(AgentStatus::Idle));
        assert_eq!(parse_status_token("waiting"), Some(AgentStatus::Waiting));
        assert_eq!(parse_status_token("permission"), Some(AgentStatus::Waiting));
        assert_eq!(parse_status_token("error"), Some(AgentStatus::Error));
        assert_eq!(parse_status_token("completed"), Some(AgentStatus::Completed));
        assert_eq!(parse_status_token("garbage"), None);
    }

    #[test]
    fn test_status_files_read_priority() {
        let temp = TempDir::new().unwrap();
        let files = StatusFiles::with_root(temp.path().to_path_buf());

        // Foreign file present
        let foreign = temp.path().join(FOREIGN_DIR);
        std::fs::create_dir_all(&foreign).unwrap();
        std::fs::write(foreign.join("s1.status"), "waiting\n").unwrap();

        // Own file also present with a different token
        let own = temp.path().join(OWN_DIR);
        std::fs::create_dir_all(&own).unwrap();
        std::fs::write(own.join("s1.status"), "working\n").unwrap();

        // First recognised token wins (foreign is checked first)
        assert_eq!(files.read("s1", None), Some(AgentStatus::Waiting));
    }

    #[test]
    fn test_status_files_parse_failure_falls_through() {
        let temp = TempDir::new().unwrap();
        let files = StatusFiles::with_root(temp.path().to_path_buf());

        let foreign = temp.path().join(FOREIGN_DIR);
        std::fs::create_dir_all(&foreign).unwrap();
        std::fs::write(foreign.join("s1.status"), "???\n").unwrap();

        let own = temp.path().join(OWN_DIR);
        std::fs::create_dir_all(&own).unwrap();
        std::fs::write(own.join("s1.status"), "error\n").unwrap();

        assert_eq!(files.read("s1", None), Some(AgentStatus::Error));
    }

    #[test]
    fn test_status_files_write_roundtrip() {
        let temp = TempDir::new().unwrap();
        let files = StatusFiles::with_root(temp.path().to_path_buf());

        files.write("s2", AgentStatus::Waiting);
        let contents = std::fs::read_to_string(
            temp.path().join(OWN_DIR).join("s2.status"),
        )
        .unwrap();
        assert_eq!(contents, "waiting\n");
    }

    #[test]
    fn test_cache_hit_within_expiry() {
        let cache = StatusCache::with_expiry(Duration::from_secs(60));
        cache.put("s1", AgentStatus::Working);
        assert_eq!(cache.get("s1"), Some(AgentStatus::Working));
    }

    #[test]
    fn test_cache_entry_at_expiry_is_expired() {
        let cache = StatusCache::with_expiry(Duration::ZERO);
        cache.put("s1", AgentStatus::Working);
        // elapsed >= 0 always holds, so the entry is immediately expired
        assert_eq!(cache.get("s1"), None);
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = StatusCache::with_expiry(Duration::from_secs(60));
        cache.put("s1", AgentStatus::Idle);
        cache.put("s2", AgentStatus::Working);

        cache.invalidate("s1");
        assert_eq!(cache.get("s1"), None);
        assert_eq!(cache.get("s2"), Some(AgentStatus::Working));

        cache.invalidate_all();
        assert_eq!(cache.get("s2"), None);
    }

    #[test]
    fn test_classify_all_uses_cache() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::with_expiry(Duration::from_secs(60));
        let files = StatusFiles::with_root(temp.path().to_path_buf());

        let input = ClassifierInput {
            ticket_id: "t1".to_string(),
            session_id: "s1".to_string(),
            running: true,
            tail: "Thinking...".to_string(),
            agent_relpath: None,
        };

        let first = classify_all(&cache, &files, std::slice::from_ref(&input));
        assert_eq!(first, vec![("t1".to_string(), AgentStatus::Working)]);

        // Second call within the window returns the memoised value even if
        // the screen has changed
        let changed = ClassifierInput {
            tail: "claude> ".to_string(),
            ..input
        };
        let second = classify_all(&cache, &files, &[changed]);
        assert_eq!(second, vec![("t1".to_string(), AgentStatus::Working)]);
    }

    #[test]
    fn test_classify_all_dead_pane_overrides_cache() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::with_expiry(Duration::from_secs(60));
        let files = StatusFiles::with_root(temp.path().to_path_buf());
        cache.put("s1", AgentStatus::Working);

        let input = ClassifierInput {
            ticket_id: "t1".to_string(),
            session_id: "s1".to_string(),
            running: false,
            tail: String::new(),
            agent_relpath: None,
        };
        let result = classify_all(&cache, &files, &[input]);
        assert_eq!(result, vec![("t1".to_string(), AgentStatus::None)]);
    }

    #[test]
    fn test_snapshot_tail_limits_rows() {
        let snapshot: String = (0..20).map(|i| format!("row{i}\n")).collect();
        let tail = snapshot_tail(&snapshot);
        assert!(!tail.contains("row9\n"));
        assert!(tail.contains("row10"));
        assert!(tail.contains("row19"));
    }
}
