//! Child process environment sanitization.
//!
//! Spawned agents inspect their environment to detect being nested inside
//! another session of themselves; stripping the vendor variables keeps a
//! pane-hosted agent from refusing to start.

/// Variable-name prefixes stripped from the child environment.
const VENDOR_PREFIXES: &[&str] = &["OPENCODE", "CLAUDE", "GEMINI", "CODEX"];

/// Build the environment for a spawned agent: the parent environment minus
/// vendor-prefixed variables, with TERM pinned to a capable terminfo entry.
pub fn sanitized_env() -> Vec<(String, String)> {
    sanitize(std::env::vars())
}

fn sanitize(vars: impl Iterator<Item = (String, String)>) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = vars
        .filter(|(name, _)| {
            name != "TERM" && !VENDOR_PREFIXES.iter().any(|p| name.starts_with(p))
        })
        .collect();
    env.push(("TERM".to_string(), "xterm-256color".to_string()));
    env
}
