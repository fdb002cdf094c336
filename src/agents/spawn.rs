//! Agent command-line assembly.

use crate::config::AgentConfig;

/// Build the (command, args) pair for spawning an agent in a pane.
///
/// The rendered init prompt is passed as the final positional argument.
/// When the ticket's agent was already spawned once in a prior session and
/// the agent supports resumption, its resume flags are appended before the
/// prompt.
pub fn build_invocation(agent: &AgentConfig, prompt: &str, resume: bool) -> (String, Vec<String>) {
    let mut args = agent.args.clone();
    if resume && !agent.resume_args.is_empty() {
        args.extend(agent.resume_args.iter().cloned());
    }
    args.push(prompt.to_string());
    (agent.command.clone(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn agent() -> AgentConfig {
        AgentConfig {
            command: "claude".to_string(),
            args: vec!["--dangerously-skip-permissions".to_string()],
            env: HashMap::new(),
            status_file: None,
            init_prompt_template: String::new(),
            resume_args: vec!["--continue".to_string()],
        }
    }

    #[test]
    fn test_fresh_spawn_has_no_resume_flags() {
        let (cmd, args) = build_invocation(&agent(), "do it", false);
        assert_eq!(cmd, "claude");
        assert_eq!(args, vec!["--dangerously-skip-permissions", "do it"]);
    }

    #[test]
    fn test_resume_appends_flags_before_prompt() {
        let (_, args) = build_invocation(&agent(), "do it", true);
        assert_eq!(args, vec!["--dangerously-skip-permissions", "--continue", "do it"]);
    }

    #[test]
    fn test_resume_without_resume_args_is_fresh() {
        let mut a = agent();
        a.resume_args.clear();
        let (_, args) = build_invocation(&a, "p", true);
        assert_eq!(args, vec!["--dangerously-skip-permissions", "p"]);
    }
}
