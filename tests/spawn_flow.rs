//! End-to-end spawn and shutdown flow, driven through the real update loop
//! with a shell standing in for the agent binary. Skipped without git.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tempfile::TempDir;

use openkanban::app::App;
use openkanban::config::{AgentConfig, Config};
use openkanban::events::{self, Event, Mode};
use openkanban::store::Project;
use openkanban::tickets::{Ticket, TicketStatus};

fn tools_available() -> bool {
    which::which("git").is_ok() && which::which("/bin/sh").is_ok()
}

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_AUTHOR_NAME", "test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("run git")
        .status;
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo(temp: &TempDir) -> PathBuf {
    let repo = temp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init"]);
    git(&repo, &["checkout", "-b", "main"]);
    std::fs::write(repo.join("README.md"), "hello\n").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-m", "initial"]);
    repo
}

/// Config with a shell agent so no real agent binary is needed.
fn shell_agent_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.data = Some(data_dir.to_string_lossy().to_string());
    config.agents.map.clear();
    config.agents.map.insert(
        "sh".to_string(),
        AgentConfig {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo agent up; sleep 30".to_string()],
            env: Default::default(),
            status_file: None,
            init_prompt_template: "{{title}}: {{description}}".to_string(),
            resume_args: Vec::new(),
        },
    );
    config.agents.default_agent = "sh".to_string();
    config
}

fn press(app: &mut App, code: KeyCode) {
    app.update(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
}

/// Pump queued events into the app until `done` holds or the timeout hits.
async fn pump_until(
    app: &mut App,
    rx: &mut events::EventReceiver,
    timeout: Duration,
    done: impl Fn(&App) -> bool,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while !done(app) {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return false;
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(event)) => app.update(event),
            _ => return false,
        }
    }
    true
}

#[tokio::test]
async fn test_spawn_happy_path_then_graceful_shutdown() {
    if !tools_available() {
        eprintln!("Skipping test: git or /bin/sh not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = init_repo(&temp);
    let data_dir = temp.path().join("data");

    let (tx, mut rx) = events::channel();
    let mut app = App::new(shell_agent_config(&data_dir), tx).unwrap();
    app.registry.add(Project::new("demo", &repo)).unwrap();

    // Seed one In Progress ticket with no worktree
    let project_id = app.registry.all()[0].id.clone();
    let mut ticket = Ticket::new(&project_id, "hello", "say hi");
    ticket.status = TicketStatus::InProgress;
    let ticket_id = ticket.id.clone();
    app.board.insert(ticket);

    // Select the In Progress column and spawn
    press(&mut app, KeyCode::Char('l'));
    press(&mut app, KeyCode::Char('s'));
    assert_eq!(app.mode, Mode::Spawning);

    // Worktree creation and pane spawn complete through the event queue
    let spawned = pump_until(&mut app, &mut rx, Duration::from_secs(20), |app| {
        app.mode == Mode::AgentView
    })
    .await;
    assert!(spawned, "spawn did not reach AgentView");

    {
        let ticket = app.board.get(&ticket_id).unwrap();
        let worktree = ticket.worktree_path.as_ref().unwrap();
        assert!(worktree.to_string_lossy().contains("repo-worktrees/task-"));
        assert!(worktree.exists());
        assert!(ticket
            .branch_name
            .as_deref()
            .unwrap()
            .starts_with("task/"));
        assert_eq!(ticket.base_branch.as_deref(), Some("main"));
        assert!(ticket.agent_spawned_at.is_some());

        let session_id = ticket.session_id.as_ref().unwrap();
        assert!(app.panes.contains_key(session_id));
    }

    // Detach, then quit; shutdown closes the running pane before exiting
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.mode, Mode::Normal);
    press(&mut app, KeyCode::Char('q'));
    assert_eq!(app.mode, Mode::ShuttingDown);

    let finished = pump_until(&mut app, &mut rx, Duration::from_secs(10), |app| {
        app.should_quit
    })
    .await;
    assert!(finished, "shutdown never completed");
    assert!(app.panes.is_empty());
}

#[tokio::test]
async fn test_deleting_ticket_with_running_pane_removes_both() {
    if !tools_available() {
        eprintln!("Skipping test: git or /bin/sh not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = init_repo(&temp);
    let data_dir = temp.path().join("data");

    let (tx, mut rx) = events::channel();
    let mut app = App::new(shell_agent_config(&data_dir), tx).unwrap();
    app.registry.add(Project::new("demo", &repo)).unwrap();

    let project_id = app.registry.all()[0].id.clone();
    let mut ticket = Ticket::new(&project_id, "doomed", "");
    ticket.status = TicketStatus::InProgress;
    let ticket_id = ticket.id.clone();
    app.board.insert(ticket);

    press(&mut app, KeyCode::Char('l'));
    press(&mut app, KeyCode::Char('s'));
    let spawned = pump_until(&mut app, &mut rx, Duration::from_secs(20), |app| {
        app.board
            .get(&ticket_id)
            .and_then(|t| t.session_id.clone())
            .is_some()
    })
    .await;
    assert!(spawned, "agent never spawned");

    // Leave the agent view, then delete via d -> y
    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Char('d'));
    assert_eq!(app.mode, Mode::Confirm);
    press(&mut app, KeyCode::Char('y'));

    // Ticket and pane are gone in the same update step
    assert!(app.board.get(&ticket_id).is_none());
    assert!(app.panes.is_empty());

    // And the store no longer contains the ticket
    let reloaded = openkanban::store::TicketStore::new(&data_dir)
        .load(&project_id)
        .unwrap();
    assert!(reloaded.iter().all(|t| t.id != ticket_id));
}
