use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use git_lanes::app::persist::{FileStateStorage, UserPreferences};
use git_lanes::app::refresh::RefreshScope;
use git_lanes::app::store::{StoreSettings, ViewStateStore};
use git_lanes::app::{App, Focus, InputMode};
use git_lanes::config::{load_config, LanesConfig};
use git_lanes::git::reviews::CodeReviewStore;
use git_lanes::git::worker::GitWorker;
use git_lanes::git::{cli as git_cli, Action, Response};
use git_lanes::ui;
use git_lanes::watch::{FileWatcher, WatchEvent};
use ratatui::prelude::*;
use std::io;
use std::path::Path;
use std::sync::{mpsc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Terminal git history browser with a lane-based commit graph
#[derive(Parser)]
#[command(name = "lanes", version, about)]
struct Cli {
    /// Repository paths to register (the first one is opened; defaults to the current directory)
    paths: Vec<String>,

    /// Show only this branch when a repository loads (repeatable, globs allowed)
    #[arg(long = "branch", value_name = "NAME")]
    branches: Vec<String>,

    /// Number of commits to load initially
    #[arg(long)]
    max_commits: Option<usize>,

    /// Follow only the first parent of merge commits
    #[arg(long)]
    first_parent: bool,

    /// Do not watch the repository for changes
    #[arg(long)]
    no_watch: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("warning: logging disabled: {e:#}");
    }

    let paths = if cli.paths.is_empty() {
        vec![".".to_string()]
    } else {
        cli.paths.clone()
    };
    let mut roots: Vec<String> = Vec::new();
    for path in &paths {
        match git_cli::repo_root(path) {
            Some(root) if !roots.contains(&root) => roots.push(root),
            Some(_) => {}
            None => warn!(path = %path, "not inside a git repository"),
        }
    }
    // A path that is not a repository still opens, so the notice explains why it is empty
    let first = match roots.first() {
        Some(root) => root.clone(),
        None => std::fs::canonicalize(&paths[0])
            .with_context(|| format!("Cannot open {}", paths[0]))?
            .to_string_lossy()
            .into_owned(),
    };

    let mut config = load_config(Path::new(&first));
    apply_cli(&mut config, &cli);

    let state_dir = FileStateStorage::default_dir();
    let store = ViewStateStore::restore(
        Box::new(FileStateStorage::new(state_dir.clone())),
        StoreSettings::from_config(&config),
    );
    let preferences = UserPreferences::load(store.storage());
    let reviews = CodeReviewStore::open(state_dir.join("reviews.json"));
    let (worker, responses) = GitWorker::spawn(reviews)?;

    let mut app = App::new(worker, store, config, preferences);
    app.register_repos(&roots);
    app.start(Some(first));

    // Terminal setup
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &responses);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }
    info!("exiting");
    Ok(())
}

/// Log to a file in the cache directory; stdout belongs to the terminal UI
fn init_logging() -> Result<()> {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("git-lanes")) else {
        return Ok(());
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("lanes.log"))
        .context("Failed to open log file")?;
    let filter = EnvFilter::try_from_env("LANES_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn apply_cli(config: &mut LanesConfig, cli: &Cli) {
    if !cli.branches.is_empty() {
        config.on_repo_load.show_specific_branches = cli.branches.clone();
        config.on_repo_load.show_checked_out_branch = false;
    }
    if let Some(max) = cli.max_commits {
        config.load.initial_commits = max.max(1);
    }
    if cli.first_parent {
        config.repo_defaults.only_follow_first_parent = true;
    }
    if cli.no_watch {
        config.watch.enabled = false;
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<GitWorker>,
    responses: &mpsc::Receiver<Response>,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let (watch_tx, watch_rx) = mpsc::channel::<WatchEvent>();
    let mut watcher: Option<(String, FileWatcher)> = None;
    let mut last_poll = Instant::now();

    loop {
        sync_watcher(app, &watch_tx, &mut watcher);

        let size = terminal.size()?;
        app.viewport_rows = ui::list_viewport_rows(size.height);
        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with a timeout (lets us process responses too)
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }

        while let Ok(response) = responses.try_recv() {
            app.handle_response(response);
        }

        while let Ok(event) = watch_rx.try_recv() {
            match event {
                WatchEvent::Refresh { scope, config_changes } => {
                    app.request_refresh(scope, false, config_changes);
                }
                WatchEvent::Error(e) => {
                    warn!("file watcher error: {e}");
                    app.notify("File watcher error, press r to refresh");
                }
            }
        }

        let poll_secs = app.config.watch.poll_secs;
        if poll_secs > 0 && last_poll.elapsed() >= Duration::from_secs(poll_secs) {
            last_poll = Instant::now();
            app.request_refresh(RefreshScope::RepoInfoOnly, false, false);
        }

        // Tick clears stale notifications
        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Keep one watcher on the current repository while watching is enabled
fn sync_watcher(
    app: &mut App<GitWorker>,
    tx: &mpsc::Sender<WatchEvent>,
    watcher: &mut Option<(String, FileWatcher)>,
) {
    let wanted = if app.config.watch.enabled {
        app.store.current_repo().map(str::to_string)
    } else {
        None
    };
    if watcher.as_ref().map(|(repo, _)| repo) == wanted.as_ref() {
        return;
    }
    *watcher = None;
    app.watching = false;
    let Some(repo) = wanted else {
        return;
    };
    match FileWatcher::new(Path::new(&repo), app.config.watch.debounce_ms, tx.clone()) {
        Ok(w) => {
            info!(repo = %repo, "watching repository");
            *watcher = Some((repo, w));
            app.watching = true;
        }
        Err(e) => {
            warn!("unable to watch {repo}: {e:#}");
            // Stop retrying on every frame
            app.config.watch.enabled = false;
        }
    }
}

fn handle_key(app: &mut App<GitWorker>, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.error.is_some() {
        match key.code {
            KeyCode::Char('r') => app.retry(),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => app.error = None,
            _ => {}
        }
        return;
    }

    match app.input_mode {
        InputMode::Find => handle_find_input(app, key),
        InputMode::Confirm(_) => handle_confirm_input(app, key),
        InputMode::PickRepo(_) => handle_picker_input(app, key),
        InputMode::Normal => handle_normal_input(app, key),
    }
}

fn handle_find_input(app: &mut App<GitWorker>, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_find(),
        KeyCode::Esc => {
            app.find_input.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Char(c) => app.find_input.push(c),
        KeyCode::Backspace => {
            app.find_input.pop();
        }
        _ => {}
    }
}

fn handle_confirm_input(app: &mut App<GitWorker>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') => app.confirm(true, false),
        KeyCode::Char('a') => app.confirm(true, true),
        KeyCode::Char('n') | KeyCode::Esc => app.confirm(false, false),
        _ => {} // Ignore all other keys in confirm mode
    }
}

fn handle_picker_input(app: &mut App<GitWorker>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_repo_picker(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_repo_picker(-1),
        KeyCode::Enter => app.submit_repo_picker(),
        KeyCode::Esc | KeyCode::Char('q') => app.input_mode = InputMode::Normal,
        _ => {}
    }
}

fn handle_normal_input(app: &mut App<GitWorker>, key: KeyEvent) {
    let menu_open = app
        .store
        .state()
        .panel
        .expanded()
        .is_some_and(|e| e.menu.is_some());
    if menu_open {
        // Any key closes the menu; menu entries then act like their normal key
        app.toggle_panel_menu();
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('M')) {
            return;
        }
    }

    let panel_open = app.store.state().panel.is_open();
    if !panel_open {
        app.focus = Focus::Graph;
    }

    // Keys shared by both panes
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.request_refresh(RefreshScope::RepoInfoThenCommits, true, false);
            return;
        }
        KeyCode::Char('r') => {
            app.request_refresh(RefreshScope::RepoInfoThenCommits, false, false);
            return;
        }
        KeyCode::Char('M') if panel_open => {
            app.toggle_panel_menu();
            return;
        }
        KeyCode::Char('R') if panel_open => {
            app.start_review();
            return;
        }
        KeyCode::Char('E') if panel_open => {
            app.end_review();
            return;
        }
        KeyCode::Char('x') if panel_open => {
            app.close_panel();
            return;
        }
        KeyCode::Tab if panel_open => {
            app.focus = match app.focus {
                Focus::Graph => Focus::Panel,
                Focus::Panel => Focus::Graph,
            };
            return;
        }
        KeyCode::Char('w') => {
            app.config.watch.enabled = !app.config.watch.enabled;
            let msg = if app.config.watch.enabled {
                "Watching for changes"
            } else {
                "Stopped watching"
            };
            app.notify(msg);
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Panel => handle_panel_input(app, key),
        Focus::Graph => handle_graph_input(app, key),
    }
}

fn handle_graph_input(app: &mut App<GitWorker>, key: KeyEvent) {
    let page = app.viewport_rows.max(1) as isize;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.move_selection(page / 2),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.move_selection(-page / 2),
        KeyCode::PageDown => app.move_selection(page),
        KeyCode::PageUp => app.move_selection(-page),
        KeyCode::Char('g') | KeyCode::Home => app.select(0),
        KeyCode::Char('G') | KeyCode::End => {
            let last = app.store.state().commits.len().saturating_sub(1);
            app.select(last);
        }
        KeyCode::Enter => app.toggle_details(),
        KeyCode::Char('v') => app.mark_or_compare(),
        KeyCode::Esc => {
            if app.store.state().panel.is_open() {
                app.close_panel();
            } else {
                app.compare_mark = None;
            }
        }
        KeyCode::Char('/') => app.start_find(),
        KeyCode::Char('n') => app.find_next(),
        KeyCode::Char('b') => app.toggle_branch_filter(),
        KeyCode::Char('m') => app.load_more(),
        KeyCode::Char('c') => app.checkout_selected(),
        KeyCode::Char('s') => app.stash_selected(),
        KeyCode::Char('D') => app.drop_selected(),
        KeyCode::Char('F') => app.request_action(Action::Fetch {
            remote: None,
            prune: false,
            prune_tags: false,
        }),
        KeyCode::Char('p') => app.open_repo_picker(),
        _ => {}
    }
}

fn handle_panel_input(app: &mut App<GitWorker>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_panel_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_panel_cursor(-1),
        KeyCode::Char('J') => app.scroll_panel_summary(1),
        KeyCode::Char('K') => app.scroll_panel_summary(-1),
        KeyCode::Enter => app.activate_panel_row(),
        KeyCode::Char(' ') => app.toggle_file_reviewed(),
        KeyCode::Esc => app.close_panel(),
        _ => {}
    }
}
