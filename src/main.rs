mod ui;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{error::Error, io, path::PathBuf, time::Duration};

use replog::clock::{format_elapsed, SystemClock};
use replog::engine::SessionEngine;
use replog::items::{ItemKey, SessionItem};
use replog::ledger::GroupSetEntry;
use replog::runtime::{AppEvent, CrosstermEventSource, Runner};
use replog::storage::{FileSessionStore, HistoryDb, SessionStore};

const TICK_RATE_MS: u64 = 250;

/// terminal workout logger with supersets, rest tracking, and session history
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new session (discards any resumable one)
    Start,
    /// Resume the saved session (the default when one exists)
    Resume,
    /// Print finished-session history
    History,
    /// Export history as CSV
    Export {
        /// write to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge a JSON export into the history (dedupe by id, newest wins)
    Import { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Browse,
    AddExercise,
    LogSet,
}

pub struct App {
    pub engine: SessionEngine<SystemClock>,
    pub mode: Mode,
    pub input: String,
    pub selected: usize,
    pub status: Option<String>,
    log_target: Option<ItemKey>,
    should_quit: bool,
    finished: bool,
}

impl App {
    fn new(engine: SessionEngine<SystemClock>) -> Self {
        Self {
            engine,
            mode: Mode::Browse,
            input: String::new(),
            selected: 0,
            status: None,
            log_target: None,
            should_quit: false,
            finished: false,
        }
    }

    fn selected_item(&self) -> Option<SessionItem> {
        self.engine.items().get(self.selected).cloned()
    }

    fn clamp_selection(&mut self) {
        let len = self.engine.items().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn report<T>(&mut self, result: Result<T, replog::error::EngineError>) {
        if let Err(e) = result {
            self.status = Some(e.to_string());
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match self.mode {
            Mode::Browse => self.on_browse_key(key.code),
            Mode::AddExercise | Mode::LogSet => self.on_input_key(key.code),
        }
        self.clamp_selection();
    }

    fn on_browse_key(&mut self, code: KeyCode) {
        self.status = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('a') => {
                self.mode = Mode::AddExercise;
                self.input.clear();
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.selected = self.selected.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(item) = self.selected_item() {
                    let key = item.key();
                    let r = self.engine.focus_item(key.clone());
                    self.report(r);
                    self.log_target = Some(key);
                    self.mode = Mode::LogSet;
                    self.input.clear();
                }
            }
            KeyCode::Char('c') => {
                if let Some(item) = self.selected_item() {
                    match item {
                        SessionItem::Single { exercise_id, .. } => {
                            let r = self.engine.complete_exercise(&exercise_id);
                            self.report(r);
                        }
                        SessionItem::Superset { group_id, .. } => {
                            let r = self.engine.complete_group(&group_id);
                            self.report(r);
                        }
                    }
                }
            }
            KeyCode::Char('o') => {
                if let Some(item) = self.selected_item() {
                    let r = self.engine.reopen(&item.key());
                    self.report(r);
                }
            }
            KeyCode::Char('s') => {
                if let Some(item) = self.selected_item() {
                    let key = item.key();
                    if self.engine.flow().is_skipped(&key) {
                        self.engine.unskip(&key);
                    } else {
                        let r = self.engine.skip(key);
                        self.report(r);
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(item) = self.selected_item() {
                    let r = self.engine.defer(&item.key());
                    self.report(r);
                }
            }
            KeyCode::Char('g') => self.pair_selected_with_next(),
            KeyCode::Char('u') => self.ungroup_selected(),
            KeyCode::Char('K') => {
                if let Some(item) = self.selected_item() {
                    let r = self.engine.move_item_up(&item.key());
                    self.report(r);
                    self.selected = self.selected.saturating_sub(1);
                }
            }
            KeyCode::Char('J') => {
                if let Some(item) = self.selected_item() {
                    let r = self.engine.move_item_down(&item.key());
                    self.report(r);
                    self.selected = self.selected.saturating_add(1);
                }
            }
            KeyCode::Char('x') => self.delete_last_set(),
            KeyCode::Char('D') => {
                if let Some(item) = self.selected_item() {
                    match item {
                        SessionItem::Single { exercise_id, .. } => {
                            let r = self.engine.remove_exercise(&exercise_id);
                            self.report(r);
                        }
                        SessionItem::Superset { .. } => {
                            self.status = Some("ungroup before removing a member".into());
                        }
                    }
                }
            }
            KeyCode::Char('r') => self.engine.dismiss_rest_timer(),
            KeyCode::Char('f') => {
                self.finished = true;
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn on_input_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.input.clear();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.input);
                let mode = std::mem::replace(&mut self.mode, Mode::Browse);
                match mode {
                    Mode::AddExercise => {
                        let r = self.engine.add_exercise(&text);
                        self.report(r);
                    }
                    Mode::LogSet => self.submit_set(&text),
                    Mode::Browse => {}
                }
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn submit_set(&mut self, text: &str) {
        let Some(target) = self.log_target.take() else {
            return;
        };
        let parsed = match parse_set_entries(text) {
            Ok(p) => p,
            Err(msg) => {
                self.status = Some(msg);
                return;
            }
        };
        let items = self.engine.items();
        let Some(item) = replog::items::find_item(&items, &target) else {
            self.status = Some("item no longer exists".into());
            return;
        };
        match item {
            SessionItem::Single { exercise_id, .. } => {
                let (weight, reps) = parsed[0];
                let exercise_id = exercise_id.clone();
                let r = self.engine.add_set(&exercise_id, weight, reps);
                self.report(r);
            }
            SessionItem::Superset { exercise_ids, .. } => {
                if parsed.len() != exercise_ids.len() {
                    self.status = Some(format!(
                        "superset needs {} comma-separated entries",
                        exercise_ids.len()
                    ));
                    return;
                }
                let entries: Vec<GroupSetEntry> = exercise_ids
                    .iter()
                    .zip(&parsed)
                    .map(|(id, (weight, reps))| GroupSetEntry {
                        exercise_id: id.clone(),
                        weight_kg: *weight,
                        reps: *reps,
                    })
                    .collect();
                let r = self.engine.add_group_set(&entries);
                self.report(r);
            }
        }
    }

    fn pair_selected_with_next(&mut self) {
        let items = self.engine.items();
        let (Some(a), Some(b)) = (items.get(self.selected), items.get(self.selected + 1)) else {
            self.status = Some("pair needs an item below the selection".into());
            return;
        };
        match (a, b) {
            (
                SessionItem::Single { exercise_id: a, .. },
                SessionItem::Single { exercise_id: b, .. },
            ) => {
                let (a, b) = (a.clone(), b.clone());
                let r = self.engine.pair(&a, &b).map(|_| ());
                self.report(r);
            }
            (SessionItem::Superset { group_id, .. }, SessionItem::Single { exercise_id, .. }) => {
                let (g, e) = (group_id.clone(), exercise_id.clone());
                let r = self.engine.add_to_group(&g, &e);
                self.report(r);
            }
            (SessionItem::Superset { group_id: a, .. }, SessionItem::Superset { group_id: b, .. }) => {
                let (a, b) = (a.clone(), b.clone());
                let r = self.engine.merge_groups(&a, &b);
                self.report(r);
            }
            (SessionItem::Single { exercise_id, .. }, SessionItem::Superset { group_id, .. }) => {
                let (g, e) = (group_id.clone(), exercise_id.clone());
                let r = self.engine.add_to_group(&g, &e);
                self.report(r);
            }
        }
    }

    fn ungroup_selected(&mut self) {
        let Some(SessionItem::Superset { exercise_ids, .. }) = self.selected_item() else {
            self.status = Some("select a superset to ungroup".into());
            return;
        };
        // removing members dissolves the group once fewer than two remain
        for id in &exercise_ids[..exercise_ids.len() - 1] {
            if self.engine.remove_from_group(id).is_err() {
                break;
            }
        }
    }

    fn delete_last_set(&mut self) {
        let Some(SessionItem::Single { exercise_id, .. }) = self.selected_item() else {
            self.status = Some("select a single exercise to delete its last set".into());
            return;
        };
        let last = self
            .engine
            .session()
            .exercise(&exercise_id)
            .and_then(|e| e.sets.last())
            .map(|s| s.id.clone());
        match last {
            Some(set_id) => {
                let r = self.engine.delete_set(&exercise_id, &set_id);
                self.report(r);
            }
            None => self.status = Some("no sets to delete".into()),
        }
    }
}

/// Parse "60x10" / "60 10" entries, comma-separated for superset members.
fn parse_set_entries(text: &str) -> Result<Vec<(f64, u32)>, String> {
    let mut out = Vec::new();
    for raw in text.split(',') {
        let cleaned = raw.trim().replace(['x', 'X', '*'], " ");
        let mut parts = cleaned.split_whitespace();
        let (Some(w), Some(r)) = (parts.next(), parts.next()) else {
            return Err(format!("cannot parse set entry '{}'", raw.trim()));
        };
        let weight: f64 = w
            .parse()
            .map_err(|_| format!("bad weight '{w}'"))?;
        let reps: u32 = r.parse().map_err(|_| format!("bad reps '{r}'"))?;
        out.push((weight, reps));
    }
    if out.is_empty() {
        return Err("empty set entry".into());
    }
    Ok(out)
}

fn load_engine(force_new: bool, must_resume: bool) -> Result<SessionEngine<SystemClock>, Box<dyn Error>> {
    let store = FileSessionStore::new();
    if force_new {
        store.clear()?;
    }
    match store.load() {
        Some(state) if !force_new => Ok(SessionEngine::resume(
            state,
            SystemClock,
            Some(Box::new(store)),
        )),
        None if must_resume => Err("no resumable session found".into()),
        _ => Ok(SessionEngine::start(SystemClock, Some(Box::new(store)))),
    }
}

fn run_tui(mut app: App) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let result = (|| -> Result<(), Box<dyn Error>> {
        loop {
            terminal.draw(|f| f.render_widget(&app, f.area()))?;
            match runner.step() {
                AppEvent::Key(key) => app.on_key(key),
                AppEvent::Resize | AppEvent::Tick => {}
            }
            if app.should_quit {
                break;
            }
        }
        Ok(())
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    if app.finished {
        let summary = app.engine.finish();
        match HistoryDb::new() {
            Ok(db) => db.record(&summary)?,
            Err(e) => eprintln!("history not recorded: {e}"),
        }
        println!(
            "session {}: {} exercises, {} sets, {:.1} kg total in {}",
            summary.id,
            summary.exercise_count,
            summary.set_count,
            summary.total_volume_kg,
            format_elapsed(summary.duration_secs),
        );
    }
    Ok(())
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::new()?;
    let all = db.list()?;
    if all.is_empty() {
        println!("no finished sessions yet");
        return Ok(());
    }
    for s in all {
        println!(
            "{}  {}  {:>3} ex  {:>4} sets  {:>9.1} kg  {}",
            s.started_at.format("%Y-%m-%d %H:%M"),
            s.id,
            s.exercise_count,
            s.set_count,
            s.total_volume_kg,
            format_elapsed(s.duration_secs),
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::History) => print_history(),
        Some(Command::Export { output }) => {
            let db = HistoryDb::new()?;
            match output {
                Some(path) => db.export_csv(std::fs::File::create(path)?)?,
                None => db.export_csv(io::stdout().lock())?,
            }
            Ok(())
        }
        Some(Command::Import { path }) => {
            let db = HistoryDb::new()?;
            let merged = db.import_json(&path)?;
            println!("merged {merged} session(s)");
            Ok(())
        }
        Some(Command::Start) => run_tui(App::new(load_engine(true, false)?)),
        Some(Command::Resume) => run_tui(App::new(load_engine(false, true)?)),
        None => run_tui(App::new(load_engine(false, false)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_entry_variants() {
        assert_eq!(parse_set_entries("60x10").unwrap(), vec![(60.0, 10)]);
        assert_eq!(parse_set_entries("60 10").unwrap(), vec![(60.0, 10)]);
        assert_eq!(parse_set_entries("62.5X8").unwrap(), vec![(62.5, 8)]);
        assert_eq!(parse_set_entries("0x0").unwrap(), vec![(0.0, 0)]);
    }

    #[test]
    fn parse_superset_entries() {
        assert_eq!(
            parse_set_entries("60x10, 40x12").unwrap(),
            vec![(60.0, 10), (40.0, 12)]
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_set_entries("").is_err());
        assert!(parse_set_entries("60").is_err());
        assert!(parse_set_entries("axb").is_err());
        assert!(parse_set_entries("60x10,").is_err());
    }
}
