//! Interactive workflow as a pure state machine.
//!
//! `update` is the only place the model changes. It consumes one `Event` and
//! returns the side effects the runtime must perform; their outcomes come back
//! as further events. At most one cleanup is ever requested at a time.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::{CleanupResult, RunSummary};
use crate::tui::log::ProgressLog;
use crate::ui::format_bytes;

/// Estimated on-screen width of one grid cell: cursor, checkbox and name.
pub const ITEM_WIDTH: usize = 4 + 20;
pub const MAX_COLUMNS: usize = 4;
/// Rows taken by title, help and counters around the selection grid.
const CHROME_ROWS: usize = 6;
const FALLBACK_VIEWPORT_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selection,
    Confirmation,
    Execution,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Reference point for the run: taken at start, on entering
    /// confirmation, and on restart.
    Baseline,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Tick,
    ItemStarted { index: usize },
    ItemCompleted { index: usize, result: CleanupResult },
    FreeSpaceSampled { kind: SampleKind, bytes: u64 },
    RunLogged(Result<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Feed an event back into `update` on the next turn of the loop.
    Emit(Event),
    RunCleanup { index: usize, name: String },
    SampleFreeSpace(SampleKind),
    PersistRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub requires_root: bool,
}

#[derive(Debug, Clone)]
pub struct Model {
    items: Vec<Item>,
    selected: Vec<bool>,
    cursor: usize,
    viewport_start: usize,
    stage: Stage,
    width: usize,
    height: usize,
    plan: Vec<String>,
    current_index: usize,
    in_flight: Option<usize>,
    results: Vec<CleanupResult>,
    log: ProgressLog,
    start_space: u64,
    end_space: u64,
    tick: u64,
    is_root: bool,
    notice: Option<String>,
}

impl Model {
    pub fn new(items: Vec<Item>, log_capacity: usize, is_root: bool) -> Self {
        let n = items.len();
        Self {
            items,
            selected: vec![false; n],
            cursor: 0,
            viewport_start: 0,
            stage: Stage::Selection,
            width: 0,
            height: 0,
            plan: Vec::new(),
            current_index: 0,
            in_flight: None,
            results: Vec::new(),
            log: ProgressLog::new(log_capacity),
            start_space: 0,
            end_space: 0,
            tick: 0,
            is_root,
            notice: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.items
            .iter()
            .zip(&self.selected)
            .filter(|(_, s)| **s)
            .map(|(item, _)| item.name.clone())
            .collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn viewport_start(&self) -> usize {
        self.viewport_start
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn plan(&self) -> &[String] {
        &self.plan
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn in_flight(&self) -> Option<usize> {
        self.in_flight
    }

    pub fn results(&self) -> &[CleanupResult] {
        &self.results
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn start_space(&self) -> u64 {
        self.start_space
    }

    pub fn end_space(&self) -> u64 {
        self.end_space
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::new(&self.results, self.start_space, self.end_space)
    }

    /// Grid columns for the current width.
    pub fn columns(&self) -> usize {
        if self.width == 0 {
            return 1;
        }
        (self.width / ITEM_WIDTH).clamp(1, MAX_COLUMNS)
    }

    pub fn total_rows(&self) -> usize {
        self.items.len().div_ceil(self.columns())
    }

    /// Grid rows that fit on screen.
    pub fn viewport_rows(&self) -> usize {
        match self.height.checked_sub(CHROME_ROWS) {
            Some(rows) if rows > 0 => rows,
            _ => FALLBACK_VIEWPORT_ROWS,
        }
    }

    pub fn cursor_position(&self) -> (usize, usize) {
        let cols = self.columns();
        (self.cursor / cols, self.cursor % cols)
    }

    fn update_viewport(&mut self) {
        if self.items.is_empty() {
            self.viewport_start = 0;
            return;
        }
        let cols = self.columns();
        let rows = self.viewport_rows();
        let (cursor_row, _) = self.cursor_position();

        let mut start_row = self.viewport_start / cols;
        if cursor_row < start_row {
            start_row = cursor_row;
        } else if cursor_row >= start_row + rows {
            start_row = cursor_row + 1 - rows;
        }

        self.viewport_start = start_row * cols;
        if self.viewport_start >= self.items.len() {
            self.viewport_start = ((self.items.len() - 1) / cols) * cols;
        }
    }

    fn last_index(&self) -> usize {
        self.items.len().saturating_sub(1)
    }

    fn push_log(&mut self, entry: &str) {
        let width = self.width;
        self.log.push(entry, width);
    }

    fn reset_for_restart(&mut self) {
        self.selected = vec![false; self.items.len()];
        self.cursor = 0;
        self.viewport_start = 0;
        self.plan.clear();
        self.current_index = 0;
        self.in_flight = None;
        self.results.clear();
        self.log.clear();
        self.end_space = 0;
        self.notice = None;
        self.stage = Stage::Selection;
    }
}

/// Applies one event and returns the side effects it asks for.
pub fn update(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) => handle_key(model, key),
        Event::Resize { width, height } => {
            model.width = usize::from(width);
            model.height = usize::from(height);
            model.update_viewport();
            vec![]
        }
        Event::Tick => {
            model.tick = model.tick.wrapping_add(1);
            vec![]
        }
        Event::ItemStarted { index } => item_started(model, index),
        Event::ItemCompleted { index, result } => item_completed(model, index, result),
        Event::FreeSpaceSampled { kind, bytes } => free_space_sampled(model, kind, bytes),
        Event::RunLogged(outcome) => {
            model.notice = Some(match outcome {
                Ok(path) => format!("run log: {path}"),
                Err(err) => format!("run log not written: {err}"),
            });
            vec![]
        }
    }
}

fn handle_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return vec![Command::Quit];
    }

    match model.stage {
        Stage::Selection => selection_key(model, key.code),
        Stage::Confirmation => match key.code {
            KeyCode::Char('q') => vec![Command::Quit],
            KeyCode::Char('y') | KeyCode::Enter => begin_execution(model),
            KeyCode::Char('n') | KeyCode::Esc => {
                model.stage = Stage::Selection;
                vec![]
            }
            _ => vec![],
        },
        Stage::Execution => match key.code {
            KeyCode::Char('q') => vec![Command::Quit],
            _ => vec![],
        },
        Stage::Results => match key.code {
            KeyCode::Char('q') | KeyCode::Enter => vec![Command::Quit],
            KeyCode::Char('r') => {
                model.reset_for_restart();
                vec![Command::SampleFreeSpace(SampleKind::Baseline)]
            }
            _ => vec![],
        },
    }
}

fn selection_key(model: &mut Model, code: KeyCode) -> Vec<Command> {
    if code == KeyCode::Char('q') {
        return vec![Command::Quit];
    }
    if model.items.is_empty() {
        return vec![];
    }

    let cols = model.columns();
    let page = model.viewport_rows() * cols;
    let last = model.last_index();

    match code {
        KeyCode::Up | KeyCode::Char('k') => model.cursor = model.cursor.saturating_sub(cols),
        KeyCode::Down | KeyCode::Char('j') => model.cursor = (model.cursor + cols).min(last),
        KeyCode::Left | KeyCode::Char('h') => model.cursor = model.cursor.saturating_sub(1),
        KeyCode::Right | KeyCode::Char('l') => model.cursor = (model.cursor + 1).min(last),
        KeyCode::PageUp => model.cursor = model.cursor.saturating_sub(page),
        KeyCode::PageDown => model.cursor = (model.cursor + page).min(last),
        KeyCode::Char(' ') => {
            let cursor = model.cursor;
            model.selected[cursor] = !model.selected[cursor];
        }
        KeyCode::Char('a') => model.selected.iter_mut().for_each(|s| *s = true),
        KeyCode::Char('A') => model.selected.iter_mut().for_each(|s| *s = false),
        KeyCode::Enter => {
            if model.selected_count() > 0 {
                model.stage = Stage::Confirmation;
                return vec![Command::SampleFreeSpace(SampleKind::Baseline)];
            }
        }
        _ => {}
    }
    model.update_viewport();
    vec![]
}

fn begin_execution(model: &mut Model) -> Vec<Command> {
    model.plan = model.selected_names();
    model.current_index = 0;
    model.in_flight = None;
    model.results.clear();
    model.log.clear();
    model.notice = None;
    model.stage = Stage::Execution;

    if model.plan.is_empty() {
        return vec![Command::SampleFreeSpace(SampleKind::End)];
    }
    vec![Command::Emit(Event::ItemStarted { index: 0 })]
}

fn item_started(model: &mut Model, index: usize) -> Vec<Command> {
    let stale = model.stage != Stage::Execution
        || model.in_flight.is_some()
        || index != model.current_index
        || index >= model.plan.len();
    if stale {
        return vec![];
    }

    let name = model.plan[index].clone();
    model.push_log(&format!("→ {}", display_name(&name)));
    model.in_flight = Some(index);
    vec![Command::RunCleanup { index, name }]
}

fn item_completed(model: &mut Model, index: usize, result: CleanupResult) -> Vec<Command> {
    if model.stage != Stage::Execution || model.in_flight != Some(index) {
        return vec![];
    }

    let label = display_name(&result.name);
    let line = match (result.success, result.space_freed) {
        (true, 0) => format!("✓ {label} (clean)"),
        (true, bytes) => format!("✓ {label} ({})", format_bytes(bytes)),
        (false, _) => match &result.error {
            Some(err) => format!("✗ {label} (failed: {err})"),
            None => format!("✗ {label} (failed)"),
        },
    };
    model.push_log(&line);
    model.results.push(result);
    model.in_flight = None;
    model.current_index += 1;

    if model.current_index < model.plan.len() {
        vec![Command::Emit(Event::ItemStarted {
            index: model.current_index,
        })]
    } else {
        vec![Command::SampleFreeSpace(SampleKind::End)]
    }
}

fn free_space_sampled(model: &mut Model, kind: SampleKind, bytes: u64) -> Vec<Command> {
    match kind {
        SampleKind::Baseline => {
            model.start_space = bytes;
            vec![]
        }
        SampleKind::End => {
            let done = model.stage == Stage::Execution
                && model.in_flight.is_none()
                && model.results.len() == model.plan.len();
            if !done {
                return vec![];
            }
            model.end_space = bytes;
            model.stage = Stage::Results;
            vec![Command::PersistRun]
        }
    }
}

/// `npm-cache` → `Npm Cache`, `macOSTrash` → `MacOSTrash`.
pub fn display_name(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cuts `s` to `max_chars`, marking the cut with `...`.
pub fn truncate_name(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let mut out: String = s.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use std::time::Duration;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ch(c: char) -> Event {
        key(KeyCode::Char(c))
    }

    fn model_with(names: &[&str], width: u16, height: u16) -> Model {
        let items = names
            .iter()
            .map(|n| Item {
                name: n.to_string(),
                requires_root: false,
            })
            .collect();
        let mut m = Model::new(items, 100, false);
        update(&mut m, Event::Resize { width, height });
        m
    }

    fn ok(name: &str, bytes: u64) -> CleanupResult {
        CleanupResult::from_outcome(name, Ok(bytes), Duration::from_millis(5))
    }

    fn failed(name: &str, err: &str) -> CleanupResult {
        CleanupResult::failed(name, err, Duration::from_millis(5))
    }

    /// Runs `commands` the way the runtime would, answering cleanups from
    /// `outcomes` and free-space samples from `samples`.
    fn drive(
        m: &mut Model,
        mut commands: Vec<Command>,
        outcomes: &mut Vec<CleanupResult>,
        samples: &mut Vec<u64>,
    ) -> Vec<String> {
        let mut ran = Vec::new();
        while !commands.is_empty() {
            let mut next = Vec::new();
            for cmd in commands {
                match cmd {
                    Command::Emit(ev) => next.extend(update(m, ev)),
                    Command::RunCleanup { index, name } => {
                        assert_eq!(m.in_flight(), Some(index));
                        ran.push(name);
                        let result = outcomes.remove(0);
                        next.extend(update(m, Event::ItemCompleted { index, result }));
                    }
                    Command::SampleFreeSpace(kind) => {
                        let bytes = samples.remove(0);
                        next.extend(update(m, Event::FreeSpaceSampled { kind, bytes }));
                    }
                    Command::PersistRun | Command::Quit => {}
                }
            }
            commands = next;
        }
        ran
    }

    #[test]
    fn enter_without_selection_stays_in_selection() {
        let mut m = model_with(&["a", "b"], 80, 24);
        assert!(update(&mut m, key(KeyCode::Enter)).is_empty());
        assert_eq!(m.stage(), Stage::Selection);

        update(&mut m, ch(' '));
        let cmds = update(&mut m, key(KeyCode::Enter));
        assert_eq!(m.stage(), Stage::Confirmation);
        assert_eq!(cmds, vec![Command::SampleFreeSpace(SampleKind::Baseline)]);
    }

    #[test]
    fn confirmation_cancel_preserves_selection() {
        let mut m = model_with(&["a", "b", "c"], 80, 24);
        update(&mut m, key(KeyCode::Right));
        update(&mut m, ch(' '));
        update(&mut m, key(KeyCode::Enter));
        update(&mut m, key(KeyCode::Esc));
        assert_eq!(m.stage(), Stage::Selection);
        assert_eq!(m.selected_names(), vec!["b"]);
        assert_eq!(m.cursor(), 1);

        update(&mut m, key(KeyCode::Enter));
        update(&mut m, ch('n'));
        assert_eq!(m.stage(), Stage::Selection);
    }

    #[test]
    fn scenario_select_both_confirm_and_succeed() {
        let mut m = model_with(&["a", "b"], 80, 24);
        update(&mut m, ch('a'));
        let mut samples = vec![1000, 900];
        let mut outcomes = vec![ok("a", 100), ok("b", 0)];

        let cmds = update(&mut m, key(KeyCode::Enter));
        drive(&mut m, cmds, &mut outcomes, &mut samples);
        assert_eq!(m.start_space(), 1000);

        let cmds = update(&mut m, ch('y'));
        assert_eq!(m.stage(), Stage::Execution);
        let ran = drive(&mut m, cmds, &mut outcomes, &mut samples);

        assert_eq!(ran, vec!["a", "b"]);
        assert_eq!(m.stage(), Stage::Results);
        let summary = m.summary();
        assert_eq!(summary.total_freed, 100);
        assert_eq!(summary.items_freed, 100);
        assert_eq!((summary.succeeded, summary.total()), (2, 2));
        let log: Vec<&str> = m.log().iter().collect();
        assert_eq!(log, vec!["→ A", "✓ A (100 B)", "→ B", "✓ B (clean)"]);
    }

    #[test]
    fn failure_is_recorded_and_next_item_still_runs() {
        let mut m = model_with(&["x", "y"], 80, 24);
        update(&mut m, ch('a'));
        update(&mut m, key(KeyCode::Enter));
        let mut samples = vec![500];
        let mut outcomes = vec![failed("x", "error during cleanup of x: boom"), ok("y", 7)];

        let cmds = update(&mut m, key(KeyCode::Enter));
        let ran = drive(&mut m, cmds, &mut outcomes, &mut samples);

        assert_eq!(ran, vec!["x", "y"]);
        assert_eq!(m.stage(), Stage::Results);
        assert!(!m.results()[0].success);
        assert!(m.results()[1].success);
        assert_eq!(m.summary().failed, 1);
        assert!(m.log().iter().any(|l| l.starts_with("✗ X (failed") && l.contains("boom")));
    }

    #[test]
    fn results_wait_for_every_item() {
        let mut m = model_with(&["a", "b"], 80, 24);
        update(&mut m, ch('a'));
        update(&mut m, key(KeyCode::Enter));
        let cmds = update(&mut m, ch('y'));
        assert_eq!(cmds, vec![Command::Emit(Event::ItemStarted { index: 0 })]);
        update(&mut m, Event::ItemStarted { index: 0 });

        // An early end sample must not finish the run.
        let cmds = update(
            &mut m,
            Event::FreeSpaceSampled {
                kind: SampleKind::End,
                bytes: 1,
            },
        );
        assert!(cmds.is_empty());
        assert_eq!(m.stage(), Stage::Execution);
    }

    #[test]
    fn only_one_item_in_flight() {
        let mut m = model_with(&["a", "b", "c"], 80, 24);
        update(&mut m, ch('a'));
        update(&mut m, key(KeyCode::Enter));
        update(&mut m, ch('y'));

        let first = update(&mut m, Event::ItemStarted { index: 0 });
        assert_eq!(
            first,
            vec![Command::RunCleanup {
                index: 0,
                name: "a".to_string()
            }]
        );
        assert!(update(&mut m, Event::ItemStarted { index: 0 }).is_empty());
        assert!(update(&mut m, Event::ItemStarted { index: 1 }).is_empty());
        // Completion for an item that is not running is ignored.
        assert!(
            update(
                &mut m,
                Event::ItemCompleted {
                    index: 1,
                    result: ok("b", 1)
                }
            )
            .is_empty()
        );
        assert!(m.results().is_empty());

        let next = update(
            &mut m,
            Event::ItemCompleted {
                index: 0,
                result: ok("a", 1),
            },
        );
        assert_eq!(next, vec![Command::Emit(Event::ItemStarted { index: 1 })]);
        assert_eq!(m.current_index(), 1);
    }

    #[test]
    fn quit_from_every_stage() {
        let mut m = model_with(&["a"], 80, 24);
        assert_eq!(update(&mut m, ch('q')), vec![Command::Quit]);

        update(&mut m, ch(' '));
        update(&mut m, key(KeyCode::Enter));
        assert_eq!(update(&mut m, ch('q')), vec![Command::Quit]);

        update(&mut m, ch('y'));
        assert_eq!(m.stage(), Stage::Execution);
        assert_eq!(update(&mut m, ch('q')), vec![Command::Quit]);
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(update(&mut m, ctrl_c), vec![Command::Quit]);
    }

    #[test]
    fn restart_clears_state_and_resamples() {
        let mut m = model_with(&["a", "b", "c", "d", "e"], 80, 24);
        update(&mut m, key(KeyCode::Down));
        update(&mut m, ch(' '));
        let mut samples = vec![2000, 1900];
        let mut outcomes = vec![ok("d", 100)];
        let cmds = update(&mut m, key(KeyCode::Enter));
        drive(&mut m, cmds, &mut outcomes, &mut samples);
        let cmds = update(&mut m, ch('y'));
        drive(&mut m, cmds, &mut outcomes, &mut samples);
        assert_eq!(m.stage(), Stage::Results);
        update(&mut m, Event::RunLogged(Ok("~/.config/broom/logs/run.json".to_string())));
        assert!(m.notice().is_some());

        let cmds = update(&mut m, ch('r'));
        assert_eq!(cmds, vec![Command::SampleFreeSpace(SampleKind::Baseline)]);
        assert_eq!(m.stage(), Stage::Selection);
        assert_eq!(m.selected_count(), 0);
        assert_eq!(m.cursor(), 0);
        assert_eq!(m.viewport_start(), 0);
        assert!(m.results().is_empty());
        assert!(m.log().is_empty());
        assert!(m.notice().is_none());

        update(
            &mut m,
            Event::FreeSpaceSampled {
                kind: SampleKind::Baseline,
                bytes: 1900,
            },
        );
        assert_eq!(m.start_space(), 1900);
    }

    #[test]
    fn grid_columns_follow_width() {
        assert_eq!(model_with(&["a"], 0, 24).columns(), 1);
        assert_eq!(model_with(&["a"], 23, 24).columns(), 1);
        assert_eq!(model_with(&["a"], 48, 24).columns(), 2);
        assert_eq!(model_with(&["a"], 80, 24).columns(), 3);
        assert_eq!(model_with(&["a"], 300, 24).columns(), 4);
    }

    #[test]
    fn cursor_moves_respect_grid_bounds() {
        let names: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        // 80 columns → 3 per row.
        let mut m = model_with(&refs, 80, 24);

        update(&mut m, key(KeyCode::Up));
        assert_eq!(m.cursor(), 0);
        update(&mut m, key(KeyCode::Left));
        assert_eq!(m.cursor(), 0);
        update(&mut m, ch('j'));
        assert_eq!(m.cursor(), 3);
        update(&mut m, ch('l'));
        assert_eq!(m.cursor_position(), (1, 1));
        for _ in 0..5 {
            update(&mut m, key(KeyCode::Down));
        }
        assert_eq!(m.cursor(), 9);
        update(&mut m, key(KeyCode::Right));
        assert_eq!(m.cursor(), 9);
        update(&mut m, ch('k'));
        assert_eq!(m.cursor(), 6);
    }

    #[test]
    fn viewport_follows_cursor() {
        let names: Vec<String> = (0..40).map(|i| format!("t{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        // 24 columns → 1 per row; 10 rows tall → 4 visible rows.
        let mut m = model_with(&refs, 24, 10);
        assert_eq!(m.viewport_rows(), 4);

        for _ in 0..5 {
            update(&mut m, key(KeyCode::Down));
        }
        assert_eq!(m.cursor(), 5);
        assert_eq!(m.viewport_start(), 2);

        update(&mut m, key(KeyCode::PageDown));
        assert_eq!(m.cursor(), 9);
        assert_eq!(m.viewport_start(), 6);

        update(&mut m, key(KeyCode::PageUp));
        update(&mut m, key(KeyCode::PageUp));
        update(&mut m, key(KeyCode::PageUp));
        assert_eq!(m.cursor(), 0);
        assert_eq!(m.viewport_start(), 0);

        for _ in 0..60 {
            update(&mut m, key(KeyCode::PageDown));
            let row = m.cursor_position().0;
            let start_row = m.viewport_start() / m.columns();
            assert!(row >= start_row && row < start_row + m.viewport_rows());
        }
        assert_eq!(m.cursor(), 39);
    }

    #[test]
    fn tiny_terminal_uses_fallback_viewport() {
        let m = model_with(&["a"], 80, 4);
        assert_eq!(m.viewport_rows(), 10);
        let m = model_with(&["a"], 80, 6);
        assert_eq!(m.viewport_rows(), 10);
    }

    #[test]
    fn select_all_and_deselect_all() {
        let mut m = model_with(&["a", "b", "c"], 80, 24);
        update(&mut m, ch('a'));
        assert_eq!(m.selected_count(), 3);
        update(&mut m, ch(' '));
        assert_eq!(m.selected_names(), vec!["b", "c"]);
        update(&mut m, ch('A'));
        assert_eq!(m.selected_count(), 0);
    }

    #[test]
    fn keys_on_empty_catalog_do_nothing() {
        let mut m = model_with(&[], 80, 24);
        for code in [KeyCode::Down, KeyCode::Char(' '), KeyCode::Char('a'), KeyCode::Enter] {
            assert!(update(&mut m, key(code)).is_empty());
        }
        assert_eq!(m.stage(), Stage::Selection);
    }

    #[test]
    fn log_lines_fit_the_terminal() {
        let mut m = model_with(&["a"], 20, 24);
        update(&mut m, ch(' '));
        update(&mut m, key(KeyCode::Enter));
        update(&mut m, ch('y'));
        update(&mut m, Event::ItemStarted { index: 0 });
        update(
            &mut m,
            Event::ItemCompleted {
                index: 0,
                result: failed("a", "line one\nline two\r\nand a very long tail of output"),
            },
        );
        for line in m.log().iter() {
            assert!(line.chars().count() <= 15, "{line}");
            assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn display_name_title_cases_words() {
        assert_eq!(display_name("npm"), "Npm");
        assert_eq!(display_name("old-kernels"), "Old Kernels");
        assert_eq!(display_name("crash_reports"), "Crash Reports");
        assert_eq!(display_name("macOSTrash"), "MacOSTrash");
        assert_eq!(truncate_name("Macosxcodecache", 10), "Macosxc...");
        assert_eq!(truncate_name("Npm", 10), "Npm");
    }

    #[test]
    fn release_events_are_not_special() {
        // The runtime filters key releases; the model treats any key event it
        // gets as a press.
        let mut m = model_with(&["a"], 80, 24);
        let mut ev = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        ev.kind = KeyEventKind::Press;
        update(&mut m, Event::Key(ev));
        assert!(m.is_selected(0));
    }
}
