pub mod log;
pub mod model;

use std::collections::VecDeque;
use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self as term, Event as TermEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use time::OffsetDateTime;

use crate::core::CleanupResult;
use crate::engine::{Engine, QuietPanics};
use crate::logs::{self, RunMode, RunRecord};
use crate::ui::{format_bytes, pad_end_display};

use self::model::{Command, Event, ITEM_WIDTH, Item, Model, SampleKind, Stage};
pub use self::model::{display_name, truncate_name};

const TICK_RATE: Duration = Duration::from_millis(200);
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone)]
pub struct TuiOptions {
    pub home_dir: PathBuf,
    pub color: bool,
    pub log_capacity: usize,
    pub logs_enabled: bool,
}

pub fn run(engine: Engine, opts: TuiOptions) -> Result<()> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to the alternate screen")?;

    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("initializing the terminal")?;
    terminal.clear().ok();

    let quiet = QuietPanics::install();
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut terminal, &engine, &opts)
    }));

    let _ = terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(Ok(Some(worker))) => {
            wait_for_worker(worker, &mut io::stderr());
            Ok(())
        }
        Ok(Ok(None)) => Ok(()),
        Ok(Err(err)) => Err(err),
        Err(_) => {
            let cause = quiet
                .last_message()
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow::anyhow!(
                "the interactive UI panicked (terminal state has been restored): {cause}"
            ))
        }
    }
}

/// The single cleanup running in the background.
struct Worker {
    index: usize,
    name: String,
    rx: mpsc::Receiver<CleanupResult>,
    handle: thread::JoinHandle<()>,
    started: Instant,
}

enum WorkerPoll {
    Finished(Event),
    Running(Worker),
}

fn spawn_cleanup(engine: &Engine, index: usize, name: String) -> Worker {
    let (tx, rx) = mpsc::channel::<CleanupResult>();
    let engine = engine.clone();
    let task = name.clone();
    let handle = thread::spawn(move || {
        let _ = tx.send(engine.run(&task));
    });
    Worker {
        index,
        name,
        rx,
        handle,
        started: Instant::now(),
    }
}

/// Turns a finished worker into `ItemCompleted`. A worker that went away
/// without sending is reported as a failed cleanup.
fn poll_worker(worker: Worker) -> WorkerPoll {
    let result = match worker.rx.try_recv() {
        Ok(result) => result,
        Err(mpsc::TryRecvError::Empty) => return WorkerPoll::Running(worker),
        Err(mpsc::TryRecvError::Disconnected) => CleanupResult::failed(
            worker.name.as_str(),
            format!("cleanup worker for {} stopped without a result", worker.name),
            worker.started.elapsed(),
        ),
    };
    let _ = worker.handle.join();
    WorkerPoll::Finished(Event::ItemCompleted {
        index: worker.index,
        result,
    })
}

fn wait_for_worker(worker: Worker, out: &mut dyn Write) {
    let _ = writeln!(
        out,
        "waiting for {} cleanup to finish...",
        display_name(&worker.name)
    );
    let _ = worker.handle.join();
}

enum Flow {
    Continue,
    Quit,
}

/// Model plus the effects it asks for: the event queue, the worker and the
/// run log timestamp.
struct Session<'a> {
    engine: &'a Engine,
    opts: &'a TuiOptions,
    app: Model,
    queue: VecDeque<Event>,
    worker: Option<Worker>,
    run_started: OffsetDateTime,
}

impl<'a> Session<'a> {
    fn new(engine: &'a Engine, opts: &'a TuiOptions, width: u16, height: u16) -> Self {
        let items = engine
            .registry()
            .types()
            .into_iter()
            .map(|ty| Item {
                name: ty.name,
                requires_root: ty.requires_root,
            })
            .collect();
        let app = Model::new(items, opts.log_capacity, crate::platform::is_root());
        let queue = VecDeque::from([
            Event::Resize { width, height },
            sample(engine, SampleKind::Baseline),
        ]);
        Self {
            engine,
            opts,
            app,
            queue,
            worker: None,
            run_started: OffsetDateTime::now_utc(),
        }
    }

    fn dispatch(&mut self) -> Flow {
        while let Some(ev) = self.queue.pop_front() {
            for cmd in model::update(&mut self.app, ev) {
                match cmd {
                    Command::Quit => return Flow::Quit,
                    Command::Emit(ev) => self.queue.push_back(ev),
                    Command::RunCleanup { index, name } => {
                        if index == 0 {
                            self.run_started = OffsetDateTime::now_utc();
                        }
                        self.worker = Some(spawn_cleanup(self.engine, index, name));
                    }
                    Command::SampleFreeSpace(kind) => {
                        self.queue.push_back(sample(self.engine, kind));
                    }
                    Command::PersistRun => {
                        if self.opts.logs_enabled {
                            let logged = persist_run(&self.app, self.opts, self.run_started);
                            self.queue.push_back(logged);
                        }
                    }
                }
            }
        }
        Flow::Continue
    }

    /// True when the worker finished and its completion was queued.
    fn collect_worker(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        match poll_worker(worker) {
            WorkerPoll::Finished(ev) => {
                self.queue.push_back(ev);
                true
            }
            WorkerPoll::Running(worker) => {
                self.worker = Some(worker);
                false
            }
        }
    }
}

/// Drives the model until it asks to quit. Returns the worker still running
/// at that point, if any.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &Engine,
    opts: &TuiOptions,
) -> Result<Option<Worker>> {
    let size = terminal.size().context("reading the terminal size")?;
    let mut session = Session::new(engine, opts, size.width, size.height);
    let mut last_tick = Instant::now();

    loop {
        if let Flow::Quit = session.dispatch() {
            return Ok(session.worker.take());
        }

        terminal
            .draw(|f| draw(f, &session.app, opts.color))
            .context("drawing the screen")?;

        if session.collect_worker() {
            continue;
        }

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if term::poll(timeout).context("waiting for terminal events")? {
            match term::read().context("reading a terminal event")? {
                TermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    session.queue.push_back(Event::Key(key));
                }
                TermEvent::Resize(width, height) => {
                    session.queue.push_back(Event::Resize { width, height });
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            session.queue.push_back(Event::Tick);
            last_tick = Instant::now();
        }
    }
}

fn sample(engine: &Engine, kind: SampleKind) -> Event {
    Event::FreeSpaceSampled {
        kind,
        bytes: engine.free_bytes(),
    }
}

fn persist_run(model: &Model, opts: &TuiOptions, started_at: OffsetDateTime) -> Event {
    let record = RunRecord {
        mode: RunMode::Tui,
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        free_before: model.start_space(),
        free_after: model.end_space(),
        results: model.results(),
        skipped: &[],
    };
    let outcome = logs::write_run_log(&opts.home_dir, &record)
        .map(|path| logs::display_path(&path, &opts.home_dir))
        .map_err(|err| format!("{err:#}"));
    Event::RunLogged(outcome)
}

fn styled(color: bool, style: Style) -> Style {
    if color { style } else { Style::default() }
}

fn draw(f: &mut ratatui::Frame, model: &Model, color: bool) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], model, color);
    draw_footer(f, chunks[2], model);

    match model.stage() {
        Stage::Selection => draw_selection(f, chunks[1], model, color),
        Stage::Confirmation => draw_confirmation(f, chunks[1], model, color),
        Stage::Execution => draw_execution(f, chunks[1], model, color),
        Stage::Results => draw_results(f, chunks[1], model, color),
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, model: &Model, color: bool) {
    let title = match model.stage() {
        Stage::Selection => "broom: select cleanup types",
        Stage::Confirmation => "broom: confirm",
        Stage::Execution => "broom: cleaning",
        Stage::Results => "broom: results",
    };
    let mut spans = vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            styled(color, Style::default().fg(Color::DarkGray)),
        ),
    ];
    if !model.is_root() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "not running as root: items marked * will likely fail",
            styled(color, Style::default().fg(Color::Yellow)),
        ));
    }

    let w = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, model: &Model) {
    let (line1, line2) = match model.stage() {
        Stage::Selection => (
            "↑↓←→/hjkl move | PgUp/PgDn page | Space toggle | a all | A none",
            "Enter continue | q quit",
        ),
        Stage::Confirmation => ("y/Enter start cleanup | n/Esc back", "q quit"),
        Stage::Execution => ("cleaning one item at a time", "q quit (the running item finishes first)"),
        Stage::Results => ("r start over", "q/Enter quit"),
    };
    let w = Paragraph::new(Text::from(vec![Line::from(line1), Line::from(line2)]))
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    f.render_widget(w, area);
}

fn cell_name(item: &Item, is_root: bool) -> String {
    let mut name = display_name(&item.name);
    if item.requires_root && !is_root {
        name.push('*');
    }
    truncate_name(&name, ITEM_WIDTH - 5)
}

fn draw_selection(f: &mut ratatui::Frame, area: Rect, model: &Model, color: bool) {
    let cols = model.columns();
    let items = model.items();
    let mut lines = vec![Line::from(Span::styled(
        format!("{} of {} selected", model.selected_count(), items.len()),
        styled(color, Style::default().fg(Color::DarkGray)),
    ))];

    if items.is_empty() {
        lines.push(Line::from("no cleanup types are available"));
    }

    let start_row = model.viewport_start() / cols;
    let end_row = (start_row + model.viewport_rows()).min(model.total_rows());
    for row in start_row..end_row {
        let mut spans = Vec::with_capacity(cols);
        for col in 0..cols {
            let index = row * cols + col;
            let Some(item) = items.get(index) else {
                break;
            };
            let on_cursor = index == model.cursor();
            let mark = if model.is_selected(index) { "[x]" } else { "[ ]" };
            let pointer = if on_cursor { ">" } else { " " };
            let text = format!("{pointer}{mark} {}", cell_name(item, model.is_root()));
            let mut style = Style::default();
            if on_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if model.is_selected(index) {
                style = style.patch(styled(color, Style::default().fg(Color::Green)));
            }
            spans.push(Span::styled(pad_end_display(&text, ITEM_WIDTH), style));
        }
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_confirmation(f: &mut ratatui::Frame, area: Rect, model: &Model, color: bool) {
    let mut lines = vec![
        Line::from("The following cleanups will run, in this order:"),
        Line::from(""),
    ];
    for (index, item) in model.items().iter().enumerate() {
        if !model.is_selected(index) {
            continue;
        }
        let mut spans = vec![Span::raw("  • "), Span::raw(display_name(&item.name))];
        if item.requires_root {
            spans.push(Span::styled(
                " (needs root)",
                styled(color, Style::default().fg(Color::Yellow)),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Free space now: "),
        Span::styled(
            format_bytes(model.start_space()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Proceed? [y/N]",
        Style::default().add_modifier(Modifier::BOLD),
    )));

    let w = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Confirm"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, area);
}

fn status_cell(model: &Model, index: usize, name: &str, color: bool) -> Span<'static> {
    let label = truncate_name(&display_name(name), ITEM_WIDTH - 3);
    let (mark, style) = match model.results().get(index) {
        Some(r) if r.success => ("✓", Style::default().fg(Color::Green)),
        Some(_) => ("✗", Style::default().fg(Color::Red)),
        None if model.in_flight() == Some(index) => {
            let frame = SPINNER[(model.tick() as usize) % SPINNER.len()];
            (frame, Style::default().fg(Color::Cyan))
        }
        None => ("·", Style::default().fg(Color::DarkGray)),
    };
    Span::styled(
        pad_end_display(&format!("{mark} {label}"), ITEM_WIDTH),
        styled(color, style),
    )
}

fn grid_lines<'a>(
    names: &[String],
    cols: usize,
    mut cell: impl FnMut(usize, &str) -> Span<'a>,
) -> Vec<Line<'a>> {
    names
        .chunks(cols)
        .enumerate()
        .map(|(row, chunk)| {
            let spans: Vec<Span> = chunk
                .iter()
                .enumerate()
                .map(|(col, name)| cell(row * cols + col, name.as_str()))
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn draw_execution(f: &mut ratatui::Frame, area: Rect, model: &Model, color: bool) {
    let plan = model.plan();
    let cols = model.columns();
    let grid_rows = plan.len().div_ceil(cols) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(grid_rows.saturating_add(2)),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let grid = grid_lines(plan, cols, |index, name| status_cell(model, index, name, color));
    f.render_widget(
        Paragraph::new(Text::from(grid)).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let done = model.results().len();
    let ratio = if plan.is_empty() {
        1.0
    } else {
        done as f64 / plan.len() as f64
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(styled(color, Style::default().fg(Color::Cyan)))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{done}/{}", plan.len()));
    f.render_widget(gauge, chunks[1]);

    let visible = usize::from(chunks[2].height.saturating_sub(2));
    let log: Vec<Line> = model.log().tail(visible).map(Line::from).collect();
    f.render_widget(
        Paragraph::new(Text::from(log)).block(Block::default().borders(Borders::ALL).title("Log")),
        chunks[2],
    );
}

fn draw_results(f: &mut ratatui::Frame, area: Rect, model: &Model, color: bool) {
    let summary = model.summary();
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(format!("Free space before: {}", format_bytes(summary.free_before))),
        Line::from(format!("Free space after:  {}", format_bytes(summary.free_after))),
        Line::from(vec![
            Span::raw("Total freed:       "),
            Span::styled(format_bytes(summary.total_freed), bold),
        ]),
        Line::from(format!(
            "Sum of items:      {}",
            format_bytes(summary.items_freed)
        )),
        Line::from(format!(
            "Succeeded:         {}/{}",
            summary.succeeded,
            summary.total()
        )),
        Line::from(""),
    ];

    let names: Vec<String> = model.results().iter().map(|r| r.name.clone()).collect();
    lines.extend(grid_lines(&names, model.columns(), |index, name| {
        let label = truncate_name(&display_name(name), ITEM_WIDTH - 14);
        let (text, style) = match model.results().get(index) {
            Some(r) if r.success => (
                format!("✓ {label} {}", format_bytes(r.space_freed)),
                Style::default().fg(Color::Green),
            ),
            _ => (format!("✗ {label} Failed"), Style::default().fg(Color::Red)),
        };
        Span::styled(pad_end_display(&text, ITEM_WIDTH), styled(color, style))
    }));

    if summary.failed > 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} cleanup(s) failed", summary.failed),
            styled(color, Style::default().fg(Color::Red)),
        )));
    }
    if let Some(notice) = model.notice() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            notice.to_string(),
            styled(color, Style::default().fg(Color::DarkGray)),
        )));
    }

    let w = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Cleanup Summary"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, area);
}
