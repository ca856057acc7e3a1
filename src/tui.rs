use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{EventKind, ProgressEvent, ProgressSink};
use crate::error::ReviewsError;

const LOGS_MAX: usize = 200;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
struct CategoryRow {
    name: String,
    state: RowState,
    detail: Option<String>,
    elapsed: Option<Duration>,
}

#[derive(Debug)]
struct AppState {
    status: String,
    rows: Vec<CategoryRow>,
    current: Option<usize>,
    logs: VecDeque<String>,
    started: Instant,
    active: bool,
}

impl AppState {
    fn new(categories: Vec<String>) -> Self {
        Self {
            status: "starting".to_string(),
            rows: categories
                .into_iter()
                .map(|name| CategoryRow {
                    name,
                    state: RowState::Pending,
                    detail: None,
                    elapsed: None,
                })
                .collect(),
            current: None,
            logs: VecDeque::new(),
            started: Instant::now(),
            active: false,
        }
    }

    fn apply(&mut self, event: ProgressEvent) {
        let message = event.message.trim().to_string();
        match event.kind {
            EventKind::CategoryStarted { index, .. } => {
                self.current = Some(index);
                if let Some(row) = self.rows.get_mut(index) {
                    row.state = RowState::Running;
                }
                self.status = message.clone();
            }
            EventKind::Item => {
                if let Some(row) = self.current_row() {
                    row.detail = Some(message.clone());
                }
            }
            EventKind::Failure => {
                if let Some(row) = self.current_row() {
                    row.detail = Some(message.clone());
                }
            }
            EventKind::CategoryFinished { ok } => {
                let elapsed = event.elapsed;
                if let Some(row) = self.current_row() {
                    row.state = if ok { RowState::Done } else { RowState::Failed };
                    row.elapsed = elapsed;
                }
            }
            EventKind::Info | EventKind::Warning | EventKind::Success => {
                self.status = message.clone();
            }
        }
        push_log(&mut self.logs, format!("[{}] {message}", timestamp()));
    }

    fn current_row(&mut self) -> Option<&mut CategoryRow> {
        self.current.and_then(|index| self.rows.get_mut(index))
    }

    fn finished_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row.state, RowState::Done | RowState::Failed))
            .count()
    }

    fn failed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.state == RowState::Failed)
            .count()
    }
}

/// Full-screen spinner view for a download batch.
pub struct Tui {
    title: String,
    state: Arc<Mutex<AppState>>,
    log_scroll: u16,
}

struct TuiProgress {
    state: Arc<Mutex<AppState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            state.apply(event);
        }
    }
}

impl Tui {
    pub fn new(title: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            title: title.into(),
            state: Arc::new(Mutex::new(AppState::new(categories))),
            log_scroll: 0,
        }
    }

    /// Runs `f` on a worker thread while drawing its progress. Esc or `q` aborts.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, ReviewsError> + Send + 'static,
        R: Send + 'static,
    {
        self.set_active(true);

        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        loop {
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, self, &state, tick))
                    .into_diagnostic()?;
            }

            if let Ok(result) = rx.try_recv() {
                self.set_active(false);
                restore_terminal()?;
                handle.join().ok();
                return result.map_err(miette::Report::new);
            }

            if event::poll(Duration::from_millis(100)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        self.set_active(false);
        restore_terminal()?;
        Err(miette::Report::msg("aborted"))
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Up => {
                self.scroll_logs(1);
                false
            }
            KeyCode::Down => {
                self.scroll_logs(-1);
                false
            }
            _ => false,
        }
    }

    fn set_active(&self, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.active = active;
            if active {
                state.started = Instant::now();
            }
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max = self.state.lock().map(|state| state.logs.len()).unwrap_or(0);
        let max_scroll = max.saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }
}

fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    io::stdout()
        .execute(LeaveAlternateScreen)
        .into_diagnostic()?;
    Ok(())
}

fn draw_ui(frame: &mut ratatui::Frame, tui: &Tui, state: &AppState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(tui, state, tick), chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let visible = main[0].height.saturating_sub(2) as usize;
    frame.render_widget(draw_categories(state, tick, visible), main[0]);
    frame.render_widget(draw_logs_view(state, tui.log_scroll, main[1].height), main[1]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Esc/q abort   ↑/↓ scroll logs",
        Style::default().fg(Color::Gray),
    )));
    frame.render_widget(footer, chunks[2]);
}

fn draw_header(tui: &Tui, state: &AppState, tick: usize) -> Paragraph<'static> {
    let total = state.rows.len();
    let finished = state.finished_count();
    let percent = if total == 0 {
        0
    } else {
        (finished * 100 / total) as u8
    };
    let spinner = if state.active {
        SPINNER[tick % SPINNER.len()]
    } else {
        " "
    };
    let title_line = Line::from(vec![
        Span::styled(
            "AMAZON REVIEWS 2023",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   "),
        Span::raw(tui.title.clone()),
        Span::raw("   "),
        Span::styled(spinner, Style::default().fg(Color::Green)),
    ]);
    let progress_line = Line::from(vec![
        Span::raw(progress_bar(percent)),
        Span::raw(format!(" {finished}/{total}")),
        Span::styled(
            format!("   failed: {}", state.failed_count()),
            Style::default().fg(if state.failed_count() > 0 {
                Color::Red
            } else {
                Color::Gray
            }),
        ),
        Span::styled(
            format!("   elapsed: {}s", state.started.elapsed().as_secs()),
            Style::default().fg(Color::Gray),
        ),
    ]);
    Paragraph::new(vec![title_line, progress_line])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_categories(state: &AppState, tick: usize, visible: usize) -> Paragraph<'static> {
    let mut lines = Vec::with_capacity(state.rows.len());
    for row in &state.rows {
        let (mark, color) = match row.state {
            RowState::Pending => ("·".to_string(), Color::DarkGray),
            RowState::Running => (SPINNER[tick % SPINNER.len()].to_string(), Color::Cyan),
            RowState::Done => ("✓".to_string(), Color::Green),
            RowState::Failed => ("✗".to_string(), Color::Red),
        };
        let mut spans = vec![
            Span::styled(format!("{mark} "), Style::default().fg(color)),
            Span::styled(row.name.clone(), Style::default().fg(color)),
        ];
        if let Some(elapsed) = row.elapsed {
            spans.push(Span::styled(
                format!(" ({:.1}s)", elapsed.as_secs_f64()),
                Style::default().fg(Color::Gray),
            ));
        }
        if let Some(detail) = &row.detail {
            if row.state != RowState::Pending {
                spans.push(Span::styled(
                    format!("  {detail}"),
                    Style::default().fg(Color::Gray),
                ));
            }
        }
        lines.push(Line::from(spans));
    }

    let scroll = state
        .current
        .map(|index| index.saturating_sub(visible / 2))
        .unwrap_or(0);
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .title(format!(" {} ", state.status)),
        )
        .scroll((scroll as u16, 0))
}

fn draw_logs_view(state: &AppState, scroll: u16, height: u16) -> Paragraph<'static> {
    let total = state.logs.len();
    let visible = height.saturating_sub(1).max(1) as usize;
    let start = total.saturating_sub(scroll as usize + visible);
    let mut lines = Vec::with_capacity(visible + 1);
    lines.push(Line::from(Span::styled(
        "LOGS",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    for line in state.logs.iter().skip(start).take(visible) {
        lines.push(Line::from(line.clone()));
    }
    Paragraph::new(lines)
        .block(Block::default())
        .wrap(Wrap { trim: true })
}

fn progress_bar(percent: u8) -> String {
    let total = 20;
    let filled = (percent.min(100) as usize * total) / 100;
    let mut out = String::from("[");
    for i in 0..total {
        out.push(if i < filled { '#' } else { '.' });
    }
    out.push(']');
    out
}

fn push_log(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(item);
    while buffer.len() > LOGS_MAX {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, message: &str) -> ProgressEvent {
        ProgressEvent {
            kind,
            category: None,
            message: message.to_string(),
            elapsed: None,
        }
    }

    #[test]
    fn rows_follow_category_events() {
        let mut state = AppState::new(vec!["Books".to_string(), "Software".to_string()]);
        state.apply(event(
            EventKind::CategoryStarted { index: 0, total: 2 },
            "Processing Books",
        ));
        assert_eq!(state.rows[0].state, RowState::Running);
        state.apply(event(EventKind::Item, "[DONE] raw_review_Books downloaded"));
        state.apply(event(EventKind::CategoryFinished { ok: true }, "Finished Books"));
        state.apply(event(
            EventKind::CategoryStarted { index: 1, total: 2 },
            "Processing Software",
        ));
        state.apply(event(EventKind::CategoryFinished { ok: false }, "Finished Software"));

        assert_eq!(state.rows[0].state, RowState::Done);
        assert_eq!(
            state.rows[0].detail.as_deref(),
            Some("[DONE] raw_review_Books downloaded")
        );
        assert_eq!(state.rows[1].state, RowState::Failed);
        assert_eq!(state.finished_count(), 2);
        assert_eq!(state.failed_count(), 1);
        assert_eq!(state.logs.len(), 5);
    }

    #[test]
    fn log_buffer_is_bounded() {
        let mut logs = VecDeque::new();
        for i in 0..(LOGS_MAX + 5) {
            push_log(&mut logs, i.to_string());
        }
        assert_eq!(logs.len(), LOGS_MAX);
        assert_eq!(logs.front().map(String::as_str), Some("5"));
    }

    #[test]
    fn progress_bar_fills() {
        assert_eq!(progress_bar(0), "[....................]");
        assert_eq!(progress_bar(50), "[##########..........]");
        assert_eq!(progress_bar(100), "[####################]");
    }
}
