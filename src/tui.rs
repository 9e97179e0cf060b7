use crate::buffer::{self, Entry, SharedBuffer};
use crate::editor::EditorCommand;
use crate::session::{PopOutcome, Session};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::warn;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(50);
const SPINNER: [&str; 4] = ["/", "-", "\\", "|"];
const PROMPT_LABEL: &str = "To search: ";
const PROMPT_MAX: usize = 256;
const TAB: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LineDown,
    LineUp,
    PageDown,
    PageUp,
    Open,
    Subsearch,
    QuitOrPop,
    Quit,
}

/// Key bindings of the result view.
pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Action::Quit);
    }
    let action = match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::LineDown,
        KeyCode::Char('k') | KeyCode::Up => Action::LineUp,
        KeyCode::Char('J') | KeyCode::PageDown => Action::PageDown,
        KeyCode::Char('K') | KeyCode::PageUp => Action::PageUp,
        KeyCode::Char('p') | KeyCode::Enter => Action::Open,
        KeyCode::Char('/') => Action::Subsearch,
        KeyCode::Char('q') | KeyCode::Esc => Action::QuitOrPop,
        _ => return None,
    };
    Some(action)
}

/// How the UI ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    NothingFound,
}

/// Work the event loop must do outside of the key handler.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    None,
    OpenEditor {
        file: PathBuf,
        line: usize,
        pattern: String,
    },
}

enum Mode {
    Browse,
    Prompt(String),
}

struct App {
    session: Session,
    mode: Mode,
    message: Option<String>,
    spin: usize,
    page_height: usize,
    should_quit: bool,
}

impl App {
    fn new(session: Session) -> Self {
        Self {
            session,
            mode: Mode::Browse,
            message: None,
            spin: 0,
            page_height: 1,
            should_quit: false,
        }
    }

    fn current_buffer(&self) -> SharedBuffer {
        Arc::clone(self.session.current().buffer())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Effect::None;
        }
        match &mut self.mode {
            Mode::Prompt(input) => {
                match key.code {
                    KeyCode::Enter => {
                        let pattern = std::mem::take(input);
                        self.mode = Mode::Browse;
                        self.submit_subsearch(&pattern);
                    }
                    KeyCode::Esc => self.mode = Mode::Browse,
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) if input.chars().count() < PROMPT_MAX => input.push(c),
                    _ => {}
                }
                Effect::None
            }
            Mode::Browse => match action_for(key) {
                Some(action) => self.apply(action),
                None => Effect::None,
            },
        }
    }

    fn apply(&mut self, action: Action) -> Effect {
        let height = self.page_height;
        let buffer = self.current_buffer();
        let rows = buffer::lock(&buffer);
        let context = self.session.current_mut();
        let nav = &mut context.nav;
        match action {
            Action::LineDown => nav.line_down(&*rows, height),
            Action::LineUp => nav.line_up(&*rows, height),
            Action::PageDown => nav.page_down(&*rows, height),
            Action::PageUp => nav.page_up(&*rows, height),
            Action::Open => {
                let selected = nav.selected(&*rows);
                let target = selected
                    .and_then(|i| rows.locate(i))
                    .map(|(file, line)| Effect::OpenEditor {
                        file: file.to_path_buf(),
                        line,
                        pattern: context.pattern().to_string(),
                    });
                return target.unwrap_or(Effect::None);
            }
            Action::Subsearch => {
                drop(rows);
                self.message = None;
                self.mode = Mode::Prompt(String::new());
            }
            Action::QuitOrPop => {
                drop(rows);
                self.message = None;
                if self.session.pop_current() == PopOutcome::EndSession {
                    self.should_quit = true;
                }
            }
            Action::Quit => self.should_quit = true,
        }
        Effect::None
    }

    fn submit_subsearch(&mut self, pattern: &str) {
        match self.session.push_subsearch(pattern) {
            Ok(_) => self.message = None,
            Err(err) => self.message = Some(one_line(&err.to_string())),
        }
    }

    fn resize(&mut self, height: usize) {
        self.page_height = height.max(1);
        let buffer = self.current_buffer();
        let rows = buffer::lock(&buffer);
        self.session
            .current_mut()
            .nav
            .resize(&*rows, self.page_height);
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());
        self.page_height = usize::from(chunks[0].height).max(1);

        let buffer = self.current_buffer();
        let (lines, hits) = {
            let rows = buffer::lock(&buffer);
            let nav = &mut self.session.current_mut().nav;
            nav.normalize(&*rows, self.page_height);
            let cursor = nav.selected(&*rows);
            let start = nav.offset();
            let end = (start + self.page_height).min(rows.len());
            let lines: Vec<Line> = (start..end)
                .map(|i| render_entry(&rows.entries()[i], Some(i) == cursor))
                .collect();
            (lines, rows.hits())
        };
        f.render_widget(Paragraph::new(lines), chunks[0]);

        let live = self.session.primary().is_live();
        if live {
            self.spin = self.spin.wrapping_add(1);
        }
        f.render_widget(self.status_line(live, hits), chunks[1]);

        if let Mode::Prompt(input) = &self.mode {
            let area = prompt_area(f.area());
            f.render_widget(Clear, area);
            let prompt = Paragraph::new(format!("{PROMPT_LABEL}{input}"))
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(prompt, area);
        }
    }

    fn status_line(&self, live: bool, hits: usize) -> Line<'static> {
        let walk = if live {
            SPINNER[self.spin % SPINNER.len()]
        } else {
            "Done."
        };
        let mut spans = vec![Span::styled(
            breadcrumb(&self.session),
            Style::default().fg(Color::DarkGray),
        )];
        if let Some(message) = &self.message {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(message.clone(), Style::default().fg(Color::Red)));
        }
        spans.push(Span::raw(format!("  Hits: {hits}  {walk}")));
        Line::from(spans)
    }
}

/// `foo > bar > baz`: the primary pattern then each subsearch.
fn breadcrumb(session: &Session) -> String {
    session.patterns().collect::<Vec<_>>().join(" > ")
}

/// Error text on one line for the status bar.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_entry(entry: &Entry, selected: bool) -> Line<'static> {
    match entry {
        Entry::FileHeader { path } => Line::from(Span::styled(
            display_path(path),
            Style::default().fg(Color::Green).bold(),
        )),
        Entry::MatchLine { line_number, text } => {
            let line = Line::from(vec![
                Span::styled(format!("{line_number}:"), Style::default().fg(Color::Yellow)),
                Span::raw(sanitize(text)),
            ]);
            if selected {
                line.reversed()
            } else {
                line
            }
        }
    }
}

/// Path as shown in a header row: no leading `./`, no repeated separators.
pub fn display_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    match out.strip_prefix("./") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => out,
    }
}

/// Make file text safe to print: tabs expand, other control characters blank out.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str(TAB),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

fn prompt_area(area: Rect) -> Rect {
    let width = 50.min(area.width);
    let height = 3.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Puts the terminal back however the UI is left.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        install_panic_hook();
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            previous(info);
        }));
    });
}

/// Leave the UI while `f` runs (the editor owns the terminal meanwhile).
fn suspended<B, F, R>(terminal: &mut Terminal<B>, f: F) -> io::Result<R>
where
    B: Backend,
    F: FnOnce() -> R,
{
    restore_terminal();
    let result = f();
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(result)
}

/// Drive the UI until the user quits. A fatal walker error ends the loop with an error.
pub fn run(session: Session, editor: &EditorCommand) -> Result<Exit> {
    let guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut app = App::new(session);

    let exit = loop {
        if let Some(err) = app.session.take_walk_error() {
            drop(guard);
            return Err(err.into());
        }
        if app.session.depth() == 0 && app.session.is_finished_empty() {
            break Exit::NothingFound;
        }

        terminal.draw(|f| app.draw(f))?;

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Effect::OpenEditor {
                        file,
                        line,
                        pattern,
                    } = app.handle_key(key)
                    {
                        let outcome =
                            suspended(&mut terminal, || editor.launch(&file, line, &pattern))?;
                        if let Err(err) = outcome {
                            warn!("{err:#}");
                            app.message = Some(one_line(&err.to_string()));
                        }
                    }
                }
                Event::Resize(_, rows) => app.resize(usize::from(rows).saturating_sub(1)),
                _ => {}
            }
        }

        if app.should_quit {
            break Exit::Quit;
        }
    };

    drop(guard);
    app.session.teardown_all();
    Ok(exit)
}
