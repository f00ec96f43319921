//! Interactive TUI for browsing desserts.

use crate::MealSource;
use crate::state::{Catalog, Detail, LinkAction, LoadPhase, open_external_link};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const PAGE: u16 = 10;

// ============================================================================
// Public entry points
// ============================================================================

/// Run the TUI starting from the catalog
pub fn run_catalog(source: MealSource, query: Option<String>) -> Result<()> {
    let app = App::new_catalog(source, query);
    app.run()
}

/// Run the TUI starting from a single recipe
pub fn run_detail(source: MealSource, id: &str) -> Result<()> {
    let app = App::new_detail(source, id);
    app.run()
}

// ============================================================================
// App state
// ============================================================================

struct App {
    source: MealSource,
    screen: Screen,
    should_quit: bool,
    pending_action: Option<PendingAction>,
}

enum Screen {
    /// Transient placeholder used when taking ownership of the screen via `mem::replace`.
    Empty,
    Catalog(CatalogScreen),
    Detail(DetailScreen),
}

enum PendingAction {
    OpenUrl { url: String },
}

struct CatalogScreen {
    catalog: Catalog,
    list_state: ListState,
    /// Typed characters edit the query instead of navigating.
    searching: bool,
}

impl CatalogScreen {
    fn new(catalog: Catalog) -> Self {
        let mut screen = Self {
            catalog,
            list_state: ListState::default(),
            searching: false,
        };
        screen.reset_selection();
        screen
    }

    /// Select the first visible row, or nothing when the list is empty.
    fn reset_selection(&mut self) {
        let first = (!self.catalog.visible().is_empty()).then_some(0);
        self.list_state.select(first);
    }
}

struct DetailScreen {
    /// Shown in the header until the record arrives.
    title: String,
    detail: Detail,
    /// Index into `detail.actions()`
    selected_action: usize,
    scroll: u16,
    /// The catalog to return to on Esc, untouched while the detail is open.
    parent: Option<Box<CatalogScreen>>,
}

impl DetailScreen {
    fn selected_action(&self) -> Option<LinkAction> {
        self.detail.actions().into_iter().nth(self.selected_action)
    }

    fn select_next(&mut self) {
        let count = self.detail.actions().len();
        wrapping_nav(&mut self.selected_action, count, true);
    }

    fn select_prev(&mut self) {
        let count = self.detail.actions().len();
        wrapping_nav(&mut self.selected_action, count, false);
    }
}

/// Advance or retreat a wrapping index within `0..count`.
fn wrapping_nav(index: &mut usize, count: usize, forward: bool) {
    if count > 0 {
        *index = if forward {
            (*index + 1) % count
        } else {
            (*index + count - 1) % count
        };
    }
}

/// Clamped (non-wrapping) movement on a `ListState` within `0..count`.
fn list_nav(state: &mut ListState, count: usize, forward: bool) {
    if let Some(selected) = state.selected() {
        if forward {
            if selected < count.saturating_sub(1) {
                state.select(Some(selected + 1));
            }
        } else if selected > 0 {
            state.select(Some(selected - 1));
        }
    }
}

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

/// While alive, panics restore the terminal before the panic message prints.
/// Dropping it reinstalls the hook that was active before.
struct TerminalPanicHook {
    previous: Arc<PanicHook>,
}

impl TerminalPanicHook {
    fn install() -> Self {
        let previous: Arc<PanicHook> = Arc::from(std::panic::take_hook());
        let chained = Arc::clone(&previous);
        std::panic::set_hook(Box::new(move |info| {
            let _ = ratatui::try_restore();
            let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
            chained(info);
        }));
        Self { previous }
    }
}

impl Drop for TerminalPanicHook {
    fn drop(&mut self) {
        // The hook cannot be replaced from a panicking thread.
        if std::thread::panicking() {
            return;
        }
        let previous = Arc::clone(&self.previous);
        std::panic::set_hook(Box::new(move |info| previous(info)));
    }
}

fn wait_for_enter() {
    // ratatui::restore() leaves the alternate screen and disables raw mode but
    // does not re-show the cursor, so we do it explicitly here.
    let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
    println!("\nPress Enter to return to TUI...");
    let _ = std::io::stdin().read_line(&mut String::new());
}

// ============================================================================
// App implementation
// ============================================================================

impl App {
    fn new_catalog(source: MealSource, query: Option<String>) -> Self {
        let mut catalog = Catalog::new();
        if let Some(query) = query {
            catalog.set_query(query);
        }
        Self {
            source,
            screen: Screen::Catalog(CatalogScreen::new(catalog)),
            should_quit: false,
            pending_action: None,
        }
    }

    fn new_detail(source: MealSource, id: &str) -> Self {
        Self {
            source,
            screen: Screen::Detail(DetailScreen {
                title: id.to_string(),
                detail: Detail::new(id),
                selected_action: 0,
                scroll: 0,
                parent: None,
            }),
            should_quit: false,
            pending_action: None,
        }
    }

    fn run(mut self) -> Result<()> {
        let _hook = TerminalPanicHook::install();

        let result = self.run_inner();

        // Always restore the terminal, even if run_inner returned an error.
        ratatui::restore();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);

        result
    }

    fn run_inner(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();

        loop {
            terminal.draw(|frame| self.render(frame))?;

            // The loading presentation is on screen now; resolve the pending
            // fetch and redraw with its result before waiting for input.
            if self.process_loading() {
                continue;
            }

            if let Some(action) = self.pending_action.take() {
                ratatui::restore();
                self.execute_action(&action);
                terminal = ratatui::init();
                continue;
            }

            if event::poll(Duration::from_millis(100))?
                && let Event::Key(key) = event::read()?
            {
                // Windows compatibility: only handle Press events
                if key.kind == KeyEventKind::Press {
                    // Ctrl+C quits immediately
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break;
                    }
                    self.handle_key(key);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Run the current screen's fetch if it has not happened yet.
    /// Returns whether a fetch ran.
    fn process_loading(&mut self) -> bool {
        match &mut self.screen {
            Screen::Empty => false,
            Screen::Catalog(state) => {
                let fetched = state.catalog.ensure_loaded(&self.source);
                if fetched {
                    state.reset_selection();
                }
                fetched
            }
            Screen::Detail(state) => {
                let fetched = state.detail.ensure_loaded(&self.source);
                if fetched && let Some(record) = state.detail.record() {
                    state.title = record.name.clone();
                }
                fetched
            }
        }
    }

    fn execute_action(&self, action: &PendingAction) {
        match action {
            PendingAction::OpenUrl { url } => {
                if let Err(e) = open_external_link(url) {
                    warn!(url, error = %e, "failed to open browser");
                    println!("Failed to open browser: {}", e);
                    println!("URL: {}", url);
                    wait_for_enter();
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let searching = matches!(&self.screen, Screen::Catalog(state) if state.searching);
        match self.screen {
            Screen::Empty => {}
            Screen::Catalog(_) if searching => self.handle_search_key(key),
            Screen::Catalog(_) => self.handle_catalog_key(key.code),
            Screen::Detail(_) => self.handle_detail_key(key.code),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let Screen::Catalog(state) = &mut self.screen else {
            return;
        };

        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                state.catalog.clear_query();
                state.reset_selection();
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                state.catalog.push_query_char(c);
                state.reset_selection();
            }
            KeyCode::Backspace => {
                state.catalog.pop_query_char();
                state.reset_selection();
            }
            KeyCode::Up => {
                let count = state.catalog.visible().len();
                list_nav(&mut state.list_state, count, false);
            }
            KeyCode::Down => {
                let count = state.catalog.visible().len();
                list_nav(&mut state.list_state, count, true);
            }
            KeyCode::Enter | KeyCode::Esc => state.searching = false,
            _ => {}
        }
    }

    fn handle_catalog_key(&mut self, key: KeyCode) {
        let Screen::Catalog(state) = &mut self.screen else {
            return;
        };

        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                let count = state.catalog.visible().len();
                list_nav(&mut state.list_state, count, false);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let count = state.catalog.visible().len();
                list_nav(&mut state.list_state, count, true);
            }
            KeyCode::Char('/') => state.searching = true,
            KeyCode::Char('r') if state.catalog.phase() == LoadPhase::Failed => {
                state.catalog.request_reload();
            }
            KeyCode::Enter => self.open_selected_entry(),
            KeyCode::Esc if !state.catalog.query().is_empty() => {
                state.catalog.clear_query();
                state.reset_selection();
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    /// Push a detail screen for the selected row, keeping the catalog
    /// underneath so Esc returns without refetching.
    fn open_selected_entry(&mut self) {
        let catalog_screen = match std::mem::replace(&mut self.screen, Screen::Empty) {
            Screen::Catalog(catalog_screen) => catalog_screen,
            other => {
                self.screen = other;
                return;
            }
        };

        let selected = catalog_screen.list_state.selected().and_then(|index| {
            catalog_screen
                .catalog
                .visible()
                .get(index)
                .map(|entry| (entry.id.clone(), entry.name.clone()))
        });
        let Some((id, name)) = selected else {
            self.screen = Screen::Catalog(catalog_screen);
            return;
        };

        self.screen = Screen::Detail(DetailScreen {
            title: name,
            detail: Detail::new(id),
            selected_action: 0,
            scroll: 0,
            parent: Some(Box::new(catalog_screen)),
        });
    }

    fn handle_detail_key(&mut self, key: KeyCode) {
        let Screen::Detail(state) = &mut self.screen else {
            return;
        };

        match key {
            KeyCode::Tab => state.select_next(),
            KeyCode::BackTab => state.select_prev(),
            KeyCode::Enter => {
                if let Some(action) = state.selected_action() {
                    self.pending_action = Some(PendingAction::OpenUrl {
                        url: action.url.to_string(),
                    });
                }
            }
            KeyCode::Down | KeyCode::Char('j') => state.scroll = state.scroll.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => state.scroll = state.scroll.saturating_sub(1),
            KeyCode::PageDown => state.scroll = state.scroll.saturating_add(PAGE),
            KeyCode::PageUp => state.scroll = state.scroll.saturating_sub(PAGE),
            KeyCode::Home => state.scroll = 0,
            KeyCode::Char('r') if state.detail.phase() == LoadPhase::Failed => {
                state.detail.request_reload();
            }
            KeyCode::Esc => self.close_detail(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn close_detail(&mut self) {
        let screen = std::mem::replace(&mut self.screen, Screen::Empty);
        match screen {
            Screen::Detail(DetailScreen {
                parent: Some(parent),
                ..
            }) => self.screen = Screen::Catalog(*parent),
            other => {
                self.screen = other;
                self.should_quit = true;
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn render(&mut self, frame: &mut Frame) {
        match &mut self.screen {
            Screen::Empty => {}
            Screen::Catalog(state) => render_catalog(frame, state),
            Screen::Detail(state) => render_detail(frame, state),
        }
    }
}

// ============================================================================
// Screen renderers
// ============================================================================

fn render_centered_message(frame: &mut Frame, area: Rect, lines: Vec<Line<'_>>) {
    let height = lines.len() as u16;
    let paragraph = Paragraph::new(Text::from(lines)).centered();
    let vertical = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center);
    let [center] = vertical.areas(area);
    frame.render_widget(paragraph, center);
}

fn hint(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn hint_owned(text: String) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn render_catalog(frame: &mut Frame, state: &mut CatalogScreen) {
    let area = frame.area();

    let [header, search, main, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let visible = state.catalog.visible();

    // Header
    let title = if state.catalog.phase() == LoadPhase::Loaded {
        format!("Desserts ({})", visible.len())
    } else {
        "Desserts".to_string()
    };
    frame.render_widget(
        Paragraph::new(title)
            .style(Style::default().bold())
            .centered(),
        header,
    );

    // Search box
    let query = state.catalog.query();
    let search_text = if query.is_empty() {
        Span::styled("Search desserts", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(query)
    };
    let border_style = if state.searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let search_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let search_inner = search_block.inner(search);
    // Keep one column free for the cursor and show the tail of long queries.
    let query_width = u16::try_from(Line::from(query).width()).unwrap_or(u16::MAX);
    let room = search_inner.width.saturating_sub(1);
    let offset = query_width.saturating_sub(room);
    frame.render_widget(
        Paragraph::new(Line::from(search_text))
            .block(search_block)
            .scroll((0, offset)),
        search,
    );
    if state.searching {
        frame.set_cursor_position(Position::new(
            search_inner.x + (query_width - offset),
            search_inner.y,
        ));
    }

    // List, or a message in its place
    if visible.is_empty() {
        let message = match state.catalog.phase() {
            LoadPhase::Pending => vec![Line::styled(
                "Loading desserts...",
                Style::default().fg(Color::Cyan),
            )],
            LoadPhase::Failed if state.catalog.entries().is_empty() => vec![
                Line::styled(
                    "Could not load desserts",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Line::from(""),
                hint("Press r to retry, q to quit"),
            ],
            _ if !query.is_empty() => vec![Line::from(format!("No desserts match \"{query}\""))],
            _ => vec![Line::from("No desserts available")],
        };
        render_centered_message(frame, main, message);
    } else {
        let items: Vec<ListItem> = visible
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(entry.name.as_str(), Style::default().fg(Color::Green).bold()),
                    Span::raw("  "),
                    Span::styled(entry.id.as_str(), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, main, &mut state.list_state);
    }

    // Footer
    let footer_text = if state.searching {
        "Type to filter | Ctrl+U Clear | Enter/Esc Done"
    } else if state.catalog.phase() == LoadPhase::Failed {
        "↑↓/jk Navigate | / Search | r Retry | q Quit"
    } else {
        "↑↓/jk Navigate | Enter Select | / Search | q Quit"
    };
    frame.render_widget(
        Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        footer,
    );
}

/// Helper function to render a selectable section with consistent styling
fn render_selectable_section<'a, T>(
    lines: &mut Vec<Line<'a>>,
    selected_index: usize,
    label: &'a str,
    items: &[T],
    format_item: impl Fn(&T) -> String,
) {
    if items.is_empty() {
        return;
    }

    lines.push(Line::styled(label, Style::default().bold()));
    for (index, item) in items.iter().enumerate() {
        let selected = selected_index == index;
        let style = if selected {
            Style::default().fg(Color::Black).bg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::Cyan)
        };
        let prefix = if selected { "> " } else { "  " };
        lines.push(Line::styled(
            format!("{}{}", prefix, format_item(item)),
            style,
        ));
    }
    lines.push(Line::from(""));
}

fn render_detail(frame: &mut Frame, state: &mut DetailScreen) {
    let area = frame.area();

    let [header, main, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    // Header
    frame.render_widget(
        Paragraph::new(Line::styled(
            state.title.as_str(),
            Style::default().fg(Color::Green).bold(),
        ))
        .centered(),
        header,
    );

    let back_hint = if state.parent.is_some() {
        "Esc Back"
    } else {
        "Esc/q Quit"
    };

    let Some(record) = state.detail.record() else {
        // No error screen: a failed fetch keeps the loading presentation.
        let mut message = vec![Line::styled(
            format!("Loading {}...", state.title),
            Style::default().fg(Color::Cyan),
        )];
        if state.detail.phase() == LoadPhase::Failed {
            message.push(Line::from(""));
            message.push(hint("Could not load this recipe. Press r to retry"));
        }
        render_centered_message(frame, main, message);
        frame.render_widget(
            Paragraph::new(back_hint)
                .style(Style::default().fg(Color::DarkGray))
                .centered(),
            footer,
        );
        return;
    };

    let mut lines: Vec<Line> = Vec::new();

    if !record.thumbnail_url.trim().is_empty() {
        lines.push(hint_owned(format!("Photo: {}", record.thumbnail_url.trim())));
    }
    if let Some(origin) = record.origin() {
        lines.push(Line::from(format!("Origin: {origin}")));
    }
    if let Some(category) = record.category() {
        lines.push(Line::from(format!("Category: {category}")));
    }
    let tags = record.tags();
    if !tags.is_empty() {
        lines.push(Line::from(format!("Tags: {}", tags.join(", "))));
    }
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }

    let actions = state.detail.actions();
    render_selectable_section(
        &mut lines,
        state.selected_action,
        "Links:",
        &actions,
        |action| action.label.to_string(),
    );

    lines.push(Line::styled("Ingredients:", Style::default().bold()));
    let ingredients = record.ingredient_lines();
    if ingredients.is_empty() {
        lines.push(hint("  (none listed)"));
    }
    for ingredient in &ingredients {
        lines.push(Line::from(format!("  {ingredient}")));
    }

    if let Some(instructions) = record.instructions() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Instructions:", Style::default().bold()));
        for paragraph in instructions.lines() {
            lines.push(Line::from(paragraph.trim_end().to_string()));
        }
    }

    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(main);
    frame.render_widget(block, main);

    let info = Paragraph::new(lines).wrap(Wrap { trim: false });
    // Rows after wrapping, so the last screenful of a long paragraph is reachable.
    let max_scroll = info
        .line_count(inner.width)
        .saturating_sub(inner.height as usize);
    state.scroll = state.scroll.min(max_scroll.min(u16::MAX as usize) as u16);
    frame.render_widget(info.scroll((state.scroll, 0)), inner);

    // Footer
    let footer_text = if actions.is_empty() {
        format!("↑↓/jk Scroll | {}", back_hint)
    } else {
        format!("Tab Next link | Enter Open | ↑↓/jk Scroll | {}", back_hint)
    };
    frame.render_widget(
        Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        footer,
    );
}
