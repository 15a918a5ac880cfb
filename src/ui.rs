use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pipeline_crm::app::{DashboardPage, LeaderboardPage};
use pipeline_crm::format::{currency, date, percent};
use pipeline_crm::pipeline::board;
use pipeline_crm::timeline::{self, MONTHS};
use pipeline_crm::{
    Contact, ContactEdit, ContactField, ContactQuery, ContactStatus, CrmApp, Deal, EntityId,
    FilteredView, NoticeLevel, OptimisticCoordinator, PipelineSummary, RecordingNotifier,
    SortDirection, SortSpec, TimelineSummary,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Character cells of the timeline bar column
const TIMELINE_CELLS: u16 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Contacts,
    Pipeline,
    Timeline,
    Leaderboard,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Dashboard,
        Page::Contacts,
        Page::Pipeline,
        Page::Timeline,
        Page::Leaderboard,
    ];

    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Contacts,
            Page::Contacts => Page::Pipeline,
            Page::Pipeline => Page::Timeline,
            Page::Timeline => Page::Leaderboard,
            Page::Leaderboard => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Leaderboard,
            Page::Contacts => Page::Dashboard,
            Page::Pipeline => Page::Contacts,
            Page::Timeline => Page::Pipeline,
            Page::Leaderboard => Page::Timeline,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Contacts => "Contacts",
            Page::Pipeline => "Pipeline",
            Page::Timeline => "Timeline",
            Page::Leaderboard => "Leaderboard",
        }
    }
}

pub struct App {
    crm: CrmApp,
    notifier: Arc<RecordingNotifier>,
    contacts: OptimisticCoordinator<Contact>,
    deals: OptimisticCoordinator<Deal>,
    pub current_page: Page,
    pub dashboard: DashboardPage,
    pub leaderboard: LeaderboardPage,
    pub contact_view: FilteredView<Contact, ContactQuery>,
    /// Inline edit of the highlighted contact, if one is open
    pub editing: Option<ContactEdit>,
    pub contact_state: TableState,
    pub pipeline_state: TableState,
    pub timeline_state: TableState,
    pub leaderboard_state: TableState,
}

impl App {
    pub async fn load(crm: CrmApp) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let contacts = crm.contact_coordinator(notifier.clone()).await;
        let deals = crm.deal_coordinator(notifier.clone()).await;
        let dashboard = crm.dashboard().await;
        let leaderboard = crm.leaderboard().await;

        let contact_view = FilteredView::new(
            contacts.snapshot(),
            ContactQuery::default(),
            Some(SortSpec::ascending(ContactField::Name)),
        );

        let mut app = Self {
            crm,
            notifier,
            contacts,
            deals,
            current_page: Page::Dashboard,
            dashboard,
            leaderboard,
            contact_view,
            editing: None,
            contact_state: TableState::default(),
            pipeline_state: TableState::default(),
            timeline_state: TableState::default(),
            leaderboard_state: TableState::default(),
        };
        app.reset_selections();
        app
    }

    fn reset_selections(&mut self) {
        let lens = [
            self.contact_view.rows().len(),
            self.pipeline_deals().len(),
            self.timeline_deals().len(),
            self.leaderboard.entries.len(),
        ];
        let states = [
            &mut self.contact_state,
            &mut self.pipeline_state,
            &mut self.timeline_state,
            &mut self.leaderboard_state,
        ];
        for (state, len) in states.into_iter().zip(lens) {
            state.select(if len == 0 { None } else { Some(0) });
        }
    }

    // ========================================================================
    // DERIVED ROWS
    // ========================================================================

    /// Deals in kanban order: column by column, source order inside a column
    pub fn pipeline_deals(&self) -> Vec<Deal> {
        board(&self.deals.snapshot())
            .into_iter()
            .flat_map(|column| column.deals)
            .collect()
    }

    pub fn timeline_deals(&self) -> Vec<Deal> {
        self.deals
            .snapshot()
            .into_iter()
            .filter(|deal| deal.stage.is_active())
            .collect()
    }

    pub fn pipeline_summary(&self) -> PipelineSummary {
        PipelineSummary::compute(&self.deals.snapshot())
    }

    pub fn timeline_summary(&self) -> TimelineSummary {
        TimelineSummary::compute(&self.deals.snapshot())
    }

    fn selected_deal(&self, state: &TableState, deals: &[Deal]) -> Option<Deal> {
        state.selected().and_then(|i| deals.get(i)).cloned()
    }

    pub fn last_notice(&self) -> Option<pipeline_crm::Notice> {
        self.notifier.last()
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    fn current_table(&mut self) -> Option<(&mut TableState, usize)> {
        match self.current_page {
            Page::Dashboard => None,
            Page::Contacts => {
                let len = self.contact_view.rows().len();
                Some((&mut self.contact_state, len))
            }
            Page::Pipeline => {
                let len = self.pipeline_deals().len();
                Some((&mut self.pipeline_state, len))
            }
            Page::Timeline => {
                let len = self.timeline_deals().len();
                Some((&mut self.timeline_state, len))
            }
            Page::Leaderboard => {
                let len = self.leaderboard.entries.len();
                Some((&mut self.leaderboard_state, len))
            }
        }
    }

    pub fn next(&mut self) {
        if let Some((state, len)) = self.current_table() {
            if len == 0 {
                return;
            }
            let i = match state.selected() {
                Some(i) if i + 1 < len => i + 1,
                _ => 0,
            };
            state.select(Some(i));
        }
    }

    pub fn previous(&mut self) {
        if let Some((state, len)) = self.current_table() {
            if len == 0 {
                return;
            }
            let i = match state.selected() {
                Some(0) | None => len - 1,
                Some(i) => i - 1,
            };
            state.select(Some(i));
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    // ========================================================================
    // CONTACTS TABLE
    // ========================================================================

    fn contact_sort(&self) -> SortSpec<ContactField> {
        self.contact_view
            .sort()
            .unwrap_or_else(|| SortSpec::ascending(ContactField::Name))
    }

    /// Move the sort to the next column, ascending
    pub fn cycle_sort_field(&mut self) {
        let current = self.contact_sort();
        let position = ContactField::ALL
            .iter()
            .position(|f| *f == current.field)
            .unwrap_or(0);
        let next = ContactField::ALL[(position + 1) % ContactField::ALL.len()];
        self.contact_view.set_sort(Some(current.toggle(next)));
        self.contact_state.select(Some(0));
    }

    /// Same column again: flips direction
    pub fn reverse_sort(&mut self) {
        let current = self.contact_sort();
        self.contact_view.set_sort(Some(current.toggle(current.field)));
    }

    /// None -> new -> contacted -> ... -> closed -> None
    pub fn cycle_status_filter(&mut self) {
        let mut query = self.contact_view.query().clone();
        query.status = match query.status {
            None => ContactStatus::ALL.first().copied(),
            Some(status) => {
                let i = ContactStatus::ALL.iter().position(|s| *s == status).unwrap_or(0);
                ContactStatus::ALL.get(i + 1).copied()
            }
        };
        self.contact_view.set_query(query);
        let len = self.contact_view.rows().len();
        self.contact_state.select(if len == 0 { None } else { Some(0) });
    }

    pub fn clear_filter(&mut self) {
        self.contact_view.set_query(ContactQuery::default());
        self.contact_state.select(Some(0));
    }

    fn sync_contacts(&mut self) {
        self.contact_view.set_source(self.contacts.snapshot());
        let len = self.contact_view.rows().len();
        match self.contact_state.selected() {
            _ if len == 0 => self.contact_state.select(None),
            Some(i) if i >= len => self.contact_state.select(Some(len - 1)),
            None => self.contact_state.select(Some(0)),
            _ => {}
        }
    }

    // ========================================================================
    // ACTIONS (store round trips)
    // ========================================================================

    fn selected_contact(&self) -> Option<&Contact> {
        self.contact_state
            .selected()
            .and_then(|i| self.contact_view.rows().get(i))
    }

    /// Pessimistic delete of the highlighted contact
    pub async fn delete_selected_contact(&mut self) {
        if let Some(id) = self.selected_contact().map(|c| c.id) {
            // A failure is already reported through the notifier
            let _ = self.contacts.delete_contact(id).await;
            self.sync_contacts();
        }
    }

    /// Open the inline editor on the highlighted contact
    pub fn start_edit(&mut self) {
        self.editing = self.selected_contact().map(ContactEdit::start);
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Enter: add the typed tag, or save when nothing is typed
    pub async fn submit_edit(&mut self) {
        let Some(edit) = self.editing.as_mut() else {
            return;
        };
        if !edit.input.trim().is_empty() {
            edit.add_input();
            return;
        }

        let edit = edit.clone();
        // The editor closes either way, as the row does after a save
        self.editing = None;
        let _ = self.contacts.save(&edit).await;
        self.sync_contacts();
    }

    /// Kanban move of the highlighted deal one column left or right
    pub async fn move_selected_deal(&mut self, forward: bool) {
        let deals = self.pipeline_deals();
        let Some(deal) = self.selected_deal(&self.pipeline_state, &deals) else {
            return;
        };
        let target = if forward {
            deal.stage.next()
        } else {
            deal.stage.previous()
        };

        if let Some(stage) = target {
            let _ = self.deals.move_to_stage(deal.id, stage).await;
            self.reselect_pipeline(deal.id);
        }
    }

    /// Shift the highlighted timeline bar by one month
    pub async fn shift_selected_deal(&mut self, delta: i8) {
        let deals = self.timeline_deals();
        if let Some(deal) = self.selected_deal(&self.timeline_state, &deals) {
            let _ = self.deals.shift(deal.id, delta).await;
        }
    }

    fn reselect_pipeline(&mut self, id: EntityId) {
        let deals = self.pipeline_deals();
        let index = deals.iter().position(|d| d.id == id);
        self.pipeline_state
            .select(index.or(if deals.is_empty() { None } else { Some(0) }));
    }

    /// Manual reload of every collection
    pub async fn refresh(&mut self) {
        self.contacts.reload().await;
        self.deals.reload().await;
        self.dashboard = self.crm.dashboard().await;
        self.leaderboard = self.crm.leaderboard().await;
        self.sync_contacts();
        self.reset_selections();
    }
}

pub fn run_ui(app: &mut App, runtime: &Runtime) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, runtime);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runtime: &Runtime,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(edit) = app.editing.as_mut() {
            match key.code {
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Enter => runtime.block_on(app.submit_edit()),
                KeyCode::Left => edit.cycle_status(false),
                KeyCode::Right => edit.cycle_status(true),
                KeyCode::Tab => {
                    edit.accept_suggestion();
                }
                KeyCode::Delete => {
                    let first = edit.tags.iter().next().map(str::to_string);
                    if let Some(first) = first {
                        edit.remove_tag(&first);
                    }
                }
                KeyCode::Backspace => edit.backspace(),
                KeyCode::Char(c) => edit.type_char(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    app.previous_page();
                } else {
                    app.next_page();
                }
            }
            KeyCode::BackTab => app.previous_page(),
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                app.current_page = Page::ALL[index];
            }
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::Char('r') => runtime.block_on(app.refresh()),

            KeyCode::Char('s') if app.current_page == Page::Contacts => app.cycle_sort_field(),
            KeyCode::Char('o') if app.current_page == Page::Contacts => app.reverse_sort(),
            KeyCode::Char('f') if app.current_page == Page::Contacts => app.cycle_status_filter(),
            KeyCode::Char('c') if app.current_page == Page::Contacts => app.clear_filter(),
            KeyCode::Char('e') | KeyCode::Enter if app.current_page == Page::Contacts => {
                app.start_edit()
            }
            KeyCode::Char('d') if app.current_page == Page::Contacts => {
                runtime.block_on(app.delete_selected_contact())
            }

            KeyCode::Right | KeyCode::Char('l') if app.current_page == Page::Pipeline => {
                runtime.block_on(app.move_selected_deal(true))
            }
            KeyCode::Left | KeyCode::Char('h') if app.current_page == Page::Pipeline => {
                runtime.block_on(app.move_selected_deal(false))
            }
            KeyCode::Right | KeyCode::Char('l') if app.current_page == Page::Timeline => {
                runtime.block_on(app.shift_selected_deal(1))
            }
            KeyCode::Left | KeyCode::Char('h') if app.current_page == Page::Timeline => {
                runtime.block_on(app.shift_selected_deal(-1))
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Dashboard => render_dashboard(f, chunks[1], app),
        Page::Contacts => render_contacts(f, chunks[1], app),
        Page::Pipeline => render_pipeline(f, chunks[1], app),
        Page::Timeline => render_timeline(f, chunks[1], app),
        Page::Leaderboard => render_leaderboard(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn bordered(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(format!("{} {}", i + 1, page.title()), style));
    }

    let summary = app.pipeline_summary();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Deals: {}", summary.total_deals),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Closed: {}", currency(summary.closed_value)),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn metric_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<24}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let m = &app.dashboard.metrics;
    let mut lines = vec![
        Line::from(""),
        metric_line("Total Leads Contacted", m.leads_contacted.to_string(), Color::Cyan),
        metric_line("Meetings Booked", m.meetings_booked.to_string(), Color::Blue),
        metric_line("Deals Closed", m.deals_closed.to_string(), Color::Magenta),
        metric_line("Conversion Rate", percent(m.conversion_rate), Color::Green),
        Line::from(""),
    ];

    if let Some(hunter) = &app.dashboard.hunter_of_month {
        lines.push(metric_line(
            "Hunter of the Month",
            format!("{} ({})", hunter.name, currency(hunter.revenue)),
            Color::Yellow,
        ));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "  TOP PERFORMERS",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    )));
    for entry in &app.dashboard.top_performers {
        lines.push(Line::from(format!(
            "  {}. {:<20} {:>3} closed  {:>12}",
            entry.rank,
            entry.rep.name,
            entry.rep.deals_closed,
            currency(entry.rep.revenue)
        )));
    }

    f.render_widget(Paragraph::new(lines).block(bordered(" Dashboard ".to_string())), area);
}

fn status_color(status: ContactStatus) -> Color {
    match status {
        ContactStatus::New => Color::Cyan,
        ContactStatus::Contacted => Color::Blue,
        ContactStatus::Qualified => Color::Green,
        ContactStatus::Unqualified => Color::Red,
        ContactStatus::Closed => Color::Magenta,
    }
}

fn render_contact_editor(f: &mut Frame, area: Rect, edit: &ContactEdit) {
    let tags: Vec<&str> = edit.tags.iter().collect();
    let suggestions = edit.suggestions();
    let lines = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("◀ {} ▶", edit.status.label()),
                Style::default()
                    .fg(status_color(edit.status))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("   Tags: ", Style::default().fg(Color::DarkGray)),
            Span::raw(tags.join(", ")),
        ]),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(edit.input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled(
                format!("   {}", suggestions.iter().take(5).copied().collect::<Vec<_>>().join(" · ")),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" Editing {} ", edit.name)),
    );
    f.render_widget(panel, area);
}

fn render_contacts(f: &mut Frame, area: Rect, app: &mut App) {
    let area = match &app.editing {
        Some(edit) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(4)])
                .split(area);
            render_contact_editor(f, chunks[1], edit);
            chunks[0]
        }
        None => area,
    };

    let sort = app.contact_sort();
    let arrow = match sort.direction {
        SortDirection::Ascending => "▲",
        SortDirection::Descending => "▼",
    };

    let rows = app.contact_view.rows().iter().map(|c| {
        let tags: Vec<&str> = c.tags.iter().collect();
        Row::new(vec![
            Cell::from(truncate(&c.name, 20)),
            Cell::from(truncate(&c.email, 26)),
            Cell::from(truncate(&c.company, 18)),
            Cell::from(c.status.label()).style(Style::default().fg(status_color(c.status))),
            Cell::from(truncate(&c.assigned_rep, 16)),
            Cell::from(date(&c.last_contact)),
            Cell::from(truncate(&tags.join(", "), 28)),
        ])
        .height(1)
    });

    let filter = match app.contact_view.query().status {
        Some(status) => format!(" | status: {}", status.label()),
        None => String::new(),
    };
    let title = format!(
        " Contacts ({} of {}) | sort: {} {}{} ",
        app.contact_view.rows().len(),
        app.contact_view.source().len(),
        sort.field.as_str(),
        arrow,
        filter
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(26),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(13),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["Name", "Email", "Company", "Status", "Rep", "Last Contact", "Tags"]))
    .block(bordered(title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.contact_state);
}

fn render_pipeline(f: &mut Frame, area: Rect, app: &mut App) {
    let summary = app.pipeline_summary();
    let deals = app.pipeline_deals();

    let rows = deals.iter().map(|d| {
        Row::new(vec![
            Cell::from(d.stage.title()).style(Style::default().fg(Color::Cyan)),
            Cell::from(truncate(&d.name, 24)),
            Cell::from(truncate(&d.lead_name, 18)),
            Cell::from(currency(d.value)).style(Style::default().fg(Color::Green)),
            Cell::from(percent(d.probability)),
            Cell::from(truncate(&d.assigned_rep, 16)),
        ])
        .height(1)
    });

    let title = format!(
        " Pipeline | {} deals, {} | closed {} ({}) ",
        summary.total_deals,
        currency(summary.total_value),
        summary.closed_deals,
        currency(summary.closed_value)
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(24),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["Stage", "Deal", "Lead", "Value", "Prob", "Rep"]))
    .block(bordered(title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.pipeline_state);
}

fn bar_text(deal: &Deal) -> String {
    let (start, width) = timeline::Bar::for_deal(deal).cells(TIMELINE_CELLS);
    let start = start.min(TIMELINE_CELLS);
    let width = width.min(TIMELINE_CELLS - start);
    format!(
        "{}{}{}",
        "·".repeat(usize::from(start)),
        "█".repeat(usize::from(width)),
        "·".repeat(usize::from(TIMELINE_CELLS - start - width))
    )
}

fn render_timeline(f: &mut Frame, area: Rect, app: &mut App) {
    let summary = app.timeline_summary();
    let rows_data = timeline::rows(&app.deals.snapshot());

    let rows = rows_data.iter().map(|row| {
        Row::new(vec![
            Cell::from(truncate(&row.deal.name, 22)),
            Cell::from(bar_text(&row.deal)).style(Style::default().fg(Color::Magenta)),
            Cell::from(row.label.clone()),
            Cell::from(currency(row.deal.value)),
        ])
        .height(1)
    });

    let months: String = MONTHS.iter().map(|m| format!("{:<3}", m)).collect();
    let title = format!(
        " Timeline | {} active, {} | avg {} months, {} ",
        summary.active_deals,
        currency(summary.active_value),
        summary.average_duration_months,
        percent(summary.average_probability)
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(TIMELINE_CELLS),
            Constraint::Length(10),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec![
            Cell::from("Deal"),
            Cell::from(months),
            Cell::from("Months"),
            Cell::from("Value"),
        ])
        .style(Style::default().fg(Color::Yellow).bg(Color::DarkGray))
        .height(1),
    )
    .block(bordered(title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.timeline_state);
}

fn render_leaderboard(f: &mut Frame, area: Rect, app: &mut App) {
    let hunter_id = app.leaderboard.hunter_of_month.as_ref().map(|h| h.id);

    let rows = app.leaderboard.entries.iter().map(|entry| {
        let style = if Some(entry.rep.id) == hunter_id {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(entry.rank.to_string()),
            Cell::from(truncate(&entry.rep.name, 20)),
            Cell::from(entry.rep.deals_closed.to_string()),
            Cell::from(entry.rep.meetings_booked.to_string()),
            Cell::from(entry.rep.leads_contacted.to_string()),
            Cell::from(currency(entry.rep.revenue)),
            Cell::from(entry.score.to_string()),
        ])
        .style(style)
        .height(1)
    });

    let t = &app.leaderboard.totals;
    let title = format!(
        " Leaderboard | team: {} leads, {} meetings, {} closed, {} ",
        t.leads_contacted,
        t.meetings_booked,
        t.deals_closed,
        currency(t.revenue)
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Min(6),
        ],
    )
    .header(header_row(&["Rank", "Rep", "Closed", "Meetings", "Leads", "Revenue", "Score"]))
    .block(bordered(title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.leaderboard_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(notice) = app.last_notice() {
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Failure => Color::Red,
        };
        status_spans.push(Span::styled(format!(" {} ", notice.message), Style::default().fg(color)));
        status_spans.push(Span::raw("| "));
    }

    let hints: &[(&str, &str)] = match app.current_page {
        Page::Contacts if app.editing.is_some() => &[("←/→", " Status | "), ("Enter", " Add tag / Save | "), ("Tab", " Suggestion | "), ("Del", " Drop tag | "), ("Esc", " Cancel | ")],
        Page::Contacts => &[("e", " Edit | "), ("s", " Sort | "), ("o", " Order | "), ("f", " Status | "), ("c", " Clear | "), ("d", " Delete | ")],
        Page::Pipeline => &[("←/→", " Move stage | ")],
        Page::Timeline => &[("←/→", " Shift month | ")],
        _ => &[],
    };
    for (key, label) in hints {
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(*label));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Reload | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_crm::{DealStage, Fixtures};

    async fn app() -> App {
        App::load(CrmApp::from_fixtures(Fixtures::embedded().unwrap(), 0.0)).await
    }

    #[tokio::test]
    async fn test_pages_cycle() {
        let mut app = app().await;
        for _ in Page::ALL {
            app.next_page();
        }
        assert_eq!(app.current_page, Page::Dashboard);
        app.previous_page();
        assert_eq!(app.current_page, Page::Leaderboard);
    }

    #[tokio::test]
    async fn test_status_filter_cycles_back_to_all() {
        let mut app = app().await;
        app.cycle_status_filter();
        assert_eq!(app.contact_view.query().status, Some(ContactStatus::New));
        assert_eq!(app.contact_view.rows().len(), 2);

        for _ in 0..ContactStatus::ALL.len() {
            app.cycle_status_filter();
        }
        assert_eq!(app.contact_view.query().status, None);
        assert_eq!(app.contact_view.rows().len(), 8);
    }

    #[tokio::test]
    async fn test_sort_cycling() {
        let mut app = app().await;
        app.cycle_sort_field();
        assert_eq!(app.contact_sort(), SortSpec::ascending(ContactField::Email));
        app.reverse_sort();
        assert_eq!(app.contact_sort(), SortSpec::descending(ContactField::Email));
    }

    #[tokio::test]
    async fn test_move_selected_deal_follows_the_deal() {
        let mut app = app().await;
        app.current_page = Page::Pipeline;
        let first = app.pipeline_deals()[0].clone();
        assert_eq!(first.stage, DealStage::Connected);

        app.move_selected_deal(true).await;

        let moved = app.deals.get(first.id).unwrap();
        assert_eq!(moved.stage, DealStage::Locked);
        let selected = app.pipeline_state.selected().unwrap();
        assert_eq!(app.pipeline_deals()[selected].id, first.id);
        assert_eq!(app.last_notice().unwrap().message, "Deal moved to Locked!");
    }

    #[tokio::test]
    async fn test_delete_selected_contact() {
        let mut app = app().await;
        app.current_page = Page::Contacts;
        let first = app.contact_view.rows()[0].clone();

        app.delete_selected_contact().await;

        assert_eq!(app.contact_view.rows().len(), 7);
        assert!(app.contact_view.rows().iter().all(|c| c.id != first.id));
        assert_eq!(app.last_notice().unwrap().message, "Contact deleted successfully!");
    }

    #[tokio::test]
    async fn test_inline_edit_saves_status_and_tags() {
        let mut app = app().await;
        app.current_page = Page::Contacts;
        let first = app.contact_view.rows()[0].clone();

        app.start_edit();
        let edit = app.editing.as_mut().unwrap();
        assert_eq!(edit.id, first.id);
        edit.cycle_status(true);
        let status = edit.status;
        for c in "Partner".chars() {
            edit.type_char(c);
        }

        // First Enter adds the typed tag, the second one saves
        app.submit_edit().await;
        assert!(app.editing.as_ref().unwrap().tags.contains("Partner"));
        app.submit_edit().await;

        assert!(app.editing.is_none());
        let saved = app.contact_view.rows().iter().find(|c| c.id == first.id).unwrap();
        assert_eq!(saved.status, status);
        assert!(saved.tags.contains("Partner"));
        assert_eq!(app.last_notice().unwrap().message, "Contact updated successfully!");
    }

    #[tokio::test]
    async fn test_cancelled_edit_changes_nothing() {
        let mut app = app().await;
        app.current_page = Page::Contacts;
        let before = app.contact_view.rows().to_vec();

        app.start_edit();
        app.editing.as_mut().unwrap().cycle_status(true);
        app.cancel_edit();

        assert!(app.editing.is_none());
        assert_eq!(app.contact_view.rows(), before.as_slice());
        assert!(app.last_notice().is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Wayne Enterprises", 8), "Wayne...");
    }
}
