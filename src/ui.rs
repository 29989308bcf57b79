use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use finance_dashboard::budget::{self, BudgetOverview, BudgetStatus, CashFlow};
use finance_dashboard::config::ProjectionConfig;
use finance_dashboard::entities::{Side, Transaction, TransactionType};
use finance_dashboard::format::{money, money_whole, percent};
use finance_dashboard::projection::{self, FirstMillionPlan};
use finance_dashboard::storage::DashboardState;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    NetWorth,
    Budget,
    FirstMillion,
    Ledger,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::NetWorth, Page::Budget, Page::FirstMillion, Page::Ledger];

    pub fn next(&self) -> Self {
        match self {
            Page::NetWorth => Page::Budget,
            Page::Budget => Page::FirstMillion,
            Page::FirstMillion => Page::Ledger,
            Page::Ledger => Page::NetWorth,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::NetWorth => Page::Ledger,
            Page::Budget => Page::NetWorth,
            Page::FirstMillion => Page::Budget,
            Page::Ledger => Page::FirstMillion,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::NetWorth => "Net Worth",
            Page::Budget => "Budget",
            Page::FirstMillion => "First Million",
            Page::Ledger => "Ledger",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerFilter {
    All,
    Kind(TransactionType),
    Category(String),
}

pub struct App {
    pub dashboard: DashboardState,
    pub projection: ProjectionConfig,
    pub transactions: Vec<Transaction>,
    pub filtered_transactions: Vec<Transaction>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: LedgerFilter,
    pub plan: Option<FirstMillionPlan>,
}

impl App {
    pub fn new(dashboard: DashboardState, transactions: Vec<Transaction>, projection: ProjectionConfig) -> Self {
        let mut state = TableState::default();
        if !transactions.is_empty() {
            state.select(Some(0));
        }

        let plan = dashboard
            .first_million
            .as_ref()
            .and_then(|config| projection::first_million_plan(config, projection.annual_return).ok());

        Self {
            dashboard,
            projection,
            filtered_transactions: transactions.clone(),
            transactions,
            state,
            current_page: Page::NetWorth,
            show_detail: false,
            filter: LedgerFilter::All,
            plan,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_transaction(&self) -> Option<&Transaction> {
        self.state.selected().and_then(|i| self.filtered_transactions.get(i))
    }

    pub fn apply_filter(&mut self, filter: LedgerFilter) {
        self.filtered_transactions = match &filter {
            LedgerFilter::All => self.transactions.clone(),
            LedgerFilter::Kind(kind) => self
                .transactions
                .iter()
                .filter(|tx| tx.kind == *kind)
                .cloned()
                .collect(),
            LedgerFilter::Category(category) => self
                .transactions
                .iter()
                .filter(|tx| &tx.category == category)
                .cloned()
                .collect(),
        };
        self.filter = filter;

        // Reset selection to first item
        if self.filtered_transactions.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(LedgerFilter::All);
    }

    /// Steps through ledger categories alphabetically, back to "all" after the last one
    pub fn cycle_category_filter(&mut self) {
        let categories: BTreeSet<&str> = self.transactions.iter().map(|t| t.category.as_str()).collect();
        let next = match &self.filter {
            LedgerFilter::Category(current) => categories
                .range::<str, _>((std::ops::Bound::Excluded(current.as_str()), std::ops::Bound::Unbounded))
                .next()
                .copied(),
            _ => categories.iter().next().copied(),
        };
        match next.map(str::to_string) {
            Some(category) => self.apply_filter(LedgerFilter::Category(category)),
            None => self.clear_filter(),
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.filtered_transactions.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered_transactions.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.filtered_transactions.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(20));
        self.state.select(Some(i));
    }

    pub fn cash_flow(&self) -> CashFlow {
        budget::cash_flow(&self.filtered_transactions)
    }

    pub fn budget_overview(&self) -> std::result::Result<BudgetOverview, String> {
        self.dashboard.budget.overview().map_err(|e| e.to_string())
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "TUI loop failed");
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::BackTab => app.previous_page(),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    app.previous_page();
                } else {
                    app.next_page();
                }
            }
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                app.current_page = Page::ALL[index];
            }
            _ if app.current_page != Page::Ledger => {}
            KeyCode::Enter => app.toggle_detail(),
            KeyCode::Char('a') | KeyCode::Char('c') => app.clear_filter(),
            KeyCode::Char('i') => app.apply_filter(LedgerFilter::Kind(TransactionType::Income)),
            KeyCode::Char('e') => app.apply_filter(LedgerFilter::Kind(TransactionType::Expense)),
            KeyCode::Char('f') => app.cycle_category_filter(),
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::PageDown => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            KeyCode::Home => app.state.select(Some(0)),
            KeyCode::End => {
                if !app.filtered_transactions.is_empty() {
                    app.state.select(Some(app.filtered_transactions.len() - 1));
                }
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
        Page::NetWorth => render_net_worth(f, chunks[1], app),
        Page::Budget => render_budget(f, chunks[1], app),
        Page::FirstMillion => render_first_million(f, chunks[1], app),
        Page::Ledger if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);
            render_ledger(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Ledger => render_ledger(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().map(|h| Cell::from(*h).style(header_style())))
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn bordered(title: String, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
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

    let net_worth = app.dashboard.balance_sheet.summary().net_worth;
    let color = if net_worth >= 0.0 { Color::Green } else { Color::Red };
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(format!("Net worth: {}", money(net_worth)), Style::default().fg(color)));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(bordered(String::new(), Color::Cyan));
    f.render_widget(header, area);
}

fn render_net_worth(f: &mut Frame, area: Rect, app: &App) {
    let sheet = &app.dashboard.balance_sheet;
    let summary = sheet.summary();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    for (side, column, color) in [
        (Side::Asset, columns[0], Color::Green),
        (Side::Liability, columns[1], Color::Red),
    ] {
        let total = sheet.total(side);
        let mut rows = Vec::new();
        for (category, amount) in sheet.distribution(side) {
            let share = if total > 0.0 { amount / total * 100.0 } else { 0.0 };
            rows.push(
                Row::new(vec![
                    Cell::from(category.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                    Cell::from(money(amount)).style(Style::default().fg(color)),
                    Cell::from(percent(share)),
                ])
                .height(1),
            );
            if let Some(items) = sheet.side(side).get(&category) {
                for (name, value) in items {
                    rows.push(Row::new(vec![
                        Cell::from(format!("  {}", truncate(name, 24))),
                        Cell::from(money(*value)).style(Style::default().fg(Color::DarkGray)),
                        Cell::from(""),
                    ]));
                }
            }
        }

        let title = match side {
            Side::Asset => format!(" Assets {} ", money(summary.total_assets)),
            Side::Liability => format!(" Liabilities {} ", money(summary.total_liabilities)),
        };
        let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(16), Constraint::Length(8)])
            .header(header_row(&["Category", "Amount", "Share"]))
            .block(bordered(title, color));
        f.render_widget(table, column);
    }

    let progress = sheet.progress_toward(app.projection.target_net_worth);
    let gauge = Gauge::default()
        .block(bordered(
            format!(" Progress toward {} ", money_whole(progress.target)),
            Color::Cyan,
        ))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((progress.percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{} ({} to go)", percent(progress.percent), money(progress.remaining)));
    f.render_widget(gauge, chunks[1]);
}

fn status_color(status: BudgetStatus) -> Color {
    match status {
        BudgetStatus::WithinBudget => Color::Green,
        BudgetStatus::OverBudget => Color::Red,
    }
}

fn render_budget(f: &mut Frame, area: Rect, app: &App) {
    let overview = match app.budget_overview() {
        Ok(overview) => overview,
        Err(message) => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(format!("  ⚠️  {}", message), Style::default().fg(Color::Yellow))),
                Line::from(""),
                Line::from(Span::styled(
                    "  Set a salary and budget goals with `finance-dashboard budget`",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )),
            ])
            .block(bordered(" Budget ".to_string(), Color::White));
            f.render_widget(paragraph, area);
            return;
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(overview.unbudgeted.len() as u16 + 2)])
        .split(area);

    let rows = overview
        .rows
        .iter()
        .chain(std::iter::once(&overview.total))
        .map(|row| {
            let color = status_color(row.status);
            let style = if row.category == overview.total.category {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(row.status.icon()),
                Cell::from(row.category.clone()),
                Cell::from(money(row.spent)),
                Cell::from(money(row.should_spend)),
                Cell::from(percent(row.used_percentage)).style(Style::default().fg(color)),
                Cell::from(money(row.remaining)).style(Style::default().fg(color)),
            ])
            .style(style)
        });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(20),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["", "Category", "Spent", "Planned", "Used", "Remaining"]))
    .block(bordered(
        format!(" Budget - salary {} ", money(overview.monthly_salary)),
        Color::White,
    ));
    f.render_widget(table, chunks[0]);

    let lines: Vec<Line> = overview
        .unbudgeted
        .iter()
        .map(|(category, amount)| {
            Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{:<20}", category), Style::default().fg(Color::Yellow)),
                Span::raw(money(*amount)),
            ])
        })
        .collect();
    let unbudgeted = Paragraph::new(lines).block(bordered(" Spending without a goal ".to_string(), Color::Yellow));
    f.render_widget(unbudgeted, chunks[1]);
}

fn render_first_million(f: &mut Frame, area: Rect, app: &App) {
    let Some(plan) = &app.plan else {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from("  No First Million inputs saved yet."),
            Line::from(Span::styled(
                "  Run `finance-dashboard first-million --initial .. --desired .. --income .. --save`",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ])
        .block(bordered(" First Million ".to_string(), Color::White));
        f.render_widget(paragraph, area);
        return;
    };

    let desired = plan.config.desired_amount;
    let mut titles = vec!["Monthly".to_string()];
    titles.extend(plan.years.iter().map(|y| format!("{} years", y)));
    let header = Row::new(titles.into_iter().map(|t| Cell::from(t).style(header_style())))
        .style(Style::default().bg(Color::DarkGray));

    let rows = plan.table.iter().map(|row| {
        let mut cells = vec![Cell::from(money_whole(row.contribution)).style(header_style())];
        cells.extend(row.values.iter().map(|(_, value)| {
            let color = if *value >= desired { Color::Green } else { Color::White };
            Cell::from(money_whole(*value)).style(Style::default().fg(color))
        }));
        Row::new(cells)
    });

    let widths: Vec<Constraint> = std::iter::repeat(Constraint::Length(15))
        .take(plan.years.len() + 1)
        .collect();
    let title = format!(
        " First Million - {} → {} at {} | minimum {}/month ",
        money_whole(plan.config.initial_amount),
        money_whole(desired),
        percent(plan.annual_return * 100.0),
        money_whole(plan.minimum_contribution)
    );
    let table = Table::new(rows, widths).header(header).block(bordered(title, Color::White));
    f.render_widget(table, area);
}

fn render_ledger(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let rows = app.filtered_transactions.iter().map(|tx| {
        let color = match tx.kind {
            TransactionType::Income => Color::Green,
            TransactionType::Expense => Color::Red,
        };
        Row::new(vec![
            Cell::from(tx.date.to_string()),
            Cell::from(tx.kind.to_string()).style(Style::default().fg(color)),
            Cell::from(truncate(&tx.category, 20)),
            Cell::from(money(tx.signed_amount())).style(Style::default().fg(color)),
            Cell::from(truncate(tx.description.as_deref().unwrap_or(""), 40)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["Date", "Type", "Category", "Amount", "Description"]))
    .block(bordered(" Transactions ".to_string(), Color::White))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");
    f.render_stateful_widget(table, chunks[0], &mut app.state);

    let flow = app.cash_flow();
    let net_color = if flow.net >= 0.0 { Color::Green } else { Color::Red };
    let totals = Paragraph::new(Line::from(vec![
        Span::raw(" Income "),
        Span::styled(money(flow.income), Style::default().fg(Color::Green)),
        Span::raw("  |  Expenses "),
        Span::styled(money(flow.expenses), Style::default().fg(Color::Red)),
        Span::raw("  |  Net "),
        Span::styled(money(flow.net), Style::default().fg(net_color).add_modifier(Modifier::BOLD)),
    ]))
    .block(bordered(" Cash flow ".to_string(), Color::White));
    f.render_widget(totals, chunks[1]);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(tx) = app.selected_transaction() else {
        let panel = Paragraph::new("  No transaction selected")
            .block(bordered(" Transaction Details ".to_string(), Color::Yellow));
        f.render_widget(panel, area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let field = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("  {:<12}", name), label), Span::raw(value)])
    };

    let content = vec![
        Line::from(""),
        field("ID:", tx.id.clone()),
        field("Date:", tx.date.to_string()),
        field("Type:", tx.kind.to_string()),
        field("Category:", tx.category.clone()),
        field("Amount:", money(tx.amount)),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(Span::styled(
            "  DESCRIPTION",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(tx.description.as_deref().unwrap_or("-"), 35),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Press Enter to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let panel = Paragraph::new(content).block(bordered(" Transaction Details ".to_string(), Color::Yellow));
    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let mut status_spans = vec![];

    if app.current_page == Page::Ledger {
        let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected, app.filtered_transactions.len()),
            Style::default().fg(Color::Cyan),
        ));
        let filter_name = match &app.filter {
            LedgerFilter::All => "all".to_string(),
            LedgerFilter::Kind(kind) => kind.to_string(),
            LedgerFilter::Category(category) => category.clone(),
        };
        status_spans.push(Span::raw("| "));
        status_spans.push(Span::styled(format!("Filter: {} ", filter_name), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw("| "));
        for (k, label) in [("a", " All "), ("i", " Income "), ("e", " Expenses "), ("f", " Category "), ("Enter", " Details ")] {
            status_spans.push(key(k));
            status_spans.push(Span::raw(label));
        }
        status_spans.push(Span::raw("| "));
    }

    status_spans.push(key(" Tab"));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(key("1-4"));
    status_spans.push(Span::raw(" Jump | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(bordered(String::new(), Color::White));
    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current_line));
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines.join("\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(kind: TransactionType, amount: f64, category: &str, day: u32) -> Transaction {
        Transaction::new(amount, kind, category, None)
            .unwrap()
            .with_date(NaiveDate::from_ymd_opt(2024, 3, day).unwrap())
    }

    fn app() -> App {
        let transactions = vec![
            tx(TransactionType::Income, 5000.0, "Salary", 1),
            tx(TransactionType::Expense, 1200.0, "Housing", 2),
            tx(TransactionType::Expense, 300.0, "Food", 3),
            tx(TransactionType::Expense, 80.0, "Food", 4),
        ];
        App::new(DashboardState::demo(), transactions, ProjectionConfig::default())
    }

    #[test]
    fn test_page_cycle() {
        let mut app = app();
        assert_eq!(app.current_page, Page::NetWorth);
        app.previous_page();
        assert_eq!(app.current_page, Page::Ledger);
        for _ in 0..4 {
            app.next_page();
        }
        assert_eq!(app.current_page, Page::Ledger);
    }

    #[test]
    fn test_kind_filter_and_cash_flow() {
        let mut app = app();
        app.apply_filter(LedgerFilter::Kind(TransactionType::Expense));
        assert_eq!(app.filtered_transactions.len(), 3);
        assert_eq!(app.state.selected(), Some(0));

        let flow = app.cash_flow();
        assert_eq!(flow.income, 0.0);
        assert!((flow.expenses - 1580.0).abs() < 1e-9);

        app.clear_filter();
        assert_eq!(app.filtered_transactions.len(), 4);
    }

    #[test]
    fn test_category_filter_cycles_back_to_all() {
        let mut app = app();
        app.cycle_category_filter();
        assert_eq!(app.filter, LedgerFilter::Category("Food".into()));
        assert_eq!(app.filtered_transactions.len(), 2);
        app.cycle_category_filter();
        assert_eq!(app.filter, LedgerFilter::Category("Housing".into()));
        app.cycle_category_filter();
        assert_eq!(app.filter, LedgerFilter::Category("Salary".into()));
        app.cycle_category_filter();
        assert_eq!(app.filter, LedgerFilter::All);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(3));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(3));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_empty_filter_clears_selection() {
        let mut app = app();
        app.apply_filter(LedgerFilter::Category("Travel".into()));
        assert!(app.filtered_transactions.is_empty());
        assert!(app.selected_transaction().is_none());
        app.next();
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_demo_state_has_plan_and_overview() {
        let app = app();
        let plan = app.plan.as_ref().unwrap();
        assert!(!plan.table.is_empty());
        assert!(app.budget_overview().is_ok());
    }

    #[test]
    fn test_truncate_and_wrap() {
        assert_eq!(truncate("Groceries", 20), "Groceries");
        assert_eq!(truncate("Entertainment & Leisure", 10), "Enterta...");
        assert_eq!(wrap_text("one two three", 7), "one two\n  three");
    }
}
