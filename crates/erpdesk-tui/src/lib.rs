// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use erpdesk_app::{
    AppCommand, AppState, ChangeEvent, ChangeNotifier, CostMode, Customer, DialogError,
    DialogMode, Item, MODE_KEY, ParameterList, PriceColumn, PriceQuery, PricesByCustomer,
    RECORD_ID_KEY, ReportError, Role, RoleEditor, RoleField, RoleId, RoleStore, Subscription,
    TabKind, Violation,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";

/// Data access the terminal UI needs on top of the dialog and report seams.
pub trait AppRuntime: RoleStore + PriceQuery {
    fn list_roles(&mut self) -> Result<Vec<Role>>;
    fn list_customers(&mut self) -> Result<Vec<Customer>>;
    fn list_items(&mut self) -> Result<Vec<Item>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiOptions {
    /// Hides the currency column on the prices tab.
    pub single_currency: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RoleDialogUiState {
    editor: RoleEditor,
    field: RoleField,
    violations: Vec<Violation>,
    error: Option<String>,
}

impl RoleDialogUiState {
    fn new(editor: RoleEditor) -> Self {
        Self {
            editor,
            field: RoleField::Name,
            violations: Vec::new(),
            error: None,
        }
    }
}

enum DialogOutcome {
    Stay,
    Status(String),
    Closed(String),
}

#[derive(Debug)]
struct ViewData {
    roles: Vec<Role>,
    role_cursor: usize,
    dialog: Option<RoleDialogUiState>,
    customers: Vec<Customer>,
    items: Vec<Item>,
    customer_slot: Option<usize>,
    item_slot: Option<usize>,
    prices: PricesByCustomer,
    price_cursor: usize,
    notifier: ChangeNotifier,
    role_changes: Subscription,
    help_visible: bool,
    status_token: u64,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        let mut notifier = ChangeNotifier::new();
        let role_changes = notifier.subscribe();
        Self {
            roles: Vec::new(),
            role_cursor: 0,
            dialog: None,
            customers: Vec::new(),
            items: Vec::new(),
            customer_slot: None,
            item_slot: None,
            prices: PricesByCustomer::new(options.single_currency),
            price_cursor: 0,
            notifier,
            role_changes,
            help_visible: false,
            status_token: 0,
        }
    }

    fn selected_role(&self) -> Option<&Role> {
        self.roles.get(self.role_cursor)
    }

    fn selected_customer(&self) -> Option<&Customer> {
        self.customer_slot.and_then(|index| self.customers.get(index))
    }

    fn selected_item(&self) -> Option<&Item> {
        self.item_slot.and_then(|index| self.items.get(index))
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);
        process_change_events(state, runtime, &mut view_data);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    if let Some(dialog) = view_data.dialog.as_mut()
        && let Ok(outcome) = dialog.editor.cancel(&*runtime)
        && let Some(error) = outcome.reclaim_error
    {
        warn!(%error, "role dialog left open at exit");
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

/// Reloads the role list when a save elsewhere announced a change.
fn process_change_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    let events = view_data.role_changes.drain();
    if !events.contains(&ChangeEvent::RolesUpdated) {
        return;
    }
    match runtime.list_roles() {
        Ok(roles) => {
            debug!(roles = roles.len(), "reloaded crm roles after change");
            view_data.roles = roles;
            clamp_cursor(&mut view_data.role_cursor, view_data.roles.len());
        }
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(format!("reload roles failed: {error}")));
        }
    }
}

fn refresh_view_data<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    view_data.roles = runtime.list_roles().context("load crm roles")?;
    clamp_cursor(&mut view_data.role_cursor, view_data.roles.len());
    view_data.customers = runtime.list_customers().context("load customers")?;
    view_data.items = runtime.list_items().context("load items")?;
    if view_data
        .customer_slot
        .is_some_and(|index| index >= view_data.customers.len())
    {
        view_data.customer_slot = None;
        view_data.prices.set_customer(None);
    }
    if view_data
        .item_slot
        .is_some_and(|index| index >= view_data.items.len())
    {
        view_data.item_slot = None;
        view_data.prices.set_item(None);
    }
    Ok(())
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.dialog.is_some() {
        match handle_dialog_key(runtime, view_data, key) {
            DialogOutcome::Stay => {}
            DialogOutcome::Status(message) => emit_status(state, view_data, internal_tx, message),
            DialogOutcome::Closed(message) => {
                view_data.dialog = None;
                emit_status(state, view_data, internal_tx, message);
            }
        }
        process_change_events(state, runtime, view_data);
        return false;
    }

    match key.code {
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextTab);
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevTab);
        }
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('q') => return true,
        _ => {
            let status = match state.active_tab {
                TabKind::Roles => handle_roles_key(runtime, view_data, key),
                TabKind::Prices => handle_prices_key(runtime, view_data, key),
            };
            if let Some(message) = status {
                emit_status(state, view_data, internal_tx, message);
            }
        }
    }
    false
}

fn handle_roles_key<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Option<String> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut view_data.role_cursor, view_data.roles.len(), 1);
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut view_data.role_cursor, view_data.roles.len(), -1);
            None
        }
        KeyCode::Char('n') => open_role_dialog(runtime, view_data, DialogMode::New, None),
        KeyCode::Char('e') | KeyCode::Enter => {
            let Some(role_id) = view_data.selected_role().map(|role| role.id) else {
                return Some("no role selected".to_owned());
            };
            open_role_dialog(runtime, view_data, DialogMode::Edit, Some(role_id))
        }
        KeyCode::Char('v') => {
            let Some(role_id) = view_data.selected_role().map(|role| role.id) else {
                return Some("no role selected".to_owned());
            };
            open_role_dialog(runtime, view_data, DialogMode::View, Some(role_id))
        }
        KeyCode::Char('r') => match runtime.list_roles() {
            Ok(roles) => {
                view_data.roles = roles;
                clamp_cursor(&mut view_data.role_cursor, view_data.roles.len());
                Some(format!("{} roles", view_data.roles.len()))
            }
            Err(error) => Some(format!("reload roles failed: {error}")),
        },
        _ => None,
    }
}

fn open_role_dialog<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    mode: DialogMode,
    role_id: Option<RoleId>,
) -> Option<String> {
    let mut options = ParameterList::new();
    if let Some(role_id) = role_id {
        options.append(RECORD_ID_KEY, role_id.get());
    }
    options.append(MODE_KEY, mode.as_str());

    match RoleEditor::configure(&*runtime, &options) {
        Ok(editor) => {
            view_data.dialog = Some(RoleDialogUiState::new(editor));
            None
        }
        Err(error) => Some(error.to_string()),
    }
}

fn handle_dialog_key<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> DialogOutcome {
    let Some(dialog) = view_data.dialog.as_mut() else {
        return DialogOutcome::Stay;
    };

    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return match dialog.editor.save(&*runtime, &mut view_data.notifier) {
            Ok(role_id) => DialogOutcome::Closed(format!("role {role_id} saved")),
            Err(DialogError::Validation(violations)) => {
                let message = violations
                    .first()
                    .map(|violation| violation.message.clone())
                    .unwrap_or_default();
                if let Some(first) = violations.first() {
                    dialog.field = first.field;
                }
                dialog.violations = violations;
                dialog.error = None;
                DialogOutcome::Status(message)
            }
            Err(error @ DialogError::Persistence(_)) => {
                let message = error.to_string();
                dialog.violations.clear();
                dialog.error = Some(message.clone());
                DialogOutcome::Status(message)
            }
            Err(error) => DialogOutcome::Status(error.to_string()),
        };
    }

    match key.code {
        KeyCode::Esc => match dialog.editor.cancel(&*runtime) {
            Ok(outcome) => match outcome.reclaim_error {
                Some(error) => DialogOutcome::Closed(format!(
                    "role dialog closed; could not release provisional role: {error}"
                )),
                None => DialogOutcome::Closed("role dialog closed".to_owned()),
            },
            Err(error) => DialogOutcome::Closed(error.to_string()),
        },
        KeyCode::Tab | KeyCode::Down => {
            dialog.field = shift_field(dialog.field, 1);
            DialogOutcome::Stay
        }
        KeyCode::BackTab | KeyCode::Up => {
            dialog.field = shift_field(dialog.field, -1);
            DialogOutcome::Stay
        }
        _ => match edit_focused_field(dialog, key) {
            Ok(()) => DialogOutcome::Stay,
            Err(error) => DialogOutcome::Status(error.to_string()),
        },
    }
}

fn edit_focused_field(dialog: &mut RoleDialogUiState, key: KeyEvent) -> Result<(), DialogError> {
    let field = dialog.field;
    let edits_field = match (field, key.code) {
        (RoleField::Name, KeyCode::Char(_) | KeyCode::Backspace) => true,
        (RoleField::SortOrder, KeyCode::Char('0'..='9' | '-') | KeyCode::Backspace) => true,
        (_, KeyCode::Char(' ') | KeyCode::Enter) => field != RoleField::Name,
        _ => false,
    };
    if !edits_field {
        return Ok(());
    }

    let form = dialog.editor.form_mut()?;
    match (field, key.code) {
        (RoleField::Name, KeyCode::Char(ch)) => form.name.push(ch),
        (RoleField::Name, KeyCode::Backspace) => {
            form.name.pop();
        }
        (RoleField::SortOrder, KeyCode::Char('-')) => {
            form.sort_order = form.sort_order.saturating_neg();
        }
        (RoleField::SortOrder, KeyCode::Char(digit @ '0'..='9')) => {
            let value = i32::from(digit as u8 - b'0');
            let magnitude = form
                .sort_order
                .saturating_abs()
                .saturating_mul(10)
                .saturating_add(value);
            form.sort_order = if form.sort_order < 0 {
                -magnitude
            } else {
                magnitude
            };
        }
        (RoleField::SortOrder, KeyCode::Backspace) => form.sort_order /= 10,
        (RoleField::Contact | RoleField::Address | RoleField::Email | RoleField::Phone, _) => {
            form.toggle(field);
        }
        _ => {}
    }
    dialog.violations.retain(|violation| violation.field != field);
    Ok(())
}

fn shift_field(field: RoleField, delta: isize) -> RoleField {
    let fields = RoleField::ALL;
    let current = fields
        .iter()
        .position(|candidate| *candidate == field)
        .unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(fields.len() as isize) as usize;
    fields[next]
}

fn handle_prices_key<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Option<String> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(&mut view_data.price_cursor, view_data.prices.rows().len(), 1);
            return None;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(&mut view_data.price_cursor, view_data.prices.rows().len(), -1);
            return None;
        }
        KeyCode::Char('c') | KeyCode::Char('C') => {
            let delta = if key.code == KeyCode::Char('c') { 1 } else { -1 };
            view_data.customer_slot =
                cycle_slot(view_data.customer_slot, view_data.customers.len(), delta);
            let customer = view_data.selected_customer().map(|customer| customer.id);
            view_data.prices.set_customer(customer);
        }
        KeyCode::Char('i') | KeyCode::Char('I') => {
            let delta = if key.code == KeyCode::Char('i') { 1 } else { -1 };
            view_data.item_slot = cycle_slot(view_data.item_slot, view_data.items.len(), delta);
            let item = view_data.selected_item().map(|item| item.id);
            view_data.prices.set_item(item);
        }
        KeyCode::Char('x') => {
            let show = !view_data.prices.show_costs();
            view_data.prices.set_show_costs(show);
        }
        KeyCode::Char('s') | KeyCode::Char('a') => {
            if !view_data.prices.costs_group_enabled() {
                return Some("turn on costs (x) before choosing a costing method".to_owned());
            }
            let mode = if key.code == KeyCode::Char('s') {
                CostMode::Standard
            } else {
                CostMode::Actual
            };
            view_data.prices.set_cost_mode(mode);
        }
        KeyCode::Char('e') => {
            let show = !view_data.prices.show_expired();
            view_data.prices.set_show_expired(show);
        }
        KeyCode::Char('f') => {
            let show = !view_data.prices.show_future();
            view_data.prices.set_show_future(show);
        }
        KeyCode::Char('r') => return Some(run_prices(runtime, view_data)),
        _ => return None,
    }

    if view_data.prices.customer().is_some() {
        Some(run_prices(runtime, view_data))
    } else {
        view_data.price_cursor = 0;
        None
    }
}

fn run_prices<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> String {
    let message = match view_data.prices.run(&*runtime) {
        Ok(count) => format!("{count} prices"),
        Err(error @ ReportError::CustomerRequired) => error.to_string(),
        Err(error @ ReportError::Persistence(_)) => {
            warn!(%error, "prices by customer failed");
            error.to_string()
        }
    };
    clamp_cursor(&mut view_data.price_cursor, view_data.prices.rows().len());
    message
}

/// Cycles through `len` entries plus an empty slot that means "nothing chosen".
fn cycle_slot(current: Option<usize>, len: usize, delta: isize) -> Option<usize> {
    let slots = len as isize + 1;
    let position = current.map_or(0, |index| index as isize + 1);
    let next = (position + delta).rem_euclid(slots);
    if next == 0 {
        None
    } else {
        Some(next as usize - 1)
    }
}

fn move_cursor(cursor: &mut usize, len: usize, delta: isize) {
    if len == 0 {
        *cursor = 0;
        return;
    }
    let next = (*cursor as isize + delta).clamp(0, len as isize - 1);
    *cursor = next as usize;
}

fn clamp_cursor(cursor: &mut usize, len: usize) {
    if *cursor >= len {
        *cursor = len.saturating_sub(1);
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = TabKind::ALL
        .iter()
        .map(|tab| tab.label().to_owned())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("erpdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.active_tab {
        TabKind::Roles => render_roles_table(frame, layout[1], view_data),
        TabKind::Prices => render_prices(frame, layout[1], view_data),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(dialog) = &view_data.dialog {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let title = format!("crm role ({})", dialog.editor.mode().as_str());
        let body = Paragraph::new(render_dialog_text(dialog)).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(body, area);
    }

    if view_data.help_visible {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_roles_table(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let header = Row::new(
        ["Name", "Contact", "Address", "Email", "Phone", "Order"]
            .into_iter()
            .map(|label| Cell::from(label).style(header_style())),
    );
    let rows = view_data.roles.iter().enumerate().map(|(index, role)| {
        let style = if index == view_data.role_cursor {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(role.name.clone()),
            Cell::from(checkbox(role.applies_to.contact)),
            Cell::from(checkbox(role.applies_to.address)),
            Cell::from(checkbox(role.applies_to.email)),
            Cell::from(checkbox(role.applies_to.phone)),
            Cell::from(role.sort_order.to_string()),
        ])
        .style(style)
    });
    let widths = [
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(6),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(format!("{} ({})", TabKind::Roles.label(), view_data.roles.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn render_prices(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let filters = Paragraph::new(price_filter_text(view_data))
        .block(Block::default().title("options").borders(Borders::ALL));
    frame.render_widget(filters, layout[0]);

    let columns = view_data.prices.visible_columns();
    let header = Row::new(
        columns
            .iter()
            .map(|column| Cell::from(column.label()).style(header_style())),
    );
    let rows = view_data
        .prices
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let style = if index == view_data.price_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(
                columns
                    .iter()
                    .map(|column| Cell::from(column.cell(row)))
                    .collect::<Vec<_>>(),
            )
            .style(style)
        });
    let widths = columns
        .iter()
        .map(|column| column_width(*column))
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(format!(
                    "{} ({})",
                    TabKind::Prices.label(),
                    view_data.prices.rows().len()
                ))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, layout[1]);
}

fn column_width(column: PriceColumn) -> Constraint {
    match column {
        PriceColumn::Description => Constraint::Min(16),
        PriceColumn::Schedule | PriceColumn::Source | PriceColumn::ItemNumber => {
            Constraint::Min(10)
        }
        PriceColumn::PriceUom | PriceColumn::Currency => Constraint::Length(9),
        PriceColumn::QtyBreak
        | PriceColumn::Price
        | PriceColumn::ExtCost
        | PriceColumn::Margin => Constraint::Length(10),
    }
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn checkbox(checked: bool) -> &'static str {
    if checked { CHECKED } else { UNCHECKED }
}

fn price_filter_text(view_data: &ViewData) -> String {
    let customer = view_data
        .selected_customer()
        .map_or_else(|| "(none)".to_owned(), |c| format!("{} {}", c.number, c.name));
    let item = view_data
        .selected_item()
        .map_or_else(|| "(all)".to_owned(), |item| item.number.clone());
    let prices = &view_data.prices;
    let costing = if prices.costs_group_enabled() {
        prices.cost_mode().label()
    } else {
        "off"
    };
    format!(
        "customer: {customer} | item: {item} | costs {} {costing} | expired {} | future {}",
        checkbox(prices.show_costs()),
        checkbox(prices.show_expired()),
        checkbox(prices.show_future()),
    )
}

fn render_dialog_text(dialog: &RoleDialogUiState) -> String {
    let chrome = dialog.editor.chrome();
    let form = dialog.editor.form();
    let mut lines = Vec::new();

    for field in RoleField::ALL {
        let marker = if field == dialog.field { ">" } else { " " };
        let value = match field {
            RoleField::Name => form.name.clone(),
            RoleField::SortOrder => form.sort_order.to_string(),
            _ => checkbox(form.flag(field).unwrap_or(false)).to_owned(),
        };
        let mut line = format!("{marker} {:<10} {value}", field.label());
        if let Some(violation) = dialog
            .violations
            .iter()
            .find(|violation| violation.field == field)
        {
            line.push_str(&format!("  ! {}", violation.message));
        }
        lines.push(line);
    }

    lines.push(String::new());
    if let Some(error) = &dialog.error {
        lines.push(format!("error: {error}"));
    }
    if chrome.save_visible {
        lines.push(format!(
            "tab/shift+tab field | space toggle | ctrl+s save | esc {}",
            chrome.cancel_label.to_lowercase()
        ));
    } else {
        lines.push(format!("esc {}", chrome.cancel_label.to_lowercase()));
    }
    lines.join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let hints = if view_data.dialog.is_some() {
        "DIALOG | ctrl+q quit"
    } else {
        match state.active_tab {
            TabKind::Roles => "j/k move | n new | e edit | v view | r reload | tab | ? | q",
            TabKind::Prices => {
                "c/C customer | i/I item | x costs | s/a std/act | e expired | f future | r run | tab | ? | q"
            }
        }
    };
    match &state.status_line {
        Some(status) => format!("{status} | {hints}"),
        None => hints.to_owned(),
    }
}

fn help_overlay_text() -> String {
    [
        "global",
        "  tab / shift+tab  switch tab",
        "  ?                toggle help",
        "  q / ctrl+q       quit",
        "",
        "crm roles",
        "  n                new role",
        "  e / enter        edit selected role",
        "  v                view selected role",
        "  ctrl+s           save dialog",
        "  esc              cancel or close dialog",
        "",
        "prices by customer",
        "  c / C            next / previous customer",
        "  i / I            next / previous item (or all)",
        "  x                show costs",
        "  s / a            standard / actual costs",
        "  e / f            show expired / future prices",
        "  r                run",
    ]
    .join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, UiOptions, ViewData, cycle_slot, handle_key_event, refresh_view_data,
        render_dialog_text, shift_field, status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use erpdesk_app::{
        AppState, AppliesTo, CostMode, Customer, CustomerId, CustomerTypeId, DialogMode, Item,
        ItemId, ParameterList, PersistenceError, PersistenceResult, PriceColumn, PriceQuery,
        PriceRow, PriceSource, ROLE_ASSIGNMENT_REQUIRED, ROLE_NAME_REQUIRED, Role, RoleField,
        RoleId, RoleStore, TabKind,
    };
    use std::cell::{Cell, RefCell};
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        roles: RefCell<Vec<Role>>,
        next_id: Cell<i64>,
        fail_insert: bool,
        deleted: RefCell<Vec<RoleId>>,
        price_requests: RefCell<Vec<ParameterList>>,
        list_calls: Cell<usize>,
    }

    impl RoleStore for TestRuntime {
        fn next_role_id(&self) -> PersistenceResult<RoleId> {
            self.next_id.set(self.next_id.get() + 1);
            Ok(RoleId::new(self.next_id.get()))
        }

        fn select_role(&self, role_id: RoleId) -> PersistenceResult<Option<Role>> {
            Ok(self
                .roles
                .borrow()
                .iter()
                .find(|role| role.id == role_id)
                .cloned())
        }

        fn insert_role(&self, role: &Role) -> PersistenceResult<()> {
            if self.fail_insert {
                return Err(PersistenceError::new(
                    "INSERT INTO crmrole",
                    "UNIQUE constraint failed: crmrole.crmrole_name",
                ));
            }
            self.roles.borrow_mut().push(role.clone());
            Ok(())
        }

        fn update_role(&self, role: &Role) -> PersistenceResult<()> {
            let mut roles = self.roles.borrow_mut();
            if let Some(existing) = roles.iter_mut().find(|existing| existing.id == role.id) {
                *existing = role.clone();
            }
            Ok(())
        }

        fn delete_role(&self, role_id: RoleId) -> PersistenceResult<()> {
            self.deleted.borrow_mut().push(role_id);
            self.roles.borrow_mut().retain(|role| role.id != role_id);
            Ok(())
        }
    }

    impl PriceQuery for TestRuntime {
        fn query_prices(&self, params: &ParameterList) -> PersistenceResult<Vec<PriceRow>> {
            self.price_requests.borrow_mut().push(params.clone());
            Ok(vec![PriceRow {
                schedule_id: None,
                schedule_name: "N/A".to_owned(),
                source: PriceSource::ListPrice,
                source_label: "List Price".to_owned(),
                item_id: ItemId::new(1),
                item_number: "TRK0001".to_owned(),
                item_description: "Classic Truck".to_owned(),
                price_uom: "EA".to_owned(),
                qty_break: 0.0,
                price: 10.0,
                currency: "USD".to_owned(),
                effective: None,
                expires: None,
                cost: None,
                margin: None,
            }])
        }
    }

    impl AppRuntime for TestRuntime {
        fn list_roles(&mut self) -> anyhow::Result<Vec<Role>> {
            self.list_calls.set(self.list_calls.get() + 1);
            Ok(self.roles.borrow().clone())
        }

        fn list_customers(&mut self) -> anyhow::Result<Vec<Customer>> {
            Ok(vec![
                Customer {
                    id: CustomerId::new(1),
                    number: "TTOYS".to_owned(),
                    name: "Tremendous Toys".to_owned(),
                    customer_type_id: CustomerTypeId::new(1),
                },
                Customer {
                    id: CustomerId::new(2),
                    number: "PRODIEM".to_owned(),
                    name: "Prodiem Toys".to_owned(),
                    customer_type_id: CustomerTypeId::new(2),
                },
            ])
        }

        fn list_items(&mut self) -> anyhow::Result<Vec<Item>> {
            Ok(vec![Item {
                id: ItemId::new(1),
                number: "TRK0001".to_owned(),
                description: "Classic Truck".to_owned(),
                price_uom: "EA".to_owned(),
                list_price: 10.0,
                standard_cost: 6.0,
                actual_cost: 6.5,
            }])
        }
    }

    fn seeded_runtime() -> TestRuntime {
        let runtime = TestRuntime {
            next_id: Cell::new(10),
            ..TestRuntime::default()
        };
        runtime.roles.borrow_mut().push(Role {
            id: RoleId::new(3),
            name: "Billing".to_owned(),
            applies_to: AppliesTo {
                contact: true,
                ..AppliesTo::default()
            },
            sort_order: 1,
        });
        runtime
    }

    fn internal_tx() -> mpsc::Sender<super::InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    fn press(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        handle_key_event(
            state,
            runtime,
            view_data,
            &internal_tx(),
            KeyEvent::new(code, KeyModifiers::NONE),
        )
    }

    fn press_ctrl(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        ch: char,
    ) -> bool {
        handle_key_event(
            state,
            runtime,
            view_data,
            &internal_tx(),
            KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL),
        )
    }

    fn type_text(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        text: &str,
    ) {
        for ch in text.chars() {
            press(state, runtime, view_data, KeyCode::Char(ch));
        }
    }

    fn loaded_view(runtime: &mut TestRuntime) -> anyhow::Result<ViewData> {
        let mut view_data = ViewData::new(UiOptions::default());
        refresh_view_data(runtime, &mut view_data)?;
        Ok(view_data)
    }

    #[test]
    fn ctrl_q_quits_even_inside_dialog() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        assert!(view_data.dialog.is_some());
        assert!(press_ctrl(&mut state, &mut runtime, &mut view_data, 'q'));
        Ok(())
    }

    #[test]
    fn tab_key_cycles_tabs() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert_eq!(state.active_tab, TabKind::Prices);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::BackTab);
        assert_eq!(state.active_tab, TabKind::Roles);
        Ok(())
    }

    #[test]
    fn new_role_dialog_saves_and_refreshes_list() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;
        let calls_before = runtime.list_calls.get();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        let dialog = view_data.dialog.as_ref().expect("dialog open");
        assert_eq!(dialog.editor.mode(), DialogMode::New);
        assert_eq!(dialog.editor.role_id(), RoleId::new(11));

        type_text(&mut state, &mut runtime, &mut view_data, "Shipping");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(' '));
        press_ctrl(&mut state, &mut runtime, &mut view_data, 's');

        assert!(view_data.dialog.is_none());
        assert_eq!(state.status_line.as_deref(), Some("role 11 saved"));
        assert!(runtime.list_calls.get() > calls_before);
        let saved = view_data
            .roles
            .iter()
            .find(|role| role.id == RoleId::new(11))
            .expect("saved role listed");
        assert_eq!(saved.name, "Shipping");
        assert!(saved.applies_to.address);
        Ok(())
    }

    #[test]
    fn empty_dialog_shows_both_violations() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        press_ctrl(&mut state, &mut runtime, &mut view_data, 's');

        let dialog = view_data.dialog.as_ref().expect("dialog stays open");
        assert_eq!(dialog.violations.len(), 2);
        assert_eq!(dialog.field, RoleField::Name);
        assert_eq!(state.status_line.as_deref(), Some(ROLE_NAME_REQUIRED));

        let text = render_dialog_text(dialog);
        assert!(text.contains(ROLE_NAME_REQUIRED));
        assert!(text.contains(ROLE_ASSIGNMENT_REQUIRED));
        Ok(())
    }

    #[test]
    fn persistence_failure_keeps_dialog_open() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = TestRuntime {
            fail_insert: true,
            ..seeded_runtime()
        };
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        type_text(&mut state, &mut runtime, &mut view_data, "Billing");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(' '));
        press_ctrl(&mut state, &mut runtime, &mut view_data, 's');

        let dialog = view_data.dialog.as_ref().expect("dialog stays open");
        let error = dialog.error.as_deref().expect("error shown");
        assert!(error.contains("UNIQUE"), "{error}");
        assert!(render_dialog_text(dialog).contains("error:"));
        Ok(())
    }

    #[test]
    fn escape_in_new_mode_releases_provisional_id() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);

        assert!(view_data.dialog.is_none());
        assert_eq!(*runtime.deleted.borrow(), vec![RoleId::new(11)]);
        assert_eq!(state.status_line.as_deref(), Some("role dialog closed"));
        Ok(())
    }

    #[test]
    fn view_dialog_ignores_edits() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('v'));
        type_text(&mut state, &mut runtime, &mut view_data, "x");
        let dialog = view_data.dialog.as_ref().expect("dialog open");
        assert_eq!(dialog.editor.form().name, "Billing");
        assert!(render_dialog_text(dialog).contains("esc close"));
        assert!(!render_dialog_text(dialog).contains("ctrl+s"));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);
        assert!(runtime.deleted.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn sort_order_accepts_digits_and_sign() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('e'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::BackTab);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Backspace);
        type_text(&mut state, &mut runtime, &mut view_data, "42-");

        let dialog = view_data.dialog.as_ref().expect("dialog open");
        assert_eq!(dialog.field, RoleField::SortOrder);
        assert_eq!(dialog.editor.form().sort_order, -42);
        Ok(())
    }

    #[test]
    fn prices_tab_runs_when_customer_chosen() -> anyhow::Result<()> {
        let mut state = AppState {
            active_tab: TabKind::Prices,
            ..AppState::default()
        };
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('r'));
        assert_eq!(
            state.status_line.as_deref(),
            Some("You must specify a Customer.")
        );
        assert!(runtime.price_requests.borrow().is_empty());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('c'));
        assert_eq!(view_data.prices.customer(), Some(CustomerId::new(1)));
        assert_eq!(view_data.prices.rows().len(), 1);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('x'));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('a'));
        assert_eq!(view_data.prices.cost_mode(), CostMode::Actual);
        assert!(view_data.prices.is_column_visible(PriceColumn::Margin));

        let requests = runtime.price_requests.borrow();
        let last = requests.last().expect("query ran");
        assert_eq!(last.int("cust_id"), Some(1));
        assert!(last.contains("useActualCosts"));
        Ok(())
    }

    #[test]
    fn cost_method_requires_costs_enabled() -> anyhow::Result<()> {
        let mut state = AppState {
            active_tab: TabKind::Prices,
            ..AppState::default()
        };
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('s'));
        assert_eq!(view_data.prices.cost_mode(), CostMode::None);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("turn on costs"))
        );
        Ok(())
    }

    #[test]
    fn cycling_back_to_no_customer_clears_rows() -> anyhow::Result<()> {
        let mut state = AppState {
            active_tab: TabKind::Prices,
            ..AppState::default()
        };
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('c'));
        assert_eq!(view_data.prices.rows().len(), 1);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('C'));
        assert_eq!(view_data.prices.customer(), None);
        assert!(view_data.prices.rows().is_empty());
        Ok(())
    }

    #[test]
    fn cycle_slot_wraps_through_empty_slot() {
        assert_eq!(cycle_slot(None, 2, 1), Some(0));
        assert_eq!(cycle_slot(Some(1), 2, 1), None);
        assert_eq!(cycle_slot(None, 2, -1), Some(1));
        assert_eq!(cycle_slot(None, 0, 1), None);
    }

    #[test]
    fn shift_field_wraps() {
        assert_eq!(shift_field(RoleField::SortOrder, 1), RoleField::Name);
        assert_eq!(shift_field(RoleField::Name, -1), RoleField::SortOrder);
    }

    #[test]
    fn status_text_switches_hints_for_dialog() -> anyhow::Result<()> {
        let mut state = AppState::default();
        let mut runtime = seeded_runtime();
        let mut view_data = loaded_view(&mut runtime)?;

        assert!(status_text(&state, &view_data).contains("n new"));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('n'));
        assert!(status_text(&state, &view_data).starts_with("DIALOG"));
        Ok(())
    }
}
