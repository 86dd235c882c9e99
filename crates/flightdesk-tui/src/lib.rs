// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use flightdesk_app::{
    Backend, Confirmation, Controller, DateMode, EditSession, FLIGHT_COLUMNS, FilterCommand,
    FilterStore, ModalState, NO_FLIGHTS_TEXT, Notice, NoticeLevel, PendingQuery, QueryOutcome,
    QueryTicket, QueryTrigger, REPORT_FIELDS, RenderedView, RepeaterLine, ReportFormInput,
    RowKey, Screen, TabKind, ViewKind, ViewResponse, aggregate_label, columns, format_date,
    parse_date,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const FLASH_POLL_INTERVAL: Duration = Duration::from_secs(15);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const SCREEN_TITLES: [&str; 5] = ["dashboard", "date", "employee", "site", "drone"];

/// Runtime surface the terminal loop drives. View queries may run off the
/// UI thread; everything else completes before the next frame.
pub trait AppRuntime: Backend {
    fn spawn_view_query(&mut self, pending: PendingQuery, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.fetch_view(&pending.query);
        tx.send(InternalEvent::ViewLoaded {
            ticket: pending.ticket,
            result,
        })
        .map_err(|_| anyhow!("view query result channel closed"))
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    ViewLoaded {
        ticket: QueryTicket,
        result: Result<ViewResponse>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DashboardPane {
    #[default]
    Track,
    Reports,
}

impl DashboardPane {
    const fn view(self) -> ViewKind {
        match self {
            Self::Track => ViewKind::Track,
            Self::Reports => ViewKind::Reports,
        }
    }

    const fn toggled(self) -> Self {
        match self {
            Self::Track => Self::Reports,
            Self::Reports => Self::Track,
        }
    }
}

/// One editable filter input on the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterField {
    SingleDate,
    RangeFrom,
    RangeTo,
    Employee,
    Site,
    SiteDate,
    Drone,
    DroneDate,
    DashboardDate,
    DashboardEmployee,
}

impl FilterField {
    fn for_screen(filters: &FilterStore) -> Vec<Self> {
        match filters.screen {
            Screen::Dashboard => vec![Self::DashboardDate, Self::DashboardEmployee],
            Screen::ViewReports => match filters.active_tab() {
                TabKind::Date => match filters.date.mode {
                    DateMode::Single => vec![Self::SingleDate],
                    DateMode::Range => vec![Self::RangeFrom, Self::RangeTo],
                },
                TabKind::Employee => vec![Self::Employee],
                TabKind::Site => vec![Self::Site, Self::SiteDate],
                TabKind::Drone => vec![Self::Drone, Self::DroneDate],
            },
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::SingleDate | Self::SiteDate | Self::DroneDate | Self::DashboardDate => "date",
            Self::RangeFrom => "from",
            Self::RangeTo => "to",
            Self::Employee | Self::DashboardEmployee => "employee",
            Self::Site => "site",
            Self::Drone => "drone",
        }
    }

    const fn is_date(self) -> bool {
        matches!(
            self,
            Self::SingleDate
                | Self::RangeFrom
                | Self::RangeTo
                | Self::SiteDate
                | Self::DroneDate
                | Self::DashboardDate
        )
    }

    fn current(self, filters: &FilterStore) -> String {
        let date = |value: Option<time::Date>| value.map(format_date).unwrap_or_default();
        match self {
            Self::SingleDate => date(filters.date.single),
            Self::RangeFrom => date(filters.date.from),
            Self::RangeTo => date(filters.date.to),
            Self::Employee => filters.employee.employee.clone(),
            Self::Site => filters.site.site.clone(),
            Self::SiteDate => date(filters.site.date),
            Self::Drone => filters.drone.drone.clone(),
            Self::DroneDate => date(filters.drone.date),
            Self::DashboardDate => date(filters.dashboard.date),
            Self::DashboardEmployee => filters.dashboard.employee.clone(),
        }
    }

    fn command(self, input: &str) -> std::result::Result<FilterCommand, String> {
        let input = input.trim();
        if self.is_date() {
            let date = if input.is_empty() {
                None
            } else {
                Some(parse_date(input).ok_or_else(|| {
                    format!("invalid {} {input:?}; use YYYY-MM-DD", self.label())
                })?)
            };
            return Ok(match self {
                Self::SingleDate => FilterCommand::SetSingleDate(date),
                Self::RangeFrom => FilterCommand::SetRangeFrom(date),
                Self::RangeTo => FilterCommand::SetRangeTo(date),
                Self::SiteDate => FilterCommand::SetSiteDate(date),
                Self::DroneDate => FilterCommand::SetDroneDate(date),
                _ => FilterCommand::SetDashboardDate(date),
            });
        }
        let text = input.to_owned();
        Ok(match self {
            Self::Employee => FilterCommand::SetEmployee(text),
            Self::Site => FilterCommand::SetSite(text),
            Self::Drone => FilterCommand::SetDrone(text),
            _ => FilterCommand::SetDashboardEmployee(text),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct FilterInput {
    field_index: usize,
    buffer: String,
}

/// Addressable input inside the edit modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormSlot {
    Report(usize),
    Flight { key: RowKey, column: usize },
}

fn form_slots(form: &ReportFormInput) -> Vec<FormSlot> {
    let mut slots: Vec<FormSlot> = (0..REPORT_FIELDS.len()).map(FormSlot::Report).collect();
    for line in form.flights.lines() {
        if let RepeaterLine::Row { key, .. } = line {
            slots.extend((0..FLIGHT_COLUMNS.len()).map(|column| FormSlot::Flight { key, column }));
        }
    }
    slots
}

fn slot_value_mut(form: &mut ReportFormInput, slot: FormSlot) -> Option<&mut String> {
    match slot {
        FormSlot::Report(index) => {
            let (name, _, _) = REPORT_FIELDS.get(index)?;
            form.field_mut(name)
        }
        FormSlot::Flight { key, column } => form
            .flights
            .row_mut(key)
            .and_then(|draft| draft.field_mut(column)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    selected_rows: [usize; ViewKind::ALL.len()],
    dashboard_pane: DashboardPane,
    filter_input: Option<FilterInput>,
    form_cursor: usize,
    modal_scroll: u16,
    status: Option<Notice>,
    /// Notices waiting for the status line, oldest first.
    pending_status: VecDeque<Notice>,
    status_token: u64,
    help_visible: bool,
}

impl ViewData {
    fn selected_row(&self, view: ViewKind) -> usize {
        self.selected_rows[view.index()]
    }

    fn set_selected_row(&mut self, view: ViewKind, row: usize) {
        self.selected_rows[view.index()] = row;
    }
}

pub fn run_app<R: AppRuntime>(controller: &mut Controller, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if controller.filters().screen == Screen::Dashboard {
        reload_visible(controller, runtime, &internal_tx);
    }
    controller.poll_flash(runtime);
    let mut last_flash_poll = Instant::now();

    let mut result = Ok(());
    loop {
        process_internal_events(controller, &mut view_data, &internal_tx, &internal_rx);

        if last_flash_poll.elapsed() >= FLASH_POLL_INTERVAL {
            controller.poll_flash(runtime);
            last_flash_poll = Instant::now();
            surface_notices(controller, &mut view_data, &internal_tx);
        }

        if let Err(error) = terminal.draw(|frame| render(frame, controller, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(controller, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    controller: &mut Controller,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
                advance_status(view_data, tx);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::ViewLoaded { ticket, result } => {
                if controller.complete_query(ticket, result) == QueryOutcome::Applied {
                    let rows = controller.rendered(ticket.view).rows.len();
                    let selected = view_data.selected_row(ticket.view);
                    view_data.set_selected_row(ticket.view, selected.min(rows.saturating_sub(1)));
                }
            }
        }
    }
    surface_notices(controller, view_data, tx);
}

/// Queues controller notices behind the status line. Each one is shown for
/// `STATUS_CLEAR_AFTER` in arrival order.
fn surface_notices(controller: &mut Controller, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    view_data.pending_status.extend(controller.drain_notices());
    if view_data.status.is_none() {
        advance_status(view_data, tx);
    }
}

fn advance_status(view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    if let Some(notice) = view_data.pending_status.pop_front() {
        show_status(view_data, tx, notice);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

/// Shows `notice` now; whatever was on the status line goes back to the
/// head of the queue.
fn emit_status(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>, notice: Notice) {
    if let Some(current) = view_data.status.take()
        && current != notice
    {
        view_data.pending_status.push_front(current);
    }
    show_status(view_data, internal_tx, notice);
}

fn show_status(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>, notice: Notice) {
    view_data.status = Some(notice);
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn spawn_queries<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    pending: Vec<PendingQuery>,
) {
    for query in pending {
        let ticket = query.ticket;
        debug!(view = %ticket.view, seq = ticket.seq, "dispatching view query");
        if let Err(error) = runtime.spawn_view_query(query, tx.clone()) {
            warn!(view = %ticket.view, error = %error, "failed to start view query");
            controller.complete_query(ticket, Err(error));
        }
    }
}

fn dispatch_filter<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    command: FilterCommand,
) {
    let events = controller.dispatch(command);
    let pending = controller.follow_up(&events);
    spawn_queries(controller, runtime, tx, pending);
}

fn reload_visible<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
) {
    let pending = controller.begin_refresh();
    spawn_queries(controller, runtime, tx, pending);
}

fn apply_active<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
) {
    if controller.filters().screen == Screen::Dashboard {
        reload_visible(controller, runtime, tx);
        return;
    }
    let view = controller.active_view();
    let pending = controller
        .begin_query(view, QueryTrigger::Apply)
        .into_iter()
        .collect();
    spawn_queries(controller, runtime, tx, pending);
}

fn focused_view(controller: &Controller, view_data: &ViewData) -> ViewKind {
    match controller.filters().screen {
        Screen::Dashboard => view_data.dashboard_pane.view(),
        Screen::ViewReports => controller.active_view(),
    }
}

fn handle_key_event<R: AppRuntime>(
    controller: &mut Controller,
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

    if controller.confirmation().is_some() {
        handle_confirmation_key(controller, runtime, view_data, key);
    } else if matches!(controller.modal(), ModalState::Edit(_)) {
        handle_edit_key(controller, runtime, view_data, internal_tx, key);
    } else if matches!(controller.modal(), ModalState::View { .. }) {
        handle_view_modal_key(controller, runtime, view_data, key);
    } else if view_data.filter_input.is_some() {
        handle_filter_key(controller, runtime, view_data, internal_tx, key);
    } else {
        return handle_nav_key(controller, runtime, view_data, internal_tx, key);
    }
    surface_notices(controller, view_data, internal_tx);
    false
}

fn handle_confirmation_key<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => match controller.confirmation() {
            Some(Confirmation::DeleteReport(_)) => {
                controller.confirm_delete(runtime);
            }
            Some(Confirmation::RemoveFlight(_)) => {
                controller.confirm_remove_flight();
                clamp_form_cursor(controller, view_data);
            }
            None => {}
        },
        KeyCode::Char('n') | KeyCode::Esc => {
            controller.cancel_confirmation();
        }
        _ => {}
    }
}

fn clamp_form_cursor(controller: &Controller, view_data: &mut ViewData) {
    if let ModalState::Edit(session) = controller.modal() {
        let slots = form_slots(&session.form).len();
        view_data.form_cursor = view_data.form_cursor.min(slots.saturating_sub(1));
    }
}

fn current_form_slot(controller: &Controller, view_data: &ViewData) -> Option<FormSlot> {
    let ModalState::Edit(session) = controller.modal() else {
        return None;
    };
    form_slots(&session.form).get(view_data.form_cursor).copied()
}

fn handle_edit_key<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            controller.close_modal();
            view_data.form_cursor = 0;
        }
        KeyCode::Char('s') if ctrl => {
            controller.submit_edit(runtime);
            if !controller.modal().is_open() {
                view_data.form_cursor = 0;
            }
        }
        KeyCode::Char('n') if ctrl => {
            if let Some(row_key) = controller.add_flight_row()
                && let ModalState::Edit(session) = controller.modal()
            {
                let target = FormSlot::Flight {
                    key: row_key,
                    column: 0,
                };
                if let Some(index) = form_slots(&session.form)
                    .iter()
                    .position(|slot| *slot == target)
                {
                    view_data.form_cursor = index;
                }
            }
        }
        KeyCode::Char('d') if ctrl => match current_form_slot(controller, view_data) {
            Some(FormSlot::Flight { key, .. }) => {
                controller.request_remove_flight(key);
            }
            _ => emit_status(
                view_data,
                internal_tx,
                Notice::info("move to a flight row to remove it"),
            ),
        },
        KeyCode::Tab | KeyCode::Down => {
            if let ModalState::Edit(session) = controller.modal() {
                let count = form_slots(&session.form).len();
                if count > 0 {
                    view_data.form_cursor = (view_data.form_cursor + 1) % count;
                }
            }
        }
        KeyCode::BackTab | KeyCode::Up => {
            if let ModalState::Edit(session) = controller.modal() {
                let count = form_slots(&session.form).len();
                if count > 0 {
                    view_data.form_cursor = (view_data.form_cursor + count - 1) % count;
                }
            }
        }
        KeyCode::Backspace => {
            if let Some(slot) = current_form_slot(controller, view_data)
                && let Some(value) = controller
                    .edit_form_mut()
                    .and_then(|form| slot_value_mut(form, slot))
            {
                value.pop();
            }
        }
        KeyCode::Char(ch) if !ctrl => {
            if let Some(slot) = current_form_slot(controller, view_data)
                && let Some(value) = controller
                    .edit_form_mut()
                    .and_then(|form| slot_value_mut(form, slot))
            {
                value.push(ch);
            }
        }
        _ => {}
    }
}

fn handle_view_modal_key<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    let report_id = match controller.modal() {
        ModalState::View { report_id, .. } => *report_id,
        _ => return,
    };
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
            controller.close_modal();
            view_data.modal_scroll = 0;
        }
        KeyCode::Char('e') => {
            view_data.modal_scroll = 0;
            view_data.form_cursor = 0;
            controller.open_edit(runtime, report_id);
        }
        KeyCode::Char('d') => controller.request_delete(report_id),
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.modal_scroll = view_data.modal_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.modal_scroll = view_data.modal_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn begin_filter_input(controller: &Controller, view_data: &mut ViewData, field_index: usize) {
    let fields = FilterField::for_screen(controller.filters());
    let Some(field) = fields.get(field_index) else {
        view_data.filter_input = None;
        return;
    };
    view_data.filter_input = Some(FilterInput {
        field_index,
        buffer: field.current(controller.filters()),
    });
}

/// Sends the buffered value of the focused filter. Returns false and keeps
/// the editor open when the value does not parse.
fn commit_filter_input<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) -> bool {
    let Some(input) = &view_data.filter_input else {
        return false;
    };
    let fields = FilterField::for_screen(controller.filters());
    let Some(field) = fields.get(input.field_index).copied() else {
        return false;
    };
    match field.command(&input.buffer) {
        Ok(command) => {
            dispatch_filter(controller, runtime, internal_tx, command);
            true
        }
        Err(message) => {
            emit_status(view_data, internal_tx, Notice::warning(message));
            false
        }
    }
}

fn handle_filter_key<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let field_count = FilterField::for_screen(controller.filters()).len();
    let Some(field_index) = view_data.filter_input.as_ref().map(|input| input.field_index) else {
        return;
    };
    match key.code {
        KeyCode::Esc => view_data.filter_input = None,
        KeyCode::Enter => {
            if commit_filter_input(controller, runtime, view_data, internal_tx) {
                view_data.filter_input = None;
            }
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if field_count == 0 {
                view_data.filter_input = None;
                return;
            }
            if commit_filter_input(controller, runtime, view_data, internal_tx) {
                let next = if key.code == KeyCode::Tab {
                    (field_index + 1) % field_count
                } else {
                    (field_index + field_count - 1) % field_count
                };
                begin_filter_input(controller, view_data, next);
            }
        }
        KeyCode::Backspace => {
            if let Some(input) = view_data.filter_input.as_mut() {
                input.buffer.pop();
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(input) = view_data.filter_input.as_mut() {
                input.buffer.push(ch);
            }
        }
        _ => {}
    }
}

fn move_selection(controller: &Controller, view_data: &mut ViewData, delta: isize) {
    let view = focused_view(controller, view_data);
    let rows = controller.rendered(view).rows.len();
    if rows == 0 {
        view_data.set_selected_row(view, 0);
        return;
    }
    let current = view_data.selected_row(view).min(rows - 1);
    let next = current.saturating_add_signed(delta).min(rows - 1);
    view_data.set_selected_row(view, next);
}

fn selected_report(controller: &Controller, view_data: &ViewData) -> Option<flightdesk_app::ReportId> {
    let view = focused_view(controller, view_data);
    controller
        .rendered(view)
        .target_at(view_data.selected_row(view))
}

fn handle_nav_key<R: AppRuntime>(
    controller: &mut Controller,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('t') => {
            let screen = match controller.filters().screen {
                Screen::Dashboard => Screen::ViewReports,
                Screen::ViewReports => Screen::Dashboard,
            };
            dispatch_filter(controller, runtime, internal_tx, FilterCommand::ShowScreen(screen));
        }
        KeyCode::Char(digit @ '1'..='4') => {
            let index = usize::from(digit as u8 - b'1');
            dispatch_filter(
                controller,
                runtime,
                internal_tx,
                FilterCommand::ActivateTab(TabKind::ALL[index]),
            );
        }
        KeyCode::Char('b') | KeyCode::Char('f')
            if controller.filters().screen == Screen::ViewReports =>
        {
            let count = TabKind::ALL.len();
            let current = TabKind::ALL
                .iter()
                .position(|tab| *tab == controller.filters().active_tab())
                .unwrap_or(0);
            let next = if key.code == KeyCode::Char('f') {
                (current + 1) % count
            } else {
                (current + count - 1) % count
            };
            dispatch_filter(
                controller,
                runtime,
                internal_tx,
                FilterCommand::ActivateTab(TabKind::ALL[next]),
            );
        }
        KeyCode::Tab if controller.filters().screen == Screen::Dashboard => {
            view_data.dashboard_pane = view_data.dashboard_pane.toggled();
        }
        KeyCode::Char('j') | KeyCode::Down => move_selection(controller, view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_selection(controller, view_data, -1),
        KeyCode::Char('g') => move_selection(controller, view_data, isize::MIN),
        KeyCode::Char('G') => move_selection(controller, view_data, isize::MAX),
        KeyCode::Char('i') | KeyCode::Char('/') => begin_filter_input(controller, view_data, 0),
        KeyCode::Char('m')
            if controller.filters().screen == Screen::ViewReports
                && controller.filters().active_tab() == TabKind::Date =>
        {
            let mode = controller.filters().date.mode.toggled();
            dispatch_filter(controller, runtime, internal_tx, FilterCommand::SetDateMode(mode));
        }
        KeyCode::Char('a') => apply_active(controller, runtime, internal_tx),
        KeyCode::Char('r') => reload_visible(controller, runtime, internal_tx),
        KeyCode::Enter | KeyCode::Char('v') => match selected_report(controller, view_data) {
            Some(report_id) => {
                view_data.modal_scroll = 0;
                controller.open_view(runtime, report_id);
            }
            None => emit_status(view_data, internal_tx, Notice::info("no report on this row")),
        },
        KeyCode::Char('e') => match selected_report(controller, view_data) {
            Some(report_id) => {
                view_data.form_cursor = 0;
                controller.open_edit(runtime, report_id);
            }
            None => emit_status(view_data, internal_tx, Notice::info("no report on this row")),
        },
        KeyCode::Char('d') => match selected_report(controller, view_data) {
            Some(report_id) => controller.request_delete(report_id),
            None => emit_status(view_data, internal_tx, Notice::info("no report on this row")),
        },
        _ => {}
    }
    surface_notices(controller, view_data, internal_tx);
    false
}

fn render(frame: &mut ratatui::Frame<'_>, controller: &Controller, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let tabs = Tabs::new(SCREEN_TITLES.to_vec())
        .block(Block::default().title("flightdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected_screen_index(controller.filters()));
    frame.render_widget(tabs, layout[0]);

    let filters = Paragraph::new(filter_bar_text(controller.filters(), view_data))
        .block(Block::default().borders(Borders::ALL).title("filters"));
    frame.render_widget(filters, layout[1]);

    match controller.filters().screen {
        Screen::Dashboard => {
            let halves = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(layout[2]);
            for (area, pane) in halves.iter().zip([DashboardPane::Track, DashboardPane::Reports]) {
                render_table(
                    frame,
                    *area,
                    controller,
                    view_data,
                    pane.view(),
                    view_data.dashboard_pane == pane,
                );
            }
        }
        Screen::ViewReports => {
            render_table(
                frame,
                layout[2],
                controller,
                view_data,
                controller.active_view(),
                true,
            );
        }
    }

    let status_style = match view_data.status.as_ref().map(|notice| notice.level) {
        Some(NoticeLevel::Error) => Style::default().fg(Color::Red),
        Some(NoticeLevel::Warning) => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Gray),
    };
    let status = Paragraph::new(status_text(controller, view_data))
        .style(status_style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    match controller.modal() {
        ModalState::Closed => {}
        ModalState::View { report_id, text } => {
            let area = centered_rect(80, 75, frame.area());
            frame.render_widget(Clear, area);
            let body = Paragraph::new(text.as_str())
                .wrap(Wrap { trim: false })
                .scroll((view_data.modal_scroll, 0))
                .block(
                    Block::default()
                        .title(format!("report {report_id}"))
                        .borders(Borders::ALL),
                );
            frame.render_widget(body, area);
        }
        ModalState::Edit(session) => {
            let area = centered_rect(85, 85, frame.area());
            frame.render_widget(Clear, area);
            let body = Paragraph::new(edit_form_text(session, view_data.form_cursor))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title(format!("edit report {}", session.report_id))
                        .borders(Borders::ALL)
                        .style(Style::default().fg(Color::Cyan)),
                );
            frame.render_widget(body, area);
        }
    }

    if let Some(prompt) = controller.confirmation_prompt() {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let confirm = Paragraph::new(format!("{prompt}\n\ny confirm | n cancel"))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("confirm")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Yellow)),
            );
        frame.render_widget(confirm, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn selected_screen_index(filters: &FilterStore) -> usize {
    match filters.screen {
        Screen::Dashboard => 0,
        Screen::ViewReports => {
            1 + TabKind::ALL
                .iter()
                .position(|tab| *tab == filters.active_tab())
                .unwrap_or(0)
        }
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    controller: &Controller,
    view_data: &ViewData,
    view: ViewKind,
    focused: bool,
) {
    let rendered = controller.rendered(view);
    let headers = columns(view);
    let widths = vec![Constraint::Min(8); headers.len().max(1)];
    let header = Row::new(headers.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let selected = view_data.selected_row(view);
    let rows = rendered.rows.iter().enumerate().map(|(row_index, row)| {
        let mut style = Style::default();
        if row.target.is_none() {
            style = style.fg(Color::DarkGray);
        }
        if focused && row_index == selected {
            style = Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
        }
        Row::new(row.cells.iter().map(|cell| Cell::from(cell.as_str()))).style(style)
    });

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(rendered, controller.is_loading(view)))
                .borders(Borders::ALL)
                .border_style(border_style),
        );
    frame.render_widget(table, area);
}

fn table_title(rendered: &RenderedView, loading: bool) -> String {
    let mut title = format!("{} ({} rows)", rendered.view, rendered.rows.len());
    if let Some(label) = aggregate_label(rendered.view) {
        let value = rendered.aggregate.as_deref().unwrap_or("-");
        title.push_str(&format!(" | {label}: {value}"));
    }
    if loading {
        title.push_str(" | loading");
    }
    title
}

fn filter_bar_text(filters: &FilterStore, view_data: &ViewData) -> String {
    let fields = FilterField::for_screen(filters);
    let mut parts = Vec::with_capacity(fields.len() + 1);
    if filters.screen == Screen::ViewReports && filters.active_tab() == TabKind::Date {
        parts.push(format!("mode: {}", filters.date.mode.as_str()));
    }
    for (index, field) in fields.iter().enumerate() {
        let editing = view_data
            .filter_input
            .as_ref()
            .filter(|input| input.field_index == index);
        let part = match editing {
            Some(input) => format!("{}: [{}_]", field.label(), input.buffer),
            None => {
                let value = field.current(filters);
                let shown = if value.is_empty() { "any" } else { value.as_str() };
                format!("{}: {shown}", field.label())
            }
        };
        parts.push(part);
    }
    parts.join(" | ")
}

fn edit_form_text(session: &EditSession, cursor: usize) -> String {
    let form = &session.form;
    let slots = form_slots(form);
    let focused = slots.get(cursor).copied();
    let mut lines = Vec::new();

    for (index, (name, label, _)) in REPORT_FIELDS.iter().enumerate() {
        let value = form.field(name).unwrap_or_default();
        if focused == Some(FormSlot::Report(index)) {
            lines.push(format!("> {label}: [{value}_]"));
        } else {
            lines.push(format!("  {label}: {value}"));
        }
    }

    lines.push(String::new());
    let header = FLIGHT_COLUMNS
        .iter()
        .map(|(label, _)| *label)
        .collect::<Vec<_>>()
        .join(" | ");
    lines.push(format!("  Flights: # | {header}"));
    for line in form.flights.lines() {
        match line {
            RepeaterLine::Placeholder => lines.push(format!("  {NO_FLIGHTS_TEXT}")),
            RepeaterLine::Row {
                key,
                position,
                draft,
            } => {
                let cells = (0..FLIGHT_COLUMNS.len())
                    .map(|column| {
                        let value = draft.field(column).unwrap_or_default();
                        if focused == Some(FormSlot::Flight { key, column }) {
                            format!("[{value}_]")
                        } else if value.is_empty() {
                            "-".to_owned()
                        } else {
                            value.to_owned()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" | ");
                let marker = if matches!(focused, Some(FormSlot::Flight { key: k, .. }) if k == key)
                {
                    ">"
                } else {
                    " "
                };
                lines.push(format!("{marker} {position} | {cells}"));
            }
        }
    }

    if !session.errors.is_empty() {
        lines.push(String::new());
        lines.push("  Errors:".to_owned());
        lines.extend(session.errors.iter().map(|error| format!("  - {error}")));
    }

    lines.push(String::new());
    lines.push(
        "tab/shift+tab field | ctrl+n add flight | ctrl+d remove flight | ctrl+s save | esc cancel"
            .to_owned(),
    );
    lines.join("\n")
}

fn status_text(controller: &Controller, view_data: &ViewData) -> String {
    let hints = if view_data.filter_input.is_some() {
        "type value | tab next | enter set | esc cancel"
    } else if controller.filters().screen == Screen::Dashboard {
        "t reports | tab pane | i filter | a apply | r refresh | enter view | e edit | d delete | ? help | ctrl+q"
    } else {
        "t dashboard | 1-4 b/f tabs | i filter | m mode | a apply | r refresh | enter view | e edit | d delete | ? help | ctrl+q"
    };
    let waiting = view_data.pending_status.len();
    match &view_data.status {
        Some(notice) if waiting > 0 => format!(
            "{} | {} (+{waiting} more) | {hints}",
            notice.level.as_str(),
            notice.message.replace('\n', "; ")
        ),
        Some(notice) => format!(
            "{} | {} | {hints}",
            notice.level.as_str(),
            notice.message.replace('\n', "; ")
        ),
        None => hints.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
screens: t dashboard/reports | 1-4 date/employee/site/drone | b/f prev/next tab | tab dashboard pane\n\
filters: i or / edit | tab/shift+tab next field | enter set | esc cancel | m date mode\n\
queries: a apply | r refresh visible tables\n\
rows: j/k move | g/G first/last | enter or v view | e edit | d delete\n\
report view: j/k scroll | e edit | d delete | esc close\n\
edit: tab/shift+tab field | ctrl+n add flight | ctrl+d remove flight | ctrl+s save | esc cancel\n\
confirm: y or enter yes | n or esc no"
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
        AppRuntime, FilterField, FilterInput, InternalEvent, ViewData, edit_form_text,
        filter_bar_text, handle_key_event, process_internal_events, status_text, surface_notices,
        table_title,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use flightdesk_app::{
        ACTIVE_TAB_KEY, Controller, DateMode, EditSession, FilterCommand, FixedClock, FlashMessage,
        FragmentPurpose, MemoryPrefs, ModalState, NoticeLevel, REPORTS_PATH, RenderedView,
        ReportFormInput, ReportId, ReportsResponse, Screen, TRACK_PATH, TabKind, TrackResponse,
        VIEW_EMPLOYEE_PATH, ViewKind, ViewResponse,
    };
    use flightdesk_testkit::{
        BackendCall, FakeBackend, ReportFaker, edit_fragment, fixture_date, preview_fragment,
    };
    use std::sync::mpsc::{self, Receiver, Sender};

    impl AppRuntime for FakeBackend {}

    fn controller() -> Controller {
        Controller::new(
            Box::new(MemoryPrefs::default()),
            Box::new(FixedClock(fixture_date())),
        )
    }

    fn channel() -> (Sender<InternalEvent>, Receiver<InternalEvent>) {
        mpsc::channel()
    }

    fn press(
        controller: &mut Controller,
        backend: &mut FakeBackend,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        code: KeyCode,
    ) -> bool {
        handle_key_event(
            controller,
            backend,
            view_data,
            tx,
            KeyEvent::new(code, KeyModifiers::NONE),
        )
    }

    fn press_ctrl(
        controller: &mut Controller,
        backend: &mut FakeBackend,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        ch: char,
    ) {
        handle_key_event(
            controller,
            backend,
            view_data,
            tx,
            KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL),
        );
    }

    fn type_text(
        controller: &mut Controller,
        backend: &mut FakeBackend,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        text: &str,
    ) {
        for ch in text.chars() {
            press(controller, backend, view_data, tx, KeyCode::Char(ch));
        }
    }

    fn dashboard_backend() -> FakeBackend {
        let mut faker = ReportFaker::new(11);
        let mut backend = FakeBackend::new();
        backend
            .respond(
                TRACK_PATH,
                ViewResponse::Track(TrackResponse {
                    rows: faker.track_rows(4),
                    date: Some("2024-05-10".to_owned()),
                }),
            )
            .respond(
                REPORTS_PATH,
                ViewResponse::Reports(ReportsResponse {
                    reports: faker.report_summaries(3, fixture_date()),
                }),
            );
        backend
    }

    #[test]
    fn ctrl_q_quits() {
        let mut app = controller();
        let mut backend = FakeBackend::new();
        let mut view_data = ViewData::default();
        let (tx, _rx) = channel();
        let quit = handle_key_event(
            &mut app,
            &mut backend,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        );
        assert!(quit);
    }

    #[test]
    fn digit_key_activates_tab_without_querying() {
        let prefs = MemoryPrefs::with_value(ACTIVE_TAB_KEY, "date");
        let mut app = Controller::new(Box::new(prefs), Box::new(FixedClock(fixture_date())));
        let mut backend = FakeBackend::new();
        let mut view_data = ViewData::default();
        let (tx, _rx) = channel();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('3'));
        assert_eq!(app.filters().active_tab(), TabKind::Site);
        assert_eq!(app.filters().screen, Screen::ViewReports);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn t_key_opens_dashboard_and_loads_both_tables() {
        let mut app = controller();
        let mut backend = dashboard_backend();
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('t'));
        assert_eq!(app.filters().screen, Screen::Dashboard);
        assert!(app.is_loading(ViewKind::Track));

        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        assert_eq!(app.rendered(ViewKind::Track).rows.len(), 4);
        assert_eq!(app.rendered(ViewKind::Reports).rows.len(), 3);
        assert!(!app.is_loading(ViewKind::Reports));
        assert_eq!(
            backend.view_requests(),
            vec!["/api/track?date=", "/api/reports?date=&employee="]
        );
    }

    #[test]
    fn r_key_refreshes_both_dashboard_tables() {
        let mut app = controller();
        let mut backend = dashboard_backend();
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('t'));
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        backend.clear_calls();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('r'));
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        assert_eq!(
            backend.view_requests(),
            vec!["/api/track?date=", "/api/reports?date=&employee="]
        );
        assert!(!app.is_loading(ViewKind::Track));
    }

    #[test]
    fn filter_input_commits_and_auto_applies() {
        let mut app = controller();
        app.set_active_tab(TabKind::Employee);
        let mut backend = FakeBackend::new();
        backend.respond(
            VIEW_EMPLOYEE_PATH,
            ViewResponse::Employee(Default::default()),
        );
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('i'));
        assert_eq!(view_data.filter_input, Some(FilterInput::default()));
        type_text(&mut app, &mut backend, &mut view_data, &tx, "1001");
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Enter);
        process_internal_events(&mut app, &mut view_data, &tx, &rx);

        assert_eq!(view_data.filter_input, None);
        assert_eq!(app.filters().employee.employee, "1001");
        assert_eq!(
            backend.view_requests(),
            vec!["/api/view/employee?employee=1001"]
        );
    }

    #[test]
    fn invalid_date_keeps_filter_editor_open() {
        let mut app = controller();
        app.set_active_tab(TabKind::Site);
        let mut backend = FakeBackend::new();
        let mut view_data = ViewData::default();
        let (tx, _rx) = channel();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('i'));
        type_text(&mut app, &mut backend, &mut view_data, &tx, "North Pit");
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Tab);
        assert_eq!(
            view_data.filter_input.as_ref().map(|input| input.field_index),
            Some(1)
        );
        backend.clear_calls();

        type_text(&mut app, &mut backend, &mut view_data, &tx, "2024-13-40");
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Enter);
        assert!(view_data.filter_input.is_some());
        assert_eq!(app.filters().site.date, None);
        let status = view_data.status.as_ref().expect("warning expected");
        assert_eq!(status.level, NoticeLevel::Warning);
        assert!(status.message.contains("YYYY-MM-DD"), "{}", status.message);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn date_mode_key_switches_filter_fields() {
        let mut app = controller();
        app.set_active_tab(TabKind::Date);
        let mut backend = FakeBackend::new();
        let mut view_data = ViewData::default();
        let (tx, _rx) = channel();

        assert_eq!(
            FilterField::for_screen(app.filters()),
            vec![FilterField::SingleDate]
        );
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('m'));
        assert_eq!(app.filters().date.mode, DateMode::Range);
        assert_eq!(
            filter_bar_text(app.filters(), &view_data),
            "mode: range | from: any | to: any"
        );
    }

    #[test]
    fn enter_opens_report_view_and_esc_closes() {
        let mut app = controller();
        let mut backend = dashboard_backend();
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('t'));
        process_internal_events(&mut app, &mut view_data, &tx, &rx);

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Tab);
        let report_id = app
            .rendered(ViewKind::Reports)
            .target_at(0)
            .expect("report row expected");
        backend.fragment(
            report_id,
            FragmentPurpose::Preview,
            preview_fragment(report_id),
        );

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Enter);
        match app.modal() {
            ModalState::View { report_id: shown, text } => {
                assert_eq!(*shown, report_id);
                assert!(text.contains("North Pit"), "{text}");
            }
            other => panic!("expected view modal, got {other:?}"),
        }

        backend.clear_calls();
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Esc);
        assert_eq!(app.modal(), &ModalState::Closed);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn edit_keys_add_remove_and_submit() {
        let mut app = controller();
        let mut backend = dashboard_backend();
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('t'));
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Tab);

        let report_id = app
            .rendered(ViewKind::Reports)
            .target_at(0)
            .expect("report row expected");
        backend
            .fragment(report_id, FragmentPurpose::Edit, edit_fragment(report_id))
            .edit_outcome(true, "");

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('e'));
        let ModalState::Edit(session) = app.modal() else {
            panic!("expected edit modal");
        };
        assert_eq!(session.form.flights.len(), 2);

        press_ctrl(&mut app, &mut backend, &mut view_data, &tx, 'n');
        let ModalState::Edit(session) = app.modal() else {
            panic!("expected edit modal");
        };
        assert_eq!(session.form.flights.len(), 3);

        press_ctrl(&mut app, &mut backend, &mut view_data, &tx, 'd');
        assert_eq!(
            app.confirmation_prompt().as_deref(),
            Some("Remove flight 3?")
        );
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('y'));
        let ModalState::Edit(session) = app.modal() else {
            panic!("expected edit modal");
        };
        assert_eq!(session.form.flights.len(), 2);

        backend.clear_calls();
        press_ctrl(&mut app, &mut backend, &mut view_data, &tx, 's');
        assert_eq!(app.modal(), &ModalState::Closed);
        assert!(matches!(
            backend.calls().first(),
            Some(BackendCall::SubmitEdit { .. })
        ));
        assert_eq!(
            backend.view_requests(),
            vec!["/api/reports?date=&employee="]
        );
        let status = view_data.status.as_ref().expect("notice expected");
        assert_eq!(status.message, "Report updated.");
    }

    #[test]
    fn typing_in_edit_modal_updates_focused_field() {
        let mut app = controller();
        let report_id = ReportId::new(42);
        let mut backend = FakeBackend::new();
        backend.fragment(report_id, FragmentPurpose::Edit, edit_fragment(report_id));
        let mut view_data = ViewData::default();
        let (tx, _rx) = channel();
        assert!(app.open_edit(&mut backend, report_id));

        for _ in 0..3 {
            press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Tab);
        }
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Backspace);
        type_text(&mut app, &mut backend, &mut view_data, &tx, "y Doe");
        let ModalState::Edit(session) = app.modal() else {
            panic!("expected edit modal");
        };
        assert_eq!(session.form.pilot_name, "Jane Doy Doe");
    }

    #[test]
    fn delete_prompt_cancels_without_calling_server() {
        let mut app = controller();
        let mut backend = dashboard_backend();
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('t'));
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Tab);
        backend.clear_calls();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('d'));
        let prompt = app.confirmation_prompt().expect("prompt expected");
        assert!(prompt.starts_with("Are you sure you want to delete report"));
        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('n'));
        assert_eq!(app.confirmation(), None);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn failed_query_surfaces_error_status() {
        let mut app = controller();
        app.set_active_tab(TabKind::Employee);
        app.dispatch(FilterCommand::SetEmployee("1001".to_owned()));
        let mut backend = FakeBackend::new();
        backend.fail(VIEW_EMPLOYEE_PATH, "connection refused");
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('a'));
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        let status = status_text(&app, &view_data);
        assert!(
            status.starts_with("error | Failed to load employee results: connection refused"),
            "{status}"
        );
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut app = controller();
        let mut view_data = ViewData {
            status: Some(flightdesk_app::Notice::info("kept")),
            status_token: 2,
            ..ViewData::default()
        };
        let (tx, rx) = channel();
        tx.send(InternalEvent::ClearStatus { token: 1 })
            .expect("send should succeed");
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        assert!(view_data.status.is_some());

        tx.send(InternalEvent::ClearStatus { token: 2 })
            .expect("send should succeed");
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        assert!(view_data.status.is_none());
    }

    #[test]
    fn queued_flash_messages_are_each_shown() {
        let mut app = controller();
        let mut backend = FakeBackend::new();
        backend.flash(vec![
            FlashMessage {
                category: "info".to_owned(),
                message: "First".to_owned(),
            },
            FlashMessage {
                category: "warning".to_owned(),
                message: "Second".to_owned(),
            },
        ]);
        let mut view_data = ViewData::default();
        let (tx, rx) = channel();

        assert_eq!(app.poll_flash(&mut backend), 2);
        surface_notices(&mut app, &mut view_data, &tx);
        assert_eq!(
            view_data.status.as_ref().map(|notice| notice.message.as_str()),
            Some("First")
        );
        assert!(status_text(&app, &view_data).starts_with("info | First (+1 more) |"));

        tx.send(InternalEvent::ClearStatus {
            token: view_data.status_token,
        })
        .expect("send should succeed");
        process_internal_events(&mut app, &mut view_data, &tx, &rx);
        let shown = view_data.status.as_ref().expect("second notice expected");
        assert_eq!(shown.message, "Second");
        assert_eq!(shown.level, NoticeLevel::Warning);
        assert!(view_data.pending_status.is_empty());
    }

    #[test]
    fn local_feedback_does_not_drop_queued_notice() {
        let mut app = controller();
        let mut backend = FakeBackend::new();
        let mut view_data = ViewData {
            status: Some(flightdesk_app::Notice::error("Failed to load date results")),
            status_token: 1,
            ..ViewData::default()
        };
        let (tx, _rx) = channel();

        press(&mut app, &mut backend, &mut view_data, &tx, KeyCode::Char('v'));
        assert_eq!(
            view_data.status.as_ref().map(|notice| notice.message.as_str()),
            Some("no report on this row")
        );
        assert_eq!(
            view_data.pending_status.front().map(|notice| notice.message.as_str()),
            Some("Failed to load date results")
        );
    }

    #[test]
    fn table_title_shows_aggregate_and_loading() {
        let view = ViewKind::Tab(TabKind::Site);
        let mut rendered = RenderedView::empty(view);
        assert_eq!(table_title(&rendered, false), "site (0 rows) | Total Area: 0.000");
        rendered.aggregate = Some("12.340".to_owned());
        assert_eq!(
            table_title(&rendered, true),
            "site (0 rows) | Total Area: 12.340 | loading"
        );
        assert_eq!(
            table_title(&RenderedView::empty(ViewKind::Track), false),
            "track (0 rows)"
        );
    }

    #[test]
    fn edit_form_text_marks_cursor_and_placeholder() {
        let session = EditSession {
            report_id: ReportId::new(5),
            form: ReportFormInput::empty(ReportId::new(5)),
            errors: vec!["Remark is required".to_owned()],
        };
        let text = edit_form_text(&session, 0);
        assert!(text.contains("> Date: [_]"), "{text}");
        assert!(text.contains("No flights recorded."), "{text}");
        assert!(text.contains("  - Remark is required"), "{text}");
    }
}
