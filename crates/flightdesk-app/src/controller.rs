// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::HashSet;
use time::{Date, OffsetDateTime};
use tracing::{debug, error, info, warn};

use crate::fragment::{fragment_text, scan_form};
use crate::{
    ACTIVE_TAB_KEY, FilterCommand, FilterEvent, FilterStore, FlashMessage, FormErrors,
    FragmentPurpose, MutationOutcome, Notice, NoticeLevel, PrefsPort, Query, QueryPlan,
    QueryRejection, RenderedView, ReportFormInput, ReportId, RowKey, Screen, TabKind, ViewKind,
    ViewResponse, build_query, build_reports_query, build_track_query, render,
};

/// Network side of the dashboard. Every call blocks until the server
/// answers or the transport gives up.
pub trait Backend {
    fn fetch_view(&mut self, query: &Query) -> Result<ViewResponse>;
    fn fetch_fragment(&mut self, report_id: ReportId, purpose: FragmentPurpose) -> Result<String>;
    fn submit_edit(&mut self, action: &str, fields: &[(String, String)])
    -> Result<MutationOutcome>;
    fn delete_report(&mut self, report_id: ReportId) -> Result<MutationOutcome>;
    fn flash_messages(&mut self) -> Result<Vec<FlashMessage>>;
}

pub trait Clock {
    fn today(&self) -> Date;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTrigger {
    /// Apply, Refresh, or a re-query after a mutation. Every rejection is
    /// reported.
    Apply,
    /// A filter field changed. Incomplete filters are skipped quietly.
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryTicket {
    pub view: ViewKind,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub ticket: QueryTicket,
    pub query: Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Applied,
    /// A newer query for the same view was issued; the response was dropped.
    Stale,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Succeeded,
    /// Client-side validation failed; nothing was sent.
    Invalid,
    /// The server answered `ok: false`.
    Rejected,
    Failed,
    /// Nothing to act on (no edit form open, nothing awaiting confirmation).
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub report_id: ReportId,
    pub form: ReportFormInput,
    /// Messages from the last failed submit attempt.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    View {
        report_id: ReportId,
        text: String,
    },
    Edit(EditSession),
}

impl ModalState {
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// A destructive action waiting for a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    DeleteReport(ReportId),
    RemoveFlight(RowKey),
}

impl Confirmation {
    pub fn prompt(self, form: Option<&ReportFormInput>) -> String {
        match self {
            Self::DeleteReport(report_id) => {
                format!("Are you sure you want to delete report {report_id}?")
            }
            Self::RemoveFlight(key) => {
                let position = form
                    .and_then(|form| form.flights.position_of(key))
                    .map_or_else(String::new, |position| format!(" {position}"));
                format!("Remove flight{position}?")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ViewSlot {
    latest: u64,
    loading: bool,
    rendered: RenderedView,
}

impl ViewSlot {
    fn new(view: ViewKind) -> Self {
        Self {
            latest: 0,
            loading: false,
            rendered: RenderedView::empty(view),
        }
    }
}

pub struct Controller {
    prefs: Box<dyn PrefsPort>,
    clock: Box<dyn Clock>,
    filters: FilterStore,
    slots: Vec<ViewSlot>,
    next_seq: u64,
    modal: ModalState,
    confirmation: Option<Confirmation>,
    notices: Vec<Notice>,
    seen_flash: HashSet<FlashMessage>,
    flash_failing: bool,
    auto_apply: bool,
}

impl Controller {
    pub fn new(prefs: Box<dyn PrefsPort>, clock: Box<dyn Clock>) -> Self {
        let filters = FilterStore::restore(prefs.as_ref());
        debug!(tab = filters.active_tab().as_str(), "restored active tab");
        Self {
            prefs,
            clock,
            filters,
            slots: ViewKind::ALL.into_iter().map(ViewSlot::new).collect(),
            next_seq: 0,
            modal: ModalState::Closed,
            confirmation: None,
            notices: Vec::new(),
            seen_flash: HashSet::new(),
            flash_failing: false,
            auto_apply: true,
        }
    }

    #[must_use]
    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        self.auto_apply = auto_apply;
        self
    }

    pub const fn auto_apply(&self) -> bool {
        self.auto_apply
    }

    pub const fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    pub fn rendered(&self, view: ViewKind) -> &RenderedView {
        &self.slots[view.index()].rendered
    }

    pub fn is_loading(&self, view: ViewKind) -> bool {
        self.slots[view.index()].loading
    }

    pub const fn active_view(&self) -> ViewKind {
        self.filters.active_view()
    }

    /// Views drawn on the current screen.
    pub fn visible_views(&self) -> Vec<ViewKind> {
        match self.filters.screen {
            Screen::Dashboard => vec![ViewKind::Track, ViewKind::Reports],
            Screen::ViewReports => vec![ViewKind::Tab(self.filters.active_tab())],
        }
    }

    pub const fn modal(&self) -> &ModalState {
        &self.modal
    }

    pub fn edit_form_mut(&mut self) -> Option<&mut ReportFormInput> {
        match &mut self.modal {
            ModalState::Edit(session) => Some(&mut session.form),
            _ => None,
        }
    }

    pub const fn confirmation(&self) -> Option<Confirmation> {
        self.confirmation
    }

    pub fn confirmation_prompt(&self) -> Option<String> {
        let form = match &self.modal {
            ModalState::Edit(session) => Some(&session.form),
            _ => None,
        };
        self.confirmation.map(|confirmation| confirmation.prompt(form))
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Updates filter state, persisting tab changes, and returns what
    /// changed. Issues no queries; see [`Controller::follow_up`].
    pub fn dispatch(&mut self, command: FilterCommand) -> Vec<FilterEvent> {
        let events = self.filters.dispatch(command);
        for event in &events {
            if let FilterEvent::TabChanged(tab) = event {
                self.persist_tab(*tab);
            }
        }
        events
    }

    pub fn set_active_tab(&mut self, tab: TabKind) -> Vec<FilterEvent> {
        self.dispatch(FilterCommand::ActivateTab(tab))
    }

    fn persist_tab(&mut self, tab: TabKind) {
        if let Err(error) = self.prefs.set(ACTIVE_TAB_KEY, tab.as_str()) {
            warn!(tab = tab.as_str(), error = %error, "failed to persist active tab");
            self.notify(Notice::warning(format!(
                "Could not remember the {} tab: {error}",
                tab.label()
            )));
        }
    }

    /// Queries implied by `events`. Entering the dashboard loads both of its
    /// tables; with auto-apply on, a filter change re-queries its view when
    /// that view is on screen.
    pub fn follow_up(&mut self, events: &[FilterEvent]) -> Vec<PendingQuery> {
        let mut views = Vec::new();
        for event in events {
            match event {
                FilterEvent::ScreenChanged(Screen::Dashboard) => {
                    views.extend([ViewKind::Track, ViewKind::Reports]);
                }
                FilterEvent::FilterChanged(view) if self.auto_apply => {
                    if self.visible_views().contains(view) {
                        views.push(*view);
                    }
                }
                _ => {}
            }
        }
        let mut seen = HashSet::new();
        views
            .into_iter()
            .filter(|view| seen.insert(*view))
            .filter_map(|view| self.begin_query(view, QueryTrigger::Change))
            .collect()
    }

    /// Dispatches `command` and runs any follow-up queries to completion.
    pub fn update(&mut self, backend: &mut dyn Backend, command: FilterCommand) -> Vec<FilterEvent> {
        let events = self.dispatch(command);
        for pending in self.follow_up(&events) {
            let result = backend.fetch_view(&pending.query);
            self.complete_query(pending.ticket, result);
        }
        events
    }

    fn plan(&self, view: ViewKind) -> Result<QueryPlan, QueryRejection> {
        match view {
            ViewKind::Track => Ok(QueryPlan::Fetch(build_track_query(&self.filters.dashboard))),
            ViewKind::Reports => Ok(QueryPlan::Fetch(build_reports_query(
                &self.filters.dashboard,
            ))),
            ViewKind::Tab(tab) => build_query(&self.filters.filter_values(tab), self.today()),
        }
    }

    fn bump(&mut self, view: ViewKind) -> QueryTicket {
        self.next_seq += 1;
        let slot = &mut self.slots[view.index()];
        slot.latest = self.next_seq;
        QueryTicket {
            view,
            seq: self.next_seq,
        }
    }

    /// Builds the query for `view` and registers it as the newest request.
    /// Returns `None` when no network call should be made; any notice is
    /// already queued.
    pub fn begin_query(&mut self, view: ViewKind, trigger: QueryTrigger) -> Option<PendingQuery> {
        match self.plan(view) {
            Err(rejection) => {
                if trigger == QueryTrigger::Change && rejection.is_incomplete() {
                    debug!(%view, reason = %rejection, "skipping query for incomplete filter");
                } else {
                    warn!(%view, reason = %rejection, "query rejected");
                    self.bump(view);
                    self.slots[view.index()].loading = false;
                    self.notify(Notice::warning(rejection.to_string()));
                }
                None
            }
            Ok(QueryPlan::Reset(view)) => {
                self.bump(view);
                let slot = &mut self.slots[view.index()];
                slot.loading = false;
                slot.rendered = RenderedView::empty(view);
                if trigger == QueryTrigger::Apply
                    && let Some(message) = missing_selection_message(view)
                {
                    warn!(%view, "query needs a selection");
                    self.notify(Notice::warning(message));
                }
                None
            }
            Ok(QueryPlan::Fetch(query)) => {
                let ticket = self.bump(view);
                self.slots[view.index()].loading = true;
                debug!(%view, seq = ticket.seq, url = %query.path_and_query(), "query issued");
                Some(PendingQuery { ticket, query })
            }
        }
    }

    /// Applies a response only if `ticket` is still the newest request for
    /// its view. Failures leave the previous table untouched.
    pub fn complete_query(
        &mut self,
        ticket: QueryTicket,
        result: Result<ViewResponse>,
    ) -> QueryOutcome {
        let view = ticket.view;
        let slot = &mut self.slots[view.index()];
        if slot.latest != ticket.seq {
            debug!(%view, seq = ticket.seq, latest = slot.latest, "discarding stale response");
            return QueryOutcome::Stale;
        }
        slot.loading = false;

        let response = match result {
            Ok(response) if response.view() == view => response,
            Ok(response) => {
                error!(%view, got = %response.view(), "response shape does not match view");
                self.notify(Notice::error(format!(
                    "Failed to load {view} results: unexpected response."
                )));
                return QueryOutcome::Failed;
            }
            Err(error) => {
                error!(%view, error = %format!("{error:#}"), "query failed");
                self.notify(Notice::error(format!(
                    "Failed to load {view} results: {error:#}"
                )));
                return QueryOutcome::Failed;
            }
        };

        slot.rendered = render(&response);
        if let Some(advisory) = slot.rendered.advisory.clone() {
            info!(%view, advisory = %advisory, "empty result with message");
            self.notify(Notice::info(advisory));
        }
        QueryOutcome::Applied
    }

    /// Runs one query to completion. `None` means no call was made.
    pub fn run_query(
        &mut self,
        backend: &mut dyn Backend,
        view: ViewKind,
        trigger: QueryTrigger,
    ) -> Option<QueryOutcome> {
        let pending = self.begin_query(view, trigger)?;
        let result = backend.fetch_view(&pending.query);
        Some(self.complete_query(pending.ticket, result))
    }

    /// Explicit Apply on the active view.
    pub fn apply(&mut self, backend: &mut dyn Backend) -> Option<QueryOutcome> {
        let view = self.active_view();
        self.run_query(backend, view, QueryTrigger::Apply)
    }

    /// Issues an Apply query for every visible view.
    pub fn begin_refresh(&mut self) -> Vec<PendingQuery> {
        self.visible_views()
            .into_iter()
            .filter_map(|view| self.begin_query(view, QueryTrigger::Apply))
            .collect()
    }

    /// Reloads every visible view with the current filters.
    pub fn refresh(&mut self, backend: &mut dyn Backend) -> Vec<QueryOutcome> {
        self.begin_refresh()
            .into_iter()
            .map(|pending| {
                let result = backend.fetch_view(&pending.query);
                self.complete_query(pending.ticket, result)
            })
            .collect()
    }

    pub fn open_view(&mut self, backend: &mut dyn Backend, report_id: ReportId) -> bool {
        match backend.fetch_fragment(report_id, FragmentPurpose::Preview) {
            Ok(html) => {
                self.confirmation = None;
                self.modal = ModalState::View {
                    report_id,
                    text: fragment_text(&html),
                };
                true
            }
            Err(error) => {
                error!(%report_id, error = %format!("{error:#}"), "failed to load report preview");
                self.notify(Notice::error(format!(
                    "Error loading report {report_id}: {error:#}"
                )));
                false
            }
        }
    }

    /// Loads a fresh edit form; any previous form state is discarded.
    pub fn open_edit(&mut self, backend: &mut dyn Backend, report_id: ReportId) -> bool {
        match backend.fetch_fragment(report_id, FragmentPurpose::Edit) {
            Ok(html) => {
                let form = ReportFormInput::from_scanned(report_id, &scan_form(&html));
                debug!(%report_id, action = %form.action, flights = form.flights.len(), "edit form loaded");
                self.confirmation = None;
                self.modal = ModalState::Edit(EditSession {
                    report_id,
                    form,
                    errors: Vec::new(),
                });
                true
            }
            Err(error) => {
                error!(%report_id, error = %format!("{error:#}"), "failed to load edit form");
                self.notify(Notice::error(format!(
                    "Error loading edit form: {error:#}"
                )));
                false
            }
        }
    }

    /// Closes any modal without re-querying.
    pub fn close_modal(&mut self) {
        self.modal = ModalState::Closed;
        self.confirmation = None;
    }

    pub fn add_flight_row(&mut self) -> Option<RowKey> {
        self.edit_form_mut().map(|form| form.flights.add_row())
    }

    pub fn request_remove_flight(&mut self, key: RowKey) -> bool {
        let exists = match &self.modal {
            ModalState::Edit(session) => session.form.flights.position_of(key).is_some(),
            _ => false,
        };
        if exists {
            self.confirmation = Some(Confirmation::RemoveFlight(key));
        }
        exists
    }

    pub fn confirm_remove_flight(&mut self) -> bool {
        let Some(Confirmation::RemoveFlight(key)) = self.confirmation else {
            return false;
        };
        self.confirmation = None;
        self.edit_form_mut()
            .and_then(|form| form.flights.remove_row(key))
            .is_some()
    }

    /// Validates the open edit form and posts it. On success the modal
    /// closes and the active view is queried once; on any failure the
    /// modal stays open and no table changes.
    pub fn submit_edit(&mut self, backend: &mut dyn Backend) -> MutationStatus {
        let ModalState::Edit(session) = &mut self.modal else {
            return MutationStatus::Ignored;
        };
        let report_id = session.report_id;

        if let Err(FormErrors(messages)) = session.form.validate() {
            warn!(%report_id, problems = messages.len(), "edit form failed validation");
            session.errors = messages.clone();
            self.notify(Notice::warning(messages.join("\n")));
            return MutationStatus::Invalid;
        }

        let action = session.form.action.clone();
        let fields = session.form.to_form_fields();
        match backend.submit_edit(&action, &fields) {
            Ok(MutationOutcome { ok: true, message }) => {
                info!(%report_id, "report updated");
                self.close_modal();
                self.notify(Notice::info(non_empty_or(message, "Report updated.")));
                self.requery_active(backend);
                MutationStatus::Succeeded
            }
            Ok(MutationOutcome { ok: false, message }) => {
                let message = non_empty_or(message, "Failed to update report");
                warn!(%report_id, message = %message, "server rejected report update");
                session.errors = vec![message.clone()];
                self.notify(Notice::error(format!("Error: {message}")));
                MutationStatus::Rejected
            }
            Err(error) => {
                error!(%report_id, error = %format!("{error:#}"), "report update failed");
                session.errors = vec![format!("{error:#}")];
                self.notify(Notice::error(format!("Error updating report: {error:#}")));
                MutationStatus::Failed
            }
        }
    }

    pub fn request_delete(&mut self, report_id: ReportId) {
        self.confirmation = Some(Confirmation::DeleteReport(report_id));
    }

    pub fn confirm_delete(&mut self, backend: &mut dyn Backend) -> MutationStatus {
        let Some(Confirmation::DeleteReport(report_id)) = self.confirmation else {
            return MutationStatus::Ignored;
        };
        self.confirmation = None;

        match backend.delete_report(report_id) {
            Ok(MutationOutcome { ok: true, message }) => {
                info!(%report_id, "report deleted");
                if self.modal_report() == Some(report_id) {
                    self.modal = ModalState::Closed;
                }
                self.notify(Notice::info(non_empty_or(message, "Report deleted.")));
                self.requery_active(backend);
                MutationStatus::Succeeded
            }
            Ok(MutationOutcome { ok: false, message }) => {
                let message = non_empty_or(message, "Failed to delete report");
                warn!(%report_id, message = %message, "server rejected report delete");
                self.notify(Notice::error(format!("Error: {message}")));
                MutationStatus::Rejected
            }
            Err(error) => {
                error!(%report_id, error = %format!("{error:#}"), "report delete failed");
                self.notify(Notice::error(format!("Error deleting report: {error:#}")));
                MutationStatus::Failed
            }
        }
    }

    pub fn cancel_confirmation(&mut self) -> bool {
        self.confirmation.take().is_some()
    }

    fn modal_report(&self) -> Option<ReportId> {
        match &self.modal {
            ModalState::Closed => None,
            ModalState::View { report_id, .. } => Some(*report_id),
            ModalState::Edit(session) => Some(session.report_id),
        }
    }

    fn requery_active(&mut self, backend: &mut dyn Backend) {
        let view = self.active_view();
        self.run_query(backend, view, QueryTrigger::Apply);
    }

    /// Surfaces flash messages not yet shown this session. Returns how many
    /// new notices were queued.
    pub fn poll_flash(&mut self, backend: &mut dyn Backend) -> usize {
        match backend.flash_messages() {
            Ok(messages) => {
                self.flash_failing = false;
                let mut surfaced = 0;
                for flash in messages {
                    if self.seen_flash.contains(&flash) {
                        continue;
                    }
                    let notice = Notice {
                        level: NoticeLevel::from_category(&flash.category),
                        message: flash.message.clone(),
                    };
                    self.seen_flash.insert(flash);
                    self.notify(notice);
                    surfaced += 1;
                }
                surfaced
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "failed to poll flash messages");
                if !self.flash_failing {
                    self.flash_failing = true;
                    self.notify(Notice::warning(format!(
                        "Could not load server messages: {error:#}"
                    )));
                }
                0
            }
        }
    }
}

fn missing_selection_message(view: ViewKind) -> Option<&'static str> {
    match view {
        ViewKind::Tab(TabKind::Site) => Some("Please select a site."),
        ViewKind::Tab(TabKind::Drone) => Some("Please select a drone."),
        _ => None,
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}
