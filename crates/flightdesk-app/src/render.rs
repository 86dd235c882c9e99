// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AggregateValue, PilotDateRow, ReportId, TabKind, ViewKind, ViewResponse};

const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub cells: Vec<String>,
    /// Report opened by the row's View/Edit/Delete actions.
    pub target: Option<ReportId>,
}

/// One complete table state; replaced wholesale on every applied response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub view: ViewKind,
    pub rows: Vec<RenderedRow>,
    pub aggregate: Option<String>,
    pub advisory: Option<String>,
}

impl RenderedView {
    pub fn empty(view: ViewKind) -> Self {
        Self {
            view,
            rows: Vec::new(),
            aggregate: default_aggregate(view).map(str::to_owned),
            advisory: None,
        }
    }

    pub fn target_at(&self, index: usize) -> Option<ReportId> {
        self.rows.get(index).and_then(|row| row.target)
    }
}

pub const fn columns(view: ViewKind) -> &'static [&'static str] {
    match view {
        ViewKind::Track => &["Sr No.", "Employee Name", "Submission Time", "Status"],
        ViewKind::Reports => &["ID", "Date", "Site", "Drone", "Submitted"],
        ViewKind::Tab(TabKind::Date) => &["Sr No.", "First Name", "Last Name"],
        ViewKind::Tab(TabKind::Employee) => &["Sr No.", "Date", "Site", "Submitted"],
        ViewKind::Tab(TabKind::Site) | ViewKind::Tab(TabKind::Drone) => {
            &["Sr No.", "First Name", "Last Name", "Date"]
        }
    }
}

pub const fn aggregate_label(view: ViewKind) -> Option<&'static str> {
    match view {
        ViewKind::Tab(TabKind::Site) => Some("Total Area"),
        ViewKind::Tab(TabKind::Drone) => Some("Total Flights"),
        _ => None,
    }
}

pub const fn default_aggregate(view: ViewKind) -> Option<&'static str> {
    match view {
        ViewKind::Tab(TabKind::Site) => Some("0.000"),
        ViewKind::Tab(TabKind::Drone) => Some("0"),
        _ => None,
    }
}

pub fn render(response: &ViewResponse) -> RenderedView {
    let view = response.view();
    let mut rendered = RenderedView::empty(view);
    match response {
        ViewResponse::Track(track) => {
            rendered.rows = track
                .rows
                .iter()
                .map(|row| RenderedRow {
                    cells: vec![
                        row.sr.to_string(),
                        row.name.clone(),
                        row.time.clone(),
                        row.status.clone(),
                    ],
                    target: row.report_id,
                })
                .collect();
        }
        ViewResponse::Reports(reports) => {
            rendered.rows = reports
                .reports
                .iter()
                .map(|report| RenderedRow {
                    cells: vec![
                        report.id.to_string(),
                        report.report_date.clone(),
                        or_missing(report.site_name.as_deref()),
                        or_missing(report.drone_name.as_deref()),
                        report.created_at.clone(),
                    ],
                    target: Some(report.id),
                })
                .collect();
        }
        ViewResponse::Date(date) => {
            rendered.rows = date
                .rows
                .iter()
                .map(|row| RenderedRow {
                    cells: vec![
                        row.sr.to_string(),
                        or_missing(row.first_name.as_deref()),
                        or_missing(row.last_name.as_deref()),
                    ],
                    target: Some(row.id),
                })
                .collect();
            if rendered.rows.is_empty() {
                rendered.advisory = date
                    .message
                    .as_deref()
                    .map(str::trim)
                    .filter(|message| !message.is_empty())
                    .map(str::to_owned);
            }
        }
        ViewResponse::Employee(employee) => {
            rendered.rows = employee
                .rows
                .iter()
                .map(|row| RenderedRow {
                    cells: vec![
                        row.sr.to_string(),
                        row.date.clone(),
                        or_missing(row.site_name.as_deref()),
                        row.created_at.clone(),
                    ],
                    target: Some(row.id),
                })
                .collect();
        }
        ViewResponse::Site(site) => {
            rendered.rows = site.rows.iter().map(pilot_date_row).collect();
            rendered.aggregate = aggregate_or_default(view, site.total_area.as_ref());
        }
        ViewResponse::Drone(drone) => {
            rendered.rows = drone.rows.iter().map(pilot_date_row).collect();
            rendered.aggregate = aggregate_or_default(view, drone.total_flights.as_ref());
        }
    }
    rendered
}

fn pilot_date_row(row: &PilotDateRow) -> RenderedRow {
    RenderedRow {
        cells: vec![
            row.sr.to_string(),
            or_missing(row.first_name.as_deref()),
            or_missing(row.last_name.as_deref()),
            row.date.clone(),
        ],
        target: Some(row.id),
    }
}

fn aggregate_or_default(view: ViewKind, value: Option<&AggregateValue>) -> Option<String> {
    value
        .and_then(AggregateValue::display)
        .or_else(|| default_aggregate(view).map(str::to_owned))
}

fn or_missing(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => MISSING.to_owned(),
    }
}
