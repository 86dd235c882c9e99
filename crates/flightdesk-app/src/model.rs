// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TabKind {
    #[default]
    Date,
    Employee,
    Site,
    Drone,
}

impl TabKind {
    pub const ALL: [Self; 4] = [Self::Date, Self::Employee, Self::Site, Self::Drone];

    /// Persisted identifier; matches the value older dashboards stored.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Employee => "employee",
            Self::Site => "sites",
            Self::Drone => "drones",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(Self::Date),
            "employee" => Some(Self::Employee),
            "sites" => Some(Self::Site),
            "drones" => Some(Self::Drone),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Date => "By Date",
            Self::Employee => "By Employee",
            Self::Site => "By Site",
            Self::Drone => "By Drone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateMode {
    #[default]
    Single,
    Range,
}

impl DateMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Range => "range",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Single => Self::Range,
            Self::Range => Self::Single,
        }
    }
}

/// Top-level page: the daily dashboard or the tabbed report browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Screen {
    Dashboard,
    #[default]
    ViewReports,
}

impl Screen {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::ViewReports => "reports",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dashboard" => Some(Self::Dashboard),
            "reports" => Some(Self::ViewReports),
            _ => None,
        }
    }
}

/// One independently rendered result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Track,
    Reports,
    Tab(TabKind),
}

impl ViewKind {
    pub const ALL: [Self; 6] = [
        Self::Track,
        Self::Reports,
        Self::Tab(TabKind::Date),
        Self::Tab(TabKind::Employee),
        Self::Tab(TabKind::Site),
        Self::Tab(TabKind::Drone),
    ];

    /// Short display name, also used in log fields and notices. Not the
    /// persisted tab key.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Reports => "reports",
            Self::Tab(TabKind::Date) => "date",
            Self::Tab(TabKind::Employee) => "employee",
            Self::Tab(TabKind::Site) => "site",
            Self::Tab(TabKind::Drone) => "drone",
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Track => 0,
            Self::Reports => 1,
            Self::Tab(TabKind::Date) => 2,
            Self::Tab(TabKind::Employee) => 3,
            Self::Tab(TabKind::Site) => 4,
            Self::Tab(TabKind::Drone) => 5,
        }
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackRow {
    pub sr: i64,
    pub name: String,
    pub time: String,
    pub status: String,
    #[serde(default)]
    pub report_id: Option<ReportId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TrackResponse {
    #[serde(default)]
    pub rows: Vec<TrackRow>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportSummary {
    pub id: ReportId,
    pub report_date: String,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub drone_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ReportsResponse {
    #[serde(default)]
    pub reports: Vec<ReportSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DateViewRow {
    pub sr: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub id: ReportId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DateViewResponse {
    #[serde(default)]
    pub rows: Vec<DateViewRow>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmployeeViewRow {
    pub sr: i64,
    pub date: String,
    #[serde(default)]
    pub site_name: Option<String>,
    pub created_at: String,
    pub id: ReportId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct EmployeeViewResponse {
    #[serde(default)]
    pub rows: Vec<EmployeeViewRow>,
}

/// Row shape shared by the site and drone tabs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PilotDateRow {
    pub sr: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub date: String,
    pub id: ReportId,
}

/// Server-computed aggregate. Shown exactly as received.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl AggregateValue {
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Text(value) if value.trim().is_empty() => None,
            Self::Text(value) => Some(value.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Decimal(value) => Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SiteViewResponse {
    #[serde(default)]
    pub rows: Vec<PilotDateRow>,
    #[serde(default)]
    pub total_area: Option<AggregateValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DroneViewResponse {
    #[serde(default)]
    pub rows: Vec<PilotDateRow>,
    #[serde(default)]
    pub total_flights: Option<AggregateValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewResponse {
    Track(TrackResponse),
    Reports(ReportsResponse),
    Date(DateViewResponse),
    Employee(EmployeeViewResponse),
    Site(SiteViewResponse),
    Drone(DroneViewResponse),
}

impl ViewResponse {
    pub const fn view(&self) -> ViewKind {
        match self {
            Self::Track(_) => ViewKind::Track,
            Self::Reports(_) => ViewKind::Reports,
            Self::Date(_) => ViewKind::Tab(TabKind::Date),
            Self::Employee(_) => ViewKind::Tab(TabKind::Employee),
            Self::Site(_) => ViewKind::Tab(TabKind::Site),
            Self::Drone(_) => ViewKind::Tab(TabKind::Drone),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentPurpose {
    Preview,
    Edit,
}

impl FragmentPurpose {
    pub fn path(self, report_id: ReportId) -> String {
        match self {
            Self::Preview => format!("/report/{report_id}/preview"),
            Self::Edit => format!("/report/{report_id}/edit"),
        }
    }
}

/// `{ ok, message }` body returned by edit and delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MutationOutcome {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct FlashMessage {
    pub category: String,
    pub message: String,
}
