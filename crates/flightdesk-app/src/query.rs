// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;
use url::form_urlencoded;

use crate::{
    DashboardFilter, DateFilter, DateMode, DroneFilter, EmployeeFilter, FilterValues, SiteFilter,
    TabKind, ViewKind,
};

pub const TRACK_PATH: &str = "/api/track";
pub const REPORTS_PATH: &str = "/api/reports";
pub const VIEW_DATE_PATH: &str = "/api/view/date";
pub const VIEW_EMPLOYEE_PATH: &str = "/api/view/employee";
pub const VIEW_SITES_PATH: &str = "/api/view/sites";
pub const VIEW_DRONES_PATH: &str = "/api/view/drones";

/// Endpoint plus ordered, unescaped parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub view: ViewKind,
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl Query {
    fn new(view: ViewKind, path: &'static str) -> Self {
        Self {
            view,
            path,
            params: Vec::new(),
        }
    }

    fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    fn optional_date(self, name: &'static str, value: Option<Date>) -> Self {
        match value {
            Some(date) => self.param(name, format_date(date)),
            None => self,
        }
    }

    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(name, value)| (*name, value.as_str())))
            .finish()
    }

    pub fn path_and_query(&self) -> String {
        if self.params.is_empty() {
            return self.path.to_owned();
        }
        format!("{}?{}", self.path, self.query_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    Fetch(Query),
    /// Required selection missing: clear rows and aggregate without a call.
    Reset(ViewKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRejection {
    MissingRange,
    FutureRangeEnd { to: Date, today: Date },
    MissingEmployee,
}

impl QueryRejection {
    /// True when the user simply has not finished filling in the filter.
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::MissingRange | Self::MissingEmployee)
    }
}

impl std::fmt::Display for QueryRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRange => f.write_str("Please select From and To dates."),
            Self::FutureRangeEnd { to, today } => write!(
                f,
                "To date {} is later than today ({}); pick a date on or before today.",
                format_date(*to),
                format_date(*today)
            ),
            Self::MissingEmployee => f.write_str("Please select an employee."),
        }
    }
}

impl std::error::Error for QueryRejection {}

impl FilterValues {
    pub const fn tab(&self) -> TabKind {
        match self {
            Self::Date(_) => TabKind::Date,
            Self::Employee(_) => TabKind::Employee,
            Self::Site(_) => TabKind::Site,
            Self::Drone(_) => TabKind::Drone,
        }
    }
}

/// Maps one tab's filters onto its backend query. `today` bounds range
/// queries; an empty single date is sent without a date so the server
/// picks its default day.
pub fn build_query(values: &FilterValues, today: Date) -> Result<QueryPlan, QueryRejection> {
    match values {
        FilterValues::Date(filter) => build_date_query(filter, today),
        FilterValues::Employee(filter) => build_employee_query(filter),
        FilterValues::Site(filter) => Ok(build_site_query(filter)),
        FilterValues::Drone(filter) => Ok(build_drone_query(filter)),
    }
}

fn build_date_query(filter: &DateFilter, today: Date) -> Result<QueryPlan, QueryRejection> {
    let view = ViewKind::Tab(TabKind::Date);
    let query = Query::new(view, VIEW_DATE_PATH).param("mode", filter.mode.as_str());
    match filter.mode {
        DateMode::Single => Ok(QueryPlan::Fetch(query.optional_date("date", filter.single))),
        DateMode::Range => {
            let (Some(from), Some(to)) = (filter.from, filter.to) else {
                return Err(QueryRejection::MissingRange);
            };
            if to > today {
                return Err(QueryRejection::FutureRangeEnd { to, today });
            }
            Ok(QueryPlan::Fetch(
                query
                    .param("from", format_date(from))
                    .param("to", format_date(to)),
            ))
        }
    }
}

fn build_employee_query(filter: &EmployeeFilter) -> Result<QueryPlan, QueryRejection> {
    if filter.employee.is_empty() {
        return Err(QueryRejection::MissingEmployee);
    }
    Ok(QueryPlan::Fetch(
        Query::new(ViewKind::Tab(TabKind::Employee), VIEW_EMPLOYEE_PATH)
            .param("employee", filter.employee.clone()),
    ))
}

fn build_site_query(filter: &SiteFilter) -> QueryPlan {
    let view = ViewKind::Tab(TabKind::Site);
    if filter.site.is_empty() {
        return QueryPlan::Reset(view);
    }
    QueryPlan::Fetch(
        Query::new(view, VIEW_SITES_PATH)
            .param("site", filter.site.clone())
            .optional_date("date", filter.date),
    )
}

fn build_drone_query(filter: &DroneFilter) -> QueryPlan {
    let view = ViewKind::Tab(TabKind::Drone);
    if filter.drone.is_empty() {
        return QueryPlan::Reset(view);
    }
    QueryPlan::Fetch(
        Query::new(view, VIEW_DRONES_PATH)
            .param("drone", filter.drone.clone())
            .optional_date("date", filter.date),
    )
}

pub fn build_track_query(filter: &DashboardFilter) -> Query {
    Query::new(ViewKind::Track, TRACK_PATH).param("date", optional_date_text(filter.date))
}

pub fn build_reports_query(filter: &DashboardFilter) -> Query {
    Query::new(ViewKind::Reports, REPORTS_PATH)
        .param("date", optional_date_text(filter.date))
        .param("employee", filter.employee.clone())
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub fn parse_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]")).ok()
}

fn optional_date_text(date: Option<Date>) -> String {
    date.map(format_date).unwrap_or_default()
}
