// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::BTreeMap;
use time::Date;

use crate::{DateMode, Screen, TabKind, ViewKind};

pub const ACTIVE_TAB_KEY: &str = "viewReports.activeTab";

/// String key/value storage that outlives a single session.
pub trait PrefsPort {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPrefs {
    values: BTreeMap<String, String>,
}

impl MemoryPrefs {
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut prefs = Self::default();
        prefs.values.insert(key.to_owned(), value.to_owned());
        prefs
    }
}

impl PrefsPort for MemoryPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub mode: DateMode,
    pub single: Option<Date>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    pub employee: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteFilter {
    pub site: String,
    pub date: Option<Date>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroneFilter {
    pub drone: String,
    pub date: Option<Date>,
}

/// Filters for the dashboard's track and reports tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub date: Option<Date>,
    pub employee: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValues {
    Date(DateFilter),
    Employee(EmployeeFilter),
    Site(SiteFilter),
    Drone(DroneFilter),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    ShowScreen(Screen),
    ActivateTab(TabKind),
    SetDateMode(DateMode),
    SetSingleDate(Option<Date>),
    SetRangeFrom(Option<Date>),
    SetRangeTo(Option<Date>),
    SetEmployee(String),
    SetSite(String),
    SetSiteDate(Option<Date>),
    SetDrone(String),
    SetDroneDate(Option<Date>),
    SetDashboardDate(Option<Date>),
    SetDashboardEmployee(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEvent {
    ScreenChanged(Screen),
    TabChanged(TabKind),
    DateModeChanged(DateMode),
    FilterChanged(ViewKind),
}

/// Active tab plus every tab's filter fields. Switching tabs never
/// touches the filters of the tab being left.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterStore {
    pub screen: Screen,
    active_tab: TabKind,
    pub date: DateFilter,
    pub employee: EmployeeFilter,
    pub site: SiteFilter,
    pub drone: DroneFilter,
    pub dashboard: DashboardFilter,
}

impl FilterStore {
    pub fn restore(prefs: &dyn PrefsPort) -> Self {
        let active_tab = prefs
            .get(ACTIVE_TAB_KEY)
            .and_then(|value| TabKind::parse(&value))
            .unwrap_or_default();
        Self {
            active_tab,
            ..Self::default()
        }
    }

    pub const fn active_tab(&self) -> TabKind {
        self.active_tab
    }

    pub fn filter_values(&self, tab: TabKind) -> FilterValues {
        match tab {
            TabKind::Date => FilterValues::Date(self.date.clone()),
            TabKind::Employee => FilterValues::Employee(self.employee.clone()),
            TabKind::Site => FilterValues::Site(self.site.clone()),
            TabKind::Drone => FilterValues::Drone(self.drone.clone()),
        }
    }

    /// The result table currently on screen.
    pub const fn active_view(&self) -> ViewKind {
        match self.screen {
            Screen::Dashboard => ViewKind::Reports,
            Screen::ViewReports => ViewKind::Tab(self.active_tab),
        }
    }

    pub fn dispatch(&mut self, command: FilterCommand) -> Vec<FilterEvent> {
        match command {
            FilterCommand::ShowScreen(screen) => {
                if self.screen == screen {
                    return Vec::new();
                }
                self.screen = screen;
                vec![FilterEvent::ScreenChanged(screen)]
            }
            FilterCommand::ActivateTab(tab) => {
                let mut events = Vec::new();
                if self.screen != Screen::ViewReports {
                    self.screen = Screen::ViewReports;
                    events.push(FilterEvent::ScreenChanged(self.screen));
                }
                if self.active_tab != tab {
                    self.active_tab = tab;
                    events.push(FilterEvent::TabChanged(tab));
                }
                events
            }
            FilterCommand::SetDateMode(mode) => {
                if self.date.mode == mode {
                    return Vec::new();
                }
                self.date.mode = mode;
                vec![FilterEvent::DateModeChanged(mode)]
            }
            FilterCommand::SetSingleDate(value) => {
                changed(&mut self.date.single, value, &[ViewKind::Tab(TabKind::Date)])
            }
            FilterCommand::SetRangeFrom(value) => {
                changed(&mut self.date.from, value, &[ViewKind::Tab(TabKind::Date)])
            }
            FilterCommand::SetRangeTo(value) => {
                changed(&mut self.date.to, value, &[ViewKind::Tab(TabKind::Date)])
            }
            FilterCommand::SetEmployee(value) => changed(
                &mut self.employee.employee,
                value.trim().to_owned(),
                &[ViewKind::Tab(TabKind::Employee)],
            ),
            FilterCommand::SetSite(value) => changed(
                &mut self.site.site,
                value.trim().to_owned(),
                &[ViewKind::Tab(TabKind::Site)],
            ),
            FilterCommand::SetSiteDate(value) => {
                changed(&mut self.site.date, value, &[ViewKind::Tab(TabKind::Site)])
            }
            FilterCommand::SetDrone(value) => changed(
                &mut self.drone.drone,
                value.trim().to_owned(),
                &[ViewKind::Tab(TabKind::Drone)],
            ),
            FilterCommand::SetDroneDate(value) => {
                changed(&mut self.drone.date, value, &[ViewKind::Tab(TabKind::Drone)])
            }
            FilterCommand::SetDashboardDate(value) => changed(
                &mut self.dashboard.date,
                value,
                &[ViewKind::Track, ViewKind::Reports],
            ),
            FilterCommand::SetDashboardEmployee(value) => changed(
                &mut self.dashboard.employee,
                value.trim().to_owned(),
                &[ViewKind::Reports],
            ),
        }
    }
}

fn changed<T: PartialEq>(slot: &mut T, value: T, views: &[ViewKind]) -> Vec<FilterEvent> {
    if *slot == value {
        return Vec::new();
    }
    *slot = value;
    views.iter().copied().map(FilterEvent::FilterChanged).collect()
}
