// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use flightdesk_app::{
    Backend, FlashMessage, FragmentPurpose, MutationOutcome, PilotDateRow, Query, ReportId,
    ReportSummary, TrackRow, ViewResponse,
};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use time::{Date, Duration, Month};

const SITE_NAMES: [&str; 8] = [
    "North Pit",
    "South Quarry",
    "River Bend",
    "East Ridge",
    "Canal Yard",
    "Hill Camp",
    "Lake Road",
    "Depot 4",
];

const DRONE_NAMES: [&str; 6] = ["DJI-7", "DJI-9", "Mavic-2", "Phantom-4", "Wingtra-1", "Ebee-X"];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for dashboard rows. The same seed always yields the
/// same sequence.
#[derive(Debug, Clone)]
pub struct ReportFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl ReportFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn site_name(&mut self) -> &'static str {
        self.pick(&SITE_NAMES)
    }

    pub fn drone_name(&mut self) -> &'static str {
        self.pick(&DRONE_NAMES)
    }

    pub fn pilot_date_rows(&mut self, count: usize, date: Date) -> Vec<PilotDateRow> {
        (1..=count)
            .map(|sr| PilotDateRow {
                sr: sr as i64,
                first_name: Some(self.pick(&FIRST_NAMES).to_owned()),
                // Roughly half the pilots have no last name on record.
                last_name: self.rng.bool().then(|| self.pick(&LAST_NAMES).to_owned()),
                date: fixture_date_text(date),
                id: self.report_id(),
            })
            .collect()
    }

    pub fn report_summaries(&mut self, count: usize, date: Date) -> Vec<ReportSummary> {
        (0..count)
            .map(|_| ReportSummary {
                id: self.report_id(),
                report_date: fixture_date_text(date),
                site_name: Some(self.site_name().to_owned()),
                drone_name: Some(self.drone_name().to_owned()),
                created_at: format!("{} 09:{:02}", fixture_date_text(date), self.rng.int_n(60)),
            })
            .collect()
    }

    pub fn track_rows(&mut self, count: usize) -> Vec<TrackRow> {
        (1..=count)
            .map(|sr| {
                let submitted = self.rng.bool();
                TrackRow {
                    sr: sr as i64,
                    name: format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
                    time: if submitted {
                        format!("09:{:02} AM IST", self.rng.int_n(60))
                    } else {
                        "-".to_owned()
                    },
                    status: if submitted {
                        "Submitted".to_owned()
                    } else {
                        "Not Submitted".to_owned()
                    },
                    report_id: submitted.then(|| self.report_id()),
                }
            })
            .collect()
    }

    fn report_id(&mut self) -> ReportId {
        let id = ReportId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        items[self.rng.int_n(items.len())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    FetchView(String),
    FetchFragment(ReportId, FragmentPurpose),
    SubmitEdit {
        action: String,
        fields: Vec<(String, String)>,
    },
    DeleteReport(ReportId),
    FlashMessages,
}

type Scripted<T> = VecDeque<std::result::Result<T, String>>;

/// In-memory [`Backend`] that replays scripted answers and records every
/// call. When a queue holds one answer, that answer repeats.
#[derive(Debug, Default)]
pub struct FakeBackend {
    views: HashMap<&'static str, Scripted<ViewResponse>>,
    fragments: HashMap<(ReportId, FragmentPurpose), String>,
    edits: Scripted<MutationOutcome>,
    deletes: Scripted<MutationOutcome>,
    flash: Scripted<Vec<FlashMessage>>,
    calls: Vec<BackendCall>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, path: &'static str, response: ViewResponse) -> &mut Self {
        self.views.entry(path).or_default().push_back(Ok(response));
        self
    }

    pub fn fail(&mut self, path: &'static str, message: &str) -> &mut Self {
        self.views
            .entry(path)
            .or_default()
            .push_back(Err(message.to_owned()));
        self
    }

    pub fn fragment(
        &mut self,
        report_id: ReportId,
        purpose: FragmentPurpose,
        html: impl Into<String>,
    ) -> &mut Self {
        self.fragments.insert((report_id, purpose), html.into());
        self
    }

    pub fn edit_outcome(&mut self, ok: bool, message: &str) -> &mut Self {
        self.edits.push_back(Ok(outcome(ok, message)));
        self
    }

    pub fn edit_error(&mut self, message: &str) -> &mut Self {
        self.edits.push_back(Err(message.to_owned()));
        self
    }

    pub fn delete_outcome(&mut self, ok: bool, message: &str) -> &mut Self {
        self.deletes.push_back(Ok(outcome(ok, message)));
        self
    }

    pub fn flash(&mut self, messages: Vec<FlashMessage>) -> &mut Self {
        self.flash.push_back(Ok(messages));
        self
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Path-and-query of every view fetch, in call order.
    pub fn view_requests(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::FetchView(url) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

fn outcome(ok: bool, message: &str) -> MutationOutcome {
    MutationOutcome {
        ok,
        message: message.to_owned(),
    }
}

fn next_scripted<T: Clone>(queue: &mut Scripted<T>, what: &str) -> Result<T> {
    let answer = if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    };
    match answer {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(anyhow!(message)),
        None => Err(anyhow!("no scripted answer for {what}")),
    }
}

impl Backend for FakeBackend {
    fn fetch_view(&mut self, query: &Query) -> Result<ViewResponse> {
        self.calls
            .push(BackendCall::FetchView(query.path_and_query()));
        let queue = self.views.entry(query.path).or_default();
        next_scripted(queue, query.path)
    }

    fn fetch_fragment(&mut self, report_id: ReportId, purpose: FragmentPurpose) -> Result<String> {
        self.calls
            .push(BackendCall::FetchFragment(report_id, purpose));
        self.fragments
            .get(&(report_id, purpose))
            .cloned()
            .with_context(|| format!("no fragment for {}", purpose.path(report_id)))
    }

    fn submit_edit(
        &mut self,
        action: &str,
        fields: &[(String, String)],
    ) -> Result<MutationOutcome> {
        self.calls.push(BackendCall::SubmitEdit {
            action: action.to_owned(),
            fields: fields.to_vec(),
        });
        next_scripted(&mut self.edits, "edit")
    }

    fn delete_report(&mut self, report_id: ReportId) -> Result<MutationOutcome> {
        self.calls.push(BackendCall::DeleteReport(report_id));
        next_scripted(&mut self.deletes, "delete")
    }

    fn flash_messages(&mut self) -> Result<Vec<FlashMessage>> {
        self.calls.push(BackendCall::FlashMessages);
        if self.flash.is_empty() {
            return Ok(Vec::new());
        }
        next_scripted(&mut self.flash, "flash messages")
    }
}

/// "Today" for fixtures: 2024-05-10.
pub fn fixture_date() -> Date {
    Date::from_calendar_date(2024, Month::May, 10).unwrap_or(Date::MIN)
}

pub fn fixture_day(offset_days: i64) -> Date {
    fixture_date()
        .checked_add(Duration::days(offset_days))
        .unwrap_or(Date::MIN)
}

fn fixture_date_text(date: Date) -> String {
    flightdesk_app::format_date(date)
}

pub fn site_view_body() -> &'static str {
    r#"{"rows":[{"sr":1,"first_name":"Jane","last_name":"Doe","date":"2024-05-01","id":42}],"total_area":"12.340"}"#
}

pub fn preview_fragment(report_id: ReportId) -> String {
    format!(
        r#"<div class="p-4">
  <h2 class="text-xl">Report #{report_id}</h2>
  <table>
    <tr><th>Site</th><td>North Pit</td></tr>
    <tr><th>Drone</th><td>DJI-7</td></tr>
    <tr><th>Pilot</th><td>Jane Doe</td></tr>
  </table>
</div>"#
    )
}

/// Edit fragment with a complete, valid form and two saved flights.
pub fn edit_fragment(report_id: ReportId) -> String {
    format!(
        r#"<div class="p-4">
  <form id="editForm" action="/report/{report_id}/edit" method="post" enctype="multipart/form-data">
    <input type="hidden" name="csrf_token" value="fixture-token">
    <input id="report_date" type="date" name="report_date" value="2024-05-01">
    <select id="site_name" name="site_name">
      <option value="">Select site</option>
      <option value="North Pit" selected>North Pit</option>
    </select>
    <select id="drone_name" name="drone_name">
      <option value="DJI-7" selected>DJI-7</option>
    </select>
    <input id="pilot_name" name="pilot_name" value="Jane Doe">
    <input id="copilot_name" name="copilot_name" value="Raj Kumar">
    <select id="dgps_used" name="dgps_used"><option value="Yes" selected>Yes</option><option value="No">No</option></select>
    <input id="dgps_operators" name="dgps_operators" value="Sam">
    <input id="grid_numbers" name="grid_numbers" value="G1, G2">
    <input id="gcp_points" name="gcp_points" value="14">
    <input id="base_height_m" type="number" name="base_height_m" value="1.65">
    <textarea id="remark" name="remark">Clear skies</textarea>
    <table><tbody id="flightsTableBody">
      <tr class="flight-row">
        <td>1 <input type="hidden" name="flight_id[]" value="501"></td>
        <td><input type="number" name="flight_time[]" value="3"></td>
        <td><input type="number" name="flight_area[]" value="1.250"></td>
        <td><input type="text" name="flight_ubx[]" value="f1.ubx"></td>
        <td><input type="text" name="flight_base[]" value="base1.obs"></td>
      </tr>
      <tr class="flight-row">
        <td>2 <input type="hidden" name="flight_id[]" value="502"></td>
        <td><input type="number" name="flight_time[]" value="2"></td>
        <td><input type="number" name="flight_area[]" value="0.750"></td>
        <td><input type="text" name="flight_ubx[]" value="f2.ubx"></td>
        <td><input type="text" name="flight_base[]" value="base2.obs"></td>
      </tr>
    </tbody></table>
    <button type="submit">Save</button>
  </form>
</div>"#
    )
}

pub fn temp_prefs_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("prefs.json");
    Ok((dir, path))
}
