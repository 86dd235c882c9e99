// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::fragment::ScannedForm;
use crate::{FlightId, FragmentPurpose, ReportId};

pub const NO_FLIGHTS_TEXT: &str = "No flights recorded.";

pub const FLIGHT_ID_FIELD: &str = "flight_id[]";
pub const FLIGHT_TIME_FIELD: &str = "flight_time[]";
pub const FLIGHT_AREA_FIELD: &str = "flight_area[]";
pub const FLIGHT_UBX_FIELD: &str = "flight_ubx[]";
pub const FLIGHT_BASE_FIELD: &str = "flight_base[]";

/// Editable report fields in form order: `(name, label, required message)`.
pub const REPORT_FIELDS: [(&str, &str, &str); 11] = [
    ("report_date", "Date", "Date is required"),
    ("site_name", "Site", "Site is required"),
    ("drone_name", "Drone", "Drone is required"),
    ("pilot_name", "Pilot", "Pilot name is required"),
    ("copilot_name", "Copilot", "Copilot name is required"),
    ("dgps_used", "DGPS used", "DGPS used is required"),
    ("dgps_operators", "DGPS operators", "DGPS operators is required"),
    ("grid_numbers", "Grid numbers", "Grid numbers are required"),
    ("gcp_points", "GCP points", "GCP points are required"),
    ("base_height_m", "Base height (m)", "Base height must be > 0"),
    ("remark", "Remark", "Remark is required"),
];

/// Input columns of one flight row: `(label, form field)`.
pub const FLIGHT_COLUMNS: [(&str, &str); 4] = [
    ("Time", FLIGHT_TIME_FIELD),
    ("Area", FLIGHT_AREA_FIELD),
    ("UBX", FLIGHT_UBX_FIELD),
    ("Base", FLIGHT_BASE_FIELD),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightDraft {
    /// Unset until the server has saved the flight.
    pub id: Option<FlightId>,
    pub time: String,
    pub area: String,
    pub ubx: String,
    pub base: String,
}

impl FlightDraft {
    pub fn field(&self, column: usize) -> Option<&str> {
        match column {
            0 => Some(&self.time),
            1 => Some(&self.area),
            2 => Some(&self.ubx),
            3 => Some(&self.base),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, column: usize) -> Option<&mut String> {
        match column {
            0 => Some(&mut self.time),
            1 => Some(&mut self.area),
            2 => Some(&mut self.ubx),
            3 => Some(&mut self.base),
            _ => None,
        }
    }

    fn problems(&self, position: usize) -> Vec<String> {
        let mut problems = Vec::new();
        if !parse_number(&self.time).is_some_and(|time| time >= 1.0) {
            problems.push(format!("Flight {position}: Time must be ≥ 1"));
        }
        if !parse_number(&self.area).is_some_and(|area| area > 0.0) {
            problems.push(format!("Flight {position}: Area must be > 0"));
        }
        if self.ubx.trim().is_empty() {
            problems.push(format!("Flight {position}: UBX is required"));
        }
        if self.base.trim().is_empty() {
            problems.push(format!("Flight {position}: Base file is required"));
        }
        problems
    }
}

/// Handle for a repeater row that survives renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(u64);

/// What a presentation layer draws for the flights table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeaterLine<'a> {
    Placeholder,
    Row {
        key: RowKey,
        position: usize,
        draft: &'a FlightDraft,
    },
}

/// Ordered flight rows. Positions are never stored: a row's position is
/// always its 1-based index in the current sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightRepeater {
    rows: Vec<(RowKey, FlightDraft)>,
    next_key: u64,
}

impl FlightRepeater {
    pub fn from_drafts(drafts: impl IntoIterator<Item = FlightDraft>) -> Self {
        let mut repeater = Self::default();
        for draft in drafts {
            repeater.push(draft);
        }
        repeater
    }

    /// Appends an empty row at the end.
    pub fn add_row(&mut self) -> RowKey {
        self.push(FlightDraft::default())
    }

    pub fn push(&mut self, draft: FlightDraft) -> RowKey {
        let key = RowKey(self.next_key);
        self.next_key += 1;
        self.rows.push((key, draft));
        key
    }

    pub fn remove_row(&mut self, key: RowKey) -> Option<FlightDraft> {
        let index = self.rows.iter().position(|(row, _)| *row == key)?;
        Some(self.rows.remove(index).1)
    }

    pub fn position_of(&self, key: RowKey) -> Option<usize> {
        self.rows
            .iter()
            .position(|(row, _)| *row == key)
            .map(|index| index + 1)
    }

    pub fn key_at(&self, position: usize) -> Option<RowKey> {
        position
            .checked_sub(1)
            .and_then(|index| self.rows.get(index))
            .map(|(key, _)| *key)
    }

    pub fn row(&self, key: RowKey) -> Option<&FlightDraft> {
        self.rows
            .iter()
            .find(|(row, _)| *row == key)
            .map(|(_, draft)| draft)
    }

    pub fn row_mut(&mut self, key: RowKey) -> Option<&mut FlightDraft> {
        self.rows
            .iter_mut()
            .find(|(row, _)| *row == key)
            .map(|(_, draft)| draft)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn shows_placeholder(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn drafts(&self) -> impl Iterator<Item = &FlightDraft> {
        self.rows.iter().map(|(_, draft)| draft)
    }

    pub fn lines(&self) -> Vec<RepeaterLine<'_>> {
        if self.rows.is_empty() {
            return vec![RepeaterLine::Placeholder];
        }
        self.rows
            .iter()
            .enumerate()
            .map(|(index, (key, draft))| RepeaterLine::Row {
                key: *key,
                position: index + 1,
                draft,
            })
            .collect()
    }
}

/// Every validation message found in one pass, in form order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormErrors(pub Vec<String>);

impl FormErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for FormErrors {}

/// Edit-form state loaded from a report's edit fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFormInput {
    pub action: String,
    pub report_date: String,
    pub site_name: String,
    pub drone_name: String,
    pub pilot_name: String,
    pub copilot_name: String,
    pub dgps_used: String,
    pub dgps_operators: String,
    pub grid_numbers: String,
    pub gcp_points: String,
    pub base_height_m: String,
    pub remark: String,
    pub flights: FlightRepeater,
    /// Named values the form carries that are not edited here (tokens,
    /// hidden ids). Sent back unchanged.
    pub passthrough: Vec<(String, String)>,
}

impl ReportFormInput {
    pub fn empty(report_id: ReportId) -> Self {
        Self {
            action: FragmentPurpose::Edit.path(report_id),
            report_date: String::new(),
            site_name: String::new(),
            drone_name: String::new(),
            pilot_name: String::new(),
            copilot_name: String::new(),
            dgps_used: String::new(),
            dgps_operators: String::new(),
            grid_numbers: String::new(),
            gcp_points: String::new(),
            base_height_m: String::new(),
            remark: String::new(),
            flights: FlightRepeater::default(),
            passthrough: Vec::new(),
        }
    }

    pub fn from_scanned(report_id: ReportId, scanned: &ScannedForm) -> Self {
        let mut form = Self::empty(report_id);
        if let Some(action) = &scanned.action {
            form.action = action.clone();
        }

        let ids: Vec<&str> = scanned.values(FLIGHT_ID_FIELD).collect();
        let times: Vec<&str> = scanned.values(FLIGHT_TIME_FIELD).collect();
        let areas: Vec<&str> = scanned.values(FLIGHT_AREA_FIELD).collect();
        let ubxs: Vec<&str> = scanned.values(FLIGHT_UBX_FIELD).collect();
        let bases: Vec<&str> = scanned.values(FLIGHT_BASE_FIELD).collect();
        let count = times.len().max(areas.len()).max(ubxs.len()).max(bases.len());
        let at = |values: &[&str], index: usize| values.get(index).copied().unwrap_or("").to_owned();
        form.flights = FlightRepeater::from_drafts((0..count).map(|index| FlightDraft {
            id: ids
                .get(index)
                .and_then(|id| id.trim().parse::<i64>().ok())
                .map(FlightId::new),
            time: at(&times, index),
            area: at(&areas, index),
            ubx: at(&ubxs, index),
            base: at(&bases, index),
        }));

        for (name, value) in &scanned.fields {
            if let Some(slot) = form.field_mut(name) {
                *slot = value.clone();
            } else if !name.starts_with("flight_") {
                form.passthrough.push((name.clone(), value.clone()));
            }
        }
        form
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "report_date" => &self.report_date,
            "site_name" => &self.site_name,
            "drone_name" => &self.drone_name,
            "pilot_name" => &self.pilot_name,
            "copilot_name" => &self.copilot_name,
            "dgps_used" => &self.dgps_used,
            "dgps_operators" => &self.dgps_operators,
            "grid_numbers" => &self.grid_numbers,
            "gcp_points" => &self.gcp_points,
            "base_height_m" => &self.base_height_m,
            "remark" => &self.remark,
            _ => return None,
        };
        Some(value)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        let value = match name {
            "report_date" => &mut self.report_date,
            "site_name" => &mut self.site_name,
            "drone_name" => &mut self.drone_name,
            "pilot_name" => &mut self.pilot_name,
            "copilot_name" => &mut self.copilot_name,
            "dgps_used" => &mut self.dgps_used,
            "dgps_operators" => &mut self.dgps_operators,
            "grid_numbers" => &mut self.grid_numbers,
            "gcp_points" => &mut self.gcp_points,
            "base_height_m" => &mut self.base_height_m,
            "remark" => &mut self.remark,
            _ => return None,
        };
        Some(value)
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut problems = Vec::new();
        for (name, _, message) in REPORT_FIELDS {
            let value = self.field(name).unwrap_or("").trim();
            let invalid = if name == "base_height_m" {
                !parse_number(value).is_some_and(|height| height > 0.0)
            } else {
                value.is_empty()
            };
            if invalid {
                problems.push(message.to_owned());
            }
        }
        for (index, draft) in self.flights.drafts().enumerate() {
            problems.extend(draft.problems(index + 1));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(FormErrors(problems))
        }
    }

    /// Multipart body fields, using the names the edit endpoint reads.
    pub fn to_form_fields(&self) -> Vec<(String, String)> {
        let mut fields = self.passthrough.clone();
        for (name, _, _) in REPORT_FIELDS {
            fields.push((name.to_owned(), self.field(name).unwrap_or("").trim().to_owned()));
        }
        for draft in self.flights.drafts() {
            fields.push((
                FLIGHT_ID_FIELD.to_owned(),
                draft.id.map(|id| id.to_string()).unwrap_or_default(),
            ));
            fields.push((FLIGHT_TIME_FIELD.to_owned(), draft.time.trim().to_owned()));
            fields.push((FLIGHT_AREA_FIELD.to_owned(), draft.area.trim().to_owned()));
            fields.push((FLIGHT_UBX_FIELD.to_owned(), draft.ubx.trim().to_owned()));
            fields.push((FLIGHT_BASE_FIELD.to_owned(), draft.base.trim().to_owned()));
        }
        fields
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{
        FLIGHT_TIME_FIELD, FlightDraft, FlightRepeater, RepeaterLine, ReportFormInput,
    };
    use crate::fragment::scan_form;
    use crate::{FlightId, ReportId};

    fn complete_form() -> ReportFormInput {
        let mut form = ReportFormInput::empty(ReportId::new(7));
        for (name, value) in [
            ("report_date", "2024-05-01"),
            ("site_name", "North Pit"),
            ("drone_name", "DJI-7"),
            ("pilot_name", "Jane"),
            ("copilot_name", "Raj"),
            ("dgps_used", "Yes"),
            ("dgps_operators", "Sam"),
            ("grid_numbers", "G1,G2"),
            ("gcp_points", "12"),
            ("base_height_m", "1.5"),
            ("remark", "ok"),
        ] {
            if let Some(slot) = form.field_mut(name) {
                *slot = value.to_owned();
            }
        }
        form
    }

    fn flight(time: &str, area: &str) -> FlightDraft {
        FlightDraft {
            id: None,
            time: time.to_owned(),
            area: area.to_owned(),
            ubx: "u.ubx".to_owned(),
            base: "b.obs".to_owned(),
        }
    }

    #[test]
    fn removing_middle_row_renumbers_contiguously() {
        let mut repeater = FlightRepeater::default();
        let first = repeater.add_row();
        let second = repeater.add_row();
        let third = repeater.add_row();

        assert!(repeater.remove_row(second).is_some());

        assert_eq!(repeater.position_of(first), Some(1));
        assert_eq!(repeater.position_of(third), Some(2));
        assert_eq!(repeater.position_of(second), None);
        let positions: Vec<usize> = repeater
            .lines()
            .into_iter()
            .filter_map(|line| match line {
                RepeaterLine::Row { position, .. } => Some(position),
                RepeaterLine::Placeholder => None,
            })
            .collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn placeholder_shows_only_when_empty() {
        let mut repeater = FlightRepeater::default();
        assert!(repeater.shows_placeholder());
        assert_eq!(repeater.lines(), vec![RepeaterLine::Placeholder]);

        let key = repeater.add_row();
        assert!(!repeater.shows_placeholder());
        assert_eq!(repeater.lines().len(), 1);

        repeater.remove_row(key);
        assert!(repeater.shows_placeholder());
    }

    #[test]
    fn keys_stay_unique_after_removal() {
        let mut repeater = FlightRepeater::default();
        let first = repeater.add_row();
        repeater.remove_row(first);
        let second = repeater.add_row();
        assert_ne!(first, second);
        assert_eq!(repeater.remove_row(first), None);
    }

    #[test]
    fn key_at_follows_renumbered_positions() {
        let mut repeater = FlightRepeater::default();
        let a = repeater.add_row();
        let b = repeater.push(flight("2", "1"));
        let c = repeater.add_row();
        assert_eq!(repeater.remove_row(b), Some(flight("2", "1")));
        assert_eq!(repeater.position_of(a), Some(1));
        assert_eq!(repeater.position_of(c), Some(2));
        assert_eq!(repeater.key_at(2), Some(c));
        assert_eq!(repeater.key_at(0), None);
    }

    #[test]
    fn complete_form_validates() {
        let mut form = complete_form();
        form.flights.push(flight("1", "0.001"));
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut form = complete_form();
        form.pilot_name = "  ".to_owned();
        form.base_height_m = "0".to_owned();
        form.flights.push(flight("2", "3"));
        form.flights.push(FlightDraft {
            time: "0.5".to_owned(),
            area: "abc".to_owned(),
            ..FlightDraft::default()
        });

        let errors = form.validate().expect_err("form should be invalid");
        assert_eq!(
            errors.messages(),
            &[
                "Pilot name is required".to_owned(),
                "Base height must be > 0".to_owned(),
                "Flight 2: Time must be ≥ 1".to_owned(),
                "Flight 2: Area must be > 0".to_owned(),
                "Flight 2: UBX is required".to_owned(),
                "Flight 2: Base file is required".to_owned(),
            ]
        );
    }

    #[test]
    fn non_numeric_base_height_is_rejected() {
        let mut form = complete_form();
        form.base_height_m = "tall".to_owned();
        let errors = form.validate().expect_err("non-numeric height");
        assert_eq!(errors.to_string(), "Base height must be > 0");
    }

    #[test]
    fn scanned_fragment_prefills_form_and_round_trips_fields() {
        let html = r#"
<form action="/report/7/edit" method="post">
  <input type="hidden" name="csrf_token" value="abc">
  <input id="report_date" name="report_date" value="2024-05-01">
  <input id="pilot_name" name="pilot_name" value="Jane">
  <input id="base_height_m" name="base_height_m" value="1.2">
  <tr class="flight-row"><td>1 <input type="hidden" name="flight_id[]" value="31"></td>
    <td><input name="flight_time[]" value="3"></td><td><input name="flight_area[]" value="1.5"></td>
    <td><input name="flight_ubx[]" value="a.ubx"></td><td><input name="flight_base[]" value="a.obs"></td></tr>
  <tr class="flight-row"><td>2 <input type="hidden" name="flight_id[]" value=""></td>
    <td><input name="flight_time[]" value="2"></td><td><input name="flight_area[]" value="0.5"></td>
    <td><input name="flight_ubx[]" value="b.ubx"></td><td><input name="flight_base[]" value="b.obs"></td></tr>
</form>"#;
        let form = ReportFormInput::from_scanned(ReportId::new(7), &scan_form(html));

        assert_eq!(form.action, "/report/7/edit");
        assert_eq!(form.pilot_name, "Jane");
        assert_eq!(form.flights.len(), 2);
        let drafts: Vec<&FlightDraft> = form.flights.drafts().collect();
        assert_eq!(drafts[0].id, Some(FlightId::new(31)));
        assert_eq!(drafts[1].id, None);
        assert_eq!(drafts[1].ubx, "b.ubx");
        assert_eq!(
            form.passthrough,
            vec![("csrf_token".to_owned(), "abc".to_owned())]
        );

        let fields = form.to_form_fields();
        assert_eq!(fields[0], ("csrf_token".to_owned(), "abc".to_owned()));
        let times: Vec<&str> = fields
            .iter()
            .filter(|(name, _)| name == FLIGHT_TIME_FIELD)
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(times, vec!["3", "2"]);
        assert!(fields.contains(&("flight_id[]".to_owned(), String::new())));
    }

    #[test]
    fn missing_action_defaults_to_edit_path() {
        let form = ReportFormInput::from_scanned(ReportId::new(12), &scan_form("<p>no form</p>"));
        assert_eq!(form.action, "/report/12/edit");
        assert!(form.flights.shows_placeholder());
    }
}
