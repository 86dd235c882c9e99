// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use flightdesk_app::{
    Backend, DateViewResponse, DroneViewResponse, EmployeeViewResponse, FlashMessage,
    FragmentPurpose, MutationOutcome, Query, ReportId, ReportsResponse, SiteViewResponse,
    TabKind, TrackResponse, ViewKind, ViewResponse,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const FLASH_PATH: &str = "/api/flash-messages";

/// Blocking HTTP client for the reports server. Cheap to clone; clones
/// share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                base_url.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a server path (or an absolute URL) against the base URL.
    pub fn endpoint(&self, path_and_query: &str) -> Result<Url> {
        self.base_url
            .join(path_and_query)
            .with_context(|| format!("build URL for {path_and_query:?}"))
    }

    pub fn fetch_view(&self, query: &Query) -> Result<ViewResponse> {
        let url = self.endpoint(&query.path_and_query())?;
        debug!(view = %query.view, %url, "GET view");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let body = success_body(response)?;
        decode_view(query.view, &body)
    }

    pub fn fetch_fragment(&self, report_id: ReportId, purpose: FragmentPurpose) -> Result<String> {
        let mut url = self.endpoint(&purpose.path(report_id))?;
        url.query_pairs_mut().append_pair("fragment", "1");
        debug!(%report_id, %url, "GET fragment");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        success_body(response)
    }

    /// Posts the edit form as multipart data to `action`.
    pub fn submit_edit(&self, action: &str, fields: &[(String, String)]) -> Result<MutationOutcome> {
        let url = self.endpoint(action)?;
        let form = fields
            .iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });
        debug!(%url, fields = fields.len(), "POST edit");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        mutation_outcome(response)
    }

    pub fn delete_report(&self, report_id: ReportId) -> Result<MutationOutcome> {
        let url = self.endpoint(&format!("/report/{report_id}/delete"))?;
        debug!(%report_id, %url, "POST delete");
        let response = self
            .http
            .post(url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        mutation_outcome(response)
    }

    pub fn flash_messages(&self) -> Result<Vec<FlashMessage>> {
        let url = self.endpoint(FLASH_PATH)?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let body = success_body(response)?;
        decode_flash(&body)
    }

    /// Fetches today's track table to confirm the server answers.
    pub fn ping(&self) -> Result<()> {
        let query = flightdesk_app::build_track_query(&Default::default());
        self.fetch_view(&query).map(|_| ())
    }
}

impl Backend for Client {
    fn fetch_view(&mut self, query: &Query) -> Result<ViewResponse> {
        Client::fetch_view(self, query)
    }

    fn fetch_fragment(&mut self, report_id: ReportId, purpose: FragmentPurpose) -> Result<String> {
        Client::fetch_fragment(self, report_id, purpose)
    }

    fn submit_edit(
        &mut self,
        action: &str,
        fields: &[(String, String)],
    ) -> Result<MutationOutcome> {
        Client::submit_edit(self, action, fields)
    }

    fn delete_report(&mut self, report_id: ReportId) -> Result<MutationOutcome> {
        Client::delete_report(self, report_id)
    }

    fn flash_messages(&mut self) -> Result<Vec<FlashMessage>> {
        Client::flash_messages(self)
    }
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes a JSON body into the response shape of `view`. A body carrying
/// `"ok": false` is turned into an error with the server's message.
pub fn decode_view(view: ViewKind, body: &str) -> Result<ViewResponse> {
    if let Ok(status) = serde_json::from_str::<ApiStatus>(body)
        && status.ok == Some(false)
    {
        let message = status
            .message
            .or(status.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| "request was not accepted".to_owned());
        bail!("server error: {message}");
    }

    let response = match view {
        ViewKind::Track => ViewResponse::Track(decode::<TrackResponse>(view, body)?),
        ViewKind::Reports => ViewResponse::Reports(decode::<ReportsResponse>(view, body)?),
        ViewKind::Tab(TabKind::Date) => ViewResponse::Date(decode::<DateViewResponse>(view, body)?),
        ViewKind::Tab(TabKind::Employee) => {
            ViewResponse::Employee(decode::<EmployeeViewResponse>(view, body)?)
        }
        ViewKind::Tab(TabKind::Site) => ViewResponse::Site(decode::<SiteViewResponse>(view, body)?),
        ViewKind::Tab(TabKind::Drone) => {
            ViewResponse::Drone(decode::<DroneViewResponse>(view, body)?)
        }
    };
    Ok(response)
}

fn decode<T: DeserializeOwned>(view: ViewKind, body: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| format!("decode {view} response"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlashBody {
    List(Vec<FlashMessage>),
    Wrapped { messages: Vec<FlashMessage> },
}

/// Accepts a bare list or a `{ messages: [...] }` wrapper. Entries may be
/// objects or Flask-style `[category, message]` pairs.
pub fn decode_flash(body: &str) -> Result<Vec<FlashMessage>> {
    let parsed: FlashBody = serde_json::from_str(body).context("decode flash messages")?;
    Ok(match parsed {
        FlashBody::List(messages) | FlashBody::Wrapped { messages } => messages,
    })
}

fn success_body(response: Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(clean_error_response(status, &body));
    }
    response.text().context("read response body")
}

/// Edit and delete answer `{ ok, message }`, sometimes with an error
/// status; the JSON body wins over the status when it parses.
fn mutation_outcome(response: Response) -> Result<MutationOutcome> {
    let status = response.status();
    let body = response.text().context("read response body")?;
    match serde_json::from_str::<MutationOutcome>(&body) {
        Ok(outcome) => Ok(outcome),
        Err(_) if !status.is_success() => Err(clean_error_response(status, &body)),
        Err(error) => Err(anyhow!(
            "unexpected response from server ({}): {error}",
            status.as_u16()
        )),
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out -- check the server and retry");
    }
    anyhow!(
        "cannot reach {} -- check server.base_url and that the server is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ApiStatus>(body)
        && let Some(message) = parsed.message.or(parsed.error)
        && !message.trim().is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message.trim());
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains(['{', '<']) {
        return anyhow!("server error ({}): {}", status.as_u16(), trimmed);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::{Client, clean_error_response, decode_flash, decode_view};
    use flightdesk_app::{TabKind, ViewKind, ViewResponse};
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn new_rejects_bad_base_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
        let error = Client::new("ftp://example.com", Duration::from_secs(1))
            .expect_err("ftp should be rejected");
        assert!(error.to_string().contains("http or https"));
    }

    #[test]
    fn endpoint_resolves_paths_against_base() -> anyhow::Result<()> {
        let client = Client::new("http://reports.local:9000/", Duration::from_secs(1))?;
        assert_eq!(client.base_url(), "http://reports.local:9000");
        assert_eq!(
            client.endpoint("/api/view/sites?site=A%20B")?.as_str(),
            "http://reports.local:9000/api/view/sites?site=A%20B"
        );
        assert_eq!(
            client.endpoint("http://elsewhere/report/1/edit")?.as_str(),
            "http://elsewhere/report/1/edit"
        );
        Ok(())
    }

    #[test]
    fn decode_view_matches_shape() -> anyhow::Result<()> {
        let response = decode_view(
            ViewKind::Tab(TabKind::Drone),
            r#"{"rows":[{"sr":1,"first_name":null,"last_name":"Doe","date":"2024-05-01","id":7}],"total_flights":4}"#,
        )?;
        let ViewResponse::Drone(drone) = response else {
            panic!("expected drone response");
        };
        assert_eq!(drone.rows.len(), 1);
        assert_eq!(drone.rows[0].first_name, None);
        Ok(())
    }

    #[test]
    fn decode_view_surfaces_not_ok() {
        let error = decode_view(ViewKind::Track, r#"{"ok":false,"message":"Bad date"}"#)
            .expect_err("ok false should fail");
        assert_eq!(error.to_string(), "server error: Bad date");
    }

    #[test]
    fn decode_view_reports_malformed_json() {
        let error = decode_view(ViewKind::Reports, "<html>").expect_err("html is not json");
        assert_eq!(error.to_string(), "decode reports response");
    }

    #[test]
    fn flash_accepts_three_shapes() -> anyhow::Result<()> {
        assert_eq!(
            decode_flash(r#"[{"category":"info","message":"a"}]"#)?.len(),
            1
        );
        assert_eq!(
            decode_flash(r#"{"messages":[{"category":"info","message":"a"}]}"#)?.len(),
            1
        );
        let pairs = decode_flash(r#"[["danger","Report not found."]]"#)?;
        assert_eq!(pairs[0].category, "danger");
        assert_eq!(pairs[0].message, "Report not found.");
        Ok(())
    }

    #[test]
    fn clean_error_prefers_server_message() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"ok":false,"message":"date must be YYYY-MM-DD"}"#,
        );
        assert_eq!(
            error.to_string(),
            "server error (400): date must be YYYY-MM-DD"
        );
        let html = clean_error_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(html.to_string(), "server returned 502");
        let plain = clean_error_response(StatusCode::NOT_FOUND, "Not Found");
        assert_eq!(plain.to_string(), "server error (404): Not Found");
    }
}
