// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use flightdesk_app::{
    Backend, FlashMessage, FragmentPurpose, MutationOutcome, PendingQuery, PrefsPort, Query,
    ReportId, ViewResponse,
};
use flightdesk_client::Client;
use flightdesk_tui::{AppRuntime, InternalEvent};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, warn};

use crate::config;

pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Backend for HttpRuntime {
    fn fetch_view(&mut self, query: &Query) -> Result<ViewResponse> {
        self.client.fetch_view(query)
    }

    fn fetch_fragment(&mut self, report_id: ReportId, purpose: FragmentPurpose) -> Result<String> {
        self.client.fetch_fragment(report_id, purpose)
    }

    fn submit_edit(
        &mut self,
        action: &str,
        fields: &[(String, String)],
    ) -> Result<MutationOutcome> {
        self.client.submit_edit(action, fields)
    }

    fn delete_report(&mut self, report_id: ReportId) -> Result<MutationOutcome> {
        self.client.delete_report(report_id)
    }

    fn flash_messages(&mut self) -> Result<Vec<FlashMessage>> {
        self.client.flash_messages()
    }
}

impl AppRuntime for HttpRuntime {
    fn spawn_view_query(&mut self, pending: PendingQuery, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("query-{}", pending.ticket.view))
            .spawn(move || {
                let PendingQuery { ticket, query } = pending;
                let result = client.fetch_view(&query);
                if tx.send(InternalEvent::ViewLoaded { ticket, result }).is_err() {
                    debug!(view = %ticket.view, seq = ticket.seq, "ui gone before query finished");
                }
            })
            .context("spawn view query thread")?;
        Ok(())
    }
}

/// Preferences kept as a flat JSON object on disk. Every `set` rewrites
/// the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePrefs {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePrefs {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("FLIGHTDESK_PREFS_PATH") {
            return Ok(PathBuf::from(path));
        }
        Ok(config::data_dir()?.join("prefs.json"))
    }

    /// A missing file starts empty. An unreadable or corrupt file is logged
    /// and ignored so a bad preference never blocks startup.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "ignoring corrupt preferences file");
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "ignoring unreadable preferences file");
                BTreeMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrefsPort for FilePrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        let body = serde_json::to_string_pretty(&self.values).context("encode preferences")?;
        fs::write(&self.path, body)
            .with_context(|| format!("write preferences {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::{FilePrefs, HttpRuntime};
    use anyhow::{Result, anyhow};
    use flightdesk_app::{
        ACTIVE_TAB_KEY, Controller, FixedClock, PrefsPort, QueryOutcome, QueryTrigger, TabKind,
        ViewKind,
    };
    use flightdesk_client::Client;
    use flightdesk_testkit::{fixture_date, temp_prefs_path};
    use flightdesk_tui::{AppRuntime, InternalEvent};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    #[test]
    fn prefs_survive_reopen() -> Result<()> {
        let (_dir, path) = temp_prefs_path()?;
        let mut prefs = FilePrefs::open(&path);
        assert_eq!(prefs.get(ACTIVE_TAB_KEY), None);
        prefs.set(ACTIVE_TAB_KEY, "drone")?;

        let reopened = FilePrefs::open(&path);
        assert_eq!(reopened.get(ACTIVE_TAB_KEY).as_deref(), Some("drone"));
        Ok(())
    }

    #[test]
    fn corrupt_prefs_file_starts_empty() -> Result<()> {
        let (_dir, path) = temp_prefs_path()?;
        std::fs::write(&path, "not json")?;
        let prefs = FilePrefs::open(&path);
        assert_eq!(prefs.get(ACTIVE_TAB_KEY), None);
        Ok(())
    }

    #[test]
    fn prefs_write_failure_is_reported() -> Result<()> {
        let (dir, _) = temp_prefs_path()?;
        let path = dir.path().join("missing-dir").join("prefs.json");
        let mut prefs = FilePrefs::open(&path);
        let error = prefs
            .set(ACTIVE_TAB_KEY, "site")
            .expect_err("write into a missing directory should fail");
        assert!(error.to_string().contains("write preferences"));
        Ok(())
    }

    #[test]
    fn controller_restores_tab_from_prefs_file() -> Result<()> {
        let (_dir, path) = temp_prefs_path()?;
        {
            let mut app = Controller::new(
                Box::new(FilePrefs::open(&path)),
                Box::new(FixedClock(fixture_date())),
            );
            app.set_active_tab(TabKind::Site);
        }
        let app = Controller::new(
            Box::new(FilePrefs::open(&path)),
            Box::new(FixedClock(fixture_date())),
        );
        assert_eq!(app.filters().active_tab(), TabKind::Site);
        Ok(())
    }

    #[test]
    fn spawned_query_reports_back_over_channel() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/api/track?date=");
            let response = Response::from_string(r#"{"ok":true,"rows":[]}"#).with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
            request.respond(response).expect("response should succeed");
        });

        let mut runtime = HttpRuntime::new(Client::new(&addr, Duration::from_secs(2))?);
        let mut app = Controller::new(
            Box::new(flightdesk_app::MemoryPrefs::default()),
            Box::new(FixedClock(fixture_date())),
        );
        let pending = app
            .begin_query(ViewKind::Track, QueryTrigger::Apply)
            .ok_or_else(|| anyhow!("track query should be issued"))?;
        let (tx, rx) = mpsc::channel();
        runtime.spawn_view_query(pending, tx)?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        handle.join().map_err(|_| anyhow!("server thread panicked"))?;
        let InternalEvent::ViewLoaded { ticket, result } = event else {
            return Err(anyhow!("expected a view result"));
        };
        assert_eq!(ticket.view, ViewKind::Track);
        assert_eq!(app.complete_query(ticket, result), QueryOutcome::Applied);
        Ok(())
    }
}
