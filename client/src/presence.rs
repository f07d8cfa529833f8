use std::fmt;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use osiris_shared::{AdminStatus, RegisterRequest, RosterEntry};
use wasm_bindgen_futures::spawn_local;

use crate::config::{HEARTBEAT_INTERVAL_MS, api_url};

/// Why a roster poll produced no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListFailure {
    /// Transport failure; polling continues.
    Unreachable(String),
    /// Backend answered with an error status or something other than a JSON roster.
    Misconfigured(String),
}

impl fmt::Display for ListFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(reason) => write!(f, "roster backend unreachable: {reason}"),
            Self::Misconfigured(reason) => write!(f, "roster backend misconfigured: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeleteError {
    Unauthorized,
    NotFound,
    Failed(String),
}

impl fmt::Display for DeleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Not authorized"),
            Self::NotFound => write!(f, "User not found"),
            Self::Failed(reason) => write!(f, "request failed: {reason}"),
        }
    }
}

/// Interpret a list response. Markup or script source served in place of JSON
/// means the API is not wired up on this host.
pub(crate) fn classify_list_response(
    status: u16,
    body: &str,
) -> Result<Vec<RosterEntry>, ListFailure> {
    if !(200..300).contains(&status) {
        return Err(ListFailure::Misconfigured(format!("HTTP {status}")));
    }
    serde_json::from_str::<Vec<RosterEntry>>(body).map_err(|e| {
        let trimmed = body.trim_start();
        let reason = if trimmed.starts_with('<') {
            "response is markup, not JSON".to_string()
        } else {
            format!("parse error: {e}")
        };
        ListFailure::Misconfigured(reason)
    })
}

pub(crate) fn classify_delete_status(status: u16) -> Result<(), DeleteError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(DeleteError::Unauthorized),
        404 => Err(DeleteError::NotFound),
        other => Err(DeleteError::Failed(format!("HTTP {other}"))),
    }
}

/// What one poll means for the roster, the console and the heartbeat.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PollVerdict {
    pub entries: Vec<RosterEntry>,
    pub warning: Option<String>,
    pub stop_polling: bool,
    pub newly_misconfigured: bool,
}

/// Sticky misconfiguration flag plus once-per-outage logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PollGuard {
    misconfigured: bool,
    outage_logged: bool,
}

impl PollGuard {
    pub(crate) fn is_misconfigured(&self) -> bool {
        self.misconfigured
    }

    pub(crate) fn accept(&mut self, result: Result<Vec<RosterEntry>, ListFailure>) -> PollVerdict {
        if self.misconfigured {
            return PollVerdict {
                entries: Vec::new(),
                warning: None,
                stop_polling: true,
                newly_misconfigured: false,
            };
        }
        match result {
            Ok(entries) => {
                self.outage_logged = false;
                PollVerdict {
                    entries,
                    warning: None,
                    stop_polling: false,
                    newly_misconfigured: false,
                }
            }
            Err(failure @ ListFailure::Unreachable(_)) => {
                let warning = (!self.outage_logged).then(|| failure.to_string());
                self.outage_logged = true;
                PollVerdict {
                    entries: Vec::new(),
                    warning,
                    stop_polling: false,
                    newly_misconfigured: false,
                }
            }
            Err(failure @ ListFailure::Misconfigured(_)) => {
                self.misconfigured = true;
                PollVerdict {
                    entries: Vec::new(),
                    warning: Some(failure.to_string()),
                    stop_polling: true,
                    newly_misconfigured: true,
                }
            }
        }
    }
}

fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

/// Handle to the remote roster and the heartbeat that keeps it fresh.
#[derive(Clone, Copy)]
pub(crate) struct PresenceClient {
    guard: StoredValue<PollGuard>,
    /// Flips once, when the backend is found to be missing or misconfigured.
    pub misconfigured: RwSignal<bool>,
    heartbeat: StoredValue<Option<Interval>, LocalStorage>,
}

impl PresenceClient {
    pub(crate) fn new() -> Self {
        Self {
            guard: StoredValue::new(PollGuard::default()),
            misconfigured: RwSignal::new(false),
            heartbeat: StoredValue::new_local(None),
        }
    }

    /// Upsert keyed by name. Failures are logged and otherwise ignored.
    pub(crate) async fn register(&self, request: RegisterRequest) {
        let result = async {
            let resp = gloo_net::http::Request::post(&api_url("/api/users"))
                .json(&request)
                .map_err(|e| format!("encode error: {e}"))?
                .send()
                .await
                .map_err(|e| format!("fetch error: {e}"))?;
            if !resp.ok() {
                return Err(format!("HTTP {}", resp.status()));
            }
            Ok(())
        }
        .await;
        if let Err(e) = result {
            warn(&format!("presence register failed: {e}"));
        }
    }

    async fn fetch_list() -> Result<Vec<RosterEntry>, ListFailure> {
        let resp = gloo_net::http::Request::get(&api_url("/api/users"))
            .send()
            .await
            .map_err(|e| ListFailure::Unreachable(format!("fetch error: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ListFailure::Unreachable(format!("read error: {e}")))?;
        classify_list_response(status, &body)
    }

    /// Full roster, or empty on any failure.
    pub(crate) async fn list(&self) -> Vec<RosterEntry> {
        if self.guard.try_with_value(PollGuard::is_misconfigured).unwrap_or(true) {
            return Vec::new();
        }
        let result = Self::fetch_list().await;
        let Some(verdict) = self.guard.try_update_value(|guard| guard.accept(result)) else {
            return Vec::new();
        };
        if let Some(warning) = verdict.warning.as_deref() {
            warn(warning);
        }
        if verdict.newly_misconfigured {
            self.misconfigured.set(true);
        }
        if verdict.stop_polling {
            self.stop_heartbeat();
        }
        verdict.entries
    }

    /// Wipe the roster. The server only honours this for administrators.
    pub(crate) async fn clear(&self) -> Result<(), DeleteError> {
        let resp = gloo_net::http::Request::post(&api_url("/api/users-clear"))
            .send()
            .await
            .map_err(|e| DeleteError::Failed(format!("fetch error: {e}")))?;
        classify_delete_status(resp.status())
    }

    pub(crate) async fn delete(&self, id: i64) -> Result<(), DeleteError> {
        let resp = gloo_net::http::Request::delete(&api_url(&format!("/api/users/{id}")))
            .send()
            .await
            .map_err(|e| DeleteError::Failed(format!("fetch error: {e}")))?;
        classify_delete_status(resp.status())
    }

    pub(crate) async fn me(&self) -> AdminStatus {
        let result = async {
            let resp = gloo_net::http::Request::get(&api_url("/api/users/me"))
                .send()
                .await
                .map_err(|e| format!("fetch error: {e}"))?;
            if !resp.ok() {
                return Err(format!("HTTP {}", resp.status()));
            }
            resp.json::<AdminStatus>()
                .await
                .map_err(|e| format!("parse error: {e}"))
        }
        .await;
        result.unwrap_or_default()
    }

    /// Register (when `request` yields one) then list, now and every heartbeat.
    /// Restarting replaces any running heartbeat.
    pub(crate) fn start_heartbeat(
        &self,
        request: impl Fn() -> Option<RegisterRequest> + 'static,
        on_roster: impl Fn(Vec<RosterEntry>) + 'static,
    ) {
        self.stop_heartbeat();
        if self.guard.try_with_value(PollGuard::is_misconfigured).unwrap_or(true) {
            return;
        }

        let client = *self;
        let request = Rc::new(request);
        let on_roster = Rc::new(on_roster);
        let tick = move || {
            let request = Rc::clone(&request);
            let on_roster = Rc::clone(&on_roster);
            spawn_local(async move {
                if let Some(body) = request() {
                    client.register(body).await;
                }
                let entries = client.list().await;
                on_roster(entries);
            });
        };

        tick();
        let interval = Interval::new(HEARTBEAT_INTERVAL_MS, tick);
        self.heartbeat.set_value(Some(interval));
    }

    /// Safe to call any number of times.
    pub(crate) fn stop_heartbeat(&self) {
        // Dropping the interval cancels it.
        let _ = self.heartbeat.try_update_value(Option::take);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = r#"[{"id":1,"ip":"10.0.0.1","name":"A","lat":null,"lng":null,
        "city":null,"country":null,"lastSeen":1760000000000}]"#;

    #[test]
    fn json_roster_is_accepted() {
        let entries = classify_list_response(200, ROSTER).expect("roster parses");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "A");
        assert_eq!(classify_list_response(200, "[]"), Ok(Vec::new()));
    }

    #[test]
    fn markup_and_source_are_misconfiguration() {
        assert_eq!(
            classify_list_response(200, "<!DOCTYPE html><html></html>"),
            Err(ListFailure::Misconfigured("response is markup, not JSON".into()))
        );
        assert_eq!(
            classify_list_response(200, "<?php echo json_encode($users);"),
            Err(ListFailure::Misconfigured("response is markup, not JSON".into()))
        );
        assert!(matches!(
            classify_list_response(200, r#"{"error":"Database error"}"#),
            Err(ListFailure::Misconfigured(_))
        ));
        assert_eq!(
            classify_list_response(404, ROSTER),
            Err(ListFailure::Misconfigured("HTTP 404".into()))
        );
    }

    #[test]
    fn misconfiguration_is_sticky_and_reported_once() {
        let mut guard = PollGuard::default();
        let first = guard.accept(classify_list_response(200, "<html>"));
        assert!(first.entries.is_empty());
        assert!(first.stop_polling);
        assert!(first.newly_misconfigured);
        assert!(first.warning.is_some());

        let second = guard.accept(classify_list_response(200, ROSTER));
        assert!(second.entries.is_empty(), "sticky flag suppresses later data");
        assert!(second.stop_polling);
        assert!(!second.newly_misconfigured);
        assert_eq!(second.warning, None);
    }

    #[test]
    fn outages_log_once_and_keep_polling() {
        let mut guard = PollGuard::default();
        let down = || Err(ListFailure::Unreachable("fetch error: offline".into()));

        let first = guard.accept(down());
        assert!(first.warning.is_some());
        assert!(!first.stop_polling);
        assert_eq!(guard.accept(down()).warning, None);

        let back = guard.accept(classify_list_response(200, ROSTER));
        assert_eq!(back.entries.len(), 1);
        assert!(guard.accept(down()).warning.is_some(), "a new outage logs again");
        assert!(!guard.is_misconfigured());
    }

    #[test]
    fn delete_statuses_are_distinguished() {
        assert_eq!(classify_delete_status(200), Ok(()));
        assert_eq!(classify_delete_status(403), Err(DeleteError::Unauthorized));
        assert_eq!(classify_delete_status(404), Err(DeleteError::NotFound));
        assert_eq!(
            classify_delete_status(500),
            Err(DeleteError::Failed("HTTP 500".into()))
        );
    }
}
