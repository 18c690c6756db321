//! Goujana scheduling adapter.
//!
//! Talks to the `/api/v1/schedule/appointment/` endpoint. Authentication
//! needs both an API token and a session cookie; the listing paginates with a
//! `next` URL rather than an opaque token.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use anycal_core::{
    AnycalError, AnycalResult, CalendarLink, Credential, EventPage, LocalEvent, Provider,
    RemoteEvent,
};

const DEFAULT_BASE_URL: &str = "https://goujana.co";
const APPOINTMENTS_PATH: &str = "/api/v1/schedule/appointment/";

mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize)]
    pub struct AppointmentList {
        #[serde(default)]
        pub results: Vec<Appointment>,
        /// URL of the next page, absent on the last one.
        pub next: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Appointment {
        pub id: Option<serde_json::Value>,
        pub text: Option<String>,
        pub observations: Option<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        pub customer: Option<Party>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Party {
        pub name: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Serialize)]
    pub struct AppointmentUpsert {
        pub text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub observations: Option<String>,
        pub start_date: String,
        pub end_date: String,
        pub calendar: String,
    }
}

/// Goujana adapter.
pub struct GoujanaProvider {
    http: reqwest::Client,
    base_url: String,
}

impl GoujanaProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        GoujanaProvider {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Goujana needs both halves of the credential.
    fn auth_parts(credential: &Credential) -> AnycalResult<(&str, &str)> {
        match credential {
            Credential::TokenCookie { token, cookie } => Ok((token, cookie)),
            Credential::Bearer { .. } => Err(AnycalError::Auth(
                "Goujana requires both an access token and a cookie value".to_string(),
            )),
        }
    }

    /// The `next` field may be absolute or relative to the API root.
    fn page_url(&self, cursor: Option<&str>) -> String {
        match cursor {
            Some(next) if next.starts_with("http") => next.to_string(),
            Some(next) => format!("{}{next}", self.base_url),
            None => format!("{}{APPOINTMENTS_PATH}", self.base_url),
        }
    }
}

impl Default for GoujanaProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Appointment dates come back as RFC 3339 or as a naive
/// `YYYY-MM-DD HH:MM:SS`, which the API treats as UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Appointment ids arrive as numbers or strings depending on the endpoint.
fn id_string(id: &serde_json::Value) -> Option<String> {
    match id {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn appointment_to_event(appointment: &wire::Appointment) -> Option<RemoteEvent> {
    let external_id = appointment.id.as_ref().and_then(id_string)?;
    let start = parse_date(appointment.start_date.as_deref()?)?;
    let end = parse_date(appointment.end_date.as_deref()?)?;

    let attendees = appointment
        .customer
        .as_ref()
        .map(|customer| {
            vec![anycal_core::Attendee {
                name: customer.name.clone(),
                email: None,
                phone: customer.phone.clone(),
            }]
        })
        .unwrap_or_default();

    Some(RemoteEvent {
        external_id,
        title: appointment.text.clone().unwrap_or_default(),
        description: appointment.observations.clone().filter(|o| !o.is_empty()),
        start,
        end,
        attendees,
        // The API exposes no modification timestamp.
        last_modified: None,
    })
}

fn transport_error(e: reqwest::Error) -> AnycalError {
    if e.is_timeout() || e.is_connect() {
        AnycalError::provider_retryable(format!("Goujana request failed: {e}"))
    } else {
        AnycalError::provider(format!("Goujana request failed: {e}"))
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, AnycalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(200).collect();

    Err(match status.as_u16() {
        401 | 403 => AnycalError::Auth(format!("Goujana rejected the access token: {excerpt}")),
        429 => AnycalError::rate_limited(format!("Goujana rate limit hit: {excerpt}"), retry_after),
        code if status.is_server_error() => {
            AnycalError::provider_retryable(format!("Goujana returned {code}: {excerpt}"))
        }
        code => AnycalError::provider(format!("Goujana returned {code}: {excerpt}")),
    })
}

#[async_trait]
impl Provider for GoujanaProvider {
    fn name(&self) -> &'static str {
        "goujana"
    }

    async fn fetch_events(
        &self,
        _link: &CalendarLink,
        credential: &Credential,
        cursor: Option<String>,
    ) -> AnycalResult<EventPage> {
        let (token, cookie) = Self::auth_parts(credential)?;

        let response = self
            .http
            .get(self.page_url(cursor.as_deref()))
            .header("X-API-TOKEN", token)
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;
        let list: wire::AppointmentList = response.json().await.map_err(|e| {
            AnycalError::provider(format!("Goujana returned an unreadable appointment list: {e}"))
        })?;

        let mut page = EventPage::default();
        for appointment in &list.results {
            match appointment_to_event(appointment) {
                Some(event) => page.events.push(event),
                None => {
                    tracing::warn!("skipping appointment with missing fields");
                    page.malformed += 1;
                }
            }
        }
        page.next_cursor = list.next;
        Ok(page)
    }

    async fn upsert_event(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        event: &LocalEvent,
    ) -> AnycalResult<RemoteEvent> {
        let (token, cookie) = Self::auth_parts(credential)?;

        let body = wire::AppointmentUpsert {
            text: event.title.clone(),
            observations: event.description.clone(),
            start_date: event.start.to_rfc3339(),
            end_date: event.end.to_rfc3339(),
            calendar: link.calendar_id.clone(),
        };

        let request = match &event.external_id {
            Some(id) => self.http.put(format!(
                "{}{APPOINTMENTS_PATH}{id}/",
                self.base_url
            )),
            None => self
                .http
                .post(format!("{}{APPOINTMENTS_PATH}", self.base_url)),
        };

        let response = request
            .header("X-API-TOKEN", token)
            .header(reqwest::header::COOKIE, cookie)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;
        let appointment: wire::Appointment = response.json().await.map_err(|e| {
            AnycalError::provider(format!("Goujana returned an unreadable appointment: {e}"))
        })?;

        let external_id = appointment
            .id
            .as_ref()
            .and_then(id_string)
            .or_else(|| event.external_id.clone())
            .ok_or_else(|| {
                AnycalError::provider(format!("Goujana returned no id for '{}'", event.title))
            })?;

        Ok(RemoteEvent {
            external_id,
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start,
            end: event.end,
            attendees: event.attendees.clone(),
            last_modified: Some(event.last_modified),
        })
    }
}
