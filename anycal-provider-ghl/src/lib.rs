//! GoHighLevel (LeadConnector) calendar adapter.
//!
//! Pulls appointments from `GET /calendars/events` over a rolling window
//! (3 days back, 6 months ahead, epoch-millisecond bounds) and pushes them
//! through the appointments endpoints. The events listing is a single page;
//! the API offers no cursor.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};

use anycal_core::{
    AnycalError, AnycalResult, CalendarLink, Credential, EventPage, LocalEvent, Provider,
    RemoteEvent,
};

const DEFAULT_BASE_URL: &str = "https://services.leadconnectorhq.com";
const API_VERSION: &str = "2021-04-15";
const WINDOW_DAYS_BACK: i64 = 3;
const WINDOW_MONTHS_AHEAD: u32 = 6;

mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize)]
    pub struct EventList {
        #[serde(default)]
        pub events: Vec<Appointment>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Appointment {
        #[serde(default)]
        pub id: String,
        pub title: Option<String>,
        pub start_time: Option<String>,
        pub end_time: Option<String>,
        pub notes: Option<String>,
        pub date_updated: Option<String>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppointmentUpsert {
        pub title: String,
        pub calendar_id: String,
        pub location_id: String,
        pub start_time: String,
        pub end_time: String,
        pub ignore_free_slot_validation: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
    }

    /// Upsert responses either return the appointment directly or wrap it.
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum UpsertResponse {
        Wrapped { event: Appointment },
        Bare(Appointment),
    }

    impl UpsertResponse {
        pub fn into_appointment(self) -> Appointment {
            match self {
                UpsertResponse::Wrapped { event } => event,
                UpsertResponse::Bare(appointment) => appointment,
            }
        }
    }
}

/// GoHighLevel adapter.
pub struct GhlProvider {
    http: reqwest::Client,
    base_url: String,
}

impl GhlProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        GhlProvider {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn location_id(link: &CalendarLink) -> AnycalResult<&str> {
        link.location_id.as_deref().ok_or_else(|| {
            AnycalError::Validation(format!(
                "GoHighLevel link '{}' has no location_id",
                link.id
            ))
        })
    }
}

impl Default for GhlProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// The listing window: 3 days back to 6 months ahead, as epoch-millisecond
/// strings.
fn default_window(now: DateTime<Utc>) -> (String, String) {
    let start = now - Duration::days(WINDOW_DAYS_BACK);
    let end = now + Months::new(WINDOW_MONTHS_AHEAD);
    (
        start.timestamp_millis().to_string(),
        end.timestamp_millis().to_string(),
    )
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn appointment_to_event(appointment: &wire::Appointment) -> Option<RemoteEvent> {
    if appointment.id.trim().is_empty() {
        return None;
    }
    let start = parse_time(appointment.start_time.as_deref()?)?;
    let end = parse_time(appointment.end_time.as_deref()?)?;

    Some(RemoteEvent {
        external_id: appointment.id.clone(),
        title: appointment.title.clone().unwrap_or_default(),
        description: appointment.notes.clone().filter(|n| !n.is_empty()),
        start,
        end,
        attendees: Vec::new(),
        last_modified: appointment.date_updated.as_deref().and_then(parse_time),
    })
}

fn transport_error(e: reqwest::Error) -> AnycalError {
    if e.is_timeout() || e.is_connect() {
        AnycalError::provider_retryable(format!("GoHighLevel request failed: {e}"))
    } else {
        AnycalError::provider(format!("GoHighLevel request failed: {e}"))
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
        401 | 403 => {
            AnycalError::Auth(format!("GoHighLevel rejected the access token: {excerpt}"))
        }
        429 => AnycalError::rate_limited(
            format!("GoHighLevel rate limit hit: {excerpt}"),
            retry_after,
        ),
        code if status.is_server_error() => {
            AnycalError::provider_retryable(format!("GoHighLevel returned {code}: {excerpt}"))
        }
        code => AnycalError::provider(format!("GoHighLevel returned {code}: {excerpt}")),
    })
}

#[async_trait]
impl Provider for GhlProvider {
    fn name(&self) -> &'static str {
        "ghl"
    }

    async fn fetch_events(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        _cursor: Option<String>,
    ) -> AnycalResult<EventPage> {
        let location_id = Self::location_id(link)?;
        let (window_start, window_end) = default_window(Utc::now());

        let response = self
            .http
            .get(format!("{}/calendars/events", self.base_url))
            .bearer_auth(credential.token())
            .header("Version", API_VERSION)
            .query(&[
                ("locationId", location_id),
                ("calendarId", link.calendar_id.as_str()),
                ("startTime", window_start.as_str()),
                ("endTime", window_end.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;
        let list: wire::EventList = response.json().await.map_err(|e| {
            AnycalError::provider(format!("GoHighLevel returned an unreadable event list: {e}"))
        })?;

        let mut page = EventPage::default();
        for appointment in &list.events {
            match appointment_to_event(appointment) {
                Some(event) => page.events.push(event),
                None => {
                    tracing::warn!(appointment = %appointment.id, "skipping appointment with missing fields");
                    page.malformed += 1;
                }
            }
        }
        Ok(page)
    }

    async fn upsert_event(
        &self,
        link: &CalendarLink,
        credential: &Credential,
        event: &LocalEvent,
    ) -> AnycalResult<RemoteEvent> {
        let location_id = Self::location_id(link)?;

        let body = wire::AppointmentUpsert {
            title: event.title.clone(),
            calendar_id: link.calendar_id.clone(),
            location_id: location_id.to_string(),
            start_time: event.start.to_rfc3339(),
            end_time: event.end.to_rfc3339(),
            ignore_free_slot_validation: true,
            notes: event.description.clone(),
        };

        let request = match &event.external_id {
            Some(id) => self.http.put(format!(
                "{}/calendars/events/appointments/{id}",
                self.base_url
            )),
            None => self
                .http
                .post(format!("{}/calendars/events/appointments", self.base_url)),
        };

        let response = request
            .bearer_auth(credential.token())
            .header("Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;
        let appointment = response
            .json::<wire::UpsertResponse>()
            .await
            .map_err(|e| {
                AnycalError::provider(format!("GoHighLevel returned an unreadable appointment: {e}"))
            })?
            .into_appointment();

        if appointment.id.trim().is_empty() {
            return Err(AnycalError::provider(format!(
                "GoHighLevel returned no id for '{}'",
                event.title
            )));
        }

        // Upsert responses are sparse; echo the local state back with the
        // provider-assigned id so reconciliation sees the pair as current.
        Ok(RemoteEvent {
            external_id: appointment.id,
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start,
            end: event.end,
            attendees: Vec::new(),
            last_modified: Some(event.last_modified),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn window_spans_three_days_back_and_six_months_ahead() {
        let now = Utc.with_ymd_and_hms(2025, 7, 10, 12, 0, 0).unwrap();
        let (start, end) = default_window(now);

        let expected_start = Utc.with_ymd_and_hms(2025, 7, 7, 12, 0, 0).unwrap();
        let expected_end = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(start, expected_start.timestamp_millis().to_string());
        assert_eq!(end, expected_end.timestamp_millis().to_string());
    }

    #[test]
    fn appointments_map_with_iso_times() {
        let appointment: wire::Appointment = serde_json::from_value(serde_json::json!({
            "id": "apt-1",
            "title": "Consult",
            "startTime": "2025-07-10T15:00:00+00:00",
            "endTime": "2025-07-10T15:30:00+00:00",
            "notes": "",
            "dateUpdated": "2025-07-09T08:00:00Z"
        }))
        .unwrap();

        let event = appointment_to_event(&appointment).unwrap();
        assert_eq!(event.external_id, "apt-1");
        // Empty notes collapse to no description.
        assert!(event.description.is_none());
        assert!(event.last_modified.is_some());
    }

    #[test]
    fn appointments_without_id_or_times_are_malformed() {
        let missing_id: wire::Appointment = serde_json::from_value(serde_json::json!({
            "startTime": "2025-07-10T15:00:00Z",
            "endTime": "2025-07-10T15:30:00Z"
        }))
        .unwrap();
        assert!(appointment_to_event(&missing_id).is_none());

        let missing_times: wire::Appointment =
            serde_json::from_value(serde_json::json!({ "id": "apt-2" })).unwrap();
        assert!(appointment_to_event(&missing_times).is_none());
    }
}
