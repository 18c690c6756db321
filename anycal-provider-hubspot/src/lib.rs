//! HubSpot meetings adapter.
//!
//! Maps the CRM v3 meetings API onto the normalized provider interface:
//! meetings list with `after` cursor pagination for pulls, and
//! `POST`/`PATCH /crm/v3/objects/meetings` for pushes. Timestamps on meeting
//! properties are epoch milliseconds encoded as strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use anycal_core::{
    AnycalError, AnycalResult, CalendarLink, Credential, EventPage, LocalEvent, Provider,
    RemoteEvent,
};

const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
const PAGE_LIMIT: u32 = 100;
const MEETING_PROPERTIES: &str =
    "hs_meeting_title,hs_meeting_start_time,hs_meeting_end_time,hs_meeting_body";

mod wire {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize)]
    pub struct MeetingList {
        #[serde(default)]
        pub results: Vec<Meeting>,
        pub paging: Option<Paging>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Paging {
        pub next: Option<PagingNext>,
    }

    #[derive(Debug, Deserialize)]
    pub struct PagingNext {
        pub after: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Meeting {
        #[serde(default)]
        pub id: String,
        #[serde(default)]
        pub properties: MeetingProperties,
        #[serde(rename = "updatedAt")]
        pub updated_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MeetingProperties {
        pub hs_meeting_title: Option<String>,
        pub hs_meeting_start_time: Option<String>,
        pub hs_meeting_end_time: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub hs_meeting_body: Option<String>,
        /// Engagement timestamp; HubSpot rejects meeting creates without it.
        #[serde(skip_serializing_if = "Option::is_none")]
        pub hs_timestamp: Option<String>,
    }

    #[derive(Debug, Serialize)]
    pub struct MeetingUpsert {
        pub properties: MeetingProperties,
    }
}

/// HubSpot adapter. One instance serves any number of links; the credential
/// comes in per call.
pub struct HubspotProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HubspotProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the adapter at a different API root (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        HubspotProvider {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for HubspotProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Meeting property timestamps arrive as epoch-millisecond strings, but some
/// portal configurations hand back RFC 3339 instead.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `None` when the meeting is missing the fields an event needs.
fn meeting_to_event(meeting: &wire::Meeting) -> Option<RemoteEvent> {
    if meeting.id.trim().is_empty() {
        return None;
    }
    let start = parse_timestamp(meeting.properties.hs_meeting_start_time.as_deref()?)?;
    let end = parse_timestamp(meeting.properties.hs_meeting_end_time.as_deref()?)?;

    Some(RemoteEvent {
        external_id: meeting.id.clone(),
        title: meeting
            .properties
            .hs_meeting_title
            .clone()
            .unwrap_or_default(),
        description: meeting.properties.hs_meeting_body.clone(),
        start,
        end,
        attendees: Vec::new(),
        last_modified: meeting.updated_at,
    })
}

fn transport_error(e: reqwest::Error) -> AnycalError {
    if e.is_timeout() || e.is_connect() {
        AnycalError::provider_retryable(format!("HubSpot request failed: {e}"))
    } else {
        AnycalError::provider(format!("HubSpot request failed: {e}"))
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
        401 | 403 => AnycalError::Auth(format!("HubSpot rejected the access token: {excerpt}")),
        429 => AnycalError::rate_limited(format!("HubSpot rate limit hit: {excerpt}"), retry_after),
        code if status.is_server_error() => {
            AnycalError::provider_retryable(format!("HubSpot returned {code}: {excerpt}"))
        }
        code => AnycalError::provider(format!("HubSpot returned {code}: {excerpt}")),
    })
}

#[async_trait]
impl Provider for HubspotProvider {
    fn name(&self) -> &'static str {
        "hubspot"
    }

    async fn fetch_events(
        &self,
        _link: &CalendarLink,
        credential: &Credential,
        cursor: Option<String>,
    ) -> AnycalResult<EventPage> {
        let url = format!("{}/crm/v3/objects/meetings", self.base_url);
        let mut request = self
            .http
            .get(&url)
            .bearer_auth(credential.token())
            .query(&[
                ("limit", PAGE_LIMIT.to_string()),
                ("properties", MEETING_PROPERTIES.to_string()),
            ]);
        if let Some(after) = cursor {
            request = request.query(&[("after", after)]);
        }

        let response = request.send().await.map_err(transport_error)?;
        let response = error_for_status(response).await?;
        let list: wire::MeetingList = response.json().await.map_err(|e| {
            AnycalError::provider(format!("HubSpot returned an unreadable meeting list: {e}"))
        })?;

        let mut page = EventPage::default();
        for meeting in &list.results {
            match meeting_to_event(meeting) {
                Some(event) => page.events.push(event),
                None => {
                    tracing::warn!(meeting = %meeting.id, "skipping meeting with missing fields");
                    page.malformed += 1;
                }
            }
        }
        page.next_cursor = list.paging.and_then(|p| p.next).map(|n| n.after);
        Ok(page)
    }

    async fn upsert_event(
        &self,
        _link: &CalendarLink,
        credential: &Credential,
        event: &LocalEvent,
    ) -> AnycalResult<RemoteEvent> {
        let start_millis = event.start.timestamp_millis().to_string();
        let body = wire::MeetingUpsert {
            properties: wire::MeetingProperties {
                hs_meeting_title: Some(event.title.clone()),
                hs_meeting_start_time: Some(start_millis.clone()),
                hs_meeting_end_time: Some(event.end.timestamp_millis().to_string()),
                hs_meeting_body: event.description.clone(),
                hs_timestamp: Some(start_millis),
            },
        };

        let request = match &event.external_id {
            Some(id) => self
                .http
                .patch(format!("{}/crm/v3/objects/meetings/{id}", self.base_url)),
            None => self
                .http
                .post(format!("{}/crm/v3/objects/meetings", self.base_url)),
        };

        let response = request
            .bearer_auth(credential.token())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;
        let meeting: wire::Meeting = response.json().await.map_err(|e| {
            AnycalError::provider(format!("HubSpot returned an unreadable meeting: {e}"))
        })?;

        let mut remote = meeting_to_event(&meeting).ok_or_else(|| {
            AnycalError::provider(format!(
                "HubSpot returned an incomplete meeting for '{}'",
                event.title
            ))
        })?;
        // Created objects sometimes omit updatedAt; fall back to the local
        // timestamp so the pair reconciles as up to date.
        if remote.last_modified.is_none() {
            remote.last_modified = Some(event.last_modified);
        }
        Ok(remote)
    }
}
