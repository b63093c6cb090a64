use crate::infrastructure::error::CoreError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct InboxMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub snippet: String,
    #[serde(default)]
    pub is_unread: bool,
}

#[async_trait]
pub trait IntegrationClient: Send + Sync {
    async fn fetch_calendar_events(&self, access_token: &str)
    -> Result<Vec<CalendarEvent>, CoreError>;
    async fn fetch_inbox_messages(&self, access_token: &str)
    -> Result<Vec<InboxMessage>, CoreError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestIntegrationClient {
    client: Client,
    base_url: String,
}

impl ReqwestIntegrationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.base_url).map_err(|error| {
            CoreError::Transport(format!("invalid integration base url: {error}"))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CoreError::Transport("integration base URL cannot be a base".to_string())
            })?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn ensure_token(access_token: &str) -> Result<(), CoreError> {
        if access_token.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "access token must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn transport_http_error(status: reqwest::StatusCode, body: &str) -> CoreError {
        let message = if body.trim().is_empty() {
            format!("integration service error: http {}", status.as_u16())
        } else {
            format!(
                "integration service error: http {}; body={body}",
                status.as_u16()
            )
        };
        CoreError::Transport(message)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        access_token: &str,
        segments: &[&str],
        what: &str,
    ) -> Result<T, CoreError> {
        Self::ensure_token(access_token)?;

        let endpoint = self.endpoint(segments)?;
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| {
                CoreError::Transport(format!("network error while fetching {what}: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            CoreError::Transport(format!("failed reading {what} response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::transport_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            CoreError::Transport(format!("invalid {what} payload: {error}; body={body}"))
        })
    }
}

#[async_trait]
impl IntegrationClient for ReqwestIntegrationClient {
    async fn fetch_calendar_events(
        &self,
        access_token: &str,
    ) -> Result<Vec<CalendarEvent>, CoreError> {
        self.fetch_json(access_token, &["google", "calendar", "events"], "calendar events")
            .await
    }

    async fn fetch_inbox_messages(
        &self,
        access_token: &str,
    ) -> Result<Vec<InboxMessage>, CoreError> {
        self.fetch_json(access_token, &["google", "gmail", "messages"], "inbox messages")
            .await
    }
}
