//! REST client for the backend notification endpoints.
//!
//! Wraps the notification HTTP API (listing, read receipts, deletion)
//! using [`reqwest`]. The bearer token comes from the explicitly passed
//! [`SessionContext`].

use std::time::Duration;

use raffle_core::notification::NotificationPage;
use raffle_core::session::SessionContext;
use raffle_core::types::DbId;

use crate::store::{NotificationStore, StoreError};

/// HTTP-backed [`NotificationStore`].
pub struct HttpNotificationStore {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HttpNotificationStore {
    /// Create a store for the API rooted at `api_url`, e.g.
    /// `https://raffle.example.com/api`.
    pub fn new(
        api_url: &str,
        session: &SessionContext,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url, session.token.clone()))
    }

    /// Create a store reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Base API URL without a trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // ---- private helpers ----

    /// Map non-2xx responses to [`StoreError`]. 401 is reported as
    /// [`StoreError::Unauthorized`] so the engine can expire the session.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(StoreError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl NotificationStore for HttpNotificationStore {
    async fn list_notifications(
        &self,
        page_size: u32,
        include_stats: bool,
    ) -> Result<NotificationPage, StoreError> {
        let request = self.client.get(self.url("notifications/")).query(&[
            ("page_size", page_size.to_string()),
            ("include_stats", include_stats.to_string()),
        ]);

        let response = self.authorize(request).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<NotificationPage>().await?)
    }

    async fn mark_read(&self, ids: &[DbId]) -> Result<(), StoreError> {
        let body = serde_json::json!({ "notification_ids": ids });
        let request = self
            .client
            .post(self.url("notifications/mark-read/"))
            .json(&body);

        let response = self.authorize(request).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), StoreError> {
        let request = self.client.post(self.url("notifications/mark-all-read/"));

        let response = self.authorize(request).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete_notification(&self, id: DbId) -> Result<(), StoreError> {
        let request = self.client.delete(self.url(&format!("notifications/{id}/")));

        let response = self.authorize(request).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_url: &str) -> HttpNotificationStore {
        HttpNotificationStore::with_client(reqwest::Client::new(), api_url, None)
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let s = store("http://localhost:8000/api/");
        assert_eq!(s.api_url(), "http://localhost:8000/api");
        assert_eq!(
            s.url("notifications/"),
            "http://localhost:8000/api/notifications/"
        );
    }

    #[test]
    fn leading_slash_in_path_is_ignored() {
        let s = store("http://localhost:8000/api");
        assert_eq!(
            s.url("/notifications/12/"),
            "http://localhost:8000/api/notifications/12/"
        );
    }

    #[test]
    fn new_uses_session_token() {
        let session = SessionContext {
            user: None,
            token: Some("abc".to_string()),
        };
        let s = HttpNotificationStore::new("http://h", &session, Duration::from_secs(5))
            .expect("client should build");
        assert_eq!(s.token.as_deref(), Some("abc"));
    }

    #[test]
    fn bearer_header_is_attached_when_token_present() {
        let s = HttpNotificationStore::with_client(
            reqwest::Client::new(),
            "http://h",
            Some("tok".to_string()),
        );
        let request = s
            .authorize(s.client.get(s.url("notifications/")))
            .build()
            .expect("valid request");
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer tok"
        );
    }

    #[test]
    fn api_error_display() {
        let err = StoreError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Notification API error (502): bad gateway");
    }

    #[test]
    fn request_error_display() {
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = StoreError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }
}
