use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::*;

impl NotificationApi {
    /// Create a client for `base_url` (e.g. `https://api.example.com/api`).
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build auth headers from the stored token.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.access_token.is_empty() {
            return headers;
        }
        let bearer = format!("Bearer {}", self.access_token);
        match HeaderValue::from_str(&bearer) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Access token contains invalid header characters"),
        }
        headers
    }

    /// Execute a GET request with auth headers.
    pub(super) async fn authenticated_get(&self, path: &str) -> Result<String, ClientError> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(url, "Got 401, session token is no longer valid");
        }

        if !status.is_success() {
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    /// Execute a PUT request with auth headers and no body.
    pub(super) async fn authenticated_put_no_body(
        &self,
        path: &str,
    ) -> Result<String, ClientError> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .put(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    /// Execute a DELETE request with auth headers.
    pub(super) async fn authenticated_delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .delete(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(())
    }
}
