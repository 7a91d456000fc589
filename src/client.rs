//! HTTP client for the VocalPrep API. Mirrors the REST surface one to one,
//! injects the bearer token on protected calls, and surfaces the server's
//! message text on failures.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::server::interviews::{ListResponse, MessageResponse};
use crate::server::users::{AuthResponse, ProfileResponse};
use crate::store::{InterviewRecord, InterviewUpdate};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Raised before any request is sent when a protected call has no token.
    #[error("no auth token set; log in first")]
    MissingToken,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response; `message` is the server's own message text.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base_url))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Registers a new account and keeps the returned token for subsequent
    /// calls.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .request(Method::POST, "/api/users")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = parse(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Logs in and keeps the returned token for subsequent calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .request(Method::POST, "/api/users/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = parse(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn profile(&self) -> Result<ProfileResponse> {
        let response = self.authed(Method::GET, "/api/users/profile")?.send().await?;
        parse(response).await
    }

    pub async fn create_interview(&self, questions: &[String]) -> Result<InterviewRecord> {
        let response = self
            .authed(Method::POST, "/api/interviews")?
            .json(&json!({ "questions": questions }))
            .send()
            .await?;
        parse(response).await
    }

    pub async fn list_interviews(&self, page: Option<u64>, limit: Option<u64>) -> Result<ListResponse> {
        let mut request = self.authed(Method::GET, "/api/interviews")?;
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        parse(request.send().await?).await
    }

    pub async fn get_interview(&self, id: &str) -> Result<InterviewRecord> {
        let response = self
            .authed(Method::GET, &format!("/api/interviews/{id}"))?
            .send()
            .await?;
        parse(response).await
    }

    pub async fn update_interview(&self, id: &str, update: &InterviewUpdate) -> Result<InterviewRecord> {
        let response = self
            .authed(Method::PUT, &format!("/api/interviews/{id}"))?
            .json(update)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn delete_interview(&self, id: &str) -> Result<MessageResponse> {
        let response = self
            .authed(Method::DELETE, &format!("/api/interviews/{id}"))?
            .send()
            .await?;
        parse(response).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    // Prefer the server's own message; fall back to the status line.
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    Err(ClientError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_protected_calls_fail_before_sending_without_token() {
        // The base URL is unroutable; reaching the network would error
        // differently, so MissingToken proves the request was never sent.
        let client = ApiClient::new("http://127.0.0.1:0");

        assert!(matches!(client.profile().await, Err(ClientError::MissingToken)));
        assert!(matches!(
            client.create_interview(&["Q1".to_string()]).await,
            Err(ClientError::MissingToken)
        ));
        assert!(matches!(
            client.delete_interview("abc").await,
            Err(ClientError::MissingToken)
        ));
    }

    #[test]
    fn test_token_management() {
        let mut client = ApiClient::new("http://localhost:5000/");

        assert!(client.token().is_none());
        client.set_token("abc");
        assert_eq!(client.token(), Some("abc"));
        client.clear_token();
        assert!(client.token().is_none());
    }
}
