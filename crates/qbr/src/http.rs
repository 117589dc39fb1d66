//! Shared HTTP client setup.

use std::time::Duration;

/// User agent sent to every API.
pub const USER_AGENT: &str = concat!("qbr/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with the job-wide request timeout.
pub fn client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Read an error body, preferring its message field when the body is JSON.
pub async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    message_from_body(&text).unwrap_or(text)
}

fn message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.pointer("/error/message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
