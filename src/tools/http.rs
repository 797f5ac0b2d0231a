//! Shared HTTP plumbing for remote-data tools.

use crate::error::ToolError;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

/// GET `url` with query `params` and decode a JSON body.
///
/// Request URLs carry credentials, so they are stripped from every error.
pub async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T> {
    let resp = http
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(reqwest::Error::without_url)
        .context("Provider request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Provider returned {}: {}", status, body);
    }

    resp.json()
        .await
        .map_err(reqwest::Error::without_url)
        .context("Failed to parse provider response")
}

/// Replace a provider failure with the tool's generic message.
///
/// The underlying error only goes to the debug log.
pub fn generic<'a>(
    tool: &'a str,
    message: &'static str,
) -> impl FnOnce(anyhow::Error) -> ToolError + 'a {
    move |e| {
        debug!("{} provider error: {:#}", tool, e);
        ToolError::Execution(message.to_string())
    }
}

/// Join a base URL and a path segment.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(endpoint("https://x.test/v2/", "/everything"), "https://x.test/v2/everything");
        assert_eq!(endpoint("https://x.test", "query"), "https://x.test/query");
    }

    #[test]
    fn generic_hides_provider_text() {
        let err = generic("news", "Failed to fetch news data")(anyhow::anyhow!("401: bad apiKey xyz"));
        assert_eq!(err.to_string(), "Failed to fetch news data");
    }
}
