//! URL fetching and browser tools.

use anyhow::{bail, Context, Result};
use reqwest::Url;
use tracing::debug;

use super::{required_str, ToolArgs, ToolContext, ToolOutput};
use crate::utils::{html_to_text, truncate_chars};

/// Longest page text handed back to the model.
pub const MAX_URL_CONTENT_CHARS: usize = 20_000;

fn parse_web_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid URL '{}'", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("Unsupported URL scheme '{}'", other),
    }
}

/// Execute the `read_url_content` tool.
pub async fn execute_read_url_content(args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
    let url = parse_web_url(required_str(&args, "url")?)?;
    debug!("Fetching {}", url);

    let response = ctx
        .http
        .get(url.clone())
        .timeout(ctx.settings.url_timeout)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Failed to fetch URL {}: HTTP {}", url, status);
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("html"))
        .unwrap_or(true);
    let body = response.text().await.context("Failed to read response body")?;

    let text = if is_html { html_to_text(&body) } else { body };
    Ok(ToolOutput::Text(truncate_chars(&text, MAX_URL_CONTENT_CHARS)))
}

/// Execute the `open_browser_url` tool.
pub async fn execute_open_browser_url(args: ToolArgs, _ctx: ToolContext) -> Result<ToolOutput> {
    let url = parse_web_url(required_str(&args, "url")?)?;
    let target = url.to_string();

    tokio::task::spawn_blocking(move || webbrowser::open(&target))
        .await?
        .with_context(|| format!("Failed to open {} in the browser", url))?;

    Ok(ToolOutput::text(format!(
        "Successfully opened {} in the browser.",
        url
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexia_execution::ProcessSupervisor;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(url: &str) -> ToolArgs {
        json!({ "url": url }).as_object().cloned().unwrap()
    }

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(ProcessSupervisor::new()))
    }

    #[tokio::test]
    async fn test_read_url_strips_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "<html><body><h1>Hello</h1><p>world</p></body></html>",
                    "text/html",
                ),
            )
            .mount(&server)
            .await;

        let out = execute_read_url_content(args(&format!("{}/page", server.uri())), ctx())
            .await
            .unwrap();
        assert_eq!(out.render(), "Hello\nworld");
    }

    #[tokio::test]
    async fn test_read_url_truncates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("a".repeat(MAX_URL_CONTENT_CHARS + 50), "text/plain"),
            )
            .mount(&server)
            .await;

        let out = execute_read_url_content(args(&server.uri()), ctx()).await.unwrap();
        assert!(out.render().contains("[Content truncated at 20000 characters]"));
    }

    #[tokio::test]
    async fn test_read_url_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = execute_read_url_content(args(&server.uri()), ctx())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_rejects_non_web_urls() {
        assert!(execute_read_url_content(args("file:///etc/passwd"), ctx()).await.is_err());
        assert!(execute_open_browser_url(args("not a url"), ctx()).await.is_err());
    }
}
