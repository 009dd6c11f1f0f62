use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend_resolver::{endpoint_candidates, usable_base};
use crate::errors::{ExtractError, ExtractResult};
use crate::strategy::{ExtractionStrategy, SourceFile, StrategyContext};

const ERROR_BODY_PREVIEW_CHARS: usize = 400;

/// A parse endpoint's answer, validated before any field is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Success { text: String },
    Failure { message: String, suggestions: Vec<String> },
    Malformed(String),
}

impl BackendReply {
    pub fn parse(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(err) => return BackendReply::Malformed(format!("not JSON: {err}")),
        };
        let Some(object) = value.as_object() else {
            return BackendReply::Malformed("expected a JSON object".to_string());
        };

        match object.get("ok") {
            Some(Value::Bool(true)) => match object.get("text") {
                Some(Value::String(text)) => BackendReply::Success { text: text.clone() },
                Some(_) => BackendReply::Malformed("`text` is not a string".to_string()),
                None => BackendReply::Malformed("missing `text`".to_string()),
            },
            Some(Value::Bool(false)) => {
                let message = ["error", "reason"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str))
                    .unwrap_or("backend returned ok=false")
                    .to_string();
                let suggestions = match object.get("suggestion").or_else(|| object.get("suggestions")) {
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    Some(Value::String(single)) => vec![single.clone()],
                    _ => Vec::new(),
                };
                BackendReply::Failure { message, suggestions }
            }
            Some(_) => BackendReply::Malformed("`ok` is not a boolean".to_string()),
            None => BackendReply::Malformed("missing `ok` flag".to_string()),
        }
    }
}

pub struct RemoteStrategy {
    client: Client,
}

impl RemoteStrategy {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
            warn!(error = %err, "falling back to default HTTP client");
            Client::new()
        });
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ExtractionStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        "remote-extract"
    }

    fn extract<'a>(
        &'a self,
        file: &'a SourceFile,
        ctx: &'a StrategyContext,
    ) -> BoxFuture<'a, ExtractResult<String>> {
        parse_by_external_backend(&self.client, file, ctx).boxed()
    }
}

/// Posts the file to each candidate parse endpoint until one answers with text.
///
/// Configuration and mixed-content problems are reported before any request is
/// made. When every endpoint fails, the most specific failure is returned.
pub async fn parse_by_external_backend(
    client: &Client,
    file: &SourceFile,
    ctx: &StrategyContext,
) -> ExtractResult<String> {
    let base = usable_base(&ctx.page, &ctx.backend)?;
    let candidates = endpoint_candidates(&base, &ctx.backend_paths);
    if candidates.is_empty() {
        return Err(ExtractError::NetworkFailure {
            url: base,
            status: None,
            detail: "no parse endpoint paths are configured".to_string(),
        });
    }

    let mut best_error: Option<ExtractError> = None;
    for url in candidates {
        match post_file(client, &url, file).await {
            Ok(text) => {
                debug!(%url, chars = text.chars().count(), "backend parsed file");
                return Ok(text);
            }
            Err(err) => {
                warn!(%url, error = %err, "parse endpoint failed");
                let replace = best_error
                    .as_ref()
                    .map_or(true, |best| specificity(&err) > specificity(best));
                if replace {
                    best_error = Some(err);
                }
            }
        }
    }

    Err(best_error.unwrap_or_else(|| ExtractError::NetworkFailure {
        url: base,
        status: None,
        detail: "no parse endpoint answered".to_string(),
    }))
}

async fn post_file(client: &Client, url: &str, file: &SourceFile) -> ExtractResult<String> {
    let part = Part::bytes(file.bytes().to_vec()).file_name(file.name().to_string());
    let form = Form::new().part("file", part);

    let response = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|err| ExtractError::NetworkFailure {
            url: url.to_string(),
            status: None,
            detail: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_else(|_| String::new());
        let preview: String = body_text.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
        let detail = if preview.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", preview.trim())
        };
        return Err(ExtractError::NetworkFailure {
            url: url.to_string(),
            status: Some(status.as_u16()),
            detail,
        });
    }

    let body = response.text().await.map_err(|err| ExtractError::NetworkFailure {
        url: url.to_string(),
        status: Some(status.as_u16()),
        detail: format!("failed to read response body: {err}"),
    })?;

    match BackendReply::parse(&body) {
        BackendReply::Success { text } => Ok(text),
        BackendReply::Failure { message, suggestions } => {
            Err(ExtractError::BackendRejected { message, suggestions })
        }
        BackendReply::Malformed(reason) => Err(ExtractError::MalformedBackendResponse {
            url: url.to_string(),
            reason,
        }),
    }
}

/// A backend that answered beats one that did not; a missing route says least.
fn specificity(err: &ExtractError) -> u8 {
    match err {
        ExtractError::BackendRejected { .. } => 3,
        ExtractError::MalformedBackendResponse { .. } => 2,
        ExtractError::NetworkFailure { status: Some(404 | 405), .. } => 0,
        _ => 1,
    }
}
