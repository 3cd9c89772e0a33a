//! GitHub Gist transport for the CSV snapshot.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{RemoteSnapshot, RemoteStore, SyncError, SyncResult};
use crate::models::SyncSettings;
use crate::util::{compact_text, is_http_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Reads and writes one file of a gist, using the gist revision as the
/// version token.
#[derive(Clone)]
pub struct GistClient {
    gist_url: String,
    filename: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GistClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GistClient")
            .field("gist_url", &self.gist_url)
            .field("filename", &self.filename)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GistClient {
    pub fn from_settings(settings: &SyncSettings) -> SyncResult<Self> {
        let gist_id = settings
            .gist_id()
            .ok_or_else(|| SyncError::NotConfigured("no gist id set".to_string()))?;
        let token = settings
            .token()
            .ok_or_else(|| SyncError::NotConfigured("no access token set".to_string()))?;
        let base_url = normalize_base_url(&settings.api_base_url)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("lotbook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| SyncError::Unknown(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            gist_url: format!("{base_url}/gists/{gist_id}"),
            filename: settings.filename(),
            token,
            client,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn get_gist(&self) -> SyncResult<Option<GistPayload>> {
        let response = self
            .authorized(self.client.get(&self.gist_url))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let payload = response
            .json::<GistPayload>()
            .await
            .map_err(|error| SyncError::Unknown(format!("unreadable gist response: {error}")))?;
        Ok(Some(payload))
    }

    async fn fetch_raw(&self, raw_url: &str) -> SyncResult<String> {
        let response = self
            .authorized(self.client.get(raw_url))
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        response.text().await.map_err(transport_error)
    }
}

impl RemoteStore for GistClient {
    async fn fetch(&self) -> SyncResult<Option<RemoteSnapshot>> {
        let Some(mut payload) = self.get_gist().await? else {
            tracing::debug!("Gist not found; treating remote as empty");
            return Ok(None);
        };
        let version = payload.revision();

        let Some(file) = payload.files.remove(&self.filename) else {
            return Err(SyncError::MalformedRemoteContent {
                version,
                reason: format!("gist has no file named {}", self.filename),
            });
        };

        let content = if file.truncated {
            let raw_url = file.raw_url.ok_or_else(|| {
                SyncError::Unknown(format!(
                    "snapshot {} is truncated and has no raw URL",
                    self.filename
                ))
            })?;
            tracing::debug!("Snapshot is truncated; fetching raw content");
            self.fetch_raw(&raw_url).await?
        } else {
            file.content.unwrap_or_default()
        };

        tracing::debug!(
            "Fetched snapshot {} ({} bytes) at {:?}",
            self.filename,
            content.len(),
            version
        );
        Ok(Some(RemoteSnapshot { content, version }))
    }

    async fn push(&self, content: &str, expected_version: Option<&str>) -> SyncResult<String> {
        let Some(current) = self.get_gist().await? else {
            return Err(SyncError::Unknown(
                "gist does not exist; create it on GitHub first".to_string(),
            ));
        };
        let actual = current.revision();
        if actual.as_deref() != expected_version {
            return Err(SyncError::Conflict {
                expected: expected_version.map(str::to_string),
                actual,
            });
        }

        let body = GistUpdate {
            files: HashMap::from([(self.filename.as_str(), GistFileUpdate { content })]),
        };
        let response = self
            .authorized(self.client.patch(&self.gist_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let payload = response
            .json::<GistPayload>()
            .await
            .map_err(|error| SyncError::Unknown(format!("unreadable gist response: {error}")))?;

        payload
            .revision()
            .ok_or_else(|| SyncError::Unknown("gist update returned no revision".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GistPayload {
    #[serde(default)]
    files: HashMap<String, GistFile>,
    #[serde(default)]
    history: Vec<GistRevision>,
}

impl GistPayload {
    fn revision(&self) -> Option<String> {
        self.history.first().map(|revision| revision.version.clone())
    }
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistRevision {
    version: String,
}

#[derive(Debug, Serialize)]
struct GistUpdate<'a> {
    files: HashMap<&'a str, GistFileUpdate<'a>>,
}

#[derive(Debug, Serialize)]
struct GistFileUpdate<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: Option<String>,
}

async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, rate_limited, &body))
}

fn classify_status(status: StatusCode, rate_limited: bool, body: &str) -> SyncError {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if rate_limited => {
            SyncError::Unknown(format!("rate limit exceeded: {message}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::AuthInvalid(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => SyncError::Conflict {
            expected: None,
            actual: None,
        },
        _ => SyncError::Unknown(message),
    }
}

fn transport_error(error: reqwest::Error) -> SyncError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        SyncError::NetworkUnavailable(error.without_url().to_string())
    } else {
        SyncError::Unknown(error.without_url().to_string())
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<GithubErrorBody>(body) {
        if let Some(message) = payload.message {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let compact = compact_text(body);
    if compact.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact, status.as_u16())
    }
}

fn normalize_base_url(raw: &str) -> SyncResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || !is_http_url(trimmed) {
        return Err(SyncError::NotConfigured(format!(
            "API base URL must be an http(s) URL, got {raw:?}"
        )));
    }
    Ok(trimmed.to_string())
}
