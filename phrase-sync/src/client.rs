#![doc = "HTTP client for the PhraseApp v1 API, implementing the core's TranslationService."]
//
//! # PhraseApp client
//!
//! [`PhraseClient`] is the only place that speaks HTTP. It wires every
//! [`TranslationService`] call to one API endpoint:
//!
//! | call                    | request                             |
//! |-------------------------|-------------------------------------|
//! | `list_locales`          | `GET locales`                       |
//! | `download_translations` | `GET translations/download`         |
//! | `upload_file`           | `POST translation_keys/upload`      |
//! | `create_locale`         | `POST locales`                      |
//! | `make_default_locale`   | `PUT locales/{name}/make_default`   |
//! | `list_tags`             | `GET tags`                          |
//!
//! The project secret travels as the `auth_token` parameter: in the query for
//! `GET`, in the url-encoded form body otherwise.
//!
//! ## Errors
//! Any non-2xx response becomes an [`ApiError`] carrying the method, the URL
//! (without query), the status and whatever message the body held.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use phrase_sync_core::contract::{
    Download, DownloadRequest, Locale, RateLimit, ServiceError, Tag, TranslationService,
    UploadRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://phraseapp.com/api/v1/";
pub const USER_AGENT: &str = concat!("phrase-sync/", env!("CARGO_PKG_VERSION"));

const RATE_LIMIT_LIMIT: &str = "x-rate-limit-limit";
const RATE_LIMIT_REMAINING: &str = "x-rate-limit-remaining";
const RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

/// A non-2xx answer from the API.
#[derive(Debug, Error)]
#[error("{method} {url}: {status}{}", display_message(.message))]
pub struct ApiError {
    pub method: &'static str,
    pub url: String,
    pub status: u16,
    pub message: String,
}

fn display_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" {message}")
    }
}

pub struct PhraseClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl PhraseClient {
    pub fn new(auth_token: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_base_url(auth_token, DEFAULT_BASE_URL)
    }

    /// Client against another API root, e.g. a local test server.
    pub fn with_base_url(
        auth_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let auth_token = auth_token.into();
        info!(base_url = %base_url, auth_token_set = !auth_token.is_empty(), "Initialized PhraseClient");
        Ok(PhraseClient {
            http,
            base_url,
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, url: &str, mut params: Vec<(&'static str, String)>) -> RequestBuilder {
        params.push(("auth_token", self.auth_token.clone()));
        self.http.get(url).query(&params)
    }

    fn with_form(
        &self,
        builder: RequestBuilder,
        mut params: Vec<(&'static str, String)>,
    ) -> RequestBuilder {
        params.push(("auth_token", self.auth_token.clone()));
        builder.form(&params)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ServiceError> {
        debug!(method, url, "Sending API request");
        let response = request.send().await.map_err(|e| {
            let e = redact(e);
            error!(method, url, error = %e, "[ERROR] API request failed");
            e
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();
        let api_error = ApiError {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            message: error_message(content_type.as_deref(), &body),
        };
        error!(method, url, status = api_error.status, message = %api_error.message, "[ERROR] API returned an error");
        Err(Box::new(api_error))
    }
}

/// reqwest errors name the full request URL, whose query holds `auth_token`.
fn redact(e: reqwest::Error) -> ServiceError {
    Box::new(e.without_url())
}

/// Flag parameters are only sent when set, as `1`.
fn flag(params: &mut Vec<(&'static str, String)>, name: &'static str, set: bool) {
    if set {
        params.push((name, "1".to_string()));
    }
}

fn optional(params: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        params.push((name, value.to_string()));
    }
}

fn download_params(req: &DownloadRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![("locale", req.locale.clone()), ("format", req.format.clone())];
    optional(&mut params, "encoding", req.encoding.as_deref());
    optional(&mut params, "tag", req.tag.as_deref());
    optional(&mut params, "updated_since", req.updated_since.as_deref());
    flag(&mut params, "include_empty_translations", req.include_empty_translations);
    flag(&mut params, "keep_notranslate_tags", req.keep_notranslate_tags);
    flag(&mut params, "convert_emoji", req.convert_emoji);
    flag(&mut params, "skip_unverified_translations", req.skip_unverified_translations);
    params
}

fn upload_params(req: &UploadRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("filename", req.filename.clone()),
        ("file_content", req.file_content.clone()),
    ];
    params.extend(req.tags.iter().map(|tag| ("tags[]", tag.clone())));
    params.push(("locale_code", req.locale_code.clone()));
    optional(&mut params, "file_format", req.file_format.as_deref());
    flag(&mut params, "update_translations", req.update_translations);
    flag(&mut params, "skip_unverification", req.skip_unverification);
    flag(&mut params, "skip_upload_tags", req.skip_upload_tags);
    flag(&mut params, "convert_emoji", req.convert_emoji);
    params
}

/// Rate-limit headers; unparsable values count as absent, as does a zero reset.
fn rate_limit(headers: &HeaderMap) -> RateLimit {
    RateLimit {
        limit: header(headers, RATE_LIMIT_LIMIT).and_then(|v| v.trim().parse().ok()),
        remaining: header(headers, RATE_LIMIT_REMAINING).and_then(|v| v.trim().parse().ok()),
        reset_at: header(headers, RATE_LIMIT_RESET)
            .and_then(|v| v.trim().parse().ok())
            .filter(|reset: &i64| *reset != 0),
    }
}

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Human-readable message of an error body.
///
/// JSON bodies carry it in `error`, `message` or `messages`; the latter two may
/// also hold validation errors, as a list or a field → list map, rendered as
/// `[field: a, b]`. Other bodies are used verbatim.
fn error_message(content_type: Option<&str>, body: &str) -> String {
    let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        return body.trim().to_string();
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let mut parts = Vec::new();
    for key in ["error", "message", "messages"] {
        match value.get(key) {
            Some(Value::String(text)) => parts.push(text.clone()),
            Some(Value::Array(items)) => parts.push(format!("[error: {}]", join_strings(items))),
            Some(Value::Object(fields)) => {
                let rendered: String = fields
                    .iter()
                    .map(|(field, errors)| match errors {
                        Value::Array(items) => format!("[{field}: {}]", join_strings(items)),
                        other => format!("[{field}: {}]", plain(other)),
                    })
                    .collect();
                parts.push(rendered);
            }
            _ => {}
        }
    }
    parts.join(" ")
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn join_strings(items: &[Value]) -> String {
    items.iter().map(plain).collect::<Vec<_>>().join(", ")
}

#[async_trait]
impl TranslationService for PhraseClient {
    async fn list_locales(&self) -> Result<Vec<Locale>, ServiceError> {
        let url = self.url("locales");
        let response = self.send("GET", &url, self.get(&url, Vec::new())).await?;
        let locales: Vec<Locale> = response.json().await.map_err(redact)?;
        info!(count = locales.len(), "Fetched locales");
        Ok(locales)
    }

    async fn download_translations(
        &self,
        req: &DownloadRequest,
    ) -> Result<Download, ServiceError> {
        let url = self.url("translations/download");
        let request = self.get(&url, download_params(req));
        let response = self.send("GET", &url, request).await?;
        let rate_limit = rate_limit(response.headers());
        let content = response.bytes().await.map_err(redact)?.to_vec();
        debug!(locale = %req.locale, bytes = content.len(), ?rate_limit, "Downloaded translations");
        Ok(Download {
            content,
            rate_limit,
        })
    }

    async fn upload_file(&self, req: &UploadRequest) -> Result<(), ServiceError> {
        let url = self.url("translation_keys/upload");
        let request = self.with_form(self.http.post(&url), upload_params(req));
        self.send("POST", &url, request).await?;
        info!(filename = %req.filename, locale = %req.locale_code, "Uploaded file");
        Ok(())
    }

    async fn create_locale(&self, name: &str) -> Result<Locale, ServiceError> {
        let url = self.url("locales");
        let request = self.with_form(
            self.http.post(&url),
            vec![("locale[name]", name.to_string())],
        );
        let response = self.send("POST", &url, request).await?;
        Ok(response.json().await.map_err(redact)?)
    }

    async fn make_default_locale(&self, name: &str) -> Result<Locale, ServiceError> {
        let url = self.url(&format!("locales/{name}/make_default"));
        let request = self.with_form(self.http.put(&url), Vec::new());
        let response = self.send("PUT", &url, request).await?;
        Ok(response.json().await.map_err(redact)?)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError> {
        let url = self.url("tags");
        let response = self.send("GET", &url, self.get(&url, Vec::new())).await?;
        Ok(response.json().await.map_err(redact)?)
    }
}
