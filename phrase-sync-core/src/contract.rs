#![allow(unused)]

//! # contract: the translation service boundary
//!
//! This module defines the single trait (`TranslationService`) the orchestrators
//! talk to, plus the plain data types crossing it: locales, tags, download and
//! upload requests, and the rate-limit metadata returned with every download.
//!
//! ## Interface & Extensibility
//! - Implement [`TranslationService`] for a real client (see the `phrase-sync`
//!   crate's `PhraseClient`) or for an instrumented test double.
//! - All methods are async and return boxed errors ([`ServiceError`]); the core
//!   never inspects them beyond logging and reporting.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so `MockTranslationService` is
//!   available in tests and, with the `test-export-mocks` feature, to dependents.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};

/// Error returned by any [`TranslationService`] call.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// A locale of the remote project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub code: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub writing_direction: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Locale {
    /// Locale with only a name, as used when the service has not been asked yet.
    pub fn named(name: impl Into<String>) -> Self {
        Locale {
            name: name.into(),
            ..Locale::default()
        }
    }

    /// The identifier used for path computations: the code, or the name when
    /// the code is empty.
    pub fn identifier(&self) -> &str {
        if self.code.is_empty() {
            &self.name
        } else {
            &self.code
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tag of the remote project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

/// Rate-limit metadata accompanying a download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub limit: Option<u32>,
    /// `None` when the service did not report it.
    pub remaining: Option<u32>,
    /// Unix timestamp (seconds) at which the quota resets.
    pub reset_at: Option<i64>,
}

impl RateLimit {
    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Parameters for one locale download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub locale: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// `YYYYMMDDHHMMSS`, UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_since: Option<String>,
    pub include_empty_translations: bool,
    pub keep_notranslate_tags: bool,
    pub convert_emoji: bool,
    pub skip_unverified_translations: bool,
}

/// Body and metadata of a finished download.
#[derive(Debug, Clone, Default)]
pub struct Download {
    pub content: Vec<u8>,
    pub rate_limit: RateLimit,
}

/// Parameters for one file upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadRequest {
    pub filename: String,
    pub file_content: String,
    pub tags: Vec<String>,
    pub locale_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    pub update_translations: bool,
    pub skip_unverification: bool,
    pub skip_upload_tags: bool,
    pub convert_emoji: bool,
}

/// Trait for talking to the translation-management service.
///
/// The trait is `Send` + `Sync` so one instance can be shared by every unit of
/// a pull or push.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// List every locale of the project.
    async fn list_locales(&self) -> Result<Vec<Locale>, ServiceError>;

    /// Download the translations of one locale.
    async fn download_translations(
        &self,
        req: &DownloadRequest,
    ) -> Result<Download, ServiceError>;

    /// Upload one localization file.
    async fn upload_file(&self, req: &UploadRequest) -> Result<(), ServiceError>;

    /// Create a locale in the project.
    async fn create_locale(&self, name: &str) -> Result<Locale, ServiceError>;

    /// Promote a locale to be the project default.
    async fn make_default_locale(&self, name: &str) -> Result<Locale, ServiceError>;

    /// List every tag of the project.
    async fn list_tags(&self) -> Result<Vec<Tag>, ServiceError>;
}

/// Name of the project's default locale, if one is flagged.
pub async fn find_default_locale_name<S>(service: &S) -> Result<Option<String>, ServiceError>
where
    S: TranslationService + ?Sized,
{
    let locales = service.list_locales().await?;
    Ok(locales
        .into_iter()
        .find(|locale| locale.is_default)
        .map(|locale| locale.name))
}
