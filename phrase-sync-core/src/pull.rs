//! Pull: download the translations of every selected locale into its file.
//!
//! # Pipeline
//! 1. Check the configured format exists (fatal otherwise).
//! 2. List the project's locales and pick the requested ones; unknown names
//!    are skipped with a warning. No names means every locale.
//! 3. Download each locale as an independent unit. At most
//!    [`MAX_CONCURRENT_DOWNLOADS`] units talk to the service at once; the rest
//!    wait on a semaphore. `pull` returns once every unit has finished.
//!
//! # Error Handling
//! Only steps 1 and 2 fail the call. A unit that cannot create its folder or
//! file, or whose download fails, is reported as [`LocaleOutcome::Failed`] and
//! its siblings carry on. A download that leaves no quota is reported as
//! [`LocaleOutcome::RateLimited`]; already scheduled units still run.

use std::collections::HashMap;
use std::path::PathBuf;

use futures::future::join_all;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::{Config, LocaleConfig};
use crate::contract::{DownloadRequest, Locale, TranslationService};
use crate::error::{SyncError, UnitError};
use crate::formats::FormatRegistry;
use crate::paths::PathResolver;

pub const MAX_CONCURRENT_DOWNLOADS: usize = 2;

/// Download options shared by every locale of one pull.
#[derive(Debug, Clone, Default)]
pub struct DownloadSpec {
    pub tag: Option<String>,
    pub updated_since: Option<String>,
    pub include_empty_translations: bool,
    pub keep_notranslate_tags: bool,
    pub convert_emoji: bool,
    pub skip_unverified_translations: bool,
}

impl DownloadSpec {
    fn request_for(&self, config: &Config, locale: &Locale) -> DownloadRequest {
        DownloadRequest {
            locale: locale.name.clone(),
            format: config.format.clone(),
            encoding: Some(config.encoding.clone()).filter(|e| !e.is_empty()),
            tag: self.tag.clone(),
            updated_since: self.updated_since.clone(),
            include_empty_translations: self.include_empty_translations,
            keep_notranslate_tags: self.keep_notranslate_tags,
            convert_emoji: self.convert_emoji,
            skip_unverified_translations: self.skip_unverified_translations,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullReport {
    /// Requested names the project does not know.
    pub skipped: Vec<String>,
    pub locales: Vec<LocaleReport>,
}

impl PullReport {
    pub fn downloaded(&self) -> impl Iterator<Item = &LocaleReport> {
        self.locales
            .iter()
            .filter(|report| matches!(report.outcome, LocaleOutcome::Downloaded { .. }))
    }
}

#[derive(Debug, Serialize)]
pub struct LocaleReport {
    pub locale: String,
    pub outcome: LocaleOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocaleOutcome {
    Downloaded {
        path: PathBuf,
    },
    RateLimited {
        path: PathBuf,
        reset_at: Option<i64>,
    },
    Failed {
        #[serde(serialize_with = "crate::error::serialize_error")]
        error: UnitError,
    },
}

pub struct PullOrchestrator<'a, S: ?Sized> {
    service: &'a S,
    registry: &'a FormatRegistry,
    config: &'a Config,
}

impl<'a, S> PullOrchestrator<'a, S>
where
    S: TranslationService + ?Sized,
{
    pub fn new(service: &'a S, registry: &'a FormatRegistry, config: &'a Config) -> Self {
        PullOrchestrator {
            service,
            registry,
            config,
        }
    }

    pub async fn pull(
        &self,
        spec: &DownloadSpec,
        requested: &[String],
    ) -> Result<PullReport, SyncError> {
        info!(format = %self.config.format, requested = requested.len(), "[PULL] Starting pull");
        self.registry.require(&self.config.format)?;

        let (selected, skipped) = self.select_locales(requested).await?;
        info!(selected = selected.len(), skipped = skipped.len(), "[PULL] Selected locales");

        let resolver = PathResolver::new(self.registry);
        let planned = selected
            .into_iter()
            .map(|locale| {
                let locale_config = resolver.locale_config(self.config, &locale)?;
                Ok((locale, locale_config))
            })
            .collect::<Result<Vec<_>, SyncError>>()?;

        let gate = &Semaphore::new(MAX_CONCURRENT_DOWNLOADS);
        let units = planned.iter().map(|(locale, locale_config)| async move {
            let outcome = match gate.acquire().await {
                Ok(_permit) => self.fetch_locale(spec, locale, locale_config).await,
                Err(e) => {
                    error!(locale = %locale.name, error = ?e, "[PULL][ERROR] Download gate closed");
                    Err(UnitError::Service(Box::new(e)))
                }
            };
            LocaleReport {
                locale: locale.name.clone(),
                outcome: outcome.unwrap_or_else(|error| LocaleOutcome::Failed { error }),
            }
        });
        let locales = join_all(units).await;

        let report = PullReport { skipped, locales };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => debug!(json = %json, "[PULL][DEBUG] Pull report"),
            Err(e) => error!(error = ?e, "[PULL][DEBUG] Failed to serialize pull report"),
        }
        Ok(report)
    }

    /// Resolve requested names against the project's locales, keeping request
    /// order. Returns the selection and the unknown names.
    async fn select_locales(
        &self,
        requested: &[String],
    ) -> Result<(Vec<Locale>, Vec<String>), SyncError> {
        let all = self.service.list_locales().await.map_err(|e| {
            error!(error = ?e, "[PULL][ERROR] Failed to list locales");
            SyncError::ListLocales(e)
        })?;
        if requested.is_empty() {
            return Ok((all, Vec::new()));
        }

        let by_name: HashMap<&str, &Locale> =
            all.iter().map(|locale| (locale.name.as_str(), locale)).collect();
        let mut selected = Vec::with_capacity(requested.len());
        let mut skipped = Vec::new();
        for name in requested {
            match by_name.get(name.as_str()) {
                Some(locale) => selected.push((*locale).clone()),
                None => {
                    warn!(locale = %name, "Skipping unknown locale {name}");
                    skipped.push(name.clone());
                }
            }
        }
        Ok((selected, skipped))
    }

    async fn fetch_locale(
        &self,
        spec: &DownloadSpec,
        locale: &Locale,
        locale_config: &LocaleConfig,
    ) -> Result<LocaleOutcome, UnitError> {
        let folder = locale_config.folder();
        tokio::fs::create_dir_all(&folder).await.map_err(|e| {
            error!(locale = %locale.name, path = %folder.display(), error = ?e, "[PULL][ERROR] Failed to create folder");
            UnitError::io("creating folder", &folder, e)
        })?;

        let path = locale_config.path();
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            error!(locale = %locale.name, path = %path.display(), error = ?e, "[PULL][ERROR] Failed to create file");
            UnitError::io("creating file", &path, e)
        })?;

        let request = spec.request_for(self.config, locale);
        info!(locale = %locale.name, format = %request.format, "[PULL] Downloading locale");
        let download = self.service.download_translations(&request).await.map_err(|e| {
            error!(locale = %locale.name, error = ?e, "[PULL][ERROR] Download failed");
            UnitError::Service(e)
        })?;

        file.write_all(&download.content).await.map_err(|e| {
            error!(locale = %locale.name, path = %path.display(), error = ?e, "[PULL][ERROR] Failed to write file");
            UnitError::io("writing file", &path, e)
        })?;
        file.flush()
            .await
            .map_err(|e| UnitError::io("writing file", &path, e))?;

        if download.rate_limit.exhausted() {
            warn!(
                locale = %locale.name,
                reset_at = ?download.rate_limit.reset_at,
                "Rate limit reached. Please try again later"
            );
            return Ok(LocaleOutcome::RateLimited {
                path,
                reset_at: download.rate_limit.reset_at,
            });
        }

        info!(locale = %locale.name, path = %path.display(), bytes = download.content.len(), "[PULL] Downloaded");
        Ok(LocaleOutcome::Downloaded { path })
    }
}
