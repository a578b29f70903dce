//! Push: upload local localization files, one independent unit per file.
//!
//! # Pipeline
//! 1. Validate tags and the explicit upload format, if any.
//! 2. Expand the given files and directories (recursively on request) into a
//!    file list. With no paths at all, [`DEFAULT_LOCALE_FOLDER`] is used when it
//!    exists.
//! 3. Refuse empty selections, and an explicit locale for more than one file.
//! 4. Skip files whose extension no format accepts.
//! 5. Upload every remaining file concurrently, without a concurrency cap. A
//!    file without an explicit locale gets one inferred from its path, or the
//!    project's default locale.
//!
//! Steps 1-3 fail the whole call; everything after is per file and reported in
//! the [`PushReport`].

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::contract::{find_default_locale_name, TranslationService, UploadRequest};
use crate::encoding::{decode_utf16, is_utf16};
use crate::error::{SyncError, UnitError};
use crate::formats::{file_extension, FormatRegistry, FormatSpec};

pub const DEFAULT_LOCALE_FOLDER: &str = "config/locales";

static VALID_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[a-zA-Z0-9_\-.]+\z").expect("tag pattern"));

/// Upload options shared by every file of one push.
#[derive(Debug, Clone, Default)]
pub struct UploadSpec {
    /// Format id; guessed per file from its extension when `None`.
    pub format: Option<String>,
    /// Locale of the file; only valid when a single file is pushed.
    pub locale: Option<String>,
    pub tags: Vec<String>,
    pub update_translations: bool,
    pub skip_unverification: bool,
    pub skip_upload_tags: bool,
    pub convert_emoji: bool,
}

impl UploadSpec {
    fn request_for(&self, path: &Path, locale: String, content: String) -> UploadRequest {
        UploadRequest {
            filename: path.to_string_lossy().into_owned(),
            file_content: content,
            tags: self.tags.clone(),
            locale_code: locale,
            file_format: self.format.clone(),
            update_translations: self.update_translations,
            skip_unverification: self.skip_unverification,
            skip_upload_tags: self.skip_upload_tags,
            convert_emoji: self.convert_emoji,
        }
    }
}

/// Check a tag only uses letters, digits, `_`, `-` and `.`.
pub fn validate_tag(tag: &str) -> Result<(), SyncError> {
    if VALID_TAG.is_match(tag) {
        Ok(())
    } else {
        Err(SyncError::InvalidTag(tag.to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct PushReport {
    /// Set when no path was given and the default folder was used instead.
    pub used_default_folder: bool,
    pub files: Vec<FileReport>,
}

impl PushReport {
    pub fn uploaded(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|report| matches!(report.outcome, FileOutcome::Uploaded { .. }))
    }
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Uploaded {
        locale: String,
    },
    /// No registered format accepts the file's extension.
    Unsupported,
    Failed {
        #[serde(serialize_with = "crate::error::serialize_error")]
        error: UnitError,
    },
}

pub struct PushOrchestrator<'a, S: ?Sized> {
    service: &'a S,
    registry: &'a FormatRegistry,
    default_folder: PathBuf,
}

impl<'a, S> PushOrchestrator<'a, S>
where
    S: TranslationService + ?Sized,
{
    pub fn new(service: &'a S, registry: &'a FormatRegistry) -> Self {
        PushOrchestrator {
            service,
            registry,
            default_folder: PathBuf::from(DEFAULT_LOCALE_FOLDER),
        }
    }

    /// Folder pushed when no path is given.
    pub fn with_default_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.default_folder = folder.into();
        self
    }

    pub async fn push(
        &self,
        spec: &UploadSpec,
        paths: &[PathBuf],
        recursive: bool,
    ) -> Result<PushReport, SyncError> {
        info!(paths = paths.len(), recursive, "[PUSH] Starting push");
        for tag in &spec.tags {
            validate_tag(tag)?;
        }
        let format = match spec.format.as_deref() {
            Some(id) => Some(self.registry.require(id)?),
            None => None,
        };

        let used_default_folder = paths.is_empty();
        let roots = if used_default_folder {
            if !self.default_folder.is_dir() {
                error!(folder = %self.default_folder.display(), "[PUSH][ERROR] No file or directory specified");
                return Err(SyncError::NoPathsGiven);
            }
            warn!(folder = %self.default_folder.display(), "No file or directory specified, using {}", self.default_folder.display());
            vec![self.default_folder.clone()]
        } else {
            paths.to_vec()
        };

        let selected = select_files(&roots, recursive);
        if selected.is_empty() {
            error!("[PUSH][ERROR] Could not find any files to upload");
            return Err(SyncError::NothingToUpload);
        }
        if selected.len() > 1 && spec.locale.is_some() {
            error!(files = selected.len(), "[PUSH][ERROR] Explicit locale with multiple files");
            return Err(SyncError::AmbiguousLocale {
                count: selected.len(),
            });
        }

        let supported = &self.registry.supported_extensions();
        let locale_as_extension = format.is_some_and(|f| f.locale_as_extension);

        let units = selected.iter().map(|path| async move {
            let extension = file_extension(path);
            let outcome = if supported.contains(extension.as_str()) || locale_as_extension {
                match self.upload_file(spec, format, path).await {
                    Ok(locale) => FileOutcome::Uploaded { locale },
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "[PUSH][ERROR] Error uploading file");
                        FileOutcome::Failed { error: e }
                    }
                }
            } else {
                warn!(path = %path.display(), "Could not upload {} (type not supported)", path.display());
                FileOutcome::Unsupported
            };
            FileReport {
                path: path.clone(),
                outcome,
            }
        });
        let files = join_all(units).await;

        let report = PushReport {
            used_default_folder,
            files,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => debug!(json = %json, "[PUSH][DEBUG] Push report"),
            Err(e) => error!(error = ?e, "[PUSH][DEBUG] Failed to serialize push report"),
        }
        Ok(report)
    }

    /// Upload one file and return the locale it was uploaded as.
    async fn upload_file(
        &self,
        spec: &UploadSpec,
        format: Option<&FormatSpec>,
        path: &Path,
    ) -> Result<String, UnitError> {
        if spec.tags.is_empty() {
            info!(path = %path.display(), "[PUSH] Uploading");
        } else {
            info!(path = %path.display(), tags = %spec.tags.join(", "), "[PUSH] Uploading (tagged)");
        }

        let locale = match &spec.locale {
            Some(locale) => locale.clone(),
            None => self.guess_locale(format, path).await?,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UnitError::io("reading file", path, e))?;
        let content = if is_utf16(&bytes) {
            debug!(path = %path.display(), "Transcoding UTF-16 content");
            decode_utf16(&bytes)?
        } else {
            match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), "File is not valid UTF-8, replacing invalid sequences");
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            }
        };

        let request = spec.request_for(path, locale.clone(), content);
        self.service
            .upload_file(&request)
            .await
            .map_err(UnitError::Service)?;
        info!(path = %path.display(), locale = %locale, "[PUSH] Uploaded");
        Ok(locale)
    }

    /// Locale of a file pushed without `--locale`: from the path when the
    /// format encodes it there, otherwise the project's default locale.
    async fn guess_locale(&self, format: Option<&FormatSpec>, path: &Path) -> Result<String, UnitError> {
        let format = format.or_else(|| self.registry.guess_from_extension(path));
        if let Some(format) = format.filter(|f| f.locale_aware) {
            let extracted = format
                .extract_locale_from_path(path, self.service)
                .await
                .map_err(UnitError::Service)?;
            if let Some(locale) = extracted {
                debug!(path = %path.display(), format = %format.id, locale = %locale, "Locale taken from path");
                return Ok(locale);
            }
        }
        let default = find_default_locale_name(self.service)
            .await
            .map_err(UnitError::Service)?;
        debug!(path = %path.display(), locale = ?default, "Falling back to the default locale");
        Ok(default.unwrap_or_default())
    }
}

/// Expand files and directories into a sorted file list. Missing paths are
/// skipped; directories contribute their regular files, all the way down when
/// `recursive` is set.
pub fn select_files(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let walker = WalkDir::new(path)
                .min_depth(1)
                .max_depth(if recursive { usize::MAX } else { 1 })
                .sort_by_file_name();
            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                    Ok(_) => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
                }
            }
        } else {
            debug!(path = %path.display(), "Skipping missing path");
        }
    }
    files
}
