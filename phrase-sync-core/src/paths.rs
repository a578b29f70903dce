//! Where a locale's file lives on disk.
//!
//! User templates from the [`Config`] win over the format's own naming rule;
//! the target directory falls back to the format's default and then to
//! [`DEFAULT_TARGET_DIRECTORY`].

use tracing::debug;

use crate::config::{Config, LocaleConfig};
use crate::contract::Locale;
use crate::error::SyncError;
use crate::formats::{FormatRegistry, FormatSpec};
use crate::placeholder::Placeholders;

pub const DEFAULT_TARGET_DIRECTORY: &str = "phrase/locales/";

#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    registry: &'a FormatRegistry,
}

impl<'a> PathResolver<'a> {
    pub fn new(registry: &'a FormatRegistry) -> Self {
        PathResolver { registry }
    }

    fn format(&self, config: &Config) -> Result<&'a FormatSpec, SyncError> {
        self.registry.require(&config.format)
    }

    pub fn directory_for_locale(&self, config: &Config, locale: &Locale) -> Result<String, SyncError> {
        let format = self.format(config)?;
        Ok(override_or(config, locale, &config.locale_directory, || {
            format.directory_for_locale(config, locale)
        }))
    }

    pub fn filename_for_locale(&self, config: &Config, locale: &Locale) -> Result<String, SyncError> {
        let format = self.format(config)?;
        Ok(override_or(config, locale, &config.locale_filename, || {
            format.filename_for_locale(config, locale)
        }))
    }

    pub fn target_directory(&self, config: &Config) -> Result<String, SyncError> {
        let format = self.format(config)?;
        let target = [config.target_directory.as_str(), format.target_directory.as_str()]
            .into_iter()
            .find(|dir| !dir.is_empty())
            .unwrap_or(DEFAULT_TARGET_DIRECTORY);
        Ok(target.to_string())
    }

    /// All three path parts of one locale, resolved.
    pub fn locale_config(&self, config: &Config, locale: &Locale) -> Result<LocaleConfig, SyncError> {
        let locale_config = LocaleConfig {
            config: config.clone(),
            locale_directory: self.directory_for_locale(config, locale)?,
            locale_filename: self.filename_for_locale(config, locale)?,
            target_directory: self.target_directory(config)?,
        };
        debug!(locale = %locale.name, path = %locale_config.path().display(), "Resolved locale path");
        Ok(locale_config)
    }
}

fn override_or(
    config: &Config,
    locale: &Locale,
    template: &str,
    fallback: impl FnOnce() -> String,
) -> String {
    let resolved = Placeholders::new(config, locale).resolve(template);
    if resolved.is_empty() {
        fallback()
    } else {
        resolved
    }
}
